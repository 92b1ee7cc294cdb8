use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "shopaudit",
    version,
    about = "catalog QA auditing tool",
    long_about = "Shopaudit queries a store's admin catalog API and lists products failing QA checks: missing images, blank descriptions, missing alt text.\n\nExamples:\n  shopaudit -s my-store.myshopify.com -f missing-images\n  shopaudit -s my-store.myshopify.com -f missing-images,blank-description -n 3\n  shopaudit -s my-store.myshopify.com --config ~/.shopaudit/config.yml\n\nTip: Use --config to persist store settings and keep CLI invocations short."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase verbosity (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        short = 'c',
        long = "clr",
        visible_alias = "color",
        help_heading = "Output",
        help = "Enable colored output (overrides --no-color)."
    )]
    pub color: bool,

    #[arg(
        long = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 's',
        long = "shop",
        value_name = "DOMAIN",
        help_heading = "Store",
        help = "Store domain (e.g. my-store.myshopify.com)."
    )]
    pub shop: Option<String>,

    #[arg(
        short = 't',
        long = "token",
        value_name = "TOKEN",
        help_heading = "Store",
        help = "Admin API access token (falls back to SHOPAUDIT_TOKEN)."
    )]
    pub token: Option<String>,

    #[arg(
        long = "av",
        visible_alias = "api-version",
        value_name = "VERSION",
        help_heading = "Store",
        help = "Admin API version (default 2024-10)."
    )]
    pub api_version: Option<String>,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.shopaudit/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "init-config",
        help_heading = "Input",
        help = "Write a commented default config file and exit."
    )]
    pub init_config: bool,

    #[arg(
        short = 'f',
        long = "flt",
        visible_alias = "filters",
        value_name = "FILTERS",
        action = ArgAction::Append,
        help_heading = "Listing",
        help = "QA filters, comma-separated or repeated (missing-images, blank-description, missing-alt-text). Empty = plain listing."
    )]
    pub filters: Vec<String>,

    #[arg(
        short = 'p',
        long = "page",
        value_name = "N",
        help_heading = "Listing",
        help = "1-based page to start from."
    )]
    pub page: Option<usize>,

    #[arg(
        short = 'n',
        long = "pages",
        value_name = "N",
        help_heading = "Listing",
        help = "Number of consecutive pages to fetch."
    )]
    pub pages: Option<usize>,

    #[arg(
        long = "bs",
        visible_alias = "batch-size",
        value_name = "N",
        help_heading = "Listing",
        help = "Upstream batch size used while accumulating filtered results."
    )]
    pub batch_size: Option<usize>,

    #[arg(
        long = "to",
        visible_alias = "timeout",
        value_name = "SECONDS",
        help_heading = "HTTP",
        help = "Request timeout in seconds."
    )]
    pub timeout: Option<usize>,

    #[arg(
        long = "px",
        visible_alias = "proxy",
        value_name = "URL",
        help_heading = "HTTP",
        help = "HTTP proxy to route requests through."
    )]
    pub proxy: Option<String>,

    #[arg(
        short = 'o',
        long = "out",
        visible_alias = "output",
        value_name = "FILE",
        help_heading = "Report",
        help = "Write a report to this file."
    )]
    pub output: Option<String>,

    #[arg(
        long = "of",
        visible_alias = "output-format",
        value_name = "FORMAT",
        help_heading = "Report",
        help = "Report format: text, json, or html (inferred from extension when omitted)."
    )]
    pub output_format: Option<String>,

    #[arg(
        long = "sat",
        visible_alias = "scan-alt-text",
        help_heading = "Report",
        help = "Scan each listed product's description HTML for images missing alt text."
    )]
    pub scan_alt_text: bool,
}
