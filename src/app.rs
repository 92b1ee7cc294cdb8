use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use tracing_subscriber::EnvFilter;

use crate::catalog::graphql::AdminGraphqlSource;
use crate::catalog::{CatalogSource, Record};
use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{
    default_config_path, ensure_default_config_file, expand_tilde, load_config, ConfigFile,
};
use crate::listing::filters::FilterSet;
use crate::listing::{ListingController, ListingError, ListingOptions, PageResult};
use crate::output::{self, OutputFormat};

const DEFAULT_API_VERSION: &str = "2024-10";
const DEFAULT_TIMEOUT_SECONDS: usize = 10;
const TOKEN_ENV_VAR: &str = "SHOPAUDIT_TOKEN";

pub fn print_banner() {
    println!(
        "\n  {} {}\n  {}\n",
        "shopaudit".bold().bright_cyan(),
        concat!("v", env!("CARGO_PKG_VERSION")).bright_cyan(),
        "catalog QA auditing".dimmed()
    );
}

fn format_kv_line(key: &str, value: &str) -> String {
    format!("{} {} {} {}", "::".bold(), key.bold(), ":".bold(), value)
}

// everything the run loop needs, resolved from args and config
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub shop: String,
    pub access_token: String,
    pub api_version: String,
    pub filters: FilterSet,
    pub batch_size: usize,
    pub page: usize,
    pub pages: usize,
    pub timeout_seconds: usize,
    pub proxy: Option<String>,
    pub output: Option<String>,
    pub output_format: Option<OutputFormat>,
    pub no_color: bool,
    pub scan_alt_text: bool,
    pub verbose: u8,
}

// args win over config values; config fills the gaps
pub fn build_run_config(args: &CliArgs, cfg: &ConfigFile) -> Result<RunConfig, String> {
    let shop = args
        .shop
        .clone()
        .or_else(|| cfg.shop.clone())
        .ok_or_else(|| "missing store domain, pass --shop or set shop in config".to_string())?;

    let access_token = args
        .token
        .clone()
        .or_else(|| std::env::var(TOKEN_ENV_VAR).ok().filter(|t| !t.is_empty()))
        .or_else(|| cfg.access_token.clone())
        .ok_or_else(|| {
            format!("missing access token, pass --token, set {TOKEN_ENV_VAR}, or set access_token in config")
        })?;

    let api_version = args
        .api_version
        .clone()
        .or_else(|| cfg.api_version.clone())
        .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

    let filters = if args.filters.is_empty() {
        FilterSet::from_values(cfg.filters.as_deref().unwrap_or(&[]))
    } else {
        FilterSet::from_values(&args.filters)
    };

    let batch_size = args
        .batch_size
        .or(cfg.batch_size)
        .unwrap_or_else(|| ListingOptions::default().batch_size);
    if batch_size == 0 || batch_size > 250 {
        return Err("invalid batch_size, expected 1-250".to_string());
    }

    let output = args
        .output
        .clone()
        .or_else(|| cfg.output.clone())
        .map(|p| crate::config::expand_tilde_string(&p));

    let output_format = match args
        .output_format
        .as_deref()
        .or(cfg.output_format.as_deref())
    {
        Some(raw) => Some(
            OutputFormat::parse(raw)
                .ok_or_else(|| format!("invalid output_format '{raw}'"))?,
        ),
        None => output.as_deref().and_then(output::infer_format_from_path),
    };

    let no_color = if args.color {
        false
    } else {
        args.no_color || cfg.no_color.unwrap_or(false)
    };

    Ok(RunConfig {
        shop,
        access_token,
        api_version,
        filters,
        batch_size,
        page: args.page.or(cfg.page).unwrap_or(1),
        pages: args.pages.or(cfg.pages).unwrap_or(1),
        timeout_seconds: args
            .timeout
            .or(cfg.timeout)
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        proxy: args.proxy.clone().or_else(|| cfg.proxy.clone()),
        output,
        output_format,
        no_color,
        scan_alt_text: args.scan_alt_text || cfg.scan_alt_text.unwrap_or(false),
        verbose: args.verbose,
    })
}

fn init_tracing(verbose: u8) {
    let default_directive = match verbose {
        0 => "shopaudit=warn",
        1 => "shopaudit=info",
        _ => "shopaudit=debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn record_flags(record: &Record) -> String {
    let mut flags: Vec<&str> = Vec::new();
    if !record.has_image() {
        flags.push("no-image");
    }
    if !record.has_description() {
        flags.push("blank-description");
    }
    if record.has_image() && !record.has_alt_text() {
        flags.push("no-alt");
    }
    flags.join(",")
}

fn print_record(record: &Record) {
    let flags = record_flags(record);
    if flags.is_empty() {
        println!("  {} [{}] {}", record.title.bold(), record.status, record.handle);
    } else {
        println!(
            "  {} [{}] {} {}",
            record.title.bold(),
            record.status,
            record.handle,
            flags.red()
        );
    }
}

fn print_page_summary(result: &PageResult) {
    match result {
        PageResult::Server { page, page_info, records } => {
            println!("{}", format_kv_line("page", &page.to_string()));
            println!("{}", format_kv_line("records", &records.len().to_string()));
            println!(
                "{}",
                format_kv_line("more upstream", &page_info.has_next_page.to_string())
            );
        }
        PageResult::Filtered {
            page,
            total_pages,
            has_more_upstream,
            records,
        } => {
            println!(
                "{}",
                format_kv_line("page", &format!("{page} of {total_pages}+"))
            );
            println!("{}", format_kv_line("records", &records.len().to_string()));
            println!(
                "{}",
                format_kv_line("more upstream", &has_more_upstream.to_string())
            );
        }
    }
}

async fn write_report(
    path: &str,
    format: OutputFormat,
    records: &[output::OutputRecord],
) -> Result<(), String> {
    let bytes = match format {
        OutputFormat::Text => output::render_text(records),
        OutputFormat::Json => output::render_json(records),
        OutputFormat::Html => output::render_html(records),
    };
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| format!("failed to write report '{path}': {e}"))?;
    Ok(())
}

// fetch up to `pages` consecutive pages starting at `start_page`, handing
// each one to `on_page`. pagination always advances through `next_page`,
// which is mode-aware; server mode ignores a requested index, so the start
// page is reached by walking forward from page one.
pub(crate) async fn collect_pages<S, F>(
    controller: &mut ListingController<S>,
    filters: &FilterSet,
    start_page: usize,
    pages: usize,
    mut on_page: F,
) -> Result<(), ListingError>
where
    S: CatalogSource,
    F: FnMut(&PageResult),
{
    let mut result = controller.request_page(filters, start_page).await?;
    while !result.is_filtered() && result.page() < start_page {
        let more = matches!(
            &result,
            PageResult::Server { page_info, .. } if page_info.has_next_page
        );
        if !more {
            break;
        }
        result = controller.next_page().await?;
    }

    let mut served = 0;
    loop {
        on_page(&result);
        served += 1;
        if served >= pages {
            break;
        }
        // check exhaustion before fetching, so an exactly-full final page
        // does not produce a trailing empty one
        let exhausted = match &result {
            PageResult::Server { page_info, .. } => !page_info.has_next_page,
            PageResult::Filtered {
                page,
                total_pages,
                has_more_upstream,
                ..
            } => !has_more_upstream && page >= total_pages,
        };
        if exhausted {
            break;
        }
        result = controller.next_page().await?;
    }
    Ok(())
}

pub async fn run_async(run: RunConfig) -> Result<(), String> {
    init_tracing(run.verbose);

    let source = AdminGraphqlSource::new(
        &run.shop,
        &run.access_token,
        &run.api_version,
        run.timeout_seconds,
        run.proxy.as_deref(),
    )
    .map_err(|e| e.to_string())?;

    let mut controller = ListingController::with_options(
        source,
        ListingOptions {
            batch_size: run.batch_size,
        },
    );

    println!("{}", format_kv_line("shop", &run.shop));
    println!("{}", format_kv_line("api version", &run.api_version));
    let filter_summary = if run.filters.is_empty() {
        "(none)".to_string()
    } else {
        run.filters.identifiers().join(",")
    };
    println!("{}", format_kv_line("filters", &filter_summary));
    println!();

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.enable_steady_tick(Duration::from_millis(120));

    let mut report_rows: Vec<output::OutputRecord> = Vec::new();
    progress.set_message("fetching pages");

    collect_pages(
        &mut controller,
        &run.filters,
        run.page,
        run.pages,
        |result| {
            progress.suspend(|| {
                print_page_summary(result);
                for record in result.records() {
                    print_record(record);
                }
                println!();
            });
            report_rows.extend(output::build_records(
                result.records(),
                result.page(),
                run.scan_alt_text,
            ));
        },
    )
    .await
    .map_err(|e| e.to_string())?;

    progress.finish_and_clear();

    println!(
        "{}",
        format_kv_line("total listed", &report_rows.len().to_string())
    );
    if run.scan_alt_text {
        let embedded_missing: usize = report_rows.iter().map(|r| r.embedded_missing_alt).sum();
        println!(
            "{}",
            format_kv_line("embedded images missing alt", &embedded_missing.to_string())
        );
    }

    if let Some(path) = run.output.as_deref() {
        let format = run.output_format.unwrap_or(OutputFormat::Text);
        write_report(path, format, &report_rows).await?;
        println!("{}", format_kv_line("report", path));
    }

    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = CliArgs::parse();
    validation::validate(&args)?;

    if args.init_config {
        let path = args
            .config
            .as_deref()
            .map(expand_tilde)
            .or_else(default_config_path)
            .ok_or_else(|| "could not resolve a config path".to_string())?;
        ensure_default_config_file(&path)?;
        println!("wrote default config to {}", path.display());
        return Ok(());
    }

    let cfg = match args.config.as_deref() {
        Some(path) => load_config(&expand_tilde(path), false)?,
        None => match default_config_path() {
            Some(path) => load_config(&path, true)?,
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(&args, &cfg)?;

    if run.no_color {
        colored::control::set_override(false);
    }

    print_banner();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;
    runtime.block_on(run_async(run))
}
