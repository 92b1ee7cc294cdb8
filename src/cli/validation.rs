use crate::cli::args::CliArgs;
use crate::listing::filters::{FilterSet, KNOWN_FILTERS};

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(batch_size) = args.batch_size {
        if batch_size == 0 || batch_size > 250 {
            return Err("invalid batch-size, expected 1-250".to_string());
        }
    }
    if let Some(page) = args.page {
        if page == 0 {
            return Err("invalid page, pages are 1-based".to_string());
        }
    }
    if let Some(pages) = args.pages {
        if pages == 0 {
            return Err("invalid pages, expected positive integer".to_string());
        }
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid timeout, expected positive integer".to_string());
        }
    }
    if let Some(format) = args.output_format.as_deref() {
        if crate::output::OutputFormat::parse(format).is_none() {
            return Err(format!(
                "invalid --output-format '{format}', expected text, json, or html"
            ));
        }
    }

    // unknown identifiers are passed through (the controller ignores them),
    // but a likely typo is worth flagging on stderr
    let filters = FilterSet::from_values(&args.filters);
    for unknown in filters.unknown_identifiers() {
        eprintln!(
            "warning: unrecognized filter '{unknown}' (known: {})",
            KNOWN_FILTERS.join(", ")
        );
    }

    Ok(())
}
