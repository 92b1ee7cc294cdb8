use serde::Serialize;

use crate::catalog::Record;
use crate::html;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Html,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".html") || lower.ends_with(".htm") {
        return Some(OutputFormat::Html);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputRecord {
    pub id: String,
    pub title: String,
    pub handle: String,
    pub status: String,
    pub page: usize,
    pub has_image: bool,
    pub image_url: String,
    pub image_alt: String,
    pub description_blank: bool,
    // populated only when --scan-alt-text is set: images embedded in the
    // description HTML and how many of them lack alt text
    pub embedded_images: usize,
    pub embedded_missing_alt: usize,
}

pub fn build_records(records: &[Record], page: usize, scan_alt_text: bool) -> Vec<OutputRecord> {
    records
        .iter()
        .map(|r| {
            let (embedded_images, embedded_missing_alt) = if scan_alt_text {
                let images = {
                    use crate::html::ImageExtractor;
                    html::TagScanExtractor::new().extract(&r.description_html)
                };
                let missing = images.iter().filter(|i| i.missing_alt()).count();
                (images.len(), missing)
            } else {
                (0, 0)
            };
            OutputRecord {
                id: r.id.clone(),
                title: r.title.clone(),
                handle: r.handle.clone(),
                status: r.status.clone(),
                page,
                has_image: r.has_image(),
                image_url: r.image_url.clone().unwrap_or_default(),
                image_alt: r.image_alt.clone().unwrap_or_default(),
                description_blank: !r.has_description(),
                embedded_images,
                embedded_missing_alt,
            }
        })
        .collect()
}

pub fn render_text(records: &[OutputRecord]) -> Vec<u8> {
    let mut out = String::new();
    for r in records {
        let mut flags: Vec<&str> = Vec::new();
        if !r.has_image {
            flags.push("no-image");
        }
        if r.description_blank {
            flags.push("blank-description");
        }
        if r.has_image && r.image_alt.trim().is_empty() {
            flags.push("no-alt");
        }
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\n",
            r.id,
            r.title,
            r.status,
            flags.join(",")
        ));
    }
    out.into_bytes()
}

pub fn render_json(records: &[OutputRecord]) -> Vec<u8> {
    serde_json::to_vec_pretty(records).unwrap_or_else(|_| b"[]\n".to_vec())
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn render_html(records: &[OutputRecord]) -> Vec<u8> {
    let mut rows = String::new();
    for r in records {
        rows.push_str(&format!(
            "      <tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape_html(&r.title),
            escape_html(&r.handle),
            escape_html(&r.status),
            if r.has_image { "yes" } else { "no" },
            if r.description_blank { "blank" } else { "ok" },
            if r.image_alt.trim().is_empty() {
                "missing".to_string()
            } else {
                escape_html(&r.image_alt)
            },
        ));
    }
    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8"/>
  <title>Shopaudit Report</title>
  <style>
    body {{ font-family: sans-serif; margin: 2rem; }}
    table {{ border-collapse: collapse; width: 100%; }}
    th, td {{ border: 1px solid #cbd5e1; padding: 0.4rem 0.6rem; text-align: left; }}
    th {{ background: #f1f5f9; }}
  </style>
</head>
<body>
  <h1>Shopaudit Report</h1>
  <p>{count} records</p>
  <table>
    <thead>
      <tr><th>Title</th><th>Handle</th><th>Status</th><th>Image</th><th>Description</th><th>Alt text</th></tr>
    </thead>
    <tbody>
{rows}    </tbody>
  </table>
</body>
</html>
"#,
        count = records.len(),
        rows = rows
    );
    html.into_bytes()
}
