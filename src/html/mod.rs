pub mod regex_scan;
pub mod tag_scan;

use thiserror::Error;

pub use regex_scan::RegexImageExtractor;
pub use tag_scan::TagScanExtractor;

// one <img> element found in a document fragment, in document order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRef {
    pub src: Option<String>,
    pub alt: Option<String>,
    pub index: usize,
}

impl ImageRef {
    // absent or whitespace-only alt counts as missing
    pub fn missing_alt(&self) -> bool {
        self.alt
            .as_deref()
            .map(|alt| alt.trim().is_empty())
            .unwrap_or(true)
    }
}

pub trait ImageExtractor {
    fn extract(&self, html: &str) -> Vec<ImageRef>;
}

#[derive(Debug, Error)]
pub enum HtmlError {
    #[error("image index {index} out of range, document has {count} images")]
    ImageIndexOutOfRange { index: usize, count: usize },
}

pub fn missing_alt_count(html: &str) -> usize {
    TagScanExtractor::new()
        .extract(html)
        .iter()
        .filter(|image| image.missing_alt())
        .count()
}

fn escape_alt(value: &str, quote: char) -> String {
    let mut out = value.replace('&', "&amp;");
    match quote {
        '\'' => out = out.replace('\'', "&#39;"),
        _ => out = out.replace('"', "&quot;"),
    }
    out
}

// replace (or insert, when absent) the alt attribute of the index-th <img>
// element, leaving every other byte of the document untouched. applying the
// same update twice yields the same string as applying it once.
pub fn set_alt_text(html: &str, index: usize, new_alt: &str) -> Result<String, HtmlError> {
    let tags = tag_scan::scan_img_tags(html);
    let tag = tags
        .get(index)
        .ok_or(HtmlError::ImageIndexOutOfRange {
            index,
            count: tags.len(),
        })?;

    match &tag.alt_span {
        Some(span) => {
            let escaped = escape_alt(new_alt, span.quote.unwrap_or('"'));
            if span.quote.is_some() {
                if &html[span.value_start..span.value_end] == escaped {
                    return Ok(html.to_string());
                }
                let mut out = String::with_capacity(html.len() + escaped.len());
                out.push_str(&html[..span.value_start]);
                out.push_str(&escaped);
                out.push_str(&html[span.value_end..]);
                Ok(out)
            } else {
                // unquoted (or valueless) alt: rewrite the whole attribute in
                // quoted form so the new value survives whitespace
                let replacement = format!("alt=\"{escaped}\"");
                if &html[span.attr_start..span.attr_end] == replacement {
                    return Ok(html.to_string());
                }
                let mut out = String::with_capacity(html.len() + replacement.len());
                out.push_str(&html[..span.attr_start]);
                out.push_str(&replacement);
                out.push_str(&html[span.attr_end..]);
                Ok(out)
            }
        }
        None => {
            let escaped = escape_alt(new_alt, '"');
            let insertion = format!(" alt=\"{escaped}\"");
            let mut out = String::with_capacity(html.len() + insertion.len());
            out.push_str(&html[..tag.insert_at]);
            out.push_str(&insertion);
            out.push_str(&html[tag.insert_at..]);
            Ok(out)
        }
    }
}
