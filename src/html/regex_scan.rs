use regex::Regex;

use super::{ImageExtractor, ImageRef};

// tolerant regex fallback for hosts without the full tag scanner: matches
// whole <img ...> tags, then pulls quoted src/alt values out of each match.
// unquoted attributes are out of scope for this implementation.
#[derive(Clone, Debug)]
pub struct RegexImageExtractor {
    tag_re: Regex,
    src_re: Regex,
    alt_re: Regex,
}

impl RegexImageExtractor {
    pub fn new() -> Self {
        Self {
            tag_re: Regex::new(r"(?is)<img\b[^>]*>").expect("img tag pattern compiles"),
            src_re: Regex::new(r#"(?is)\bsrc\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
                .expect("src attribute pattern compiles"),
            alt_re: Regex::new(r#"(?is)\balt\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
                .expect("alt attribute pattern compiles"),
        }
    }

    fn quoted_value(re: &Regex, tag: &str) -> Option<String> {
        let caps = re.captures(tag)?;
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
    }
}

impl Default for RegexImageExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageExtractor for RegexImageExtractor {
    fn extract(&self, html: &str) -> Vec<ImageRef> {
        self.tag_re
            .find_iter(html)
            .enumerate()
            .map(|(index, m)| {
                let tag = m.as_str();
                ImageRef {
                    src: Self::quoted_value(&self.src_re, tag),
                    alt: Self::quoted_value(&self.alt_re, tag),
                    index,
                }
            })
            .collect()
    }
}
