use super::{ImageExtractor, ImageRef};

// byte positions of an alt attribute inside its <img> tag. `quote` is None
// for unquoted or valueless forms, which get rewritten whole on update.
#[derive(Clone, Debug)]
pub(crate) struct AltSpan {
    pub(crate) attr_start: usize,
    pub(crate) attr_end: usize,
    pub(crate) value_start: usize,
    pub(crate) value_end: usize,
    pub(crate) quote: Option<char>,
}

#[derive(Clone, Debug)]
pub(crate) struct ImgTag {
    pub(crate) src: Option<String>,
    pub(crate) alt: Option<String>,
    pub(crate) alt_span: Option<AltSpan>,
    // byte position just before the closing '>' (or '/>') where a new
    // attribute can be spliced in
    pub(crate) insert_at: usize,
}

fn is_space(b: u8) -> bool {
    b == b' ' || b == b'\t' || b == b'\n' || b == b'\r'
}

// character-level scan for <img ...> tags, tolerant of single-quoted,
// double-quoted, unquoted, and valueless attributes. unterminated tags at the
// end of the fragment are dropped.
pub(crate) fn scan_img_tags(html: &str) -> Vec<ImgTag> {
    let bytes = html.as_bytes();
    let mut tags = Vec::new();
    let mut i = 0;

    while i + 4 <= bytes.len() {
        if bytes[i] != b'<' || !bytes[i + 1..i + 4].eq_ignore_ascii_case(b"img") {
            i += 1;
            continue;
        }
        let after_name = i + 4;
        if after_name < bytes.len()
            && !is_space(bytes[after_name])
            && bytes[after_name] != b'>'
            && bytes[after_name] != b'/'
        {
            i += 1;
            continue;
        }

        match parse_tag(bytes, after_name) {
            Some((tag, end)) => {
                tags.push(build_tag(html, tag));
                i = end;
            }
            None => break,
        }
    }

    tags
}

struct RawTag {
    src_value: Option<(usize, usize)>,
    alt_span: Option<AltSpan>,
    alt_present_valueless: bool,
    insert_at: usize,
}

fn build_tag(html: &str, raw: RawTag) -> ImgTag {
    let src = raw.src_value.map(|(s, e)| html[s..e].to_string());
    let alt = match (&raw.alt_span, raw.alt_present_valueless) {
        (Some(span), _) => Some(html[span.value_start..span.value_end].to_string()),
        (None, true) => Some(String::new()),
        (None, false) => None,
    };
    ImgTag {
        src,
        alt,
        alt_span: raw.alt_span,
        insert_at: raw.insert_at,
    }
}

// parse attributes from just past the tag name to the closing '>'.
// returns the parsed tag and the byte offset just past the tag.
fn parse_tag(bytes: &[u8], mut i: usize) -> Option<(RawTag, usize)> {
    let mut src_value: Option<(usize, usize)> = None;
    let mut alt_span: Option<AltSpan> = None;
    let mut alt_present_valueless = false;

    loop {
        while i < bytes.len() && is_space(bytes[i]) {
            i += 1;
        }
        if i >= bytes.len() {
            return None;
        }
        if bytes[i] == b'>' {
            let raw = RawTag {
                src_value,
                alt_span,
                alt_present_valueless,
                insert_at: i,
            };
            return Some((raw, i + 1));
        }
        if bytes[i] == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'>' {
            let raw = RawTag {
                src_value,
                alt_span,
                alt_present_valueless,
                insert_at: i,
            };
            return Some((raw, i + 2));
        }
        if bytes[i] == b'/' {
            i += 1;
            continue;
        }

        let attr_start = i;
        while i < bytes.len()
            && !is_space(bytes[i])
            && bytes[i] != b'='
            && bytes[i] != b'>'
            && bytes[i] != b'/'
        {
            i += 1;
        }
        if i >= bytes.len() {
            return None;
        }
        let name_end = i;
        if name_end == attr_start {
            // stray '=' with no attribute name
            i += 1;
            continue;
        }

        let mut j = i;
        while j < bytes.len() && is_space(bytes[j]) {
            j += 1;
        }

        let has_value = j < bytes.len() && bytes[j] == b'=';
        if !has_value {
            if bytes[attr_start..name_end].eq_ignore_ascii_case(b"alt") && alt_span.is_none() {
                alt_present_valueless = true;
                alt_span = Some(AltSpan {
                    attr_start,
                    attr_end: name_end,
                    value_start: name_end,
                    value_end: name_end,
                    quote: None,
                });
            }
            continue;
        }

        i = j + 1;
        while i < bytes.len() && is_space(bytes[i]) {
            i += 1;
        }
        if i >= bytes.len() {
            return None;
        }

        let (value_start, value_end, quote, attr_end);
        if bytes[i] == b'"' || bytes[i] == b'\'' {
            let q = bytes[i];
            value_start = i + 1;
            let mut k = value_start;
            while k < bytes.len() && bytes[k] != q {
                k += 1;
            }
            if k >= bytes.len() {
                return None;
            }
            value_end = k;
            attr_end = k + 1;
            quote = Some(q as char);
            i = attr_end;
        } else {
            value_start = i;
            let mut k = i;
            while k < bytes.len() && !is_space(bytes[k]) && bytes[k] != b'>' {
                if bytes[k] == b'/' && k + 1 < bytes.len() && bytes[k + 1] == b'>' {
                    break;
                }
                k += 1;
            }
            value_end = k;
            attr_end = k;
            quote = None;
            i = k;
        }

        let name = &bytes[attr_start..name_end];
        if name.eq_ignore_ascii_case(b"src") && src_value.is_none() {
            src_value = Some((value_start, value_end));
        } else if name.eq_ignore_ascii_case(b"alt") && alt_span.is_none() {
            alt_span = Some(AltSpan {
                attr_start,
                attr_end,
                value_start,
                value_end,
                quote,
            });
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TagScanExtractor;

impl TagScanExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl ImageExtractor for TagScanExtractor {
    fn extract(&self, html: &str) -> Vec<ImageRef> {
        scan_img_tags(html)
            .into_iter()
            .enumerate()
            .map(|(index, tag)| ImageRef {
                src: tag.src,
                alt: tag.alt,
                index,
            })
            .collect()
    }
}
