//! Tag stripping for ODF `content.xml` and legacy Pages `index.xml`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Paragraph/heading ends and explicit line breaks become newlines
static LINE_BREAKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"</text:(?:p|h)>|<text:line-break\s*/>|</sf:p>|<sf:br\s*/>|<sf:lnbr\s*/>")
        .expect("Invalid regex")
});

static TABS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(?:text:tab|sf:tab)\s*/>").expect("Invalid regex"));

/// `<text:s/>` is one space, `<text:s text:c="3"/>` is three
static SPACES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<text:s(?:\s+text:c="(\d+)")?\s*/>"#).expect("Invalid regex")
});

static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("Invalid regex"));

static ENTITIES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#x[0-9A-Fa-f]+|#[0-9]+|[a-z]+);").expect("Invalid regex"));

/// Upper bound for a single `<text:s text:c="N"/>` expansion
const MAX_SPACE_RUN: usize = 64;

/// Convert document XML into plain text, one paragraph per line
pub(crate) fn xml_to_text(xml: &str) -> String {
    let text = LINE_BREAKS.replace_all(xml, "\n");
    let text = TABS.replace_all(&text, "\t");
    let text = SPACES.replace_all(&text, |caps: &regex::Captures| {
        let count = caps
            .get(1)
            .and_then(|m| m.as_str().parse::<usize>().ok())
            .unwrap_or(1)
            .min(MAX_SPACE_RUN);
        " ".repeat(count)
    });
    let text = TAGS.replace_all(&text, "");
    decode_entities(&text)
}

fn decode_entities(text: &str) -> String {
    ENTITIES
        .replace_all(text, |caps: &regex::Captures| {
            let entity = &caps[1];
            let decoded = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => entity
                    .strip_prefix("#x")
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
