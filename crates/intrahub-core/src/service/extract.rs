//! Plain-text extraction from raw message sources.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use mailparse::{MailHeaderMap, ParsedMail};
use regex::Regex;

/// Stored in place of a body when no HTML body block is found.
pub const NO_CONTENT: &str = "No content";

#[allow(clippy::expect_used)]
static BODY_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<body\b[^>]*>(.*?)</body\s*>").expect("valid body block regex")
});

#[allow(clippy::expect_used)]
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// Extract the plain text of a message.
///
/// Locates the first HTML `<body>` block, strips its tags and decodes the
/// common entities. The MIME structure is decoded first when it parses, so
/// quoted-printable and base64 HTML parts are handled; otherwise the raw
/// source is searched directly. Returns [`NO_CONTENT`] when there is no body
/// block.
#[must_use]
pub fn extract_text(source: &[u8]) -> String {
    let html = mailparse::parse_mail(source)
        .ok()
        .and_then(|mail| first_html_part(&mail));

    let body = html
        .as_deref()
        .and_then(body_block)
        .or_else(|| body_block(&String::from_utf8_lossy(source)));

    body.map_or_else(|| NO_CONTENT.to_string(), |inner| strip_tags(&inner))
}

fn first_html_part(mail: &ParsedMail<'_>) -> Option<String> {
    if mail.ctype.mimetype.eq_ignore_ascii_case("text/html") {
        return mail.get_body().ok();
    }
    mail.subparts.iter().find_map(first_html_part)
}

fn body_block(html: &str) -> Option<String> {
    BODY_BLOCK
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn strip_tags(html: &str) -> String {
    let text = TAG.replace_all(html, "");
    decode_entities(&text).trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Decode an RFC 2047 encoded header value (subject, display name).
#[must_use]
pub fn decode_header_value(raw: &[u8]) -> String {
    let mut composed = b"X: ".to_vec();
    composed.extend_from_slice(raw);
    match mailparse::parse_header(&composed) {
        Ok((header, _)) => header.get_value().trim().to_string(),
        Err(_) => String::from_utf8_lossy(raw).trim().to_string(),
    }
}

/// Parse an RFC 2822 date.
#[must_use]
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let timestamp = mailparse::dateparse(raw.trim()).ok()?;
    DateTime::from_timestamp(timestamp, 0)
}

/// Read a header from a raw source, used when the envelope lacks a field.
#[must_use]
pub fn header_from_source(source: &[u8], name: &str) -> Option<String> {
    let (headers, _) = mailparse::parse_headers(source).ok()?;
    headers.get_first_value(name).map(|v| v.trim().to_string())
}
