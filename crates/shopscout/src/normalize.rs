//! Text normalization for extracted field values.
//!
//! All functions are idempotent: feeding their output back in returns the
//! same string.

use url::Url;

/// Collect the visible text of an element, trimmed and whitespace-collapsed.
pub fn element_text(el: &scraper::ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

/// Trim and collapse runs of whitespace to a single space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip currency glyphs, digit-group separators and whitespace from a price.
///
/// Keeps ASCII digits and the decimal point; a stray leading or trailing
/// point (as left behind by `Rs.`) is dropped. Returns an empty string when
/// the text holds no digits.
///
/// `"₹1,23,456"` becomes `"123456"`, `"$1,299.50"` becomes `"1299.50"`.
pub fn normalize_price(text: &str) -> String {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if !kept.chars().any(|c| c.is_ascii_digit()) {
        return String::new();
    }
    kept.trim_matches('.').to_string()
}

/// Keep only the leading token of a compound count phrase.
///
/// `"1,234 ratings and 87 reviews"` becomes `"1,234"`.
pub fn normalize_count(text: &str) -> String {
    text.split_whitespace().next().unwrap_or_default().to_string()
}

/// Resolve a possibly-relative href against the site origin.
pub fn absolute_url(origin: &Url, href: &str) -> Result<String, url::ParseError> {
    origin.join(href.trim()).map(String::from)
}

/// Current local time as `YYYY-MM-DD HH:MM:SS`.
pub fn timestamp_now() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
