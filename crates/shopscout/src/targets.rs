//! Target sources: the built-in category table, seed URL files and
//! `name=url` command-line pairs.

use crate::types::Target;
use std::path::Path;

/// Category search pages scraped when no targets are given.
pub fn default_categories(origin: &str) -> Vec<Target> {
    let origin = origin.trim_end_matches('/');
    [
        ("mobiles", "mobiles"),
        ("laptops", "laptops"),
        ("headphones", "headphones"),
        ("smartwatches", "smartwatches"),
    ]
    .into_iter()
    .map(|(name, query)| Target::listing(name, format!("{origin}/search?q={query}")))
    .collect()
}

/// Parse a newline-delimited URL list into detail targets labelled `label`.
/// Blank lines and `#` comments are skipped.
pub fn parse_url_list(text: &str, label: &str) -> Vec<Target> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|url| Target::detail(label, url))
        .collect()
}

/// Read a seed file of product URLs.
pub fn load_url_list(path: &Path, label: &str) -> std::io::Result<Vec<Target>> {
    let text = std::fs::read_to_string(path)?;
    let targets = parse_url_list(&text, label);
    tracing::info!("loaded {} URLs from {}", targets.len(), path.display());
    Ok(targets)
}

/// Parse `name=url` into a listing target.
pub fn parse_category_arg(arg: &str) -> Result<Target, String> {
    let (name, url) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected name=url, got {arg:?}"))?;
    let (name, url) = (name.trim(), url.trim());
    if name.is_empty() || url.is_empty() {
        return Err(format!("expected name=url, got {arg:?}"));
    }
    url::Url::parse(url).map_err(|e| format!("invalid URL {url:?}: {e}"))?;
    Ok(Target::listing(name, url))
}
