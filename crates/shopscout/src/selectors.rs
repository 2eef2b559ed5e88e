//! Selector chains: ordered structural queries with first-match-wins
//! semantics.
//!
//! The storefront ships new class names without notice, so every container
//! set and every field is described by a chain that tries the newest known
//! layout first, then older layouts, then a generic fallback. Chains are
//! loaded at compile time from `layouts.json` via `include_str!`; a layout
//! file with the same shape may replace them at startup.
//!
//! All evaluation is synchronous because `scraper` types are `!Send`.

use crate::error::LayoutError;
use crate::normalize::element_text;
use scraper::{ElementRef, Selector};
use serde::Deserialize;
use std::path::Path;

/// Embedded default layout.
const LAYOUTS_JSON: &str = include_str!("layouts.json");

// ── Serialized form ──────────────────────────────────────────────────────────

/// One query as written in a layout file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuerySpec {
    /// A CSS selector, e.g. `div[class*='Nx9bqj']`.
    Css(String),
    /// Elements whose `class` attribute contains `needle`, ignoring case.
    ClassContains { tag: Option<String>, needle: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct FieldChainsSpec {
    title: Vec<QuerySpec>,
    price: Vec<QuerySpec>,
    original_price: Vec<QuerySpec>,
    rating: Vec<QuerySpec>,
    review_count: Vec<QuerySpec>,
    url: Vec<QuerySpec>,
    seller: Vec<QuerySpec>,
}

#[derive(Debug, Clone, Deserialize)]
struct DetailSpec {
    #[serde(default)]
    ready: Option<String>,
    #[serde(flatten)]
    fields: FieldChainsSpec,
}

#[derive(Debug, Clone, Deserialize)]
struct LayoutSpec {
    containers: Vec<QuerySpec>,
    listing: FieldChainsSpec,
    detail: DetailSpec,
}

// ── Compiled form ────────────────────────────────────────────────────────────

/// A compiled structural query.
#[derive(Debug, Clone)]
pub enum Query {
    Css(Selector),
    ClassContains { tag: Option<String>, needle: String },
}

impl Query {
    /// Compile a query, parsing CSS eagerly so bad selectors fail at startup.
    pub fn compile(chain: &str, spec: &QuerySpec) -> Result<Self, LayoutError> {
        match spec {
            QuerySpec::Css(css) => Selector::parse(css)
                .map(Query::Css)
                .map_err(|e| LayoutError::Selector {
                    chain: chain.to_string(),
                    selector: css.clone(),
                    message: e.to_string(),
                }),
            QuerySpec::ClassContains { tag, needle } => Ok(Query::ClassContains {
                tag: tag.as_ref().map(|t| t.to_ascii_lowercase()),
                needle: needle.to_lowercase(),
            }),
        }
    }

    /// All matching descendants of `scope` in document order. `scope` itself
    /// is never matched.
    pub fn select<'a>(&self, scope: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        match self {
            Query::Css(sel) => scope.select(sel).collect(),
            Query::ClassContains { tag, needle } => scope
                .descendants()
                .skip(1)
                .filter_map(ElementRef::wrap)
                .filter(|el| {
                    let v = el.value();
                    tag.as_deref().map_or(true, |t| v.name() == t)
                        && v
                            .attr("class")
                            .is_some_and(|c| c.to_lowercase().contains(needle.as_str()))
                })
                .collect(),
        }
    }
}

/// An ordered list of queries for one logical field or container set.
#[derive(Debug, Clone)]
pub struct SelectorChain {
    name: String,
    queries: Vec<Query>,
}

impl SelectorChain {
    pub fn new(name: impl Into<String>, queries: Vec<Query>) -> Self {
        Self {
            name: name.into(),
            queries,
        }
    }

    /// Compile a chain from its serialized queries.
    pub fn compile(name: &str, specs: &[QuerySpec]) -> Result<Self, LayoutError> {
        let queries = specs
            .iter()
            .map(|s| Query::compile(name, s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(name, queries))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Matches of the highest-priority query that matches anything, with the
    /// zero-based priority level that produced them. Lower levels are never
    /// merged in.
    pub fn first_level<'a>(&self, scope: ElementRef<'a>) -> Option<(usize, Vec<ElementRef<'a>>)> {
        self.queries.iter().enumerate().find_map(|(level, q)| {
            let hits = q.select(scope);
            (!hits.is_empty()).then_some((level, hits))
        })
    }

    /// Text of the first match, across all levels, whose text is non-empty.
    pub fn first_text(&self, scope: ElementRef<'_>) -> Option<String> {
        self.queries.iter().find_map(|q| {
            q.select(scope)
                .into_iter()
                .map(|el| element_text(&el))
                .find(|t| !t.is_empty())
        })
    }

    /// Value of `attr` on the first match that carries a non-empty one.
    pub fn first_attr(&self, scope: ElementRef<'_>, attr: &str) -> Option<String> {
        self.queries.iter().find_map(|q| {
            q.select(scope).into_iter().find_map(|el| {
                el.value()
                    .attr(attr)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(String::from)
            })
        })
    }
}

/// Per-field chains for one extraction mode.
#[derive(Debug, Clone)]
pub struct FieldChains {
    pub title: SelectorChain,
    pub price: SelectorChain,
    pub original_price: SelectorChain,
    pub rating: SelectorChain,
    pub review_count: SelectorChain,
    pub url: SelectorChain,
    pub seller: SelectorChain,
}

impl FieldChains {
    fn compile(mode: &str, spec: &FieldChainsSpec) -> Result<Self, LayoutError> {
        let chain = |field: &str, specs: &[QuerySpec]| {
            SelectorChain::compile(&format!("{mode}.{field}"), specs)
        };
        let title = chain("title", &spec.title)?;
        if title.is_empty() {
            return Err(LayoutError::EmptyChain(title.name().to_string()));
        }
        Ok(Self {
            title,
            price: chain("price", &spec.price)?,
            original_price: chain("original_price", &spec.original_price)?,
            rating: chain("rating", &spec.rating)?,
            review_count: chain("review_count", &spec.review_count)?,
            url: chain("url", &spec.url)?,
            seller: chain("seller", &spec.seller)?,
        })
    }
}

/// The full set of chains for one storefront.
#[derive(Debug, Clone)]
pub struct Layout {
    pub containers: SelectorChain,
    pub listing: FieldChains,
    pub detail: FieldChains,
    /// Selector that must be present before a detail page is captured.
    pub detail_ready: Option<String>,
}

impl Layout {
    /// The layout compiled into the binary.
    pub fn embedded() -> Result<Self, LayoutError> {
        Self::from_json(LAYOUTS_JSON)
    }

    pub fn from_json(json: &str) -> Result<Self, LayoutError> {
        let spec: LayoutSpec = serde_json::from_str(json)?;
        let containers = SelectorChain::compile("containers", &spec.containers)?;
        if containers.is_empty() {
            return Err(LayoutError::EmptyChain("containers".into()));
        }
        if let Some(ready) = &spec.detail.ready {
            Selector::parse(ready).map_err(|e| LayoutError::Selector {
                chain: "detail.ready".into(),
                selector: ready.clone(),
                message: e.to_string(),
            })?;
        }
        Ok(Self {
            containers,
            listing: FieldChains::compile("listing", &spec.listing)?,
            detail: FieldChains::compile("detail", &spec.detail.fields)?,
            detail_ready: spec.detail.ready,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, LayoutError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load `path` when given, otherwise the embedded layout.
    pub fn load(path: Option<&Path>) -> Result<Self, LayoutError> {
        match path {
            Some(p) => {
                tracing::info!("loading selector layout from {}", p.display());
                Self::from_file(p)
            }
            None => Self::embedded(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn chain(name: &str, specs: &[QuerySpec]) -> SelectorChain {
        SelectorChain::compile(name, specs).unwrap()
    }

    #[test]
    fn test_embedded_layout_compiles() {
        let layout = Layout::embedded().unwrap();
        assert_eq!(layout.containers.len(), 3);
        assert_eq!(layout.listing.title.len(), 3);
        assert!(layout.detail.url.is_empty());
        assert_eq!(layout.detail_ready.as_deref(), Some("span.VU-ZEz"));
    }

    #[test]
    fn test_bad_selector_is_rejected() {
        let json = r#"{
            "containers": [{ "css": "div[" }],
            "listing": { "title": [{ "css": "a" }] },
            "detail": { "title": [{ "css": "span" }] }
        }"#;
        match Layout::from_json(json) {
            Err(LayoutError::Selector { chain, selector, .. }) => {
                assert_eq!(chain, "containers");
                assert_eq!(selector, "div[");
            }
            other => panic!("expected selector error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_title_chain_is_rejected() {
        let json = r#"{
            "containers": [{ "css": "div" }],
            "listing": { "price": [{ "css": "b" }] },
            "detail": { "title": [{ "css": "span" }] }
        }"#;
        assert!(matches!(
            Layout::from_json(json),
            Err(LayoutError::EmptyChain(name)) if name == "listing.title"
        ));
    }

    #[test]
    fn test_first_level_does_not_merge_lower_levels() {
        let doc = Html::parse_document(
            r#"<div class="b">1</div><div class="a">2</div><div class="b">3</div>"#,
        );
        let c = chain(
            "t",
            &[
                QuerySpec::Css("div.a".into()),
                QuerySpec::Css("div.b".into()),
            ],
        );
        let (level, hits) = c.first_level(doc.root_element()).unwrap();
        assert_eq!(level, 0);
        assert_eq!(hits.len(), 1);
        assert_eq!(element_text(&hits[0]), "2");
    }

    #[test]
    fn test_first_text_skips_empty_matches() {
        let doc = Html::parse_document(
            r#"<div class="t"> </div><div class="t">Second</div><span class="u">Third</span>"#,
        );
        let c = chain(
            "t",
            &[QuerySpec::Css("div.t".into()), QuerySpec::Css("span.u".into())],
        );
        assert_eq!(c.first_text(doc.root_element()).as_deref(), Some("Second"));
    }

    #[test]
    fn test_class_contains_ignores_case() {
        let doc = Html::parse_document(
            r#"<div class="x"><div class="pdp-SellerBadge">RetailNet</div></div>"#,
        );
        let c = chain(
            "seller",
            &[QuerySpec::ClassContains {
                tag: Some("div".into()),
                needle: "seller".into(),
            }],
        );
        assert_eq!(c.first_text(doc.root_element()).as_deref(), Some("RetailNet"));
    }

    #[test]
    fn test_class_contains_respects_tag() {
        let doc = Html::parse_document(r#"<span class="seller">S</span>"#);
        let c = chain(
            "seller",
            &[QuerySpec::ClassContains {
                tag: Some("div".into()),
                needle: "seller".into(),
            }],
        );
        assert!(c.first_text(doc.root_element()).is_none());
    }

    #[test]
    fn test_first_attr() {
        let doc = Html::parse_document(r#"<a>no href</a><a href=" /p/1 ">go</a>"#);
        let c = chain("url", &[QuerySpec::Css("a".into())]);
        assert_eq!(c.first_attr(doc.root_element(), "href").as_deref(), Some("/p/1"));
    }
}
