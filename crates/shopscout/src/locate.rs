//! Container locator: splits a listing page into per-product sub-trees.

use crate::selectors::SelectorChain;
use scraper::{ElementRef, Html};

/// One product's sub-tree in a listing page.
#[derive(Debug, Clone, Copy)]
pub struct Container<'a> {
    /// Zero-based position in locate order.
    pub index: usize,
    pub element: ElementRef<'a>,
}

/// Find product containers using the first level of `chain` that matches,
/// truncated to `max` in document order. Never fails; an empty result means
/// no known layout matched.
pub fn locate<'a>(doc: &'a Html, chain: &SelectorChain, max: usize) -> Vec<Container<'a>> {
    match chain.first_level(doc.root_element()) {
        Some((level, hits)) => {
            tracing::info!(
                "found {} product containers (layout level {level})",
                hits.len()
            );
            hits.into_iter()
                .take(max)
                .enumerate()
                .map(|(index, element)| Container { index, element })
                .collect()
        }
        None => {
            tracing::warn!("no product containers matched any of {} layouts", chain.len());
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::element_text;
    use crate::selectors::Layout;

    #[test]
    fn test_third_level_only() {
        let doc = Html::parse_document(
            r#"<div class="_1AtVbF">decoy</div>
               <div data-id="A">first</div>
               <div data-id="B">second</div>"#,
        );
        let layout = Layout::embedded().unwrap();
        let (level, _) = layout.containers.first_level(doc.root_element()).unwrap();
        assert_eq!(level, 2);
        let found = locate(&doc, &layout.containers, 10);
        let texts: Vec<_> = found.iter().map(|c| element_text(&c.element)).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn test_higher_level_wins_exclusively() {
        let doc = Html::parse_document(
            r#"<div class="tUxRFH cPHDOP col-12-12">new</div>
               <div data-id="A">generic</div>"#,
        );
        let layout = Layout::embedded().unwrap();
        let found = locate(&doc, &layout.containers, 10);
        assert_eq!(found.len(), 1);
        assert_eq!(element_text(&found[0].element), "new");
    }

    #[test]
    fn test_truncates_and_indexes_in_order() {
        let doc = Html::parse_document(
            r#"<div data-id="1">a</div><div data-id="2">b</div><div data-id="3">c</div>"#,
        );
        let layout = Layout::embedded().unwrap();
        let found = locate(&doc, &layout.containers, 2);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].index, 0);
        assert_eq!(found[1].index, 1);
        assert_eq!(element_text(&found[1].element), "b");
    }

    #[test]
    fn test_no_match_is_empty() {
        let doc = Html::parse_document("<p>nothing here</p>");
        let layout = Layout::embedded().unwrap();
        assert!(locate(&doc, &layout.containers, 5).is_empty());
    }
}
