//! Listing entry extraction from HTML.
//!
//! Separated from the network code so that the selector logic can be tested
//! against static HTML fixtures.

use crate::error::FetchError;
use scraper::{Html, Selector};
use std::collections::BTreeSet;

/// Compiled pair of card and label selectors.
#[derive(Debug, Clone)]
pub struct ItemSelectors {
    card: Selector,
    label: Selector,
}

impl ItemSelectors {
    /// Compile the two CSS selectors.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Parse`] if either selector is not valid CSS.
    pub fn new(card: &str, label: &str) -> Result<Self, FetchError> {
        let card = Selector::parse(card)
            .map_err(|e| FetchError::Parse(format!("invalid card selector: {e:?}")))?;
        let label = Selector::parse(label)
            .map_err(|e| FetchError::Parse(format!("invalid label selector: {e:?}")))?;
        Ok(Self { card, label })
    }
}

/// Extract the set of item identifiers from a listing page.
///
/// For every element matching the card selector, the text of its first
/// label element becomes an identifier. Whitespace runs are collapsed to a
/// single space; cards without a label or with a blank label are skipped.
/// A page with no matching cards yields an empty set, not an error.
pub fn parse_item_ids(html: &str, selectors: &ItemSelectors) -> BTreeSet<String> {
    let document = Html::parse_document(html);

    document
        .select(&selectors.card)
        .filter_map(|card| card.select(&selectors.label).next())
        .map(|label| normalize_label(&label.text().collect::<String>()))
        .filter(|label| !label.is_empty())
        .collect()
}

fn normalize_label(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
