pub mod form;
pub mod listing;
pub mod summary;

pub use listing::{extract, parse_listing};
pub use summary::{extract_summary, SummaryFetcher};

use scraper::ElementRef;

/// Rendered text of an element with whitespace runs collapsed.
pub(crate) fn visible_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
