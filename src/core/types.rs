use serde::{Deserialize, Serialize};

use crate::filings::form;

/// Column names of the exported CSV, in output order.
pub const CSV_HEADERS: [&str; 8] = [
    "Date",
    "Time",
    "Symbol",
    "Form Type",
    "Company",
    "Title",
    "URL",
    "AI Summary",
];

/// One listing row that passed the amendment filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingRecord {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Time")]
    pub time: String,
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Form Type")]
    pub form_type: String,
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "AI Summary", default)]
    pub summary: String,
}

/// Records in page order. Duplicates are kept.
pub type FilingBatch = Vec<FilingRecord>;

impl FilingRecord {
    pub fn is_amendment(&self) -> bool {
        form::is_amendment(&self.form_type)
    }

    pub fn with_summary(self, summary: String) -> Self {
        Self { summary, ..self }
    }
}
