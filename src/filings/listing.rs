use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{form, visible_text};
use crate::core::config::ColumnMap;
use crate::core::types::{FilingBatch, FilingRecord};
use crate::utils::http::Transport;

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").unwrap());
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td, th").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static CLASSED_DIV: Lazy<Selector> = Lazy::new(|| Selector::parse("div[class]").unwrap());
static CONTAINER_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new("filing|row|item").unwrap());

/// Fetches the listing page and returns its amendment filings.
///
/// The listing is the only data source, so a transport error or a non-2xx
/// status fails the whole extraction. Problems with individual rows are
/// logged and the row is dropped.
pub async fn extract<T>(session: &T, listing_url: &Url, columns: &ColumnMap) -> Result<FilingBatch>
where
    T: Transport + ?Sized,
{
    info!("Fetching SEC filings from {}", listing_url);

    let page = session
        .get(listing_url)
        .await
        .with_context(|| format!("failed to fetch listing page {}", listing_url))?;
    if !page.is_success() {
        return Err(anyhow!(
            "listing page {} returned HTTP {}",
            listing_url,
            page.status
        ));
    }

    let batch = parse_listing(&page.body, &page.url, columns);
    info!("Listing yielded {} amendment filings", batch.len());
    Ok(batch)
}

/// Parses listing markup into amendment records, in document order.
///
/// Table rows are tried first; generic filing containers are only scanned
/// when no table row survives the amendment filter. Links are resolved
/// against `base`.
pub fn parse_listing(html: &str, base: &Url, columns: &ColumnMap) -> FilingBatch {
    let document = Html::parse_document(html);

    let batch = parse_tables(&document, base, columns);
    if !batch.is_empty() {
        return batch;
    }

    debug!("No amendment rows in tables, trying filing containers");
    parse_containers(&document, base)
}

fn parse_tables(document: &Html, base: &Url, columns: &ColumnMap) -> FilingBatch {
    let mut batch = Vec::new();

    for (table_idx, table) in document.select(&TABLE).enumerate() {
        // First row is the header.
        for (row_idx, row) in table.select(&ROW).enumerate().skip(1) {
            let cells: Vec<String> = row.select(&CELL).map(visible_text).collect();
            if cells.len() < columns.min_cells {
                debug!(
                    "Table {} row {}: {} cells, need {}",
                    table_idx,
                    row_idx,
                    cells.len(),
                    columns.min_cells
                );
                continue;
            }

            match parse_row(&cells, row, base, columns) {
                Ok(Some(record)) => {
                    info!(
                        "Found amendment: {} (amends {}) - {}",
                        record.form_type,
                        form::base_form(&record.form_type),
                        record.company
                    );
                    batch.push(record);
                }
                Ok(None) => {}
                Err(e) => warn!("Error parsing table {} row {}: {:#}", table_idx, row_idx, e),
            }
        }
    }

    batch
}

fn parse_row(
    cells: &[String],
    row: ElementRef<'_>,
    base: &Url,
    columns: &ColumnMap,
) -> Result<Option<FilingRecord>> {
    let form_type = cells.get(columns.form_type).ok_or_else(|| {
        anyhow!(
            "form type column {} missing from {} cells",
            columns.form_type,
            cells.len()
        )
    })?;
    if !form::is_amendment(form_type) {
        return Ok(None);
    }

    let cell = |idx: usize| cells.get(idx).cloned().unwrap_or_default();
    Ok(Some(FilingRecord {
        date: cell(columns.date),
        time: cell(columns.time),
        symbol: cell(columns.symbol),
        form_type: form_type.clone(),
        company: cell(columns.company),
        title: cell(columns.title),
        url: first_link(row, base)?,
        summary: String::new(),
    }))
}

fn parse_containers(document: &Html, base: &Url) -> FilingBatch {
    let mut batch = Vec::new();

    for (idx, container) in document.select(&CLASSED_DIV).enumerate() {
        let classes = container.value().attr("class").unwrap_or_default();
        if !classes
            .split_whitespace()
            .any(|class| CONTAINER_CLASS.is_match(class))
        {
            continue;
        }

        let text = visible_text(container);
        if !text.contains(form::AMENDMENT_MARKER) {
            continue;
        }

        match parse_container(container, &text, base) {
            Ok(Some(record)) => {
                info!("Found amendment in container: {}", record.form_type);
                batch.push(record);
            }
            Ok(None) => {}
            Err(e) => warn!("Error parsing filing container {}: {:#}", idx, e),
        }
    }

    batch
}

fn parse_container(
    container: ElementRef<'_>,
    text: &str,
    base: &Url,
) -> Result<Option<FilingRecord>> {
    let Some(form_type) = form::find_amendment(text) else {
        return Ok(None);
    };

    // The form token itself contains capitals ("K", "A") that would
    // otherwise pass for a ticker.
    let remainder = text.replacen(form_type, " ", 1);
    let symbol = form::find_ticker(&remainder).unwrap_or_default().to_string();

    Ok(Some(FilingRecord {
        symbol,
        form_type: form_type.to_string(),
        url: first_link(container, base)?,
        ..Default::default()
    }))
}

/// Absolute URL of the first link inside `element`, or empty if none.
fn first_link(element: ElementRef<'_>, base: &Url) -> Result<String> {
    let href = element
        .select(&LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::trim)
        .unwrap_or_default();
    if href.is_empty() {
        return Ok(String::new());
    }

    base.join(href)
        .map(|url| url.to_string())
        .with_context(|| format!("unresolvable link {:?}", href))
}
