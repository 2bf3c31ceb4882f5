use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use scraper::{Html, Selector};
use url::Url;

use super::visible_text;
use crate::core::config::{compile_selectors, ConfigError};
use crate::utils::http::Transport;
use crate::utils::rate_limit::RateLimit;

/// Fetches AI summaries from filing detail pages.
///
/// Never fails: an empty URL, an unreachable page or a page without a
/// summary all yield an empty string, so one bad detail page cannot sink
/// the batch.
pub struct SummaryFetcher<R> {
    base: Url,
    selectors: Vec<Selector>,
    limiter: R,
}

impl<R: RateLimit> SummaryFetcher<R> {
    pub fn new(base: Url, selectors: &[String], limiter: R) -> Result<Self, ConfigError> {
        Ok(Self {
            base,
            selectors: compile_selectors(selectors)?,
            limiter,
        })
    }

    pub async fn fetch_summary<T>(&self, session: &T, detail_url: &str) -> String
    where
        T: Transport + ?Sized,
    {
        let detail_url = detail_url.trim();
        if detail_url.is_empty() {
            return String::new();
        }

        match self.try_fetch(session, detail_url).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Error getting AI summary for {}: {:#}", detail_url, e);
                String::new()
            }
        }
    }

    async fn try_fetch<T>(&self, session: &T, detail_url: &str) -> Result<String>
    where
        T: Transport + ?Sized,
    {
        let url = self
            .base
            .join(detail_url)
            .with_context(|| format!("invalid detail URL {:?}", detail_url))?;

        self.limiter.wait().await;

        let page = session.get(&url).await?;
        if !page.is_success() {
            return Err(anyhow!("HTTP {}", page.status));
        }

        let summary = extract_summary(&page.body, &self.selectors);
        if summary.is_empty() {
            debug!("No summary element on {}", url);
        }
        Ok(summary)
    }
}

/// Text of the first element matched by the highest-priority selector
/// that matches anything.
pub fn extract_summary(html: &str, selectors: &[Selector]) -> String {
    let document = Html::parse_document(html);
    selectors
        .iter()
        .find_map(|selector| document.select(selector).next())
        .map(visible_text)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ScraperConfig;

    fn default_selectors() -> Vec<Selector> {
        compile_selectors(&ScraperConfig::default().summary_selectors).unwrap()
    }

    #[test]
    fn test_ai_summary_wins_over_generic_summary() {
        let html = r#"
            <div class="summary-box">Generic</div>
            <div class="panel ai-summary-body"><p>Restated  revenue</p> <p>for FY2025.</p></div>"#;
        assert_eq!(
            extract_summary(html, &default_selectors()),
            "Restated revenue for FY2025."
        );
    }

    #[test]
    fn test_id_selector_used_when_no_class_matches() {
        let html = r#"<div id="filing-summary">By id</div><section class="summary">By class</section>"#;
        assert_eq!(extract_summary(html, &default_selectors()), "By id");
    }

    #[test]
    fn test_class_only_selector_is_last_resort() {
        let html = r#"<section class="summary">Section summary</section>"#;
        assert_eq!(extract_summary(html, &default_selectors()), "Section summary");
    }

    #[test]
    fn test_no_match_is_empty() {
        let html = "<html><body><p>Nothing to see</p></body></html>";
        assert_eq!(extract_summary(html, &default_selectors()), "");
    }
}
