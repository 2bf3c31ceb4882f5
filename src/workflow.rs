use anyhow::Result;
use log::{error, info};
use std::path::{Path, PathBuf};
use strum::Display;
use url::Url;

use crate::auth::Authenticator;
use crate::core::config::{ColumnMap, ConfigError, Credentials, ScraperConfig};
use crate::core::types::FilingBatch;
use crate::export;
use crate::filings::{listing, SummaryFetcher};
use crate::utils::http::Transport;
use crate::utils::progress::ProgressTracker;
use crate::utils::rate_limit::RateLimit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Stage {
    Idle,
    Authenticating,
    Extracting,
    Enriching,
    Exporting,
    Done,
    Failed,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    /// Amendment records kept from the listing.
    pub retained: usize,
    /// Records whose detail page produced a summary.
    pub summarized: usize,
    /// `None` when nothing was retained and no file was written.
    pub output: Option<PathBuf>,
    pub records: FilingBatch,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Done(RunReport),
    Failed { stage: Stage, reason: String },
}

/// authenticate → extract → enrich → export, strictly in sequence.
pub struct Workflow<T, R> {
    session: T,
    authenticator: Authenticator,
    summaries: SummaryFetcher<R>,
    listing_url: Url,
    columns: ColumnMap,
    output_prefix: String,
    progress: ProgressTracker,
    stage: Stage,
}

impl<T: Transport, R: RateLimit> Workflow<T, R> {
    pub fn new(session: T, config: &ScraperConfig, limiter: R) -> Result<Self, ConfigError> {
        let base = config.base_url()?;
        Ok(Self {
            session,
            authenticator: Authenticator::new(base.clone(), config.login.clone()),
            summaries: SummaryFetcher::new(base, &config.summary_selectors, limiter)?,
            listing_url: config.listing_url()?,
            columns: config.columns.clone(),
            output_prefix: config.output_prefix.clone(),
            progress: ProgressTracker::hidden(),
            stage: Stage::Idle,
        })
    }

    pub fn with_progress(mut self, progress: ProgressTracker) -> Self {
        self.progress = progress;
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn session(&self) -> &T {
        &self.session
    }

    /// Runs once. Authentication, listing and export failures end the run
    /// as [`RunOutcome::Failed`] before any file is written; per-record
    /// summary failures only leave that record's summary empty.
    pub async fn run(&mut self, credentials: &Credentials, output: Option<&Path>) -> RunOutcome {
        self.enter(Stage::Authenticating);
        if !self
            .authenticator
            .authenticate(&self.session, credentials)
            .await
        {
            return self.fail("Failed to login. Please check credentials.".to_string());
        }

        self.enter(Stage::Extracting);
        let batch = match listing::extract(&self.session, &self.listing_url, &self.columns).await {
            Ok(batch) => batch,
            Err(e) => return self.fail(format!("{:#}", e)),
        };

        self.enter(Stage::Enriching);
        let records = self.enrich(batch).await;
        let summarized = records.iter().filter(|r| !r.summary.is_empty()).count();

        let output = if records.is_empty() {
            info!("No amendment filings found, nothing to export");
            None
        } else {
            self.enter(Stage::Exporting);
            match export::export(&records, output, &self.output_prefix) {
                Ok(path) => Some(path),
                Err(e) => return self.fail(format!("{:#}", e)),
            }
        };

        self.enter(Stage::Done);
        info!(
            "Run complete: {} amendments, {} with summaries",
            records.len(),
            summarized
        );
        RunOutcome::Done(RunReport {
            retained: records.len(),
            summarized,
            output,
            records,
        })
    }

    async fn enrich(&self, batch: FilingBatch) -> FilingBatch {
        self.progress.start(batch.len() as u64);

        let mut enriched = Vec::with_capacity(batch.len());
        for record in batch {
            self.progress.update_message(&record.form_type);
            let summary = self
                .summaries
                .fetch_summary(&self.session, &record.url)
                .await;
            enriched.push(record.with_summary(summary));
            self.progress.increment(1);
        }

        self.progress.finish();
        enriched
    }

    fn enter(&mut self, stage: Stage) {
        info!("{} -> {}", self.stage, stage);
        self.stage = stage;
    }

    fn fail(&mut self, reason: String) -> RunOutcome {
        let stage = self.stage;
        error!("{} failed: {}", stage, reason);
        self.stage = Stage::Failed;
        RunOutcome::Failed { stage, reason }
    }
}

/// Checks credentials, then opens a session and runs the workflow.
///
/// Credentials come from `env` and are validated before `open_session` is
/// called, so a configuration error ([`ConfigError`] inside the returned
/// error) means no request was sent and no file was written.
pub async fn launch<T, R, E, F>(
    env: E,
    config: &ScraperConfig,
    open_session: F,
    limiter: R,
    progress: ProgressTracker,
    output: Option<&Path>,
) -> Result<RunOutcome>
where
    T: Transport,
    R: RateLimit,
    E: Fn(&str) -> Option<String>,
    F: FnOnce() -> Result<T>,
{
    let credentials = Credentials::from_lookup(env)?;
    config.validate()?;

    let session = open_session()?;
    let mut workflow = Workflow::new(session, config, limiter)?.with_progress(progress);
    Ok(workflow.run(&credentials, output).await)
}
