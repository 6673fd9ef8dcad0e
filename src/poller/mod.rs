//! Polling loop
//!
//! Startup runs a backlog pass over the account's most recent statuses, then
//! the loop polls for statuses newer than the watermark, elaborates them and
//! sleeps a fixed interval. The watermark lives only in this loop; a restart
//! begins again with the backlog pass.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::channels::{AccountId, ChannelError, SocialClient, Status, StatusId, StatusQuery};
use crate::config::{ErrorPolicy, DEFAULT_BACKLOG_LIMIT, DEFAULT_POLL_INTERVAL_SECS};
use crate::elaborate::{Elaborate, ElaborateError, Elaboration};

/// Page size for steady-state polls (the Mastodon maximum).
pub const PAGE_LIMIT: u32 = 40;

/// Errors that stop the polling loop.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("platform request failed: {0}")]
    Channel(#[from] ChannelError),

    #[error("failed to elaborate status {status_id}: {source}")]
    Elaborate {
        status_id: StatusId,
        #[source]
        source: ElaborateError,
    },
}

/// Loop settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    pub interval: Duration,
    pub backlog_limit: u32,
    pub on_error: ErrorPolicy,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            backlog_limit: DEFAULT_BACKLOG_LIMIT,
            on_error: ErrorPolicy::FailFast,
        }
    }
}

/// Counters for one pass over a batch of statuses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub seen: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Watches one account and elaborates its statuses.
pub struct Poller<E> {
    social: Arc<dyn SocialClient>,
    elaborator: E,
    config: PollerConfig,
    account: AccountId,
    watermark: Option<StatusId>,
}

impl<E: Elaborate> Poller<E> {
    /// Resolve the authenticated account and build a poller for it.
    pub async fn connect(
        social: Arc<dyn SocialClient>,
        elaborator: E,
        config: PollerConfig,
    ) -> Result<Self, PollError> {
        let account = social.verify_credentials().await?;
        info!(account = %account.acct, id = %account.id, "Authenticated");
        Ok(Self {
            social,
            elaborator,
            config,
            account: account.id,
            watermark: None,
        })
    }

    /// Id of the newest status handled so far.
    pub fn watermark(&self) -> Option<&StatusId> {
        self.watermark.as_ref()
    }

    /// Elaborate the most recent statuses and set the initial watermark.
    ///
    /// The watermark becomes the id of the first status returned, which is
    /// the newest one. An empty account leaves it unset.
    pub async fn backlog(&mut self) -> Result<PassSummary, PollError> {
        let statuses = self
            .social
            .account_statuses(&self.account, &StatusQuery::latest(self.config.backlog_limit))
            .await?;
        info!(count = statuses.len(), "Scanning backlog");

        let summary = self.elaborate_all(&statuses).await?;
        self.watermark = statuses.first().map(|s| s.id.clone());
        Ok(summary)
    }

    /// Fetch and elaborate statuses newer than the watermark.
    ///
    /// Pages forward from the watermark until a short page comes back, so a
    /// burst larger than one page is still seen in full. Anything at or below
    /// the watermark is ignored even if the server returns it. Statuses are
    /// elaborated newest first and the watermark advances to the greatest id.
    pub async fn poll_once(&mut self) -> Result<PassSummary, PollError> {
        debug!(watermark = ?self.watermark, "Checking for new statuses");

        let statuses = match self.watermark.clone() {
            Some(mark) => self.fetch_after(mark).await?,
            None => {
                self.social
                    .account_statuses(&self.account, &StatusQuery::latest(self.config.backlog_limit))
                    .await?
            }
        };

        let summary = self.elaborate_all(&statuses).await?;
        if let Some(newest) = statuses.iter().map(|s| &s.id).max() {
            self.watermark = Some(newest.clone());
        }
        Ok(summary)
    }

    /// All statuses newer than `mark`, newest first.
    async fn fetch_after(&self, mark: StatusId) -> Result<Vec<Status>, PollError> {
        let mut statuses: Vec<Status> = Vec::new();
        let mut cursor = mark;
        loop {
            let page = self
                .social
                .account_statuses(&self.account, &StatusQuery::after(cursor.clone(), PAGE_LIMIT))
                .await?;
            let full = page.len() >= PAGE_LIMIT as usize;
            let fresh: Vec<Status> = page.into_iter().filter(|s| s.id > cursor).collect();

            match fresh.iter().map(|s| &s.id).max() {
                Some(newest) => cursor = newest.clone(),
                None => break,
            }
            statuses.extend(fresh);
            if !full {
                break;
            }
            debug!(cursor = %cursor, "Fetching next page of statuses");
        }
        statuses.sort_by(|a, b| b.id.cmp(&a.id));
        statuses.dedup_by(|a, b| a.id == b.id);
        Ok(statuses)
    }

    /// Backlog pass, then poll forever.
    ///
    /// Returns only when a request or (under [`ErrorPolicy::FailFast`]) an
    /// elaboration fails.
    pub async fn run(&mut self) -> Result<(), PollError> {
        self.backlog().await?;
        loop {
            let summary = self.poll_once().await?;
            if summary.seen > 0 {
                info!(
                    seen = summary.seen,
                    updated = summary.updated,
                    failed = summary.failed,
                    "Processed new statuses"
                );
            }
            tokio::time::sleep(self.config.interval).await;
        }
    }

    async fn elaborate_all(&self, statuses: &[Status]) -> Result<PassSummary, PollError> {
        let mut summary = PassSummary::default();
        for status in statuses {
            summary.seen += 1;
            match self.elaborator.elaborate(status).await {
                Ok(Elaboration::Updated { .. }) => summary.updated += 1,
                Ok(Elaboration::Unchanged) => {}
                Err(source) => match self.config.on_error {
                    ErrorPolicy::FailFast => {
                        return Err(PollError::Elaborate {
                            status_id: status.id.clone(),
                            source,
                        });
                    }
                    ErrorPolicy::SkipPost => {
                        error!(status_id = %status.id, error = %source, "Skipping status");
                        summary.failed += 1;
                    }
                },
            }
        }
        Ok(summary)
    }
}
