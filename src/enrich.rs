//! Metadata Enrichment
//!
//! Looks discovered ids up in fixed-size batches and runs the filter chain on
//! each returned channel. The cheap checks run first; only survivors pay for
//! the per-channel recency lookup.

use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::filter::{self, Rejection, RejectionTally};
use crate::quota::QuotaTracker;
use crate::retry::RetryPolicy;
use crate::types::ChannelRecord;
use crate::youtube::ChannelSource;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// A channel that passed every metadata filter.
#[derive(Debug, Clone)]
pub struct Screened {
    pub record: ChannelRecord,
    pub subscriber_count: u64,
    pub last_published_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct EnrichOutcome {
    pub accepted: Vec<Screened>,
    pub looked_up: usize,
    /// Enrichment stopped early; `accepted` holds what was screened before.
    pub quota_exhausted: bool,
}

pub struct Enricher<'a, S: ChannelSource + ?Sized> {
    source: &'a S,
    quota: &'a QuotaTracker,
    retry: &'a RetryPolicy,
    config: &'a Config,
    now: DateTime<Utc>,
}

enum Recency {
    Active(DateTime<Utc>),
    Rejected(Rejection),
    QuotaExhausted,
}

impl<'a, S: ChannelSource + ?Sized> Enricher<'a, S> {
    pub fn new(
        source: &'a S,
        quota: &'a QuotaTracker,
        retry: &'a RetryPolicy,
        config: &'a Config,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            source,
            quota,
            retry,
            config,
            now,
        }
    }

    /// Screen `ids` in batches. Results keep the order of `ids`.
    ///
    /// Per-channel failures land in `rejections`; a failed batch lookup is
    /// skipped. Quota exhaustion ends the pass and is reported in the outcome.
    /// Only credential errors are returned as `Err`.
    pub fn enrich(&self, ids: &[String], rejections: &mut RejectionTally) -> ApiResult<EnrichOutcome> {
        let mut outcome = EnrichOutcome::default();
        let batch_size = self.config.metadata_batch_size.max(1);

        'batches: for batch in ids.chunks(batch_size) {
            let records = match self.retry.run("channels", || self.source.channels(batch)) {
                Ok(records) => records,
                Err(e) if e.is_quota() => {
                    self.quota.mark_exhausted();
                    outcome.quota_exhausted = true;
                    break;
                }
                Err(ApiError::Auth(msg)) => return Err(ApiError::Auth(msg)),
                Err(e) => {
                    warn!(batch = batch.len(), error = %e, "Channel lookup failed, skipping batch");
                    continue;
                }
            };

            let requested: HashSet<&str> = batch.iter().map(String::as_str).collect();
            let mut ordered = records;
            ordered.retain(|r| requested.contains(r.id.as_str()));
            ordered.sort_by_key(|r| batch.iter().position(|id| *id == r.id));
            ordered.dedup_by(|a, b| a.id == b.id);
            outcome.looked_up += ordered.len();

            for record in ordered {
                let subs = match filter::screen(&record, self.config) {
                    Ok(subs) => subs,
                    Err(rejection) => {
                        debug!(channel_id = %record.id, reason = %rejection, "Rejected");
                        filter::tally(rejections, &rejection);
                        continue;
                    }
                };

                match self.recency(&record) {
                    Recency::Active(last_published_at) => outcome.accepted.push(Screened {
                        record,
                        subscriber_count: subs,
                        last_published_at,
                    }),
                    Recency::Rejected(rejection) => {
                        debug!(channel_id = %record.id, reason = %rejection, "Rejected");
                        filter::tally(rejections, &rejection);
                    }
                    Recency::QuotaExhausted => {
                        self.quota.mark_exhausted();
                        outcome.quota_exhausted = true;
                        break 'batches;
                    }
                }
            }
        }

        info!(
            requested = ids.len(),
            looked_up = outcome.looked_up,
            accepted = outcome.accepted.len(),
            quota_exhausted = outcome.quota_exhausted,
            "Enrichment pass complete"
        );
        Ok(outcome)
    }

    fn recency(&self, record: &ChannelRecord) -> Recency {
        let Some(playlist) = record.uploads_playlist.as_deref() else {
            return Recency::Rejected(Rejection::NoUploadsPlaylist);
        };

        let raw = match self.retry.run("playlistItems", || self.source.latest_upload(playlist)) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Recency::Rejected(Rejection::NoUploads),
            Err(e) if e.is_quota() => return Recency::QuotaExhausted,
            Err(e) => {
                warn!(channel_id = %record.id, error = %e, "Recency lookup failed");
                return Recency::Rejected(Rejection::RecencyUnavailable);
            }
        };

        let published = match filter::parse_published_at(&raw) {
            Ok(dt) => dt,
            Err(rejection) => return Recency::Rejected(rejection),
        };
        match filter::check_activity(published, self.now, self.config.active_days) {
            Ok(()) => Recency::Active(published),
            Err(rejection) => Recency::Rejected(rejection),
        }
    }
}
