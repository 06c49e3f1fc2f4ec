//! Daily run control flow
//!
//! Discovery, enrichment and contact extraction repeat with a widening page
//! budget until enough candidates survive, the quota runs out, the page
//! ceiling is reached, or no query has pages left. Survivors are then ranked
//! and cut to the daily target.

use crate::config::{Config, ContactPolicy};
use crate::contact::{ContactExtractor, PageFetcher};
use crate::discovery::Discovery;
use crate::enrich::{Enricher, Screened};
use crate::error::ApiResult;
use crate::export;
use crate::filter::{self, Rejection, RejectionTally};
use crate::quota::QuotaTracker;
use crate::retry::RetryPolicy;
use crate::sorter;
use crate::storage::Ledger;
use crate::types::Candidate;
use crate::youtube::ChannelSource;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::path::Path;
use tracing::{debug, info, warn};

/// Outcome of one run, written out by [`publish`].
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Ranked, at most the daily target.
    pub leads: Vec<Candidate>,
    pub keywords: usize,
    /// Deepest per-query page budget used.
    pub page_budget: u32,
    pub pages_fetched: u32,
    pub quota_used: u32,
    pub quota_budget: u32,
    pub quota_exhausted: bool,
    /// Unique, non-ledger ids discovered.
    pub discovered: usize,
    /// Candidates that passed every filter, before truncation.
    pub survivors: usize,
    pub rejections: RejectionTally,
}

impl RunReport {
    pub fn summary_line(&self, out_path: &Path) -> String {
        format!(
            "Saved: {} rows={} keywords={} page_budget={} pages={} search_calls={}/{} quota_exhausted={}",
            out_path.display(),
            self.leads.len(),
            self.keywords,
            self.page_budget,
            self.pages_fetched,
            self.quota_used,
            self.quota_budget,
            self.quota_exhausted
        )
    }

    /// Advice for when the run came up short of the daily target.
    pub fn shortfall_hint(&self, config: &Config) -> Option<String> {
        if self.leads.len() >= config.daily_target {
            return None;
        }
        let mut hints = Vec::new();
        if self.quota_exhausted {
            hints.push("quota ran out; run earlier in the quota day or lower expansion.max_pages");
        } else {
            hints.push("raise daily_keyword_count or expansion.max_pages");
        }
        hints.push("add keywords to the keyword pool");
        hints.push("widen min_subs/max_subs or active_days");
        if config.contact.policy == ContactPolicy::RequireEmail {
            hints.push("switch contact.policy to ranking_penalty");
        }
        Some(format!(
            "Only {} of {} leads found ({} survivors, {} discovered). Try: {}",
            self.leads.len(),
            config.daily_target,
            self.survivors,
            self.discovered,
            hints.join("; ")
        ))
    }
}

pub struct Pipeline<'a, S: ChannelSource + ?Sized, F: PageFetcher + ?Sized> {
    config: &'a Config,
    source: &'a S,
    fetcher: &'a F,
    quota: &'a QuotaTracker,
    retry: &'a RetryPolicy,
    now: DateTime<Utc>,
}

impl<'a, S: ChannelSource + ?Sized, F: PageFetcher + ?Sized> Pipeline<'a, S, F> {
    pub fn new(
        config: &'a Config,
        source: &'a S,
        fetcher: &'a F,
        quota: &'a QuotaTracker,
        retry: &'a RetryPolicy,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            config,
            source,
            fetcher,
            quota,
            retry,
            now,
        }
    }

    /// Build today's ranked leads from `keywords`. Ids in `ledger` are never
    /// considered. Quota exhaustion ends the run early with what was gathered;
    /// only credential errors are returned as `Err`.
    pub fn run(&self, keywords: &[String], ledger: &Ledger) -> ApiResult<RunReport> {
        let config = self.config;
        let expansion = &config.expansion;
        let window_start = self.now - Duration::days(config.lookback_days);

        let mut discovery = Discovery::new(self.source, self.quota, self.retry, config);
        let enricher = Enricher::new(self.source, self.quota, self.retry, config, self.now);
        let extractor = ContactExtractor::new(self.fetcher, self.retry, &config.contact);

        let mut report = RunReport {
            keywords: keywords.len(),
            quota_budget: self.quota.budget(),
            ..RunReport::default()
        };
        let mut pool: Vec<Candidate> = Vec::new();
        let max_pages = expansion.max_pages.max(1);
        let mut page_budget = expansion.initial_pages.clamp(1, max_pages);

        info!(
            keywords = keywords.len(),
            regions = config.target_regions.len(),
            ledger = ledger.len(),
            quota_budget = self.quota.budget(),
            "Starting discovery"
        );

        loop {
            report.page_budget = page_budget;
            let round = discovery.discover(
                keywords,
                &config.target_regions,
                window_start,
                page_budget,
                &|id| ledger.contains(id),
            )?;
            report.discovered += round.new_ids.len();

            let outcome = enricher.enrich(&round.new_ids, &mut report.rejections)?;
            for screened in outcome.accepted {
                match self.qualify(&extractor, screened) {
                    Ok(candidate) => pool.push(candidate),
                    Err((id, rejection)) => {
                        debug!(channel_id = %id, reason = %rejection, "Rejected");
                        filter::tally(&mut report.rejections, &rejection);
                    }
                }
            }

            report.quota_exhausted |=
                round.quota_exhausted || outcome.quota_exhausted || self.quota.is_exhausted();

            if pool.len() >= expansion.pool_threshold {
                info!(pool = pool.len(), page_budget, "Candidate pool large enough");
                break;
            }
            if report.quota_exhausted {
                warn!(pool = pool.len(), page_budget, "Quota exhausted, stopping expansion");
                break;
            }
            if page_budget >= max_pages {
                info!(pool = pool.len(), page_budget, "Page ceiling reached");
                break;
            }
            if round.open_queries == 0 {
                info!(pool = pool.len(), page_budget, "No query has pages left");
                break;
            }

            page_budget = (page_budget + expansion.page_step.max(1)).min(max_pages);
            info!(pool = pool.len(), page_budget, "Widening search");
        }

        report.pages_fetched = discovery.pages_fetched();
        report.quota_used = self.quota.consumed();
        report.survivors = pool.len();
        report.leads = sorter::select_top(pool, config.daily_target);

        for (reason, count) in &report.rejections {
            info!(reason = *reason, count = *count, "Rejection tally");
        }
        info!(
            leads = report.leads.len(),
            survivors = report.survivors,
            discovered = report.discovered,
            pages = report.pages_fetched,
            quota_used = report.quota_used,
            "Run complete"
        );
        Ok(report)
    }

    /// Contact extraction, the contact policy, then scoring.
    fn qualify(
        &self,
        extractor: &ContactExtractor<'_, F>,
        screened: Screened,
    ) -> Result<Candidate, (String, Rejection)> {
        let Screened {
            record,
            subscriber_count,
            last_published_at,
        } = screened;

        let report = extractor.extract(&record.id, &record.description);
        if self.config.contact.policy == ContactPolicy::RequireEmail && !report.contact.has_email()
        {
            return Err((record.id, Rejection::NoEmail));
        }

        let score = sorter::score_text(&report.text, &self.config.signals);
        Ok(Candidate {
            id: record.id,
            display_name: record.title,
            country: record.country,
            subscriber_count,
            last_published_at,
            contact: report.contact,
            score,
        })
    }
}

/// Write the leads file, then commit every emitted id to the ledger.
/// Returns how many ids were newly recorded.
pub fn publish(report: &RunReport, out_path: &Path, ledger: &mut Ledger) -> Result<usize> {
    export::write_leads_csv(out_path, &report.leads)?;
    let added = ledger.append(report.leads.iter().map(|c| c.id.as_str()))?;
    debug!(added, ledger = ledger.len(), "Ledger updated");
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line() {
        let report = RunReport {
            keywords: 16,
            page_budget: 12,
            pages_fetched: 40,
            quota_used: 40,
            quota_budget: 90,
            ..RunReport::default()
        };
        assert_eq!(
            report.summary_line(Path::new("out/youtube_leads_20240601.csv")),
            "Saved: out/youtube_leads_20240601.csv rows=0 keywords=16 page_budget=12 pages=40 search_calls=40/90 quota_exhausted=false"
        );
    }

    #[test]
    fn test_shortfall_hint() {
        let config = Config::default();
        let report = RunReport {
            quota_exhausted: true,
            ..RunReport::default()
        };
        let hint = report.shortfall_hint(&config).unwrap();
        assert!(hint.starts_with("Only 0 of 30 leads"));
        assert!(hint.contains("quota ran out"));
    }
}
