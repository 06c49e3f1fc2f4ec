//! Candidate Discovery
//!
//! Expands every (region, keyword) pair into a paginated, date-ordered video
//! search and collects the channel ids behind the results. Each pair keeps a
//! cursor across calls, so raising the page budget only fetches the pages not
//! read yet.

use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::quota::QuotaTracker;
use crate::retry::RetryPolicy;
use crate::types::SearchQuery;
use crate::youtube::ChannelSource;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// What one discovery pass produced.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryRound {
    /// Ids never returned by an earlier pass and not excluded, in discovery order.
    pub new_ids: Vec<String>,
    pub pages_fetched: u32,
    /// Ids dropped because the caller already knows them (ledger, accepted pool).
    pub excluded: usize,
    /// Queries that can still yield more pages.
    pub open_queries: usize,
    pub quota_exhausted: bool,
}

#[derive(Debug, Default)]
struct Cursor {
    pages: u32,
    next_token: Option<String>,
    done: bool,
}

pub struct Discovery<'a, S: ChannelSource + ?Sized> {
    source: &'a S,
    quota: &'a QuotaTracker,
    retry: &'a RetryPolicy,
    page_size: u32,
    relevance_language: String,
    cursors: HashMap<(String, String), Cursor>,
    seen: HashSet<String>,
    pages_fetched: u32,
}

impl<'a, S: ChannelSource + ?Sized> Discovery<'a, S> {
    pub fn new(
        source: &'a S,
        quota: &'a QuotaTracker,
        retry: &'a RetryPolicy,
        config: &Config,
    ) -> Self {
        Self {
            source,
            quota,
            retry,
            page_size: config.search_page_size,
            relevance_language: config.relevance_language.clone(),
            cursors: HashMap::new(),
            seen: HashSet::new(),
            pages_fetched: 0,
        }
    }

    /// Total search pages read across all passes.
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Read each (region, keyword) query up to `page_budget` pages deep.
    ///
    /// A query stops early when the upstream returns no continuation token or
    /// its pages fail after retries. Quota exhaustion stops the whole pass and
    /// is reported, not raised. Only credential errors are returned as `Err`.
    pub fn discover(
        &mut self,
        keywords: &[String],
        regions: &[String],
        window_start: DateTime<Utc>,
        page_budget: u32,
        exclude: &dyn Fn(&str) -> bool,
    ) -> ApiResult<DiscoveryRound> {
        let mut round = DiscoveryRound::default();
        let source = self.source;
        let quota = self.quota;
        let retry = self.retry;

        'queries: for region in regions {
            for keyword in keywords {
                let query = SearchQuery {
                    keyword: keyword.clone(),
                    region: region.clone(),
                    published_after: window_start,
                    page_size: self.page_size,
                    relevance_language: self.relevance_language.clone(),
                };
                let cursor = self
                    .cursors
                    .entry((region.clone(), keyword.clone()))
                    .or_default();

                while !cursor.done && cursor.pages < page_budget {
                    if quota.remaining() == 0 {
                        round.quota_exhausted = true;
                        break 'queries;
                    }

                    let token = cursor.next_token.clone();
                    let result = retry.run("search", || {
                        quota.try_acquire()?;
                        source.search_page(&query, token.as_deref())
                    });

                    match result {
                        Ok(page) => {
                            cursor.pages += 1;
                            round.pages_fetched += 1;
                            for id in page.channel_ids {
                                if exclude(&id) {
                                    round.excluded += 1;
                                } else if self.seen.insert(id.clone()) {
                                    round.new_ids.push(id);
                                }
                            }
                            cursor.next_token = page.next_page_token;
                            if cursor.next_token.is_none() {
                                cursor.done = true;
                            }
                        }
                        Err(e) if e.is_quota() => {
                            quota.mark_exhausted();
                            round.quota_exhausted = true;
                            break 'queries;
                        }
                        Err(ApiError::Auth(msg)) => return Err(ApiError::Auth(msg)),
                        Err(e) => {
                            warn!(
                                keyword = %keyword,
                                region = %region,
                                page = cursor.pages + 1,
                                error = %e,
                                "Search failed, abandoning query"
                            );
                            cursor.done = true;
                        }
                    }
                }
                debug!(keyword = %keyword, region = %region, pages = cursor.pages, done = cursor.done, "Query cursor");
            }
        }

        self.pages_fetched += round.pages_fetched;
        round.open_queries = self.open_queries(keywords, regions);
        info!(
            page_budget,
            pages = round.pages_fetched,
            new_ids = round.new_ids.len(),
            excluded = round.excluded,
            open_queries = round.open_queries,
            quota_used = quota.consumed(),
            quota_budget = quota.budget(),
            "Discovery pass complete"
        );
        Ok(round)
    }

    fn open_queries(&self, keywords: &[String], regions: &[String]) -> usize {
        regions
            .iter()
            .flat_map(|r| keywords.iter().map(move |k| (r.clone(), k.clone())))
            .filter(|key| self.cursors.get(key).map_or(true, |c| !c.done))
            .count()
    }
}
