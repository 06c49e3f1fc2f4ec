//! Run configuration
//!
//! Every tunable lives in one immutable [`Config`] built at startup and passed
//! by reference to each stage. Defaults are the production values; a
//! `Config/leads.yaml` under the run root may override any subset of them.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "Config/leads.yaml";
pub const API_KEY_VAR: &str = "YOUTUBE_API_KEY";
/// Upper bound for `active_days` and `lookback_days`.
pub const MAX_WINDOW_DAYS: i64 = 3650;

/// What to do with a channel that exposes no email address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactPolicy {
    /// Keep it; contact presence only affects ranking.
    #[default]
    RankingPenalty,
    /// Drop it before ranking.
    RequireEmail,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignalWeights {
    pub positive: i32,
    pub sponsor: i32,
    pub brand: i32,
    pub negative: i32,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            positive: 2,
            sponsor: 3,
            brand: 2,
            negative: -8,
        }
    }
}

/// Weighted substring lists used for scoring and the negative-content veto.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignalLists {
    /// Product-fit terms: reviews, gear, travel, outdoor.
    pub positive: Vec<String>,
    /// Channels that already take sponsorships or run affiliate links.
    pub sponsor: Vec<String>,
    /// Our brand, competitors and adjacent brands.
    pub brands: Vec<String>,
    /// Off-topic content. Any hit in title/description is a hard reject.
    pub negative: Vec<String>,
    pub weights: SignalWeights,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for SignalLists {
    fn default() -> Self {
        Self {
            positive: strings(&[
                "review", "tested", "testing", "comparison", "vs", "unboxing", "hands on",
                "buying guide", "tech", "gadget", "gear", "edc", "outdoor", "camping", "travel",
                "packing", "disney", "theme park", "summer essentials", "hot weather",
            ]),
            sponsor: strings(&[
                "sponsored", "paid promotion", "partner", "thanks to", "in collaboration with",
                "affiliate", "amazon storefront", "commission", "use my code", "discount code",
                "promo code",
            ]),
            brands: strings(&[
                "warmco", "anker", "ugreen", "belkin", "spigen", "baseus", "dreo", "jisulife",
                "torras", "opolar", "gaiatop", "koonie", "comlife", "coleman", "yeti",
                "patagonia", "thenorthface", "rei",
            ]),
            negative: strings(&[
                "prank", "pranks", "funny", "comedy", "meme", "memes", "troll", "skit", "joke",
                "parody", "reaction", "reacts", "compilation",
            ]),
            weights: SignalWeights::default(),
        }
    }
}

/// Daily unit budget of the upstream API and what one search call costs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QuotaConfig {
    pub daily_units: u32,
    pub search_cost: u32,
    /// Fraction of the theoretical call budget we allow ourselves.
    pub safety_factor: f64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_units: 10_000,
            search_cost: 100,
            safety_factor: 0.9,
        }
    }
}

impl QuotaConfig {
    /// Search calls we may issue today.
    pub fn call_budget(&self) -> u32 {
        if self.search_cost == 0 {
            return 0;
        }
        let theoretical = self.daily_units / self.search_cost;
        (theoretical as f64 * self.safety_factor).floor() as u32
    }
}

/// Adaptive widening of search pagination.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExpansionConfig {
    pub initial_pages: u32,
    pub page_step: u32,
    pub max_pages: u32,
    /// Stop widening once this many candidates survived every filter.
    pub pool_threshold: usize,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            initial_pages: 8,
            page_step: 4,
            max_pages: 20,
            pool_threshold: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContactConfig {
    pub policy: ContactPolicy,
    pub max_websites: usize,
    /// Pause between profile page variants of the same channel.
    pub fetch_delay_ms: u64,
    pub user_agent: String,
    pub accept_language: String,
    pub excluded_email_domains: Vec<String>,
    pub excluded_website_domains: Vec<String>,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            policy: ContactPolicy::default(),
            max_websites: 5,
            fetch_delay_ms: 200,
            user_agent: "Mozilla/5.0".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            excluded_email_domains: strings(&[
                "example.com", "example.org", "example.net", "domain.com", "email.com",
                "yourdomain.com", "yourname.com",
            ]),
            excluded_website_domains: strings(&[
                "youtube.com", "youtu.be", "ytimg.com", "ggpht.com", "googlevideo.com",
                "google.com", "gstatic.com", "googleapis.com", "googleusercontent.com",
                "googletagmanager.com", "doubleclick.net", "w3.org", "schema.org", "apple.com",
                "googleadservices.com", "googlesyndication.com", "google-analytics.com",
                "youtubekids.com", "youtube-nocookie.com", "blog.youtube", "withgoogle.com",
                "gvt1.com", "gvt2.com", "ampproject.org", "ogp.me",
            ]),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub max_jitter_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 25,
            max_retries: 3,
            base_backoff_ms: 500,
            max_jitter_ms: 250,
        }
    }
}

/// File locations, relative to the run root unless absolute.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    pub keyword_pool: PathBuf,
    pub ledger: PathBuf,
    pub out_dir: PathBuf,
    /// Prefix of the output file name.
    pub source_label: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            keyword_pool: PathBuf::from("keyword_pool.txt"),
            ledger: PathBuf::from("done_channel_ids.txt"),
            out_dir: PathBuf::from("out"),
            source_label: "youtube".to_string(),
        }
    }
}

impl PathsConfig {
    pub fn resolve(&self, root: &Path) -> Self {
        Self {
            keyword_pool: root.join(&self.keyword_pool),
            ledger: root.join(&self.ledger),
            out_dir: root.join(&self.out_dir),
            source_label: self.source_label.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub daily_target: usize,
    pub min_subs: u64,
    pub max_subs: u64,
    pub target_regions: Vec<String>,
    /// A channel must have published within this many days.
    pub active_days: i64,
    /// Search only returns videos newer than this many days.
    pub lookback_days: i64,
    pub daily_keyword_count: usize,
    pub relevance_language: String,
    pub search_page_size: u32,
    pub metadata_batch_size: usize,
    pub quota: QuotaConfig,
    pub expansion: ExpansionConfig,
    pub contact: ContactConfig,
    pub signals: SignalLists,
    pub http: HttpConfig,
    pub paths: PathsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daily_target: 30,
            min_subs: 5_000,
            max_subs: 200_000,
            target_regions: strings(&["US", "GB", "DE"]),
            active_days: 120,
            lookback_days: 180,
            daily_keyword_count: 16,
            relevance_language: "en".to_string(),
            search_page_size: 50,
            metadata_batch_size: 50,
            quota: QuotaConfig::default(),
            expansion: ExpansionConfig::default(),
            contact: ContactConfig::default(),
            signals: SignalLists::default(),
            http: HttpConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Config {
    /// Load defaults, apply `Config/leads.yaml` under `root` if present, validate.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        let config = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            Self::from_yaml(&content)
                .with_context(|| format!("Failed to parse config {:?}", path))?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.daily_target == 0 {
            bail!("daily_target must be at least 1");
        }
        if self.min_subs > self.max_subs {
            bail!(
                "min_subs ({}) is greater than max_subs ({})",
                self.min_subs,
                self.max_subs
            );
        }
        if self.target_regions.is_empty() {
            bail!("target_regions must not be empty");
        }
        if self.search_page_size == 0 || self.metadata_batch_size == 0 {
            bail!("search_page_size and metadata_batch_size must be positive");
        }
        if !(self.quota.safety_factor > 0.0 && self.quota.safety_factor <= 1.0) {
            bail!(
                "quota.safety_factor must be in (0, 1], got {}",
                self.quota.safety_factor
            );
        }
        if self.quota.search_cost == 0 {
            bail!("quota.search_cost must be positive");
        }
        if self.expansion.initial_pages == 0 || self.expansion.max_pages == 0 {
            bail!("expansion page counts must be positive");
        }
        if self.active_days <= 0 || self.lookback_days <= 0 {
            bail!("active_days and lookback_days must be positive");
        }
        if self.active_days > MAX_WINDOW_DAYS || self.lookback_days > MAX_WINDOW_DAYS {
            bail!(
                "active_days and lookback_days must not exceed {} days",
                MAX_WINDOW_DAYS
            );
        }
        Ok(())
    }

    /// Present-but-foreign is a reject; absent is not. Callers handle absence.
    pub fn is_target_region(&self, code: &str) -> bool {
        self.target_regions
            .iter()
            .any(|r| r.eq_ignore_ascii_case(code.trim()))
    }
}

/// Read the API credential. Missing or blank is a startup error.
pub fn api_key_from_env() -> Result<String> {
    let key = env::var(API_KEY_VAR).unwrap_or_default();
    let key = key.trim();
    if key.is_empty() {
        bail!("Missing env {}", API_KEY_VAR);
    }
    Ok(key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_call_budget() {
        // 10_000 units / 100 per search = 100 calls, 90% of that
        assert_eq!(QuotaConfig::default().call_budget(), 90);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_yaml_overrides_subset() {
        let yaml = r#"
daily_target: 12
min_subs: 1000
contact:
  policy: require_email
expansion:
  max_pages: 12
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.daily_target, 12);
        assert_eq!(config.min_subs, 1000);
        assert_eq!(config.max_subs, 200_000);
        assert_eq!(config.contact.policy, ContactPolicy::RequireEmail);
        assert_eq!(config.contact.max_websites, 5);
        assert_eq!(config.expansion.max_pages, 12);
        assert_eq!(config.expansion.initial_pages, 8);
        assert_eq!(config.target_regions, vec!["US", "GB", "DE"]);
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let config = Config {
            min_subs: 10,
            max_subs: 5,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_safety_factor() {
        let mut config = Config::default();
        config.quota.safety_factor = 1.5;
        assert!(config.validate().is_err());
        config.quota.safety_factor = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_windows() {
        let config = Config {
            lookback_days: i64::MAX,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config::from_yaml("active_days: 100000000000000").unwrap();
        assert!(config.validate().is_err());

        let config = Config {
            active_days: MAX_WINDOW_DAYS,
            lookback_days: MAX_WINDOW_DAYS,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_is_target_region_case_insensitive() {
        let config = Config::default();
        assert!(config.is_target_region("us"));
        assert!(config.is_target_region("GB"));
        assert!(!config.is_target_region("FR"));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.daily_target, 30);
    }

    #[test]
    fn test_load_reads_yaml_under_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Config")).unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "daily_target: 7\n").unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.daily_target, 7);
    }

    #[test]
    fn test_paths_resolve_against_root() {
        let paths = PathsConfig::default().resolve(Path::new("/srv/leads"));
        assert_eq!(paths.ledger, PathBuf::from("/srv/leads/done_channel_ids.txt"));
        assert_eq!(paths.out_dir, PathBuf::from("/srv/leads/out"));
    }
}
