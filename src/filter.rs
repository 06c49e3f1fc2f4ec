use crate::config::Config;
use crate::types::ChannelRecord;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// Why a channel was dropped. One per channel; the first failing check wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    SubscribersOutOfRange(u64),
    SubscribersUnreadable,
    ForeignRegion(String),
    NegativeSignal(String),
    NoUploadsPlaylist,
    NoUploads,
    TimestampUnreadable,
    Inactive { days_since_upload: i64 },
    RecencyUnavailable,
    NoEmail,
}

impl Rejection {
    /// Stable label for tallies and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Rejection::SubscribersOutOfRange(_) => "subscribers_out_of_range",
            Rejection::SubscribersUnreadable => "subscribers_unreadable",
            Rejection::ForeignRegion(_) => "foreign_region",
            Rejection::NegativeSignal(_) => "negative_signal",
            Rejection::NoUploadsPlaylist => "no_uploads_playlist",
            Rejection::NoUploads => "no_uploads",
            Rejection::TimestampUnreadable => "timestamp_unreadable",
            Rejection::Inactive { .. } => "inactive",
            Rejection::RecencyUnavailable => "recency_unavailable",
            Rejection::NoEmail => "no_email",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::SubscribersOutOfRange(n) => write!(f, "{} subscribers out of range", n),
            Rejection::SubscribersUnreadable => write!(f, "subscriber count missing or unreadable"),
            Rejection::ForeignRegion(c) => write!(f, "country {} not targeted", c),
            Rejection::NegativeSignal(term) => write!(f, "negative signal \"{}\"", term),
            Rejection::NoUploadsPlaylist => write!(f, "no uploads playlist"),
            Rejection::NoUploads => write!(f, "no uploads"),
            Rejection::TimestampUnreadable => write!(f, "upload timestamp unreadable"),
            Rejection::Inactive { days_since_upload } => {
                write!(f, "last upload {} days ago", days_since_upload)
            }
            Rejection::RecencyUnavailable => write!(f, "recency lookup failed"),
            Rejection::NoEmail => write!(f, "no email found"),
        }
    }
}

/// Count of rejections per [`Rejection::label`].
pub type RejectionTally = BTreeMap<&'static str, usize>;

pub fn tally(counts: &mut RejectionTally, rejection: &Rejection) {
    *counts.entry(rejection.label()).or_insert(0) += 1;
}

pub fn parse_subscribers(raw: Option<&str>) -> Result<u64, Rejection> {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .ok_or(Rejection::SubscribersUnreadable)
}

/// Inclusive on both ends.
pub fn check_subscribers(count: u64, config: &Config) -> Result<(), Rejection> {
    if count < config.min_subs || count > config.max_subs {
        return Err(Rejection::SubscribersOutOfRange(count));
    }
    Ok(())
}

/// Channels that do not declare a country pass; declared foreign ones do not.
pub fn check_region(country: Option<&str>, config: &Config) -> Result<(), Rejection> {
    match country.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) if !config.is_target_region(code) => {
            Err(Rejection::ForeignRegion(code.to_string()))
        }
        _ => Ok(()),
    }
}

/// First negative term contained in `text`, case-insensitively.
pub fn find_negative_signal<'a>(text: &str, negative: &'a [String]) -> Option<&'a str> {
    let text = text.to_lowercase();
    negative
        .iter()
        .map(String::as_str)
        .find(|term| !term.is_empty() && text.contains(&term.to_lowercase()))
}

pub fn check_content(title: &str, description: &str, config: &Config) -> Result<(), Rejection> {
    let text = format!("{} {}", title, description);
    match find_negative_signal(&text, &config.signals.negative) {
        Some(term) => Err(Rejection::NegativeSignal(term.to_string())),
        None => Ok(()),
    }
}

/// The checks that need no extra network call, in order: subscriber range,
/// region, negative content. Returns the parsed subscriber count.
pub fn screen(record: &ChannelRecord, config: &Config) -> Result<u64, Rejection> {
    let subs = parse_subscribers(record.subscriber_count.as_deref())?;
    check_subscribers(subs, config)?;
    check_region(record.country.as_deref(), config)?;
    check_content(&record.title, &record.description, config)?;
    Ok(subs)
}

pub fn parse_published_at(raw: &str) -> Result<DateTime<Utc>, Rejection> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| Rejection::TimestampUnreadable)
}

/// The newest upload must be at most `active_days` old at `now`.
pub fn check_activity(
    last_published: DateTime<Utc>,
    now: DateTime<Utc>,
    active_days: i64,
) -> Result<(), Rejection> {
    if last_published < now - Duration::days(active_days) {
        return Err(Rejection::Inactive {
            days_since_upload: (now - last_published).num_days(),
        });
    }
    Ok(())
}
