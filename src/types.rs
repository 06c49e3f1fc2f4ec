use chrono::{DateTime, Utc};
use serde::Serialize;

pub const CHANNEL_URL_BASE: &str = "https://www.youtube.com/channel/";
pub const HANDLE_URL_BASE: &str = "https://www.youtube.com/";

/// One paginated keyword search, scoped to a region and a publication window.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub keyword: String,
    pub region: String,
    pub published_after: DateTime<Utc>,
    pub page_size: u32,
    pub relevance_language: String,
}

/// Channel ids found on one search page, in result order.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub channel_ids: Vec<String>,
    pub next_page_token: Option<String>,
}

/// Channel metadata from one bulk lookup, before any filtering.
///
/// Numeric fields are kept as the raw strings the API sends; the filter
/// chain owns parsing them.
#[derive(Debug, Clone, Default)]
pub struct ChannelRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub country: Option<String>,
    pub subscriber_count: Option<String>,
    pub uploads_playlist: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contact {
    pub handle: Option<String>,
    pub emails: Vec<String>,
    pub websites: Vec<String>,
}

impl Contact {
    pub fn has_email(&self) -> bool {
        !self.emails.is_empty()
    }

    pub fn has_website(&self) -> bool {
        !self.websites.is_empty()
    }

    /// Best single way to reach the channel: first email, else first website.
    pub fn primary(&self) -> Option<&str> {
        self.emails
            .first()
            .or_else(|| self.websites.first())
            .map(String::as_str)
    }
}

/// A channel that passed every hard filter and has been scored.
///
/// `id` is the permanent key; `display_name` and `handle` can change upstream
/// and are never used for identity.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: String,
    pub display_name: String,
    pub country: Option<String>,
    pub subscriber_count: u64,
    pub last_published_at: DateTime<Utc>,
    pub contact: Contact,
    pub score: i32,
}

impl Candidate {
    pub fn channel_url(&self) -> String {
        format!("{}{}", CHANNEL_URL_BASE, self.id)
    }

    pub fn handle_url(&self) -> Option<String> {
        self.contact
            .handle
            .as_ref()
            .map(|h| format!("{}{}", HANDLE_URL_BASE, h))
    }
}

/// One row of the daily CSV. Field order is the column order.
#[derive(Debug, Clone, Serialize)]
pub struct LeadRow {
    pub channel_id: String,
    pub handle: String,
    pub channel_name: String,
    pub country: String,
    pub subs: u64,
    pub last_upload_utc: String,
    pub emails: String,
    pub websites: String,
    pub contact: String,
    pub score: i32,
    pub channel_url: String,
    pub handle_url: String,
}

impl From<&Candidate> for LeadRow {
    fn from(c: &Candidate) -> Self {
        Self {
            channel_id: c.id.clone(),
            handle: c.contact.handle.clone().unwrap_or_default(),
            channel_name: c.display_name.clone(),
            country: c.country.clone().unwrap_or_default(),
            subs: c.subscriber_count,
            last_upload_utc: c.last_published_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            emails: c.contact.emails.join("; "),
            websites: c.contact.websites.join("; "),
            contact: c.contact.primary().unwrap_or_default().to_string(),
            score: c.score,
            channel_url: c.channel_url(),
            handle_url: c.handle_url().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candidate(handle: Option<&str>, emails: &[&str], websites: &[&str]) -> Candidate {
        Candidate {
            id: "UC123".to_string(),
            display_name: "Gear Bench".to_string(),
            country: None,
            subscriber_count: 42_000,
            last_published_at: Utc.with_ymd_and_hms(2024, 5, 20, 10, 0, 0).unwrap(),
            contact: Contact {
                handle: handle.map(str::to_string),
                emails: emails.iter().map(|s| s.to_string()).collect(),
                websites: websites.iter().map(|s| s.to_string()).collect(),
            },
            score: 9,
        }
    }

    #[test]
    fn test_primary_contact_prefers_email() {
        let c = candidate(None, &["a@gear.io"], &["https://gear.io"]);
        assert_eq!(c.contact.primary(), Some("a@gear.io"));

        let c = candidate(None, &[], &["https://gear.io"]);
        assert_eq!(c.contact.primary(), Some("https://gear.io"));

        let c = candidate(None, &[], &[]);
        assert_eq!(c.contact.primary(), None);
    }

    #[test]
    fn test_lead_row_fields() {
        let c = candidate(Some("@gearbench"), &["a@gear.io", "b@gear.io"], &[]);
        let row = LeadRow::from(&c);
        assert_eq!(row.handle, "@gearbench");
        assert_eq!(row.handle_url, "https://www.youtube.com/@gearbench");
        assert_eq!(row.channel_url, "https://www.youtube.com/channel/UC123");
        assert_eq!(row.emails, "a@gear.io; b@gear.io");
        assert_eq!(row.contact, "a@gear.io");
        assert_eq!(row.last_upload_utc, "2024-05-20T10:00:00Z");
        assert_eq!(row.country, "");
    }

    #[test]
    fn test_lead_row_without_handle() {
        let row = LeadRow::from(&candidate(None, &[], &[]));
        assert_eq!(row.handle, "");
        assert_eq!(row.handle_url, "");
    }
}
