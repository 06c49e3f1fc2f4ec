//! Contact Extractor
//!
//! Best-effort, pattern-based extraction of a handle, email addresses and
//! outbound websites from a channel's description and public profile markup.
//! Page fetches go through [`PageFetcher`] so the markup source can be swapped
//! for a structured one without touching the pipeline. Nothing here rejects a
//! channel; missing data just comes back empty.

use crate::config::{Config, ContactConfig};
use crate::error::{ApiError, ApiResult};
use crate::retry::RetryPolicy;
use crate::types::Contact;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT_LANGUAGE;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

static CANONICAL_HANDLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""canonicalBaseUrl"\s*:\s*"/(@[^"/?]+)""#).unwrap()
});

static VANITY_HANDLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""vanityChannelUrl"\s*:\s*"https?://www\.youtube\.com/(@[^"/?]+)""#).unwrap()
});

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+").unwrap()
});

static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https?://[^\s"'<>\\]+"#).unwrap()
});

/// Matches that look like emails but are retina asset names (`logo@2x.png`).
const ASSET_SUFFIXES: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg"];

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', ')', ']', '}', '!', '?'];

/// Fetches one public page as text.
pub trait PageFetcher {
    fn fetch(&self, url: &str) -> ApiResult<String>;
}

pub struct HttpPageFetcher {
    http: Client,
    accept_language: String,
}

impl HttpPageFetcher {
    pub fn new(config: &Config) -> ApiResult<Self> {
        let http = Client::builder()
            .user_agent(config.contact.user_agent.as_str())
            .timeout(Duration::from_secs(config.http.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            accept_language: config.contact.accept_language.clone(),
        })
    }
}

impl PageFetcher for HttpPageFetcher {
    fn fetch(&self, url: &str) -> ApiResult<String> {
        let resp = self
            .http
            .get(url)
            .header(ACCEPT_LANGUAGE, self.accept_language.as_str())
            .send()?;
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(ApiError::from_response(status.as_u16(), &body));
        }
        Ok(body)
    }
}

/// Profile page variants, most useful first.
pub fn profile_urls(channel_id: &str) -> [String; 2] {
    [
        format!("https://www.youtube.com/channel/{}/about", channel_id),
        format!("https://www.youtube.com/channel/{}", channel_id),
    ]
}

#[derive(Debug, Clone, Default)]
pub struct ProfilePage {
    pub handle: Option<String>,
    /// Markup of the about variant; empty when it could not be fetched.
    pub about_html: String,
}

#[derive(Debug, Clone, Default)]
pub struct ContactReport {
    pub contact: Contact,
    /// Description plus about markup; what the scorer reads.
    pub text: String,
}

pub struct ContactExtractor<'a, F: PageFetcher + ?Sized> {
    fetcher: &'a F,
    retry: &'a RetryPolicy,
    config: &'a ContactConfig,
}

impl<'a, F: PageFetcher + ?Sized> ContactExtractor<'a, F> {
    pub fn new(fetcher: &'a F, retry: &'a RetryPolicy, config: &'a ContactConfig) -> Self {
        Self {
            fetcher,
            retry,
            config,
        }
    }

    /// Walk the profile variants until a handle and about markup are both known.
    /// Fetch failures are logged and skipped.
    pub fn fetch_profile(&self, channel_id: &str) -> ProfilePage {
        let mut page = ProfilePage::default();
        let delay = Duration::from_millis(self.config.fetch_delay_ms);

        for (i, url) in profile_urls(channel_id).iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                std::thread::sleep(delay);
            }
            let html = match self.retry.run("profile page", || self.fetcher.fetch(url)) {
                Ok(html) => html,
                Err(e) => {
                    info!(channel_id, url = %url, error = %e, "Profile page unavailable");
                    continue;
                }
            };

            if page.handle.is_none() {
                page.handle = extract_handle(&html);
            }
            if i == 0 {
                page.about_html = html;
            }
            if page.handle.is_some() && !page.about_html.is_empty() {
                break;
            }
        }

        debug!(
            channel_id,
            handle = page.handle.as_deref().unwrap_or(""),
            about_bytes = page.about_html.len(),
            "Profile fetched"
        );
        page
    }

    pub fn extract(&self, channel_id: &str, description: &str) -> ContactReport {
        let page = self.fetch_profile(channel_id);
        let text = format!("{}\n{}", description, page.about_html);
        let contact = Contact {
            handle: page.handle,
            emails: extract_emails(&text, &self.config.excluded_email_domains),
            websites: extract_websites(
                &text,
                &self.config.excluded_website_domains,
                self.config.max_websites,
            ),
        };
        ContactReport { contact, text }
    }
}

/// First handle found, trying the canonical URL before the vanity URL.
/// The leading `@` is kept.
pub fn extract_handle(html: &str) -> Option<String> {
    [&*CANONICAL_HANDLE_REGEX, &*VANITY_HANDLE_REGEX]
        .iter()
        .find_map(|re| re.captures(html))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Emails in order of first appearance, deduplicated case-insensitively.
pub fn extract_emails(text: &str, excluded_domains: &[String]) -> Vec<String> {
    let text = unescape_markup(text);
    let mut seen = HashSet::new();
    let mut emails = Vec::new();

    for m in EMAIL_REGEX.find_iter(&text) {
        let email = m.as_str().trim_end_matches(['.', '-']);
        let lower = email.to_lowercase();
        let Some((_, domain)) = lower.rsplit_once('@') else {
            continue;
        };
        if !domain.contains('.') {
            continue;
        }
        if ASSET_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
            continue;
        }
        if excluded_domains.iter().any(|d| host_matches(domain, d)) {
            continue;
        }
        if seen.insert(lower) {
            emails.push(email.to_string());
        }
    }
    emails
}

/// Outbound websites in order of first appearance, at most `max`.
///
/// Platform redirect links are unwrapped to their target before the domain
/// exclusion list is applied.
pub fn extract_websites(text: &str, excluded_domains: &[String], max: usize) -> Vec<String> {
    let text = unescape_markup(text);
    let mut seen = HashSet::new();
    let mut sites = Vec::new();

    for m in URL_REGEX.find_iter(&text) {
        if sites.len() >= max {
            break;
        }
        let raw = m.as_str().trim_end_matches(TRAILING_PUNCTUATION);
        let Ok(parsed) = Url::parse(raw) else {
            continue;
        };
        let Some(target) = unwrap_redirect(parsed) else {
            continue;
        };
        let Some(host) = target.host_str().map(str::to_lowercase) else {
            continue;
        };
        if excluded_domains.iter().any(|d| host_matches(&host, d)) {
            continue;
        }
        let site = target.to_string();
        if seen.insert(site.to_lowercase()) {
            sites.push(site);
        }
    }
    sites
}

/// Undoes the JSON and HTML escapes profile pages wrap their text in.
fn unescape_markup(text: &str) -> String {
    const ESCAPES: &[(&str, &str)] = &[
        ("\\n", "\n"),
        ("\\r", "\n"),
        ("\\t", " "),
        ("\\\"", "\""),
        ("\\/", "/"),
        ("\\u0026", "&"),
        ("\\u003c", "<"),
        ("\\u003C", "<"),
        ("\\u003e", ">"),
        ("\\u003E", ">"),
        ("\\u0040", "@"),
        ("\\u003d", "="),
        ("\\u003D", "="),
        ("&amp;", "&"),
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#64;", "@"),
    ];
    ESCAPES
        .iter()
        .fold(text.to_string(), |acc, (from, to)| acc.replace(from, to))
}

/// `youtube.com/redirect?q=<target>` becomes `<target>`. Other URLs pass through.
/// A redirect without a usable target yields `None`.
fn unwrap_redirect(url: Url) -> Option<Url> {
    let is_redirect = url
        .host_str()
        .is_some_and(|h| host_matches(&h.to_lowercase(), "youtube.com"))
        && url.path() == "/redirect";
    if !is_redirect {
        return Some(url);
    }
    url.query_pairs()
        .find(|(k, _)| k == "q")
        .and_then(|(_, v)| Url::parse(&v).ok())
        .filter(|u| matches!(u.scheme(), "http" | "https"))
}

fn host_matches(host: &str, domain: &str) -> bool {
    let domain = domain.trim().to_lowercase();
    !domain.is_empty() && (host == domain || host.ends_with(&format!(".{}", domain)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct FakeFetcher {
        pages: HashMap<String, String>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeFetcher {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages.iter().map(|(u, p)| (u.to_string(), p.to_string())).collect(),
                calls: RefCell::new(vec![]),
            }
        }
    }

    impl PageFetcher for FakeFetcher {
        fn fetch(&self, url: &str) -> ApiResult<String> {
            self.calls.borrow_mut().push(url.to_string());
            self.pages.get(url).cloned().ok_or(ApiError::Api {
                status: 404,
                message: "not found".to_string(),
            })
        }
    }

    fn quiet_config() -> ContactConfig {
        ContactConfig {
            fetch_delay_ms: 0,
            ..ContactConfig::default()
        }
    }

    #[test]
    fn test_handle_prefers_canonical() {
        let html = r#"{"vanityChannelUrl":"http://www.youtube.com/@vanity","canonicalBaseUrl":"/@gearbench"}"#;
        assert_eq!(extract_handle(html).as_deref(), Some("@gearbench"));

        let html = r#"{"vanityChannelUrl":"https://www.youtube.com/@vanity"}"#;
        assert_eq!(extract_handle(html).as_deref(), Some("@vanity"));

        assert_eq!(extract_handle(r#"{"canonicalBaseUrl":"/channel/UCx"}"#), None);
    }

    #[test]
    fn test_emails_dedupe_and_exclusions() {
        let excluded = ContactConfig::default().excluded_email_domains;
        let text = "Business: Collabs@GearBench.io. Also collabs@gearbench.io, \
                    you@example.com, logo@2x.png and team@mail.gearbench.co.uk";
        assert_eq!(
            extract_emails(text, &excluded),
            vec!["Collabs@GearBench.io", "team@mail.gearbench.co.uk"]
        );
    }

    #[test]
    fn test_emails_from_json_escaped_markup() {
        let html = r#"{"description":"Business inquiries:\nhello@breezelab.io\u003c/b\u003e"}"#;
        assert_eq!(extract_emails(html, &[]), vec!["hello@breezelab.io"]);

        let html = r#"reach us\u003cbr\u003eteam@breezelab.io\u0026ref=1 or \"press@breezelab.io\"\tthanks"#;
        assert_eq!(
            extract_emails(html, &[]),
            vec!["team@breezelab.io", "press@breezelab.io"]
        );
    }

    #[test]
    fn test_no_emails() {
        assert!(extract_emails("DM me on socials", &[]).is_empty());
    }

    #[test]
    fn test_websites_unwrap_redirect_and_exclude_platform() {
        let excluded = ContactConfig::default().excluded_website_domains;
        let text = r#"shop: https:\/\/www.youtube.com\/redirect?event=channel&q=https%3A%2F%2Fgearbench.io%2Fshop
            thumbs at https://i.ytimg.com/vi/abc/hq.jpg and (https://gearbench.io/shop).
            also https://linktr.ee/gearbench, https://fonts.googleapis.com/css"#;
        assert_eq!(
            extract_websites(text, &excluded, 5),
            vec!["https://gearbench.io/shop", "https://linktr.ee/gearbench"]
        );
    }

    #[test]
    fn test_websites_skip_page_chrome_hosts() {
        let excluded = ContactConfig::default().excluded_website_domains;
        let html = r#"<link href="https://www.gstatic.com/youtube/img/favicon.ico">
            <script src="https://www.googleadservices.com/pagead/conversion_async.js"></script>
            <a href="https://www.youtubekids.com/?source=youtube_web">Kids</a>
            <iframe src="https://www.youtube-nocookie.com/embed/abc"></iframe>
            "https:\/\/accounts.google.com\/ServiceLogin?continue=x"
            "https://googleads.g.doubleclick.net/pagead/id"
            "https://pagead2.googlesyndication.com/pagead/js"
            "https://www.google-analytics.com/analytics.js"
            "https://i.ytimg.com/vi/abc/hq.jpg" "https://yt3.ggpht.com/avatar=s88"
            "https://blog.youtube/news" "https://redirector.gvt1.com/edgedl"
            "https://ogp.me/ns" "https://cdn.ampproject.org/v0.js"
            "https:\/\/www.youtube.com\/redirect?q=https%3A%2F%2Fbreezelab.io%2Fshop\u0026v=1""#;
        assert_eq!(
            extract_websites(html, &excluded, 5),
            vec!["https://breezelab.io/shop"]
        );
    }

    #[test]
    fn test_websites_truncated() {
        let text = "https://a.io https://b.io https://c.io https://d.io";
        assert_eq!(extract_websites(text, &[], 2), vec!["https://a.io/", "https://b.io/"]);
    }

    #[test]
    fn test_redirect_without_target_is_dropped() {
        let text = "https://www.youtube.com/redirect?event=channel";
        assert!(extract_websites(text, &[], 5).is_empty());
    }

    #[test]
    fn test_fetch_profile_stops_when_complete() {
        let [about, home] = profile_urls("UCgear");
        let fetcher = FakeFetcher::new(&[
            (about.as_str(), r#"{"canonicalBaseUrl":"/@gearbench"} mail collabs@gearbench.io"#),
            (home.as_str(), "unused"),
        ]);
        let retry = RetryPolicy::none();
        let config = quiet_config();
        let extractor = ContactExtractor::new(&fetcher, &retry, &config);

        let page = extractor.fetch_profile("UCgear");
        assert_eq!(page.handle.as_deref(), Some("@gearbench"));
        assert_eq!(*fetcher.calls.borrow(), vec![about]);
    }

    #[test]
    fn test_fetch_profile_falls_back_for_handle() {
        let [about, home] = profile_urls("UCgear");
        let fetcher = FakeFetcher::new(&[(home.as_str(), r#""canonicalBaseUrl":"/@gearbench""#)]);
        let retry = RetryPolicy::none();
        let config = quiet_config();
        let extractor = ContactExtractor::new(&fetcher, &retry, &config);

        let page = extractor.fetch_profile("UCgear");
        assert_eq!(page.handle.as_deref(), Some("@gearbench"));
        // the channel home page is not about-page text
        assert!(page.about_html.is_empty());
        assert_eq!(*fetcher.calls.borrow(), vec![about, home]);
    }

    #[test]
    fn test_extract_combines_description_and_markup() {
        let [about, _] = profile_urls("UCgear");
        let fetcher = FakeFetcher::new(&[(
            about.as_str(),
            r#"{"canonicalBaseUrl":"/@gearbench"} "https:\/\/gearbench.io""#,
        )]);
        let retry = RetryPolicy::none();
        let config = quiet_config();
        let extractor = ContactExtractor::new(&fetcher, &retry, &config);

        let report = extractor.extract("UCgear", "Sponsored reviews. Business: hi@gearbench.io");
        assert_eq!(report.contact.handle.as_deref(), Some("@gearbench"));
        assert_eq!(report.contact.emails, vec!["hi@gearbench.io"]);
        assert_eq!(report.contact.websites, vec!["https://gearbench.io/"]);
        assert!(report.text.starts_with("Sponsored reviews."));
    }

    #[test]
    fn test_unreachable_profile_yields_empty_contact() {
        let fetcher = FakeFetcher::new(&[]);
        let retry = RetryPolicy::none();
        let config = quiet_config();
        let extractor = ContactExtractor::new(&fetcher, &retry, &config);

        let report = extractor.extract("UCgone", "no contact here");
        assert_eq!(report.contact, Contact::default());
    }
}
