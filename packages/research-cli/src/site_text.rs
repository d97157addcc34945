//! Site text sources.
//!
//! The classifier needs plain text per site. [`TextDirSource`] reads text
//! extracted ahead of time (e.g. by a headless browser); [`HttpTextSource`]
//! fetches the page over plain HTTP and strips markup. Neither renders
//! JavaScript or follows links.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Anything that can produce the text of a site.
#[async_trait]
pub trait SiteTextSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Reads `<dir>/<host>.txt` for each URL.
pub struct TextDirSource {
    dir: PathBuf,
}

impl TextDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File that holds the text for `url`.
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.txt", file_stem(url)))
    }
}

#[async_trait]
impl SiteTextSource for TextDirSource {
    async fn fetch(&self, url: &str) -> Result<String> {
        let path = self.path_for(url);
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("no extracted text at {}", path.display()))?;
        let text = collapse_whitespace(&text);
        if text.is_empty() {
            bail!("extracted text at {} is empty", path.display());
        }
        Ok(text)
    }
}

/// Fetches a page with a plain GET and converts its HTML to text.
pub struct HttpTextSource {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpTextSource {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to create HTTP client")?;
        Ok(Self {
            client,
            user_agent: "MarketResearchBot/1.0".to_string(),
        })
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[async_trait]
impl SiteTextSource for HttpTextSource {
    async fn fetch(&self, url: &str) -> Result<String> {
        debug!(url = %url, "HTTP fetch starting");
        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "HTTP request failed");
                e
            })
            .with_context(|| format!("failed to fetch {}", url))?;

        let status = response.status();
        if !status.is_success() {
            bail!("HTTP {} fetching {}", status, url);
        }

        let html = response.text().await.context("failed to read body")?;
        let text = html_to_text(&html);
        if text.is_empty() {
            bail!("no text content at {}", url);
        }
        debug!(url = %url, chars = text.chars().count(), "HTTP fetch complete");
        Ok(text)
    }
}

/// Strip scripts, styles and tags, decode common entities and collapse
/// whitespace.
pub fn html_to_text(html: &str) -> String {
    static PATTERNS: OnceLock<[Regex; 4]> = OnceLock::new();
    let [script, style, comment, tag] = PATTERNS.get_or_init(|| {
        [
            Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("valid script pattern"),
            Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("valid style pattern"),
            Regex::new(r"(?s)<!--.*?-->").expect("valid comment pattern"),
            Regex::new(r"<[^>]+>").expect("valid tag pattern"),
        ]
    });

    let text = script.replace_all(html, " ");
    let text = style.replace_all(&text, " ");
    let text = comment.replace_all(&text, " ");
    let text = tag.replace_all(&text, " ");

    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&copy;", "©");

    collapse_whitespace(&text)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// File-name-safe stem for a URL: host plus path, non-alphanumerics as `_`.
pub fn file_stem(url: &str) -> String {
    let key = match Url::parse(url) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or_default();
            let host = host.strip_prefix("www.").unwrap_or(host);
            format!("{}{}", host, parsed.path().trim_end_matches('/'))
        }
        Err(_) => url.to_string(),
    };

    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}
