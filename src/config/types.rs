use crate::extract::Matcher;
use crate::session::Locator;
use serde::Deserialize;

/// Site configuration bundle for one campaign harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    pub listing: ListingConfig,
    pub detail: DetailConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub politeness: PolitenessConfig,
    #[serde(default)]
    pub session: SessionConfig,
    pub output: OutputConfig,
}

/// Identity of the target site
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Short name used in logs and the run ledger
    pub name: String,

    /// Issuing bank, copied into every record
    pub bank: String,

    /// Card programme, copied into every record
    pub card: String,

    /// Base URL relative links and image paths are resolved against
    #[serde(rename = "base-url")]
    pub base_url: String,
}

/// How campaign links are discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListingMode {
    /// Numbered pages built from a URL template
    Paged,
    /// A single page that grows by scrolling and "load more" clicks
    InfiniteScroll,
}

/// Listing (link discovery) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ListingConfig {
    pub mode: ListingMode,

    /// Listing page URL (infinite scroll)
    #[serde(default)]
    pub url: Option<String>,

    /// Page URL template containing `{page}` (paged)
    #[serde(rename = "url-template", default)]
    pub url_template: Option<String>,

    /// First page index substituted into the template
    #[serde(rename = "start-page", default = "default_start_page")]
    pub start_page: u32,

    /// Upper bound on pages fetched or scroll cycles run
    #[serde(rename = "max-iterations", default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Consecutive failed iterations after which the crawl gives up
    #[serde(
        rename = "max-consecutive-failures",
        default = "default_max_consecutive_failures"
    )]
    pub max_consecutive_failures: u32,

    /// Element that signals the listing has rendered
    #[serde(rename = "ready-marker", default)]
    pub ready_marker: Option<Locator>,

    /// "Load more" control (infinite scroll)
    #[serde(rename = "load-more", default)]
    pub load_more: Option<Locator>,

    /// Fallback chain producing campaign hrefs
    pub links: Vec<Matcher>,

    /// Maximum number of links to collect; unlimited when absent
    #[serde(default)]
    pub limit: Option<usize>,
}

fn default_start_page() -> u32 {
    1
}

fn default_max_iterations() -> u32 {
    30
}

fn default_max_consecutive_failures() -> u32 {
    3
}

/// Detail page extraction configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DetailConfig {
    /// Element whose presence means the campaign content has loaded
    #[serde(rename = "ready-marker")]
    pub ready_marker: Locator,

    #[serde(rename = "ready-timeout-ms", default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,

    pub title: Vec<Matcher>,

    #[serde(default)]
    pub description: Vec<Matcher>,

    #[serde(default)]
    pub image: Vec<Matcher>,

    #[serde(default)]
    pub content: Vec<Matcher>,

    /// Image values containing any of these markers are skipped
    #[serde(rename = "image-denylist", default = "default_image_denylist")]
    pub image_denylist: Vec<String>,

    #[serde(rename = "default-title", default = "default_title")]
    pub default_title: String,

    /// Image used when every image strategy fails
    #[serde(rename = "default-image", default)]
    pub default_image: Option<String>,
}

fn default_ready_timeout_ms() -> u64 {
    20_000
}

fn default_image_denylist() -> Vec<String> {
    ["logo", "icon", "placeholder", "spacer"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_title() -> String {
    "Untitled Campaign".to_string()
}

/// Retry behaviour for page loads
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default)]
    pub backoff: BackoffConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: BackoffConfig::default(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

/// Delay between retry attempts
///
/// `backoff = { constant-ms = 3000 }` or `backoff = { min-ms = 10000, max-ms = 20000 }`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum BackoffConfig {
    Constant {
        #[serde(rename = "constant-ms")]
        constant_ms: u64,
    },
    Uniform {
        #[serde(rename = "min-ms")]
        min_ms: u64,
        #[serde(rename = "max-ms")]
        max_ms: u64,
    },
}

impl Default for BackoffConfig {
    fn default() -> Self {
        BackoffConfig::Constant { constant_ms: 3_000 }
    }
}

/// Mandatory randomised delay between consecutive requests
#[derive(Debug, Clone, Deserialize)]
pub struct PolitenessConfig {
    #[serde(rename = "min-delay-ms", default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    #[serde(rename = "max-delay-ms", default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_min_delay_ms() -> u64 {
    2_000
}

fn default_max_delay_ms() -> u64 {
    5_000
}

/// Browser session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Base URL of a Browserless-compatible renderer
    #[serde(rename = "render-endpoint", default)]
    pub render_endpoint: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            render_endpoint: None,
        }
    }
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36"
        .to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// JSON artifact rewritten after every successful record
    #[serde(rename = "json-path", default)]
    pub json_path: Option<String>,

    /// SQLite database the campaigns are upserted into
    #[serde(rename = "database-path", default)]
    pub database_path: Option<String>,

    /// Drop links whose campaign is already stored before extracting them
    #[serde(rename = "skip-existing", default)]
    pub skip_existing: bool,
}
