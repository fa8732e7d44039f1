use serde::Deserialize;

/// Default CDN host marker used when scanning extractor formats
pub const DEFAULT_CDN_HOST_MARKER: &str = "cdninstagram";

/// Main configuration structure for Reel-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Ordered list of targets: `@account`, `#tag`, or a full URL
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub run: RunConfig,
    pub storage: StorageConfig,
    pub api: Option<ApiConfig>,
    pub browser: Option<BrowserConfig>,
    #[serde(default)]
    pub enricher: EnricherConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

/// Which scraping backend drives the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeMethod {
    /// Non-interactive REST backend
    Api,
    /// Interactive WebDriver-controlled browser
    Browser,
}

impl ScrapeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Browser => "browser",
        }
    }
}

/// Run-level options for a harvest
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Maximum items scraped per target
    #[serde(rename = "max-items-per-target", default = "default_max_items")]
    pub max_items_per_target: u32,

    #[serde(default = "default_method")]
    pub method: ScrapeMethod,

    /// Blocking pause between consecutive targets (seconds)
    #[serde(rename = "inter-target-delay-seconds", default = "default_delay")]
    pub inter_target_delay_seconds: u64,

    /// Log in before scraping (browser backend only)
    #[serde(rename = "use-login", default)]
    pub use_login: bool,

    /// Resolve a direct CDN link for each item
    #[serde(rename = "resolve-cdn", default)]
    pub resolve_cdn: bool,

    /// Consult the store for existing ids before enriching
    #[serde(rename = "dedupe-before-insert", default = "default_true")]
    pub dedupe_before_insert: bool,

    /// Optional JSON artifact with every enriched item
    #[serde(rename = "output-path")]
    pub output_path: Option<String>,

    /// Optional markdown run summary
    #[serde(rename = "summary-path")]
    pub summary_path: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_items_per_target: default_max_items(),
            method: default_method(),
            inter_target_delay_seconds: default_delay(),
            use_login: false,
            resolve_cdn: false,
            dedupe_before_insert: true,
            output_path: None,
            summary_path: None,
        }
    }
}

impl RunConfig {
    pub const QUICK_MAX_ITEMS: u32 = 3;
    pub const QUICK_DELAY_SECONDS: u64 = 30;

    /// Applies the quick preset: fewer items per target and a shorter pause
    pub fn apply_quick_preset(&mut self) {
        self.max_items_per_target = Self::QUICK_MAX_ITEMS;
        self.inter_target_delay_seconds = Self::QUICK_DELAY_SECONDS;
    }
}

/// Persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// REST scraping backend (Apify actor)
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(rename = "base-url", default = "default_api_base")]
    pub base_url: String,

    /// Actor id, e.g. `apify~instagram-reel-scraper`
    pub actor: String,

    /// Environment variable holding the API token
    #[serde(rename = "token-env", default = "default_api_token_env")]
    pub token_env: String,

    #[serde(rename = "timeout-seconds", default = "default_api_timeout")]
    pub timeout_seconds: u64,
}

/// Browser backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    /// WebDriver endpoint (chromedriver, geckodriver, selenium grid)
    #[serde(rename = "webdriver-url", default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default = "default_true")]
    pub headless: bool,

    /// Base site URL used to build target pages
    #[serde(rename = "site-url", default = "default_site_url")]
    pub site_url: String,

    #[serde(rename = "username-env", default = "default_username_env")]
    pub username_env: String,

    #[serde(rename = "password-env", default = "default_password_env")]
    pub password_env: String,

    /// Number of scroll passes used to load more reels on a listing page
    #[serde(rename = "scroll-passes", default = "default_scroll_passes")]
    pub scroll_passes: u32,

    /// Settle time after navigation (milliseconds)
    #[serde(rename = "page-settle-ms", default = "default_settle_ms")]
    pub page_settle_ms: u64,
}

/// AI enrichment endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EnricherConfig {
    #[serde(rename = "base-url", default = "default_enricher_base")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(rename = "embedding-model", default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(rename = "api-key-env", default = "default_enricher_key_env")]
    pub api_key_env: String,
}

impl Default for EnricherConfig {
    fn default() -> Self {
        Self {
            base_url: default_enricher_base(),
            model: default_model(),
            embedding_model: default_embedding_model(),
            api_key_env: default_enricher_key_env(),
        }
    }
}

/// CDN extraction configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    /// Path or name of the yt-dlp executable
    #[serde(default = "default_ytdlp")]
    pub binary: String,

    /// Substring identifying a CDN-hosted format URL
    #[serde(rename = "cdn-host-marker", default = "default_cdn_marker")]
    pub cdn_host_marker: String,

    /// Directory receiving the video of every enriched reel, named by reel id
    #[serde(rename = "download-dir")]
    pub download_dir: Option<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            binary: default_ytdlp(),
            cdn_host_marker: default_cdn_marker(),
            download_dir: None,
        }
    }
}

fn default_max_items() -> u32 {
    5
}

fn default_method() -> ScrapeMethod {
    ScrapeMethod::Api
}

fn default_delay() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_api_base() -> String {
    "https://api.apify.com/v2".to_string()
}

fn default_api_token_env() -> String {
    "APIFY_TOKEN".to_string()
}

fn default_api_timeout() -> u64 {
    300
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_site_url() -> String {
    "https://www.instagram.com".to_string()
}

fn default_username_env() -> String {
    "INSTAGRAM_USERNAME".to_string()
}

fn default_password_env() -> String {
    "INSTAGRAM_PASSWORD".to_string()
}

fn default_scroll_passes() -> u32 {
    3
}

fn default_settle_ms() -> u64 {
    2500
}

fn default_enricher_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_enricher_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_ytdlp() -> String {
    "yt-dlp".to_string()
}

fn default_cdn_marker() -> String {
    DEFAULT_CDN_HOST_MARKER.to_string()
}
