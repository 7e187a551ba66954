use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for rwa-watch
///
/// Every section is optional; a missing section takes its defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceEntry>,
}

/// Engine backing an acquisition session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Renderer {
    /// Headless Chromium driven over CDP
    #[default]
    Chromium,
    /// Plain HTTP fetch, no script execution
    Http,
}

/// Acquisition session configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub renderer: Renderer,

    /// Client identity string presented to every source
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    #[serde(rename = "viewport-width")]
    pub viewport_width: u32,

    #[serde(rename = "viewport-height")]
    pub viewport_height: u32,

    /// Upper bound for a single navigation (milliseconds)
    #[serde(rename = "navigation-timeout-ms")]
    pub navigation_timeout_ms: u64,

    /// Wait after each scroll before measuring page height (milliseconds)
    #[serde(rename = "settle-delay-ms")]
    pub settle_delay_ms: u64,

    /// Maximum scroll rounds on lazy-loading index pages
    #[serde(rename = "max-scroll-rounds")]
    pub max_scroll_rounds: u32,

    /// Timeout for ancillary document downloads (seconds)
    #[serde(rename = "download-timeout-secs")]
    pub download_timeout_secs: u64,

    /// Optional upstream proxy; only used by sources with `use-proxy`
    pub proxy: Option<String>,

    /// Explicit browser binary; auto-detected when absent
    #[serde(rename = "chrome-path")]
    pub chrome_path: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            renderer: Renderer::Chromium,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            viewport_width: 1920,
            viewport_height: 1080,
            navigation_timeout_ms: 30_000,
            settle_delay_ms: 2_000,
            max_scroll_rounds: 20,
            download_timeout_secs: 30,
            proxy: None,
            chrome_path: None,
        }
    }
}

impl SessionConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

/// Pacing and scheduling configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Pause before each detail fetch (milliseconds)
    #[serde(rename = "item-pause-ms")]
    pub item_pause_ms: u64,

    /// Pause between two sources of the same batch (milliseconds)
    #[serde(rename = "source-pause-ms")]
    pub source_pause_ms: u64,

    /// Scheduled mode interval between batch starts (hours)
    #[serde(rename = "interval-hours")]
    pub interval_hours: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            item_pause_ms: 2_000,
            source_pause_ms: 5_000,
            interval_hours: 3,
        }
    }
}

impl RunConfig {
    pub fn item_pause(&self) -> Duration {
        Duration::from_millis(self.item_pause_ms)
    }

    pub fn source_pause(&self) -> Duration {
        Duration::from_millis(self.source_pause_ms)
    }

    /// Saturates at `u64::MAX` seconds
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_hours.saturating_mul(3600))
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root directory holding one subdirectory per source
    #[serde(rename = "data-dir")]
    pub data_dir: String,

    /// Write a companion CSV next to every JSON snapshot
    pub csv: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            csv: true,
        }
    }
}

/// One configured source
#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    /// Built-in extractor name (e.g. "lofty")
    pub kind: String,

    /// Excluded from "run everything" unless explicitly included
    #[serde(default, rename = "opt-in")]
    pub opt_in: bool,

    /// Route this source's traffic through the configured proxy
    #[serde(default, rename = "use-proxy")]
    pub use_proxy: bool,

    /// Override of the extractor's default site root
    #[serde(default, rename = "base-url")]
    pub base_url: Option<String>,
}

impl SourceEntry {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            opt_in: false,
            use_proxy: false,
            base_url: None,
        }
    }
}

/// Built-in roster used when the config names no sources
pub fn default_sources() -> Vec<SourceEntry> {
    let mut realt = SourceEntry::new("realt");
    realt.opt_in = true;
    realt.use_proxy = true;

    vec![
        SourceEntry::new("lofty"),
        SourceEntry::new("reental"),
        SourceEntry::new("fraxtor"),
        SourceEntry::new("binaryx"),
        realt,
    ]
}
