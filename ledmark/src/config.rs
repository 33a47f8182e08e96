use std::path::{Path, PathBuf};
use serde::Deserialize;
use anyhow::{Context, Result};
use shared::protocol::{DEFAULT_EXPORT_FILE, DEFAULT_FOLDER_TITLE, DEFAULT_LEDGER_FILE, WLED_SERVICE_TYPE};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub bookmarks: BookmarksConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_service_type")]
    pub service_type: String,
    #[serde(default = "default_duration")]
    pub duration_secs: i64,
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookmarksConfig {
    #[serde(default = "default_folder_title")]
    pub folder_title: String,
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,
    /// Where to look for browser profiles; home directory when unset
    #[serde(default)]
    pub search_root: Option<PathBuf>,
    #[serde(default = "default_excluded_keywords")]
    pub excluded_path_keywords: Vec<String>,
    #[serde(default = "default_picker")]
    pub picker: String,
}

fn default_service_type() -> String {
    WLED_SERVICE_TYPE.to_string()
}

fn default_duration() -> i64 {
    30
}

fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_EXPORT_FILE)
}

fn default_folder_title() -> String {
    DEFAULT_FOLDER_TITLE.to_string()
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from(DEFAULT_LEDGER_FILE)
}

fn default_excluded_keywords() -> Vec<String> {
    ["Old", ".thunderbird", ".wine", "TorBrowser"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_picker() -> String {
    "fzf".to_string()
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            service_type: default_service_type(),
            duration_secs: default_duration(),
            output: default_output(),
        }
    }
}

impl Default for BookmarksConfig {
    fn default() -> Self {
        Self {
            folder_title: default_folder_title(),
            ledger_path: default_ledger_path(),
            search_root: None,
            excluded_path_keywords: default_excluded_keywords(),
            picker: default_picker(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.discovery.service_type, "_wled._tcp.local.");
        assert_eq!(config.discovery.duration_secs, 30);
        assert_eq!(config.bookmarks.folder_title, "LED Strips");
        assert_eq!(config.bookmarks.excluded_path_keywords.len(), 4);
        assert!(config.bookmarks.search_root.is_none());
    }

    #[test]
    fn test_partial_sections() {
        let config: Config = toml::from_str(
            r#"
            [discovery]
            duration_secs = 5

            [bookmarks]
            folder_title = "Lights"
            search_root = "/home/pi"
            "#,
        )
        .unwrap();

        assert_eq!(config.discovery.duration_secs, 5);
        assert_eq!(config.discovery.output, PathBuf::from("discovered_services.json"));
        assert_eq!(config.bookmarks.folder_title, "Lights");
        assert_eq!(config.bookmarks.search_root, Some(PathBuf::from("/home/pi")));
        assert_eq!(config.bookmarks.picker, "fzf");
    }

    #[test]
    fn test_load_reports_path() {
        let err = Config::load("/nonexistent/ledmark.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/ledmark.toml"));
    }
}
