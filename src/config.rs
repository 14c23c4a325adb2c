//! Configuration management for ballotcrawl using the prefer crate.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default database filename.
const DEFAULT_DATABASE_FILENAME: &str = "ballotcrawl.db";

/// Ballot page URL on the elections authority's site.
pub const DEFAULT_BALLOT_URL_TEMPLATE: &str =
    "https://mvic.sos.state.mi.us/Voter/GetMvicBallot/{precinct}/{election}/";

/// Default number of concurrent page workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Environment variable overriding the database path.
const DATABASE_ENV: &str = "BALLOTCRAWL_DATABASE";

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename.
    pub database_filename: String,
    /// Explicit database path (overrides data_dir/database_filename if set).
    pub database_path: Option<PathBuf>,
    /// User agent for HTTP requests: "impersonate" picks a real browser string.
    pub user_agent: String,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    /// Delay between requests in milliseconds.
    pub request_delay_ms: u64,
    /// Ballot URL with `{election}` and `{precinct}` placeholders.
    pub ballot_url_template: String,
    /// Concurrent page workers during a crawl pass.
    pub workers: usize,
    /// Table interpretation heuristics.
    pub parser: ParserConfig,
}

impl Default for Settings {
    fn default() -> Self {
        // Falls back gracefully: Documents dir -> Home dir -> Current dir
        let data_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ballotcrawl");

        Self {
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            database_path: std::env::var_os(DATABASE_ENV).map(PathBuf::from),
            user_agent: "impersonate".to_string(),
            request_timeout: 30,
            request_delay_ms: 0,
            ballot_url_template: DEFAULT_BALLOT_URL_TEMPLATE.to_string(),
            workers: DEFAULT_WORKERS,
            parser: ParserConfig::default(),
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Full path to the SQLite database.
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(&self.database_filename))
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        if let Some(parent) = self.database_path().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

/// Heuristic tables tied to the authority's markup conventions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, prefer::FromValue)]
pub struct ParserConfig {
    /// Name of the single statewide district.
    #[serde(default = "default_statewide_district")]
    #[prefer(default = "Michigan")]
    pub statewide_district: String,
    /// Offices always bound to the statewide district.
    #[serde(default = "default_statewide_offices")]
    #[prefer(default)]
    pub statewide_offices: Vec<String>,
    /// Division values that never resolve a category on their own.
    #[serde(default = "default_exempt_divisions")]
    #[prefer(default)]
    pub exempt_divisions: Vec<String>,
    /// Office name to district category lookup.
    #[serde(default = "default_office_categories")]
    #[prefer(default)]
    pub office_categories: HashMap<String, String>,
    /// Corrections for mislabeled category headings.
    #[serde(default = "default_category_aliases")]
    #[prefer(default)]
    pub category_aliases: HashMap<String, String>,
    /// Categories whose proposals belong to the precinct's jurisdiction.
    #[serde(default = "default_jurisdiction_categories")]
    #[prefer(default)]
    pub jurisdiction_categories: Vec<String>,
}

fn default_statewide_district() -> String {
    "Michigan".to_string()
}

fn default_statewide_offices() -> Vec<String> {
    vec!["Governor".to_string(), "United States Senator".to_string()]
}

fn default_exempt_divisions() -> Vec<String> {
    ["Congressional", "Legislative", "Delegate"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_office_categories() -> HashMap<String, String> {
    [
        ("Governor", "State"),
        ("United States Senator", "State"),
        ("Representative In Congress", "US Congress"),
        ("State Senator", "State Senate"),
        ("Representative In State Legislature", "State House"),
        ("Delegate to County Convention", "Precinct"),
    ]
    .into_iter()
    .map(|(office, category)| (office.to_string(), category.to_string()))
    .collect()
}

fn default_category_aliases() -> HashMap<String, String> {
    HashMap::from([("Authority".to_string(), "County".to_string())])
}

fn default_jurisdiction_categories() -> Vec<String> {
    ["Jurisdiction", "City", "Township"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            statewide_district: default_statewide_district(),
            statewide_offices: default_statewide_offices(),
            exempt_divisions: default_exempt_divisions(),
            office_categories: default_office_categories(),
            category_aliases: default_category_aliases(),
            jurisdiction_categories: default_jurisdiction_categories(),
        }
    }
}

impl ParserConfig {
    /// Check if this is the default config.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Look up the category of an office, matching case-insensitively.
    pub fn office_category(&self, office: &str) -> Option<&str> {
        self.office_categories
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(office))
            .map(|(_, category)| category.as_str())
    }

    pub fn is_exempt_division(&self, division: &str) -> bool {
        self.exempt_divisions.iter().any(|d| d == division)
    }

    pub fn is_statewide_office(&self, office: &str) -> bool {
        self.statewide_offices
            .iter()
            .any(|o| o.eq_ignore_ascii_case(office))
    }

    pub fn is_jurisdiction_category(&self, category: &str) -> bool {
        self.jurisdiction_categories.iter().any(|c| c == category)
    }

    /// Apply the alias table to a category name.
    pub fn alias<'a>(&'a self, category: &'a str) -> &'a str {
        self.category_aliases
            .get(category)
            .map(String::as_str)
            .unwrap_or(category)
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Database filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// User agent string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    /// Delay between requests in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_delay_ms: Option<u64>,
    /// Ballot URL template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ballot_url_template: Option<String>,
    /// Concurrent page workers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    /// Parser heuristics.
    #[serde(default, skip_serializing_if = "ParserConfig::is_default")]
    #[prefer(default)]
    pub parser: ParserConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    #[prefer(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    pub async fn load() -> Self {
        // Use prefer for file discovery, then parse with serde
        match prefer::load("ballotcrawl").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("Ignoring config {}: {}", path.display(), e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse configuration text in the given format.
    pub fn parse(contents: &str, ext: &str) -> Result<Self, String> {
        match ext {
            "toml" => toml::from_str(contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e)),
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e)),
            _ => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e)),
        }
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = user_agent.clone();
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(delay) = self.request_delay_ms {
            settings.request_delay_ms = delay;
        }
        if let Some(ref template) = self.ballot_url_template {
            settings.ballot_url_template = template.clone();
        }
        if let Some(workers) = self.workers {
            settings.workers = workers.max(1);
        }
        settings.parser = self.parser.clone();
    }
}

/// Load settings from the discovered config file, with an optional data dir override.
pub async fn load_settings(data_dir: Option<PathBuf>) -> Settings {
    let config = Config::load().await;
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let base_dir = config.base_dir().unwrap_or(cwd);

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);
    if let Some(dir) = data_dir {
        settings.data_dir = dir;
    }
    settings
}
