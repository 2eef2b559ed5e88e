//! Run configuration.
//!
//! Values come from constant defaults, then an optional JSON file, then
//! `SHOPSCOUT_*` environment overrides.

use crate::acquire::AcquireConfig;
use crate::error::ConfigError;
use crate::pacing::{PacingConfig, DEFAULT_USER_AGENTS};
use crate::pipeline::PipelineOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "shopscout.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Origin that relative product links are resolved against.
    pub site_origin: String,
    pub max_products: usize,
    pub headless: bool,
    pub user_agents: Vec<String>,
    /// JSON selector layout replacing the built-in one.
    pub layout_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub file_prefix: String,
    /// SQLite database, relative to `output_dir` unless absolute.
    pub database: PathBuf,
    pub chromium_path: Option<PathBuf>,
    pub acquire: AcquireConfig,
    pub pacing: PacingConfig,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            site_origin: "https://www.flipkart.com".to_string(),
            max_products: 20,
            headless: true,
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            layout_path: None,
            output_dir: PathBuf::from("."),
            file_prefix: "products".to_string(),
            database: PathBuf::from("products.db"),
            chromium_path: None,
            acquire: AcquireConfig::default(),
            pacing: PacingConfig::default(),
        }
    }
}

impl ScrapeConfig {
    /// Load from `explicit`, `SHOPSCOUT_CONFIG` or `./shopscout.json`, then
    /// apply environment overrides. Missing files fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match resolve_config_path(explicit) {
            Some(path) => {
                tracing::info!("loading config from {}", path.display());
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        Ok(config.apply_env())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        Ok(config.normalized())
    }

    /// Overlay `SHOPSCOUT_*` environment variables.
    pub fn apply_env(mut self) -> Self {
        self.max_products = read_env_usize("SHOPSCOUT_MAX_PRODUCTS", self.max_products);
        self.headless = read_env_bool("SHOPSCOUT_HEADLESS", self.headless);
        if let Some(origin) = read_env_string("SHOPSCOUT_SITE_ORIGIN") {
            self.site_origin = origin;
        }
        if let Some(dir) = read_env_string("SHOPSCOUT_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(db) = read_env_string("SHOPSCOUT_DATABASE") {
            self.database = PathBuf::from(db);
        }
        if let Some(path) = read_env_string("SHOPSCOUT_CHROMIUM_PATH") {
            self.chromium_path = Some(PathBuf::from(path));
        }
        self
    }

    fn normalized(mut self) -> Self {
        self.acquire.arrival_delay = self.acquire.arrival_delay.normalized();
        self.pacing = self.pacing.normalized();
        self
    }

    /// Database path with `output_dir` applied.
    pub fn database_path(&self) -> PathBuf {
        if self.database.is_absolute() {
            self.database.clone()
        } else {
            self.output_dir.join(&self.database)
        }
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            max_products: self.max_products,
            acquire: self.acquire.clone(),
            pacing: self.pacing,
        }
    }
}

/// Resolve the config file: explicit path, then `SHOPSCOUT_CONFIG`, then
/// `./shopscout.json` if it exists.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = read_env_string("SHOPSCOUT_CONFIG").filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    local.exists().then_some(local)
}

fn read_env_usize(name: &str, default_value: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default_value)
}

fn read_env_bool(name: &str, default_value: bool) -> bool {
    match read_env_string(name).as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default_value,
    }
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|v| v.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pacing::DelayRange;
    use std::io::Write;
    use std::sync::Mutex;

    /// Serializes tests that touch `SHOPSCOUT_*` variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ENV_VARS: [&str; 7] = [
        "SHOPSCOUT_MAX_PRODUCTS",
        "SHOPSCOUT_HEADLESS",
        "SHOPSCOUT_SITE_ORIGIN",
        "SHOPSCOUT_OUTPUT_DIR",
        "SHOPSCOUT_DATABASE",
        "SHOPSCOUT_CHROMIUM_PATH",
        "SHOPSCOUT_CONFIG",
    ];

    fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        for name in ENV_VARS {
            std::env::remove_var(name);
        }
        for (name, value) in vars {
            std::env::set_var(name, value);
        }
        let out = f();
        for name in ENV_VARS {
            std::env::remove_var(name);
        }
        out
    }

    #[test]
    fn test_defaults() {
        let cfg = ScrapeConfig::default();
        assert_eq!(cfg.max_products, 20);
        assert!(cfg.headless);
        assert_eq!(cfg.user_agents.len(), 3);
        assert_eq!(cfg.acquire.scroll_rounds, 3);
        assert_eq!(cfg.acquire.ready_timeout_ms, 10_000);
        assert_eq!(cfg.pacing.between_targets, DelayRange::secs(5, 10));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"max_products": 5, "acquire": {{"scroll_rounds": 6}},
                "pacing": {{"between_targets": {{"min_ms": 9000, "max_ms": 1000}}}}}}"#
        )
        .unwrap();
        let cfg = ScrapeConfig::from_file(file.path()).unwrap();
        assert_eq!(cfg.max_products, 5);
        assert_eq!(cfg.acquire.scroll_rounds, 6);
        assert_eq!(cfg.acquire.popup_timeout_ms, 5_000);
        assert_eq!(cfg.pacing.between_targets, DelayRange::new(1000, 9000));
        assert_eq!(cfg.site_origin, "https://www.flipkart.com");
    }

    #[test]
    fn test_bad_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        let err = ScrapeConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));

        let missing = ScrapeConfig::from_file(Path::new("/nonexistent/shopscout.json"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_explicit_path_wins() {
        let p = Path::new("/tmp/explicit.json");
        assert_eq!(resolve_config_path(Some(p)), Some(p.to_path_buf()));
    }

    #[test]
    fn test_database_path_joins_output_dir() {
        let cfg = ScrapeConfig {
            output_dir: PathBuf::from("out"),
            ..ScrapeConfig::default()
        };
        assert_eq!(cfg.database_path(), PathBuf::from("out/products.db"));

        let abs = ScrapeConfig {
            database: PathBuf::from("/var/db/p.db"),
            ..cfg
        };
        assert_eq!(abs.database_path(), PathBuf::from("/var/db/p.db"));
    }

    #[test]
    fn test_env_overrides() {
        let cfg = with_env(
            &[
                ("SHOPSCOUT_MAX_PRODUCTS", " 7 "),
                ("SHOPSCOUT_HEADLESS", "off"),
                ("SHOPSCOUT_SITE_ORIGIN", "https://shop.test"),
                ("SHOPSCOUT_OUTPUT_DIR", "/tmp/scout-out"),
                ("SHOPSCOUT_DATABASE", "runs.db"),
                ("SHOPSCOUT_CHROMIUM_PATH", "/opt/chrome/chrome"),
            ],
            || ScrapeConfig::default().apply_env(),
        );
        assert_eq!(cfg.max_products, 7);
        assert!(!cfg.headless);
        assert_eq!(cfg.site_origin, "https://shop.test");
        assert_eq!(cfg.output_dir, PathBuf::from("/tmp/scout-out"));
        assert_eq!(cfg.database_path(), PathBuf::from("/tmp/scout-out/runs.db"));
        assert_eq!(cfg.chromium_path, Some(PathBuf::from("/opt/chrome/chrome")));
    }

    #[test]
    fn test_unparsable_env_keeps_defaults() {
        let cfg = with_env(
            &[
                ("SHOPSCOUT_MAX_PRODUCTS", "lots"),
                ("SHOPSCOUT_HEADLESS", "maybe"),
            ],
            || ScrapeConfig::default().apply_env(),
        );
        assert_eq!(cfg, ScrapeConfig::default());
    }

    #[test]
    fn test_env_bool_spellings() {
        for (value, expected) in [
            ("1", true),
            ("TRUE", true),
            ("yes", true),
            ("On", true),
            ("0", false),
            ("False", false),
            ("no", false),
            ("off", false),
        ] {
            let got = with_env(&[("SHOPSCOUT_HEADLESS", value)], || {
                read_env_bool("SHOPSCOUT_HEADLESS", !expected)
            });
            assert_eq!(got, expected, "{value}");
        }
        assert!(with_env(&[], || read_env_bool("SHOPSCOUT_HEADLESS", true)));
    }

    #[test]
    fn test_config_path_resolution_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_products": 3, "headless": false}}"#).unwrap();
        let from_env = file.path().display().to_string();
        let explicit = Path::new("/tmp/explicit.json");

        with_env(&[("SHOPSCOUT_CONFIG", from_env.as_str())], || {
            assert_eq!(resolve_config_path(Some(explicit)), Some(explicit.to_path_buf()));
            assert_eq!(resolve_config_path(None), Some(file.path().to_path_buf()));
        });
        with_env(&[("SHOPSCOUT_CONFIG", "")], || {
            assert_eq!(resolve_config_path(None), None);
        });
    }

    #[test]
    fn test_load_applies_env_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_products": 3, "headless": false}}"#).unwrap();
        let path = file.path().display().to_string();

        let cfg = with_env(
            &[("SHOPSCOUT_CONFIG", path.as_str()), ("SHOPSCOUT_MAX_PRODUCTS", "11")],
            || ScrapeConfig::load(None).unwrap(),
        );
        assert_eq!(cfg.max_products, 11);
        assert!(!cfg.headless);
    }
}
