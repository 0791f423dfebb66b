//! Configuration management for Sourcing Insights
//!
//! Configuration is loaded from environment variables, falling back to a `.env`
//! file in the working directory.
//!
//! | variable | default | meaning |
//! |----------|---------|---------|
//! | `SI_THRESHOLDS_PATH` | unset | JSON5 threshold table replacing the reference table |
//! | `SI_DATE_LABEL_STYLE` | `us` | trend label format: `us`, `iso` or `short` |
//! | `SI_TREND_METRICS` | unset | comma-separated metrics to chart (default: threshold table) |

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::labels::DateLabelStyle;
use crate::thresholds::ThresholdConfig;

/// Main configuration struct for Sourcing Insights
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Threshold table file; `None` uses [`ThresholdConfig::reference`].
    pub thresholds_path: Option<PathBuf>,
    pub date_label_style: DateLabelStyle,
    /// Metrics to build trend series for; empty means "every thresholded metric".
    pub trend_metrics: Vec<String>,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Unparseable values fall back to defaults with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        let date_label_style = match env_value("SI_DATE_LABEL_STYLE") {
            None => DateLabelStyle::default(),
            Some(raw) => raw.parse().unwrap_or_else(|e: String| {
                tracing::warn!(error = %e, "ignoring SI_DATE_LABEL_STYLE");
                DateLabelStyle::default()
            }),
        };

        Self {
            thresholds_path: env_value("SI_THRESHOLDS_PATH")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            date_label_style,
            trend_metrics: env_value("SI_TREND_METRICS")
                .map(|v| parse_csv(&v))
                .unwrap_or_default(),
        }
    }

    /// Strict variant of [`Config::from_env`]: bad values are errors.
    pub fn try_from_env() -> Result<Self> {
        if let Some(raw) = env_value("SI_DATE_LABEL_STYLE") {
            raw.parse::<DateLabelStyle>()
                .map_err(|e| Error::Config(format!("SI_DATE_LABEL_STYLE: {e}")))?;
        }
        Ok(Self::from_env())
    }

    /// The threshold table this configuration selects.
    pub fn load_thresholds(&self) -> Result<ThresholdConfig> {
        match &self.thresholds_path {
            None => Ok(ThresholdConfig::reference()),
            Some(path) => {
                let table = ThresholdConfig::load(path)?;
                tracing::info!(path = %path.display(), metrics = table.len(), "loaded threshold table");
                Ok(table)
            }
        }
    }

    /// Metrics to chart: the configured list, else every thresholded metric.
    #[must_use]
    pub fn trend_metric_names(&self, thresholds: &ThresholdConfig) -> Vec<String> {
        if self.trend_metrics.is_empty() {
            thresholds.names().map(str::to_string).collect()
        } else {
            self.trend_metrics.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Environment access
// ---------------------------------------------------------------------------

static DOTENV_VALUES: OnceLock<HashMap<String, String>> = OnceLock::new();

#[cfg(test)]
thread_local! {
    static TEST_ENV_OVERRIDES: std::cell::RefCell<HashMap<String, String>> =
        std::cell::RefCell::new(HashMap::new());
}

#[cfg(test)]
fn test_env_override_value(key: &str) -> Option<String> {
    TEST_ENV_OVERRIDES.with(|cell| cell.borrow().get(key).cloned())
}

fn dotenv_values() -> &'static HashMap<String, String> {
    DOTENV_VALUES.get_or_init(|| load_dotenv_file(Path::new(".env")))
}

/// Read a value from the real environment first, falling back to .env.
#[must_use]
pub fn env_value(key: &str) -> Option<String> {
    #[cfg(test)]
    if let Some(v) = test_env_override_value(key) {
        return Some(v);
    }
    env::var(key)
        .ok()
        .or_else(|| dotenv_values().get(key).cloned())
}

fn load_dotenv_file(path: &Path) -> HashMap<String, String> {
    let Ok(contents) = fs::read_to_string(path) else {
        return HashMap::new();
    };
    parse_dotenv_contents(&contents)
}

/// Parse `KEY=value` lines. Blank lines, `#` comments and an `export ` prefix
/// are accepted; surrounding single or double quotes are stripped.
#[must_use]
pub fn parse_dotenv_contents(contents: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for raw_line in contents.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        map.insert(key.to_string(), unquote(value.trim()).to_string());
    }
    map
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

fn parse_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestEnvOverrideGuard {
        previous: Vec<(String, Option<String>)>,
    }

    impl TestEnvOverrideGuard {
        fn set(vars: &[(&str, &str)]) -> Self {
            let mut previous = Vec::new();
            TEST_ENV_OVERRIDES.with(|cell| {
                let mut map = cell.borrow_mut();
                for (key, value) in vars {
                    let old = map.get(*key).cloned();
                    previous.push(((*key).to_string(), old));
                    map.insert((*key).to_string(), (*value).to_string());
                }
            });
            Self { previous }
        }
    }

    impl Drop for TestEnvOverrideGuard {
        fn drop(&mut self) {
            TEST_ENV_OVERRIDES.with(|cell| {
                let mut map = cell.borrow_mut();
                for (key, old) in self.previous.drain(..) {
                    match old {
                        Some(v) => {
                            map.insert(key, v);
                        }
                        None => {
                            map.remove(&key);
                        }
                    }
                }
            });
        }
    }

    #[test]
    fn reads_overrides() {
        let _guard = TestEnvOverrideGuard::set(&[
            ("SI_THRESHOLDS_PATH", " /etc/si/thresholds.json5 "),
            ("SI_DATE_LABEL_STYLE", "iso"),
            ("SI_TREND_METRICS", "mape, mae,,late_rate "),
        ]);
        let config = Config::from_env();
        assert_eq!(
            config.thresholds_path,
            Some(PathBuf::from("/etc/si/thresholds.json5"))
        );
        assert_eq!(config.date_label_style, DateLabelStyle::Iso);
        assert_eq!(config.trend_metrics, vec!["mape", "mae", "late_rate"]);
    }

    #[test]
    fn bad_label_style_falls_back_or_errors() {
        let _guard = TestEnvOverrideGuard::set(&[("SI_DATE_LABEL_STYLE", "klingon")]);
        assert_eq!(Config::from_env().date_label_style, DateLabelStyle::Us);
        assert!(matches!(Config::try_from_env(), Err(Error::Config(_))));
    }

    #[test]
    fn blank_thresholds_path_is_unset() {
        let _guard = TestEnvOverrideGuard::set(&[("SI_THRESHOLDS_PATH", "  ")]);
        assert!(Config::from_env().thresholds_path.is_none());
    }

    #[test]
    fn default_config_uses_reference_thresholds() {
        let config = Config::default();
        assert_eq!(config.load_thresholds().unwrap(), ThresholdConfig::reference());
        let names = config.trend_metric_names(&ThresholdConfig::reference());
        assert_eq!(names.first().map(String::as_str), Some("mape"));
    }

    #[test]
    fn configured_trend_metrics_win() {
        let config = Config {
            trend_metrics: vec!["on_time_rate".into()],
            ..Config::default()
        };
        assert_eq!(
            config.trend_metric_names(&ThresholdConfig::reference()),
            vec!["on_time_rate"]
        );
    }

    #[test]
    fn thresholds_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thresholds.json5");
        fs::write(&path, "{metrics: [{name: 'mape', warnAbove: 0.2}]}").unwrap();
        let config = Config {
            thresholds_path: Some(path),
            ..Config::default()
        };
        let table = config.load_thresholds().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("mape").unwrap().warn_above, Some(0.2));
    }

    #[test]
    fn missing_thresholds_file_is_io_error() {
        let config = Config {
            thresholds_path: Some(PathBuf::from("/nonexistent/si/thresholds.json5")),
            ..Config::default()
        };
        assert!(matches!(config.load_thresholds(), Err(Error::Io(_))));
    }

    #[test]
    fn dotenv_parsing() {
        let map = parse_dotenv_contents(
            "# comment\nexport SI_DATE_LABEL_STYLE=short\nSI_TREND_METRICS=\"mape,mae\"\nNOEQUALS\n=orphan\n",
        );
        assert_eq!(map.get("SI_DATE_LABEL_STYLE").map(String::as_str), Some("short"));
        assert_eq!(map.get("SI_TREND_METRICS").map(String::as_str), Some("mape,mae"));
        assert_eq!(map.len(), 2);
    }
}
