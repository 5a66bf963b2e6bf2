//! Application configuration for Aragorn.
//!
//! User config lives at `~/.aragorn/aragorn.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AragornError, Result};
use crate::types::{MergeStrategy, check_path_segment};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "aragorn.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".aragorn";

// ---------------------------------------------------------------------------
// Config structs (matching aragorn.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Service endpoints.
    #[serde(default)]
    pub services: ServicesConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Merge strategy used when the CLI doesn't pass one.
    #[serde(default = "default_merge_strategy")]
    pub merge_strategy: String,

    /// Directory receiving intermediate answer snapshots. Unset disables them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_dir: Option<String>,

    /// HTTP request timeout. Unset leaves the client default in place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            merge_strategy: default_merge_strategy(),
            snapshot_dir: None,
            timeout_secs: None,
        }
    }
}

fn default_merge_strategy() -> String {
    "none".into()
}

/// `[services]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// Strider query endpoint.
    #[serde(default = "default_strider_url")]
    pub strider_url: String,

    /// When set, Strider answers are read from this JSON file instead of the network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strider_fixture: Option<String>,

    /// Answer Coalesce base URL; the strategy is appended as a path segment.
    #[serde(default = "default_coalesce_url")]
    pub coalesce_url: String,

    /// aragorn-ranker omnicorp overlay endpoint.
    #[serde(default = "default_omnicorp_url")]
    pub omnicorp_url: String,

    /// aragorn-ranker correctness weighting endpoint.
    #[serde(default = "default_weight_url")]
    pub weight_url: String,

    /// aragorn-ranker scoring endpoint.
    #[serde(default = "default_score_url")]
    pub score_url: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            strider_url: default_strider_url(),
            strider_fixture: None,
            coalesce_url: default_coalesce_url(),
            omnicorp_url: default_omnicorp_url(),
            weight_url: default_weight_url(),
            score_url: default_score_url(),
        }
    }
}

fn default_strider_url() -> String {
    "http://robokop.renci.org:5781/query".into()
}
fn default_coalesce_url() -> String {
    "https://answercoalesce.renci.org/coalesce".into()
}
fn default_omnicorp_url() -> String {
    "https://aragorn-ranker.renci.org/omnicorp_overlay".into()
}
fn default_weight_url() -> String {
    "https://aragorn-ranker.renci.org/weight_correctness".into()
}
fn default_score_url() -> String {
    "https://aragorn-ranker.renci.org/score".into()
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Where expansion answers come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpansionSource {
    /// POST the query to the Strider service.
    Service(Url),
    /// Read a previously captured Strider answer from disk.
    Fixture(PathBuf),
}

/// Validated downstream endpoints.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub coalesce: Url,
    pub omnicorp: Url,
    pub weight: Url,
    pub score: Url,
}

impl Endpoints {
    /// Coalesce endpoint for a given method, e.g. `.../coalesce/all`.
    ///
    /// `kind` is appended as exactly one path segment; the base URL's query
    /// and fragment are left untouched.
    pub fn coalesce_for(&self, kind: &str) -> Result<Url> {
        check_path_segment(kind)?;

        let mut url = self.coalesce.clone();
        url.path_segments_mut()
            .map_err(|()| {
                AragornError::config(format!(
                    "coalesce_url '{}' cannot take a path segment",
                    self.coalesce
                ))
            })?
            .pop_if_empty()
            .push(kind);
        Ok(url)
    }
}

/// Runtime pipeline configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Expansion source (service or fixture).
    pub expansion: ExpansionSource,
    /// Downstream service endpoints.
    pub endpoints: Endpoints,
    /// HTTP request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Default merge strategy.
    pub merge_strategy: MergeStrategy,
}

impl TryFrom<&AppConfig> for PipelineConfig {
    type Error = AragornError;

    fn try_from(config: &AppConfig) -> Result<Self> {
        let services = &config.services;

        let expansion = match &services.strider_fixture {
            Some(path) => ExpansionSource::Fixture(PathBuf::from(path)),
            None => ExpansionSource::Service(parse_url("strider_url", &services.strider_url)?),
        };

        Ok(Self {
            expansion,
            endpoints: Endpoints {
                coalesce: parse_url("coalesce_url", &services.coalesce_url)?,
                omnicorp: parse_url("omnicorp_url", &services.omnicorp_url)?,
                weight: parse_url("weight_url", &services.weight_url)?,
                score: parse_url("score_url", &services.score_url)?,
            },
            timeout_secs: config.defaults.timeout_secs,
            merge_strategy: config.defaults.merge_strategy.parse()?,
        })
    }
}

fn parse_url(key: &str, raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| AragornError::config(format!("invalid {key} '{raw}': {e}")))
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.aragorn/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| AragornError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.aragorn/aragorn.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AragornError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| AragornError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| AragornError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| AragornError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| AragornError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("merge_strategy"));
        assert!(toml_str.contains("aragorn-ranker.renci.org/score"));
        assert!(!toml_str.contains("strider_fixture"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.merge_strategy, "none");
        assert_eq!(parsed.services.strider_url, "http://robokop.renci.org:5781/query");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
merge_strategy = "all"
timeout_secs = 30

[services]
strider_fixture = "fixtures/json/strider_answer.fixture.json"
score_url = "http://localhost:9000/score"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.timeout_secs, Some(30));
        assert_eq!(config.services.score_url, "http://localhost:9000/score");
        assert_eq!(
            config.services.omnicorp_url,
            "https://aragorn-ranker.renci.org/omnicorp_overlay"
        );

        let pipeline = PipelineConfig::try_from(&config).expect("pipeline config");
        assert_eq!(pipeline.merge_strategy, MergeStrategy::Coalesce("all".into()));
        assert!(matches!(pipeline.expansion, ExpansionSource::Fixture(_)));
    }

    #[test]
    fn pipeline_config_from_defaults() {
        let pipeline = PipelineConfig::try_from(&AppConfig::default()).expect("pipeline config");
        assert_eq!(pipeline.merge_strategy, MergeStrategy::None);
        assert_eq!(pipeline.timeout_secs, None);
        match pipeline.expansion {
            ExpansionSource::Service(url) => assert_eq!(url.port(), Some(5781)),
            ExpansionSource::Fixture(_) => panic!("expected Service"),
        }
    }

    #[test]
    fn invalid_url_is_config_error() {
        let mut config = AppConfig::default();
        config.services.weight_url = "not a url".into();
        let err = PipelineConfig::try_from(&config).unwrap_err();
        assert!(err.to_string().contains("weight_url"));
    }

    #[test]
    fn coalesce_endpoint_appends_strategy() {
        let pipeline = PipelineConfig::try_from(&AppConfig::default()).expect("pipeline config");
        let url = pipeline.endpoints.coalesce_for("property").expect("url");
        assert_eq!(
            url.as_str(),
            "https://answercoalesce.renci.org/coalesce/property"
        );
    }

    #[test]
    fn coalesce_endpoint_keeps_strategy_in_one_segment() {
        let mut config = AppConfig::default();
        config.services.coalesce_url = "http://localhost:8080/coalesce/".into();
        let endpoints = PipelineConfig::try_from(&config).unwrap().endpoints;

        // Trailing slash on the base does not produce an empty segment
        let url = endpoints.coalesce_for("graph").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/coalesce/graph");

        let url = endpoints.coalesce_for("my method").unwrap();
        assert_eq!(url.path(), "/coalesce/my%20method");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);

        for bad in [".", "..", "all?x=1", "all#frag", "a/b"] {
            let err = endpoints.coalesce_for(bad).unwrap_err();
            assert!(
                matches!(err, AragornError::Validation { .. }),
                "{bad:?} gave {err}"
            );
        }
    }
}
