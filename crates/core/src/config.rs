//! Run configuration loaded from a TOML file.
//!
//! ```toml
//! [CONFIG]
//! RAPID_VIEW_ID = "1234"
//! JSESSION_ID = "0123ABCD"
//! TEAM_NAME = "Platform"
//! BACKLOG = true
//! ```

use crate::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Default Greenhopper REST root.
pub const DEFAULT_BASE_URL: &str = "https://issues.corp.rapid7.com/rest/greenhopper/1.0";

/// Default project key sent as `selectedProjectKey`.
pub const DEFAULT_PROJECT_KEY: &str = "LOG";

/// Default slide layout slot in the template's first slide master.
pub const DEFAULT_LAYOUT_INDEX: usize = 11;

/// Settings for one deck generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SprintConfig {
    /// Rapid board to fetch.
    pub rapid_view_id: String,

    /// Session token sent as the `JSESSIONID` cookie.
    pub session_id: String,

    /// Team name used in slide titles.
    pub team_name: String,

    /// Hide backlog-status issues from epic blocks.
    pub exclude_backlog: bool,

    pub base_url: String,
    pub project_key: String,
    pub backlog_status: String,
    pub done_status: String,
    pub layout_index: usize,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(rename = "CONFIG")]
    config: Option<RawConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct RawConfig {
    rapid_view_id: Option<Scalar>,
    jsession_id: Option<Scalar>,
    team_name: Option<Scalar>,
    backlog: Option<Flag>,
    base_url: Option<String>,
    project_key: Option<String>,
    backlog_status: Option<String>,
    done_status: Option<String>,
    layout_index: Option<usize>,
}

/// A string setting that may also be written as a bare number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Int(i64),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Str(s) => s.trim().to_string(),
            Scalar::Int(n) => n.to_string(),
        }
    }
}

/// A boolean setting, as a TOML bool or a yes/no style string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Flag {
    fn to_bool(&self) -> Option<bool> {
        match self {
            Flag::Bool(b) => Some(*b),
            Flag::Int(1) => Some(true),
            Flag::Int(0) => Some(false),
            Flag::Int(_) => None,
            Flag::Str(s) => match s.trim().to_lowercase().as_str() {
                "1" | "yes" | "true" | "on" => Some(true),
                "0" | "no" | "false" | "off" => Some(false),
                _ => None,
            },
        }
    }
}

fn required(value: Option<Scalar>, key: &str) -> Result<String> {
    match value.map(Scalar::into_string) {
        Some(s) if !s.is_empty() => Ok(s),
        Some(_) => Err(Error::Config(format!("{key} is empty"))),
        None => Err(Error::Config(format!("{key} is missing"))),
    }
}

fn optional(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl SprintConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        let raw = file
            .config
            .ok_or_else(|| Error::Config("missing [CONFIG] section".to_string()))?;

        let rapid_view_id = required(raw.rapid_view_id, "RAPID_VIEW_ID")?;
        let session_id = required(raw.jsession_id, "JSESSION_ID")?;
        let team_name = required(raw.team_name, "TEAM_NAME")?;

        let exclude_backlog = match raw.backlog {
            None => false,
            Some(flag) => flag
                .to_bool()
                .ok_or_else(|| Error::Config(format!("BACKLOG is not a boolean: {:?}", flag)))?,
        };

        Ok(Self {
            rapid_view_id,
            session_id,
            team_name,
            exclude_backlog,
            base_url: optional(raw.base_url, DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            project_key: optional(raw.project_key, DEFAULT_PROJECT_KEY),
            backlog_status: optional(raw.backlog_status, "Backlog"),
            done_status: optional(raw.done_status, "Done"),
            layout_index: raw.layout_index.unwrap_or(DEFAULT_LAYOUT_INDEX),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[CONFIG]
RAPID_VIEW_ID = "1234"
JSESSION_ID = "ABCDEF"
TEAM_NAME = "Platform"
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = SprintConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.rapid_view_id, "1234");
        assert_eq!(config.session_id, "ABCDEF");
        assert_eq!(config.team_name, "Platform");
        assert!(!config.exclude_backlog);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.project_key, "LOG");
        assert_eq!(config.backlog_status, "Backlog");
        assert_eq!(config.done_status, "Done");
        assert_eq!(config.layout_index, 11);
    }

    #[test]
    fn test_numeric_view_id_and_overrides() {
        let config = SprintConfig::from_toml_str(
            r#"
[CONFIG]
RAPID_VIEW_ID = 42
JSESSION_ID = "ABCDEF"
TEAM_NAME = "Platform"
BACKLOG = "yes"
BASE_URL = "https://jira.example.com/rest/greenhopper/1.0/"
PROJECT_KEY = "OPS"
DONE_STATUS = "Closed"
LAYOUT_INDEX = 1
"#,
        )
        .unwrap();
        assert_eq!(config.rapid_view_id, "42");
        assert!(config.exclude_backlog);
        assert_eq!(
            config.base_url,
            "https://jira.example.com/rest/greenhopper/1.0"
        );
        assert_eq!(config.project_key, "OPS");
        assert_eq!(config.done_status, "Closed");
        assert_eq!(config.layout_index, 1);
    }

    #[test]
    fn test_backlog_flag_forms() {
        for (value, expected) in [
            ("true", true),
            ("false", false),
            ("\"off\"", false),
            ("1", true),
        ] {
            let text = format!("{MINIMAL}BACKLOG = {value}\n");
            let config = SprintConfig::from_toml_str(&text).unwrap();
            assert_eq!(config.exclude_backlog, expected, "BACKLOG = {value}");
        }
    }

    #[test]
    fn test_invalid_backlog_flag() {
        let text = format!("{MINIMAL}BACKLOG = \"sometimes\"\n");
        let err = SprintConfig::from_toml_str(&text).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_empty_team_name_rejected() {
        let err = SprintConfig::from_toml_str(
            r#"
[CONFIG]
RAPID_VIEW_ID = "1234"
JSESSION_ID = "ABCDEF"
TEAM_NAME = ""
"#,
        )
        .unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("TEAM_NAME"));
    }

    #[test]
    fn test_missing_session_rejected() {
        let err = SprintConfig::from_toml_str(
            r#"
[CONFIG]
RAPID_VIEW_ID = "1234"
TEAM_NAME = "Platform"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("JSESSION_ID"));
    }

    #[test]
    fn test_missing_section_rejected() {
        let err = SprintConfig::from_toml_str("TEAM_NAME = 1\n").unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_missing_file_rejected() {
        let err = SprintConfig::load(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(err.is_config());
    }
}
