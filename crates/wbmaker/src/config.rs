//! Instance configuration.
//!
//! A configuration file is TOML with one table per Wikibase instance:
//!
//! ```toml
//! [wb]
//! sparql_endpoint = "https://query.example.org/sparql"
//! mediawiki_api_url = "https://wiki.example.org/w/api.php"
//! wikibase_url = "https://wiki.example.org"
//! bot_user_agent = "wbmaker/0.3 (ops@example.org)"
//! ```
//!
//! Values from the environment (`WBMAKER_*`) override the file.

use crate::error::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_SECTION: &str = "wb";

pub const WIKIDATA_SPARQL_ENDPOINT: &str = "https://query.wikidata.org/sparql";
pub const WIKIDATA_MEDIAWIKI_API_URL: &str = "https://www.wikidata.org/w/api.php";
pub const WIKIDATA_URL: &str = "https://www.wikidata.org";
pub const WIKIDATA_ENTITY_NAMESPACE: &str = "http://www.wikidata.org/entity/";

/// Root of the Wikidata class tree ("entity").
pub const WIKIDATA_TOP_CLASS: &str = "Q35120";
pub const WIKIDATA_SUBCLASS_OF: &str = "P279";

const DEFAULT_USER_AGENT: &str = "wbmaker/0.3 (+https://github.com/wbmaker/wbmaker)";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

const ENV_SPARQL_ENDPOINT: &str = "WBMAKER_SPARQL_ENDPOINT";
const ENV_MEDIAWIKI_API_URL: &str = "WBMAKER_MEDIAWIKI_API_URL";
const ENV_WIKIBASE_URL: &str = "WBMAKER_WIKIBASE_URL";
const ENV_USER_AGENT: &str = "WBMAKER_USER_AGENT";

#[derive(Clone, Deserialize)]
pub struct WbConfig {
    pub sparql_endpoint: String,
    pub mediawiki_api_url: String,
    pub wikibase_url: String,
    #[serde(default = "default_user_agent")]
    pub bot_user_agent: String,
    /// Carried for callers that submit edits themselves; never used to log in.
    #[serde(default)]
    pub bot_user: Option<String>,
    #[serde(default)]
    pub bot_pass: Option<String>,
    /// Concept URI prefix of entities, e.g. `http://www.wikidata.org/entity/`.
    #[serde(default)]
    pub entity_namespace: Option<String>,
    /// Endpoint used for template parameter queries (public Wikidata by default).
    #[serde(default)]
    pub public_sparql_endpoint: Option<String>,
    /// Wiki serving entity data for template filling (Wikidata by default).
    #[serde(default)]
    pub public_wikibase_url: Option<String>,
    #[serde(default)]
    pub default_top_class: Option<String>,
    /// Id of the "subclass of" property (`P279` on Wikidata).
    #[serde(default)]
    pub subclass_of_property: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl fmt::Debug for WbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WbConfig")
            .field("sparql_endpoint", &self.sparql_endpoint)
            .field("mediawiki_api_url", &self.mediawiki_api_url)
            .field("wikibase_url", &self.wikibase_url)
            .field("bot_user_agent", &self.bot_user_agent)
            .field("bot_user", &self.bot_user)
            .field("bot_pass", &self.bot_pass.as_ref().map(|_| "<redacted>"))
            .field("entity_namespace", &self.entity_namespace)
            .field("public_sparql_endpoint", &self.public_sparql_endpoint)
            .field("public_wikibase_url", &self.public_wikibase_url)
            .field("default_top_class", &self.default_top_class)
            .field("subclass_of_property", &self.subclass_of_property)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl WbConfig {
    /// Public Wikidata, no credentials.
    pub fn wikidata() -> Self {
        Self {
            sparql_endpoint: WIKIDATA_SPARQL_ENDPOINT.to_string(),
            mediawiki_api_url: WIKIDATA_MEDIAWIKI_API_URL.to_string(),
            wikibase_url: WIKIDATA_URL.to_string(),
            bot_user_agent: default_user_agent(),
            bot_user: None,
            bot_pass: None,
            entity_namespace: Some(WIKIDATA_ENTITY_NAMESPACE.to_string()),
            public_sparql_endpoint: None,
            public_wikibase_url: None,
            default_top_class: Some(WIKIDATA_TOP_CLASS.to_string()),
            subclass_of_property: Some(WIKIDATA_SUBCLASS_OF.to_string()),
            timeout_secs: None,
        }
    }

    /// Load `section` from a TOML file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>, section: &str) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&contents, section)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml_str(contents: &str, section: &str) -> Result<Self, ConfigError> {
        let mut table: toml::Table = contents.parse()?;
        let section_value = table
            .remove(section)
            .ok_or_else(|| ConfigError::MissingSection(section.to_string()))?;
        let config: WbConfig = section_value.try_into()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("sparql_endpoint", &self.sparql_endpoint),
            ("mediawiki_api_url", &self.mediawiki_api_url),
            ("wikibase_url", &self.wikibase_url),
        ] {
            Url::parse(value)
                .map_err(|e| ConfigError::Invalid(format!("`{key}` is not a URL ({value}): {e}")))?;
        }
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) {
        let overrides = [
            (ENV_SPARQL_ENDPOINT, &mut self.sparql_endpoint),
            (ENV_MEDIAWIKI_API_URL, &mut self.mediawiki_api_url),
            (ENV_WIKIBASE_URL, &mut self.wikibase_url),
            (ENV_USER_AGENT, &mut self.bot_user_agent),
        ];
        for (var, slot) in overrides {
            if let Ok(value) = std::env::var(var) {
                let value = value.trim();
                if !value.is_empty() {
                    tracing::debug!(var, "configuration overridden from environment");
                    *slot = value.to_string();
                }
            }
        }
    }

    /// Host part of `wikibase_url`.
    pub fn domain(&self) -> Option<String> {
        Url::parse(&self.wikibase_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }

    pub fn entity_namespace(&self) -> String {
        if let Some(ns) = &self.entity_namespace {
            return ns.clone();
        }
        if self.domain().as_deref() == Some("www.wikidata.org") {
            return WIKIDATA_ENTITY_NAMESPACE.to_string();
        }
        format!("{}/entity/", self.wikibase_url.trim_end_matches('/'))
    }

    pub fn public_sparql_endpoint(&self) -> &str {
        self.public_sparql_endpoint
            .as_deref()
            .unwrap_or(WIKIDATA_SPARQL_ENDPOINT)
    }

    pub fn public_wikibase_url(&self) -> &str {
        self.public_wikibase_url.as_deref().unwrap_or(WIKIDATA_URL)
    }

    pub fn public_mediawiki_api_url(&self) -> String {
        match &self.public_wikibase_url {
            Some(url) => format!("{}/w/api.php", url.trim_end_matches('/')),
            None => WIKIDATA_MEDIAWIKI_API_URL.to_string(),
        }
    }

    pub fn default_top_class(&self) -> &str {
        self.default_top_class.as_deref().unwrap_or(WIKIDATA_TOP_CLASS)
    }

    pub fn subclass_of_property(&self) -> &str {
        self.subclass_of_property
            .as_deref()
            .unwrap_or(WIKIDATA_SUBCLASS_OF)
    }

    /// Truthy-statement predicate URI of `pid`, e.g.
    /// `http://www.wikidata.org/prop/direct/P279`.
    pub fn direct_property_uri(&self, pid: &str) -> String {
        let ns = self.entity_namespace();
        let base = ns.trim_end_matches('/');
        let base = base.strip_suffix("/entity").unwrap_or(base);
        format!("{base}/prop/direct/{pid}")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [wb]
        sparql_endpoint = "https://query.example.org/sparql"
        mediawiki_api_url = "https://wiki.example.org/w/api.php"
        wikibase_url = "https://wiki.example.org"
        bot_user_agent = "test-agent/1.0"
        bot_user = "Bot"
        bot_pass = "secret"

        [other]
        sparql_endpoint = "https://other.example.org/sparql"
        mediawiki_api_url = "https://other.example.org/w/api.php"
        wikibase_url = "https://other.example.org"
    "#;

    #[test]
    fn test_section_is_selected() {
        let config = WbConfig::from_toml_str(SAMPLE, "other").unwrap();
        assert_eq!(config.sparql_endpoint, "https://other.example.org/sparql");
        assert_eq!(config.bot_user_agent, DEFAULT_USER_AGENT);
        assert!(config.bot_user.is_none());
    }

    #[test]
    fn test_missing_section_is_reported() {
        let err = WbConfig::from_toml_str(SAMPLE, "nope").unwrap_err();
        assert!(matches!(err, ConfigError::MissingSection(s) if s == "nope"));
    }

    #[test]
    fn test_missing_required_key_is_a_parse_error() {
        let err = WbConfig::from_toml_str("[wb]\nwikibase_url = \"https://x.org\"\n", "wb")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_non_url_is_rejected() {
        let text = r#"
            [wb]
            sparql_endpoint = "not a url"
            mediawiki_api_url = "https://wiki.example.org/w/api.php"
            wikibase_url = "https://wiki.example.org"
        "#;
        let err = WbConfig::from_toml_str(text, "wb").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_domain_and_namespace() {
        let config = WbConfig::from_toml_str(SAMPLE, "wb").unwrap();
        assert_eq!(config.domain().as_deref(), Some("wiki.example.org"));
        assert_eq!(config.entity_namespace(), "https://wiki.example.org/entity/");

        let wd = WbConfig::wikidata();
        assert_eq!(wd.domain().as_deref(), Some("www.wikidata.org"));
        assert_eq!(wd.entity_namespace(), WIKIDATA_ENTITY_NAMESPACE);
        assert_eq!(wd.default_top_class(), "Q35120");
        assert_eq!(
            wd.direct_property_uri(wd.subclass_of_property()),
            "http://www.wikidata.org/prop/direct/P279"
        );
        assert_eq!(
            config.direct_property_uri("P5"),
            "https://wiki.example.org/prop/direct/P5"
        );
    }

    #[test]
    fn test_public_sources_default_to_wikidata() {
        let config = WbConfig::from_toml_str(SAMPLE, "wb").unwrap();
        assert_eq!(config.public_sparql_endpoint(), WIKIDATA_SPARQL_ENDPOINT);
        assert_eq!(config.public_wikibase_url(), WIKIDATA_URL);
        assert_eq!(config.public_mediawiki_api_url(), WIKIDATA_MEDIAWIKI_API_URL);

        let text = format!("{SAMPLE}public_wikibase_url = \"https://mirror.example.org/\"\n");
        let mirrored = WbConfig::from_toml_str(&text, "other").unwrap();
        assert_eq!(mirrored.public_wikibase_url(), "https://mirror.example.org/");
        assert_eq!(
            mirrored.public_mediawiki_api_url(),
            "https://mirror.example.org/w/api.php"
        );
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = WbConfig::from_toml_str(SAMPLE, "wb").unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = WbConfig::load(dir.path().join("absent.toml"), DEFAULT_SECTION).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = WbConfig::load(&path, DEFAULT_SECTION).unwrap();
        assert_eq!(config.bot_user.as_deref(), Some("Bot"));
    }
}
