use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

pub const EMAIL_VAR: &str = "STOCKTITAN_EMAIL";
pub const PASSWORD_VAR: &str = "STOCKTITAN_PASSWORD";

pub const DEFAULT_BASE_URL: &str = "https://www.stocktitan.net";
pub const DEFAULT_LISTING_PATH: &str = "/sec-filings/live.html";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
pub const DEFAULT_OUTPUT_PREFIX: &str = "sec_amendments_";
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 1000;

/// Values shipped in sample configs; running with them would only produce
/// failed logins against the live site.
const PLACEHOLDERS: &[&str] = &[
    "your-email@domain.com",
    "your-password",
    "placeholder",
    "changeme",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    MissingVariable(&'static str),
    #[error("{0} environment variable still holds a placeholder value")]
    PlaceholderVariable(&'static str),
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid URL {0:?}: {1}")]
    InvalidUrl(String, url::ParseError),
    #[error("invalid CSS selector {0:?}")]
    InvalidSelector(String),
}

impl ConfigError {
    /// True for errors caused by the credential environment variables.
    pub fn is_credentials(&self) -> bool {
        matches!(
            self,
            ConfigError::MissingVariable(_) | ConfigError::PlaceholderVariable(_)
        )
    }
}

/// Login identifier and secret for one authentication attempt.
#[derive(Clone)]
pub struct Credentials {
    identifier: String,
    secret: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads both variables through `lookup`, rejecting absent, blank and
    /// placeholder values before anything touches the network.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let identifier = require(&lookup, EMAIL_VAR)?;
        let secret = require(&lookup, PASSWORD_VAR)?;
        Ok(Self { identifier, secret })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &"<redacted>")
            .field("secret", &"<redacted>")
            .finish()
    }
}

fn require<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingVariable(key))?;
    if is_placeholder(&value) {
        return Err(ConfigError::PlaceholderVariable(key));
    }
    Ok(value)
}

pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    PLACEHOLDERS.iter().any(|p| value.eq_ignore_ascii_case(p))
}

/// Markers that reveal a successful login in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuccessIndicator {
    /// Case-insensitive substring of the response body.
    pub body_contains: Option<String>,
    /// Case-insensitive substring of the final URL after redirects.
    pub url_contains: Option<String>,
}

impl Default for SuccessIndicator {
    fn default() -> Self {
        Self {
            body_contains: Some("logout".to_string()),
            url_contains: Some("dashboard".to_string()),
        }
    }
}

impl SuccessIndicator {
    pub fn body_matches(&self, body: &str) -> bool {
        self.body_contains
            .as_deref()
            .filter(|marker| !marker.is_empty())
            .map(|marker| body.to_lowercase().contains(&marker.to_lowercase()))
            .unwrap_or(false)
    }

    pub fn url_matches(&self, url: &Url) -> bool {
        self.url_contains
            .as_deref()
            .filter(|marker| !marker.is_empty())
            .map(|marker| url.as_str().to_lowercase().contains(&marker.to_lowercase()))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginEndpoint {
    pub path: String,
    #[serde(default)]
    pub success: SuccessIndicator,
}

impl LoginEndpoint {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            success: SuccessIndicator::default(),
        }
    }
}

/// Declarative login strategy: which endpoints to try directly, what the
/// payload looks like, and how to recognise the login form on the site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginPolicy {
    pub endpoints: Vec<LoginEndpoint>,
    pub identifier_field: String,
    pub secret_field: String,
    pub extra_fields: Vec<(String, String)>,
    /// Substrings of form field names that take the identifier.
    pub identifier_hints: Vec<String>,
    pub login_link_text: String,
    pub default_action: String,
    pub form_success: SuccessIndicator,
}

impl Default for LoginPolicy {
    fn default() -> Self {
        Self {
            endpoints: ["/login", "/auth/login", "/user/login", "/api/login"]
                .iter()
                .map(|path| LoginEndpoint::new(path))
                .collect(),
            identifier_field: "email".to_string(),
            secret_field: "password".to_string(),
            extra_fields: vec![
                ("login".to_string(), "Login".to_string()),
                ("submit".to_string(), "Login".to_string()),
            ],
            identifier_hints: vec!["email".to_string(), "username".to_string()],
            login_link_text: "login".to_string(),
            default_action: "/login".to_string(),
            form_success: SuccessIndicator {
                body_contains: Some("logout".to_string()),
                url_contains: None,
            },
        }
    }
}

/// Listing table column positions. Unverified against the live page, so
/// kept as configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub date: usize,
    pub time: usize,
    pub symbol: usize,
    pub form_type: usize,
    pub company: usize,
    pub title: usize,
    /// Rows with fewer cells are skipped.
    pub min_cells: usize,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            date: 0,
            time: 1,
            symbol: 2,
            form_type: 3,
            company: 4,
            title: 5,
            min_cells: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub base_url: String,
    /// Path or absolute URL of the listing page, resolved against `base_url`.
    pub listing_path: String,
    pub user_agent: String,
    pub login: LoginPolicy,
    pub columns: ColumnMap,
    /// Detail-page selectors in priority order.
    pub summary_selectors: Vec<String>,
    pub request_delay_ms: u64,
    pub output_prefix: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            listing_path: DEFAULT_LISTING_PATH.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            login: LoginPolicy::default(),
            columns: ColumnMap::default(),
            summary_selectors: [
                r#"div[class*="ai-summary"]"#,
                r#"div[class*="summary"]"#,
                r#"div[id*="summary"]"#,
                r#"div[class*="ai"]"#,
                ".summary",
                "#ai-summary",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            request_delay_ms: DEFAULT_REQUEST_DELAY_MS,
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
        }
    }
}

impl ScraperConfig {
    /// Defaults, overridden field by field by the JSON file at `path`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            None => Self::default(),
            Some(path) => {
                let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listing_url()?;
        compile_selectors(&self.summary_selectors)?;
        Ok(())
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidUrl(self.base_url.clone(), e))
    }

    pub fn listing_url(&self) -> Result<Url, ConfigError> {
        self.base_url()?
            .join(&self.listing_path)
            .map_err(|e| ConfigError::InvalidUrl(self.listing_path.clone(), e))
    }
}

pub fn compile_selectors(raw: &[String]) -> Result<Vec<Selector>, ConfigError> {
    raw.iter()
        .map(|css| Selector::parse(css).map_err(|_| ConfigError::InvalidSelector(css.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_credentials_from_lookup() {
        let creds = Credentials::from_lookup(lookup(&[
            (EMAIL_VAR, "analyst@fund.com"),
            (PASSWORD_VAR, "s3cret"),
        ]))
        .unwrap();
        assert_eq!(creds.identifier(), "analyst@fund.com");
        assert_eq!(creds.secret(), "s3cret");
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let err = Credentials::from_lookup(lookup(&[(EMAIL_VAR, "analyst@fund.com")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVariable(PASSWORD_VAR)));

        let err = Credentials::from_lookup(lookup(&[(EMAIL_VAR, "  "), (PASSWORD_VAR, "x")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingVariable(EMAIL_VAR)));
    }

    #[test]
    fn test_placeholder_credentials_rejected() {
        let err = Credentials::from_lookup(lookup(&[
            (EMAIL_VAR, "user@test.com"),
            (PASSWORD_VAR, "placeholder"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::PlaceholderVariable(PASSWORD_VAR)));
        assert!(err.is_credentials());

        let err = Credentials::from_lookup(lookup(&[
            (EMAIL_VAR, "your-email@domain.com"),
            (PASSWORD_VAR, "real"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::PlaceholderVariable(EMAIL_VAR)));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = Credentials::new("analyst@fund.com", "hunter2");
        let shown = format!("{:?}", creds);
        assert!(!shown.contains("hunter2"));
        assert!(!shown.contains("analyst"));
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = ScraperConfig::default();
        config.validate().unwrap();
        assert_eq!(
            config.listing_url().unwrap().as_str(),
            "https://www.stocktitan.net/sec-filings/live.html"
        );
        assert_eq!(config.login.endpoints.len(), 4);
    }

    #[test]
    fn test_partial_config_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.json");
        fs::write(
            &path,
            r#"{"request_delay_ms": 0, "columns": {"form_type": 2}, "login": {"endpoints": [{"path": "/signin"}]}}"#,
        )
        .unwrap();

        let config = ScraperConfig::load(Some(&path)).unwrap();
        assert_eq!(config.request_delay_ms, 0);
        assert_eq!(config.columns.form_type, 2);
        assert_eq!(config.columns.min_cells, 4);
        assert_eq!(config.login.endpoints, vec![LoginEndpoint::new("/signin")]);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let config = ScraperConfig {
            summary_selectors: vec!["div[[".to_string()],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidSelector(_))));
    }

    #[test]
    fn test_success_indicator_is_case_insensitive() {
        let indicator = SuccessIndicator::default();
        assert!(indicator.body_matches("<a href=\"/out\">LogOut</a>"));
        assert!(!indicator.body_matches("<a>Sign in</a>"));
        assert!(indicator.url_matches(&Url::parse("https://example.com/Dashboard/home").unwrap()));
        assert!(!SuccessIndicator { body_contains: None, url_contains: None }.body_matches("logout"));
    }
}
