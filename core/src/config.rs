//! Client configuration and session state.
//!
//! # Design
//! `Options` is the loose construction input: any field may be empty.
//! `ClientConfig::new` resolves it once, substituting the defaults below, and
//! rejects a missing access token. The accessors fall back to the same defaults
//! if a stored value is empty, so a config can never hand out an empty
//! language, version or base URL.

use std::fmt;

use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "https://api.api.ai/v1/";
pub const DEFAULT_API_VERSION: &str = "20150910";
pub const DEFAULT_CLIENT_LANG: &str = "en";

pub const ENV_ACCESS_TOKEN: &str = "APIAI_ACCESS_TOKEN";
pub const ENV_LANG: &str = "APIAI_LANG";
pub const ENV_VERSION: &str = "APIAI_VERSION";
pub const ENV_BASE_URL: &str = "APIAI_BASE_URL";
pub const ENV_SESSION_ID: &str = "APIAI_SESSION_ID";

/// Construction input for `ClientConfig`. Empty fields mean "use the default".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Options {
    pub access_token: String,
    pub api_lang: String,
    pub api_version: String,
    pub api_base_url: String,
    pub session_id: String,
}

impl Options {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            ..Default::default()
        }
    }

    /// Read options from the `APIAI_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).unwrap_or_default();
        Self {
            access_token: get(ENV_ACCESS_TOKEN),
            api_lang: get(ENV_LANG),
            api_version: get(ENV_VERSION),
            api_base_url: get(ENV_BASE_URL),
            session_id: get(ENV_SESSION_ID),
        }
    }
}

/// Resolved client configuration. The session id is the only field that
/// changes after construction.
#[derive(Clone)]
pub struct ClientConfig {
    access_token: String,
    api_lang: String,
    api_version: String,
    api_base_url: String,
    session_id: String,
}

impl ClientConfig {
    /// Resolve `options`, failing with `ApiError::Config` when no access token
    /// is given. An all-empty `Options` is the same condition.
    pub fn new(options: Options) -> Result<Self, ApiError> {
        if options.access_token.is_empty() {
            return Err(ApiError::Config(
                "access token is required for a new client".to_string(),
            ));
        }

        let session_id = if options.session_id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            options.session_id
        };

        Ok(Self {
            access_token: options.access_token,
            api_lang: or_default(options.api_lang, DEFAULT_CLIENT_LANG),
            api_version: or_default(options.api_version, DEFAULT_API_VERSION),
            api_base_url: or_default(options.api_base_url, DEFAULT_BASE_URL),
            session_id,
        })
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn api_lang(&self) -> &str {
        non_empty(&self.api_lang, DEFAULT_CLIENT_LANG)
    }

    pub fn api_version(&self) -> &str {
        non_empty(&self.api_version, DEFAULT_API_VERSION)
    }

    pub fn base_url(&self) -> &str {
        non_empty(&self.api_base_url, DEFAULT_BASE_URL)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Replace the session id used by requests built from now on.
    pub fn set_session_id(&mut self, session_id: impl Into<String>) {
        self.session_id = session_id.into();
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("access_token", &"<redacted>")
            .field("api_lang", &self.api_lang)
            .field("api_version", &self.api_version)
            .field("api_base_url", &self.api_base_url)
            .field("session_id", &self.session_id)
            .finish()
    }
}

fn or_default(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}

fn non_empty<'a>(value: &'a str, default: &'static str) -> &'a str {
    if value.is_empty() {
        default
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn empty_options_are_rejected() {
        let err = ClientConfig::new(Options::default()).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn missing_token_is_rejected_even_with_other_fields() {
        let options = Options {
            api_lang: "de".to_string(),
            session_id: "abc".to_string(),
            ..Default::default()
        };
        let err = ClientConfig::new(options).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn defaults_are_filled_in() {
        let config = ClientConfig::new(Options::new("token")).unwrap();
        assert_eq!(config.access_token(), "token");
        assert_eq!(config.api_lang(), DEFAULT_CLIENT_LANG);
        assert_eq!(config.api_version(), DEFAULT_API_VERSION);
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert!(!config.session_id().is_empty());
    }

    #[test]
    fn generated_session_ids_differ() {
        let a = ClientConfig::new(Options::new("token")).unwrap();
        let b = ClientConfig::new(Options::new("token")).unwrap();
        assert_ne!(a.session_id(), b.session_id());
        assert!(Uuid::parse_str(a.session_id()).is_ok());
    }

    #[test]
    fn explicit_values_are_kept() {
        let config = ClientConfig::new(Options {
            access_token: "token".to_string(),
            api_lang: "fr".to_string(),
            api_version: "20170712".to_string(),
            api_base_url: "http://localhost:3000/".to_string(),
            session_id: "session-1".to_string(),
        })
        .unwrap();
        assert_eq!(config.api_lang(), "fr");
        assert_eq!(config.api_version(), "20170712");
        assert_eq!(config.base_url(), "http://localhost:3000/");
        assert_eq!(config.session_id(), "session-1");
    }

    #[test]
    fn set_session_id_overwrites_without_validation() {
        let mut config = ClientConfig::new(Options::new("token")).unwrap();
        config.set_session_id("next");
        assert_eq!(config.session_id(), "next");
        config.set_session_id("");
        assert_eq!(config.session_id(), "");
    }

    #[test]
    fn debug_output_hides_access_token() {
        let config = ClientConfig::new(Options::new("super-secret")).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn options_deserialize_with_missing_fields() {
        let options: Options =
            serde_json::from_str(r#"{"access_token":"token","api_lang":"es"}"#).unwrap();
        assert_eq!(options.access_token, "token");
        assert_eq!(options.api_lang, "es");
        assert!(options.api_base_url.is_empty());
    }

    #[test]
    fn options_read_from_environment_lookup() {
        let vars: HashMap<&str, &str> =
            HashMap::from([(ENV_ACCESS_TOKEN, "env-token"), (ENV_BASE_URL, "http://mock/")]);
        let options = Options::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(options.access_token, "env-token");
        assert_eq!(options.api_base_url, "http://mock/");
        assert!(options.api_lang.is_empty());

        let config = ClientConfig::new(options).unwrap();
        assert_eq!(config.api_lang(), DEFAULT_CLIENT_LANG);
    }
}
