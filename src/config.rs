//! Support for library configuration options

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use url::Url;

use crate::error::ConsoleError;

/// Name of the HTTP header that carries the admin token.
/// Feel free to override it when initing this library.
pub static ADMIN_HEADER: Lazy<Arc<Mutex<String>>> = Lazy::new(|| Arc::new(Mutex::new("x-admin-token".to_string())));

/// User agent sent with every request.
/// Feel free to override it when initing this library.
pub static USER_AGENT: Lazy<Arc<Mutex<String>>> = Lazy::new(|| Arc::new(Mutex::new(format!("event-console/{}", env!("CARGO_PKG_VERSION")))));

/// Backend used when nothing else is configured
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_PROFILE: &str = "default";

pub const BACKEND_ENV: &str = "EVENT_CONSOLE_BACKEND";
pub const STATE_DIR_ENV: &str = "EVENT_CONSOLE_STATE_DIR";
pub const PROFILE_ENV: &str = "EVENT_CONSOLE_PROFILE";


/// Where to find the backend, and where to keep local state
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub backend_url: Url,
    /// The folder that holds the persisted admin tokens
    pub state_dir: PathBuf,
    /// Several profiles (e.g. one per backend) each keep their own admin token
    pub profile: String,
}

impl Settings {
    /// Read the settings from the environment, falling back to defaults
    pub fn from_env() -> Result<Self, ConsoleError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Settings::from_env`], with a custom variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConsoleError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| v.trim().is_empty() == false);

        let backend_url = parse_backend_url(&non_empty(BACKEND_ENV).unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()))?;
        let state_dir = non_empty(STATE_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(default_state_dir);
        let profile = non_empty(PROFILE_ENV).unwrap_or_else(|| DEFAULT_PROFILE.to_string());

        Ok(Self { backend_url, state_dir, profile })
    }
}

/// Parse a backend URL. A trailing slash is added so that endpoints can be joined to it
pub fn parse_backend_url(raw: &str) -> Result<Url, ConsoleError> {
    let mut url = Url::parse(raw.trim())?;
    if url.path().ends_with('/') == false {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn default_state_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("event-console")
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let settings = Settings::from_lookup(|_| None).unwrap();
        assert_eq!(settings.backend_url.as_str(), "http://127.0.0.1:8000/");
        assert_eq!(settings.profile, DEFAULT_PROFILE);
        assert!(settings.state_dir.ends_with("event-console"));
    }

    #[test]
    fn overrides() {
        let env: HashMap<&str, &str> = vec![
            (BACKEND_ENV, "https://m15.example.org/api"),
            (STATE_DIR_ENV, "/tmp/console"),
            (PROFILE_ENV, "staging"),
        ].into_iter().collect();
        let settings = Settings::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(settings.backend_url.as_str(), "https://m15.example.org/api/");
        assert_eq!(settings.backend_url.join("calendar").unwrap().as_str(), "https://m15.example.org/api/calendar");
        assert_eq!(settings.state_dir, PathBuf::from("/tmp/console"));
        assert_eq!(settings.profile, "staging");
    }

    #[test]
    fn invalid_backend() {
        assert!(matches!(parse_backend_url("not a url"), Err(ConsoleError::Url(_))));
    }
}
