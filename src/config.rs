use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use crate::grabber::{GrabError, Result};

pub const DEFAULT_OUTPUT: &str = "out.html";
pub const DEFAULT_TIMEOUT_SECS: i64 = 60;

/// What to fetch, where to put it and how long the whole fetch may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrabConfig {
    pub url: String,
    pub output: PathBuf,
    /// Seconds for navigation, wait and extraction together.
    pub timeout_secs: i64,
}

impl GrabConfig {

    pub fn new(url: impl Into<String>, output: impl Into<PathBuf>, timeout_secs: i64) -> Self {
        Self {
            url: url.into(),
            output: output.into(),
            timeout_secs,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(GrabError::Configuration("URL must be provided".to_string()));
        }
        if self.timeout_secs <= 0 {
            return Err(GrabError::Configuration(format!(
                "timeout must be a positive number of seconds, got {}",
                self.timeout_secs
            )));
        }
        Ok(())
    }

    /// The timeout as a duration; non-positive values clamp to zero.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(0) as u64)
    }
}

/// How Chrome gets launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserOptions {
    pub sandbox: bool,
    /// Chrome binary to use instead of the auto-detected one.
    pub chrome_path: Option<PathBuf>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            sandbox: true,
            chrome_path: None,
        }
    }
}

impl BrowserOptions {
    pub const DISABLE_SANDBOX_VAR: &str = "WEBPAGEGRABBER_DISABLE_SANDBOX";
    pub const CHROME_PATH_VAR: &str = "WEBPAGEGRABBER_CHROME";

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        Self {
            sandbox: lookup(Self::DISABLE_SANDBOX_VAR).is_none(),
            chrome_path: lookup(Self::CHROME_PATH_VAR)
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
        }
    }
}
