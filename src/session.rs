use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("ChromeError: {0}")]
    Chrome(#[from] anyhow::Error),
    #[error("Can't configure browser launch: {0}")]
    Launch(String),
    #[error("deadline expired")]
    DeadlineExpired,
    #[error("element `{0}` did not become visible before the deadline")]
    NotVisible(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Instant);

impl Deadline {
    // Large timeouts saturate here instead of overflowing `Instant`.
    const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365);

    pub fn after(timeout: Duration) -> Self {
        let now = Instant::now();
        Self(
            now.checked_add(timeout)
                .unwrap_or_else(|| now + Self::FAR_FUTURE),
        )
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.0
            .checked_duration_since(Instant::now())
            .filter(|left| !left.is_zero())
    }

    pub fn check(&self) -> Result<Duration> {
        self.remaining().ok_or(SessionError::DeadlineExpired)
    }
}

/// A single page in a running browser. No call may block past `deadline`.
pub trait PageSession {
    fn navigate(&mut self, url: &str, deadline: Deadline) -> Result<()>;

    /// Blocks until the first element matching `selector` has a layout box.
    fn wait_visible(&mut self, selector: &str, deadline: Deadline) -> Result<()>;

    fn outer_html(&mut self, selector: &str, deadline: Deadline) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timeout_is_already_expired() {
        let deadline = Deadline::after(Duration::ZERO);
        assert_eq!(deadline.remaining(), None);
        assert!(matches!(deadline.check(), Err(SessionError::DeadlineExpired)));
    }

    #[test]
    fn remaining_never_exceeds_timeout() {
        let deadline = Deadline::after(Duration::from_secs(30));
        let left = deadline.check().unwrap();
        assert!(left <= Duration::from_secs(30));
        assert!(left > Duration::from_secs(29));
    }

    #[test]
    fn huge_timeout_does_not_overflow() {
        let deadline = Deadline::after(Duration::from_secs(u64::MAX));
        assert!(deadline.remaining().is_some());
    }
}
