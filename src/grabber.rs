use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::browser::Browser;
use crate::config::{BrowserOptions, GrabConfig};
use crate::session::{self, Deadline, PageSession, SessionError};
use crate::webpage::WebPage;

/// Element that has to be visible before the page counts as rendered.
pub const BODY_SELECTOR: &str = "body";
/// Element whose outer HTML is saved.
pub const ROOT_SELECTOR: &str = "html";

/// Where in the browser session a grab failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Launch,
    Navigate,
    WaitVisible,
    Extract,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::Launch => "launching browser",
            Step::Navigate => "navigating",
            Step::WaitVisible => "waiting for the page body",
            Step::Extract => "extracting HTML",
        })
    }
}

#[derive(Error, Debug)]
pub enum GrabError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Failed to fetch content while {step}: {source}")]
    Session { step: Step, source: SessionError },
    #[error("Failed to write to file {}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("Browser task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl GrabError {
    fn session(step: Step) -> impl FnOnce(SessionError) -> Self {
        move |source| GrabError::Session { step, source }
    }
}

pub type Result<T> = std::result::Result<T, GrabError>;

/// Navigates, waits for the body and reads back the rendered document.
/// No step is retried.
pub fn fetch<S: PageSession>(session: &mut S, url: &str, deadline: Deadline) -> Result<WebPage> {

    info!(url, "navigating");
    session
        .navigate(url, deadline)
        .map_err(GrabError::session(Step::Navigate))?;

    debug!(selector = BODY_SELECTOR, "waiting until visible");
    session
        .wait_visible(BODY_SELECTOR, deadline)
        .map_err(GrabError::session(Step::WaitVisible))?;

    let html = session
        .outer_html(ROOT_SELECTOR, deadline)
        .map_err(GrabError::session(Step::Extract))?;

    debug!(bytes = html.len(), "extracted outer HTML");
    Ok(WebPage::new(url, html))
}

/// Last step a browser task entered, shared with the task that waits on it.
#[derive(Debug, Clone)]
pub struct Progress(Arc<Mutex<Step>>);

impl Default for Progress {
    fn default() -> Self {
        Self(Arc::new(Mutex::new(Step::Launch)))
    }
}

impl Progress {
    pub fn enter(&self, step: Step) {
        if let Ok(mut current) = self.0.lock() {
            *current = step;
        }
    }

    pub fn current(&self) -> Step {
        self.0.lock().map(|step| *step).unwrap_or(Step::Launch)
    }
}

/// Reports every call on the wrapped session to a [`Progress`].
struct Tracked<'a, S> {
    session: &'a mut S,
    progress: &'a Progress,
}

impl<S: PageSession> PageSession for Tracked<'_, S> {
    fn navigate(&mut self, url: &str, deadline: Deadline) -> session::Result<()> {
        self.progress.enter(Step::Navigate);
        self.session.navigate(url, deadline)
    }

    fn wait_visible(&mut self, selector: &str, deadline: Deadline) -> session::Result<()> {
        self.progress.enter(Step::WaitVisible);
        self.session.wait_visible(selector, deadline)
    }

    fn outer_html(&mut self, selector: &str, deadline: Deadline) -> session::Result<String> {
        self.progress.enter(Step::Extract);
        self.session.outer_html(selector, deadline)
    }
}

/// Launches Chrome, fetches `url` and tears the browser down again,
/// whatever the outcome.
fn grab_with_chrome(
    url: &str,
    options: &BrowserOptions,
    timeout: Duration,
    deadline: Deadline,
    progress: &Progress,
) -> Result<WebPage> {

    let browser = Browser::new(options, timeout).map_err(GrabError::session(Step::Launch))?;
    let mut session = browser
        .open_session()
        .map_err(GrabError::session(Step::Launch))?;

    let mut tracked = Tracked {
        session: &mut session,
        progress,
    };
    fetch(&mut tracked, url, deadline)
}

/// Runs `grab` on the blocking pool and saves what it returns to
/// `config.output`.
///
/// `grab` is abandoned once the deadline passes; the error then names the
/// step it last entered. The output file is only touched after a page has
/// been read.
pub async fn run_with<F>(config: &GrabConfig, grab: F) -> Result<WebPage>
where
    F: FnOnce(Deadline, &Progress) -> Result<WebPage> + Send + 'static,
{

    config.validate()?;

    let deadline = Deadline::after(config.timeout());
    let remaining = deadline.check().map_err(GrabError::session(Step::Launch))?;
    let progress = Progress::default();

    let task = {
        let progress = progress.clone();
        tokio::task::spawn_blocking(move || grab(deadline, &progress))
    };

    let webpage = match tokio::time::timeout(remaining, task).await {
        Ok(joined) => joined??,
        Err(_) => {
            return Err(GrabError::Session {
                step: progress.current(),
                source: SessionError::DeadlineExpired,
            });
        }
    };

    webpage.write_to_disk(&config.output)?;
    info!(path = %config.output.display(), bytes = webpage.html().len(), "saved page");

    Ok(webpage)
}

/// Grabs `config.url` with a headless Chrome and saves it to `config.output`.
///
/// The timeout covers launching, navigation, waiting and extraction. Chrome
/// launch cannot be interrupted, so on expiry the blocking task is left
/// behind; callers should shut their runtime down without waiting for it.
pub async fn run(config: &GrabConfig, options: &BrowserOptions) -> Result<WebPage> {

    let timeout = config.timeout();
    let url = config.url.clone();
    let options = options.clone();

    // headless_chrome blocks, keep it off the async workers
    run_with(config, move |deadline, progress| {
        grab_with_chrome(&url, &options, timeout, deadline, progress)
    })
    .await
}
