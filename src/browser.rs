use headless_chrome::util::Wait;
use headless_chrome::{LaunchOptions, Tab};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::BrowserOptions;
use crate::session::{Deadline, PageSession, Result, SessionError};

/// How often `wait_visible` re-checks the page.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Extra idle time granted to Chrome on top of the fetch timeout, so its
/// own watchdog never fires before our deadline does.
const IDLE_MARGIN: Duration = Duration::from_secs(5);

/// A headless Chrome process. Dropping it kills the process.
pub struct Browser(headless_chrome::Browser);

impl Browser {

    pub fn new(options: &BrowserOptions, timeout: Duration) -> Result<Self> {

        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(options.sandbox)
            .path(options.chrome_path.clone())
            .idle_browser_timeout(timeout.saturating_add(IDLE_MARGIN))
            .build()
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        debug!(sandbox = options.sandbox, chrome = ?options.chrome_path, "launching chrome");

        Ok(Self(headless_chrome::Browser::new(launch_options)?))
    }

    pub fn open_session(&self) -> Result<ChromeSession> {
        let tab = self.0.new_tab()?;
        Ok(ChromeSession { tab })
    }
}

/// One tab of a [`Browser`].
pub struct ChromeSession {
    tab: Arc<Tab>,
}

impl PageSession for ChromeSession {

    fn navigate(&mut self, url: &str, deadline: Deadline) -> Result<()> {
        let remaining = deadline.check()?;
        self.tab.set_default_timeout(remaining);

        self.tab.navigate_to(url)?.wait_until_navigated()?;

        Ok(())
    }

    fn wait_visible(&mut self, selector: &str, deadline: Deadline) -> Result<()> {
        let remaining = deadline.check()?;
        let tab = &self.tab;

        // an element without a box model is not rendered
        Wait::new(remaining, POLL_INTERVAL)
            .until(|| {
                tab.find_element(selector)
                    .ok()
                    .filter(|element| element.get_box_model().is_ok())
                    .map(|_| ())
            })
            .map_err(|_| SessionError::NotVisible(selector.to_string()))
    }

    fn outer_html(&mut self, selector: &str, deadline: Deadline) -> Result<String> {
        let remaining = deadline.check()?;
        self.tab.set_default_timeout(remaining);

        let element = self.tab.find_element(selector)?;

        Ok(element.get_content()?)
    }
}
