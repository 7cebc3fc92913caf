use anyhow::Context;
use tracing::debug;

use dg_core::ports::BrowserPort;

/// Opens URLs with the platform's default handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl BrowserPort for SystemBrowser {
    fn open(&self, url: &str) -> anyhow::Result<()> {
        debug!(url, "opening browser");
        open::that(url).with_context(|| format!("failed to open browser for {url}"))
    }
}
