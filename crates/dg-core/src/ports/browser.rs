pub trait BrowserPort: Send + Sync {
    /// Open `url` in the user's default browser.
    fn open(&self, url: &str) -> anyhow::Result<()>;
}
