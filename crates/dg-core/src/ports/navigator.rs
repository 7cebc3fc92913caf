use async_trait::async_trait;

use crate::navigation::Route;

#[async_trait]
pub trait NavigatorPort: Send + Sync {
    async fn navigate(&self, route: Route);
}
