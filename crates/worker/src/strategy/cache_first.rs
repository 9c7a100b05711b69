use super::{Served, Strategies, store};
use crate::tasks::WaitUntil;
use folio_core::{Error, Request, Role};

impl Strategies {
    /// Serve from the static generation, refreshing the entry in the
    /// background. The refresh never delays the reply.
    pub(crate) async fn cache_first(&self, request: &Request, wait_until: &mut WaitUntil) -> Result<Served, Error> {
        if let Some(hit) = self.lookup(Role::Static, request).await {
            self.spawn_refresh(request, wait_until);
            return Ok(Served::cache(hit));
        }

        let response = self.fetcher.fetch(request).await?;
        self.store(Role::Static, request, &response).await;
        Ok(Served::network(response))
    }

    fn spawn_refresh(&self, request: &Request, wait_until: &mut WaitUntil) {
        let fetcher = self.fetcher();
        let caches = self.caches.clone();
        let name = self.generations.static_name();
        let request = request.clone();

        wait_until.spawn("cache-first-refresh", async move {
            match fetcher.fetch(&request).await {
                Ok(response) => store(&caches, &name, &request, &response).await,
                Err(e) => tracing::debug!(url = %request.url, error = %e, "background refresh failed"),
            }
        });
    }
}
