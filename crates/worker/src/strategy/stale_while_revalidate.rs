use super::{Served, Strategies, store};
use crate::tasks::WaitUntil;
use folio_core::{Error, Request, Response, Role};
use tokio::task::JoinHandle;

impl Strategies {
    /// Answer from the static generation when possible while a live fetch
    /// refreshes it; on a miss the live fetch is the answer.
    pub(crate) async fn stale_while_revalidate(
        &self,
        request: &Request,
        wait_until: &mut WaitUntil,
    ) -> Result<Served, Error> {
        let cached = self.lookup(Role::Static, request).await;
        let revalidate = self.spawn_revalidate(request);

        if let Some(hit) = cached {
            wait_until.track("revalidate", revalidate);
            return Ok(Served::cache(hit));
        }

        match revalidate.await {
            Ok(result) => result.map(Served::network),
            Err(e) => Err(Error::Network(format!("revalidation task failed: {e}"))),
        }
    }

    fn spawn_revalidate(&self, request: &Request) -> JoinHandle<Result<Response, Error>> {
        let fetcher = self.fetcher();
        let caches = self.caches.clone();
        let name = self.generations.static_name();
        let request = request.clone();

        tokio::spawn(async move {
            let result = fetcher.fetch(&request).await;
            match &result {
                Ok(response) => store(&caches, &name, &request, response).await,
                Err(e) => tracing::debug!(url = %request.url, error = %e, "revalidation fetch failed"),
            }
            result
        })
    }
}
