use super::{Served, Strategies};
use folio_core::{Error, Request, Role};

impl Strategies {
    /// Live fetch first; the dynamic generation only answers when the network
    /// is unreachable.
    pub(crate) async fn network_first(&self, request: &Request) -> Result<Served, Error> {
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.store(Role::Dynamic, request, &response).await;
                Ok(Served::network(response))
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "network-first fetch failed, trying dynamic cache");
                match self.lookup(Role::Dynamic, request).await {
                    Some(hit) => Ok(Served::cache(hit)),
                    None => Err(e),
                }
            }
        }
    }
}
