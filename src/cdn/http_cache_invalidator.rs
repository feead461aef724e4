use anyhow::anyhow;
use async_trait::async_trait;
use hyper::body::to_bytes;
use hyper::client::HttpConnector;
use hyper::header::{CONTENT_TYPE, USER_AGENT};
use hyper::{Body, Client, Request, Uri};
use hyper_tls::HttpsConnector;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Serialize;
use tracing::{debug, trace};

use crate::cdn::cache_invalidator::CacheInvalidator;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InvalidationRequest<'a> {
    distribution_id: &'a str,
    paths: &'a [String],
    caller_reference: &'a str,
}

/// Sends invalidation requests as JSON to `<base uri>distributions/<distribution id>/invalidations`,
///  treating any non-2xx response as failure.
///
/// Instances do HTTP connection caching internally, so keeping them alive has performance benefits.
pub struct HttpCacheInvalidator {
    client: Client<HttpsConnector<HttpConnector>>,
    base_uri: String, // with trailing '/'
}
impl HttpCacheInvalidator {
    pub fn new(base_uri: String) -> anyhow::Result<HttpCacheInvalidator> {
        let mut base_uri = base_uri;
        if !base_uri.ends_with('/') {
            base_uri.push('/');
        }

        // check that the base URI is valid
        Uri::try_from(base_uri.clone())?;

        Ok(HttpCacheInvalidator {
            client: Client::builder()
                .build::<_, Body>(HttpsConnector::new()),
            base_uri,
        })
    }

    fn invalidation_uri(&self, distribution_id: &str) -> String {
        format!(
            "{}distributions/{}/invalidations",
            self.base_uri,
            utf8_percent_encode(distribution_id, NON_ALPHANUMERIC),
        )
    }
}

#[async_trait]
impl CacheInvalidator for HttpCacheInvalidator {
    async fn invalidate(&self, distribution_id: &str, paths: &[String], caller_reference: &str) -> anyhow::Result<()> {
        let body = serde_json::to_vec(&InvalidationRequest {
            distribution_id,
            paths,
            caller_reference,
        })?;

        let request = Request::builder()
            .method("POST")
            .uri(Uri::try_from(self.invalidation_uri(distribution_id))?)
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, concat!("maven-indexer/", env!("CARGO_PKG_VERSION")))
            .body(Body::from(body))?;

        trace!("invalidating {:?}", request);
        let response = self.client.request(request)
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = to_bytes(response.into_body()).await.unwrap_or_default();
            return Err(anyhow!("invalidation request failed: {} {}", status, String::from_utf8_lossy(&body)));
        }

        debug!("invalidated {} paths of distribution {}", paths.len(), distribution_id);
        Ok(())
    }
}
