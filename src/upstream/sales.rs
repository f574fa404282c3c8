use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Url;

use super::{capture, Reply, SalesApi, UpstreamError};

/// Client for the fare-sales order endpoint. Every call carries the service API key.
#[derive(Clone)]
pub struct HttpSalesApi {
    url: Url,
    client: reqwest::Client,
    key_header: HeaderName,
    key: HeaderValue,
}

impl HttpSalesApi {
    pub fn new(url: &str, key_header: &str, key: &str, client: reqwest::Client) -> anyhow::Result<Self> {
        let url = Url::parse(url).map_err(|e| anyhow::anyhow!("invalid sales API URL {url:?}: {e}"))?;
        let key_header = HeaderName::from_bytes(key_header.as_bytes())
            .map_err(|e| anyhow::anyhow!("invalid sales API key header {key_header:?}: {e}"))?;
        let mut key = HeaderValue::from_str(key).map_err(|e| anyhow::anyhow!("invalid sales API key: {e}"))?;
        key.set_sensitive(true);
        Ok(Self { url, client, key_header, key })
    }
}

#[async_trait]
impl SalesApi for HttpSalesApi {
    async fn purchase(&self, content_type: Option<String>, body: Bytes) -> Result<Reply, UpstreamError> {
        let mut req = self.client.post(self.url.clone()).header(self.key_header.clone(), self.key.clone()).body(body);
        if let Some(ct) = content_type { req = req.header(CONTENT_TYPE, ct); }
        let resp = req.send().await?;
        let (status, content_type, body) = capture(resp).await?;
        if (200..300).contains(&status) {
            Ok(Reply { status, content_type, body })
        } else {
            Err(UpstreamError::Status { status, content_type, body })
        }
    }
}
