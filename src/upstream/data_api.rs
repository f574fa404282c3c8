use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

use super::{expect_success, Collection, DocumentStore, UpstreamError, UserDirectory};
use crate::identity::User;

/// REST client for the data API serving `/users`, `/histories` and `/tickets`.
#[derive(Clone)]
pub struct HttpDataApi {
    base: Url,
    client: reqwest::Client,
}

impl HttpDataApi {
    pub fn new(base: &str, client: reqwest::Client) -> anyhow::Result<Self> {
        let base = Url::parse(base).map_err(|e| anyhow::anyhow!("invalid data API URL {base:?}: {e}"))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("data API URL {base} cannot carry a path");
        }
        Ok(Self { base, client })
    }

    // Ids are appended as encoded path segments, never spliced into the path string.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[async_trait]
impl UserDirectory for HttpDataApi {
    async fn find_by_email(&self, email: &str) -> Result<Vec<User>, UpstreamError> {
        let resp = self.client.get(self.url(&["users"])).query(&[("email", email)]).send().await?;
        let users = expect_success(resp).await?.json::<Vec<User>>().await?;
        Ok(users)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, UpstreamError> {
        let resp = self.client.get(self.url(&["users", id])).send().await?;
        match expect_success(resp).await {
            Ok(resp) => Ok(Some(resp.json::<User>().await?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl DocumentStore for HttpDataApi {
    async fn fetch(&self, collection: Collection, user_id: &str) -> Result<Value, UpstreamError> {
        let resp = self.client.get(self.url(&[collection.path(), user_id])).send().await?;
        Ok(expect_success(resp).await?.json::<Value>().await?)
    }

    async fn replace(&self, collection: Collection, user_id: &str, doc: &Value) -> Result<(), UpstreamError> {
        let resp = self.client.put(self.url(&[collection.path(), user_id])).json(doc).send().await?;
        expect_success(resp).await?;
        Ok(())
    }
}
