//! Remote wishlist mirror.
//!
//! Routes consumed:
//! - `GET    {base}/wishlist/{user_id}` returns the user's items
//! - `POST   {base}/wishlist` stores one item and returns `{ "id": ... }`
//! - `DELETE {base}/wishlist/{id}` deletes one item

use async_trait::async_trait;
use reqwest::{RequestBuilder, Url};
use serde::Deserialize;
use serde_json::Value;

use crate::config::RemoteConfig;
use crate::error::RemoteError;
use crate::models::{string_or_number, WishlistItem};

/// Server-side copy of a user's wishlist.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteWishlist: Send + Sync {
    /// Fetch every item the server holds for `user_id`.
    async fn fetch_for_user(&self, user_id: &str) -> Result<Vec<WishlistItem>, RemoteError>;

    /// Store one item and return the identifier the server assigned to it.
    async fn add_item(&self, user_id: &str, item: &WishlistItem) -> Result<String, RemoteError>;

    /// Delete one item by its server identifier.
    async fn remove_item(&self, remote_id: &str) -> Result<(), RemoteError>;
}

#[derive(Deserialize)]
struct AddItemResponse {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
}

/// JSON-over-HTTP implementation of [`RemoteWishlist`].
pub struct HttpRemoteWishlist {
    http: reqwest::Client,
    base_url: Url,
    api_token: Option<String>,
}

impl HttpRemoteWishlist {
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| RemoteError::ClientBuild(format!("invalid base url {:?}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::ClientBuild(format!(
                "base url {:?} cannot carry a path",
                config.base_url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| RemoteError::ClientBuild(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            api_token: config.api_token.clone(),
        })
    }

    /// `{base}/wishlist/{segments...}` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("wishlist").extend(segments);
        }
        url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<String, RemoteError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(RemoteError::Server {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}

#[async_trait]
impl RemoteWishlist for HttpRemoteWishlist {
    async fn fetch_for_user(&self, user_id: &str) -> Result<Vec<WishlistItem>, RemoteError> {
        let url = self.endpoint(&[user_id]);
        let text = self.send(self.http.get(url)).await?;
        serde_json::from_str(&text).map_err(|e| RemoteError::Decode(e.to_string()))
    }

    async fn add_item(&self, user_id: &str, item: &WishlistItem) -> Result<String, RemoteError> {
        let body = add_item_body(user_id, item)?;
        let url = self.endpoint(&[]);
        let text = self.send(self.http.post(url).json(&body)).await?;

        let response: AddItemResponse =
            serde_json::from_str(&text).map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(response.id)
    }

    async fn remove_item(&self, remote_id: &str) -> Result<(), RemoteError> {
        let url = self.endpoint(&[remote_id]);
        self.send(self.http.delete(url)).await?;
        Ok(())
    }
}

/// Item fields plus the owner; the local id is meaningless to the server.
fn add_item_body(user_id: &str, item: &WishlistItem) -> Result<Value, RemoteError> {
    let mut body = serde_json::to_value(item).map_err(|e| RemoteError::Decode(e.to_string()))?;
    if let Value::Object(fields) = &mut body {
        fields.remove("id");
        fields.insert("userId".to_string(), Value::String(user_id.to_string()));
    }
    Ok(body)
}
