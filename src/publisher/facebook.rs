//! Facebook page/group delivery through the Graph API feed edge

use reqwest::Client;
use serde::Deserialize;

use super::{compose_text, Delivery, PublishOutcome};
use crate::models::PublishPost;
use crate::utils::error::PublishError;

const DEFAULT_BASE_URL: &str = "https://graph.facebook.com";
const GRAPH_VERSION: &str = "v18.0";
const PLATFORM: &str = "facebook";

/// Graph API answer: either an object id or an error
#[derive(Debug, Deserialize)]
struct GraphResponse {
    id: Option<String>,
    name: Option<String>,
    error: Option<GraphError>,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    message: String,
}

impl GraphResponse {
    fn into_result(self) -> PublishOutcome<(String, Option<String>)> {
        match (self.id, self.error) {
            (Some(id), _) => Ok((id, self.name)),
            (None, Some(err)) => Err(PublishError::api(PLATFORM, err.message)),
            (None, None) => Err(PublishError::invalid_response(PLATFORM, "Unknown error")),
        }
    }
}

/// Graph API client
#[derive(Debug, Clone)]
pub struct FacebookClient {
    client: Client,
    base_url: String,
}

impl FacebookClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Pages and groups share the same feed edge
    pub async fn post(
        &self,
        access_token: &str,
        target_id: &str,
        post: &PublishPost,
    ) -> PublishOutcome<Delivery> {
        let message = compose_text(post);
        let mut form = vec![("message", message.as_str()), ("access_token", access_token)];
        if let Some(image) = &post.image {
            form.push(("link", image.as_str()));
        }

        let graph: GraphResponse = self
            .client
            .post(format!("{}/{GRAPH_VERSION}/{target_id}/feed", self.base_url))
            .form(&form)
            .send()
            .await?
            .json()
            .await
            .map_err(|e| PublishError::invalid_response(PLATFORM, e.without_url().to_string()))?;

        let (id, _) = graph.into_result()?;
        Ok(Delivery {
            url: Some(format!("https://facebook.com/{id}")),
            post_id: id,
        })
    }

    pub async fn verify(&self, access_token: &str, target_id: &str) -> PublishOutcome<String> {
        let graph: GraphResponse = self
            .client
            .get(format!("{}/{GRAPH_VERSION}/{target_id}", self.base_url))
            .query(&[("fields", "id,name"), ("access_token", access_token)])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| PublishError::invalid_response(PLATFORM, e.without_url().to_string()))?;

        let (id, name) = graph.into_result()?;
        Ok(name.unwrap_or(id))
    }
}
