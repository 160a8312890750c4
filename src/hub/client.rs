use crate::config::schema::HubConfig;
use crate::error::HubError;
use crate::hub::{HubApi, ModelDetails, ModelSummary};
use async_trait::async_trait;
use reqwest::header::LINK;
use reqwest::Response;
use std::time::Duration;

/// Hugging Face Hub REST client
pub struct HubClient {
    client: reqwest::Client,
    endpoint: String,
    page_size: u32,
    token: Option<String>,
}

impl std::fmt::Debug for HubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubClient")
            .field("client", &"Client { ... }")
            .field("endpoint", &self.endpoint)
            .field("page_size", &self.page_size)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl HubClient {
    /// Create a client from config, picking up a token if one is available
    pub fn new(config: &HubConfig) -> Result<Self, HubError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("hubmeta/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HubError::Network(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            page_size: config.page_size,
            token: resolve_token(&config.token_env),
        })
    }

    /// Base URL of the hub, also used for clone URLs
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get(&self, url: &str) -> Result<Response, HubError> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| HubError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HubError::Status {
                status,
                url: url.to_string(),
                body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl HubApi for HubClient {
    async fn list_models(&self, task: &str) -> Result<Vec<String>, HubError> {
        let mut next = Some(format!(
            "{}/api/models?pipeline_tag={}&limit={}",
            self.endpoint, task, self.page_size
        ));
        let mut ids = Vec::new();

        while let Some(url) = next.take() {
            tracing::debug!(url = %url, "Fetching model listing page");
            let response = self.get(&url).await?;

            next = response
                .headers()
                .get_all(LINK)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .find_map(next_page_link);

            let page: Vec<ModelSummary> =
                response.json().await.map_err(|e| HubError::Parse {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;

            ids.extend(page.into_iter().map(|m| m.id));
        }

        Ok(ids)
    }

    async fn model_info(&self, model_id: &str) -> Result<ModelDetails, HubError> {
        let url = format!("{}/api/models/{}", self.endpoint, model_id);
        let response = self.get(&url).await?;

        response.json().await.map_err(|e| HubError::Parse {
            url,
            reason: e.to_string(),
        })
    }
}

/// Extract the `rel="next"` target from an RFC 8288 `Link` header value
fn next_page_link(header: &str) -> Option<String> {
    header.split(',').find_map(|link| {
        let mut parts = link.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| {
            let param = param.trim();
            param == "rel=\"next\"" || param == "rel=next"
        });

        if is_next {
            target
                .strip_prefix('<')
                .and_then(|t| t.strip_suffix('>'))
                .map(ToString::to_string)
        } else {
            None
        }
    })
}

/// Hub token from the configured env var, else the one saved by the HF CLI
fn resolve_token(token_env: &str) -> Option<String> {
    std::env::var(token_env)
        .ok()
        .filter(|t| !t.trim().is_empty())
        .or_else(|| hf_hub::Cache::from_env().token())
}
