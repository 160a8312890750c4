pub mod client;

use crate::error::HubError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;

pub use client::HubClient;

/// Entry returned by the model listing endpoint
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ModelSummary {
    pub id: String,
}

/// Subset of a model's hub metadata
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ModelDetails {
    pub downloads: Option<u64>,
}

/// Read access to the model hub
#[async_trait]
pub trait HubApi: Send + Sync {
    /// List every model id tagged with the given task
    async fn list_models(&self, task: &str) -> Result<Vec<String>, HubError>;

    /// Fetch metadata for one model
    async fn model_info(&self, model_id: &str) -> Result<ModelDetails, HubError>;
}

/// Download counter for a model; zero is a real value, a missing field is an error
pub async fn fetch_downloads<H: HubApi + ?Sized>(hub: &H, model_id: &str) -> Result<u64, HubError> {
    let details = hub.model_info(model_id).await?;
    details.downloads.ok_or_else(|| HubError::MissingField {
        model_id: model_id.to_string(),
        field: "downloads",
    })
}

/// Union of the model ids listed for each task, in listing order
///
/// Models tagged with more than one task appear once.
pub async fn list_model_ids<H: HubApi + ?Sized>(
    hub: &H,
    tasks: &[String],
) -> Result<Vec<String>, HubError> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    for task in tasks {
        let listed = hub.list_models(task).await?;
        tracing::info!(task = %task, count = listed.len(), "Listed models");

        for id in listed {
            if seen.insert(id.clone()) {
                ids.push(id);
            }
        }
    }

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct StaticHub {
        by_task: HashMap<&'static str, Vec<&'static str>>,
        downloads: Option<u64>,
    }

    #[async_trait]
    impl HubApi for StaticHub {
        async fn list_models(&self, task: &str) -> Result<Vec<String>, HubError> {
            Ok(self
                .by_task
                .get(task)
                .map(|ids| ids.iter().map(ToString::to_string).collect())
                .unwrap_or_default())
        }

        async fn model_info(&self, _model_id: &str) -> Result<ModelDetails, HubError> {
            Ok(ModelDetails {
                downloads: self.downloads,
            })
        }
    }

    fn hub(downloads: Option<u64>) -> StaticHub {
        let mut by_task = HashMap::new();
        by_task.insert("text-generation", vec!["gpt2", "org/llama", "shared/model"]);
        by_task.insert("text2text-generation", vec!["t5-small", "shared/model"]);
        StaticHub { by_task, downloads }
    }

    #[tokio::test]
    async fn test_list_model_ids_unions_tasks() {
        let tasks = vec![
            "text-generation".to_string(),
            "text2text-generation".to_string(),
        ];
        let ids = list_model_ids(&hub(None), &tasks).await.unwrap();
        assert_eq!(ids, vec!["gpt2", "org/llama", "shared/model", "t5-small"]);
    }

    #[tokio::test]
    async fn test_list_model_ids_unknown_task() {
        let ids = list_model_ids(&hub(None), &["fill-mask".to_string()])
            .await
            .unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_downloads_zero_is_present() {
        assert_eq!(fetch_downloads(&hub(Some(0)), "gpt2").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fetch_downloads_missing_field() {
        let err = fetch_downloads(&hub(None), "gpt2").await.unwrap_err();
        assert!(matches!(
            err,
            HubError::MissingField {
                field: "downloads",
                ..
            }
        ));
    }

    #[test]
    fn test_model_details_ignores_extra_fields() {
        let details: ModelDetails = serde_json::from_str(
            r#"{"id": "gpt2", "modelId": "gpt2", "downloads": 42, "likes": 7, "tags": ["pytorch"]}"#,
        )
        .unwrap();
        assert_eq!(details.downloads, Some(42));
    }
}
