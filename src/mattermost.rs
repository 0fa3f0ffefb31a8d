//! Mattermost transport: file downloads and webhook message posting.

use reqwest::Client;
use serde_json::json;

use crate::core::config::AppConfig;
use crate::core::errors::ApiError;

#[derive(Clone)]
pub struct MattermostClient {
    client: Client,
    api_url: String,
    bot_token: String,
    webhook_url: String,
}

impl MattermostClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: config.mattermost_api_url.trim_end_matches('/').to_string(),
            bot_token: config.mattermost_bot_token.clone(),
            webhook_url: config.mattermost_webhook_url.clone(),
        }
    }

    /// Downloads an attached file, returning its content and name.
    pub async fn download_file(&self, file_id: &str) -> Result<(Vec<u8>, String), ApiError> {
        let info_url = format!("{}/files/{}/info", self.api_url, file_id);
        let info: serde_json::Value = self
            .client
            .get(&info_url)
            .bearer_auth(&self.bot_token)
            .send()
            .await
            .map_err(ApiError::internal)?
            .error_for_status()
            .map_err(ApiError::internal)?
            .json()
            .await
            .map_err(ApiError::internal)?;
        let filename = info["name"].as_str().unwrap_or("upload.csv").to_string();

        let file_url = format!("{}/files/{}", self.api_url, file_id);
        let content = self
            .client
            .get(&file_url)
            .bearer_auth(&self.bot_token)
            .send()
            .await
            .map_err(ApiError::internal)?
            .error_for_status()
            .map_err(ApiError::internal)?
            .bytes()
            .await
            .map_err(ApiError::internal)?;

        Ok((content.to_vec(), filename))
    }

    /// Posts a message through the incoming webhook.
    pub async fn post_message(&self, channel_id: &str, text: &str) -> Result<(), ApiError> {
        self.client
            .post(&self.webhook_url)
            .json(&json!({ "channel_id": channel_id, "text": text }))
            .send()
            .await
            .map_err(ApiError::internal)?;
        Ok(())
    }
}
