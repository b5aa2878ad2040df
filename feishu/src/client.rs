use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::FeishuError;
use crate::messenger::Messenger;

pub const FEISHU_BASE_URL: &str = "https://open.feishu.cn/open-apis";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Deserialize)]
struct TokenResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    tenant_access_token: Option<String>,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Deserialize)]
struct UploadData {
    file_key: String,
}

/// Feishu Open API client for a self-built app.
///
/// A tenant access token is requested for each outbound operation.
pub struct FeishuClient {
    client: Client,
    app_id: String,
    app_secret: String,
    base_url: String,
}

impl FeishuClient {
    pub fn new(app_id: &str, app_secret: &str) -> Result<Self, FeishuError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            app_id: app_id.to_string(),
            app_secret: app_secret.to_string(),
            base_url: FEISHU_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Fetch a tenant access token for the app.
    pub async fn tenant_token(&self) -> Result<String, FeishuError> {
        let url = format!("{}/auth/v3/tenant_access_token/internal", self.base_url);
        let resp: TokenResponse = self
            .client
            .post(&url)
            .json(&json!({
                "app_id": self.app_id,
                "app_secret": self.app_secret,
            }))
            .send()
            .await?
            .json()
            .await?;

        if resp.code != 0 {
            return Err(FeishuError::Api {
                code: resp.code,
                msg: resp.msg,
            });
        }
        resp.tenant_access_token
            .filter(|t| !t.is_empty())
            .ok_or(FeishuError::MissingField("tenant_access_token"))
    }

    /// Upload an opus clip and return its `file_key`.
    pub async fn upload_opus(&self, token: &str, path: &Path) -> Result<String, FeishuError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("voice.opus")
            .to_string();

        let part = Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str("application/octet-stream")?;
        let form = Form::new()
            .text("file_type", "opus")
            .text("file_name", file_name.clone())
            .part("file", part);

        let url = format!("{}/im/v1/files", self.base_url);
        let resp: ApiResponse<UploadData> = self
            .client
            .post(&url)
            .bearer_auth(token)
            .timeout(UPLOAD_TIMEOUT)
            .multipart(form)
            .send()
            .await?
            .json()
            .await?;

        let data = check(resp)?.ok_or(FeishuError::MissingField("data.file_key"))?;
        info!(file = %file_name, file_key = %data.file_key, "feishu: audio uploaded");
        Ok(data.file_key)
    }

    /// Send a message of `msg_type` with JSON `content` to an open_id.
    pub async fn send_message(
        &self,
        token: &str,
        open_id: &str,
        msg_type: &str,
        content: &Value,
    ) -> Result<(), FeishuError> {
        let url = format!("{}/im/v1/messages", self.base_url);
        let resp: ApiResponse<Value> = self
            .client
            .post(&url)
            .query(&[("receive_id_type", "open_id")])
            .bearer_auth(token)
            .json(&json!({
                "receive_id": open_id,
                "msg_type": msg_type,
                "content": content.to_string(),
            }))
            .send()
            .await?
            .json()
            .await?;

        check(resp)?;
        debug!(open_id, msg_type, "feishu: message sent");
        Ok(())
    }
}

fn check<T>(resp: ApiResponse<T>) -> Result<Option<T>, FeishuError> {
    if resp.code != 0 {
        return Err(FeishuError::Api {
            code: resp.code,
            msg: resp.msg,
        });
    }
    Ok(resp.data)
}

#[async_trait::async_trait]
impl Messenger for FeishuClient {
    async fn send_text(&self, open_id: &str, text: &str) -> Result<(), FeishuError> {
        let token = self.tenant_token().await?;
        self.send_message(&token, open_id, "text", &json!({ "text": text }))
            .await
    }

    async fn send_audio(&self, open_id: &str, path: &Path) -> Result<(), FeishuError> {
        let token = self.tenant_token().await?;
        let file_key = self.upload_opus(&token, path).await?;
        self.send_message(&token, open_id, "audio", &json!({ "file_key": file_key }))
            .await
    }

    async fn ping(&self) -> Result<(), FeishuError> {
        self.tenant_token().await.map(|_| ())
    }
}
