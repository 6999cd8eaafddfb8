//! HTTP backend client
//!
//! `reqwest` implementation of [`NutritionBackend`] and the error taxonomy
//! the session controller classifies failures with.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::backend::NutritionBackend;
use crate::build_info::BuildInfo;
use crate::config::ClientConfig;
use crate::models::{
    AnalyzeResponse, MealImage, MealRecord, NutrientReport, Patient, Recommendation,
};

/// Backend call error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request timed out")]
    Timeout,

    #[error("Request failed with status code {status}")]
    Status {
        status: u16,
        detail: Option<String>,
        body: String,
    },

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    Decode(String),
}

/// Result type for backend calls
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Failures after which the backend may still finish the work
    pub fn is_timeout_class(&self) -> bool {
        match self {
            ApiError::Timeout => true,
            ApiError::Status { status, .. } => *status == StatusCode::GATEWAY_TIMEOUT.as_u16(),
            _ => false,
        }
    }

    /// Most specific message available: backend detail, else the error text
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status {
                detail: Some(detail),
                ..
            } => detail.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

/// Pull `detail` out of a FastAPI-style error body
pub fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Analysis backend reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    client: Client,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(BuildInfo::current().user_agent())
            .build()?;

        Ok(Self {
            base_url: config.api_url.clone(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = self.url(path);
        tracing::debug!("GET {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            tracing::warn!("GET {} failed: {}", url, e);
            ApiError::from(e)
        })?;

        read_json(response).await
    }
}

/// Check the status, then decode the body
async fn read_json<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!("Backend returned {}: {}", status, body);
        return Err(ApiError::Status {
            status: status.as_u16(),
            detail: extract_detail(&body),
            body,
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        tracing::error!("Failed to parse backend response: {}", e);
        ApiError::Decode(e.to_string())
    })
}

#[async_trait]
impl NutritionBackend for HttpBackend {
    async fn list_patients(&self) -> ApiResult<Vec<Patient>> {
        self.get_json("users").await
    }

    async fn get_report(&self, user_id: i64, meal_id: Option<i64>) -> ApiResult<NutrientReport> {
        let path = match meal_id {
            Some(meal_id) => format!("report/{}?meal_id={}", user_id, meal_id),
            None => format!("report/{}", user_id),
        };
        self.get_json(&path).await
    }

    async fn get_recommendations(&self, user_id: i64) -> ApiResult<Vec<Recommendation>> {
        self.get_json(&format!("recommendations/{}", user_id)).await
    }

    async fn get_history(&self, user_id: i64) -> ApiResult<Vec<MealRecord>> {
        self.get_json(&format!("history/{}", user_id)).await
    }

    async fn analyze_meal(
        &self,
        user_id: i64,
        image: &MealImage,
        bytes: Vec<u8>,
    ) -> ApiResult<AnalyzeResponse> {
        let url = self.url("analyze");
        tracing::info!(
            "POST {} ({} bytes, file `{}`, user {})",
            url,
            bytes.len(),
            image.file_name,
            user_id
        );

        let part = Part::bytes(bytes)
            .file_name(image.file_name.clone())
            .mime_str(image.mime_type())?;
        let form = Form::new()
            .text("user_id", user_id.to_string())
            .part("file", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Meal submission failed: {}", e);
                ApiError::from(e)
            })?;

        read_json(response).await
    }
}
