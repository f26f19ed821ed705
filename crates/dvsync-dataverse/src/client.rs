//! Authenticated Dataverse Web API client

use std::time::{Duration, Instant};

use dvsync_core::SyncError;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::settings::ConnectionSettings;

pub const API_VERSION: &str = "v9.2";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
/// Tokens are refreshed this long before they actually expire
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Errors raised while talking to the Web API
#[derive(Debug, Error)]
pub enum DataverseError {
    #[error("Dataverse connection is not configured. Set {0}.")]
    NotConfigured(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Dataverse returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl From<DataverseError> for SyncError {
    fn from(error: DataverseError) -> Self {
        match error {
            DataverseError::NotConfigured(_) => SyncError::Unavailable(error.to_string()),
            DataverseError::Api { status: 404, .. } => SyncError::NotFound(error.to_string()),
            other => SyncError::Transport(other.to_string()),
        }
    }
}

pub type DataverseResult<T> = Result<T, DataverseError>;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Thin wrapper over `reqwest` that adds the bearer token and OData headers
pub struct DataverseClient {
    settings: ConnectionSettings,
    base_url: String,
    http: Client,
    token: Mutex<Option<CachedToken>>,
}

impl DataverseClient {
    pub fn new(settings: ConnectionSettings) -> DataverseResult<Self> {
        let missing = settings.missing_variables();
        if !missing.is_empty() {
            return Err(DataverseError::NotConfigured(missing.join(", ")));
        }
        let base_url = settings
            .base_url()
            .ok_or_else(|| DataverseError::NotConfigured(crate::settings::ORG_URL_ENV.into()))?;

        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            settings,
            base_url,
            http,
            token: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute Web API URL for a path relative to the service root
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/api/data/{}/{}", self.base_url, API_VERSION, path)
    }

    #[tracing::instrument(skip(self))]
    async fn access_token(&self) -> DataverseResult<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() < token.refresh_at
        {
            return Ok(token.value.clone());
        }

        let tenant = self.settings.tenant_id.as_deref().unwrap_or_default();
        let url = format!("https://login.microsoftonline.com/{}/oauth2/v2.0/token", tenant);
        let scope = format!("{}/.default", self.base_url);
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.settings.client_id.as_deref().unwrap_or_default()),
            (
                "client_secret",
                self.settings.client_secret.as_deref().unwrap_or_default(),
            ),
            ("scope", scope.as_str()),
        ];

        let response = self.http.post(&url).form(&form).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DataverseError::Authentication(format!("{}: {}", status, body)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| DataverseError::Authentication(e.to_string()))?;
        tracing::debug!(expires_in = token.expires_in, "acquired access token");

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    async fn request(&self, method: Method, path: &str) -> DataverseResult<RequestBuilder> {
        let token = self.access_token().await?;
        Ok(self
            .http
            .request(method, self.api_url(path))
            .bearer_auth(token)
            .header("Accept", "application/json")
            .header("OData-MaxVersion", "4.0")
            .header("OData-Version", "4.0"))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> DataverseResult<T> {
        let response = check(self.request(Method::GET, path).await?.send().await?).await?;
        response
            .json()
            .await
            .map_err(|e| DataverseError::Decode(e.to_string()))
    }

    /// POST a JSON body; returns the response body, `Null` when empty
    pub async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> DataverseResult<serde_json::Value> {
        let response = check(
            self.request(Method::POST, path)
                .await?
                .header("Content-Type", "application/json; charset=utf-8")
                .json(body)
                .send()
                .await?,
        )
        .await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(serde_json::Value::Null);
        }
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| DataverseError::Decode(e.to_string()))
    }

    pub async fn delete(&self, path: &str) -> DataverseResult<()> {
        check(self.request(Method::DELETE, path).await?.send().await?).await?;
        Ok(())
    }
}

/// Turn a non-success response into an `Api` error carrying the service message
async fn check(response: Response) -> DataverseResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(DataverseError::Api {
        status: status.as_u16(),
        message: api_error_message(&body),
    })
}

pub(crate) fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| {
            if body.trim().is_empty() {
                "(empty response)".to_string()
            } else {
                body.trim().to_string()
            }
        })
}

/// Quote a value for use inside an OData key segment
pub(crate) fn odata_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
