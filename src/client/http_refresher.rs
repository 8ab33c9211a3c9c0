use super::*;
use reqwest::StatusCode;
use serde_json::json;

/// Calls `POST {base_url}/api/auth/refresh` with `{"refreshToken": ...}`.
pub struct HttpTokenRefresher {
    http: reqwest::Client,
    refresh_url: String,
}

impl HttpTokenRefresher {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            refresh_url: format!("{}/api/auth/refresh", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait::async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedAccess, ClientError> {
        let response = self
            .http
            .post(&self.refresh_url)
            .json(&json!({ "refreshToken": refresh_token }))
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::OK => response
                .json::<RefreshedAccess>()
                .await
                .map_err(|e| ClientError::Transport(e.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => {
                Err(ClientError::Unauthorized)
            }
            other => Err(ClientError::Status(other.as_u16())),
        }
    }
}
