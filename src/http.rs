use std::time::Duration;

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::TokenProvider;
use crate::request::GraphRequest;
use crate::transport::OAuth2Transport;

const MAX_RETRIES: u32 = 5;

/// Standalone [`OAuth2Transport`] over `reqwest`, for running the client
/// outside a host platform.
///
/// Serves exactly one credential profile; a request naming any other profile
/// is rejected. Throttling responses (429/503) are retried with the server's
/// `Retry-After` delay, which keeps the pagination helpers themselves free of
/// retry logic.
#[derive(Clone)]
pub struct HttpTransport {
    credential_id: String,
    tokens: TokenProvider,
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(credential_id: impl Into<String>, tokens: TokenProvider) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to build HTTP client");
        Self {
            credential_id: credential_id.into(),
            tokens,
            http,
        }
    }
}

impl OAuth2Transport for HttpTransport {
    async fn request_oauth2(&self, credential_id: &str, request: GraphRequest) -> Result<Value> {
        if credential_id != self.credential_id {
            anyhow::bail!("unknown credential profile \"{credential_id}\"");
        }

        let mut retries = 0;
        loop {
            let token = self.tokens.access_token().await?;
            let mut builder = self
                .http
                .request(request.method.clone(), &request.uri)
                .bearer_auth(&token);
            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }
            if let Some(qs) = &request.qs {
                builder = builder.query(qs);
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let resp = builder.send().await?;
            let status = resp.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS
                || status == reqwest::StatusCode::SERVICE_UNAVAILABLE
            {
                retries += 1;
                if retries > MAX_RETRIES {
                    anyhow::bail!("max retries exceeded for {}", request.uri);
                }
                let retry_after = resp
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(2u64.pow(retries));
                warn!(uri = %request.uri, retry_after, retries, "throttled, backing off");
                tokio::time::sleep(Duration::from_secs(retry_after)).await;
                continue;
            }

            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                anyhow::bail!("{} {} returned {status}: {body}", request.method, request.uri);
            }

            debug!(uri = %request.uri, %status, "OK");
            let text = resp.text().await?;
            return if text.is_empty() {
                // 204 No Content on deletes
                Ok(Value::Null)
            } else if request.parse_json {
                Ok(serde_json::from_str(&text)?)
            } else {
                Ok(Value::String(text))
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;

    use super::*;
    use crate::auth::OAuth2Credential;

    fn transport() -> HttpTransport {
        let tokens = TokenProvider::new(OAuth2Credential {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: "refresh".to_string(),
            scope: None,
        });
        HttpTransport::new("microsoftToDoOAuth2Api", tokens)
    }

    #[tokio::test]
    async fn rejects_unknown_credential_profile() {
        let err = transport()
            .request_oauth2("someOtherApi", GraphRequest::new(Method::GET, "/todo/lists"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("someOtherApi"));
    }
}
