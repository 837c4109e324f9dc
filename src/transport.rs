use std::future::Future;

use anyhow::Result;
use serde_json::Value;

use crate::request::GraphRequest;

/// Host-provided HTTP transport that injects OAuth2 bearer credentials for a
/// named credential profile.
///
/// [`GraphClient`] is generic over this seam so the pagination loops run
/// unchanged against the embedding platform's transport, the bundled
/// [`HttpTransport`], or a mock in tests.
///
/// Errors are `anyhow::Error`: hosts raise arbitrary failures, and the client
/// folds whatever comes back into its uniform API error.
///
/// [`GraphClient`]: crate::client::GraphClient
/// [`HttpTransport`]: crate::http::HttpTransport
pub trait OAuth2Transport: Send + Sync {
    /// Execute `request` authenticated under the given credential profile.
    fn request_oauth2(
        &self,
        credential_id: &str,
        request: GraphRequest,
    ) -> impl Future<Output = Result<Value>> + Send;
}
