use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::GraphError;
use crate::request::{GraphRequest, Query};
use crate::transport::OAuth2Transport;

/// Credential profile the host transport resolves to a stored OAuth2 token.
const CREDENTIAL_ID: &str = "microsoftToDoOAuth2Api";

/// Page-size hint sent as `$top` on the first paginated request.
const PAGE_SIZE: u64 = 100;

/// Forwards authenticated Graph requests and drains paged collections.
///
/// `node` is the name of the workflow node issuing the requests; it tags
/// every [`GraphError::Api`] so failures point back at the right node.
pub struct GraphClient<T> {
    node: String,
    transport: T,
}

impl<T: OAuth2Transport> GraphClient<T> {
    pub fn new(node: impl Into<String>, transport: T) -> Self {
        Self {
            node: node.into(),
            transport,
        }
    }

    /// Forward a single request through the transport.
    ///
    /// The transport call is awaited here so any failure it raises, rejection
    /// or otherwise, is wrapped into the uniform [`GraphError::Api`] before
    /// the caller sees it.
    pub async fn send_request(&self, request: GraphRequest) -> Result<Value, GraphError> {
        debug!(method = %request.method, uri = %request.uri, "dispatching Graph request");
        self.transport
            .request_oauth2(CREDENTIAL_ID, request)
            .await
            .map_err(|cause| GraphError::Api {
                node: self.node.clone(),
                cause,
            })
    }

    /// Fetch every page of a collection by following `@odata.nextLink`.
    ///
    /// Each page's list under `property_name` is appended in arrival order.
    /// Once a returned link carries its own `$top`, the local page-size hint
    /// is dropped so the cursor's parameter is not duplicated.
    pub async fn fetch_all_by_next_link(
        &self,
        property_name: &str,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
        query: Option<Query>,
    ) -> Result<Vec<Value>, GraphError> {
        let mut query = query.unwrap_or_default();
        query.insert("$top".to_string(), PAGE_SIZE.into());

        let mut items = Vec::new();
        let mut next_uri: Option<String> = None;

        loop {
            let mut request =
                GraphRequest::new(method.clone(), endpoint).with_query(query.clone());
            if let Some(body) = body.clone() {
                request = request.with_body(body);
            }
            if let Some(uri) = &next_uri {
                request = request.with_uri(uri.clone());
            }

            let page = self.send_request(request).await?;
            next_uri = page
                .get("@odata.nextLink")
                .and_then(Value::as_str)
                .map(str::to_string);
            if next_uri.as_deref().is_some_and(|uri| uri.contains("$top")) {
                query.remove("$top");
            }

            let page_items = page
                .get(property_name)
                .and_then(Value::as_array)
                .ok_or_else(|| GraphError::MalformedPage {
                    property: property_name.to_string(),
                })?;
            debug!(items = page_items.len(), "fetched page");
            items.extend(page_items.iter().cloned());

            if next_uri.is_none() {
                break;
            }
        }

        info!(total = items.len(), endpoint, "pagination complete");
        Ok(items)
    }

    /// Fetch every page of a collection by advancing a `$skip` offset.
    ///
    /// The loop stops when a page's `value` list is empty. Termination is
    /// decided on `value` even when items are collected under a different
    /// `property_name`; the asymmetry with [`fetch_all_by_next_link`] is part
    /// of the contract.
    ///
    /// [`fetch_all_by_next_link`]: GraphClient::fetch_all_by_next_link
    pub async fn fetch_all_by_skip(
        &self,
        property_name: &str,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
        query: Option<Query>,
    ) -> Result<Vec<Value>, GraphError> {
        let mut query = query.unwrap_or_default();
        query.insert("$top".to_string(), PAGE_SIZE.into());
        let mut skip = 0u64;

        let mut items = Vec::new();

        loop {
            query.insert("$skip".to_string(), skip.into());
            let mut request =
                GraphRequest::new(method.clone(), endpoint).with_query(query.clone());
            if let Some(body) = body.clone() {
                request = request.with_body(body);
            }

            let page = self.send_request(request).await?;
            skip += PAGE_SIZE;

            let page_items = page
                .get(property_name)
                .and_then(Value::as_array)
                .ok_or_else(|| GraphError::MalformedPage {
                    property: property_name.to_string(),
                })?;
            debug!(items = page_items.len(), skip, "fetched page");
            items.extend(page_items.iter().cloned());

            let value = page
                .get("value")
                .and_then(Value::as_array)
                .ok_or_else(|| GraphError::MalformedPage {
                    property: "value".to_string(),
                })?;
            if value.is_empty() {
                break;
            }
        }

        info!(total = items.len(), endpoint, "pagination complete");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use anyhow::anyhow;
    use serde_json::json;

    use super::*;

    /// Replays a scripted sequence of responses and records every call.
    struct MockTransport {
        responses: Mutex<VecDeque<anyhow::Result<Value>>>,
        calls: Mutex<Vec<(String, GraphRequest)>>,
    }

    impl MockTransport {
        fn new(responses: Vec<anyhow::Result<Value>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(String, GraphRequest)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl OAuth2Transport for MockTransport {
        async fn request_oauth2(
            &self,
            credential_id: &str,
            request: GraphRequest,
        ) -> anyhow::Result<Value> {
            self.calls
                .lock()
                .unwrap()
                .push((credential_id.to_string(), request));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("mock transport exhausted")))
        }
    }

    fn client(responses: Vec<anyhow::Result<Value>>) -> GraphClient<MockTransport> {
        GraphClient::new("Microsoft To Do", MockTransport::new(responses))
    }

    #[tokio::test]
    async fn send_request_uses_fixed_credential_profile() {
        let client = client(vec![Ok(json!({ "id": "1" }))]);
        let resp = client
            .send_request(GraphRequest::new(Method::GET, "/todo/lists/1"))
            .await
            .unwrap();
        assert_eq!(resp, json!({ "id": "1" }));

        let calls = client.transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "microsoftToDoOAuth2Api");
    }

    #[tokio::test]
    async fn transport_failure_surfaces_as_wrapped_api_error() {
        let client = client(vec![Err(anyhow!("socket closed"))]);
        let err = client
            .send_request(GraphRequest::new(Method::GET, "/todo/lists"))
            .await
            .unwrap_err();
        match err {
            GraphError::Api { node, cause } => {
                assert_eq!(node, "Microsoft To Do");
                assert_eq!(cause.to_string(), "socket closed");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn next_link_loop_follows_cursor_and_drops_local_top() {
        let next = "https://graph.microsoft.com/v1.0/me/todo/lists?$skiptoken=abc&$top=100";
        let client = client(vec![
            Ok(json!({ "value": [{ "id": "a" }, { "id": "b" }], "@odata.nextLink": next })),
            Ok(json!({ "value": [{ "id": "c" }] })),
        ]);

        let items = client
            .fetch_all_by_next_link("value", Method::GET, "/todo/lists", None, None)
            .await
            .unwrap();
        assert_eq!(
            items,
            vec![json!({ "id": "a" }), json!({ "id": "b" }), json!({ "id": "c" })]
        );

        let calls = client.transport.calls();
        assert_eq!(calls.len(), 2);

        // first call: default URI with the local page-size hint
        let first = &calls[0].1;
        assert_eq!(first.uri, "https://graph.microsoft.com/v1.0/me/todo/lists");
        assert_eq!(first.qs.as_ref().unwrap()["$top"], json!(100));

        // second call: cursor URI, and the local $top is gone
        let second = &calls[1].1;
        assert_eq!(second.uri, next);
        assert!(second.qs.is_none());
    }

    #[tokio::test]
    async fn next_link_loop_keeps_top_when_cursor_lacks_it() {
        let next = "https://graph.microsoft.com/v1.0/me/todo/lists?$skiptoken=abc";
        let client = client(vec![
            Ok(json!({ "value": [{ "id": "a" }], "@odata.nextLink": next })),
            Ok(json!({ "value": [] })),
        ]);

        client
            .fetch_all_by_next_link("value", Method::GET, "/todo/lists", None, None)
            .await
            .unwrap();

        let calls = client.transport.calls();
        assert_eq!(calls[1].1.qs.as_ref().unwrap()["$top"], json!(100));
    }

    #[tokio::test]
    async fn next_link_loop_rejects_page_without_property() {
        let client = client(vec![Ok(json!({ "items": [] }))]);
        let err = client
            .fetch_all_by_next_link("value", Method::GET, "/todo/lists", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::MalformedPage { property } if property == "value"));
    }

    #[tokio::test]
    async fn skip_loop_advances_offset_and_stops_on_empty_value() {
        let client = client(vec![
            Ok(json!({ "value": [{ "id": "a" }, { "id": "b" }] })),
            Ok(json!({ "value": [] })),
        ]);

        let items = client
            .fetch_all_by_skip("value", Method::GET, "/todo/lists/1/tasks", None, None)
            .await
            .unwrap();
        assert_eq!(items, vec![json!({ "id": "a" }), json!({ "id": "b" })]);

        let calls = client.transport.calls();
        assert_eq!(calls.len(), 2);

        let first = calls[0].1.qs.as_ref().unwrap();
        assert_eq!(first["$top"], json!(100));
        assert_eq!(first["$skip"], json!(0));

        let second = calls[1].1.qs.as_ref().unwrap();
        assert_eq!(second["$skip"], json!(100));
    }

    #[tokio::test]
    async fn skip_loop_terminates_on_value_even_for_other_properties() {
        // items are collected under "linked", but the exit check reads "value"
        let client = client(vec![
            Ok(json!({ "linked": [{ "id": "a" }], "value": [{ "id": "x" }] })),
            Ok(json!({ "linked": [{ "id": "b" }], "value": [] })),
        ]);

        let items = client
            .fetch_all_by_skip("linked", Method::GET, "/todo/lists/1/tasks", None, None)
            .await
            .unwrap();
        assert_eq!(items, vec![json!({ "id": "a" }), json!({ "id": "b" })]);
    }

    #[tokio::test]
    async fn skip_loop_rejects_page_without_value_list() {
        let client = client(vec![Ok(json!({ "linked": [{ "id": "a" }] }))]);
        let err = client
            .fetch_all_by_skip("linked", Method::GET, "/todo/lists/1/tasks", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::MalformedPage { property } if property == "value"));
    }

    #[tokio::test]
    async fn pagination_forwards_body_and_caller_query() {
        let client = client(vec![Ok(json!({ "value": [] }))]);
        let mut query = Query::new();
        query.insert("$filter".to_string(), json!("status eq 'completed'"));

        client
            .fetch_all_by_next_link(
                "value",
                Method::GET,
                "/todo/lists/1/tasks",
                Some(json!({ "hint": true })),
                Some(query),
            )
            .await
            .unwrap();

        let calls = client.transport.calls();
        let request = &calls[0].1;
        assert_eq!(request.body, Some(json!({ "hint": true })));
        let qs = request.qs.as_ref().unwrap();
        assert_eq!(qs["$filter"], json!("status eq 'completed'"));
        assert_eq!(qs["$top"], json!(100));
    }
}
