use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::client::GraphClient;
use crate::error::GraphError;
use crate::request::GraphRequest;
use crate::transport::OAuth2Transport;

// ---------------------------------------------------------------------------
// Data structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct TaskList {
    pub id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "isOwner")]
    pub is_owner: Option<bool>,
    #[serde(rename = "isShared")]
    pub is_shared: Option<bool>,
    #[serde(rename = "wellknownListName")]
    pub wellknown_list_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TodoTask {
    pub id: String,
    pub title: Option<String>,
    pub status: Option<String>,
    pub importance: Option<String>,
    pub body: Option<ItemBody>,
    #[serde(rename = "createdDateTime")]
    pub created_date_time: Option<String>,
    #[serde(rename = "lastModifiedDateTime")]
    pub last_modified_date_time: Option<String>,
    #[serde(rename = "dueDateTime")]
    pub due_date_time: Option<DateTimeTimeZone>,
    #[serde(rename = "completedDateTime")]
    pub completed_date_time: Option<DateTimeTimeZone>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemBody {
    pub content: Option<String>,
    #[serde(rename = "contentType")]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateTimeTimeZone {
    #[serde(rename = "dateTime")]
    pub date_time: Option<String>,
    #[serde(rename = "timeZone")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkedResource {
    pub id: String,
    #[serde(rename = "webUrl")]
    pub web_url: Option<String>,
    #[serde(rename = "applicationName")]
    pub application_name: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(rename = "externalId")]
    pub external_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Typed wrappers over the To Do endpoints.
pub struct TodoApi<'a, T> {
    graph: &'a GraphClient<T>,
}

impl<'a, T: OAuth2Transport> TodoApi<'a, T> {
    pub fn new(graph: &'a GraphClient<T>) -> Self {
        Self { graph }
    }

    // -- Task lists ---------------------------------------------------------

    pub async fn list_task_lists(&self) -> Result<Vec<TaskList>, GraphError> {
        info!("listing task lists");
        let items = self
            .graph
            .fetch_all_by_next_link("value", Method::GET, "/todo/lists", None, None)
            .await?;
        decode_items(items)
    }

    pub async fn get_task_list(&self, list_id: &str) -> Result<TaskList, GraphError> {
        let value = self
            .graph
            .send_request(GraphRequest::new(
                Method::GET,
                &format!("/todo/lists/{list_id}"),
            ))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn create_task_list(&self, display_name: &str) -> Result<TaskList, GraphError> {
        let value = self
            .graph
            .send_request(
                GraphRequest::new(Method::POST, "/todo/lists")
                    .with_body(json!({ "displayName": display_name })),
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn delete_task_list(&self, list_id: &str) -> Result<(), GraphError> {
        self.graph
            .send_request(GraphRequest::new(
                Method::DELETE,
                &format!("/todo/lists/{list_id}"),
            ))
            .await?;
        Ok(())
    }

    // -- Tasks --------------------------------------------------------------

    pub async fn list_tasks(&self, list_id: &str) -> Result<Vec<TodoTask>, GraphError> {
        info!(list = %list_id, "listing tasks");
        let items = self
            .graph
            .fetch_all_by_next_link(
                "value",
                Method::GET,
                &format!("/todo/lists/{list_id}/tasks"),
                None,
                None,
            )
            .await?;
        decode_items(items)
    }

    pub async fn get_task(&self, list_id: &str, task_id: &str) -> Result<TodoTask, GraphError> {
        let value = self
            .graph
            .send_request(GraphRequest::new(
                Method::GET,
                &format!("/todo/lists/{list_id}/tasks/{task_id}"),
            ))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Create a task from Graph-shaped fields (`title`, `importance`,
    /// `dueDateTime`, …).
    pub async fn create_task(&self, list_id: &str, task: Value) -> Result<TodoTask, GraphError> {
        let value = self
            .graph
            .send_request(
                GraphRequest::new(Method::POST, &format!("/todo/lists/{list_id}/tasks"))
                    .with_body(task),
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn update_task(
        &self,
        list_id: &str,
        task_id: &str,
        patch: Value,
    ) -> Result<TodoTask, GraphError> {
        let value = self
            .graph
            .send_request(
                GraphRequest::new(
                    Method::PATCH,
                    &format!("/todo/lists/{list_id}/tasks/{task_id}"),
                )
                .with_body(patch),
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn delete_task(&self, list_id: &str, task_id: &str) -> Result<(), GraphError> {
        self.graph
            .send_request(GraphRequest::new(
                Method::DELETE,
                &format!("/todo/lists/{list_id}/tasks/{task_id}"),
            ))
            .await?;
        Ok(())
    }

    // -- Linked resources ---------------------------------------------------

    /// The linkedResources endpoint pages by offset rather than by cursor.
    pub async fn list_linked_resources(
        &self,
        list_id: &str,
        task_id: &str,
    ) -> Result<Vec<LinkedResource>, GraphError> {
        let items = self
            .graph
            .fetch_all_by_skip(
                "value",
                Method::GET,
                &format!("/todo/lists/{list_id}/tasks/{task_id}/linkedResources"),
                None,
                None,
            )
            .await?;
        decode_items(items)
    }
}

fn decode_items<D: serde::de::DeserializeOwned>(items: Vec<Value>) -> Result<Vec<D>, GraphError> {
    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(GraphError::from))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
