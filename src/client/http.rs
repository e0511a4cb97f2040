use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::client::{ClientError, TodoApi};
use crate::config::ClientConfig;
use crate::models::{Deleted, ErrorBody, NewTodo, OrdinalBatch, Todo, TodoId, TodoPatch};

/// `TodoApi` over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpTodoApi {
    client: Client,
    base_url: String,
}

impl HttpTodoApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.api_url.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.json::<ErrorBody>().await.ok();
    debug!(%status, ?body, "todo api request failed");
    let message = body
        .as_ref()
        .map(|body| body.message.clone())
        .unwrap_or_else(|| status.to_string());
    Err(match status {
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        StatusCode::BAD_REQUEST => {
            ClientError::Validation(body.and_then(|body| body.details).unwrap_or_default())
        }
        _ => ClientError::Server {
            status: status.as_u16(),
            message,
        },
    })
}

#[async_trait]
impl TodoApi for HttpTodoApi {
    async fn list(&self) -> Result<Vec<Todo>, ClientError> {
        decode(self.client.get(self.url("/todos")).send().await?).await
    }

    async fn get(&self, id: TodoId) -> Result<Todo, ClientError> {
        decode(self.client.get(self.url(&format!("/todos/{id}"))).send().await?).await
    }

    async fn create(&self, new_todo: &NewTodo) -> Result<Todo, ClientError> {
        let response = self.client.post(self.url("/todos")).json(new_todo).send().await?;
        decode(response).await
    }

    async fn update(&self, id: TodoId, patch: &TodoPatch) -> Result<Todo, ClientError> {
        let response = self
            .client
            .put(self.url(&format!("/todos/{id}")))
            .json(patch)
            .send()
            .await?;
        decode(response).await
    }

    async fn delete(&self, id: TodoId) -> Result<TodoId, ClientError> {
        let response = self.client.delete(self.url(&format!("/todos/{id}"))).send().await?;
        let deleted: Deleted = decode(response).await?;
        Ok(deleted.id)
    }

    async fn update_ordinals(&self, batch: &OrdinalBatch) -> Result<Vec<Todo>, ClientError> {
        let response = self.client.put(self.url("/todos/ordinal")).json(batch).send().await?;
        decode(response).await
    }
}
