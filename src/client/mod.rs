//! Client side of the todo API: a typed transport and an optimistic cache.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{FieldError, NewTodo, OrdinalBatch, Todo, TodoId, TodoPatch};

pub mod cache;
pub mod http;
pub mod ordering;

pub use cache::{Mutation, MutationId, MutationKind, MutationPhase, Notice, TodoCache};
pub use http::HttpTodoApi;
pub use ordering::ReorderStrategy;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0:?}")]
    Validation(Vec<FieldError>),

    #[error("request could not be completed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("server responded with {status}: {message}")]
    Server { status: u16, message: String },

    #[error("todo {0} is not in the cache")]
    NotCached(TodoId),

    #[error("todo {0} has not been saved yet")]
    Provisional(TodoId),

    #[error("cannot move from {from} to {to} in a view of {len} todos")]
    InvalidMove { from: usize, to: usize, len: usize },
}

impl ClientError {
    /// Transport or server failures. Validation errors are excluded since the
    /// cache raises them locally before sending anything.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            ClientError::NotFound(_) | ClientError::Network(_) | ClientError::Server { .. }
        )
    }
}

/// The todo HTTP surface as seen by the client.
#[async_trait]
pub trait TodoApi: Send + Sync {
    async fn list(&self) -> Result<Vec<Todo>, ClientError>;

    async fn get(&self, id: TodoId) -> Result<Todo, ClientError>;

    async fn create(&self, new_todo: &NewTodo) -> Result<Todo, ClientError>;

    async fn update(&self, id: TodoId, patch: &TodoPatch) -> Result<Todo, ClientError>;

    async fn delete(&self, id: TodoId) -> Result<TodoId, ClientError>;

    async fn update_ordinals(&self, batch: &OrdinalBatch) -> Result<Vec<Todo>, ClientError>;
}
