use thiserror::Error;

use crate::models::{NewTodo, OrdinalUpdate, Todo, TodoId, TodoPatch};

pub mod database;
pub mod schema;

pub use database::Database;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("todo {0} not found")]
    NotFound(TodoId),

    /// A batch reorder referenced unknown todos; nothing was written.
    #[error("batch reorder failed for todos {missing:?}")]
    BatchFailed { missing: Vec<TodoId> },

    #[error("database pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("database error: {0}")]
    Query(#[from] diesel::result::Error),
}

/// Storage seam for the todo store. Handlers depend on this trait only.
///
/// Calls are blocking; async callers are expected to hop onto a blocking
/// thread pool.
pub trait TodoRepository: Send + Sync {
    /// All todos in primary-key order. Display order is the caller's concern.
    fn list(&self) -> Result<Vec<Todo>, StoreError>;

    fn get_by_id(&self, id: TodoId) -> Result<Todo, StoreError>;

    fn create(&self, new_todo: NewTodo) -> Result<Todo, StoreError>;

    /// Applies `patch` and returns the record as stored afterwards.
    fn update(&self, id: TodoId, patch: TodoPatch) -> Result<Todo, StoreError>;

    fn delete(&self, id: TodoId) -> Result<TodoId, StoreError>;

    /// Writes every ordinal or none of them, then returns the full list.
    fn batch_update_ordinals(&self, updates: &[OrdinalUpdate]) -> Result<Vec<Todo>, StoreError>;
}
