pub mod dto;
pub mod todo;
pub mod validation;

pub use dto::{Deleted, ErrorBody, NewTodo, OrdinalBatch, OrdinalUpdate, TodoPatch};
pub use todo::{Todo, TodoId, TodoStatus};
pub use validation::FieldError;
