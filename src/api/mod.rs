pub mod error;
pub mod todos;

pub use error::ApiError;
pub use todos::config;
