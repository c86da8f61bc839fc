mod error;
pub mod health;
pub mod report;

pub use error::{ApiError, ErrorBody};
