//! HTTP inbound adapter exposing the progression engine as REST endpoints.

pub mod certificates;
pub mod engagement;
pub mod enrollments;
pub mod error;
pub mod health;
pub mod lessons;
pub mod quizzes;
pub mod session;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub(crate) mod validation;

pub use error::ApiResult;
