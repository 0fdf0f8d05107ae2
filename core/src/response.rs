//! JSON envelope shared by every API answer: `{"result": true, ...payload}`
//! on success, `{"result": false, "error": "..."}` otherwise.

use crate::stats::Statistics;
use serde::ser::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    Success(T),
    Failure(String),
}

/// Empty payload for control operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct Done {}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StatisticsBody {
    pub statistics: Statistics,
}

impl<T> ApiResponse<T> {
    pub fn failure(message: impl Into<String>) -> Self {
        ApiResponse::Failure(message.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Success(_))
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for ApiResponse<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => ApiResponse::Success(value),
            Err(e) => ApiResponse::Failure(e.to_string()),
        }
    }
}

#[derive(serde::Serialize)]
struct SuccessBody<'a, T> {
    result: bool,
    #[serde(flatten)]
    data: &'a T,
}

#[derive(serde::Serialize)]
struct FailureBody<'a> {
    result: bool,
    error: &'a str,
}

impl<T: Serialize> Serialize for ApiResponse<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ApiResponse::Success(data) => SuccessBody { result: true, data }.serialize(serializer),
            ApiResponse::Failure(error) => FailureBody { result: false, error }.serialize(serializer),
        }
    }
}
