// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::domain::repositories::RepositoryError;
use crate::domain::services::retry_service::RetryError;

/// 应用错误类型
///
/// 封装所有可能的应用层错误，提供统一的错误处理接口
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_message = self.0.to_string();

        let status = if let Some(retry_error) = self.0.downcast_ref::<RetryError>() {
            match retry_error {
                RetryError::AlreadyInFlight(_) => StatusCode::CONFLICT,
                RetryError::AuthenticationFailure
                | RetryError::NotRetryable
                | RetryError::NoLongerActionable(_) => StatusCode::UNPROCESSABLE_ENTITY,
                RetryError::FailureNotFound | RetryError::UnknownJobClass(_) => {
                    StatusCode::NOT_FOUND
                }
                RetryError::DispatchFailed(_)
                | RetryError::Repository(_)
                | RetryError::Queue(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        } else {
            match self.0.downcast_ref::<RepositoryError>() {
                Some(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
                Some(RepositoryError::Database(_)) => StatusCode::INTERNAL_SERVER_ERROR,
                None => {
                    if error_message.contains("invalid") || error_message.contains("required") {
                        StatusCode::BAD_REQUEST
                    } else {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                }
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
