//! 统一错误处理
//!
//! 提供应用级错误类型和响应结构：
//! - [`AppError`] - 应用错误枚举
//! - [`AppResponse`] - API 响应结构
//!
//! # 错误码规范
//!
//! | 前缀 | 分类 | 示例 |
//! |------|------|------|
//! | E0xxx | 业务错误 | E0003 资源不存在 |
//! | E2xxx | 权限错误 | E2001 无权限 |
//! | E3xxx | 身份错误 | E3001 未识别调用方 |
//! | E4xxx | 库存错误 | E4001 库存不足 |
//! | E9xxx | 系统错误 | E9002 数据库错误 |
//!
//! # 使用示例
//!
//! ```ignore
//! // 返回错误
//! Err(AppError::NotFound("Order not found".into()))
//!
//! // 返回成功响应
//! Ok(Json(order))
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::orders::FulfillmentError;

/// API 统一响应结构
///
/// ```json
/// {
///   "code": "E0000",
///   "message": "Success",
///   "data": { ... }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct AppResponse<T> {
    /// 错误码 (E0000 表示成功)
    pub code: String,
    /// 消息
    pub message: String,
    /// 响应数据
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// 应用错误枚举
///
/// # 错误分类
///
/// | 分类 | 说明 |
/// |------|------|
/// | 身份错误 | 缺少调用方身份 |
/// | 业务逻辑错误 | 资源不存在、验证失败、并发冲突、库存不足 |
/// | 系统错误 | 数据库错误、内部错误 |
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== 身份与权限错误 (4xx) ==========
    #[error("Caller identity required")]
    /// 未识别调用方 (401)
    Unauthorized,

    #[error("Permission denied: {0}")]
    /// 无权限 (403)
    Forbidden(String),

    // ========== 业务逻辑错误 (4xx) ==========
    #[error("Resource not found: {0}")]
    /// 资源不存在 (404)
    NotFound(String),

    #[error("Conflict: {0}")]
    /// 并发冲突 (409)
    Conflict(String),

    #[error("Validation failed: {0}")]
    /// 验证失败 (400)
    Validation(String),

    #[error("Insufficient stock: {0}")]
    /// 库存不足 (422)
    InsufficientStock(String),

    // ========== 系统错误 (5xx) ==========
    #[error("Database error: {0}")]
    /// 数据库错误 (500)
    Database(String),

    #[error("Internal server error: {0}")]
    /// 内部错误 (500)
    Internal(String),
}

impl AppError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Error code and HTTP status
    pub fn code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "E3001"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "E2001"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "E0003"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "E0004"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "E0002"),
            AppError::InsufficientStock(_) => (StatusCode::UNPROCESSABLE_ENTITY, "E4001"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "E9002"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "E9001"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.code();
        let message = match &self {
            AppError::Unauthorized => "Caller identity required".to_string(),
            AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::Validation(msg)
            | AppError::InsufficientStock(msg) => msg.clone(),

            // Database errors (500)
            AppError::Database(msg) => {
                error!(target: "database", error = %msg, "Database error occurred");
                "Database error".to_string()
            }

            // Internal errors (500)
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                "Internal server error".to_string()
            }
        };

        let body = Json(AppResponse::<()> {
            code: code.to_string(),
            message,
            data: None,
        });

        (status, body).into_response()
    }
}

impl From<FulfillmentError> for AppError {
    fn from(err: FulfillmentError) -> Self {
        match err {
            FulfillmentError::Validation(msg) => AppError::Validation(msg),
            FulfillmentError::Forbidden(msg) => AppError::Forbidden(msg),
            FulfillmentError::Conflict(msg) => AppError::Conflict(msg),
            e @ (FulfillmentError::OrderNotFound(_)
            | FulfillmentError::ItemNotFound(_)
            | FulfillmentError::MerchantNotFound(_)
            | FulfillmentError::ProductNotFound(_)
            | FulfillmentError::MerchantProductNotFound { .. }) => AppError::NotFound(e.to_string()),
            e @ (FulfillmentError::InsufficientStock { .. } | FulfillmentError::OutOfStock { .. }) => {
                AppError::InsufficientStock(e.to_string())
            }
            FulfillmentError::Storage(e) => AppError::Database(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fulfillment_errors_map_to_distinct_statuses() {
        let forbidden: AppError = FulfillmentError::Forbidden("not yours".into()).into();
        assert_eq!(forbidden.code().0, StatusCode::FORBIDDEN);

        let missing: AppError = FulfillmentError::OrderNotFound("o-1".into()).into();
        assert_eq!(missing.code().0, StatusCode::NOT_FOUND);

        let stock: AppError = FulfillmentError::InsufficientStock {
            merchant_id: "m-1".into(),
            product_id: "p-1".into(),
            requested: 3,
            available: 1,
        }
        .into();
        assert_eq!(stock.code(), (StatusCode::UNPROCESSABLE_ENTITY, "E4001"));

        let conflict: AppError = FulfillmentError::Conflict("taken".into()).into();
        assert_eq!(conflict.code().0, StatusCode::CONFLICT);
    }
}
