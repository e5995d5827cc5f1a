//! Actor Extractor
//!
//! 调用方身份由上游认证服务通过请求头传入：
//!
//! | Header | 说明 |
//! |--------|------|
//! | X-Actor-Role | customer / merchant / admin / system |
//! | X-Actor-Id | 用户 ID (system 不需要) |
//! | X-Actor-Name | 显示名称，缺省为 ID |
//! | X-Actor-Phone | 可选 |
//! | X-Actor-Email | 可选 |

use axum::{extract::FromRequestParts, http::request::Parts};
use http::HeaderMap;
use shared::order::TriggeredBy;

use crate::AppError;

pub const ROLE_HEADER: &str = "x-actor-role";
pub const ID_HEADER: &str = "x-actor-id";
pub const NAME_HEADER: &str = "x-actor-name";
pub const PHONE_HEADER: &str = "x-actor-phone";
pub const EMAIL_HEADER: &str = "x-actor-email";

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor(pub TriggeredBy);

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Build the actor from identity headers
pub fn actor_from_headers(headers: &HeaderMap) -> Result<TriggeredBy, AppError> {
    let role = header(headers, ROLE_HEADER).ok_or(AppError::Unauthorized)?;
    if role.eq_ignore_ascii_case("system") {
        return Ok(TriggeredBy::System);
    }

    let user_id = header(headers, ID_HEADER).ok_or(AppError::Unauthorized)?;
    let name = header(headers, NAME_HEADER).unwrap_or_else(|| user_id.clone());
    let phone = header(headers, PHONE_HEADER);
    let email = header(headers, EMAIL_HEADER);

    match role.to_ascii_lowercase().as_str() {
        "customer" => Ok(TriggeredBy::Customer {
            user_id,
            name,
            phone,
        }),
        "merchant" => Ok(TriggeredBy::Merchant {
            user_id,
            name,
            phone,
            email,
        }),
        "admin" => Ok(TriggeredBy::Admin {
            user_id,
            name,
            email,
        }),
        other => {
            tracing::warn!(role = %other, "Unknown actor role");
            Err(AppError::Unauthorized)
        }
    }
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(actor) = parts.extensions.get::<Actor>() {
            return Ok(actor.clone());
        }

        let actor = Actor(actor_from_headers(&parts.headers).inspect_err(|_| {
            tracing::debug!(uri = %parts.uri, "Request without caller identity");
        })?);
        parts.extensions.insert(actor.clone());
        Ok(actor)
    }
}
