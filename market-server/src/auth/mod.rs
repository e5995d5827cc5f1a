//! 调用方身份
//!
//! 认证由上游服务完成，这里只把身份请求头解析为 [`TriggeredBy`](shared::order::TriggeredBy)：
//! - [`Actor`] - axum 提取器

pub mod actor;

pub use actor::{Actor, actor_from_headers};
