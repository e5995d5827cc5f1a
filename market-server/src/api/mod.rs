//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`orders`] - 订单履约接口
//! - [`merchants`] - 商户通知目标预览

pub mod health;
pub mod merchants;
pub mod orders;
