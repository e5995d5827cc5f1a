//! Market Server - 多商户订单履约引擎
//!
//! # 架构概述
//!
//! - **存储** (`db`): 嵌入式 redb，单写事务保证库存与订单串行化
//! - **库存** (`inventory`): 按 (商户, 商品) 计数，预留 / 结算 / 释放
//! - **定价** (`pricing`): 单价策略与订单合计
//! - **地理** (`geo`, `eligibility`): 距离、营业时间、商户评分
//! - **订单** (`orders`): 命令处理与状态机
//! - **生命周期** (`lifecycle`): 订单事件日志与通知发件箱
//! - **通知** (`notify`): webhook 派发
//! - **HTTP API** (`api`): axum 路由
//!
//! # 模块结构
//!
//! ```text
//! market-server/src/
//! ├── core/          # 配置、状态、后台任务、服务器
//! ├── auth/          # 调用方身份
//! ├── api/           # HTTP 路由和处理器
//! ├── db/            # redb 存储
//! ├── inventory/     # 库存账本
//! ├── pricing/       # 金额计算
//! ├── geo/           # 距离 / 营业时间 / 评分
//! ├── eligibility/   # 商户资格筛选
//! ├── orders/        # 履约引擎
//! ├── lifecycle/     # 生命周期事件
//! ├── notify/        # 通知派发
//! ├── services/      # 设置快照
//! └── utils/         # 错误、日志
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod eligibility;
pub mod geo;
pub mod inventory;
pub mod lifecycle;
pub mod notify;
pub mod orders;
pub mod pricing;
pub mod services;
pub mod utils;

// Re-export 公共类型
pub use core::{Config, Server, ServerState};
pub use db::MarketStorage;
pub use orders::{FulfillmentError, OrdersManager};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 加载 .env 并初始化日志
pub fn setup_environment() -> anyhow::Result<Config> {
    // .env 不存在时忽略
    let _ = dotenv::dotenv();

    let config = Config::from_env();
    if let Some(dir) = &config.log_dir {
        std::fs::create_dir_all(dir)?;
    }
    init_logger_with_file(
        Some(&config.log_level),
        config.log_json,
        config.log_dir.as_deref(),
    );
    Ok(config)
}
