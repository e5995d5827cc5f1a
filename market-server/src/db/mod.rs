//! 持久化层
//!
//! 订单、库存、商户目录与设置单例均存放在同一个 redb 数据库中。

pub mod storage;

pub use storage::{MarketStorage, StorageError, StorageResult};
