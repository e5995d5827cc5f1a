//! 服务层
//!
//! - [`SettingsProvider`] - AppSettings 单例快照（含时效缓存）

pub mod settings_provider;

pub use settings_provider::SettingsProvider;
