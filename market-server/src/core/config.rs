use std::time::Duration;

use crate::notify::{SmartConfig, WebhookConfig};

/// 服务器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/market | 工作目录 (数据库、日志) |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | - | 日志目录 (不设置则只输出到终端) |
/// | LOG_JSON | false | JSON 格式日志 |
/// | BUSINESS_TIMEZONE | Asia/Kolkata | 业务时区 (订单号日期、营业时间) |
/// | N8N_WEBHOOK_ENABLED | false | 是否启用通知 webhook |
/// | N8N_WEBHOOK_URL | - | 通知编排器地址 |
/// | N8N_TIMEOUT_MS | 10000 | 单次请求超时 |
/// | N8N_RETRY_ATTEMPTS | 3 | 最大尝试次数 |
/// | N8N_RETRY_DELAY_MS | 1000 | 重试基础间隔 (线性递增) |
/// | SMART_MAX_DISTANCE_KM | 15 | 商户通知最大距离 |
/// | SMART_MAX_CURRENT_ORDERS | 10 | 商户当日订单上限 |
/// | SMART_TOP_N | 5 | 每个商品通知的商户数 |
/// | SETTINGS_CACHE_TTL_SECS | 30 | 业务设置缓存时间 |
/// | NOTIFY_QUEUE_CAPACITY | 1024 | 通知发件箱容量 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/market HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库和日志
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub log_json: bool,
    /// 业务时区
    pub timezone: chrono_tz::Tz,
    /// 通知 webhook
    pub webhook: WebhookConfig,
    /// 智能通知参数
    pub smart: SmartConfig,
    pub settings_cache_ttl: Duration,
    pub notify_queue_capacity: usize,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        let timezone = match std::env::var("BUSINESS_TIMEZONE") {
            Ok(name) => name.parse().unwrap_or_else(|_| {
                tracing::warn!(timezone = %name, "Unknown BUSINESS_TIMEZONE, using Asia/Kolkata");
                chrono_tz::Asia::Kolkata
            }),
            Err(_) => chrono_tz::Asia::Kolkata,
        };

        let smart_defaults = SmartConfig::default();
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/market".into()),
            http_port: env_or("HTTP_PORT", 3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: env_opt("LOG_DIR"),
            log_json: env_or("LOG_JSON", false),
            timezone,
            webhook: WebhookConfig {
                enabled: env_or("N8N_WEBHOOK_ENABLED", false),
                url: env_opt("N8N_WEBHOOK_URL"),
                timeout: Duration::from_millis(env_or("N8N_TIMEOUT_MS", 10_000)),
                retry_attempts: env_or("N8N_RETRY_ATTEMPTS", 3),
                retry_delay: Duration::from_millis(env_or("N8N_RETRY_DELAY_MS", 1_000)),
            },
            smart: SmartConfig {
                max_distance_km: env_or("SMART_MAX_DISTANCE_KM", smart_defaults.max_distance_km),
                max_current_orders: env_or(
                    "SMART_MAX_CURRENT_ORDERS",
                    smart_defaults.max_current_orders,
                ),
                top_n: env_or("SMART_TOP_N", smart_defaults.top_n),
            },
            settings_cache_ttl: Duration::from_secs(env_or("SETTINGS_CACHE_TTL_SECS", 30)),
            notify_queue_capacity: env_or("NOTIFY_QUEUE_CAPACITY", 1024usize).max(1),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// 数据库文件路径
    pub fn database_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir).join("market.redb")
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
