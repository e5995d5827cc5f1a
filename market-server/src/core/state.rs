use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::core::Config;
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::db::MarketStorage;
use crate::eligibility::MerchantEligibility;
use crate::lifecycle::{DispatchJob, LifecycleLog};
use crate::notify::{NotificationWorker, WebhookDispatcher};
use crate::orders::OrdersManager;
use crate::services::SettingsProvider;

/// 服务器状态 - 持有所有服务的单例引用
///
/// 使用 Arc 实现浅拷贝，可直接作为 axum State。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | storage | MarketStorage | 嵌入式 redb 存储 |
/// | orders | Arc<OrdersManager> | 订单履约引擎 |
/// | settings | Arc<SettingsProvider> | 业务设置快照 |
/// | eligibility | MerchantEligibility | 商户资格筛选 |
#[derive(Clone, Debug)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 嵌入式数据库 (redb)
    pub storage: MarketStorage,
    /// 订单履约引擎
    pub orders: Arc<OrdersManager>,
    /// 业务设置
    pub settings: Arc<SettingsProvider>,
    /// 商户资格筛选 (通知预览)
    pub eligibility: MerchantEligibility,
    /// 通知发件箱接收端，启动后台任务时取走
    outbox: Arc<Mutex<Option<mpsc::Receiver<DispatchJob>>>>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 1. 确保工作目录存在
    /// 2. 打开 redb 数据库
    /// 3. 创建设置缓存、事件日志、订单引擎
    pub fn initialize(config: &Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;
        let storage = MarketStorage::open(config.database_path())?;
        tracing::info!(path = %config.database_path().display(), "Database opened");
        Ok(Self::with_storage(config.clone(), storage))
    }

    /// 使用已有存储创建状态 (测试常用内存库)
    pub fn with_storage(config: Config, storage: MarketStorage) -> Self {
        let (tx, rx) = mpsc::channel(config.notify_queue_capacity);
        let settings = Arc::new(SettingsProvider::new(
            storage.clone(),
            config.settings_cache_ttl,
        ));
        let lifecycle = LifecycleLog::new(storage.clone(), tx);
        let orders = Arc::new(OrdersManager::new(
            storage.clone(),
            settings.clone(),
            lifecycle,
            config.timezone,
        ));

        Self {
            eligibility: MerchantEligibility::new(storage.clone()),
            config,
            storage,
            orders,
            settings,
            outbox: Arc::new(Mutex::new(Some(rx))),
        }
    }

    /// 启动后台任务
    ///
    /// 必须在 tokio runtime 内调用，且只能调用一次（发件箱接收端只有一个）。
    ///
    /// 启动前先重新投递没有派发结果的事件。
    ///
    /// 启动的任务：
    /// - 设置缓存预热 (Warmup)
    /// - 通知派发 (NotificationWorker)
    pub fn start_background_tasks(&self) -> anyhow::Result<BackgroundTasks> {
        let rx = self
            .outbox
            .lock()
            .take()
            .ok_or_else(|| anyhow::anyhow!("Background tasks already started"))?;

        let dispatcher = WebhookDispatcher::new(self.config.webhook.clone())?;
        let worker = NotificationWorker::new(
            self.storage.clone(),
            self.orders.lifecycle().clone(),
            dispatcher,
            self.config.smart,
            self.config.timezone,
        );

        // 上次退出时仍在发件箱中的事件，在 worker 启动前重新投递
        self.orders.lifecycle().requeue_unnotified()?;

        let mut tasks = BackgroundTasks::new();

        // 预热设置缓存（首次读取会创建单例行）
        let settings = self.settings.clone();
        tasks.spawn("settings_warmup", TaskKind::Warmup, async move {
            match tokio::task::spawn_blocking(move || settings.snapshot()).await {
                Ok(Ok(_)) => tracing::debug!("Settings cache warmed"),
                Ok(Err(e)) => tracing::error!(error = %e, "Failed to load settings"),
                Err(e) => tracing::error!(error = %e, "Settings warmup panicked"),
            }
        });

        let shutdown = tasks.shutdown_token();
        tasks.spawn("notification_worker", TaskKind::Worker, async move {
            worker.run(rx, shutdown).await;
        });
        tasks.log_summary();
        Ok(tasks)
    }

    /// 获取订单引擎
    pub fn orders(&self) -> Arc<OrdersManager> {
        self.orders.clone()
    }
}
