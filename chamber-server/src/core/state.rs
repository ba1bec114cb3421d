use std::path::Path;

use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::{Config, Result, ServerError};
use crate::journey::JourneyTracker;
use crate::queue::{QueueEvent, QueueService, QueueStorage};
use crate::reset::ResetScheduler;

/// 服务器状态 - 持有所有服务的共享引用
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | queue | QueueService | 号码分配与队列状态 |
/// | journey | JourneyTracker | 医生行程与实时状态 |
/// | started_at | i64 | 启动时间 (Unix millis) |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub queue: QueueService,
    pub journey: JourneyTracker,
    pub started_at: i64,
}

impl ServerState {
    /// 使用已打开的存储构造状态 (测试、嵌入)
    pub fn with_storage(config: Config, storage: QueueStorage) -> Self {
        let queue = QueueService::new(storage, config.queue_settings());
        let journey = JourneyTracker::new(queue.clone());
        Self {
            config,
            queue,
            journey,
            started_at: shared::util::now_millis(),
        }
    }

    /// 初始化服务器状态
    ///
    /// 创建工作目录并打开 `WORK_DIR/chamber.redb`。
    pub fn initialize(config: &Config) -> Result<Self> {
        let work_dir = Path::new(&config.work_dir);
        if work_dir.exists() && !work_dir.is_dir() {
            return Err(ServerError::Config(format!(
                "WORK_DIR {} is not a directory",
                config.work_dir
            )));
        }
        std::fs::create_dir_all(work_dir)?;

        let db_path = config.database_path();
        let storage = QueueStorage::open(&db_path)?;
        tracing::info!(path = %db_path.display(), "Queue database opened");

        Ok(Self::with_storage(config.clone(), storage))
    }

    /// 启动后台任务
    ///
    /// - `daily_reset` (Periodic): 每日重置 + 启动补跑
    /// - `queue_event_log` (Listener): 队列事件调试日志
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();

        let scheduler = ResetScheduler::new(
            self.queue.clone(),
            self.config.reset_time,
            tasks.shutdown_token(),
        );
        tasks.spawn("daily_reset", TaskKind::Periodic, scheduler.run());

        let mut rx = self.queue.subscribe();
        let shutdown = tasks.shutdown_token();
        tasks.spawn("queue_event_log", TaskKind::Listener, async move {
            loop {
                tokio::select! {
                    received = rx.recv() => match received {
                        Ok(event) => log_event(&event),
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            tracing::debug!(skipped = n, "Event log listener lagged");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
                    },
                    _ = shutdown.cancelled() => return,
                }
            }
        });

        tasks.log_summary();
        tasks
    }
}

fn log_event(event: &QueueEvent) {
    match serde_json::to_string(event) {
        Ok(json) => tracing::debug!(target: "queue_events", event = %json, "Queue event"),
        Err(e) => tracing::warn!("Failed to serialize queue event: {}", e),
    }
}
