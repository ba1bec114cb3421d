//! Chamber Server - 医生诊室排队与行程追踪服务
//!
//! # 架构概述
//!
//! - **队列** (`queue`): redb 存储、地点锁、号码分配、叫号
//! - **行程** (`journey`): 医生出发、位置上报、到达检测、延误
//! - **重置** (`reset`): 每日定时重置
//! - **HTTP API** (`api`): axum 路由和处理器
//!
//! # 模块结构
//!
//! ```text
//! chamber-server/src/
//! ├── core/          # 配置、状态、服务器、后台任务
//! ├── queue/         # 存储、锁、分配器、地点状态、事件
//! ├── journey/       # 行程状态机
//! ├── reset/         # 每日重置调度器
//! ├── geo.rs         # 球面距离
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 日志、时间、校验
//! ```

pub mod api;
pub mod core;
pub mod geo;
pub mod journey;
pub mod queue;
pub mod reset;
pub mod utils;

// Re-export 公共类型
pub use crate::core::{Config, Server, ServerState};
pub use journey::JourneyTracker;
pub use queue::{QueueError, QueueService, QueueSettings, QueueStorage};
pub use reset::ResetScheduler;
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

/// 加载 .env 并初始化日志
pub fn setup_environment() -> Result<Config, Box<dyn std::error::Error>> {
    match dotenv::dotenv() {
        Ok(path) => eprintln!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => return Err(e.into()),
    }

    let config = Config::from_env();
    utils::logger::init_logger(
        Some(&config.log_level),
        config.is_production(),
        config.log_dir.as_deref(),
    );
    Ok(config)
}

pub fn print_banner() {
    println!(
        r#"
   _____ _                     _
  / ____| |                   | |
 | |    | |__   __ _ _ __ ___ | |__   ___ _ __
 | |    | '_ \ / _` | '_ ` _ \| '_ \ / _ \ '__|
 | |____| | | | (_| | | | | | | |_) |  __/ |
  \_____|_| |_|\__,_|_| |_| |_|_.__/ \___|_|
    "#
    );
}
