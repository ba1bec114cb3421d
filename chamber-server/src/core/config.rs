use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;
use chrono_tz::Tz;
use shared::models::DEFAULT_MAX_ADMISSIONS;

use crate::queue::QueueSettings;
use crate::utils::time;

/// 服务器配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 (数据库文件) |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | TIMEZONE | UTC | 业务时区 (IANA) |
/// | LOCK_TIMEOUT_MS | 2000 | 地点锁最长等待(毫秒) |
/// | RESET_TIME | 00:00 | 每日重置时间 (HH:MM, 业务时区) |
/// | DEFAULT_MAX_ADMISSIONS | 50 | 新地点默认容量 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (未设置) | 日志目录，设置后写入按天滚动的文件 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/chamber TIMEZONE=Asia/Dhaka cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存放 redb 数据库
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 业务时区，"今天" 按此计算
    pub timezone: Tz,
    /// 地点锁等待上限
    pub lock_timeout_ms: u64,
    /// 每日重置时间
    pub reset_time: NaiveTime,
    /// 新地点默认容量
    pub default_max_admissions: u32,
    pub log_level: String,
    pub log_dir: Option<String>,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            http_port: env_parse("HTTP_PORT", 3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            timezone: std::env::var("TIMEZONE")
                .map(|tz| time::parse_timezone(&tz))
                .unwrap_or(chrono_tz::UTC),
            lock_timeout_ms: env_parse("LOCK_TIMEOUT_MS", 2000),
            reset_time: std::env::var("RESET_TIME")
                .map(|t| time::parse_reset_time(&t))
                .unwrap_or(NaiveTime::MIN),
            default_max_admissions: env_parse("DEFAULT_MAX_ADMISSIONS", DEFAULT_MAX_ADMISSIONS),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.trim().is_empty()),
        }
    }

    /// 使用自定义工作目录和端口覆盖配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// 数据库文件路径
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("queue.redb")
    }

    /// 队列核心参数
    pub fn queue_settings(&self) -> QueueSettings {
        QueueSettings {
            timezone: self.timezone,
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
            default_max_admissions: self.default_max_admissions,
        }
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
