//! 工具模块 - 通用工具函数
//!
//! - [`logger`] - tracing 初始化
//! - [`time`] - 业务时区与日期解析
//! - [`validation`] - 输入校验

pub mod logger;
pub mod time;
pub mod validation;

pub use shared::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
