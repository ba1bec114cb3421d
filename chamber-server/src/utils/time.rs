//! 时间工具函数 — 业务时区转换

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use std::time::Duration;

use crate::queue::{QueueError, QueueResult};

/// 解析日期字符串 (YYYY-MM-DD)
pub fn parse_date(date: &str) -> QueueResult<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| QueueError::Validation(format!("Invalid date format: {}", date)))
}

/// 解析重置时间 (HH:MM)，失败返回 00:00
pub fn parse_reset_time(value: &str) -> NaiveTime {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").unwrap_or_else(|e| {
        tracing::warn!(
            "Failed to parse reset time '{}': {}, falling back to 00:00",
            value,
            e
        );
        NaiveTime::MIN
    })
}

/// 解析业务时区，失败返回 UTC
pub fn parse_timezone(value: &str) -> Tz {
    value.trim().parse::<Tz>().unwrap_or_else(|e| {
        tracing::warn!("Unknown timezone '{}': {}, falling back to UTC", value, e);
        chrono_tz::UTC
    })
}

/// 距离下一个 `at` (业务时区) 的时长
///
/// DST gap: 本地时间不存在时取下一天同一时刻。
pub fn duration_until_next(at: NaiveTime, tz: Tz, now: DateTime<Utc>) -> Duration {
    let local_now = now.with_timezone(&tz);
    let mut date = local_now.date_naive();

    for _ in 0..3 {
        if let Some(candidate) = date.and_time(at).and_local_timezone(tz).earliest()
            && candidate > local_now
        {
            return (candidate.with_timezone(&Utc) - now)
                .to_std()
                .unwrap_or(Duration::from_secs(60));
        }
        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    Duration::from_secs(60 * 60)
}
