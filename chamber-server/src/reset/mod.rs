//! 每日重置调度器
//!
//! 在业务时区的 `RESET_TIME` 把所有地点恢复到 AT_BASE、清零叫号与延误，
//! 并清除医生的实时位置与在途标记。`total_issued` 不动：新一天的号码由分配器按日期
//! 重新计数。
//!
//! 启动时若 `last_reset_date` 早于今天则立即补跑一次（停机期间错过的重置）。

use std::time::Duration;

use chrono::{NaiveDate, NaiveTime, Utc};
use shared::models::{ResetReport, TravelStatus};
use tokio_util::sync::CancellationToken;

use crate::queue::{QueueError, QueueEvent, QueueResult, QueueService, StorageError};
use crate::utils::time;

/// 未能重置全部地点时的重试间隔
const RETRY_DELAY: Duration = Duration::from_secs(60);

/// 每日重置调度器
///
/// 注册为 `TaskKind::Periodic`，在 `start_background_tasks()` 中启动。
pub struct ResetScheduler {
    queue: QueueService,
    reset_time: NaiveTime,
    shutdown: CancellationToken,
}

impl ResetScheduler {
    pub fn new(queue: QueueService, reset_time: NaiveTime, shutdown: CancellationToken) -> Self {
        Self {
            queue,
            reset_time,
            shutdown,
        }
    }

    /// 主循环：启动补跑 + 定点触发
    pub async fn run(self) {
        tracing::info!(
            reset_time = %self.reset_time.format("%H:%M"),
            timezone = %self.queue.timezone(),
            "Daily reset scheduler started"
        );

        let mut sleep_duration = match self.catch_up().await {
            Ok(_) => self.until_next_reset(),
            Err(e) => {
                tracing::error!("Startup catch-up reset failed: {}", e);
                RETRY_DELAY
            }
        };

        loop {
            tracing::info!(
                "Next daily reset in {} minutes",
                sleep_duration.as_secs() / 60
            );

            tokio::select! {
                _ = tokio::time::sleep(sleep_duration) => {}
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Reset scheduler received shutdown signal");
                    return;
                }
            }

            let today = self.queue.today();
            sleep_duration = match self.reset_all(today).await {
                Ok(report) => {
                    tracing::info!(
                        date = %report.date,
                        locations = report.locations_reset,
                        providers = report.providers_reset,
                        "Daily reset completed"
                    );
                    self.until_next_reset()
                }
                Err(e) => {
                    tracing::error!("Daily reset failed, retrying: {}", e);
                    RETRY_DELAY.min(self.until_next_reset())
                }
            };
        }
    }

    /// 今天尚未重置则立即执行
    ///
    /// 无需补跑时返回 `None`。
    pub async fn catch_up(&self) -> QueueResult<Option<ResetReport>> {
        let today = self.queue.today();
        let last = self.queue.storage().last_reset_date()?;
        if last.is_some_and(|d| d >= today) {
            tracing::debug!(last_reset = ?last, "Daily reset already done today");
            return Ok(None);
        }

        tracing::info!(last_reset = ?last, today = %today, "Missed daily reset, running now");
        self.reset_all(today).await.map(Some)
    }

    /// 重置全部地点与医生，并记录 `date` 已完成
    ///
    /// 幂等：同一天重复执行结果相同。
    /// 某地点锁获取失败时，其余地点照常重置，本次返回错误且不记录日期。
    pub async fn reset_all(&self, date: NaiveDate) -> QueueResult<ResetReport> {
        let storage = self.queue.storage();
        let mut locations_reset = 0;
        let mut failed = Vec::new();

        for location_id in storage.location_ids()? {
            let result = self
                .queue
                .with_location(&location_id, |_, location| {
                    location.travel_status = TravelStatus::AtBase;
                    location.current_served = 0;
                    location.delay_minutes = 0;
                    location.en_route_provider_id = None;
                    Ok(())
                })
                .await;

            match result {
                Ok(()) => locations_reset += 1,
                // 列出后被删除
                Err(QueueError::LocationNotFound(_)) => {}
                Err(e) => {
                    tracing::warn!(location_id = %location_id, error = %e, "Location reset failed");
                    failed.push(location_id);
                }
            }
        }

        let providers_reset = {
            let txn = storage.begin_write()?;
            let providers = storage.list_providers_txn(&txn)?;
            let count = providers.len();
            for mut provider in providers {
                provider.is_en_route = false;
                provider.position = None;
                provider.active_location_id = None;
                storage.put_provider(&txn, &provider)?;
            }
            if failed.is_empty() {
                storage.set_last_reset_date(&txn, date)?;
            }
            txn.commit().map_err(StorageError::from)?;
            count
        };

        if let Some(first) = failed.into_iter().next() {
            return Err(QueueError::LocationBusy(first));
        }

        self.queue.publish(QueueEvent::DailyReset { date });
        Ok(ResetReport {
            date,
            locations_reset,
            providers_reset,
        })
    }

    fn until_next_reset(&self) -> Duration {
        time::duration_until_next(self.reset_time, self.queue.timezone(), Utc::now())
    }
}
