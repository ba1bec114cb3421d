//! 医生行程跟踪
//!
//! 每个地点的行程状态机：
//!
//! ```text
//!            start_journey               distance < 0.2 km
//! AT_BASE ───────────────► EN_ROUTE ─────────────────────► ARRIVED
//!    ▲                        │  ▲                            │
//!    │            report_delay│  │start_journey               │
//!    │                        ▼  │                            │
//!    │                      DELAYED ──────────────────────────┤
//!    │                                                        │
//!    └──────────── end_session / daily reset ─────────────────┘
//! ```
//!
//! `report_delay` 可从任意状态进入 `DELAYED`。
//!
//! 位置上报只写医生记录，不占用地点锁；只有判定到达时才短暂持锁，
//! 在锁内复核行程状态后切到 `ARRIVED`。锁忙时本次不判到达，下一次上报重试。

use shared::models::{
    Coordinates, Location, LocationStatusView, PositionOutcome, Provider, ProviderCreate,
    TravelStatus,
};

use crate::geo;
use crate::queue::{QueueError, QueueEvent, QueueResult, QueueService, StorageError};
use crate::utils::validation::{
    MAX_NAME_LEN, validate_coordinates, validate_delay_minutes, validate_required_text,
};

/// 到达半径（严格小于）
pub const ARRIVAL_RADIUS_KM: f64 = 0.2;

/// 每公里耗时估算
pub const MINUTES_PER_KM: f64 = 3.0;

/// `round(distance * 3) + delay`
pub fn eta_minutes(distance_km: f64, delay_minutes: u32) -> u32 {
    let travel = (distance_km * MINUTES_PER_KM).round().max(0.0) as u32;
    travel.saturating_add(delay_minutes)
}

pub fn is_arrival(distance_km: f64) -> bool {
    distance_km < ARRIVAL_RADIUS_KM
}

fn is_travelling(status: TravelStatus) -> bool {
    matches!(status, TravelStatus::EnRoute | TravelStatus::Delayed)
}

/// 医生是否正在前往该地点
fn heading_to(provider: &Provider, location: &Location) -> bool {
    provider.is_en_route
        && provider.active_location_id.as_deref() == Some(location.id.as_str())
        && location.en_route_provider_id.as_deref() == Some(provider.id.as_str())
        && is_travelling(location.travel_status)
}

/// 一次位置写入的结果（医生事务内计算）
struct RecordedFix {
    location_id: Option<String>,
    travelling: bool,
    distance_km: Option<f64>,
    delay_minutes: u32,
}

/// 行程状态转换与实时状态读取
#[derive(Debug, Clone)]
pub struct JourneyTracker {
    queue: QueueService,
}

impl JourneyTracker {
    pub fn new(queue: QueueService) -> Self {
        Self { queue }
    }

    pub fn queue(&self) -> &QueueService {
        &self.queue
    }

    pub fn register_provider(&self, data: ProviderCreate) -> QueueResult<Provider> {
        let name = validate_required_text(&data.name, "name", MAX_NAME_LEN)?;
        let provider = Provider {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            position: None,
            is_en_route: false,
            active_location_id: None,
            last_report_at: None,
            created_at: shared::util::now_millis(),
        };

        let storage = self.queue.storage();
        let txn = storage.begin_write()?;
        storage.put_provider(&txn, &provider)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(provider_id = %provider.id, name = %provider.name, "Provider registered");
        Ok(provider)
    }

    pub fn get_provider(&self, provider_id: &str) -> QueueResult<Provider> {
        self.queue
            .storage()
            .get_provider(provider_id)?
            .ok_or_else(|| QueueError::ProviderNotFound(provider_id.to_string()))
    }

    /// 医生出发前往 `location_id`
    pub async fn start_journey(&self, provider_id: &str, location_id: &str) -> QueueResult<Location> {
        let storage = self.queue.storage();
        let location = self
            .queue
            .with_location(location_id, |txn, location| {
                let mut provider = storage
                    .get_provider_txn(txn, provider_id)?
                    .ok_or_else(|| QueueError::ProviderNotFound(provider_id.to_string()))?;

                if location.travel_status == TravelStatus::Arrived {
                    return Err(QueueError::InvalidTransition(format!(
                        "Provider already arrived at {}; end the session first",
                        location.id
                    )));
                }

                location.travel_status = TravelStatus::EnRoute;
                location.en_route_provider_id = Some(provider.id.clone());

                provider.is_en_route = true;
                provider.active_location_id = Some(location.id.clone());
                storage.put_provider(txn, &provider)?;
                Ok(location.clone())
            })
            .await?;

        tracing::info!(provider_id = %provider_id, location_id = %location_id, "Journey started");
        self.queue.publish(QueueEvent::JourneyStarted {
            location_id: location_id.to_string(),
            provider_id: provider_id.to_string(),
        });
        Ok(location)
    }

    /// 记录实时位置并检测到达
    ///
    /// 位置总是先落库；地点锁只在判定到达时获取。
    pub async fn report_position(
        &self,
        provider_id: &str,
        position: Coordinates,
    ) -> QueueResult<PositionOutcome> {
        validate_coordinates(position)?;

        let fix = self.record_position(provider_id, position)?;
        let mut outcome = PositionOutcome {
            provider_id: provider_id.to_string(),
            location_id: fix.location_id.clone(),
            distance_km: fix.distance_km.map(shared::util::round_km),
            eta_minutes: fix.distance_km.map(|d| eta_minutes(d, fix.delay_minutes)),
            arrived: false,
        };

        let Some(location_id) = fix.location_id else {
            return Ok(outcome);
        };

        if fix.travelling && fix.distance_km.is_some_and(is_arrival) {
            outcome.arrived = match self.mark_arrived(provider_id, &location_id).await {
                Ok(arrived) => arrived,
                Err(QueueError::LocationBusy(_)) => {
                    tracing::warn!(
                        provider_id = %provider_id,
                        location_id = %location_id,
                        "Location busy, arrival deferred to the next report"
                    );
                    false
                }
                Err(e) => return Err(e),
            };
        }

        tracing::debug!(
            provider_id = %provider_id,
            location_id = %location_id,
            distance_km = ?outcome.distance_km,
            "Position reported"
        );
        self.queue.publish(QueueEvent::PositionReported {
            location_id: location_id.clone(),
            provider_id: provider_id.to_string(),
            distance_km: outcome.distance_km,
        });
        if outcome.arrived {
            tracing::info!(provider_id = %provider_id, location_id = %location_id, "Provider arrived");
            self.queue.publish(QueueEvent::Arrived {
                location_id,
                provider_id: provider_id.to_string(),
            });
        }
        Ok(outcome)
    }

    /// 只写医生记录：位置、上报时间；顺带读取目标地点算距离
    fn record_position(&self, provider_id: &str, position: Coordinates) -> QueueResult<RecordedFix> {
        let storage = self.queue.storage();
        let txn = storage.begin_write()?;
        let mut provider = storage
            .get_provider_txn(&txn, provider_id)?
            .ok_or_else(|| QueueError::ProviderNotFound(provider_id.to_string()))?;
        provider.position = Some(position);
        provider.last_report_at = Some(shared::util::now_millis());

        let location = match provider.active_location_id.as_deref() {
            Some(id) => storage.get_location_txn(&txn, id)?,
            None => None,
        };
        let fix = match location {
            Some(location) => {
                let travelling = heading_to(&provider, &location);
                RecordedFix {
                    travelling,
                    distance_km: location
                        .destination
                        .filter(|_| travelling)
                        .map(|destination| geo::distance_km(position, destination)),
                    delay_minutes: location.delay_minutes,
                    location_id: Some(location.id),
                }
            }
            None => RecordedFix {
                location_id: None,
                travelling: false,
                distance_km: None,
                delay_minutes: 0,
            },
        };

        storage.put_provider(&txn, &provider)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(fix)
    }

    /// 锁内复核后切到 `ARRIVED`；状态已变化时返回 `false`
    async fn mark_arrived(&self, provider_id: &str, location_id: &str) -> QueueResult<bool> {
        let storage = self.queue.storage();
        self.queue
            .with_location(location_id, |txn, location| {
                let Some(mut provider) = storage.get_provider_txn(txn, provider_id)? else {
                    return Ok(false);
                };
                if !heading_to(&provider, location) {
                    return Ok(false);
                }

                location.travel_status = TravelStatus::Arrived;
                location.en_route_provider_id = None;
                provider.is_en_route = false;
                provider.position = None;
                storage.put_provider(txn, &provider)?;
                Ok(true)
            })
            .await
    }

    /// 报告延误，地点进入 `DELAYED`
    pub async fn report_delay(&self, location_id: &str, minutes: u32) -> QueueResult<Location> {
        validate_delay_minutes(minutes)?;

        let location = self
            .queue
            .with_location(location_id, |_, location| {
                location.delay_minutes = minutes;
                location.travel_status = TravelStatus::Delayed;
                Ok(location.clone())
            })
            .await?;

        tracing::info!(location_id = %location_id, minutes, "Delay reported");
        self.queue.publish(QueueEvent::DelayReported {
            location_id: location_id.to_string(),
            minutes,
        });
        Ok(location)
    }

    /// 结束当天在该地点的出诊
    ///
    /// 行程状态与叫号归零，`total_issued` 保留。
    pub async fn end_session(&self, provider_id: &str, location_id: &str) -> QueueResult<Location> {
        let storage = self.queue.storage();
        let location = self
            .queue
            .with_location(location_id, |txn, location| {
                let mut provider = storage
                    .get_provider_txn(txn, provider_id)?
                    .ok_or_else(|| QueueError::ProviderNotFound(provider_id.to_string()))?;

                location.travel_status = TravelStatus::AtBase;
                location.current_served = 0;
                location.delay_minutes = 0;
                location.en_route_provider_id = None;

                // 正在前往别处的医生保留那段行程
                let here = provider
                    .active_location_id
                    .as_deref()
                    .is_none_or(|active| active == location.id);
                if here {
                    provider.is_en_route = false;
                    provider.position = None;
                    provider.active_location_id = None;
                    storage.put_provider(txn, &provider)?;
                }
                Ok(location.clone())
            })
            .await?;

        tracing::info!(provider_id = %provider_id, location_id = %location_id, "Session ended");
        self.queue.publish(QueueEvent::SessionEnded {
            location_id: location_id.to_string(),
            provider_id: provider_id.to_string(),
        });
        Ok(location)
    }

    /// 患者端实时状态
    ///
    /// 实时位置取自正在前往的医生记录。
    pub fn status(&self, location_id: &str) -> QueueResult<LocationStatusView> {
        let location = self.queue.get_location(location_id)?;
        let (current_served, total_issued) = self.queue.effective_counters(&location)?;

        let live_position = match location.en_route_provider_id.as_deref() {
            Some(provider_id) if is_travelling(location.travel_status) => self
                .queue
                .storage()
                .get_provider(provider_id)?
                .filter(|provider| heading_to(provider, &location))
                .and_then(|provider| provider.position),
            _ => None,
        };
        let distance = live_position
            .zip(location.destination)
            .map(|(position, destination)| geo::distance_km(position, destination));

        Ok(LocationStatusView {
            location_id: location.id,
            status: location.travel_status,
            distance_km: distance.map(shared::util::round_km),
            eta_minutes: distance.map(|d| eta_minutes(d, location.delay_minutes)),
            delay_minutes: location.delay_minutes,
            current_served,
            total_issued,
            is_admitting: location.is_admitting,
            max_admissions: location.max_admissions,
        })
    }
}
