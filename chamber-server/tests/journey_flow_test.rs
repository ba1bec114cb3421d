//! 一天的完整流程：挂号 → 出发 → 位置上报 → 到达 → 叫号 → 结束 → 每日重置

use chamber_server::geo;
use chamber_server::queue::QueueEvent;
use chamber_server::{JourneyTracker, QueueService, QueueSettings, QueueStorage, ResetScheduler};
use chrono::NaiveTime;
use shared::models::{BookingStatus, Coordinates, LocationCreate, ProviderCreate, TravelStatus};
use tokio_util::sync::CancellationToken;

const CLINIC: Coordinates = Coordinates {
    lat: 22.3569,
    lng: 91.7832,
};

fn tracker() -> JourneyTracker {
    let storage = QueueStorage::open_in_memory().unwrap();
    JourneyTracker::new(QueueService::new(storage, QueueSettings::default()))
}

#[tokio::test]
async fn full_day_at_one_chamber() {
    let tracker = tracker();
    let queue = tracker.queue().clone();
    let mut events = queue.subscribe();

    let provider = tracker
        .register_provider(ProviderCreate {
            name: "Dr. Hossain".into(),
        })
        .unwrap();
    let location = queue
        .create_location(LocationCreate {
            name: "Popular Diagnostic, Room 402".into(),
            provider_id: Some(provider.id.clone()),
            max_admissions: Some(2),
            destination: Some(CLINIC),
        })
        .await
        .unwrap();
    let today = queue.today();

    // Capacity 2: third ticket is extra
    let mut bookings = Vec::new();
    for who in ["rahim", "karim", "salma"] {
        bookings.push(queue.create_booking(&location.id, today, who).await.unwrap());
    }
    let statuses: Vec<_> = bookings.iter().map(|b| (b.serial_number, b.status)).collect();
    assert_eq!(
        statuses,
        vec![
            (1, BookingStatus::Pending),
            (2, BookingStatus::Pending),
            (3, BookingStatus::Extra)
        ]
    );

    // Provider leaves home 10 km away and is running 5 minutes late
    tracker.start_journey(&provider.id, &location.id).await.unwrap();
    let outcome = tracker
        .report_position(&provider.id, geo::offset_north(CLINIC, 10.0))
        .await
        .unwrap();
    assert!(!outcome.arrived);
    tracker.report_delay(&location.id, 5).await.unwrap();

    let view = tracker.status(&location.id).unwrap();
    assert_eq!(view.status, TravelStatus::Delayed);
    assert_eq!(view.distance_km, Some(10.0));
    assert_eq!(view.eta_minutes, Some(35));
    assert_eq!(view.total_issued, 3);
    assert_eq!(view.current_served, 0);

    // Arrives
    let outcome = tracker
        .report_position(&provider.id, geo::offset_north(CLINIC, 0.05))
        .await
        .unwrap();
    assert!(outcome.arrived);
    assert_eq!(tracker.status(&location.id).unwrap().status, TravelStatus::Arrived);

    // Serve everyone, then one more call fails
    for expected in 1..=3 {
        assert_eq!(queue.call_next(&location.id).await.unwrap(), expected);
    }
    assert!(matches!(
        queue.call_next(&location.id).await.unwrap_err(),
        chamber_server::QueueError::QueueExhausted
    ));

    queue
        .update_booking_status(&bookings[0].id, BookingStatus::Completed)
        .await
        .unwrap();
    queue
        .update_booking_status(&bookings[2].id, BookingStatus::NoShow)
        .await
        .unwrap();

    // End of the day
    let ended = tracker.end_session(&provider.id, &location.id).await.unwrap();
    assert_eq!(ended.travel_status, TravelStatus::AtBase);
    assert_eq!(ended.current_served, 0);
    assert_eq!(ended.total_issued, 3);

    // Nightly reset twice leaves the same state
    let scheduler = ResetScheduler::new(queue.clone(), NaiveTime::MIN, CancellationToken::new());
    scheduler.reset_all(today).await.unwrap();
    let once = queue.get_location(&location.id).unwrap();
    scheduler.reset_all(today).await.unwrap();
    let twice = queue.get_location(&location.id).unwrap();
    assert_eq!(
        (once.travel_status, once.current_served, once.delay_minutes, once.total_issued),
        (twice.travel_status, twice.current_served, twice.delay_minutes, twice.total_issued)
    );
    assert_eq!(twice.travel_status, TravelStatus::AtBase);

    // Snapshot keeps serial order and final statuses
    let snapshot = queue.queue_snapshot(&location.id, Some(today)).unwrap();
    let rows: Vec<_> = snapshot.iter().map(|e| (e.serial, e.status)).collect();
    assert_eq!(
        rows,
        vec![
            (1, BookingStatus::Completed),
            (2, BookingStatus::Pending),
            (3, BookingStatus::NoShow)
        ]
    );

    // Events were published in order for this location
    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        kinds.push(match event {
            QueueEvent::BookingCreated { .. } => "booking",
            QueueEvent::JourneyStarted { .. } => "journey",
            QueueEvent::PositionReported { .. } => "position",
            QueueEvent::DelayReported { .. } => "delay",
            QueueEvent::Arrived { .. } => "arrived",
            QueueEvent::ServingAdvanced { .. } => "next",
            QueueEvent::BookingStatusChanged { .. } => "status",
            QueueEvent::SessionEnded { .. } => "ended",
            QueueEvent::DailyReset { .. } => "reset",
            _ => "other",
        });
    }
    assert_eq!(
        kinds,
        vec![
            "booking", "booking", "booking", "journey", "position", "delay", "position",
            "arrived", "next", "next", "next", "status", "status", "ended", "reset", "reset"
        ]
    );
}

#[tokio::test]
async fn closed_admission_blocks_new_tickets_only() {
    let tracker = tracker();
    let queue = tracker.queue();
    let location = queue
        .create_location(LocationCreate {
            name: "Room 7".into(),
            provider_id: None,
            max_admissions: Some(10),
            destination: None,
        })
        .await
        .unwrap();
    let today = queue.today();

    queue.create_booking(&location.id, today, "a").await.unwrap();
    assert!(!queue.toggle_admission(&location.id).await.unwrap());

    assert!(matches!(
        queue.create_booking(&location.id, today, "b").await.unwrap_err(),
        chamber_server::QueueError::AdmissionClosed(_)
    ));
    // Serving continues while closed
    assert_eq!(queue.call_next(&location.id).await.unwrap(), 1);

    assert!(queue.toggle_admission(&location.id).await.unwrap());
    let b = queue.create_booking(&location.id, today, "b").await.unwrap();
    assert_eq!(b.serial_number, 2);
}

#[tokio::test]
async fn status_without_destination_has_no_eta() {
    let tracker = tracker();
    let provider = tracker
        .register_provider(ProviderCreate { name: "Dr. X".into() })
        .unwrap();
    let location = tracker
        .queue()
        .create_location(LocationCreate {
            name: "Room 9".into(),
            provider_id: None,
            max_admissions: None,
            destination: None,
        })
        .await
        .unwrap();

    tracker.start_journey(&provider.id, &location.id).await.unwrap();
    let outcome = tracker
        .report_position(&provider.id, Coordinates::new(23.0, 90.0))
        .await
        .unwrap();
    assert!(!outcome.arrived);
    assert_eq!(outcome.distance_km, None);

    let view = tracker.status(&location.id).unwrap();
    assert_eq!(view.status, TravelStatus::EnRoute);
    assert_eq!(view.distance_km, None);
    assert_eq!(view.eta_minutes, None);
}
