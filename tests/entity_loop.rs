mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ScriptedSource, payload, ts};
use series_sync::calendar::{IntervalLevel, TradingCalendar};
use series_sync::model::{DataSchema, Entity, Record};
use series_sync::store::InMemoryDataStore;
use series_sync::sync::entity_loop::EntitySyncLoop;
use series_sync::sync::field_map::FieldMap;
use series_sync::sync::{DuplicateResolution, EntityOutcome, PolicyKind, SyncConfig};
use series_sync::utils::FixedClock;

fn schema() -> DataSchema {
	DataSchema::new("kdata_1d", "em")
}

fn base_config() -> SyncConfig {
	SyncConfig {
		sleep_seconds: 0,
		schema: schema(),
		..SyncConfig::default()
	}
}

fn build(
	store: &Arc<InMemoryDataStore>,
	source: &Arc<ScriptedSource>,
	clock: Arc<FixedClock>,
	calendar: Option<TradingCalendar>,
	config: &SyncConfig,
) -> EntitySyncLoop {
	EntitySyncLoop::new(
		store.clone(),
		source.clone(),
		clock,
		calendar.map(Arc::new),
		config,
		FieldMap::new(),
	)
}

#[tokio::test]
async fn test_generic_catch_up_until_end() {
	let entity = Entity::new("stock_sz_000001", "000001").listed_at(ts("2020-01-02"));
	let store = Arc::new(InMemoryDataStore::new());
	let source = Arc::new(
		ScriptedSource::new()
			.with_daily(&entity.id, "2020-01-02", "2020-01-10")
			.with_page_limit(3),
	);
	let clock = Arc::new(FixedClock::new(ts("2024-01-01 10:00:00")));
	let config = SyncConfig {
		end_timestamp: Some(ts("2020-01-10")),
		..base_config()
	};

	let report = build(&store, &source, clock, None, &config).run(&entity).await;

	assert_eq!(report.outcome, EntityOutcome::Finished);
	assert_eq!(report.records_written, 9);
	assert_eq!(report.cycles, 5);

	let windows = source.windows();
	assert_eq!(windows[0].start, Some(ts("2020-01-02")));
	assert_eq!(windows[0].size, 2000);
	assert_eq!(windows[1].start, Some(ts("2020-01-04")));
	assert_eq!(windows.len(), 4);
	assert!(windows.iter().all(|w| w.size == 2000));

	let persisted = store.records(&schema(), &entity.id);
	assert_eq!(persisted.len(), 9);
	assert_eq!(persisted[0].id, "stock_sz_000001_2020-01-02");
	assert_eq!(persisted[8].timestamp, ts("2020-01-10"));
}

#[tokio::test]
async fn test_listing_in_future_fetches_nothing() {
	let entity = Entity::new("e", "c").listed_at(ts("2030-01-01"));
	let store = Arc::new(InMemoryDataStore::new());
	let source = Arc::new(ScriptedSource::new().with_daily("e", "2020-01-01", "2020-01-05"));
	let clock = Arc::new(FixedClock::new(ts("2024-01-01")));

	let report = build(&store, &source, clock, None, &base_config()).run(&entity).await;

	assert_eq!(report.outcome, EntityOutcome::Finished);
	assert!(source.windows().is_empty());
	assert_eq!(store.upsert_calls(), 0);
}

#[tokio::test]
async fn test_fixed_cycle_drops_provisional_bar() {
	let entity = Entity::new("e", "c").listed_at(ts("2020-01-01"));
	let store = Arc::new(InMemoryDataStore::new());
	let settled = Record::new("e_2024-03-08", &entity, ts("2024-03-08"), false);
	let provisional = Record::new("e_2024-03-08_partial", &entity, ts("2024-03-08 11:00:00"), false);
	store.insert(&schema(), settled.clone());
	store.insert(&schema(), provisional);

	let source = Arc::new(ScriptedSource::new());
	let clock = Arc::new(FixedClock::new(ts("2024-03-08 16:00:00")));
	let calendar = TradingCalendar::from_timestamps(
		["2024-03-04", "2024-03-05", "2024-03-06", "2024-03-07", "2024-03-08"]
			.iter()
			.map(|d| ts(d)),
	);
	let config = SyncConfig {
		policy: PolicyKind::FixedCycle,
		granularity_level: IntervalLevel::Day1,
		close_hour: Some(15),
		..base_config()
	};

	let report = build(&store, &source, clock, Some(calendar), &config).run(&entity).await;

	assert_eq!(report.outcome, EntityOutcome::Finished);
	assert_eq!(store.delete_calls(), 1);
	assert_eq!(store.records(&schema(), "e"), vec![settled]);
	assert_eq!(source.windows()[0].start, Some(ts("2024-03-08")));
	assert_eq!(source.windows()[0].size, 1);
}

#[tokio::test]
async fn test_explicit_timestamps_discovered_once() {
	let entity = Entity::new("e", "c").listed_at(ts("2010-01-01"));
	let store = Arc::new(InMemoryDataStore::new());
	store.insert(&schema(), Record::new("e_2020-06-30", &entity, ts("2020-06-30"), false));

	let source = Arc::new(
		ScriptedSource::new()
			.with_events(
				"e",
				vec![ts("2020-12-31"), ts("2020-03-31"), ts("2020-09-30"), ts("2020-06-30"), ts("2020-12-31")],
			)
			.with_payloads(
				"e",
				vec![
					payload("2020-03-31", 1.0),
					payload("2020-06-30", 2.0),
					payload("2020-09-30", 3.0),
					payload("2020-12-31", 4.0),
				],
			),
	);
	let clock = Arc::new(FixedClock::new(ts("2021-06-01")));
	let config = SyncConfig {
		policy: PolicyKind::ExplicitTimestamps,
		..base_config()
	};

	let report = build(&store, &source, clock, None, &config).run(&entity).await;

	assert_eq!(report.outcome, EntityOutcome::Finished);
	assert_eq!(source.event_calls(), 1);
	assert_eq!(report.records_written, 2);

	let windows = source.windows();
	assert_eq!(
		windows[0].explicit_timestamps,
		Some(vec![ts("2020-06-30"), ts("2020-09-30"), ts("2020-12-31")])
	);
	assert_eq!(windows[1].explicit_timestamps, Some(vec![ts("2020-12-31")]));
	assert_eq!(store.records(&schema(), "e").len(), 3);
}

#[tokio::test]
async fn test_already_persisted_without_force_writes_nothing() {
	let entity = Entity::new("e", "c").listed_at(ts("2020-01-01"));
	let store = Arc::new(InMemoryDataStore::new());
	store.insert(&schema(), Record::new("e_2020-01-02", &entity, ts("2020-01-02"), false));

	let source = Arc::new(ScriptedSource::new().with_payloads("e", vec![payload("2020-01-02", 9.0)]));
	let clock = Arc::new(FixedClock::new(ts("2024-01-01")));
	let config = SyncConfig {
		end_timestamp: Some(ts("2020-01-05")),
		..base_config()
	};

	let report = build(&store, &source, clock, None, &config).run(&entity).await;

	assert_eq!(report.outcome, EntityOutcome::Finished);
	assert_eq!(store.upsert_calls(), 0);
	assert_eq!(report.records_written, 0);
}

#[tokio::test]
async fn test_force_update_rewrites_exactly_once() {
	let entity = Entity::new("e", "c").listed_at(ts("2020-01-01"));
	let store = Arc::new(InMemoryDataStore::new());
	store.insert(
		&schema(),
		Record::new("e_2020-01-02", &entity, ts("2020-01-02"), false).with_field("close", serde_json::json!(1.0)),
	);

	let source = Arc::new(ScriptedSource::new().with_payloads("e", vec![payload("2020-01-02", 9.0)]));
	let clock = Arc::new(FixedClock::new(ts("2024-01-01")));
	let config = SyncConfig {
		force_update: true,
		end_timestamp: Some(ts("2020-01-05")),
		..base_config()
	};

	let report = build(&store, &source, clock, None, &config).run(&entity).await;

	assert_eq!(report.outcome, EntityOutcome::Finished);
	assert_eq!(store.upsert_calls(), 1);
	assert_eq!(store.records_written(), 1);
	let persisted = store.records(&schema(), "e");
	assert_eq!(persisted.len(), 1);
	assert_eq!(persisted[0].payload["close"], serde_json::json!(9.0));
}

#[tokio::test]
async fn test_collision_under_ignore_finishes_without_writes() {
	let entity = Entity::new("e", "c").listed_at(ts("2020-01-01"));
	let store = Arc::new(InMemoryDataStore::new());
	let source = Arc::new(ScriptedSource::new().with_payloads(
		"e",
		vec![payload("2020-01-02 09:30:00", 1.0), payload("2020-01-02 15:00:00", 2.0)],
	));
	let clock = Arc::new(FixedClock::new(ts("2024-01-01")));
	let config = SyncConfig {
		duplicate_resolution: DuplicateResolution::Ignore,
		end_timestamp: Some(ts("2020-01-05")),
		..base_config()
	};

	let report = build(&store, &source, clock, None, &config).run(&entity).await;

	assert_eq!(report.outcome, EntityOutcome::Finished);
	assert_eq!(report.cycles, 1);
	assert_eq!(store.upsert_calls(), 0);
}

#[tokio::test]
async fn test_collision_under_add_keeps_both() {
	let entity = Entity::new("e", "c").listed_at(ts("2020-01-01"));
	let store = Arc::new(InMemoryDataStore::new());
	let source = Arc::new(ScriptedSource::new().with_payloads(
		"e",
		vec![payload("2020-01-02 09:30:00", 1.0), payload("2020-01-02 15:00:00", 2.0)],
	));
	let clock = Arc::new(FixedClock::new(ts("2024-01-01")));
	let config = SyncConfig {
		end_timestamp: Some(ts("2020-01-02 15:00:00")),
		..base_config()
	};

	let report = build(&store, &source, clock, None, &config).run(&entity).await;

	assert_eq!(report.outcome, EntityOutcome::Finished);
	let persisted = store.records(&schema(), "e");
	assert_eq!(persisted.len(), 2);
	assert_ne!(persisted[0].id, persisted[1].id);
}

#[tokio::test]
async fn test_refetched_intraday_day_settles() {
	let entity = Entity::new("e", "c").listed_at(ts("2020-01-01"));
	let store = Arc::new(InMemoryDataStore::new());
	let source = Arc::new(
		ScriptedSource::new()
			.with_payloads(
				"e",
				vec![payload("2020-01-02 09:30:00", 1.0), payload("2020-01-02 15:00:00", 2.0)],
			)
			.ignoring_window(),
	);
	let clock = Arc::new(FixedClock::new(ts("2024-01-01")));
	let config = SyncConfig {
		end_timestamp: Some(ts("2021-01-01")),
		..base_config()
	};

	let sync = build(&store, &source, clock, None, &config);
	let run = sync.run(&entity);
	let report = tokio::time::timeout(Duration::from_secs(5), run).await.unwrap();

	assert_eq!(report.outcome, EntityOutcome::Finished);
	assert_eq!(report.cycles, 2);
	assert_eq!(report.records_written, 2);
	assert_eq!(store.records(&schema(), "e").len(), 2);
	assert_eq!(store.upsert_calls(), 1);
}

#[tokio::test]
async fn test_zero_sleep_realtime_loop_yields() {
	let entity = Entity::new("e", "c");
	let store = Arc::new(InMemoryDataStore::new());
	let clock = Arc::new(FixedClock::new(ts("2024-03-08 10:00:00")));
	let source = Arc::new(ScriptedSource::new());
	let config = SyncConfig {
		real_time: true,
		close_hour: Some(15),
		close_minute: Some(0),
		..base_config()
	};
	let sync = build(&store, &source, clock.clone(), None, &config);

	// the loop only ends once another task moves the clock past the close
	let handle = tokio::spawn(async move { sync.run(&entity).await });
	let ticker = tokio::spawn(async move {
		for _ in 0..20 {
			tokio::task::yield_now().await;
		}
		clock.set(ts("2024-03-08 16:00:00"));
	});

	let report = tokio::time::timeout(Duration::from_secs(5), handle)
		.await
		.unwrap()
		.unwrap();
	ticker.await.unwrap();

	assert_eq!(report.outcome, EntityOutcome::Finished);
	assert!(report.cycles > 1);
}

#[tokio::test]
async fn test_realtime_waits_for_close_grace() {
	let entity = Entity::new("e", "c");
	let store = Arc::new(InMemoryDataStore::new());
	let clock = Arc::new(FixedClock::new(ts("2024-03-08 14:57:00")));
	let source = Arc::new(ScriptedSource::new().advancing(clock.clone(), chrono::Duration::minutes(2)));
	let config = SyncConfig {
		real_time: true,
		close_hour: Some(15),
		close_minute: Some(0),
		..base_config()
	};

	let report = build(&store, &source, clock, None, &config).run(&entity).await;

	// checks at 14:59, 15:01 and 15:03 keep going, 15:05 is past the grace margin
	assert_eq!(report.outcome, EntityOutcome::Finished);
	assert_eq!(report.cycles, 4);
}

#[tokio::test]
async fn test_fetch_failure_marks_entity_failed() {
	let entity = Entity::new("e", "c").listed_at(ts("2020-01-01"));
	let store = Arc::new(InMemoryDataStore::new());
	let source = Arc::new(ScriptedSource::new().failing_for("e"));
	let clock = Arc::new(FixedClock::new(ts("2024-01-01")));

	let report = build(&store, &source, clock, None, &base_config()).run(&entity).await;

	assert_eq!(report.outcome, EntityOutcome::Failed);
	assert_eq!(report.records_written, 0);
}
