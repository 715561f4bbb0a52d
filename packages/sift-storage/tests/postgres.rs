//! Integration tests against a real Postgres. Set `SIFT_TEST_PG_DSN` to a
//! DSN with createdb rights to run them; each test provisions and drops its
//! own database.

use serde_json::json;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use sift_storage::{
	cache, candidates,
	db::Db,
	jobs::{self, EnqueueOutcome},
	metrics,
	models::MetricPoint,
	proposals, shadow,
};
use sift_testkit::{env_dsn, with_test_db};

macro_rules! require_dsn {
	() => {
		match env_dsn() {
			Some(dsn) => dsn,
			None => {
				eprintln!("Skipping Postgres test: SIFT_TEST_PG_DSN is not set.");

				return;
			},
		}
	};
}

async fn connect(dsn: &str) -> Db {
	let db = Db::connect(&sift_config::Postgres { dsn: dsn.to_string(), pool_max_conns: 4 })
		.await
		.expect("connect to test database");

	db.ensure_schema().await.expect("apply schema");

	db
}

#[tokio::test]
async fn schema_application_is_idempotent() {
	let dsn = require_dsn!();

	with_test_db(&dsn, async |test_db| {
		let db = connect(test_db.dsn()).await;

		db.ensure_schema().await.expect("second application must succeed");

		Ok(())
	})
	.await
	.expect("test database lifecycle");
}

#[tokio::test]
async fn job_queue_dedups_live_jobs_and_frees_the_key_on_completion() {
	let dsn = require_dsn!();

	with_test_db(&dsn, async |test_db| {
		let db = connect(test_db.dsn()).await;
		let now = OffsetDateTime::now_utc();
		let first = jobs::enqueue(&db, "candidate_sync", "cand-1", json!({"id": 1}), now)
			.await
			.expect("enqueue");

		assert!(matches!(first, EnqueueOutcome::Queued(_)));

		let second = jobs::enqueue(&db, "candidate_sync", "cand-1", json!({"id": 1}), now)
			.await
			.expect("enqueue duplicate");

		assert_eq!(second, EnqueueOutcome::Duplicate);

		// A different kind with the same key is a distinct logical job.
		let other_kind =
			jobs::enqueue(&db, "reindex", "cand-1", json!({}), now).await.expect("enqueue");

		assert!(matches!(other_kind, EnqueueOutcome::Queued(_)));

		let claimed = jobs::claim(&db, now, 60).await.expect("claim").expect("a job is due");

		jobs::complete(&db, claimed.job_id).await.expect("complete");

		// Completion removes the row, so the dedup key is free again.
		let requeued = jobs::enqueue(&db, &claimed.kind, &claimed.dedup_key, json!({}), now)
			.await
			.expect("re-enqueue");

		assert!(matches!(requeued, EnqueueOutcome::Queued(_)));

		Ok(())
	})
	.await
	.expect("test database lifecycle");
}

#[tokio::test]
async fn claimed_jobs_are_leased_and_invisible_until_the_lease_lapses() {
	let dsn = require_dsn!();

	with_test_db(&dsn, async |test_db| {
		let db = connect(test_db.dsn()).await;
		let now = OffsetDateTime::now_utc();

		jobs::enqueue(&db, "candidate_sync", "cand-1", json!({}), now).await.expect("enqueue");

		let claimed = jobs::claim(&db, now, 120).await.expect("claim").expect("a job is due");

		assert_eq!(claimed.status, "PENDING");
		assert_eq!(claimed.dedup_key, "cand-1");

		// The lease pushes availability out; a second worker sees nothing.
		let second = jobs::claim(&db, now, 120).await.expect("claim");

		assert!(second.is_none());

		// Once the lease lapses, the job is claimable again.
		let later = now + Duration::seconds(121);
		let reclaimed = jobs::claim(&db, later, 120).await.expect("claim");

		assert!(reclaimed.is_some());

		Ok(())
	})
	.await
	.expect("test database lifecycle");
}

#[tokio::test]
async fn failed_jobs_back_off_and_eventually_park_as_dead() {
	let dsn = require_dsn!();

	with_test_db(&dsn, async |test_db| {
		let db = connect(test_db.dsn()).await;
		let now = OffsetDateTime::now_utc();

		jobs::enqueue(&db, "candidate_sync", "cand-1", json!({}), now).await.expect("enqueue");

		let claimed = jobs::claim(&db, now, 60).await.expect("claim").expect("a job is due");

		jobs::fail(&db, claimed.job_id, 1, "graph unreachable", 3, now).await.expect("fail");

		// Backoff for attempt 1 is one second; not due immediately.
		assert!(jobs::claim(&db, now, 60).await.expect("claim").is_none());

		let after_backoff = now + Duration::seconds(2);
		let retried =
			jobs::claim(&db, after_backoff, 60).await.expect("claim").expect("job is due again");

		assert_eq!(retried.status, "FAILED");
		assert_eq!(retried.attempts, 1);
		assert_eq!(retried.last_error.as_deref(), Some("graph unreachable"));

		// Exhausting attempts parks the job; only the purge removes it.
		jobs::fail(&db, retried.job_id, 3, "still unreachable", 3, after_backoff)
			.await
			.expect("fail");

		let much_later = now + Duration::hours(1);

		assert!(jobs::claim(&db, much_later, 60).await.expect("claim").is_none());

		let purged = jobs::purge_dead(&db, much_later).await.expect("purge");

		assert_eq!(purged, 1);

		Ok(())
	})
	.await
	.expect("test database lifecycle");
}

#[tokio::test]
async fn shadow_pending_set_is_idempotent_and_pops_atomically() {
	let dsn = require_dsn!();

	with_test_db(&dsn, async |test_db| {
		let db = connect(test_db.dsn()).await;
		let now = OffsetDateTime::now_utc();
		let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
		let inserted = shadow::enqueue_pending(&db, &ids, now).await.expect("enqueue");

		assert_eq!(inserted, 3);

		// Re-enqueueing already-pending ids changes nothing.
		let again = shadow::enqueue_pending(&db, &ids[..1], now).await.expect("enqueue");

		assert_eq!(again, 0);

		let first_batch = shadow::pop_pending(&db, 2).await.expect("pop");

		assert_eq!(first_batch.len(), 2);
		assert_eq!(shadow::pending_count(&db).await.expect("count"), 1);

		let second_batch = shadow::pop_pending(&db, 10).await.expect("pop");

		assert_eq!(second_batch.len(), 1);
		assert!(shadow::pop_pending(&db, 10).await.expect("pop").is_empty());

		Ok(())
	})
	.await
	.expect("test database lifecycle");
}

#[tokio::test]
async fn shadow_profiles_are_lowercased_and_expire() {
	let dsn = require_dsn!();

	with_test_db(&dsn, async |test_db| {
		let db = connect(test_db.dsn()).await;
		let now = OffsetDateTime::now_utc();
		let candidate_id = Uuid::new_v4();

		candidates::upsert(
			&db,
			candidate_id,
			"Ada Lovelace",
			Some("Staff Engineer"),
			Some("Berlin"),
			Some(7.5),
			json!(["Rust", "PostgreSQL"]),
			now,
		)
		.await
		.expect("upsert candidate");

		let projections =
			candidates::load_projection(&db, &[candidate_id]).await.expect("projection");

		assert_eq!(projections.len(), 1);

		shadow::upsert_profiles(&db, &projections, now).await.expect("upsert profiles");

		let profile = shadow::load_profile(&db, candidate_id)
			.await
			.expect("load")
			.expect("profile exists");

		assert_eq!(profile.location.as_deref(), Some("berlin"));
		assert_eq!(profile.title.as_deref(), Some("staff engineer"));

		// Within the TTL nothing is purged; past it the profile goes.
		assert_eq!(shadow::purge_expired(&db, now).await.expect("purge"), 0);

		let past_ttl = now + Duration::days(shadow::PROFILE_TTL_DAYS + 1);

		assert_eq!(shadow::purge_expired(&db, past_ttl).await.expect("purge"), 1);

		Ok(())
	})
	.await
	.expect("test database lifecycle");
}

#[tokio::test]
async fn expansion_cache_honors_expiry_on_read_and_purge() {
	let dsn = require_dsn!();

	with_test_db(&dsn, async |test_db| {
		let db = connect(test_db.dsn()).await;
		let now = OffsetDateTime::now_utc();
		let payload = json!({"skills": ["redux"]});

		cache::put(&db, "k1", &payload, now, now + Duration::minutes(60)).await.expect("put");

		let hit = cache::get(&db, "k1", now).await.expect("get");

		assert_eq!(hit, Some(payload.clone()));

		// Reads past the expiry see nothing even before the purge runs.
		let stale_read = cache::get(&db, "k1", now + Duration::minutes(61)).await.expect("get");

		assert!(stale_read.is_none());

		// Overwriting the same key replaces the payload.
		let newer = json!({"skills": ["mobx"]});

		cache::put(&db, "k1", &newer, now, now + Duration::minutes(60)).await.expect("put");

		assert_eq!(cache::get(&db, "k1", now).await.expect("get"), Some(newer));
		assert_eq!(cache::purge_expired(&db, now + Duration::hours(2)).await.expect("purge"), 1);

		Ok(())
	})
	.await
	.expect("test database lifecycle");
}

#[tokio::test]
async fn metric_points_persist_in_bulk() {
	let dsn = require_dsn!();

	with_test_db(&dsn, async |test_db| {
		let db = connect(test_db.dsn()).await;
		let bucket_start = OffsetDateTime::now_utc() - Duration::minutes(1);
		let points = vec![
			MetricPoint {
				bucket_start,
				name: "expansion.requests".to_string(),
				value: 42.0,
				dimensions: None,
			},
			MetricPoint {
				bucket_start,
				name: "expansion.latency_ms".to_string(),
				value: 17.5,
				dimensions: Some(json!({"tier": "strict"})),
			},
		];
		let written = metrics::insert_points(&db, &points).await.expect("insert");

		assert_eq!(written, 2);
		assert_eq!(metrics::insert_points(&db, &[]).await.expect("insert"), 0);

		Ok(())
	})
	.await
	.expect("test database lifecycle");
}

#[tokio::test]
async fn proposal_ranking_cycles_through_the_backlog() {
	let dsn = require_dsn!();

	with_test_db(&dsn, async |test_db| {
		let db = connect(test_db.dsn()).await;
		let now = OffsetDateTime::now_utc();
		let first = proposals::insert(&db, "react", "redux", "related_to", 0.8, "curated", now)
			.await
			.expect("insert");
		let second = proposals::insert(
			&db,
			"python",
			"pandas",
			"related_to",
			0.6,
			"extraction",
			now + Duration::seconds(1),
		)
		.await
		.expect("insert");
		let pending = proposals::list_pending(&db, 10).await.expect("list");

		assert_eq!(pending.len(), 2);
		// Least recently touched first.
		assert_eq!(pending[0].proposal_id, first);

		proposals::update_score(&db, first, 0.95, now + Duration::seconds(2))
			.await
			.expect("score");

		let reordered = proposals::list_pending(&db, 10).await.expect("list");

		// Scoring bumps updated_at, rotating the proposal to the back.
		assert_eq!(reordered[0].proposal_id, second);
		assert_eq!(reordered[1].score, Some(0.95));

		Ok(())
	})
	.await
	.expect("test database lifecycle");
}
