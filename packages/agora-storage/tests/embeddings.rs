use time::OffsetDateTime;
use uuid::Uuid;

use agora_storage::{conversations, db::Db, embeddings, responses};
use agora_testkit::TestDatabase;

#[tokio::test]
#[ignore = "Requires external Postgres. Set AGORA_PG_DSN to run."]
async fn malformed_vectors_never_reach_the_table() {
	let Some(base_dsn) = agora_testkit::env_dsn() else {
		eprintln!(
			"Skipping malformed_vectors_never_reach_the_table; set AGORA_PG_DSN to run this test."
		);

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let cfg = agora_config::Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 2 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema(3).await.expect("Failed to ensure schema.");

	let conversation_id = Uuid::new_v4();
	let response_id = Uuid::new_v4();
	let now = OffsetDateTime::now_utc();

	conversations::insert_conversation(&db.pool, conversation_id, "discussion", "", now)
		.await
		.expect("Failed to insert conversation.");
	responses::insert_response(&db.pool, response_id, conversation_id, "u1", "a text", now)
		.await
		.expect("Failed to insert response.");

	let short =
		embeddings::upsert_embedding(&db.pool, response_id, "v1", &[1.0, 0.0], 3, now).await;
	let nan =
		embeddings::upsert_embedding(&db.pool, response_id, "v1", &[f32::NAN, 0.0, 0.0], 3, now)
			.await;

	assert!(matches!(short, Err(agora_storage::Error::InvalidArgument(_))));
	assert!(matches!(nan, Err(agora_storage::Error::InvalidArgument(_))));

	embeddings::upsert_embedding(&db.pool, response_id, "v1", &[0.0, 1.0, 0.0], 3, now)
		.await
		.expect("Failed to store embedding.");

	let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM response_embeddings")
		.fetch_one(&db.pool)
		.await
		.expect("Failed to count embeddings.");

	assert_eq!(stored, 1);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
