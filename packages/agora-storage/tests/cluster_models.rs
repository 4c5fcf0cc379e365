use time::OffsetDateTime;
use uuid::Uuid;

use agora_storage::{cluster_models, conversations, db::Db, models::ClusterModel};
use agora_testkit::TestDatabase;

fn model(conversation_id: Uuid, cluster_index: i32, centroid: [f32; 3]) -> ClusterModel {
	ClusterModel {
		conversation_id,
		cluster_index,
		centroid_embedding: centroid.to_vec(),
		centroid_x: cluster_index as f32,
		centroid_y: 0.5,
		spread_radius: 1.1,
		member_count: 3,
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set AGORA_PG_DSN to run."]
async fn replacing_models_is_deterministic() {
	let Some(base_dsn) = agora_testkit::env_dsn() else {
		eprintln!("Skipping replacing_models_is_deterministic; set AGORA_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let cfg = agora_config::Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 2 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema(3).await.expect("Failed to ensure schema.");

	let conversation_id = Uuid::new_v4();

	conversations::insert_conversation(
		&db.pool,
		conversation_id,
		"discussion",
		"",
		OffsetDateTime::now_utc(),
	)
	.await
	.expect("Failed to insert conversation.");

	let models = vec![
		model(conversation_id, 0, [1.0, 0.0, 0.0]),
		model(conversation_id, 1, [0.0, 1.0, 0.0]),
		model(conversation_id, 2, [0.0, 0.0, 1.0]),
	];
	let mut snapshots = Vec::new();

	for _ in 0..2 {
		let mut tx = db.pool.begin().await.expect("Failed to begin transaction.");

		cluster_models::replace_cluster_models(&mut tx, conversation_id, &models, 3)
			.await
			.expect("Failed to replace cluster models.");
		tx.commit().await.expect("Failed to commit.");

		snapshots.push(
			cluster_models::list_cluster_models(&db.pool, conversation_id)
				.await
				.expect("Failed to list cluster models."),
		);
	}

	assert_eq!(snapshots[0], models);
	assert_eq!(snapshots[0], snapshots[1]);

	let mut tx = db.pool.begin().await.expect("Failed to begin transaction.");
	let mut short = vec![model(conversation_id, 0, [1.0, 0.0, 0.0])];

	short[0].centroid_embedding.pop();

	let nan = vec![model(conversation_id, 0, [f32::NAN, 0.0, 0.0])];

	assert!(
		cluster_models::replace_cluster_models(&mut tx, conversation_id, &short, 3).await.is_err()
	);
	assert!(
		cluster_models::replace_cluster_models(&mut tx, conversation_id, &nan, 3).await.is_err()
	);

	tx.commit().await.expect("Failed to commit.");

	let kept = cluster_models::list_cluster_models(&db.pool, conversation_id)
		.await
		.expect("Failed to list cluster models.");

	assert_eq!(kept, models);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
