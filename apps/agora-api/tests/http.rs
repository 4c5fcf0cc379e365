use axum::{
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::Map;
use time::OffsetDateTime;
use tower::util::ServiceExt;
use uuid::Uuid;

use agora_api::{routes, state::AppState};
use agora_config::{
	Analysis, Config, Consensus, EmbeddingProviderConfig, LlmProviderConfig, Postgres,
	ProviderConfig, Providers, Service, Storage, Worker,
};
use agora_storage::{conversations, members};
use agora_testkit::TestDatabase;

fn test_config(dsn: String) -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:0".to_string(), log_level: "info".to_string() },
		storage: Storage { postgres: Postgres { dsn, pool_max_conns: 1 } },
		providers: Providers {
			embedding: EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/".to_string(),
				model: "test".to_string(),
				dimensions: 8,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			clustering: dummy_provider(),
			projection: dummy_provider(),
			llm: LlmProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/".to_string(),
				model: "test".to_string(),
				temperature: 0.1,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
		},
		analysis: Analysis::default(),
		consensus: Consensus::default(),
		worker: Worker::default(),
	}
}

fn dummy_provider() -> ProviderConfig {
	ProviderConfig {
		provider_id: "test".to_string(),
		api_base: "http://127.0.0.1:1".to_string(),
		api_key: String::new(),
		path: "/".to_string(),
		timeout_ms: 1_000,
		default_headers: Map::new(),
	}
}

async fn test_env() -> Option<(TestDatabase, AppState)> {
	let Some(base_dsn) = agora_testkit::env_dsn() else {
		eprintln!("Skipping HTTP tests; set AGORA_PG_DSN to run this test.");

		return None;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let state = AppState::new(test_config(test_db.dsn().to_string()))
		.await
		.expect("Failed to initialize app state.");

	Some((test_db, state))
}

async fn read_json(response: axum::response::Response) -> serde_json::Value {
	let body = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");

	serde_json::from_slice(&body).expect("Failed to parse response.")
}

async fn seed_conversation(state: &AppState) -> Uuid {
	let conversation_id = Uuid::new_v4();
	let pool = &state.service.db.pool;

	conversations::insert_conversation(
		pool,
		conversation_id,
		"discussion",
		"Parks",
		OffsetDateTime::now_utc(),
	)
	.await
	.expect("Failed to insert conversation.");
	members::add_member(pool, conversation_id, "owner").await.expect("Failed to add member.");

	conversation_id
}

fn post_json(uri: &str, payload: serde_json::Value) -> Request<Body> {
	Request::builder()
		.method("POST")
		.uri(uri)
		.header("content-type", "application/json")
		.body(Body::from(payload.to_string()))
		.expect("Failed to build request.")
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set AGORA_PG_DSN to run."]
async fn health_ok() {
	let Some((test_db, state)) = test_env().await else { return };
	let response = routes::router(state)
		.oneshot(Request::builder().uri("/health").body(Body::empty()).expect("Bad request."))
		.await
		.expect("Failed to call /health.");

	assert_eq!(response.status(), StatusCode::OK);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set AGORA_PG_DSN to run."]
async fn trigger_below_threshold_is_complete() {
	let Some((test_db, state)) = test_env().await else { return };
	let conversation_id = seed_conversation(&state).await;
	let response = routes::router(state)
		.oneshot(post_json(
			&format!("/v1/conversations/{conversation_id}/analysis"),
			serde_json::json!({ "user_id": "owner" }),
		))
		.await
		.expect("Failed to call trigger.");

	assert_eq!(response.status(), StatusCode::OK);

	let json = read_json(response).await;

	assert_eq!(json["status"], "already_complete");
	assert_eq!(json["reason"], "below_threshold");
	assert_eq!(json["currentResponseCount"], 0);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set AGORA_PG_DSN to run."]
async fn non_members_are_forbidden() {
	let Some((test_db, state)) = test_env().await else { return };
	let conversation_id = seed_conversation(&state).await;
	let response = routes::router(state)
		.oneshot(post_json(
			&format!("/v1/conversations/{conversation_id}/analysis"),
			serde_json::json!({ "user_id": "stranger", "mode": "regenerate" }),
		))
		.await
		.expect("Failed to call trigger.");

	assert_eq!(response.status(), StatusCode::FORBIDDEN);
	assert_eq!(read_json(response).await["error_code"], "NOT_A_MEMBER");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set AGORA_PG_DSN to run."]
async fn empty_user_id_names_the_field() {
	let Some((test_db, state)) = test_env().await else { return };
	let response = routes::router(state)
		.oneshot(post_json(
			&format!("/v1/conversations/{}/analysis", Uuid::new_v4()),
			serde_json::json!({ "user_id": "  " }),
		))
		.await
		.expect("Failed to call trigger.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let json = read_json(response).await;

	assert_eq!(json["error_code"], "INVALID_REQUEST");
	assert_eq!(json["fields"][0], "$.user_id");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set AGORA_PG_DSN to run."]
async fn unknown_job_is_not_found() {
	let Some((test_db, state)) = test_env().await else { return };
	let response = routes::router(state)
		.oneshot(
			Request::builder()
				.uri(format!("/v1/analysis/jobs/{}", Uuid::new_v4()))
				.body(Body::empty())
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call job status.");

	assert_eq!(response.status(), StatusCode::NOT_FOUND);
	assert_eq!(read_json(response).await["error_code"], "NOT_FOUND");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set AGORA_PG_DSN to run."]
async fn consensus_summaries_start_empty() {
	let Some((test_db, state)) = test_env().await else { return };
	let conversation_id = seed_conversation(&state).await;
	let response = routes::router(state)
		.oneshot(
			Request::builder()
				.uri(format!(
					"/v1/conversations/{conversation_id}/consensus/summaries?user_id=owner"
				))
				.body(Body::empty())
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call summaries.");

	assert_eq!(response.status(), StatusCode::OK);

	let json = read_json(response).await;

	assert_eq!(json["agreement"], serde_json::json!([]));
	assert_eq!(json["divisive"], serde_json::json!([]));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
