use std::{collections::HashMap, path::PathBuf, sync::Arc};

use serde_json::Map;
use uuid::Uuid;

use kueater_config::{
	Config, EmbeddingProviderConfig, Embeddings, Keywords, Postgres, Providers as ProviderSettings,
	Service, Storage,
};
use kueater_domain::{ReasonPicker, UNSUITABLE_SCORE};
use kueater_service::{AgentService, BoxFuture, EmbeddingProvider, Error, KeywordTable, Providers};
use kueater_storage::{db::Db, queries};
use kueater_testkit::TestDatabase;

const VECTOR_DIM: u32 = 4;

struct FirstPicker;
impl ReasonPicker for FirstPicker {
	fn pick(&mut self, _keywords: &[&str]) -> usize {
		0
	}
}

struct FixedEmbedding;
impl EmbeddingProvider for FixedEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		_text: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>> {
		Box::pin(async { Ok(vec![1.0, 0.0, 0.0, 0.0]) })
	}
}

fn test_config(dsn: &str) -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:50052".to_string(),
			log_level: "info".to_string(),
		},
		storage: Storage {
			postgres: Postgres { dsn: dsn.to_string(), pool_max_conns: 2 },
			embeddings: Embeddings { vector_dim: VECTOR_DIM },
		},
		providers: ProviderSettings {
			embedding: EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://localhost".to_string(),
				api_key: "key".to_string(),
				path: "/v1/embeddings".to_string(),
				model: "m".to_string(),
				dimensions: VECTOR_DIM,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
		},
		keywords: Keywords { vectors_path: PathBuf::from("unused.json") },
	}
}

fn test_keywords() -> KeywordTable {
	let mut vectors = HashMap::new();

	vectors.insert("Pad Thai".to_string(), vec![1.0, 0.0, 0.0, 0.0]);

	KeywordTable::from_vectors(vectors)
}

struct Catalog {
	user_id: Uuid,
	tofu_salad: Uuid,
	pad_thai: Uuid,
	peanut_pork: Uuid,
}

async fn seed_catalog(db: &Db) -> Catalog {
	let user_id = Uuid::new_v4();
	let tofu = Uuid::new_v4();
	let peanut = Uuid::new_v4();
	let tofu_salad = Uuid::new_v4();
	let pad_thai = Uuid::new_v4();
	let peanut_pork = Uuid::new_v4();

	sqlx::query("INSERT INTO user_profile (id, name) VALUES ($1, 'tester')")
		.bind(user_id)
		.execute(&db.pool)
		.await
		.expect("Failed to insert user.");
	// The favorite dish is stored twice; its affinity bonus must still be
	// granted once.
	sqlx::query(
		"\
INSERT INTO user_preferences (user_id, diets, allergies, favorite_dishes)
VALUES ($1, '{Vegan}', '{Peanuts}', '{\"Pad Thai\",\"Pad Thai\"}')",
	)
	.bind(user_id)
	.execute(&db.pool)
	.await
	.expect("Failed to insert preferences.");

	sqlx::query("INSERT INTO ingredient (id, name) VALUES ($1, 'Tofu'), ($2, 'Peanut')")
		.bind(tofu)
		.bind(peanut)
		.execute(&db.pool)
		.await
		.expect("Failed to insert ingredients.");
	sqlx::query(
		"\
INSERT INTO ingredient_diet_score (ingredient_id, diet, score)
VALUES ($1, 'Vegan', 0.95), ($2, 'Vegan', 0.9)",
	)
	.bind(tofu)
	.bind(peanut)
	.execute(&db.pool)
	.await
	.expect("Failed to insert diet scores.");
	sqlx::query(
		"\
INSERT INTO ingredient_allergen_score (ingredient_id, allergen, score)
VALUES ($1, 'Peanuts', 0.05), ($2, 'Peanuts', 0.95)",
	)
	.bind(tofu)
	.bind(peanut)
	.execute(&db.pool)
	.await
	.expect("Failed to insert allergen scores.");

	sqlx::query(
		"INSERT INTO menu_item (id, name) VALUES ($1, 'Tofu Salad'), ($2, 'Pad Thai'), ($3, 'Peanut Pork')",
	)
	.bind(tofu_salad)
	.bind(pad_thai)
	.bind(peanut_pork)
	.execute(&db.pool)
	.await
	.expect("Failed to insert menu items.");
	sqlx::query(
		"\
INSERT INTO menu_item_ingredient (menu_id, ingredient_id)
VALUES ($1, $2), ($3, $2), ($4, $5)",
	)
	.bind(tofu_salad)
	.bind(tofu)
	.bind(pad_thai)
	.bind(peanut_pork)
	.bind(peanut)
	.execute(&db.pool)
	.await
	.expect("Failed to link ingredients.");

	// Only Pad Thai carries a stored name embedding, aligned with the
	// keyword vector so the affinity bonus hits the cap.
	sqlx::query(
		"\
INSERT INTO embeddings (object_id, object_type, content, embedding)
VALUES ($1, 'menuitem', 'Pad Thai', $2::vector)",
	)
	.bind(pad_thai)
	.bind("[1,0,0,0]")
	.execute(&db.pool)
	.await
	.expect("Failed to insert embedding.");

	sqlx::query("INSERT INTO liked_item (user_id, menu_id) VALUES ($1, $2)")
		.bind(user_id)
		.bind(tofu_salad)
		.execute(&db.pool)
		.await
		.expect("Failed to insert like.");
	sqlx::query("INSERT INTO saved_item (user_id, menu_id) VALUES ($1, $2)")
		.bind(user_id)
		.bind(tofu_salad)
		.execute(&db.pool)
		.await
		.expect("Failed to insert save.");

	Catalog { user_id, tofu_salad, pad_thai, peanut_pork }
}

#[tokio::test]
#[ignore = "Requires external Postgres with pgvector. Set KUEATER_PG_DSN to run."]
async fn scoring_run_persists_expected_batch() {
	let Some(base_dsn) = kueater_testkit::env_dsn() else {
		eprintln!("Skipping scoring_run_persists_expected_batch; set KUEATER_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let cfg = test_config(test_db.dsn());
	let db = Db::connect(&cfg.storage.postgres).await.expect("Failed to connect to Postgres.");

	db.ensure_schema(VECTOR_DIM).await.expect("Failed to ensure schema.");

	let catalog = seed_catalog(&db).await;
	let service = AgentService::new(cfg, db, test_keywords());

	service
		.generate_recommendations_with(catalog.user_id, &mut FirstPicker)
		.await
		.expect("Scoring run failed.");

	let mut conn = service.db.pool.acquire().await.expect("Failed to acquire connection.");

	// Liked + saved, no embedding: 10 + 5 with empty reasoning.
	let row = queries::fetch_current_score(&mut conn, catalog.user_id, catalog.tofu_salad)
		.await
		.expect("Failed to fetch score.")
		.expect("Expected a current score.");

	assert_eq!(row.score, 15.0);
	assert!(row.reasoning.is_empty());

	// Keyword affinity at the cap. The duplicated favorite dish contributes
	// a single bonus, so the score is exactly the cap and not double it.
	let row = queries::fetch_current_score(&mut conn, catalog.user_id, catalog.pad_thai)
		.await
		.expect("Failed to fetch score.")
		.expect("Expected a current score.");

	assert_eq!(row.score, 15.0);
	assert_eq!(row.reasoning, "Because you like Pad Thai");

	// Allergen in the contains band forces the floor.
	let row = queries::fetch_current_score(&mut conn, catalog.user_id, catalog.peanut_pork)
		.await
		.expect("Failed to fetch score.")
		.expect("Expected a current score.");

	assert_eq!(row.score, UNSUITABLE_SCORE);
	assert_eq!(row.reasoning, "Contains allergen: Peanuts");

	drop(conn);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres with pgvector. Set KUEATER_PG_DSN to run."]
async fn rerun_leaves_exactly_one_current_record_per_item() {
	let Some(base_dsn) = kueater_testkit::env_dsn() else {
		eprintln!("Skipping rerun_leaves_exactly_one_current_record_per_item; set KUEATER_PG_DSN.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let cfg = test_config(test_db.dsn());
	let db = Db::connect(&cfg.storage.postgres).await.expect("Failed to connect to Postgres.");

	db.ensure_schema(VECTOR_DIM).await.expect("Failed to ensure schema.");

	let catalog = seed_catalog(&db).await;
	let service = AgentService::new(cfg, db, test_keywords());

	service
		.generate_recommendations_with(catalog.user_id, &mut FirstPicker)
		.await
		.expect("First scoring run failed.");
	service
		.generate_recommendations_with(catalog.user_id, &mut FirstPicker)
		.await
		.expect("Second scoring run failed.");

	let mut conn = service.db.pool.acquire().await.expect("Failed to acquire connection.");
	let current = queries::count_current_scores(&mut conn, catalog.user_id)
		.await
		.expect("Failed to count current scores.");

	// One current record per catalog item, no stale rows counted.
	assert_eq!(current, 3);

	let per_item: i64 = sqlx::query_scalar(
		"\
SELECT max(cnt)
FROM (
	SELECT count(*) AS cnt
	FROM menu_item_score
	WHERE user_id = $1 AND NOT stale
	GROUP BY menu_id
) t",
	)
	.bind(catalog.user_id)
	.fetch_one(&service.db.pool)
	.await
	.expect("Failed to count per-item rows.");

	assert_eq!(per_item, 1);

	drop(conn);
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres with pgvector. Set KUEATER_PG_DSN to run."]
async fn missing_user_and_missing_preferences_are_no_ops() {
	let Some(base_dsn) = kueater_testkit::env_dsn() else {
		eprintln!("Skipping missing_user_and_missing_preferences_are_no_ops; set KUEATER_PG_DSN.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let cfg = test_config(test_db.dsn());
	let db = Db::connect(&cfg.storage.postgres).await.expect("Failed to connect to Postgres.");

	db.ensure_schema(VECTOR_DIM).await.expect("Failed to ensure schema.");

	let service = AgentService::new(cfg, db, KeywordTable::default());
	let ghost = Uuid::new_v4();

	service.generate_recommendations(ghost).await.expect("Missing user must be a no-op.");

	let bare_user = Uuid::new_v4();

	sqlx::query("INSERT INTO user_profile (id, name) VALUES ($1, 'bare')")
		.bind(bare_user)
		.execute(&service.db.pool)
		.await
		.expect("Failed to insert user.");
	service.generate_recommendations(bare_user).await.expect("Missing preferences must be a no-op.");

	let rows: i64 = sqlx::query_scalar("SELECT count(*) FROM menu_item_score")
		.fetch_one(&service.db.pool)
		.await
		.expect("Failed to count scores.");

	assert_eq!(rows, 0);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres with pgvector. Set KUEATER_PG_DSN to run."]
async fn embedding_validates_input_and_dimension() {
	let Some(base_dsn) = kueater_testkit::env_dsn() else {
		eprintln!("Skipping embedding_validates_input_and_dimension; set KUEATER_PG_DSN.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let cfg = test_config(test_db.dsn());
	let db = Db::connect(&cfg.storage.postgres).await.expect("Failed to connect to Postgres.");

	db.ensure_schema(VECTOR_DIM).await.expect("Failed to ensure schema.");

	let providers = Providers::new(Arc::new(FixedEmbedding));
	let service =
		AgentService::with_providers(cfg, db, KeywordTable::default(), providers);

	let err = service.embedding("  ").await.unwrap_err();

	assert!(matches!(err, Error::InvalidRequest { .. }));

	let vector = service.embedding("pad thai").await.expect("Embedding failed.");

	assert_eq!(vector.len(), VECTOR_DIM as usize);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
