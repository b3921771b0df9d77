use std::collections::{HashMap, HashSet};

use sqlx::{PgConnection, Postgres, Transaction};
use uuid::Uuid;

use crate::{
	Result,
	models::{
		CandidateRow, CategoryScoreRow, RecommendationRecord, ScoreRow, SignalSets,
		StoredPreferences,
	},
};

pub async fn user_exists(conn: &mut PgConnection, user_id: Uuid) -> Result<bool> {
	let count: i64 = sqlx::query_scalar("SELECT count(*) FROM user_profile WHERE id = $1")
		.bind(user_id)
		.fetch_one(conn)
		.await?;

	Ok(count > 0)
}

/// Returns `None` when the user has never set preferences; callers treat
/// that as "nothing to do", not an error.
pub async fn fetch_preferences(
	conn: &mut PgConnection,
	user_id: Uuid,
) -> Result<Option<StoredPreferences>> {
	let preferences = sqlx::query_as::<_, StoredPreferences>(
		"\
SELECT diets, allergies, cuisines, disliked_ingredients, favorite_dishes
FROM user_preferences
WHERE user_id = $1",
	)
	.bind(user_id)
	.fetch_optional(conn)
	.await?;

	Ok(preferences)
}

pub async fn fetch_signal_sets(conn: &mut PgConnection, user_id: Uuid) -> Result<SignalSets> {
	let liked_menus =
		fetch_id_set(&mut *conn, "SELECT menu_id FROM liked_item WHERE user_id = $1", user_id)
			.await?;
	let disliked_menus =
		fetch_id_set(&mut *conn, "SELECT menu_id FROM disliked_item WHERE user_id = $1", user_id)
			.await?;
	let saved_menus =
		fetch_id_set(&mut *conn, "SELECT menu_id FROM saved_item WHERE user_id = $1", user_id)
			.await?;
	let liked_stalls =
		fetch_id_set(&mut *conn, "SELECT stall_id FROM liked_stall WHERE user_id = $1", user_id)
			.await?;
	let saved_stalls =
		fetch_id_set(&mut *conn, "SELECT stall_id FROM saved_stall WHERE user_id = $1", user_id)
			.await?;

	Ok(SignalSets { liked_menus, disliked_menus, saved_menus, liked_stalls, saved_stalls })
}

/// Every catalog menu item exactly once, mapped to its deduplicated
/// ingredient id list (possibly empty).
pub async fn fetch_candidates(conn: &mut PgConnection) -> Result<HashMap<Uuid, Vec<Uuid>>> {
	let rows = sqlx::query_as::<_, CandidateRow>(
		"\
SELECT m.id AS menu_id, mi.ingredient_id
FROM menu_item m
LEFT JOIN menu_item_ingredient mi ON mi.menu_id = m.id
ORDER BY m.id",
	)
	.fetch_all(conn)
	.await?;
	let mut candidates: HashMap<Uuid, Vec<Uuid>> = HashMap::new();

	for row in rows {
		let ingredients = candidates.entry(row.menu_id).or_default();

		if let Some(ingredient_id) = row.ingredient_id {
			ingredients.push(ingredient_id);
		}
	}

	Ok(candidates)
}

/// Full compatibility score sets for one ingredient: (diet scores,
/// allergen scores), each keyed by category label.
pub async fn fetch_compatibility_scores(
	conn: &mut PgConnection,
	ingredient_id: Uuid,
) -> Result<(HashMap<String, f32>, HashMap<String, f32>)> {
	let diets = sqlx::query_as::<_, CategoryScoreRow>(
		"SELECT diet AS category, score FROM ingredient_diet_score WHERE ingredient_id = $1",
	)
	.bind(ingredient_id)
	.fetch_all(&mut *conn)
	.await?;
	let allergens = sqlx::query_as::<_, CategoryScoreRow>(
		"SELECT allergen AS category, score FROM ingredient_allergen_score WHERE ingredient_id = $1",
	)
	.bind(ingredient_id)
	.fetch_all(&mut *conn)
	.await?;

	Ok((into_score_map(diets), into_score_map(allergens)))
}

/// The item's stored name embedding in pgvector text form, if one was
/// generated at catalog-build time.
pub async fn fetch_menu_item_embedding(
	conn: &mut PgConnection,
	menu_id: Uuid,
) -> Result<Option<String>> {
	let embedding = sqlx::query_scalar(
		"\
SELECT embedding::text
FROM embeddings
WHERE object_id = $1 AND object_type = 'menuitem'",
	)
	.bind(menu_id)
	.fetch_optional(conn)
	.await?;

	Ok(embedding)
}

/// Marks every current recommendation of the user stale. Scoped to one user,
/// so concurrent runs for other users are untouched.
pub async fn mark_scores_stale(tx: &mut Transaction<'_, Postgres>, user_id: Uuid) -> Result<u64> {
	let result =
		sqlx::query("UPDATE menu_item_score SET stale = TRUE WHERE user_id = $1 AND NOT stale")
			.bind(user_id)
			.execute(&mut **tx)
			.await?;

	Ok(result.rows_affected())
}

pub async fn insert_score(
	tx: &mut Transaction<'_, Postgres>,
	record: &RecommendationRecord,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO menu_item_score (user_id, menu_id, score, reasoning)
VALUES ($1, $2, $3, $4)",
	)
	.bind(record.user_id)
	.bind(record.menu_id)
	.bind(record.score)
	.bind(record.reasoning.as_str())
	.execute(&mut **tx)
	.await?;

	Ok(())
}

/// Refreshes the ranked retrieval view. Runs inside the same transaction as
/// the stale/insert steps so readers flip between complete batches only.
pub async fn refresh_ranked_scores(tx: &mut Transaction<'_, Postgres>) -> Result<()> {
	sqlx::query("REFRESH MATERIALIZED VIEW ranked_menu_item_score").execute(&mut **tx).await?;

	Ok(())
}

pub async fn count_current_scores(conn: &mut PgConnection, user_id: Uuid) -> Result<i64> {
	let count: i64 = sqlx::query_scalar(
		"SELECT count(*) FROM menu_item_score WHERE user_id = $1 AND NOT stale",
	)
	.bind(user_id)
	.fetch_one(conn)
	.await?;

	Ok(count)
}

pub async fn fetch_current_score(
	conn: &mut PgConnection,
	user_id: Uuid,
	menu_id: Uuid,
) -> Result<Option<ScoreRow>> {
	let row = sqlx::query_as::<_, ScoreRow>(
		"\
SELECT menu_id, score, reasoning, created_at
FROM menu_item_score
WHERE user_id = $1 AND menu_id = $2 AND NOT stale",
	)
	.bind(user_id)
	.bind(menu_id)
	.fetch_optional(conn)
	.await?;

	Ok(row)
}

async fn fetch_id_set(
	conn: &mut PgConnection,
	sql: &str,
	user_id: Uuid,
) -> Result<HashSet<Uuid>> {
	let ids: Vec<Uuid> = sqlx::query_scalar(sql).bind(user_id).fetch_all(conn).await?;

	Ok(ids.into_iter().collect())
}

fn into_score_map(rows: Vec<CategoryScoreRow>) -> HashMap<String, f32> {
	rows.into_iter().map(|row| (row.category, row.score)).collect()
}
