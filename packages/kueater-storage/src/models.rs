use std::collections::HashSet;

use time::OffsetDateTime;
use uuid::Uuid;

/// One user's stored preference arrays. Columns default to empty arrays, so
/// every field is present (never null) once the row exists.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredPreferences {
	pub diets: Vec<String>,
	pub allergies: Vec<String>,
	pub cuisines: Vec<String>,
	pub disliked_ingredients: Vec<String>,
	pub favorite_dishes: Vec<String>,
}

/// Explicit like/dislike/save id sets for one user. Stall-level signals are
/// loaded but not yet folded into the score.
#[derive(Debug, Clone, Default)]
pub struct SignalSets {
	pub liked_menus: HashSet<Uuid>,
	pub disliked_menus: HashSet<Uuid>,
	pub saved_menus: HashSet<Uuid>,
	pub liked_stalls: HashSet<Uuid>,
	pub saved_stalls: HashSet<Uuid>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct CandidateRow {
	pub menu_id: Uuid,
	pub ingredient_id: Option<Uuid>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct CategoryScoreRow {
	pub category: String,
	pub score: f32,
}

/// One freshly computed recommendation, persisted as a current (non-stale)
/// `menu_item_score` row.
#[derive(Debug, Clone)]
pub struct RecommendationRecord {
	pub user_id: Uuid,
	pub menu_id: Uuid,
	pub score: f32,
	pub reasoning: String,
}

#[derive(Debug, sqlx::FromRow)]
pub struct ScoreRow {
	pub menu_id: Uuid,
	pub score: f32,
	pub reasoning: String,
	pub created_at: OffsetDateTime,
}
