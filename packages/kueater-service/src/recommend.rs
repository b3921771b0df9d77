use std::collections::HashSet;

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use kueater_domain::{
	CandidateSignals, CompatibilityProfile, KeywordAffinity, ReasonPicker, ScoreRequest,
	score_candidate,
};
use kueater_providers::similarity;
use kueater_storage::{
	models::{RecommendationRecord, StoredPreferences},
	queries,
};

use crate::{AgentService, KeywordTable, RandomPicker, Result, parse_pg_vector};

impl AgentService {
	/// Generates and persists a fresh recommendation batch for one user.
	///
	/// A missing user or a user without stored preferences is an expected
	/// no-op. Everything else runs inside one transaction: stale-mark,
	/// insert the full batch, refresh the ranked view. On any fault the
	/// transaction rolls back and the previous batch stays authoritative.
	pub async fn generate_recommendations(&self, user_id: Uuid) -> Result<()> {
		self.generate_recommendations_with(user_id, &mut RandomPicker).await
	}

	/// Same as [`generate_recommendations`](Self::generate_recommendations)
	/// with an injected reasoning-keyword picker.
	pub async fn generate_recommendations_with(
		&self,
		user_id: Uuid,
		picker: &mut (dyn ReasonPicker + Send),
	) -> Result<()> {
		let mut conn = self.db.pool.acquire().await?;

		if !queries::user_exists(&mut conn, user_id).await? {
			tracing::debug!(%user_id, "User does not exist; skipping recommendations.");

			return Ok(());
		}

		let Some(preferences) = queries::fetch_preferences(&mut conn, user_id).await? else {
			tracing::debug!(%user_id, "User has no preferences set; skipping recommendations.");

			return Ok(());
		};

		drop(conn);

		tracing::info!(%user_id, "Start generating recommendations.");

		let mut tx = self.db.pool.begin().await?;

		queries::mark_scores_stale(&mut tx, user_id).await?;

		let signals = queries::fetch_signal_sets(&mut *tx, user_id).await?;
		// Stall-level likes/saves are loaded with the rest of the signal sets
		// but not yet part of the scoring policy.
		let candidates = queries::fetch_candidates(&mut *tx).await?;
		let mut records = Vec::with_capacity(candidates.len());

		for (menu_id, ingredient_ids) in &candidates {
			let mut profiles = Vec::with_capacity(ingredient_ids.len());

			for ingredient_id in ingredient_ids {
				let (diets, allergens) =
					queries::fetch_compatibility_scores(&mut *tx, *ingredient_id).await?;

				profiles.push(CompatibilityProfile {
					ingredient_id: *ingredient_id,
					diets,
					allergens,
				});
			}

			let affinities = self.keyword_affinities(&mut tx, *menu_id, &preferences).await?;
			let candidate_signals = CandidateSignals {
				liked: signals.liked_menus.contains(menu_id),
				disliked: signals.disliked_menus.contains(menu_id),
				saved: signals.saved_menus.contains(menu_id),
			};
			let request = ScoreRequest {
				concerned_diets: &preferences.diets,
				concerned_allergens: &preferences.allergies,
				profiles: &profiles,
				signals: candidate_signals,
				affinities: &affinities,
			};
			let scored = score_candidate(&request, picker)?;

			tracing::debug!(%user_id, %menu_id, score = scored.score, "Scored candidate.");

			records.push(RecommendationRecord {
				user_id,
				menu_id: *menu_id,
				score: scored.score,
				reasoning: scored.reasoning,
			});
		}

		for record in &records {
			queries::insert_score(&mut tx, record).await?;
		}

		queries::refresh_ranked_scores(&mut tx).await?;

		tx.commit().await?;

		tracing::info!(%user_id, candidates = records.len(), "Completed recommendations generation.");

		Ok(())
	}

	/// Embedding similarity between each matched favorite-dish keyword and
	/// the item's stored name embedding. Keywords outside the vocabulary and
	/// items without a stored embedding contribute nothing.
	async fn keyword_affinities(
		&self,
		tx: &mut Transaction<'_, Postgres>,
		menu_id: Uuid,
		preferences: &StoredPreferences,
	) -> Result<Vec<KeywordAffinity>> {
		if preferences.favorite_dishes.is_empty() || self.keywords.is_empty() {
			return Ok(Vec::new());
		}

		let Some(stored) = queries::fetch_menu_item_embedding(&mut *tx, menu_id).await? else {
			return Ok(Vec::new());
		};
		let item_vector = parse_pg_vector(&stored)?;

		Ok(match_keywords(&self.keywords, &preferences.favorite_dishes, &item_vector))
	}
}

/// Similarity of each distinct favorite-dish keyword against one item vector.
/// The stored array is not guaranteed unique; each keyword earns its bonus at
/// most once.
fn match_keywords(
	keywords: &KeywordTable,
	favorites: &[String],
	item_vector: &[f32],
) -> Vec<KeywordAffinity> {
	let mut affinities = Vec::new();
	let mut seen = HashSet::new();

	for keyword in favorites {
		if !seen.insert(keyword.as_str()) {
			continue;
		}

		let Some(vector) = keywords.get(keyword) else {
			continue;
		};

		affinities.push(KeywordAffinity {
			keyword: keyword.clone(),
			similarity: similarity::cosine_similarity(item_vector, vector),
		});
	}

	affinities
}
