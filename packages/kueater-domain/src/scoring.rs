//! Fixed scoring policy for menu item recommendations.
//!
//! The policy is an ordered rule list: diet compatibility, allergen
//! compatibility, explicit dislike, keyword affinity, explicit like/save.
//! Diet and allergen rules classify per-pair scores into bands through the
//! decision tables below; the "incompatible"/"contains" bands force the
//! score to [`UNSUITABLE_SCORE`], which is terminal and idempotent. Later
//! penalties and bonuses are still accumulated and then discarded once the
//! floor has triggered; skipping them would make no observable difference.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal score for items the user must not be recommended.
pub const UNSUITABLE_SCORE: f32 = -999.0;

const DIET_INCOMPATIBLE_MAX: f32 = 0.4;
const DIET_MAYBE_MAX: f32 = 0.7;
const ALLERGEN_CONTAINS_MIN: f32 = 0.7;
const ALLERGEN_TRACE_MIN: f32 = 0.5;
const BAND_PENALTY: f32 = 20.0;
const DISLIKED_PENALTY: f32 = 10.0;
const LIKED_BONUS: f32 = 10.0;
const SAVED_BONUS: f32 = 5.0;
const KEYWORD_BONUS_CAP: f32 = 15.0;
const KEYWORD_REFERENCE_SIMILARITY: f32 = 0.9;
const KEYWORD_REASON_MIN: f32 = 8.0;
const GOOD_REASON_MIN: f32 = 10.0;

/// Offline-produced compatibility scores for one ingredient, keyed by diet
/// and allergen labels. The offline index covers every (ingredient, label)
/// pair; a missing entry for a concerned label is a data-integrity fault.
#[derive(Clone, Debug, Default)]
pub struct CompatibilityProfile {
	pub ingredient_id: Uuid,
	pub diets: HashMap<String, f32>,
	pub allergens: HashMap<String, f32>,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DietBand {
	Incompatible,
	Maybe,
	Suitable,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AllergenBand {
	Contains,
	Trace,
	Clear,
}

/// Explicit per-item signals from the user's like/dislike/save sets.
#[derive(Clone, Copy, Debug, Default)]
pub struct CandidateSignals {
	pub liked: bool,
	pub disliked: bool,
	pub saved: bool,
}

/// Raw embedding similarity between one of the user's favorite-dish keywords
/// and the candidate's stored name embedding.
#[derive(Clone, Debug)]
pub struct KeywordAffinity {
	pub keyword: String,
	pub similarity: f32,
}

/// Chooses which qualifying keyword is surfaced in the reasoning text.
/// Production uses a random pick for display variety; tests inject a
/// deterministic one.
pub trait ReasonPicker {
	fn pick(&mut self, keywords: &[&str]) -> usize;
}

#[derive(Debug)]
pub struct ScoreRequest<'a> {
	pub concerned_diets: &'a [String],
	pub concerned_allergens: &'a [String],
	pub profiles: &'a [CompatibilityProfile],
	pub signals: CandidateSignals,
	pub affinities: &'a [KeywordAffinity],
}

#[derive(Clone, Debug, PartialEq)]
pub struct CandidateScore {
	pub score: f32,
	pub reasoning: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ScoreFault {
	#[error("Ingredient {ingredient_id} has no diet score for {diet:?}.")]
	MissingDietScore { ingredient_id: Uuid, diet: String },
	#[error("Ingredient {ingredient_id} has no allergen score for {allergen:?}.")]
	MissingAllergenScore { ingredient_id: Uuid, allergen: String },
}

#[derive(Debug, Default)]
struct DietAssessment {
	incompatible: BTreeSet<String>,
	maybe: BTreeSet<String>,
	min_score: f32,
}

#[derive(Debug, Default)]
struct AllergenAssessment {
	contains: BTreeSet<String>,
	trace: BTreeSet<String>,
	max_score: f32,
}

pub fn diet_band(score: f32) -> DietBand {
	if score <= DIET_INCOMPATIBLE_MAX {
		DietBand::Incompatible
	} else if score <= DIET_MAYBE_MAX {
		DietBand::Maybe
	} else {
		DietBand::Suitable
	}
}

pub fn allergen_band(score: f32) -> AllergenBand {
	if score >= ALLERGEN_CONTAINS_MIN {
		AllergenBand::Contains
	} else if score >= ALLERGEN_TRACE_MIN {
		AllergenBand::Trace
	} else {
		AllergenBand::Clear
	}
}

/// Linear rescale mapping a raw similarity of 0.9 to the bonus cap of 15,
/// clamped above the cap.
pub fn normalize_keyword_bonus(similarity: f32) -> f32 {
	(similarity * (KEYWORD_BONUS_CAP / KEYWORD_REFERENCE_SIMILARITY)).min(KEYWORD_BONUS_CAP)
}

/// Scores one candidate menu item. Deterministic in everything except the
/// reasoning keyword pick, which goes through `picker`.
pub fn score_candidate(
	req: &ScoreRequest<'_>,
	picker: &mut dyn ReasonPicker,
) -> Result<CandidateScore, ScoreFault> {
	let mut acc = 0.0_f32;
	let mut floored = false;
	let mut warn_reasons: Vec<String> = Vec::new();
	let mut good_reasons: Vec<String> = Vec::new();

	// Rule 1: diet compatibility. Vacuous without concerns or ingredients.
	if !req.concerned_diets.is_empty() && !req.profiles.is_empty() {
		let assessment = assess_diets(req.concerned_diets, req.profiles)?;

		// The incompatible/maybe sets are reported even when the floor
		// already applies, so the stored reasoning stays informative.
		if !assessment.incompatible.is_empty() {
			warn_reasons.push(format!(
				"Not compatible with your diet: {}",
				join_labels(&assessment.incompatible)
			));
		} else if !assessment.maybe.is_empty() {
			warn_reasons.push(format!(
				"Maybe compatible with your diet: {}",
				join_labels(&assessment.maybe)
			));
		}

		match diet_band(assessment.min_score) {
			DietBand::Incompatible => floored = true,
			DietBand::Maybe => acc -= BAND_PENALTY * assessment.maybe.len() as f32,
			DietBand::Suitable => {},
		}
	}

	// Rule 2: allergen presence. Tracks the maximum rather than the minimum.
	if !req.concerned_allergens.is_empty() && !req.profiles.is_empty() {
		let assessment = assess_allergens(req.concerned_allergens, req.profiles)?;

		if !assessment.contains.is_empty() {
			warn_reasons
				.push(format!("Contains allergen: {}", join_labels(&assessment.contains)));
		} else if !assessment.trace.is_empty() {
			warn_reasons
				.push(format!("May contain traces of: {}", join_labels(&assessment.trace)));
		}

		match allergen_band(assessment.max_score) {
			AllergenBand::Contains => floored = true,
			AllergenBand::Trace => acc -= BAND_PENALTY * assessment.trace.len() as f32,
			AllergenBand::Clear => {},
		}
	}

	// Rule 3: explicit dislike.
	if req.signals.disliked {
		acc -= DISLIKED_PENALTY;

		warn_reasons.push("You disliked this dish.".to_string());
	}

	// Rule 4: keyword affinity bonuses.
	let mut qualifying: Vec<&str> = Vec::new();

	for affinity in req.affinities {
		let bonus = normalize_keyword_bonus(affinity.similarity);

		acc += bonus;

		if bonus >= KEYWORD_REASON_MIN {
			qualifying.push(affinity.keyword.as_str());
		}
	}

	if !qualifying.is_empty() {
		let index = picker.pick(&qualifying).min(qualifying.len() - 1);

		good_reasons.push(format!("Because you like {}", qualifying[index]));
	}

	// Rule 5: explicit like and save, applied independently.
	if req.signals.liked {
		acc += LIKED_BONUS;
	}
	if req.signals.saved {
		acc += SAVED_BONUS;
	}

	let score = if floored { UNSUITABLE_SCORE } else { acc };
	let reasons = if score >= GOOD_REASON_MIN { &good_reasons } else { &warn_reasons };

	Ok(CandidateScore { score, reasoning: reasons.join("\n") })
}

fn assess_diets(
	concerned: &[String],
	profiles: &[CompatibilityProfile],
) -> Result<DietAssessment, ScoreFault> {
	let mut assessment = DietAssessment { min_score: 1.0, ..Default::default() };

	for diet in concerned {
		for profile in profiles {
			let score = *profile.diets.get(diet).ok_or_else(|| ScoreFault::MissingDietScore {
				ingredient_id: profile.ingredient_id,
				diet: diet.clone(),
			})?;

			match diet_band(score) {
				DietBand::Incompatible => {
					assessment.incompatible.insert(diet.clone());
				},
				DietBand::Maybe => {
					assessment.maybe.insert(diet.clone());
				},
				DietBand::Suitable => {},
			}

			if score < assessment.min_score {
				assessment.min_score = score;
			}
		}
	}

	Ok(assessment)
}

fn assess_allergens(
	concerned: &[String],
	profiles: &[CompatibilityProfile],
) -> Result<AllergenAssessment, ScoreFault> {
	let mut assessment = AllergenAssessment { max_score: 0.0, ..Default::default() };

	for allergen in concerned {
		for profile in profiles {
			let score = *profile.allergens.get(allergen).ok_or_else(|| {
				ScoreFault::MissingAllergenScore {
					ingredient_id: profile.ingredient_id,
					allergen: allergen.clone(),
				}
			})?;

			match allergen_band(score) {
				AllergenBand::Contains => {
					assessment.contains.insert(allergen.clone());
				},
				AllergenBand::Trace => {
					assessment.trace.insert(allergen.clone());
				},
				AllergenBand::Clear => {},
			}

			if score > assessment.max_score {
				assessment.max_score = score;
			}
		}
	}

	Ok(assessment)
}

fn join_labels(labels: &BTreeSet<String>) -> String {
	labels.iter().cloned().collect::<Vec<_>>().join(", ")
}
