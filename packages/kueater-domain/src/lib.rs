pub mod scoring;

pub use scoring::{
	AllergenBand, CandidateScore, CandidateSignals, CompatibilityProfile, DietBand, KeywordAffinity,
	ReasonPicker, ScoreFault, ScoreRequest, UNSUITABLE_SCORE, allergen_band, diet_band,
	normalize_keyword_bonus, score_candidate,
};
