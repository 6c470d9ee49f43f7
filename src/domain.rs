//! Domain models for exercise generation: error categories, CEFR levels,
//! generation requests, and parsed exercise batches.

use serde::{Deserialize, Serialize};

/// The linguistic error type an exercise batch targets. Closed set: the
/// validator matches exhaustively on this, so an unrecognized category
/// cannot slip through as a silent accept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
  Preposition,
  Article,
  Punctuation,
  Spelling,
  VerbTense,
  VerbForm,
  Agreement,
  WordChoice,
  WordOrder,
  MissingWord,
  Modality,
}

impl ErrorCategory {
  /// Wire/log name, matching the serde rename.
  pub fn label(&self) -> &'static str {
    match self {
      ErrorCategory::Preposition => "preposition",
      ErrorCategory::Article => "article",
      ErrorCategory::Punctuation => "punctuation",
      ErrorCategory::Spelling => "spelling",
      ErrorCategory::VerbTense => "verb-tense",
      ErrorCategory::VerbForm => "verb-form",
      ErrorCategory::Agreement => "agreement",
      ErrorCategory::WordChoice => "word-choice",
      ErrorCategory::WordOrder => "word-order",
      ErrorCategory::MissingWord => "missing-word",
      ErrorCategory::Modality => "modality",
    }
  }
}

/// CEFR proficiency level of the learner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CefrLevel {
  A1,
  A2,
  B1,
  B2,
  C1,
  C2,
}

/// Topic pools and template variants are keyed by coarse tier, not by the
/// individual level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelTier {
  Beginner,     // A1, A2
  Intermediate, // B1, B2
  Advanced,     // C1, C2
}

impl CefrLevel {
  pub fn tier(&self) -> LevelTier {
    match self {
      CefrLevel::A1 | CefrLevel::A2 => LevelTier::Beginner,
      CefrLevel::B1 | CefrLevel::B2 => LevelTier::Intermediate,
      CefrLevel::C1 | CefrLevel::C2 => LevelTier::Advanced,
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      CefrLevel::A1 => "A1",
      CefrLevel::A2 => "A2",
      CefrLevel::B1 => "B1",
      CefrLevel::B2 => "B2",
      CefrLevel::C1 => "C1",
      CefrLevel::C2 => "C2",
    }
  }
}

/// One generation attempt's input. The orchestrator replaces `seed` with a
/// fresh random token between attempts; every other field stays fixed for
/// the lifetime of the request.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
  pub category: ErrorCategory,
  pub first_language: String,
  pub age: u8,
  pub level: CefrLevel,
  pub seed: String,
}

/// Literal marker a learner fills in. Runs of 2+ underscores in model output
/// are collapsed to exactly this token before blanks are counted.
pub const BLANK: &str = "___";

/// A single parsed fill-in-the-blank question. Invariant (enforced by the
/// parser, re-checked by the validator): `answers.len()` equals the number
/// of `___` markers in `text`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuestion {
  pub text: String,
  pub answers: Vec<String>,
}

impl ParsedQuestion {
  pub fn blank_count(&self) -> usize {
    self.text.matches(BLANK).count()
  }
}

/// Exactly three questions, index-aligned to question numbers 1-3 as emitted
/// by the model. Never partially filled: parse failure discards the lot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExerciseBatch {
  pub questions: [ParsedQuestion; 3],
}

/// Raw gateway output: whatever text the winning model produced, plus which
/// model that was.
#[derive(Clone, Debug)]
pub struct RawModelResponse {
  pub text: String,
  pub model_used: String,
}

/// Successful orchestrator outcome.
#[derive(Clone, Debug, Serialize)]
pub struct GeneratedExercises {
  pub batch: ExerciseBatch,
  pub model_used: String,
}
