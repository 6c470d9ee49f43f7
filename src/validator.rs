//! Category-specific acceptance rules for parsed exercise batches.
//!
//! The batch is judged as a unit: one bad answer anywhere rejects all three
//! questions. Structural alignment is the parser's job; this layer checks
//! the linguistic contract (closed answer vocabularies, token shapes, and
//! natural punctuation placement).

use tracing::debug;

use crate::domain::{CefrLevel, ErrorCategory, ExerciseBatch, LevelTier, ParsedQuestion, BLANK};
use crate::util::alpha_tokens;

/// Closed preposition vocabulary. Answers outside this set reject the batch.
const PREPOSITIONS: &[&str] = &[
  "in", "on", "at", "to", "for", "from", "with", "by", "about", "into", "over", "under",
  "between", "behind", "before", "after", "during", "without", "through", "across", "around",
  "near", "inside", "outside", "above", "below", "in front of", "next to",
];

const ARTICLES: &[&str] = &["a", "an", "the", ""];

const MODALS: &[&str] = &[
  "can", "could", "may", "might", "must", "should", "would", "will", "shall", "have to",
  "has to", "had to", "need to", "needs to", "needed to", "ought to",
];

const AGREEMENT_FORMS: &[&str] = &[
  "is", "are", "was", "were", "am", "be", "do", "does", "has", "have", "this", "that",
  "these", "those", "don't", "doesn't",
];

/// Terminal punctuation for the beginner tier; the extended set adds the
/// clause-internal marks.
const PUNCT_BASIC: &[&str] = &[".", "?", "!"];
const PUNCT_EXTENDED: &[&str] = &[".", ",", "?", "!", ";", ":", "'", "\"", "-"];

/// Accept or reject a parsed batch for the requested category and level.
pub fn validate_batch(batch: &ExerciseBatch, category: ErrorCategory, level: CefrLevel) -> bool {
  for q in &batch.questions {
    if q.blank_count() == 0 {
      debug!(target: "exercise", "rejecting batch: question lost its blank marker");
      return false;
    }
  }

  // Question 2 is the interrogative slot in the standard template; the
  // punctuation category blanks terminal marks instead.
  if category != ErrorCategory::Punctuation
    && !batch.questions[1].text.trim_end().ends_with('?')
  {
    debug!(target: "exercise", "rejecting batch: question 2 is not interrogative");
    return false;
  }

  for q in &batch.questions {
    for ans in &q.answers {
      if !answer_fits_category(ans, category, level) {
        debug!(target: "exercise", category = category.label(), answer = %ans, "rejecting batch: answer outside category contract");
        return false;
      }
    }
  }

  if category == ErrorCategory::Punctuation {
    for q in &batch.questions {
      if !punctuation_placements_look_natural(q, level) {
        debug!(target: "exercise", question = %q.text, "rejecting batch: unnatural punctuation placement");
        return false;
      }
    }
  }

  true
}

fn answer_fits_category(answer: &str, category: ErrorCategory, level: CefrLevel) -> bool {
  let lower = answer.trim().to_lowercase();
  match category {
    ErrorCategory::Preposition => PREPOSITIONS.contains(&lower.as_str()),
    ErrorCategory::Article => ARTICLES.contains(&lower.as_str()),
    ErrorCategory::Punctuation => {
      let allowed = if level.tier() == LevelTier::Beginner { PUNCT_BASIC } else { PUNCT_EXTENDED };
      allowed.contains(&answer)
    }
    ErrorCategory::Spelling | ErrorCategory::WordChoice => {
      matches!(alpha_tokens(answer), Some(t) if t.len() == 1)
    }
    ErrorCategory::Modality => MODALS.contains(&lower.as_str()),
    ErrorCategory::Agreement => AGREEMENT_FORMS.contains(&lower.as_str()),
    ErrorCategory::MissingWord => {
      matches!(alpha_tokens(answer), Some(t) if t.len() <= 2)
        && !matches!(lower.as_str(), "a" | "an" | "the")
        && !PREPOSITIONS.contains(&lower.as_str())
    }
    ErrorCategory::WordOrder => matches!(alpha_tokens(answer), Some(t) if t.len() <= 3),
    ErrorCategory::VerbTense | ErrorCategory::VerbForm => {
      matches!(alpha_tokens(answer), Some(t) if t.len() <= 4)
    }
  }
}

fn is_terminal_mark(s: &str) -> bool {
  matches!(s, "." | "?" | "!")
}

/// Substitute each answer into its blank, left to right, and check the
/// result reads like punctuated prose:
/// (a) a sentence-ending mark is never directly before "or"/"and"/"but",
/// (b) a period is never directly before a lowercase letter,
/// (c) at A1/A2 a placed mark is followed by whitespace or end-of-string,
/// (d) the final text carries no run of 2+ terminal marks.
fn punctuation_placements_look_natural(q: &ParsedQuestion, level: CefrLevel) -> bool {
  let segments: Vec<&str> = q.text.split(BLANK).collect();
  if segments.len() != q.answers.len() + 1 {
    return false;
  }

  let beginner = level.tier() == LevelTier::Beginner;
  let mut rebuilt = String::with_capacity(q.text.len());
  let mut placements: Vec<(usize, &str)> = Vec::with_capacity(q.answers.len());

  for (i, seg) in segments.iter().enumerate() {
    rebuilt.push_str(seg);
    if i < q.answers.len() {
      placements.push((rebuilt.len(), q.answers[i].as_str()));
      rebuilt.push_str(&q.answers[i]);
    }
  }

  for (pos, ans) in placements {
    let after = &rebuilt[pos + ans.len()..];

    if beginner && !(after.is_empty() || after.starts_with(char::is_whitespace)) {
      return false;
    }

    if is_terminal_mark(ans) {
      let next_word: String = after
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
      if matches!(next_word.to_lowercase().as_str(), "or" | "and" | "but") {
        return false;
      }
    }

    if ans == "." {
      if let Some(c) = after.trim_start().chars().next() {
        if c.is_lowercase() {
          return false;
        }
      }
    }
  }

  no_terminal_run(&rebuilt)
}

/// True when the text never places two terminal marks back to back
/// (whitespace between them does not break the run).
fn no_terminal_run(text: &str) -> bool {
  let mut prev_was_terminal = false;
  for ch in text.chars() {
    if ch.is_whitespace() {
      continue;
    }
    let terminal = matches!(ch, '.' | '?' | '!');
    if terminal && prev_was_terminal {
      return false;
    }
    prev_was_terminal = terminal;
  }
  true
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{ExerciseBatch, ParsedQuestion};

  fn q(text: &str, answers: &[&str]) -> ParsedQuestion {
    ParsedQuestion {
      text: text.into(),
      answers: answers.iter().map(|s| s.to_string()).collect(),
    }
  }

  fn batch(q1: ParsedQuestion, q2: ParsedQuestion, q3: ParsedQuestion) -> ExerciseBatch {
    ExerciseBatch { questions: [q1, q2, q3] }
  }

  fn preposition_batch(a1: &str, a2: &str, a3: &str) -> ExerciseBatch {
    batch(
      q("She walked ___ the station.", &[a1]),
      q("Are you waiting ___ the bus?", &[a2]),
      q("He left ___ lunch. He came back later.", &[a3]),
    )
  }

  #[test]
  fn preposition_answers_inside_closed_set_pass() {
    let b = preposition_batch("to", "at", "for");
    assert!(validate_batch(&b, ErrorCategory::Preposition, CefrLevel::B1));
  }

  #[test]
  fn preposition_answers_outside_closed_set_reject_whole_batch() {
    for bad in ["towards", "onto", "besides", "upon", "since", "at the", "IN2"] {
      let b = preposition_batch("to", bad, "for");
      assert!(
        !validate_batch(&b, ErrorCategory::Preposition, CefrLevel::B1),
        "out-of-set answer {bad:?} was accepted"
      );
    }
  }

  #[test]
  fn second_question_must_be_interrogative() {
    let b = batch(
      q("She walked ___ the station.", &["to"]),
      q("You are waiting ___ the bus.", &["at"]),
      q("He left ___ lunch. He came back later.", &["for"]),
    );
    assert!(!validate_batch(&b, ErrorCategory::Preposition, CefrLevel::B1));
  }

  #[test]
  fn article_answers_allow_the_empty_string() {
    let b = batch(
      q("She bought ___ apple.", &["an"]),
      q("Do you like ___ music?", &[""]),
      q("He is ___ teacher. It is ___ good job.", &["a", "a"]),
    );
    assert!(validate_batch(&b, ErrorCategory::Article, CefrLevel::A2));

    let bad = batch(
      q("She bought ___ apple.", &["an"]),
      q("Do you like ___ music?", &["them"]),
      q("He is ___ teacher. It is ___ good job.", &["a", "a"]),
    );
    assert!(!validate_batch(&bad, ErrorCategory::Article, CefrLevel::A2));
  }

  #[test]
  fn beginner_punctuation_accepts_terminal_marks_only() {
    let b = batch(
      q("The dog is very big___", &["."]),
      q("Where is my red ball___", &["?"]),
      q("We won the game___ I am so happy___", &["!", "!"]),
    );
    assert!(validate_batch(&b, ErrorCategory::Punctuation, CefrLevel::A1));

    let semicolon = batch(
      q("The dog is very big___", &[";"]),
      q("Where is my red ball___", &["?"]),
      q("We won the game___ I am happy here___", &["!", "."]),
    );
    assert!(!validate_batch(&semicolon, ErrorCategory::Punctuation, CefrLevel::A1));
  }

  #[test]
  fn extended_punctuation_set_opens_up_past_beginner() {
    let b = batch(
      q("She packed bread___ cheese, and water.", &[","]),
      q("It was late___ everyone had already left.", &[";"]),
      q("He asked one thing___ patience. We agreed.", &[":"]),
    );
    assert!(validate_batch(&b, ErrorCategory::Punctuation, CefrLevel::B2));
  }

  #[test]
  fn terminal_mark_directly_before_conjunction_is_unnatural() {
    // spec'd example: a period placed right before "or" fragments the clause
    let b = batch(
      q("We can go home ___ or stay here.", &["."]),
      q("Where is my red ball___", &["?"]),
      q("We won the game___ That was fun___", &["!", "."]),
    );
    assert!(!validate_batch(&b, ErrorCategory::Punctuation, CefrLevel::A1));
  }

  #[test]
  fn period_before_lowercase_letter_is_unnatural() {
    let b = batch(
      q("She left early___ then we ate dinner.", &["."]),
      q("Where is my red ball___", &["?"]),
      q("We won the game___ That was fun___", &["!", "."]),
    );
    assert!(!validate_batch(&b, ErrorCategory::Punctuation, CefrLevel::B1));
  }

  #[test]
  fn beginner_mark_must_be_followed_by_space_or_end() {
    let b = batch(
      q("He runs___fast every day.", &["."]),
      q("Where is my red ball___", &["?"]),
      q("We won the game___ That was fun___", &["!", "."]),
    );
    assert!(!validate_batch(&b, ErrorCategory::Punctuation, CefrLevel::A2));
  }

  #[test]
  fn stacked_terminal_marks_are_rejected() {
    let b = batch(
      q("She packed bread___ cheese, and water.", &[","]),
      q("It was late___ everyone had already left.", &[";"]),
      q("Stop___! We are not finished yet.", &["!"]),
    );
    assert!(!validate_batch(&b, ErrorCategory::Punctuation, CefrLevel::C1));
  }

  #[test]
  fn modality_uses_the_closed_modal_set() {
    let b = batch(
      q("You ___ wear a helmet.", &["must"]),
      q("___ you open the window, please?", &["Could"]),
      q("She ___ finish today. He said so.", &["has to"]),
    );
    assert!(validate_batch(&b, ErrorCategory::Modality, CefrLevel::B1));

    let bad = batch(
      q("You ___ wear a helmet.", &["must"]),
      q("___ you open the window, please?", &["want to"]),
      q("She ___ finish today. He said so.", &["has to"]),
    );
    assert!(!validate_batch(&bad, ErrorCategory::Modality, CefrLevel::B1));
  }

  #[test]
  fn agreement_accepts_contracted_negatives() {
    let b = batch(
      q("My sister ___ very happy.", &["is"]),
      q("___ they live near you?", &["Do"]),
      q("He ___ like coffee. She ___ mind.", &["doesn't", "doesn't"]),
    );
    assert!(validate_batch(&b, ErrorCategory::Agreement, CefrLevel::A2));

    let bad = batch(
      q("My sister ___ very happy.", &["runs"]),
      q("___ they live near you?", &["Do"]),
      q("He ___ like coffee. She ___ mind.", &["doesn't", "doesn't"]),
    );
    assert!(!validate_batch(&bad, ErrorCategory::Agreement, CefrLevel::A2));
  }

  #[test]
  fn missing_word_rejects_bare_articles_and_prepositions() {
    let good = batch(
      q("We ___ finished our homework.", &["have"]),
      q("___ you coming tonight?", &["Are"]),
      q("They ___ going home. We stayed.", &["are"]),
    );
    assert!(validate_batch(&good, ErrorCategory::MissingWord, CefrLevel::B1));

    for bad in ["the", "an", "on", "next to"] {
      let b = batch(
        q("We ___ finished our homework.", &[bad]),
        q("___ you coming tonight?", &["Are"]),
        q("They ___ going home. We stayed.", &["are"]),
      );
      assert!(
        !validate_batch(&b, ErrorCategory::MissingWord, CefrLevel::B1),
        "missing-word accepted {bad:?}"
      );
    }
  }

  #[test]
  fn word_order_answers_cap_at_three_tokens() {
    let good = batch(
      q("I ___ seen that film.", &["have never"]),
      q("___ you ever been abroad?", &["Have"]),
      q("She ___ early. We left late.", &["always arrives"]),
    );
    assert!(validate_batch(&good, ErrorCategory::WordOrder, CefrLevel::B2));

    let bad = batch(
      q("I ___ seen that film.", &["have not ever once"]),
      q("___ you ever been abroad?", &["Have"]),
      q("She ___ early. We left late.", &["always arrives"]),
    );
    assert!(!validate_batch(&bad, ErrorCategory::WordOrder, CefrLevel::B2));
  }

  #[test]
  fn verb_answers_reject_digits_and_punctuation() {
    let good = batch(
      q("Yesterday she ___ to the market.", &["went"]),
      q("___ he been waiting long?", &["Has"]),
      q("They ___ dinner. Then they slept.", &["had been eating"]),
    );
    assert!(validate_batch(&good, ErrorCategory::VerbTense, CefrLevel::B2));

    for bad in ["went2", "...", "had been eating there often"] {
      let b = batch(
        q("Yesterday she ___ to the market.", &[bad]),
        q("___ he been waiting long?", &["Has"]),
        q("They ___ dinner. Then they slept.", &["ate"]),
      );
      assert!(
        !validate_batch(&b, ErrorCategory::VerbTense, CefrLevel::B2),
        "verb-tense accepted {bad:?}"
      );
    }
  }

  #[test]
  fn spelling_requires_a_single_word() {
    let good = batch(
      q("We study the ___ of Rome.", &["history"]),
      q("Is that word spelled ___?", &["correctly"]),
      q("Her ___ is neat. Mine isn't.", &["handwriting"]),
    );
    assert!(validate_batch(&good, ErrorCategory::Spelling, CefrLevel::B1));

    let bad = batch(
      q("We study the ___ of Rome.", &["ancient history"]),
      q("Is that word spelled ___?", &["correctly"]),
      q("Her ___ is neat. Mine isn't.", &["handwriting"]),
    );
    assert!(!validate_batch(&bad, ErrorCategory::Spelling, CefrLevel::B1));
  }

  #[test]
  fn question_without_blank_marker_rejects() {
    let b = batch(
      q("She walked to the station.", &[]),
      q("Are you waiting ___ the bus?", &["at"]),
      q("He left ___ lunch. He came back.", &["for"]),
    );
    assert!(!validate_batch(&b, ErrorCategory::Preposition, CefrLevel::B1));
  }
}
