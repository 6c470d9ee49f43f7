//! Parsing raw model output against the fixed three-question template.
//!
//! The grammar is deliberately narrow: exactly three numbered
//! `Question N:` / `Answer N:` block pairs. Any deviation fails the whole
//! batch; there is no partial recovery. The model's own refusal signal
//! (the literal word INVALID) is a distinguished soft outcome, not an
//! error to escalate.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::domain::{ExerciseBatch, ParsedQuestion, BLANK};

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
  /// The model reported it could not satisfy the rules. Retried like any
  /// other soft failure.
  #[error("model refused to generate a batch")]
  Refused,
  #[error("malformed batch: {0}")]
  Malformed(String),
}

/// Strict per-number section check: `Question N:` up to its own `Answer N:`.
static QUESTION_SECTION_RES: Lazy<[Regex; 3]> = Lazy::new(|| {
  [1u8, 2, 3].map(|n| {
    Regex::new(&format!(r"(?is)Question\s*{n}\s*:\s*(.*?)\s*Answer\s*{n}\s*:"))
      .expect("valid question-section regex")
  })
});

/// Permissive combined scan: any numbered pair, answers as a bracketed
/// array or the remainder of the line.
static QA_PAIR_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?is)Question\s*(\d+)\s*:\s*(.*?)\s*Answer\s*(\d+)\s*:\s*(\[[^\]]*\]|[^\n]+)")
    .expect("valid question/answer pair regex")
});

static UNDERSCORE_RUN_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"_{2,}").expect("valid underscore-run regex"));

/// Parse raw model text into a complete batch of exactly three questions.
pub fn parse_batch(raw: &str) -> Result<ExerciseBatch, ParseError> {
  let text = raw.replace("\r\n", "\n").replace('\r', "\n");

  if text.trim().eq_ignore_ascii_case("INVALID") {
    return Err(ParseError::Refused);
  }

  // Every numbered section must exist and must carry at least one
  // underscore before we bother with the finer-grained scan.
  for (i, re) in QUESTION_SECTION_RES.iter().enumerate() {
    let n = i + 1;
    let caps = re
      .captures(&text)
      .ok_or_else(|| ParseError::Malformed(format!("question {n} block missing")))?;
    if !caps[1].contains('_') {
      return Err(ParseError::Malformed(format!("question {n} has no blank marker")));
    }
  }

  let mut by_number: [Option<ParsedQuestion>; 3] = [None, None, None];
  for caps in QA_PAIR_RE.captures_iter(&text) {
    let q_no: usize = match caps[1].parse() {
      Ok(v) => v,
      Err(_) => continue,
    };
    let a_no: usize = match caps[3].parse() {
      Ok(v) => v,
      Err(_) => continue,
    };
    // A question paired with someone else's answer is noise, not data.
    if q_no != a_no || !(1..=3).contains(&q_no) {
      continue;
    }

    let question_text = normalize_blanks(caps[2].trim());
    let blanks = question_text.matches(BLANK).count();
    let answers = parse_answer_list(caps[4].trim());

    if blanks == 0 || answers.len() != blanks {
      continue;
    }

    let slot = &mut by_number[q_no - 1];
    if slot.is_none() {
      *slot = Some(ParsedQuestion { text: question_text, answers });
    }
  }

  match by_number {
    [Some(q1), Some(q2), Some(q3)] => Ok(ExerciseBatch { questions: [q1, q2, q3] }),
    ref partial => {
      let missing: Vec<String> = partial
        .iter()
        .enumerate()
        .filter(|(_, q)| q.is_none())
        .map(|(i, _)| (i + 1).to_string())
        .collect();
      Err(ParseError::Malformed(format!(
        "question(s) {} failed blank/answer alignment",
        missing.join(", ")
      )))
    }
  }
}

/// Collapse any run of 2+ underscores to the canonical three-underscore
/// blank marker.
fn normalize_blanks(text: &str) -> String {
  UNDERSCORE_RUN_RE.replace_all(text, BLANK).into_owned()
}

/// Answers arrive as a JSON array of strings; tolerate a bracketed or bare
/// comma list when strict JSON parsing fails.
fn parse_answer_list(field: &str) -> Vec<String> {
  if let Ok(list) = serde_json::from_str::<Vec<String>>(field) {
    return list;
  }

  let inner = field.trim().trim_start_matches('[').trim_end_matches(']');
  inner
    .split(',')
    .map(|part| part.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
    .filter(|part| !part.is_empty())
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn well_formed() -> String {
    "Question 1:\nThe cat sleeps ___ the sofa.\n\nAnswer 1:\n[\"on\"]\n\n\
     Question 2:\nAre you ___ home right now?\n\nAnswer 2:\n[\"at\"]\n\n\
     Question 3:\nShe walked ___ the park. Then she sat ___ a bench.\n\n\
     Answer 3:\n[\"through\", \"on\"]"
      .to_string()
  }

  #[test]
  fn parses_a_well_formed_batch_in_order() {
    let batch = parse_batch(&well_formed()).expect("parse");
    assert_eq!(batch.questions[0].answers, vec!["on"]);
    assert_eq!(batch.questions[1].answers, vec!["at"]);
    assert_eq!(batch.questions[2].answers, vec!["through", "on"]);
    for q in &batch.questions {
      assert_eq!(q.blank_count(), q.answers.len());
    }
  }

  #[test]
  fn parsing_is_idempotent() {
    let raw = well_formed();
    assert_eq!(parse_batch(&raw), parse_batch(&raw));
  }

  #[test]
  fn invalid_sentinel_is_a_refusal_not_a_malformed_batch() {
    assert_eq!(parse_batch("INVALID"), Err(ParseError::Refused));
    assert_eq!(parse_batch("  invalid \n"), Err(ParseError::Refused));
  }

  #[test]
  fn missing_question_block_fails() {
    let raw = "Question 1:\nShe ___ happy.\n\nAnswer 1:\n[\"is\"]";
    assert!(matches!(parse_batch(raw), Err(ParseError::Malformed(_))));
  }

  #[test]
  fn question_without_any_underscore_fails_early() {
    // spec'd degenerate case: zero blanks with an empty answer list is a
    // rejection, not a trivially aligned accept.
    let raw = "Question 1:\nShe ___ happy.\n\nAnswer 1:\n[\"is\"]\n\n\
               Question 2:\nAre you here?\n\nAnswer 2:\n[]\n\n\
               Question 3:\nHe sat ___ the chair.\n\nAnswer 3:\n[\"on\"]";
    assert!(matches!(parse_batch(raw), Err(ParseError::Malformed(_))));
  }

  #[test]
  fn zero_blank_question_rejected() {
    // A lone underscore survives the coarse check but collapses to zero
    // three-underscore blanks, so alignment still fails.
    let raw = "Question 1:\nShe _ happy.\n\nAnswer 1:\n[]\n\n\
               Question 2:\nAre you ___ home?\n\nAnswer 2:\n[\"at\"]\n\n\
               Question 3:\nHe sat ___ the chair.\n\nAnswer 3:\n[\"on\"]";
    assert!(matches!(parse_batch(raw), Err(ParseError::Malformed(_))));
  }

  #[test]
  fn blank_answer_alignment_is_strict() {
    let raw = "Question 1:\nShe ___ went ___ home.\n\nAnswer 1:\n[\"already\"]\n\n\
               Question 2:\nAre you ___ home?\n\nAnswer 2:\n[\"at\"]\n\n\
               Question 3:\nHe sat ___ the chair.\n\nAnswer 3:\n[\"on\"]";
    assert!(matches!(parse_batch(raw), Err(ParseError::Malformed(_))));
  }

  #[test]
  fn underscore_runs_collapse_to_one_blank() {
    let raw = "Question 1:\nShe __ happy.\n\nAnswer 1:\n[\"is\"]\n\n\
               Question 2:\nAre you _____ home?\n\nAnswer 2:\n[\"at\"]\n\n\
               Question 3:\nHe sat ____ the chair.\n\nAnswer 3:\n[\"on\"]";
    let batch = parse_batch(raw).expect("parse");
    assert_eq!(batch.questions[0].text, "She ___ happy.");
    assert_eq!(batch.questions[1].text, "Are you ___ home?");
    assert_eq!(batch.questions[0].blank_count(), 1);
  }

  #[test]
  fn mismatched_question_answer_numbers_are_discarded() {
    let raw = "Question 1:\nShe ___ happy.\n\nAnswer 2:\n[\"is\"]\n\n\
               Question 2:\nAre you ___ home?\n\nAnswer 2:\n[\"at\"]\n\n\
               Question 3:\nHe sat ___ the chair.\n\nAnswer 3:\n[\"on\"]";
    assert!(matches!(parse_batch(raw), Err(ParseError::Malformed(_))));
  }

  #[test]
  fn bare_comma_list_answers_are_tolerated() {
    let raw = "Question 1:\nShe ___ happy.\n\nAnswer 1:\nis\n\n\
               Question 2:\nAre you ___ home?\n\nAnswer 2:\n\"at\"\n\n\
               Question 3:\nHe walked ___ the park ___ noon.\n\nAnswer 3:\nthrough, at";
    let batch = parse_batch(raw).expect("parse");
    assert_eq!(batch.questions[0].answers, vec!["is"]);
    assert_eq!(batch.questions[1].answers, vec!["at"]);
    assert_eq!(batch.questions[2].answers, vec!["through", "at"]);
  }

  #[test]
  fn empty_string_answer_survives_json_parsing() {
    let raw = "Question 1:\nShe bought ___ apple.\n\nAnswer 1:\n[\"an\"]\n\n\
               Question 2:\nDo you like ___ music?\n\nAnswer 2:\n[\"\"]\n\n\
               Question 3:\nHe is ___ teacher.\n\nAnswer 3:\n[\"a\"]";
    let batch = parse_batch(raw).expect("parse");
    assert_eq!(batch.questions[1].answers, vec![""]);
  }

  #[test]
  fn crlf_line_endings_are_normalized() {
    let raw = well_formed().replace('\n', "\r\n");
    assert!(parse_batch(&raw).is_ok());
  }
}
