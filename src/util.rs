//! Small utility helpers used across modules.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Fresh opaque randomization token. The orchestrator rerolls this between
/// attempts so a failed generation is never replayed verbatim.
pub fn fresh_seed_token() -> String {
  rand::thread_rng()
    .sample_iter(&Alphanumeric)
    .take(12)
    .map(char::from)
    .collect()
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    s.to_string()
  } else {
    let mut end = max;
    while !s.is_char_boundary(end) {
      end -= 1;
    }
    format!("{}… ({} bytes total)", &s[..end], s.len())
  }
}

/// Split a candidate answer into alphabetic tokens. Tokens may carry one
/// internal apostrophe or hyphen ("don't", "well-known"); anything else
/// disqualifies the whole answer.
pub fn alpha_tokens(s: &str) -> Option<Vec<&str>> {
  let tokens: Vec<&str> = s.split_whitespace().collect();
  if tokens.is_empty() {
    return None;
  }
  for t in &tokens {
    if !is_alpha_token(t) {
      return None;
    }
  }
  Some(tokens)
}

fn is_alpha_token(t: &str) -> bool {
  let mut seen_sep = false;
  let mut prev_alpha = false;
  for (i, ch) in t.chars().enumerate() {
    if ch.is_ascii_alphabetic() {
      prev_alpha = true;
    } else if (ch == '\'' || ch == '-') && prev_alpha && i < t.len() - 1 && !seen_sep {
      seen_sep = true;
      prev_alpha = false;
    } else {
      return false;
    }
  }
  prev_alpha
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn seed_tokens_are_distinct_and_sized() {
    let a = fresh_seed_token();
    let b = fresh_seed_token();
    assert_eq!(a.len(), 12);
    assert_ne!(a, b);
  }

  #[test]
  fn alpha_tokens_accepts_internal_separators() {
    assert_eq!(alpha_tokens("don't"), Some(vec!["don't"]));
    assert_eq!(alpha_tokens("next to"), Some(vec!["next", "to"]));
    assert!(alpha_tokens("well-known phrase").is_some());
  }

  #[test]
  fn alpha_tokens_rejects_digits_and_danglers() {
    assert_eq!(alpha_tokens("3rd"), None);
    assert_eq!(alpha_tokens("trailing-"), None);
    assert_eq!(alpha_tokens("'lead"), None);
    assert_eq!(alpha_tokens(""), None);
    assert_eq!(alpha_tokens("..."), None);
  }

  #[test]
  fn trunc_for_log_keeps_short_strings() {
    assert_eq!(trunc_for_log("short", 64), "short");
    assert!(trunc_for_log(&"x".repeat(100), 10).contains("100 bytes total"));
  }
}
