//! Prompt composition for the exercise generator.
//!
//! Flow:
//! 1) The request's seed drives a deterministic topic selection from
//!    level-tier pools, with age-based topic exclusion applied first.
//! 2) Level and age map to sentence-shape and content-policy instructions.
//! 3) The requested error category contributes its constraint rule plus one
//!    worked example.
//! 4) Everything is assembled into a single instruction document ending in
//!    the fixed Question/Answer output template.
//!
//! `compose` is a pure function: identical requests produce identical
//! prompts. All randomness flows through the seed.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::domain::{CefrLevel, ErrorCategory, GenerationRequest, LevelTier};

const TOPICS_BEGINNER: &[&str] = &[
  "family and pets",
  "food and meals",
  "school days",
  "the weather",
  "sports and games",
  "colors and clothes",
  "birthday parties",
  "animals at the zoo",
  "friends and neighbors",
  "toys and games",
  "a day at the park",
  "shopping for groceries",
  "my house and garden",
  "riding the bus",
  "holidays at the beach",
  "music and dancing",
];

const TOPICS_INTERMEDIATE: &[&str] = &[
  "planning a trip abroad",
  "hobbies and free time",
  "films and television",
  "technology in daily life",
  "cooking a new recipe",
  "part-time jobs",
  "health and exercise",
  "protecting the environment",
  "learning a new skill",
  "city life and transport",
  "sports competitions",
  "social media habits",
  "volunteering in the community",
  "a school exchange programme",
  "keeping a pet",
  "weekend plans with friends",
];

const TOPICS_ADVANCED: &[&str] = &[
  "negotiating a job offer",
  "renting an apartment and the lease terms",
  "a dispute over an insurance claim",
  "debating government policy",
  "signing a business contract",
  "workplace ethics",
  "the economics of global trade",
  "climate policy and regulation",
  "academic research and publishing",
  "the influence of the media",
  "urban planning decisions",
  "courtroom testimony",
  "investing and personal finance",
  "scientific breakthroughs",
  "cultural traditions in a changing world",
  "the philosophy of happiness",
];

/// Formal legal/policy content: excluded for every learner under 18.
const FORMAL_LEGAL_POLICY_TOPICS: &[&str] = &[
  "renting an apartment and the lease terms",
  "a dispute over an insurance claim",
  "debating government policy",
  "signing a business contract",
  "courtroom testimony",
  "climate policy and regulation",
];

/// Broader legal/contract/policy themes: additionally excluded at age 12
/// and under.
const CONTRACT_POLICY_TOPICS: &[&str] = &[
  "negotiating a job offer",
  "workplace ethics",
  "the economics of global trade",
  "urban planning decisions",
  "investing and personal finance",
];

const GENERATOR_PREAMBLE: &str = "\
You are an English exercise generator for language learners.
You create fill-in-the-blank questions that target one specific kind of
learner error. Follow every rule below exactly. Output nothing except the
template at the end (or the single word INVALID).";

/// Build the full instruction document for one generation attempt.
pub fn compose(req: &GenerationRequest) -> String {
  let topics = select_topics(req.level.tier(), req.age, &req.seed);
  let (words, grammar) = sentence_shape(req.level);

  let mut doc = String::with_capacity(2048);
  doc.push_str(GENERATOR_PREAMBLE);
  doc.push_str("\n\n");

  doc.push_str(&format!(
    "Randomization seed: {}\n\
     Use this seed to vary the names, places, and situations you invent \
     between runs. Never print the seed itself.\n\n",
    req.seed
  ));

  doc.push_str(&format!(
    "Learner profile: {} years old ({}), proficiency level {}.\n",
    req.age,
    age_bracket(req.age),
    req.level.label()
  ));
  doc.push_str(&format!(
    "The learner's first language is {}. Use it only to anticipate typical \
     difficulties; never mention it in the questions and never translate.\n\n",
    req.first_language
  ));

  doc.push_str(&format!(
    "Sentence shape for level {}: each sentence is {} words long. \
     Grammar: {}.\n",
    req.level.label(),
    words,
    grammar
  ));
  doc.push_str(age_policy_line(req.age));
  doc.push_str("\n\n");

  doc.push_str(&format!(
    "Topic for Question 1: {}.\nTopic for Question 2: {}.\nTopic for Question 3: {}.\n\n",
    topics[0], topics[1], topics[2]
  ));

  doc.push_str(structure_rule(req.category, req.level));
  doc.push_str("\n\n");

  doc.push_str(
    "Every question must contain at least one blank written exactly as ___ \
     (three underscores), with 1 or 2 blanks per question. If you cannot \
     satisfy every rule above, reply with the single word INVALID and \
     nothing else.\n\
     After each question, give its answers as a JSON array of strings, one \
     entry per blank, in left-to-right order.\n\n",
  );

  doc.push_str(&category_rule(req.category, req.level));
  doc.push_str("\n\n");

  doc.push_str(
    "Use exactly this output format, in this order:\n\n\
     Question 1:\n<question text>\n\nAnswer 1:\n[\"...\"]\n\n\
     Question 2:\n<question text>\n\nAnswer 2:\n[\"...\"]\n\n\
     Question 3:\n<question text>\n\nAnswer 3:\n[\"...\"]",
  );

  doc
}

/// Pick three distinct topics for the request, deterministically from the
/// seed. Age filtering happens before the shuffle; if it starves the pool,
/// we fall back to the (always age-safe) beginner pool.
pub fn select_topics(tier: LevelTier, age: u8, seed: &str) -> [String; 3] {
  let pool = match tier {
    LevelTier::Beginner => TOPICS_BEGINNER,
    LevelTier::Intermediate => TOPICS_INTERMEDIATE,
    LevelTier::Advanced => TOPICS_ADVANCED,
  };
  select_topics_from(pool, age, seed)
}

fn select_topics_from(pool: &[&str], age: u8, seed: &str) -> [String; 3] {
  let mut candidates: Vec<&str> =
    pool.iter().copied().filter(|t| topic_allowed(t, age)).collect();
  if candidates.len() < 3 {
    candidates = TOPICS_BEGINNER.iter().copied().filter(|t| topic_allowed(t, age)).collect();
  }

  let mut rng = StdRng::seed_from_u64(hash_seed(seed));
  candidates.shuffle(&mut rng);

  let mut picked: Vec<String> = Vec::with_capacity(3);
  for t in candidates {
    let t = t.to_string();
    if !picked.contains(&t) {
      picked.push(t);
    }
    if picked.len() == 3 {
      break;
    }
  }
  // Beginner pool always holds more than 3 age-safe entries.
  [picked[0].clone(), picked[1].clone(), picked[2].clone()]
}

fn topic_allowed(topic: &str, age: u8) -> bool {
  if age <= 12 {
    !FORMAL_LEGAL_POLICY_TOPICS.contains(&topic) && !CONTRACT_POLICY_TOPICS.contains(&topic)
  } else if age <= 17 {
    !FORMAL_LEGAL_POLICY_TOPICS.contains(&topic)
  } else {
    true
  }
}

fn hash_seed(seed: &str) -> u64 {
  let mut h = DefaultHasher::new();
  seed.hash(&mut h);
  h.finish()
}

fn age_bracket(age: u8) -> &'static str {
  if age <= 12 {
    "a child"
  } else if age <= 17 {
    "a teenager"
  } else {
    "an adult"
  }
}

fn age_policy_line(age: u8) -> &'static str {
  if age <= 12 {
    "Content policy: the learner is a child. Keep every situation playful \
     and concrete; no legal, contract, or policy themes of any kind."
  } else if age <= 17 {
    "Content policy: the learner is a teenager. Everyday and school-life \
     situations are fine; avoid formal legal or policy content."
  } else {
    "Content policy: the learner is an adult. Full adult-context topics \
     (work, contracts, policy) are allowed."
  }
}

fn sentence_shape(level: CefrLevel) -> (&'static str, &'static str) {
  match level {
    CefrLevel::A1 => ("5 to 8", "simple present tense and basic everyday vocabulary only"),
    CefrLevel::A2 => ("6 to 10", "simple present and past, common everyday vocabulary"),
    CefrLevel::B1 => ("8 to 12", "one subordinate clause and common connectors are allowed"),
    CefrLevel::B2 => ("10 to 15", "varied tenses, comparatives, and relative clauses are allowed"),
    CefrLevel::C1 => (
      "12 to 18",
      "complex clause structures, passive voice, and less common vocabulary",
    ),
    CefrLevel::C2 => ("14 to 22", "nuanced, idiomatic, near-native structures"),
  }
}

/// Structural template. The punctuation category at A1/A2 uses a variant
/// where the blanks sit on terminal punctuation.
fn structure_rule(category: ErrorCategory, level: CefrLevel) -> &'static str {
  if category == ErrorCategory::Punctuation && level.tier() == LevelTier::Beginner {
    "Structure: every question is one or two short sentences, and each blank \
     replaces the terminal punctuation mark of a sentence."
  } else {
    "Structure: Question 1 is a single statement sentence. Question 2 is a \
     single question ending in '?'. Question 3 is exactly two sentences."
  }
}

fn category_rule(category: ErrorCategory, level: CefrLevel) -> String {
  match category {
    ErrorCategory::Preposition => "\
Category rule: every blank hides a preposition. Answers must come from this \
set only: in, on, at, to, for, from, with, by, about, into, over, under, \
between, behind, before, after, during, without, through, across, around, \
near, inside, outside, above, below, in front of, next to.\n\
Example:\nQuestion 1:\nThe cat sleeps ___ the sofa.\n\nAnswer 1:\n[\"on\"]"
      .into(),
    ErrorCategory::Article => "\
Category rule: every blank hides an article. Answers must be exactly one of \
\"a\", \"an\", \"the\", or \"\" (empty string when no article belongs there).\n\
Example:\nQuestion 1:\nShe bought ___ apple at the market.\n\nAnswer 1:\n[\"an\"]"
      .into(),
    ErrorCategory::Punctuation => {
      if level.tier() == LevelTier::Beginner {
        "\
Category rule: every blank hides a terminal punctuation mark. Answers must \
be exactly one of \".\", \"?\", or \"!\". Place each blank where a sentence \
naturally ends.\n\
Example:\nQuestion 1:\nThe dog is very big___\n\nAnswer 1:\n[\".\"]"
          .into()
      } else {
        "\
Category rule: every blank hides a punctuation mark. Answers must be exactly \
one of \".\", \",\", \"?\", \"!\", \";\", \":\", \"'\", \"\\\"\", or \"-\". \
Place each blank where that mark naturally belongs; never split a clause \
with a sentence-ending mark.\n\
Example:\nQuestion 1:\nShe packed bread___ cheese, and two bottles of water.\n\nAnswer 1:\n[\",\"]"
          .into()
      }
    }
    ErrorCategory::Spelling => "\
Category rule: every blank hides a single word that learners often misspell. \
Each answer is one word, letters only (one internal apostrophe or hyphen is \
allowed).\n\
Example:\nQuestion 1:\nWe are learning about the ___ of the Roman empire.\n\nAnswer 1:\n[\"history\"]"
      .into(),
    ErrorCategory::VerbTense => "\
Category rule: every blank hides a verb whose tense the learner must choose. \
Each answer is the correctly tensed verb (1 to 4 words, no digits).\n\
Example:\nQuestion 1:\nYesterday she ___ to the market with her brother.\n\nAnswer 1:\n[\"went\"]"
      .into(),
    ErrorCategory::VerbForm => "\
Category rule: every blank hides a verb in the form the surrounding grammar \
requires (infinitive, -ing, participle). Each answer is that verb form (1 to \
4 words, no digits).\n\
Example:\nQuestion 1:\nHe really enjoys ___ football after school.\n\nAnswer 1:\n[\"playing\"]"
      .into(),
    ErrorCategory::Agreement => "\
Category rule: every blank hides a word that must agree with its subject. \
Answers must be one of: is, are, was, were, am, be, do, does, has, have, \
this, that, these, those, don't, doesn't.\n\
Example:\nQuestion 1:\nMy sister ___ very happy today.\n\nAnswer 1:\n[\"is\"]"
      .into(),
    ErrorCategory::WordChoice => "\
Category rule: every blank hides a word where learners often pick a similar \
but wrong word. Each answer is one word, letters only (one internal \
apostrophe or hyphen is allowed).\n\
Example:\nQuestion 1:\nPlease ___ the window, it is cold in here.\n\nAnswer 1:\n[\"close\"]"
      .into(),
    ErrorCategory::WordOrder => "\
Category rule: every blank hides a short phrase whose position in the \
sentence learners often get wrong. Each answer is 1 to 3 words, letters \
only.\n\
Example:\nQuestion 1:\nI ___ seen that film before.\n\nAnswer 1:\n[\"have never\"]"
      .into(),
    ErrorCategory::MissingWord => "\
Category rule: every blank hides a word learners tend to leave out. Each \
answer is 1 or 2 words, letters only, and must not be a bare article or a \
preposition.\n\
Example:\nQuestion 1:\nWe ___ finished our homework already.\n\nAnswer 1:\n[\"have\"]"
      .into(),
    ErrorCategory::Modality => "\
Category rule: every blank hides a modal or semi-modal verb. Answers must \
come from this set only: can, could, may, might, must, should, would, will, \
shall, have to, has to, had to, need to, needs to, needed to, ought to.\n\
Example:\nQuestion 1:\nYou ___ wear a helmet when you ride a bike.\n\nAnswer 1:\n[\"must\"]"
      .into(),
  }
}
