//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{CefrLevel, ErrorCategory, GeneratedExercises};

#[derive(Debug, Deserialize)]
pub struct GenerateIn {
    pub category: ErrorCategory,
    #[serde(rename = "firstLanguage")]
    pub first_language: String,
    pub age: u8,
    pub level: CefrLevel,
}

#[derive(Serialize)]
pub struct QuestionOut {
    pub text: String,
    pub answers: Vec<String>,
}

/// Either exactly three questions, or an empty list meaning "could not
/// generate this time, try again later".
#[derive(Serialize)]
pub struct GenerateOut {
    pub questions: Vec<QuestionOut>,
    #[serde(rename = "modelUsed")]
    pub model_used: String,
}

/// Convert the orchestrator outcome to the public DTO.
pub fn to_generate_out(result: Option<GeneratedExercises>) -> GenerateOut {
    match result {
        Some(g) => GenerateOut {
            questions: g
                .batch
                .questions
                .iter()
                .map(|q| QuestionOut { text: q.text.clone(), answers: q.answers.clone() })
                .collect(),
            model_used: g.model_used,
        },
        None => GenerateOut { questions: vec![], model_used: String::new() },
    }
}

#[derive(Debug, Deserialize)]
pub struct CorrectIn {
    #[serde(rename = "studentInput")]
    pub student_input: String,
    #[serde(default)]
    pub prompt: String,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
