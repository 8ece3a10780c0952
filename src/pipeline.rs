use std::collections::BTreeMap;

use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

use crate::db::{self, ReviewRow};
use crate::extract::RawReview;
use crate::normalize;

/// Rating categories with a dedicated column, in schema order.
const GRADE_LABELS: [&str; 4] = [
    "Custo beneficio",
    "Facilidade de uso",
    "Funcionalidades",
    "Suporte ao cliente",
];

/// Question strings with a dedicated column. Keys are the literal text the
/// site renders.
const QUESTION_PREFERENCES: &str = "O que você mais gosta?";
const QUESTION_IMPROVEMENTS: &str =
    "O que você não gosta, ou acha que poderia melhorar ainda mais neste produto?";
const QUESTION_PROBLEMS: &str =
    "Quais são os problemas que você resolveu com astrea? e quais benefícios você obteve?";

/// Grade/answer keys with no dedicated column, parked as a JSON blob.
#[derive(Serialize)]
struct Extras<'a> {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    grades: BTreeMap<&'a str, &'a str>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    answers: BTreeMap<&'a str, &'a str>,
}

/// Normalize one raw review into its storage row.
pub fn map_review(raw: &RawReview) -> ReviewRow {
    let (published_date, published_time) = normalize::split_published(&raw.published);

    let stars = |label: &str| {
        raw.grades
            .get(label)
            .map(|width| normalize::percentage_to_stars(width))
            .unwrap_or(0)
    };
    let answer = |question: &str| {
        raw.answers
            .get(question)
            .cloned()
            .unwrap_or_else(|| "No answer".to_string())
    };

    ReviewRow {
        title: raw.title.clone(),
        reviewer_name: raw.reviewer_name.clone(),
        reviewer_position: raw.reviewer_position.clone(),
        reviewer_company: normalize::clean_company(&raw.reviewer_company),
        published_date,
        published_time,
        custo_beneficio: stars(GRADE_LABELS[0]),
        facilidade_uso: stars(GRADE_LABELS[1]),
        funcionalidades: stars(GRADE_LABELS[2]),
        suporte_cliente: stars(GRADE_LABELS[3]),
        preferencias: answer(QUESTION_PREFERENCES),
        melhorias: answer(QUESTION_IMPROVEMENTS),
        problemas_resolvidos_beneficios: answer(QUESTION_PROBLEMS),
        extras: collect_extras(raw),
    }
}

/// Store one raw review: map through the normalizer, then insert under the
/// record's own transaction.
pub fn store(conn: &Connection, raw: &RawReview) -> Result<()> {
    db::insert_review(conn, &map_review(raw))
}

fn collect_extras(raw: &RawReview) -> Option<String> {
    let known_questions = [
        QUESTION_PREFERENCES,
        QUESTION_IMPROVEMENTS,
        QUESTION_PROBLEMS,
    ];
    let extras = Extras {
        grades: raw
            .grades
            .iter()
            .filter(|(label, _)| !GRADE_LABELS.contains(&label.as_str()))
            .map(|(label, width)| (label.as_str(), width.as_str()))
            .collect(),
        answers: raw
            .answers
            .iter()
            .filter(|(question, _)| !known_questions.contains(&question.as_str()))
            .map(|(question, answer)| (question.as_str(), answer.as_str()))
            .collect(),
    };
    if extras.grades.is_empty() && extras.answers.is_empty() {
        return None;
    }
    serde_json::to_string(&extras).ok()
}

// ── Tests ──
