use std::collections::BTreeMap;
use std::sync::LazyLock;

use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

static REVIEW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.review").unwrap());
static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h3").unwrap());
static REVIEWER_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p.reviewer").unwrap());
static ROLE_SPAN_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.flex.gg-1 span").unwrap());
static PUBLISHED_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p.published").unwrap());
static GRADE_ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.grades > div").unwrap());
static GRADE_LABEL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());
static GRADE_BAR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.star.starsize-16 > div").unwrap());
static QUESTION_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.answers h4").unwrap());
static NEXT_PAGE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.next_page").unwrap());

/// One review's data as extracted from a page, pre-normalization.
///
/// Scalar fields carry sentinel text ("No title", "No name", ...) when the
/// source element is absent. `grades` and `answers` keys are whatever text
/// the page contains; mapping known keys to columns happens in the pipeline.
#[derive(Debug, Clone)]
pub struct RawReview {
    pub title: String,
    pub reviewer_name: String,
    pub reviewer_position: String,
    pub reviewer_company: String,
    pub published: String,
    pub grades: BTreeMap<String, String>,
    pub answers: BTreeMap<String, String>,
}

/// Everything pulled from a single fetched page.
pub struct PageExtract {
    pub reviews: Vec<RawReview>,
    pub skipped: usize,
    pub next_page: Option<String>,
}

/// Extract every review block and the next-page href from a page body.
///
/// A review block with a malformed rating row (no label, or no width style)
/// is skipped with a warning rather than aborting the page. The document is
/// never mutated.
pub fn extract_page(body: &str) -> PageExtract {
    let doc = Html::parse_document(body);

    let mut reviews = Vec::new();
    let mut skipped = 0usize;
    for container in doc.select(&REVIEW_SEL) {
        match extract_review(container) {
            Ok(review) => reviews.push(review),
            Err(e) => {
                warn!("Skipping malformed review block: {}", e);
                skipped += 1;
            }
        }
    }

    let next_page = doc
        .select(&NEXT_PAGE_SEL)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string);

    PageExtract {
        reviews,
        skipped,
        next_page,
    }
}

fn extract_review(container: ElementRef) -> Result<RawReview> {
    let title = first_text(container, &TITLE_SEL).unwrap_or_else(|| "No title".to_string());
    let reviewer_name =
        first_text(container, &REVIEWER_SEL).unwrap_or_else(|| "No name".to_string());

    let mut spans = container.select(&ROLE_SPAN_SEL);
    let reviewer_position = spans
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "No position".to_string());
    let reviewer_company = spans
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "No company".to_string());

    let published =
        first_text(container, &PUBLISHED_SEL).unwrap_or_else(|| "No date".to_string());

    let mut grades = BTreeMap::new();
    for row in container.select(&GRADE_ROW_SEL) {
        let label = first_text(row, &GRADE_LABEL_SEL)
            .ok_or_else(|| anyhow!("rating row without a category label"))?;
        let width = row
            .select(&GRADE_BAR_SEL)
            .next()
            .and_then(|bar| bar.value().attr("style"))
            .ok_or_else(|| anyhow!("rating row '{}' without a width style", label))?;
        grades.insert(label, width.trim().to_string());
    }

    let mut answers = BTreeMap::new();
    for heading in container.select(&QUESTION_SEL) {
        let question = element_text(heading);
        if question.is_empty() {
            continue;
        }
        // Answer is the first following p.answer sibling; absent -> sentinel.
        let answer = heading
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(is_answer_element)
            .map(element_text)
            .unwrap_or_else(|| "No answer".to_string());
        answers.insert(question, answer);
    }

    Ok(RawReview {
        title,
        reviewer_name,
        reviewer_position,
        reviewer_company,
        published,
        grades,
        answers,
    })
}

fn first_text(el: ElementRef, sel: &Selector) -> Option<String> {
    el.select(sel)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn is_answer_element(el: &ElementRef) -> bool {
    el.value().name() == "p" && el.value().classes().any(|c| c == "answer")
}

// ── Tests ──
