//! Sentiment labeling over the four rating columns. Writes a `media` mean and
//! a `sentimento_estrelas` label back into each row.

use anyhow::Result;
use indicatif::ProgressBar;
use rusqlite::Connection;
use tracing::info;

use crate::db;

pub struct SentimentStats {
    pub rows: usize,
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

pub fn run(conn: &Connection) -> Result<SentimentStats> {
    db::add_column_if_absent(conn, "media", "REAL")?;
    db::add_column_if_absent(conn, "sentimento_estrelas", "TEXT")?;

    let rows = db::fetch_ratings(conn)?;
    let pb = ProgressBar::new(rows.len() as u64);

    let mut stats = SentimentStats {
        rows: rows.len(),
        positive: 0,
        neutral: 0,
        negative: 0,
    };
    let mut updates = Vec::with_capacity(rows.len());
    for row in &rows {
        let media = mean(&row.grades);
        let label = categorize(media);
        match label {
            "Positivo" => stats.positive += 1,
            "Neutro" => stats.neutral += 1,
            _ => stats.negative += 1,
        }
        updates.push((row.id, media, label));
        pb.inc(1);
    }
    db::update_sentiment(conn, &updates)?;
    pb.finish_and_clear();

    info!(
        "Labeled {} rows ({} positive, {} neutral, {} negative)",
        stats.rows, stats.positive, stats.neutral, stats.negative
    );
    Ok(stats)
}

/// Row mean over the ratings that are present; None when none are numeric.
fn mean(values: &[Option<f64>; 4]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

/// mean >= 4.5 positive, 3.0 <= mean < 4.5 neutral, else negative. A row
/// with no numeric rating falls through to negative.
fn categorize(media: Option<f64>) -> &'static str {
    match media {
        Some(m) if m >= 4.5 => "Positivo",
        Some(m) if m >= 3.0 => "Neutro",
        _ => "Negativo",
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorize_thresholds() {
        assert_eq!(categorize(Some(5.0)), "Positivo");
        assert_eq!(categorize(Some(4.5)), "Positivo");
        assert_eq!(categorize(Some(4.49)), "Neutro");
        assert_eq!(categorize(Some(3.0)), "Neutro");
        assert_eq!(categorize(Some(2.99)), "Negativo");
        assert_eq!(categorize(Some(0.0)), "Negativo");
        assert_eq!(categorize(None), "Negativo");
    }

    #[test]
    fn mean_ignores_missing() {
        assert_eq!(mean(&[Some(5.0), None, Some(3.0), None]), Some(4.0));
        assert_eq!(mean(&[None, None, None, None]), None);
        assert_eq!(mean(&[Some(2.0), Some(2.0), Some(2.0), Some(2.0)]), Some(2.0));
    }

    #[test]
    fn run_writes_labels() {
        let conn = Connection::open_in_memory().unwrap();
        db::reset_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO items (title, custo_beneficio, facilidade_uso, funcionalidades, suporte_cliente)
             VALUES ('good', 5, 5, 5, 4), ('bad', 1, 1, 2, 2)",
            [],
        )
        .unwrap();

        let stats = run(&conn).unwrap();
        assert_eq!(stats.rows, 2);
        assert_eq!(stats.positive, 1);
        assert_eq!(stats.negative, 1);

        let (media, label): (f64, String) = conn
            .query_row(
                "SELECT media, sentimento_estrelas FROM items WHERE title = 'good'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(media, 4.75);
        assert_eq!(label, "Positivo");
    }

    #[test]
    fn run_is_rerunnable() {
        let conn = Connection::open_in_memory().unwrap();
        db::reset_schema(&conn).unwrap();
        conn.execute("INSERT INTO items (title) VALUES ('empty')", [])
            .unwrap();
        run(&conn).unwrap();
        let stats = run(&conn).unwrap();
        // Ratings default to 0, so the mean is 0.0, not NULL.
        assert_eq!(stats.negative, 1);
        let media: f64 = conn
            .query_row("SELECT media FROM items", [], |r| r.get(0))
            .unwrap();
        assert_eq!(media, 0.0);
    }
}
