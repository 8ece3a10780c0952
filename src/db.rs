use std::path::Path;

use anyhow::{bail, Result};
use rusqlite::types::ValueRef;
use rusqlite::Connection;

/// Rating columns, in schema order. The sentiment pass reads exactly these.
pub const RATING_COLUMNS: [&str; 4] = [
    "custo_beneficio",
    "facilidade_uso",
    "funcionalidades",
    "suporte_cliente",
];

/// Free-text columns, in schema order. The tokenize pass reads exactly these.
pub const ANSWER_COLUMNS: [&str; 3] = [
    "preferencias",
    "melhorias",
    "problemas_resolvidos_beneficios",
];

const ITEMS_DDL: &str = "
    CREATE TABLE IF NOT EXISTS items (
        id                 INTEGER PRIMARY KEY,
        title              TEXT,
        reviewer_name      TEXT,
        reviewer_position  TEXT,
        reviewer_company   TEXT,
        published_date     TEXT,
        published_time     TEXT,
        custo_beneficio    INTEGER NOT NULL DEFAULT 0,
        facilidade_uso     INTEGER NOT NULL DEFAULT 0,
        funcionalidades    INTEGER NOT NULL DEFAULT 0,
        suporte_cliente    INTEGER NOT NULL DEFAULT 0,
        preferencias       TEXT,
        melhorias          TEXT,
        problemas_resolvidos_beneficios TEXT,
        extras             TEXT,
        created_at         TEXT NOT NULL DEFAULT (datetime('now'))
    );
";

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

/// Create the items table if it does not exist. Never touches existing rows.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(ITEMS_DDL)?;
    Ok(())
}

/// Destroy and recreate the items table. Called exactly once per crawl run,
/// before the first write.
pub fn reset_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(&format!("DROP TABLE IF EXISTS items; {}", ITEMS_DDL))?;
    Ok(())
}

pub fn column_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("PRAGMA table_info(items)")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

/// Additive migration: add a column unless the schema metadata already lists
/// it. Returns whether the column was added.
pub fn add_column_if_absent(conn: &Connection, column: &str, sql_type: &str) -> Result<bool> {
    if column_names(conn)?.iter().any(|c| c == column) {
        return Ok(false);
    }
    conn.execute(
        &format!("ALTER TABLE items ADD COLUMN {} {}", column, sql_type),
        [],
    )?;
    Ok(true)
}

// ── Review rows ──

/// One normalized review, as persisted to the items table.
pub struct ReviewRow {
    pub title: String,
    pub reviewer_name: String,
    pub reviewer_position: String,
    pub reviewer_company: String,
    pub published_date: String,
    pub published_time: String,
    pub custo_beneficio: i64,
    pub facilidade_uso: i64,
    pub funcionalidades: i64,
    pub suporte_cliente: i64,
    pub preferencias: String,
    pub melhorias: String,
    pub problemas_resolvidos_beneficios: String,
    pub extras: Option<String>,
}

/// Insert one row under its own transaction. A failed insert rolls back when
/// the transaction is dropped, and the error propagates to the caller.
pub fn insert_review(conn: &Connection, row: &ReviewRow) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO items
         (title, reviewer_name, reviewer_position, reviewer_company,
          published_date, published_time,
          custo_beneficio, facilidade_uso, funcionalidades, suporte_cliente,
          preferencias, melhorias, problemas_resolvidos_beneficios, extras)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)",
        rusqlite::params![
            row.title,
            row.reviewer_name,
            row.reviewer_position,
            row.reviewer_company,
            row.published_date,
            row.published_time,
            row.custo_beneficio,
            row.facilidade_uso,
            row.funcionalidades,
            row.suporte_cliente,
            row.preferencias,
            row.melhorias,
            row.problemas_resolvidos_beneficios,
            row.extras,
        ],
    )?;
    tx.commit()?;
    Ok(())
}

// ── Sentiment pass ──

pub struct RatingRow {
    pub id: i64,
    pub grades: [Option<f64>; 4],
}

/// Read the four rating columns per row, coercing non-numeric values to None.
pub fn fetch_ratings(conn: &Connection) -> Result<Vec<RatingRow>> {
    let sql = format!(
        "SELECT id, {} FROM items ORDER BY id",
        RATING_COLUMNS.join(", ")
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            let mut grades = [None; 4];
            for (i, slot) in grades.iter_mut().enumerate() {
                *slot = coerce_numeric(row.get_ref(i + 1)?);
            }
            Ok(RatingRow {
                id: row.get(0)?,
                grades,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn coerce_numeric(value: ValueRef) -> Option<f64> {
    match value {
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) => Some(f),
        ValueRef::Text(t) => std::str::from_utf8(t).ok()?.trim().parse().ok(),
        _ => None,
    }
}

pub fn update_sentiment(conn: &Connection, updates: &[(i64, Option<f64>, &str)]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "UPDATE items SET media = ?1, sentimento_estrelas = ?2 WHERE id = ?3",
        )?;
        for (id, media, label) in updates {
            stmt.execute(rusqlite::params![media, label, id])?;
        }
    }
    tx.commit()?;
    Ok(())
}

// ── Tokenize pass ──

pub struct AnswerTextRow {
    pub id: i64,
    pub texts: [Option<String>; 3],
}

pub fn fetch_answer_texts(conn: &Connection) -> Result<Vec<AnswerTextRow>> {
    let sql = format!(
        "SELECT id, {} FROM items ORDER BY id",
        ANSWER_COLUMNS.join(", ")
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(AnswerTextRow {
                id: row.get(0)?,
                texts: [row.get(1)?, row.get(2)?, row.get(3)?],
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_tokens(conn: &Connection, updates: &[(i64, [String; 3])]) -> Result<()> {
    let set_clause = ANSWER_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, col)| format!("{}_tokens = ?{}", col, i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(&format!("UPDATE items SET {} WHERE id = ?4", set_clause))?;
        for (id, tokens) in updates {
            stmt.execute(rusqlite::params![tokens[0], tokens[1], tokens[2], id])?;
        }
    }
    tx.commit()?;
    Ok(())
}

// ── Overview ──

pub struct OverviewRow {
    pub id: i64,
    pub reviewer_name: String,
    pub reviewer_company: String,
    pub published_date: String,
    pub stars: [i64; 4],
    pub sentimento: Option<String>,
}

pub fn fetch_overview(
    conn: &Connection,
    sentiment: Option<&str>,
    limit: usize,
) -> Result<Vec<OverviewRow>> {
    let has_sentiment = column_names(conn)?.iter().any(|c| c == "sentimento_estrelas");
    if sentiment.is_some() && !has_sentiment {
        bail!("no sentiment labels yet; run the 'sentiment' command first");
    }

    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let sent_expr = if has_sentiment { "sentimento_estrelas" } else { "NULL" };
    let mut sql = format!(
        "SELECT id, COALESCE(reviewer_name,''), COALESCE(reviewer_company,''),
                COALESCE(published_date,''),
                custo_beneficio, facilidade_uso, funcionalidades, suporte_cliente,
                {}
         FROM items",
        sent_expr
    );
    if let Some(s) = sentiment {
        sql.push_str(" WHERE sentimento_estrelas = ?1");
        params.push(Box::new(s.to_string()));
    }
    sql.push_str(&format!(" ORDER BY id LIMIT {}", limit));

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(OverviewRow {
                id: row.get(0)?,
                reviewer_name: row.get(1)?,
                reviewer_company: row.get(2)?,
                published_date: row.get(3)?,
                stars: [row.get(4)?, row.get(5)?, row.get(6)?, row.get(7)?],
                sentimento: row.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub total: usize,
    pub labeled: usize,
    pub tokenized: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let cols = column_names(conn)?;
    let total: usize = conn.query_row("SELECT COUNT(*) FROM items", [], |r| r.get(0))?;
    let labeled: usize = if cols.iter().any(|c| c == "sentimento_estrelas") {
        conn.query_row(
            "SELECT COUNT(*) FROM items WHERE sentimento_estrelas IS NOT NULL",
            [],
            |r| r.get(0),
        )?
    } else {
        0
    };
    let tokenized: usize = if cols.iter().any(|c| c == "preferencias_tokens") {
        conn.query_row(
            "SELECT COUNT(*) FROM items WHERE preferencias_tokens IS NOT NULL",
            [],
            |r| r.get(0),
        )?
    } else {
        0
    };
    Ok(Stats {
        total,
        labeled,
        tokenized,
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn test_row() -> ReviewRow {
        ReviewRow {
            title: "t".into(),
            reviewer_name: "n".into(),
            reviewer_position: "p".into(),
            reviewer_company: "c".into(),
            published_date: "d".into(),
            published_time: "h".into(),
            custo_beneficio: 5,
            facilidade_uso: 4,
            funcionalidades: 3,
            suporte_cliente: 2,
            preferencias: "a".into(),
            melhorias: "b".into(),
            problemas_resolvidos_beneficios: "c".into(),
            extras: None,
        }
    }

    fn mem() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        reset_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn reset_schema_destroys_rows() {
        let conn = mem();
        insert_review(&conn, &test_row()).unwrap();
        assert_eq!(get_stats(&conn).unwrap().total, 1);
        reset_schema(&conn).unwrap();
        assert_eq!(get_stats(&conn).unwrap().total, 0);
    }

    #[test]
    fn ensure_schema_preserves_rows() {
        let conn = mem();
        insert_review(&conn, &test_row()).unwrap();
        ensure_schema(&conn).unwrap();
        assert_eq!(get_stats(&conn).unwrap().total, 1);
    }

    #[test]
    fn add_column_is_idempotent() {
        let conn = mem();
        assert!(add_column_if_absent(&conn, "media", "REAL").unwrap());
        assert!(!add_column_if_absent(&conn, "media", "REAL").unwrap());
        assert!(column_names(&conn).unwrap().contains(&"media".to_string()));
    }

    #[test]
    fn ratings_coerce_non_numeric_to_none() {
        let conn = mem();
        insert_review(&conn, &test_row()).unwrap();
        // SQLite column affinity still stores arbitrary text.
        conn.execute("UPDATE items SET custo_beneficio = 'abc'", [])
            .unwrap();
        let rows = fetch_ratings(&conn).unwrap();
        assert_eq!(rows[0].grades, [None, Some(4.0), Some(3.0), Some(2.0)]);
    }

    #[test]
    fn ratings_parse_numeric_text() {
        let conn = mem();
        insert_review(&conn, &test_row()).unwrap();
        conn.execute("UPDATE items SET facilidade_uso = ' 4 '", [])
            .unwrap();
        let rows = fetch_ratings(&conn).unwrap();
        assert_eq!(rows[0].grades[1], Some(4.0));
    }

    #[test]
    fn overview_filter_requires_sentiment_column() {
        let conn = mem();
        assert!(fetch_overview(&conn, Some("Positivo"), 10).is_err());
        assert!(fetch_overview(&conn, None, 10).unwrap().is_empty());
    }
}
