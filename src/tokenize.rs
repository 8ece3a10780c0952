//! Token preprocessing over the free-text answer columns. Writes a
//! `<column>_tokens` companion column per source column.

use std::collections::HashSet;
use std::sync::LazyLock;

use anyhow::Result;
use indicatif::ProgressBar;
use regex::Regex;
use rusqlite::Connection;
use tracing::info;

use crate::db;

/// ASCII punctuation, the four ranges of the ASCII table.
static PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[!-/:-@\[-`{-~]").unwrap());

/// Portuguese stopwords (the NLTK list).
const STOPWORD_LIST: &[&str] = &[
    "a", "ao", "aos", "aquela", "aquelas", "aquele", "aqueles", "aquilo", "as", "até",
    "com", "como", "da", "das", "de", "dela", "delas", "dele", "deles", "depois", "do",
    "dos", "e", "é", "ela", "elas", "ele", "eles", "em", "entre", "era", "eram", "éramos",
    "essa", "essas", "esse", "esses", "esta", "está", "estamos", "estão", "estas", "estava",
    "estavam", "estávamos", "este", "esteja", "estejam", "estejamos", "estes", "esteve",
    "estive", "estivemos", "estiveram", "estou", "eu", "foi", "fomos", "for", "foram",
    "forem", "formos", "fosse", "fossem", "fôssemos", "fui", "há", "haja", "hajam",
    "hajamos", "hão", "havemos", "hei", "houve", "houvemos", "houver", "houveram",
    "houverem", "houvermos", "isso", "isto", "já", "lhe", "lhes", "mais", "mas", "me",
    "mesmo", "meu", "meus", "minha", "minhas", "muito", "na", "não", "nas", "nem", "no",
    "nos", "nós", "nossa", "nossas", "nosso", "nossos", "num", "numa", "o", "os", "ou",
    "para", "pela", "pelas", "pelo", "pelos", "por", "qual", "quando", "que", "quem",
    "são", "se", "seja", "sejam", "sejamos", "sem", "ser", "será", "serão", "serei",
    "seremos", "seria", "seriam", "seríamos", "seu", "seus", "só", "somos", "sou", "sua",
    "suas", "também", "te", "tem", "têm", "temos", "tenha", "tenham", "tenhamos", "tenho",
    "ter", "terá", "terão", "terei", "teremos", "teria", "teriam", "teríamos", "teu",
    "teus", "teve", "tinha", "tinham", "tínhamos", "tive", "tivemos", "tiveram", "tu",
    "tua", "tuas", "um", "uma", "você", "vocês", "vos",
];

static STOPWORDS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOPWORD_LIST.iter().copied().collect());

/// Lowercase, strip ASCII punctuation, split on whitespace, and drop
/// stopwords. Content-word order is preserved.
pub fn preprocess(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = PUNCT_RE.replace_all(&lowered, "");
    stripped
        .split_whitespace()
        .filter(|word| !STOPWORDS.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Tokenize every row's answer columns, writing the token columns back in one
/// transaction. A NULL source column yields an empty token string.
pub fn run(conn: &Connection) -> Result<usize> {
    for col in db::ANSWER_COLUMNS {
        db::add_column_if_absent(conn, &format!("{}_tokens", col), "TEXT")?;
    }

    let rows = db::fetch_answer_texts(conn)?;
    let pb = ProgressBar::new(rows.len() as u64);

    let mut updates = Vec::with_capacity(rows.len());
    for row in &rows {
        let tokens = [
            row.texts[0].as_deref().map(preprocess).unwrap_or_default(),
            row.texts[1].as_deref().map(preprocess).unwrap_or_default(),
            row.texts[2].as_deref().map(preprocess).unwrap_or_default(),
        ];
        updates.push((row.id, tokens));
        pb.inc(1);
    }
    db::update_tokens(conn, &updates)?;
    pb.finish_and_clear();

    info!("Tokenized {} rows", updates.len());
    Ok(updates.len())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preprocess_lowercases_and_strips_punctuation() {
        assert_eq!(preprocess("Automação, dos Prazos!"), "automação prazos");
    }

    #[test]
    fn preprocess_drops_stopwords() {
        assert_eq!(
            preprocess("O que eu mais gosto é a praticidade"),
            "gosto praticidade"
        );
    }

    #[test]
    fn preprocess_empty() {
        assert_eq!(preprocess(""), "");
        assert_eq!(preprocess("de da do"), "");
    }

    #[test]
    fn run_writes_token_columns() {
        let conn = Connection::open_in_memory().unwrap();
        db::reset_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO items (preferencias, melhorias) VALUES ('Gosto muito da automação.', NULL)",
            [],
        )
        .unwrap();

        let count = run(&conn).unwrap();
        assert_eq!(count, 1);

        let (pref, melh): (String, String) = conn
            .query_row(
                "SELECT preferencias_tokens, melhorias_tokens FROM items",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(pref, "gosto automação");
        assert_eq!(melh, "");
    }

    #[test]
    fn run_is_rerunnable() {
        let conn = Connection::open_in_memory().unwrap();
        db::reset_schema(&conn).unwrap();
        conn.execute("INSERT INTO items (preferencias) VALUES ('Bom')", [])
            .unwrap();
        run(&conn).unwrap();
        assert_eq!(run(&conn).unwrap(), 1);
    }
}
