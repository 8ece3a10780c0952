use std::time::Duration;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use tracing::{info, warn};
use url::Url;

use crate::extract;
use crate::pipeline;

/// Fixed outbound User-Agent; the listing blocks obvious automated clients.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/58.0.3029.110 \
     Safari/537.3";

pub struct CrawlOptions {
    /// Hard cap on fetched pages; guards against self-referential pagination.
    pub max_pages: usize,
    /// Politeness delay between successive fetches.
    pub delay: Duration,
}

/// Crawl stats returned after completion.
pub struct CrawlStats {
    pub pages: usize,
    pub stored: usize,
    pub skipped: usize,
}

/// Walk the review listing page by page, storing every extracted review as it
/// is produced. One fetch in flight at a time; page N+1 is never fetched
/// before all of page N's records are stored. A fetch failure or a
/// persistence failure aborts the remaining pagination; rows already
/// committed stay in the store.
pub async fn crawl(conn: &Connection, seed_url: &str, opts: &CrawlOptions) -> Result<CrawlStats> {
    let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
    let mut current = Url::parse(seed_url).context("invalid seed URL")?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);

    let mut stats = CrawlStats {
        pages: 0,
        stored: 0,
        skipped: 0,
    };

    loop {
        if stats.pages >= opts.max_pages {
            warn!("Reached max page cap ({}), stopping crawl", opts.max_pages);
            break;
        }
        if stats.pages > 0 {
            tokio::time::sleep(opts.delay).await;
        }
        pb.set_message(format!("page {}: {}", stats.pages + 1, current));

        let response = client
            .get(current.clone())
            .send()
            .await
            .with_context(|| format!("fetch failed for {}", current))?;
        let status = response.status();
        if !status.is_success() {
            bail!("fetch failed for {}: HTTP {}", current, status);
        }
        let body = response.text().await?;

        let page = extract::extract_page(&body);
        stats.pages += 1;
        stats.skipped += page.skipped;
        for raw in &page.reviews {
            pipeline::store(conn, raw)?;
            stats.stored += 1;
        }
        info!(
            "Page {}: {} reviews stored ({} skipped)",
            stats.pages,
            page.reviews.len(),
            page.skipped
        );

        match page.next_page {
            Some(href) => {
                current = current
                    .join(&href)
                    .with_context(|| format!("bad next-page link '{}'", href))?;
            }
            None => break,
        }
    }

    pb.finish_and_clear();
    Ok(stats)
}
