mod crawler;
mod db;
mod extract;
mod normalize;
mod pipeline;
mod sentiment;
mod tokenize;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};

const DEFAULT_SEED: &str = "https://www.b2bstack.com.br/product/astrea/avaliacoes";

#[derive(Parser)]
#[command(name = "b2bstack_scraper", about = "B2B Stack review scraper")]
struct Cli {
    /// SQLite database path
    #[arg(long, default_value = "data/reviews.sqlite")]
    db: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the review listing and store normalized rows (recreates the table)
    Crawl {
        /// Seed URL for the first listing page
        #[arg(default_value = DEFAULT_SEED)]
        seed: String,
        /// Max pages to fetch (guards against self-referential pagination)
        #[arg(short = 'n', long, default_value_t = 500)]
        max_pages: usize,
        /// Politeness delay between fetches, in seconds
        #[arg(long, default_value_t = 2)]
        delay: u64,
    },
    /// Label stored rows with a star-mean sentiment
    Sentiment,
    /// Tokenize the free-text answer columns
    Tokenize,
    /// Show table statistics
    Stats,
    /// Stored reviews overview table
    Overview {
        /// Filter by sentiment label (Positivo, Neutro, Negativo)
        #[arg(short, long)]
        sentiment: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Crawl {
            seed,
            max_pages,
            delay,
        } => {
            let conn = db::connect(&cli.db)?;
            // Destructive: the crawl always starts from an empty table.
            db::reset_schema(&conn)?;
            let opts = crawler::CrawlOptions {
                max_pages,
                delay: Duration::from_secs(delay),
            };
            let stats = crawler::crawl(&conn, &seed, &opts).await?;
            println!(
                "Done: {} pages, {} reviews stored, {} skipped.",
                stats.pages, stats.stored, stats.skipped
            );
            Ok(())
        }
        Commands::Sentiment => {
            let conn = db::connect(&cli.db)?;
            db::ensure_schema(&conn)?;
            let s = sentiment::run(&conn)?;
            println!(
                "Labeled {} rows ({} Positivo, {} Neutro, {} Negativo).",
                s.rows, s.positive, s.neutral, s.negative
            );
            Ok(())
        }
        Commands::Tokenize => {
            let conn = db::connect(&cli.db)?;
            db::ensure_schema(&conn)?;
            let count = tokenize::run(&conn)?;
            println!("Tokenized {} rows.", count);
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&cli.db)?;
            db::ensure_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Total:     {}", s.total);
            println!("Labeled:   {}", s.labeled);
            println!("Tokenized: {}", s.tokenized);
            Ok(())
        }
        Commands::Overview { sentiment, limit } => {
            let conn = db::connect(&cli.db)?;
            db::ensure_schema(&conn)?;
            let rows = db::fetch_overview(&conn, sentiment.as_deref(), limit)?;
            if rows.is_empty() {
                println!("No reviews stored. Run 'crawl' first.");
                return Ok(());
            }

            // Compact, readable table
            println!(
                "{:>4} | {:<20} | {:<24} | {:<20} | {:<7} | {:<9}",
                "#", "Reviewer", "Company", "Published", "Stars", "Sentiment"
            );
            println!("{}", "-".repeat(100));
            for r in &rows {
                let stars = r
                    .stars
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
                    .join(" ");
                println!(
                    "{:>4} | {:<20} | {:<24} | {:<20} | {:<7} | {:<9}",
                    r.id,
                    truncate(&r.reviewer_name, 20),
                    truncate(&r.reviewer_company, 24),
                    truncate(&r.published_date, 20),
                    stars,
                    r.sentimento.as_deref().unwrap_or("-"),
                );
            }
            println!("\n{} reviews", rows.len());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
