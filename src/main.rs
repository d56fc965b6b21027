//! # Article Stash
//!
//! Fetches a list of web articles, extracts their readable content and
//! metadata, timestamps each extraction and stores it in a JSON document
//! store with one collection per site.
//!
//! ## Usage
//!
//! ```sh
//! article_stash -d /tmp/documents.json
//! ```
//!
//! ## Architecture
//!
//! A single sequential pass over the URL list:
//! 1. **Naming**: derive the collection from the URL authority (`www.npr.org` → `www_npr_org`)
//! 2. **Extraction**: fetch the page and read the requested article attributes
//! 3. **Stamping**: add `extracted_at` in `YYYY-MM-DDTHH:MM:SS+0000` form
//! 4. **Storage**: append the document to its collection
//!
//! The first failure stops the run with a non-zero exit status.

use clap::Parser;
use std::error::Error;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod extractor;
mod models;
mod pipeline;
mod storage;
mod utils;

use cli::Cli;
use config::AppConfig;
use extractor::ArticleExtractor;
use storage::JsonStore;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("article_stash starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config = AppConfig::resolve(&args).await?;
    info!(
        urls = config.urls.len(),
        database = %config.database.display(),
        attrs = ?config.attrs,
        unknown_attrs = ?config.extractor.unknown_attrs,
        "Effective configuration"
    );

    if let Some(collection) = &args.dump {
        println!("{}", pipeline::dump_collection(&config.database, collection).await?);
        return Ok(());
    }

    // ---- Store, held exclusively for the whole run ----
    let mut store = JsonStore::open(&config.database).await?;

    let extractor = ArticleExtractor::new(&config.extractor)?;

    let summary = pipeline::archive_urls(
        &extractor,
        &mut store,
        &config.urls,
        config.attrs.as_deref(),
    )
    .await?;

    for stored in &summary.stored {
        debug!(
            url = %stored.url,
            collection = %stored.collection,
            id = stored.id,
            collection_size = store.len(&stored.collection),
            "Stored document"
        );
    }

    let elapsed = start_time.elapsed();
    info!(
        stored = summary.stored.len(),
        collections = ?store.collections(),
        path = %store.path().display(),
        ?elapsed,
        "Execution complete"
    );

    Ok(())
}
