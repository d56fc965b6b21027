//! Command-line interface definitions for Article Stash.
//!
//! Every flag is optional: without arguments the compiled-in article list is
//! extracted into `/tmp/documents.json`.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the Article Stash application.
///
/// # Examples
///
/// ```sh
/// # Built-in article list, default store
/// article_stash
///
/// # Custom store and a single article, keeping only two attributes
/// article_stash -d ./documents.json -a title -a cleaned_text https://example.com/story
///
/// # Settings from a YAML file
/// article_stash --config ./article_stash.yaml
///
/// # Inspect what was stored for a site
/// article_stash --dump www_npr_org
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path of the JSON document store
    #[arg(short, long, env = "ARTICLE_STASH_DB")]
    pub database: Option<PathBuf>,

    /// Browser user agent sent with every request
    #[arg(long)]
    pub user_agent: Option<String>,

    /// HTTP timeout per request, in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Article attribute to store (repeatable); defaults to the `infos` bundle
    #[arg(short = 'a', long = "attr", value_name = "NAME")]
    pub attrs: Vec<String>,

    /// Fail on unsupported attribute names instead of dropping them
    #[arg(long)]
    pub strict_attrs: bool,

    /// Print the documents of a collection as JSON and exit without extracting
    #[arg(long, value_name = "COLLECTION")]
    pub dump: Option<String>,

    /// Article URLs to process, in order (replaces the configured list)
    pub urls: Vec<String>,
}
