pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "newsreel")]
#[command(about = "Browse news sources and headlines from the terminal", long_about = None)]
pub struct Cli {
    /// Load configuration from this file instead of the default location
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the news categories
    Categories,
    /// List the sources of a category
    Sources {
        /// Category name, e.g. "technology"
        category: String,

        /// Only show sources matching this keyword
        #[arg(short, long)]
        search: Option<String>,

        /// How many times to retry a failed load
        #[arg(short, long, default_value_t = 0)]
        retries: u32,
    },
    /// List the articles of a source
    Articles {
        /// Source id, e.g. "abc-news"
        source: String,

        /// Number of pages to load
        #[arg(short, long, default_value_t = 1)]
        pages: u32,

        /// Only show articles matching this keyword
        #[arg(short, long)]
        search: Option<String>,

        /// How many times to retry a failed page
        #[arg(short, long, default_value_t = 0)]
        retries: u32,
    },
    /// Open an article in the browser
    Open {
        /// Source id
        source: String,

        /// Article number as printed by `articles`
        #[arg(required_unless_present = "id", conflicts_with = "id")]
        index: Option<usize>,

        /// Article id (or a prefix of it) as printed by `articles`
        #[arg(long)]
        id: Option<String>,

        /// Number of pages to look through
        #[arg(short, long, default_value_t = 1)]
        pages: u32,

        /// Keyword the numbering was filtered by
        #[arg(short, long)]
        search: Option<String>,
    },
}
