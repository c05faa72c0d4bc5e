use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "webcrawler", about = "Polite, concurrent web crawler")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start crawling from seed URLs
    Crawl {
        /// Seed URLs (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        seeds: Option<Vec<String>>,

        /// Single seed URL
        #[arg(long)]
        seed: Option<String>,

        /// Maximum crawl depth (overrides config)
        #[arg(short, long)]
        depth: Option<u32>,
    },
}
