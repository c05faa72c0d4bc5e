use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

// Use mimalloc to prevent memory bloat (glibc malloc doesn't release memory with high concurrency)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use webcrawler_core::config::AppConfig;

use webcrawler::cli::{Cli, Commands};
use webcrawler::orchestrator::Orchestrator;

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config).unwrap_or_else(|_| {
        warn!(path = %cli.config, "config file not found, using defaults");
        include_str!("../config/default.toml").to_string()
    });
    let mut config: AppConfig = toml::from_str(&config_str)?;

    match cli.command {
        Commands::Crawl { seeds, seed, depth } => {
            if let Some(depth) = depth {
                config.general.max_depth = depth;
            }

            let mut seed_urls = seeds.unwrap_or_default();
            if let Some(seed) = seed {
                seed_urls.push(seed);
            }
            if seed_urls.is_empty() {
                anyhow::bail!("no seed URLs given: pass --seed <url> or --seeds <url1,url2,...>");
            }

            let orchestrator = Orchestrator::new(config);
            let stats = orchestrator
                .run(
                    seed_urls,
                    Some(std::sync::Arc::new(|result: &webcrawler_core::CrawlResult| {
                        info!(
                            url = %result.url,
                            status_code = result.status_code,
                            links = result.links.len(),
                            "page crawled"
                        );
                    })),
                )
                .await?;

            info!(
                pages_crawled = stats.pages_crawled,
                pages_failed = stats.pages_failed,
                pages_skipped = stats.pages_skipped,
                duration_seconds = stats.duration_seconds,
                pages_per_second = stats.pages_per_second,
                "crawl complete"
            );
        }
    }

    Ok(())
}
