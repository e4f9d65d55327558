use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use newsreel::app::AppContext;
use newsreel::cli::{commands, Cli, Commands};
use newsreel::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Categories => {
            commands::list_categories();
        }
        Commands::Sources {
            category,
            search,
            retries,
        } => {
            commands::list_sources(&ctx, &category, search.as_deref(), retries).await?;
        }
        Commands::Articles {
            source,
            pages,
            search,
            retries,
        } => {
            commands::list_articles(&ctx, &source, pages, search.as_deref(), retries).await?;
        }
        Commands::Open {
            source,
            index,
            id,
            pages,
            search,
        } => {
            let selector = commands::ArticleSelector::from_args(index, id)
                .ok_or_else(|| anyhow::anyhow!("Give an article number or --id"))?;
            commands::open_article(&ctx, &source, &selector, pages, search.as_deref()).await?;
        }
    }

    Ok(())
}
