use anyhow::{bail, Context, Result};
use clap::Parser;
use market_scout::fetcher::{CatalogSource, HttpListingSource, ListingSource};
use market_scout::models::{ListingResult, Price};
use market_scout::pagination::{page_count, NoScroll};
use market_scout::search::{decode_query, PageSize};
use market_scout::{SearchView, Settings, ViewState};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Search the market from the command line
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Search as a URL query string, e.g. "query=laser&sort=price-low"
    #[arg(default_value = "")]
    query: String,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,

    /// Search the built-in sample catalog instead of the market API
    #[arg(long)]
    offline: bool,

    /// Jump to this page (0-based) after the first load
    #[arg(long)]
    page: Option<u64>,

    /// Switch to this page size (12, 24, 48 or 96)
    #[arg(long)]
    page_size: Option<u64>,

    /// List item type options and exit
    #[arg(long)]
    categories: bool,

    /// Save the loaded page as JSON
    #[arg(short, long)]
    output: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref())?;

    info!("🛒 Market Scout v{}", env!("CARGO_PKG_VERSION"));

    let source: Arc<dyn ListingSource> = if args.offline {
        Arc::new(CatalogSource::sample())
    } else {
        Arc::new(HttpListingSource::new(&settings)?)
    };
    info!("Searching {}", source.source_name());

    let criteria = decode_query(&args.query);
    let view = SearchView::with_criteria(source, &settings, Arc::new(NoScroll), criteria);

    if args.categories {
        let options = view.item_type_options().await?;
        for (category, subcategories) in options {
            println!("{}: {}", category, subcategories.join(", "));
        }
        return Ok(());
    }

    let mut state = view.refresh().await;
    if let Some(size) = args.page_size {
        let Some(size) = PageSize::from_value(size) else {
            bail!("unsupported page size {size}, expected 12, 24, 48 or 96");
        };
        state = view.on_page_size_change(size).await;
    }
    if let Some(page) = args.page {
        state = view.on_page_change(page).await;
    }

    match &state {
        ViewState::Loaded {
            criteria,
            results,
            page_bar,
            ..
        } => {
            if results.is_empty() {
                info!("No listings match this search");
            } else {
                info!(
                    "\n✅ Page {} of {} ({} listings in total)\n",
                    page_bar.page,
                    page_count(results.total, criteria.page_size),
                    results.total
                );
            }
            for (i, listing) in results.items.iter().enumerate() {
                print_listing(i + 1, listing);
            }
        }
        ViewState::Failed { error, .. } => {
            let hint = if error.is_retryable() {
                "try again shortly"
            } else {
                "check the search and configuration"
            };
            bail!("search failed: {error} ({hint})");
        }
        ViewState::Idle | ViewState::Loading { .. } => bail!("search did not complete"),
    }

    println!("🔗 {}", view.share_url("/market/search"));

    if let (Some(path), Some(results)) = (&args.output, state.results()) {
        let json = serde_json::to_string_pretty(results)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write {path}"))?;
        info!("💾 Saved {} listings to {}", results.items.len(), path);
    }

    Ok(())
}

fn print_listing(position: usize, listing: &ListingResult) {
    let summary = listing.summary();
    let price = match summary.price {
        Price::Fixed { amount } => format!("{amount} aUEC"),
        Price::Range { min, max } => format!("{min} - {max} aUEC"),
    };
    println!("{}. {} ({})", position, display_title(listing), price);
    println!(
        "   {} · {} available · sold by {}",
        listing.kind_name(),
        summary.quantity,
        summary.seller.display_name()
    );
    if let Some(item_type) = &summary.item_type {
        println!("   Type: {}", item_type);
    }
    println!("   ID: {}", summary.id);
    println!();
}

fn display_title(listing: &ListingResult) -> &str {
    match listing.title() {
        "" => "(untitled)",
        title => title,
    }
}
