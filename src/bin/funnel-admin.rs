use anyhow::Result;
use clap::{Parser, Subcommand};
use funnel::config::{Config, DatabaseBackend};
use funnel::models::{opaque_id, NewPrelanderPage, NewWebResult};
use funnel::storage::{PostgresStorage, SqliteStorage, Storage};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "funnel-admin")]
#[command(about = "Funnel admin management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an offer to a results page
    AddOffer {
        /// Results page key (e.g. "wr=1")
        page: String,
        /// Offer title
        title: String,
        /// Advertiser destination URL
        original_link: String,
        /// Offer description
        #[arg(long, default_value = "")]
        description: String,
        /// Display name shown on the prelander
        #[arg(long)]
        offer_name: Option<String>,
        /// List in the sponsored block
        #[arg(long)]
        sponsored: bool,
        /// Position within the page
        #[arg(long, default_value_t = 1)]
        serial: i64,
    },
    /// Create a prelander page and link it to an offer
    AddPrelander {
        /// Offer id the prelander fronts
        web_result_id: String,
        /// Prelander headline
        headline: String,
        /// Destination URL for the CTA button
        #[arg(long)]
        target_url: Option<String>,
        /// Prelander description
        #[arg(long)]
        description: Option<String>,
        /// CTA button label
        #[arg(long)]
        cta_text: Option<String>,
    },
    /// List active prelander pages
    ListPrelanders,
    /// Deactivate a prelander page
    RemovePrelander {
        /// Page key to deactivate
        page_key: String,
    },
    /// Print site-wide traffic totals
    Summary,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let storage: Arc<dyn Storage> = match config.database.backend {
        DatabaseBackend::Sqlite => Arc::new(SqliteStorage::new(&config.database.url, 5).await?),
        DatabaseBackend::Postgres => Arc::new(PostgresStorage::new(&config.database.url).await?),
    };

    // Ensure database is initialized
    storage.init().await?;

    match cli.command {
        Commands::AddOffer {
            page,
            title,
            original_link,
            description,
            offer_name,
            sponsored,
            serial,
        } => {
            let new = NewWebResult {
                id: opaque_id("wr"),
                webresult_page: page,
                is_sponsored: sponsored,
                offer_name,
                title,
                description,
                original_link,
                logo_url: None,
                serial_number: serial,
                access_type: "worldwide".to_string(),
                allowed_countries: None,
            };
            let offer = storage.create_web_result(&new).await?;
            println!("✓ Created offer '{}' with id {}", offer.title, offer.id);
        }
        Commands::AddPrelander {
            web_result_id,
            headline,
            target_url,
            description,
            cta_text,
        } => {
            let new = NewPrelanderPage {
                page_key: format!("prelander_{}", chrono::Utc::now().timestamp_millis()),
                headline,
                description,
                cta_text,
                target_url,
                ..Default::default()
            };
            let page = storage.create_prelander(&new).await?;

            let linked = storage
                .link_prelander(&web_result_id, &page.page_key)
                .await?;
            if linked {
                println!(
                    "✓ Created prelander '{}' and linked it to offer '{}'",
                    page.page_key, web_result_id
                );
            } else {
                println!(
                    "⚠ Created prelander '{}' but offer '{}' was not found",
                    page.page_key, web_result_id
                );
            }
        }
        Commands::ListPrelanders => {
            let pages = storage.list_prelanders().await?;
            if pages.is_empty() {
                println!("No active prelander pages found.");
            } else {
                println!("Active prelander pages:");
                println!("{:<32} {:<30} {}", "Page Key", "Headline", "Target URL");
                println!("{}", "-".repeat(90));
                for page in pages {
                    println!(
                        "{:<32} {:<30} {}",
                        page.page_key,
                        page.headline,
                        page.target_url.as_deref().unwrap_or("-")
                    );
                }
            }
        }
        Commands::RemovePrelander { page_key } => {
            let removed = storage.deactivate_prelander(&page_key).await?;
            if removed {
                println!("✓ Deactivated prelander '{}'", page_key);
            } else {
                println!("⚠ Prelander '{}' was not found", page_key);
            }
        }
        Commands::Summary => {
            let summary = storage.traffic_summary().await?;
            println!("Traffic summary:");
            println!("  sessions:         {}", summary.sessions);
            println!("  page views:       {}", summary.page_views);
            println!("  clicks:           {}", summary.clicks);
            println!("  unique clicks:    {}", summary.unique_clicks);
            println!("  related searches: {}", summary.related_searches);
            println!("  result clicks:    {}", summary.result_clicks);
            println!("  time spent (s):   {}", summary.time_spent);
        }
    }

    Ok(())
}
