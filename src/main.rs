use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};

use lunch_menu::db::SqliteStore;
use lunch_menu::deadline::Deadline;
use lunch_menu::domain::normalize_domain;
use lunch_menu::parser::days::week_start;
use lunch_menu::refresh;
use lunch_menu::{Pipeline, Settings, WeeklyMenu};

#[derive(Parser)]
#[command(name = "lunch_menu", about = "Daily lunch menu aggregator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a restaurant and scrape its menu right away
    Add {
        /// Page that publishes the daily menu
        url: String,
    },
    /// Re-scrape every registered restaurant for the current week
    Refresh {
        /// Max pipelines running at once (default from settings)
        #[arg(short = 'c', long)]
        concurrency: Option<usize>,
    },
    /// Run the pipeline for one URL and print the JSON, storing nothing
    Scrape {
        url: String,
    },
    /// Show stored menus for the current week
    Menus,
    /// Forget a restaurant and its menus
    Remove {
        /// Restaurant URL or bare domain
        target: String,
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
    let settings = Settings::load()?;
    let today = Local::now().date_naive();

    let result = match cli.command {
        Commands::Add { url } => {
            let store = SqliteStore::open(&settings.db_path)?;
            let pipeline = Pipeline::new(settings)?;
            let added = refresh::add_restaurant(&store, &pipeline, &url, today).await?;
            match (&added.menu, added.saved) {
                (Some(menu), true) => println!(
                    "Added {} (id {}), stored {} days.",
                    added.domain,
                    added.restaurant_id,
                    menu.days.len()
                ),
                (Some(_), false) => println!(
                    "Added {} (id {}), page has no menu this week.",
                    added.domain, added.restaurant_id
                ),
                (None, _) => println!(
                    "Added {} (id {}), menu not available yet; next refresh will retry.",
                    added.domain, added.restaurant_id
                ),
            }
            Ok(())
        }
        Commands::Refresh { concurrency } => {
            let store = SqliteStore::open(&settings.db_path)?;
            let restaurants = store.restaurants()?;
            if restaurants.is_empty() {
                println!("No restaurants registered. Run 'add <url>' first.");
                return Ok(());
            }
            let concurrency = concurrency.unwrap_or(settings.concurrency);
            let deadline = Deadline::after(settings.budget());
            let pipeline = Arc::new(Pipeline::new(settings)?);

            println!(
                "Refreshing {} restaurants ({} at a time)...",
                restaurants.len(),
                concurrency
            );
            let stats =
                refresh::refresh_all(&store, pipeline, restaurants, concurrency, today, deadline)
                    .await;
            println!(
                "Done: {} restaurants ({} updated, {} failed, {} skipped).",
                stats.total, stats.updated, stats.failed, stats.skipped
            );
            Ok(())
        }
        Commands::Scrape { url } => {
            let pipeline = Pipeline::new(settings)?;
            match pipeline.scrape(&url).await {
                Some(menu) => {
                    let json = serde_json::to_string_pretty(&menu)
                        .context("Failed to serialize menu")?;
                    println!("{}", json);
                }
                None => println!("No menu could be obtained from {}", url),
            }
            Ok(())
        }
        Commands::Menus => {
            let store = SqliteStore::open(&settings.db_path)?;
            let week = week_start(today);
            let menus = store.menus_for_week(week)?;
            if menus.is_empty() {
                println!("No menus stored for the week of {}.", week);
                return Ok(());
            }

            println!("Week of {}", week);
            for stored in &menus {
                println!("\n== {} ({})", stored.restaurant.name, stored.restaurant.full_url);
                print_menu(&stored.menu);
            }
            println!("\n{} restaurants", menus.len());
            Ok(())
        }
        Commands::Remove { target } => {
            let store = SqliteStore::open(&settings.db_path)?;
            let domain = match normalize_domain(&target) {
                d if d.is_empty() => {
                    let bare = target.trim().to_lowercase();
                    bare.strip_prefix("www.").map(str::to_string).unwrap_or(bare)
                }
                d => d,
            };
            if store.remove_restaurant(&domain)? {
                println!("Removed {}.", domain);
            } else {
                println!("No restaurant with domain {}.", domain);
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn print_menu(menu: &WeeklyMenu) {
    if menu.is_empty() {
        println!("   (no menu this week)");
        return;
    }
    for day in &menu.days {
        println!("   {}", day.day_label);
        for soup in &day.soups {
            println!("      {:>3}   {}", "-", truncate(soup, 60));
        }
        for dish in &day.main_dishes {
            println!(
                "      {:>3}   {:<60} {:>4} Kč",
                dish.number,
                truncate(&dish.name, 60),
                dish.price_without_soup
            );
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
