use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::db::{MenuStore, Restaurant};
use crate::deadline::Deadline;
use crate::domain::normalize_domain;
use crate::menu::WeeklyMenu;
use crate::parser::days::week_start;
use crate::pipeline::Pipeline;

/// Refresh stats returned after a batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RefreshStats {
    pub total: usize,
    pub updated: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Outcome of registering one restaurant.
#[derive(Debug)]
pub struct Added {
    pub restaurant_id: i64,
    pub domain: String,
    pub menu: Option<WeeklyMenu>,
    pub saved: bool,
}

/// Re-scrape every restaurant and replace this week's stored menu.
///
/// Pipelines run concurrently (bounded by `concurrency`) under one shared
/// deadline; results are persisted one by one as they arrive. A restaurant
/// that yields nothing is skipped, one whose write fails is counted as
/// failed, and neither stops the batch.
pub async fn refresh_all<S: MenuStore>(
    store: &S,
    pipeline: Arc<Pipeline>,
    restaurants: Vec<Restaurant>,
    concurrency: usize,
    today: NaiveDate,
    deadline: Deadline,
) -> RefreshStats {
    let total = restaurants.len();
    let week = week_start(today);
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

    let pb = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("=> "));
    }

    // Channel: workers send results, this loop writes to the store
    let (tx, mut rx) =
        tokio::sync::mpsc::channel::<(Restaurant, Option<WeeklyMenu>)>(concurrency.max(1) * 2);

    for restaurant in restaurants {
        let pipeline = Arc::clone(&pipeline);
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            info!("Refreshing {} ({})", restaurant.name, restaurant.full_url);
            let menu = pipeline
                .scrape_within(&restaurant.full_url, today, &deadline)
                .await;
            let _ = tx.send((restaurant, menu)).await;
        });
    }

    // Drop our copy of tx so rx closes when all spawned tasks finish
    drop(tx);

    let mut stats = RefreshStats { total, ..Default::default() };
    let mut received = 0usize;
    while let Some((restaurant, menu)) = rx.recv().await {
        received += 1;
        pb.set_message(restaurant.domain.clone());
        match menu {
            None => {
                warn!("No menu obtained for {}, skipping this cycle", restaurant.name);
                stats.skipped += 1;
            }
            Some(menu) => match store.replace_week(restaurant.id, week, &menu) {
                Ok(()) => {
                    info!("Menu updated for {} ({} days)", restaurant.name, menu.days.len());
                    stats.updated += 1;
                }
                Err(e) => {
                    warn!("Storing menu for {} failed: {:#}", restaurant.name, e);
                    stats.failed += 1;
                }
            },
        }
        pb.inc(1);
    }
    // Tasks that died without reporting
    stats.failed += total - received;

    pb.finish_and_clear();
    info!(
        "Refresh done: {} total, {} updated, {} failed, {} skipped",
        stats.total, stats.updated, stats.failed, stats.skipped
    );
    stats
}

/// Register a restaurant by URL and store this week's menu if one is found.
pub async fn add_restaurant<S: MenuStore>(
    store: &S,
    pipeline: &Pipeline,
    url: &str,
    today: NaiveDate,
) -> Result<Added> {
    let domain = normalize_domain(url);
    if domain.is_empty() {
        bail!("Not a usable URL: {}", url);
    }
    let restaurant_id = store.upsert_restaurant(&domain, url)?;
    info!("Restaurant {} has id {}", domain, restaurant_id);

    let deadline = Deadline::after(pipeline.settings().budget());
    let menu = pipeline.scrape_within(url, today, &deadline).await;
    let saved = match &menu {
        Some(m) if !m.is_empty() => {
            store.replace_week(restaurant_id, week_start(today), m)?;
            true
        }
        _ => {
            warn!("No menu for {} yet, nothing stored", domain);
            false
        }
    };
    Ok(Added { restaurant_id, domain, menu, saved })
}
