// src/main.rs
mod cli;
mod logging;

use clap::Parser;
use cli::Args;
use fixture_cache::clock::ViewerZone;
use fixture_cache::config::Config;
use fixture_cache::data_fetcher::cache::{FixtureCache, spawn_maintenance};
use fixture_cache::data_fetcher::{Fixture, FixtureService, HttpFixtureSource};
use fixture_cache::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();

    if args.list_config {
        return Config::display().await;
    }

    let config = Config::load().await?;
    let (log_file, _guard) = logging::setup_logging(&args, &config)?;
    info!("Logging to {}", log_file);

    let cache = Arc::new(FixtureCache::from_config(&config));

    if args.purge_persistent {
        let removed = cache.purge_persistent();
        println!("Removed {removed} persisted date buckets");
        return Ok(());
    }

    let source = HttpFixtureSource::from_config(&config)?;
    let service = FixtureService::new(Arc::clone(&cache), Arc::new(source));
    let maintenance = spawn_maintenance(
        Arc::clone(&cache),
        Duration::from_secs(config.cache.maintenance_interval_seconds),
    );

    let result = run(&args, &service).await;
    if let Err(e) = &result {
        error!("Request failed: {}", e);
    }

    if args.stats {
        let stats = cache.stats().await;
        println!();
        println!("Cache entries:      {}/{}", stats.size, stats.capacity);
        println!(
            "Hits / misses:      {} / {} ({:.1}%)",
            stats.hits,
            stats.misses,
            stats.hit_rate * 100.0
        );
        println!("Persisted buckets:  {}", stats.persistent_size);
        println!("Tracked fixtures:   {}", stats.tracked_fixtures);
        println!("Indexed fixtures:   {}", stats.indexed_fixtures);
    }

    maintenance.stop().await;
    result
}

async fn run(args: &Args, service: &FixtureService<HttpFixtureSource>) -> Result<(), AppError> {
    let zone = service.cache().time_context().zone;

    if args.live {
        let fixtures = service.live_fixtures().await?;
        println!("Live fixtures: {}", fixtures.len());
        for fixture in &fixtures {
            println!("{}", format_fixture(fixture, &zone));
        }
        return Ok(());
    }

    let date = args
        .date
        .unwrap_or_else(|| service.cache().time_context().today());
    let shown = service.fixtures_for_date(date).await?;

    println!(
        "Fixtures for {} ({:?}, {})",
        shown.date,
        shown.bucket,
        if shown.from_cache { "cached" } else { "fetched" }
    );
    if shown.fixtures.is_empty() {
        println!("No fixtures");
    }
    for fixture in &shown.fixtures {
        println!("{}", format_fixture(fixture, &zone));
    }
    if !shown.deferred.is_empty() {
        println!("Awaiting status update (check {}):", shown.date.succ_opt().unwrap_or(shown.date));
        for fixture in &shown.deferred {
            println!("{}", format_fixture(fixture, &zone));
        }
    }
    Ok(())
}

fn format_fixture(fixture: &Fixture, zone: &ViewerZone) -> String {
    let kickoff = fixture
        .kickoff()
        .map(|at| at.with_timezone(&zone.offset_at(at)).format("%H:%M").to_string())
        .unwrap_or_else(|_| "--:--".to_string());
    let score = match (fixture.score_home, fixture.score_away) {
        (Some(home), Some(away)) => format!("{home}-{away}"),
        _ => "-".to_string(),
    };
    format!(
        "{kickoff}  {:<24} {:^5} {:<24} [{}]",
        fixture.home_team.name, score, fixture.away_team.name, fixture.status.code
    )
}
