//! mosaic-composer: temporal mosaic retrieval for an area of interest.
//!
//! Single-binary Tokio application that:
//! 1. Lists the scenes available for a polygon, layer and period
//! 2. Groups them into mosaic windows
//! 3. Requests one rendered tile per window
//! 4. Caches complete result sets for repeat requests

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::Parser;
use tracing::{error, info};

use common::{
    ComposerConfig, Coordinate, Error, FetchReport, LayerType, MosaicGroup, RetrievalRequest,
    TileOutcome,
};
use imagery_client::ImageryClient;
use mosaic::{spawn_sweeper, MosaicRetriever, ResultCache};

/// Temporal mosaic composer
#[derive(Parser)]
#[command(
    name = "mosaic-composer",
    about = "Group satellite scenes into mosaics and fetch their tiles"
)]
struct Cli {
    /// Area of interest as "lat,lng;lat,lng;lat,lng" (at least three vertices).
    #[arg(long)]
    polygon: String,

    /// Layer product (SENTINEL2_RGB, LANDSAT_RGB, SENTINEL1_VV, NDVI, NDWI, LST, UHI, UTFVI).
    #[arg(long, default_value = "SENTINEL2_RGB")]
    layer: LayerType,

    /// First day of the period (YYYY-MM-DD). Defaults to one year before --end.
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day of the period (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Cloud cover ceiling in percent. Defaults to backend.cloud_filter.
    #[arg(long)]
    cloud: Option<u8>,

    /// Path to the TOML config file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// List and group the catalog only; do not render tiles (dry-run).
    #[arg(long)]
    groups_only: bool,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,

    /// Repeat the retrieval every N seconds until interrupted.
    #[arg(long)]
    watch: Option<u64>,
}

const DEFAULT_LOOKBACK_DAYS: i64 = 365;

fn parse_polygon(raw: &str) -> Result<Vec<Coordinate>, Error> {
    raw.split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (lat, lng) = pair
                .split_once(',')
                .ok_or_else(|| Error::InvalidRequest(format!("vertex '{pair}' must be 'lat,lng'")))?;
            let lat = lat
                .trim()
                .parse::<f64>()
                .map_err(|_| Error::InvalidRequest(format!("invalid latitude in '{pair}'")))?;
            let lng = lng
                .trim()
                .parse::<f64>()
                .map_err(|_| Error::InvalidRequest(format!("invalid longitude in '{pair}'")))?;
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
                return Err(Error::InvalidRequest(format!("vertex '{pair}' is out of range")));
            }
            Ok(Coordinate { lat, lng })
        })
        .collect()
}

fn build_request(
    cli: &Cli,
    config: &ComposerConfig,
    today: NaiveDate,
) -> Result<RetrievalRequest, Error> {
    let end_date = cli.end.unwrap_or(today);
    let start_date = cli
        .start
        .unwrap_or(end_date - chrono::Duration::days(DEFAULT_LOOKBACK_DAYS));

    let request = RetrievalRequest {
        area: parse_polygon(&cli.polygon)?,
        layer_type: cli.layer,
        start_date,
        end_date,
        cloud_filter: cli.cloud.unwrap_or(config.backend.cloud_filter),
    };
    request.validate()?;
    Ok(request)
}

fn print_groups(groups: &[MosaicGroup], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(groups)?);
        return Ok(());
    }
    if groups.is_empty() {
        println!("No eligible mosaic groups in the catalog.");
    }
    for (i, group) in groups.iter().enumerate() {
        println!(
            "#{:<2} {} .. {}  ({} scenes)",
            i + 1,
            group.start_date,
            group.end_date,
            group.len()
        );
    }
    Ok(())
}

fn print_report(report: &FetchReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    for result in &report.results {
        let group = &result.group;
        match &result.tile {
            TileOutcome::Ready { tile_url } => println!(
                "[ok]     {} .. {}  ({} scenes)  {}",
                group.start_date,
                group.end_date,
                group.len(),
                tile_url
            ),
            TileOutcome::Failed { reason } => println!(
                "[failed] {} .. {}  ({} scenes)  {}",
                group.start_date,
                group.end_date,
                group.len(),
                reason
            ),
        }
    }
    let source = if report.from_cache { " (cached)" } else { "" };
    println!("{}{}", report.summary(), source);
    Ok(())
}

async fn run_once(
    retriever: &MosaicRetriever,
    request: &RetrievalRequest,
    cli: &Cli,
) -> anyhow::Result<()> {
    if cli.groups_only {
        match retriever.list_groups(request).await {
            Ok(groups) => print_groups(&groups, cli.json)?,
            Err(Error::NoScenesFound) => println!("No imagery found for this area and period."),
            Err(e) => return Err(e.into()),
        }
        return Ok(());
    }

    match retriever.fetch_mosaics(request).await {
        Ok(report) => print_report(&report, cli.json)?,
        Err(Error::NoScenesFound) => println!("No imagery found for this area and period."),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mosaic_composer=info,mosaic=info,imagery_client=info".into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    let config = config::load_config(&cli.config).context("failed to load configuration")?;
    let request = build_request(&cli, &config, Utc::now().date_naive())?;

    info!(
        "Backend {} | layer={} period={}..{} cloud<={} | grouping gap<={}mo size {}..={} | cache ttl={}m",
        config.backend.base_url,
        request.layer_type,
        request.start_date,
        request.end_date,
        request.cloud_filter,
        config.grouping.gap_tolerance_months,
        config.grouping.min_group_size,
        config.grouping.max_group_size,
        config.cache.ttl_minutes
    );

    let client = Arc::new(ImageryClient::new(&config.backend)?);
    let cache = Arc::new(ResultCache::new(config.cache.max_entries));
    let sweeper = spawn_sweeper(
        cache.clone(),
        Duration::from_secs(config.cache.sweep_interval_secs),
    );
    let retriever = MosaicRetriever::new(client.clone(), client, cache, &config);

    let Some(every) = cli.watch else {
        let outcome = run_once(&retriever, &request, &cli).await;
        sweeper.abort();
        return outcome;
    };

    let mut ticker = tokio::time::interval(Duration::from_secs(every.max(1)));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = run_once(&retriever, &request, &cli).await {
                    error!("Retrieval failed: {:#}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }

    sweeper.abort();
    Ok(())
}
