//! Resale Atlas CLI
//!
//! Drives the dashboard headlessly against the API or a fixtures
//! directory and prints what the map and chart would show.
//!
//! ## Usage
//!
//! ```bash
//! atlas summary
//! atlas select --town BEDOK --town TAMPINES --flat-type "5 ROOM"
//! atlas --fixtures demos/fixtures marker --street "BEDOK RD" --town BEDOK
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use atlas_config::AtlasConfig;
use atlas_core::{FlatType, PRICE_SCALE};
use atlas_dashboard::{ChartSummary, ColorMode, Dashboard, DashboardStatus};
use atlas_fetch::{HttpPriceSource, LoadPhase, MemorySource, PriceSource};
use atlas_highlight::{RecordingChart, RecordingMap};
use atlas_selection::{completion_timeline, flat_type_options, property_count, town_options};

type HeadlessDashboard = Dashboard<RecordingMap, RecordingChart>;

#[derive(Parser)]
#[command(name = "atlas")]
#[command(about = "Resale Atlas - HDB resale map and price chart, headless")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Serve wire files from this directory instead of the API
    #[arg(long, global = true)]
    fixtures: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the base datasets and summarise them
    Summary,

    /// Select towns and show the resulting chart and highlights
    Select {
        /// Town to toggle, repeatable
        #[arg(short, long = "town")]
        towns: Vec<String>,

        #[arg(long)]
        flat_type: Option<String>,

        /// First completion year shown on the map
        #[arg(long)]
        from: Option<i32>,

        /// Last completion year shown on the map
        #[arg(long)]
        to: Option<i32>,

        /// Marker colouring: type, age or price
        #[arg(long, default_value = "type")]
        color_mode: ColorMode,
    },

    /// Simulate a click on a map marker
    Marker {
        #[arg(long)]
        street: String,

        #[arg(long)]
        town: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atlas=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AtlasConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let source = build_source(&config, cli.fixtures.as_deref())?;

    match cli.command {
        Commands::Summary => cmd_summary(&config, source, cli.json).await,
        Commands::Select {
            towns,
            flat_type,
            from,
            to,
            color_mode,
        } => cmd_select(&config, source, towns, flat_type, from, to, color_mode, cli.json).await,
        Commands::Marker { street, town } => cmd_marker(&config, source, &street, &town, cli.json).await,
    }
}

fn build_source(config: &AtlasConfig, fixtures: Option<&Path>) -> Result<Arc<dyn PriceSource>> {
    match fixtures {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "serving fixtures");
            let source = MemorySource::from_dir(dir)
                .with_context(|| format!("reading fixtures from {}", dir.display()))?;
            Ok(Arc::new(source))
        }
        None => {
            tracing::info!(endpoint = %config.api.endpoint, "using API");
            Ok(Arc::new(HttpPriceSource::from_config(&config.api)?))
        }
    }
}

async fn start(config: &AtlasConfig, source: Arc<dyn PriceSource>) -> Result<HeadlessDashboard> {
    let mut dash = Dashboard::new(config, source, RecordingMap::new(), RecordingChart::new())?;
    dash.start();
    dash.settle().await;

    let status = dash.status();
    if status.phase == LoadPhase::Failed {
        let message = status
            .banner
            .map(|b| b.message().to_string())
            .unwrap_or_else(|| "base load failed".to_string());
        anyhow::bail!(message);
    }
    Ok(dash)
}

#[derive(Serialize)]
struct Summary {
    properties: usize,
    town_prices: usize,
    boundaries: usize,
    address_prices: usize,
    towns: Vec<String>,
    flat_types: Vec<FlatType>,
    in_year_range: usize,
    completions: Vec<(String, usize)>,
}

async fn cmd_summary(config: &AtlasConfig, source: Arc<dyn PriceSource>, json: bool) -> Result<()> {
    let dash = start(config, source).await?;
    let data = dash.coordinator().data();
    let range = dash.selection().year_range();

    let summary = Summary {
        properties: data.properties.len(),
        town_prices: data.town_prices.len(),
        boundaries: data.boundaries.len(),
        address_prices: data.address_prices.len(),
        towns: town_options(&data.properties),
        flat_types: flat_type_options(&data.town_prices),
        in_year_range: property_count(&data.properties, dash.selection()),
        completions: completion_timeline(&data.properties, range.start(), range.end() + 1)
            .into_iter()
            .map(|series| {
                let total = series.points.last().map(|(_, n)| *n).unwrap_or(0);
                (series.tag.label().to_string(), total)
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("\n  RESALE ATLAS");
    println!("  Properties:      {}", summary.properties);
    println!("  Town prices:     {}", summary.town_prices);
    println!("  Boundaries:      {}", summary.boundaries);
    println!("  Address prices:  {}", summary.address_prices);
    println!("  Completed {}-{}: {}", range.start(), range.end(), summary.in_year_range);

    println!("\n  TOWNS ({})", summary.towns.len().saturating_sub(1));
    for town in &summary.towns {
        println!("    {}", town);
    }

    println!("\n  FLAT TYPES");
    for flat_type in &summary.flat_types {
        println!("    {}", flat_type);
    }

    println!("\n  COMPLETIONS BY CATEGORY");
    for (tag, total) in &summary.completions {
        println!("    {:<24} {}", tag, total);
    }

    println!("\n  PRICE LEGEND");
    for entry in PRICE_SCALE.legend() {
        println!("    {:<12} {}", entry.label, entry.color);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn cmd_select(
    config: &AtlasConfig,
    source: Arc<dyn PriceSource>,
    towns: Vec<String>,
    flat_type: Option<String>,
    from: Option<i32>,
    to: Option<i32>,
    color_mode: ColorMode,
    json: bool,
) -> Result<()> {
    let mut dash = start(config, source).await?;

    if let Some(flat_type) = flat_type {
        dash.set_flat_type(FlatType::from(flat_type));
    }
    if from.is_some() || to.is_some() {
        let current = dash.selection().year_range();
        dash.set_year_range(from.unwrap_or(current.start()), to.unwrap_or(current.end()))?;
    }
    dash.set_color_mode(color_mode);

    for town in &towns {
        dash.select_town(town);
    }
    dash.settle().await;

    print_status(&dash, json)
}

async fn cmd_marker(
    config: &AtlasConfig,
    source: Arc<dyn PriceSource>,
    street: &str,
    town: &str,
    json: bool,
) -> Result<()> {
    let mut dash = start(config, source).await?;
    let change = dash.click_map_marker(street, town);
    tracing::info!(?change, "marker clicked");
    dash.settle().await;

    print_status(&dash, json)
}

fn print_status(dash: &HeadlessDashboard, json: bool) -> Result<()> {
    let status = dash.status();
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    print_selection(&status);
    print_chart(&status.chart);

    println!("\n  MAP");
    println!("    Markers:     {} ({} visible)", status.markers, dash.map().visible_features(atlas_dashboard::MARKER_LAYER).len());
    println!("    Colour mode: {}", status.color_mode);
    println!("    Highlights:  {}", join_or_none(&status.highlighted));
    println!("    Chart keys:  {}", join_or_none(&status.chart_keys));
    if let Some(camera) = dash.map().camera() {
        println!("    Camera:      {}", serde_json::to_string(camera)?);
    }
    if dash.map().violations() > 0 {
        for violation in dash.map().violation_log() {
            println!("    ! {}", violation);
        }
    }

    if let Some(banner) = &status.banner {
        println!("\n  ERROR: {}", banner.message());
    }
    Ok(())
}

fn print_selection(status: &DashboardStatus) {
    println!("\n  SELECTION");
    println!("    Dropdown:   {}", status.town_label);
    println!("    Towns:      {}", join_or_none(&status.towns));
    println!("    View mode:  {}", status.view_mode);
    println!("    Flat type:  {}", status.flat_type);
    println!(
        "    Years:      {}-{}",
        status.year_range.start(),
        status.year_range.end()
    );
}

fn print_chart(chart: &ChartSummary) {
    println!("\n  CHART");
    match chart {
        ChartSummary::Loading => println!("    (loading)"),
        ChartSummary::Failed => println!("    (unavailable)"),
        ChartSummary::Ready {
            group_key,
            groups,
            records,
            top,
            bottom,
        } => {
            println!("    {} series by {}, {} points", groups.len(), group_key, records);
            if groups.is_empty() {
                println!("    (no data for this selection)");
            }
            for stat in top {
                println!("    ▲ {:<28} {:>10.0}", stat.name, stat.mean_price);
            }
            for stat in bottom {
                println!("    ▼ {:<28} {:>10.0}", stat.name, stat.mean_price);
            }
        }
    }
}

fn join_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}
