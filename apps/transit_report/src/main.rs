use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use kairos::{
    AnalyticEphemeris, EphemerisBackend, HouseSystemKind, NatalChartBuilder, OrbPolicy,
    PositionProvider, ReportRunner,
};
use kairos_config::{BackendChoice, KairosSettings};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Transit report for a natal chart, printed as JSON")]
struct Args {
    /// Birth instant, RFC 3339 (e.g. 1990-05-15T12:00:00Z).
    #[arg(long)]
    birth: DateTime<Utc>,

    /// Birth latitude, degrees north.
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    /// Birth longitude, degrees east.
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,

    /// Report start (default: now).
    #[arg(long)]
    now: Option<DateTime<Utc>>,

    /// Days to search forward (default from config, else 365).
    #[arg(long)]
    horizon_days: Option<f64>,

    /// Comma-separated body ids (default from config, else the outer planets).
    #[arg(long, value_delimiter = ',')]
    bodies: Vec<String>,

    /// Config file (default: configs/kairos.toml if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use one orb for every pair instead of per-category orbs.
    #[arg(long)]
    flat_orb: Option<f64>,

    /// placidus, porphyry or equal.
    #[arg(long)]
    house_system: Option<HouseSystemKind>,

    /// Stop waiting for bodies after this many seconds.
    #[arg(long)]
    deadline_secs: Option<u64>,

    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Output<'a> {
    backend: &'a str,
    now: DateTime<Utc>,
    horizon_days: f64,
    natal: &'a kairos::NatalChart,
    bodies: BTreeMap<kairos::CelestialBody, kairos::BodyOutcome>,
}

fn apply_overrides(args: &Args, settings: &mut KairosSettings) -> anyhow::Result<()> {
    if let Some(orb) = args.flat_orb {
        if !orb.is_finite() || orb <= 0.0 {
            anyhow::bail!("--flat-orb must be positive, got {orb}");
        }
        settings.orbs = OrbPolicy::Flat(orb);
    }
    if let Some(kind) = args.house_system {
        settings.house_system = kind;
    }
    if let Some(days) = args.horizon_days {
        settings.horizon_days = days;
    }
    if !args.bodies.is_empty() {
        settings.bodies = kairos_config::parse_bodies(&args.bodies)?;
    }
    if let Some(secs) = args.deadline_secs {
        settings.limits.deadline = Some(Duration::from_secs(secs));
    }
    Ok(())
}

async fn run_with<B>(backend: B, args: &Args, settings: &KairosSettings) -> anyhow::Result<String>
where
    B: EphemerisBackend + Send + Sync + 'static,
{
    let provider = Arc::new(PositionProvider::new(backend).with_velocity_step(settings.search.velocity_step_days));
    let builder = NatalChartBuilder::new(provider.as_ref())
        .house_system(settings.house_system)
        .backend_cusps(provider.backend());
    let natal = if settings.fallback_to_equal {
        builder.build_with_fallback(args.birth, args.lat, args.lon)
    } else {
        builder.build(args.birth, args.lat, args.lon)
    }
    .context("Failed to build natal chart")?;
    let natal = Arc::new(natal);

    let now = args.now.unwrap_or_else(Utc::now);
    let runner = ReportRunner::new(Arc::clone(&provider), Arc::clone(&natal), settings.report_config())
        .with_limits(settings.limits);
    let bodies = runner.run(&settings.bodies, now, settings.horizon_days).await;

    let failed = bodies.values().filter(|o| !o.is_complete()).count();
    if failed > 0 {
        log::warn!("{} of {} bodies failed", failed, bodies.len());
    }

    let output = Output {
        backend: provider.backend().name(),
        now,
        horizon_days: settings.horizon_days,
        natal: &natal,
        bodies,
    };
    let json = if args.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    Ok(json)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut settings = kairos_config::load_settings(args.config.as_deref())?;
    apply_overrides(&args, &mut settings)?;

    let json = match &settings.backend {
        BackendChoice::Analytic => run_with(AnalyticEphemeris::new(), &args, &settings).await?,
        #[cfg(feature = "swisseph")]
        BackendChoice::SwissEphemeris { path } => {
            let adapter = kairos::SwissEphemerisAdapter::new(path.clone())?;
            run_with(adapter, &args, &settings).await?
        }
        #[cfg(not(feature = "swisseph"))]
        BackendChoice::SwissEphemeris { .. } => {
            anyhow::bail!("Config asks for the swisseph backend; rebuild with --features swisseph")
        }
    };
    println!("{json}");
    Ok(())
}
