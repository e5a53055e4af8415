use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use etfpick_core::store::FundamentalsStore;

mod scores;

#[derive(Debug, Parser)]
#[command(name = "etfpick_worker")]
struct Args {
    /// Directory holding fundamentals.csv. Defaults to DATA_DIR.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Output path for the score export. Defaults to <data_dir>/scores.csv.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Compute scores but skip writing the export.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = etfpick_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let data_dir = match args.data_dir {
        Some(d) => d,
        None => PathBuf::from(settings.require_data_dir()?),
    };
    let out_path = args.out.unwrap_or_else(|| data_dir.join("scores.csv"));

    let fundamentals = FundamentalsStore::load(&data_dir);
    anyhow::ensure!(
        !fundamentals.is_empty(),
        "no instruments loaded from {}",
        data_dir.display()
    );

    if args.dry_run {
        let csv = scores::render_csv(&fundamentals);
        tracing::info!(
            instruments = fundamentals.len(),
            bytes = csv.len(),
            dry_run = true,
            "score export computed (not written)"
        );
        return Ok(());
    }

    let written = match scores::write_csv(&fundamentals, &out_path)
        .with_context(|| format!("score export to {} failed", out_path.display()))
    {
        Ok(n) => n,
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            return Err(err);
        }
    };

    tracing::info!(
        instruments = written,
        out = %out_path.display(),
        "score export written"
    );
    Ok(())
}

fn init_sentry(settings: &etfpick_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
