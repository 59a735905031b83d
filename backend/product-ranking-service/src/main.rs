use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use product_ranking::config::Config;
use product_ranking::db::create_pool;
use product_ranking::{
    InMemoryOrderedSetStore, InMemoryRankingLedger, MemberCodec, OrderedSetStore, PgRankingLedger,
    PipelineOrchestrator, RankingKey, RankingLedger, RankingReader, RankingScheduler,
    RedisOrderedSetStore,
};
use std::env;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Service run mode
#[derive(Debug, Clone, PartialEq)]
enum RunMode {
    /// Default: fire the pipeline once a day
    Scheduler,
    /// Run the pipeline once and exit
    Run,
}

#[derive(Debug)]
struct Args {
    mode: RunMode,
    date: Option<NaiveDate>,
    dry_run: bool,
}

impl RunMode {
    fn from_args(args: &[String]) -> Self {
        for i in 0..args.len() {
            if args[i] == "--mode" && i + 1 < args.len() {
                return match args[i + 1].as_str() {
                    "run" => RunMode::Run,
                    "scheduler" => RunMode::Scheduler,
                    _ => {
                        warn!("Unknown mode '{}', using default 'scheduler'", args[i + 1]);
                        RunMode::Scheduler
                    }
                };
            }
        }

        RunMode::Scheduler
    }
}

impl Args {
    fn parse() -> Result<Self> {
        let args: Vec<String> = env::args().collect();

        let mut date = None;
        for i in 0..args.len() {
            if args[i] == "--date" {
                let raw = args.get(i + 1).context("--date requires a value (YYYY-MM-DD)")?;
                date = Some(
                    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                        .with_context(|| format!("invalid --date '{}'", raw))?,
                );
            }
        }

        Ok(Self {
            mode: RunMode::from_args(&args),
            date,
            dry_run: args.iter().any(|a| a == "--dry-run"),
        })
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "product_ranking=info,product_ranking_service=info,sqlx=warn".into());

    let json = env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler, listening for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
        }
    }
}

async fn build_backends(
    config: &Config,
    dry_run: bool,
) -> Result<(Arc<dyn OrderedSetStore>, Arc<dyn RankingLedger>)> {
    if dry_run {
        info!("Dry run: using in-memory store and ledger");
        let store: Arc<dyn OrderedSetStore> = Arc::new(InMemoryOrderedSetStore::new());
        let ledger: Arc<dyn RankingLedger> = Arc::new(InMemoryRankingLedger::new());
        return Ok((store, ledger));
    }

    let store = RedisOrderedSetStore::connect(&config.redis.url)
        .await
        .context("Failed to connect to Redis")?;

    let pool = create_pool(&config.database, &config.service.service_name)
        .await
        .context("Failed to create database pool")?;
    let ledger = PgRankingLedger::new(pool);

    if config.database.run_migrations {
        ledger.migrate().await.context("Failed to run migrations")?;
    }

    let store: Arc<dyn OrderedSetStore> = Arc::new(store);
    let ledger: Arc<dyn RankingLedger> = Arc::new(ledger);
    Ok((store, ledger))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse()?;
    info!(
        "Starting product-ranking-service in {:?} mode (dry_run={})",
        args.mode, args.dry_run
    );

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;
    info!(?config, "Configuration loaded");

    let (store, ledger) = build_backends(&config, args.dry_run).await?;

    let reader = Arc::new(RankingReader::new(
        store,
        ledger.clone(),
        RankingKey::new(config.ranking.key_prefix.clone()),
        MemberCodec::new(config.ranking.member_width),
    ));
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        reader,
        ledger,
        config.ranking.daily_top_n,
    ));

    match args.mode {
        RunMode::Run => {
            let date = args.date.unwrap_or_else(|| {
                Utc::now()
                    .with_timezone(&config.schedule.offset)
                    .date_naive()
            });

            let report = orchestrator
                .run(date)
                .await
                .with_context(|| format!("Ranking pipeline failed for {}", date))?;

            info!(
                run_id = %report.run_id,
                date = %report.date,
                daily_rows = report.daily.rows_written(),
                weekly = report.weekly.as_str(),
                monthly = report.monthly.as_str(),
                "Ranking run finished"
            );
        }
        RunMode::Scheduler => {
            let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
            tokio::spawn(async move {
                shutdown_signal().await;
                let _ = shutdown_tx.send(());
            });

            RankingScheduler::new(orchestrator, config.schedule)
                .run(shutdown_rx)
                .await;
        }
    }

    info!("product-ranking-service shutting down");
    Ok(())
}
