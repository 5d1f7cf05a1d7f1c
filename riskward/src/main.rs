// riskward/src/main.rs
//
// Riskward — adaptive authentication and fraud-detection core for a
// multi-tenant identity platform.
//
// One subprocess runs one specialized consumer against one region's event
// feed. In production this polls a Kafka topic; here the feed is simulated
// via an mpsc channel fed from a JSONL file (tail or replay), mirroring the
// teacher's tail/replay modes while the underlying pipeline is entirely new.
//
// Usage:
//   riskward --region br --config tenants.yaml --tenant acme --consumer transaction --path events.jsonl
//   riskward --region mz --config tenants.yaml --tenant acme --consumer behavioral --path events.jsonl --replay --speed 10.0

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use riskward::config::TenantRegistry;
use riskward::consumer::{ConsumerConfig, EventConsumer, RawMessage};
use riskward::consumers;
use riskward::notifier::{Notifier, StubNotificationGateway};
use riskward::state::ContextStore;

const MEMORY_WINDOW_SECS: i64 = 3600;

#[derive(Parser)]
#[command(
    name    = "riskward",
    about   = "Adaptive authentication and fraud-detection core",
    version = env!("CARGO_PKG_VERSION"),
)]
struct Cli {
    #[arg(long, value_enum, help = "Region table to apply (ao, br, mz, pt)")]
    region: Region,

    #[arg(long, help = "Tenant registry file (YAML or JSON)")]
    config: PathBuf,

    #[arg(long, help = "Tenant id to load from the registry")]
    tenant: String,

    #[arg(long, value_enum, help = "Which specialized consumer to run")]
    consumer: ConsumerKind,

    #[arg(long, help = "JSONL event feed path (tail or replay source)")]
    path: PathBuf,

    #[arg(long, default_value_t = false, help = "Replay the file at scaled speed instead of tailing it")]
    replay: bool,

    #[arg(long, default_value = "1.0", help = "Replay speed multiplier")]
    speed: f64,
}

#[derive(Clone, ValueEnum)]
enum Region {
    Ao,
    Br,
    Mz,
    Pt,
}

impl Region {
    fn code(&self) -> &'static str {
        match self {
            Region::Ao => "AO",
            Region::Br => "BR",
            Region::Mz => "MZ",
            Region::Pt => "PT",
        }
    }
}

#[derive(Clone, ValueEnum)]
enum ConsumerKind {
    Behavioral,
    Transaction,
    Document,
}

impl ConsumerKind {
    fn topic(&self, region: &str) -> String {
        match self {
            ConsumerKind::Behavioral => format!("{}.fraud_detection.authentication", region.to_lowercase()),
            ConsumerKind::Transaction => format!("{}.fraud_detection.payment_transactions", region.to_lowercase()),
            ConsumerKind::Document => format!("{}.fraud_detection.document_validation", region.to_lowercase()),
        }
    }
}

async fn tail_jsonl(path: PathBuf, tx: mpsc::Sender<RawMessage>) -> Result<()> {
    let file = tokio::fs::File::open(&path).await?;
    let mut lines = BufReader::new(file).lines();
    let mut offset: i64 = 0;

    info!("tailing {}", path.display());
    loop {
        match lines.next_line().await? {
            Some(line) => {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                offset += 1;
                if tx.send(RawMessage { partition: 0, offset, payload: line }).await.is_err() {
                    break;
                }
            }
            None => tokio::time::sleep(tokio::time::Duration::from_millis(200)).await,
        }
    }
    Ok(())
}

async fn replay_jsonl(path: PathBuf, tx: mpsc::Sender<RawMessage>, speed: f64) -> Result<()> {
    let content = tokio::fs::read_to_string(&path).await?;
    let mut rows: Vec<(f64, String)> = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(line) {
            let ts = value
                .get("metadata")
                .and_then(|m| m.get("timestamp"))
                .and_then(|t| t.as_str())
                .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                .map(|d| d.timestamp_millis() as f64)
                .unwrap_or(0.0);
            rows.push((ts, line.to_string()));
        }
    }
    if rows.is_empty() {
        return Ok(());
    }
    rows.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

    let base_ts = rows[0].0;
    let base_wall = std::time::Instant::now();

    for (offset, (ts, payload)) in rows.into_iter().enumerate() {
        let delay = ((ts - base_ts) / speed / 1000.0).max(0.0);
        let target = base_wall + std::time::Duration::from_secs_f64(delay);
        let now = std::time::Instant::now();
        if target > now {
            tokio::time::sleep(target - now).await;
        }
        if tx.send(RawMessage { partition: 0, offset: offset as i64, payload }).await.is_err() {
            break;
        }
    }
    Ok(())
}

fn print_banner(region: &str, consumer: &str) {
    println!("\x1b[1mriskward\x1b[0m — adaptive authentication & fraud-detection core");
    println!("  region   : \x1b[96m{}\x1b[0m", region);
    println!("  consumer : \x1b[96m{}\x1b[0m\n", consumer);
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("riskward=info".parse()?))
        .compact()
        .init();

    let cli = Cli::parse();
    let region_code = cli.region.code();

    let registry = TenantRegistry::load(&cli.config)?;
    let tenant = registry
        .get(&cli.tenant)
        .ok_or_else(|| anyhow::anyhow!("unknown tenant: {}", cli.tenant))?
        .clone();

    print_banner(
        region_code,
        match cli.consumer {
            ConsumerKind::Behavioral => "behavioral",
            ConsumerKind::Transaction => "transaction",
            ConsumerKind::Document => "document",
        },
    );

    let store = Arc::new(ContextStore::new(MEMORY_WINDOW_SECS));
    tokio::spawn(Arc::clone(&store).housekeeping_loop());

    let (alerts_tx, mut alerts_rx) = mpsc::channel(1024);
    let gateway = Arc::new(StubNotificationGateway);
    let notifier = Arc::new(Notifier::new(gateway, Vec::new()));
    let notifier_for_loop = Arc::clone(&notifier);
    tokio::spawn(async move {
        while let Some(alert) = alerts_rx.recv().await {
            let result = notifier_for_loop.dispatch(&alert, 3, 200).await;
            if !result.success {
                warn!(alert_id = %alert.alert_id, failures = ?result.failures, "alert dispatch incomplete");
            }
        }
    });

    let topic = cli.consumer.topic(region_code);
    let config = ConsumerConfig::new(format!("riskward-{}", cli.tenant), vec![topic]);

    let (feed_tx, feed_rx) = mpsc::channel(4096);
    let path = cli.path.clone();
    let feed_task = if cli.replay {
        tokio::spawn(replay_jsonl(path, feed_tx, cli.speed))
    } else {
        tokio::spawn(tail_jsonl(path, feed_tx))
    };

    let run_result = match cli.consumer {
        ConsumerKind::Behavioral => {
            let processor = consumers::behavioral::BehavioralConsumerProcessor::new(store, tenant, alerts_tx);
            let consumer = EventConsumer::new(config, processor);
            consumer.run(feed_rx).await
        }
        ConsumerKind::Transaction => {
            let processor = consumers::transaction::TransactionConsumerProcessor::new(store, tenant, alerts_tx);
            let consumer = EventConsumer::new(config, processor);
            consumer.run(feed_rx).await
        }
        ConsumerKind::Document => {
            let processor = consumers::document::DocumentConsumerProcessor::new(store, tenant, alerts_tx);
            let consumer = EventConsumer::new(config, processor);
            consumer.run(feed_rx).await
        }
    };

    feed_task.abort();
    if let Err(e) = run_result {
        error!(error = %e, "consumer stopped with an error");
    }

    Ok(())
}
