use argus_core::CaseStatus;
use argus_engine::{EngineConfig, Scenario, SurveillanceEngine, TradeRecord};
use log::{error, info, warn};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncBufReadExt, BufReader};

fn print_help() {
    eprintln!(
        r#"Argus - trade surveillance engine

USAGE:
    argus-engine [OPTIONS]

OPTIONS:
    --config <PATH>       Load engine configuration from JSON file
    --rules <DIR>         Override the rules directory
    --scenario <NAME>     Inject a canned scenario: normal, spoofing, wash, all
    --help                Print this help message

Without --scenario, trade batches are read from stdin, one JSON array of
trade records per line.

ENVIRONMENT VARIABLES:
    RUST_LOG              Log level filter (default: info)

EXAMPLES:
    # Replay the spoofing scenario with bundled rules
    argus-engine --rules rules --scenario spoofing

    # Feed batches from a file
    argus-engine --config config/argus.json < trades.ndjson
"#
    );
}

fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

async fn run_scenarios(engine: &SurveillanceEngine, scenarios: &[Scenario]) {
    let window_ns = engine.config().window_ns();
    let now = now_ns();
    let t0 = now - now.rem_euclid(window_ns);

    for (k, scenario) in scenarios.iter().enumerate() {
        info!("Injecting {} scenario", scenario);
        let records = scenario.records(t0 + k as i64 * window_ns);
        let ack = engine.ingest(records).await;
        info!(
            "{} scenario: {} ({} case(s) opened)",
            scenario, ack.message, ack.cases_opened
        );
    }
}

async fn run_stdin(engine: &SurveillanceEngine) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Vec<TradeRecord>>(&line) {
            Ok(records) => {
                let ack = engine.ingest(records).await;
                if ack.success {
                    info!("Batch {}: {} ({} case(s) opened)", line_no, ack.message, ack.cases_opened);
                } else {
                    warn!("Batch {} rejected: {}", line_no, ack.message);
                }
            }
            Err(e) => warn!("Batch {}: invalid JSON: {}", line_no, e),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;
    let mut rules_dir: Option<String> = None;
    let mut scenarios: Vec<Scenario> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
                config_path = Some(args[i].clone());
            }
            "--rules" | "-r" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --rules requires a directory argument");
                    std::process::exit(1);
                }
                rules_dir = Some(args[i].clone());
            }
            "--scenario" | "-s" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --scenario requires a name");
                    std::process::exit(1);
                }
                if args[i] == "all" {
                    scenarios.extend(Scenario::ALL);
                } else {
                    match args[i].parse::<Scenario>() {
                        Ok(s) => scenarios.push(s),
                        Err(e) => {
                            eprintln!("Error: {}", e);
                            std::process::exit(1);
                        }
                    }
                }
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut config = match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            EngineConfig::from_file(&path)?
        }
        None => {
            info!("Using default configuration");
            EngineConfig::default()
        }
    };
    if let Some(dir) = rules_dir {
        config.rules_dir = dir.into();
    }

    let engine = Arc::new(SurveillanceEngine::from_config(config)?);

    let mut trades = engine.subscribe_trades();
    let trade_task = tokio::spawn(async move {
        let mut seen = 0u64;
        while let Some(trade) = trades.recv().await {
            seen += 1;
            info!(
                "[trade] {} {} {} {} @ {} on {}",
                trade.participant_id,
                trade.side,
                trade.quantity,
                trade.instrument,
                trade.price,
                trade.venue
            );
        }
        if trades.dropped() > 0 {
            warn!("Trade stream dropped {} message(s)", trades.dropped());
        }
        seen
    });

    let mut cases = engine.subscribe_cases();
    let case_task = tokio::spawn(async move {
        let mut seen = 0u64;
        while let Some(case) = cases.recv().await {
            seen += 1;
            info!(
                "[case] {} {} priority {} score {:.3} for {} on {}",
                case.id,
                case.status,
                case.priority,
                case.anomaly_score,
                case.participant_id,
                case.instrument
            );
            for alert in &case.alerts {
                info!("[case]   {}", serde_json::to_string(alert).unwrap_or_default());
            }
        }
        seen
    });

    if scenarios.is_empty() {
        info!("Reading trade batches from stdin");
        if let Err(e) = run_stdin(&engine).await {
            error!("Failed reading stdin: {}", e);
        }
    } else {
        run_scenarios(&engine, &scenarios).await;
    }

    engine.shutdown();
    let trades_seen = trade_task.await?;
    let cases_seen = case_task.await?;

    info!("Streamed {} trade(s) and {} case(s)", trades_seen, cases_seen);
    info!(
        "Cases: {} open, {} investigating, {} closed",
        engine.list_cases(Some(CaseStatus::Open)).len(),
        engine.list_cases(Some(CaseStatus::Investigate)).len(),
        engine.list_cases(Some(CaseStatus::Closed)).len()
    );
    Ok(())
}
