//! Wiring & DI. Entry point: bootstrap adapters, inject into services, dispatch command.
//! No business logic here.
//!
//! Usage:
//!   payout-gate check <expense-id>...
//!   payout-gate report <host-id> <year> [out.csv]
//!   payout-gate seed <fixture.json>
//!   payout-gate                      (interactive menu)

use dotenv::dotenv;
use payout_gate::adapters::persistence::{Fixture, SqliteRepo};
use payout_gate::adapters::report::report_to_csv;
use payout_gate::adapters::ui::output::{decision_lines, parse_expense_ids};
use payout_gate::adapters::ui::tui::TuiInputPort;
use payout_gate::ports::{ComplianceRepoPort, InputPort};
use payout_gate::shared::config::AppConfig;
use payout_gate::usecases::{LegalDocumentEvaluator, ReportService};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!("no .env found"),
    }

    let cfg = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "config could not be loaded, using defaults");
        AppConfig::default()
    });
    let policy = cfg
        .document_policy()
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    info!(
        threshold_cents = policy.us_tax_form_threshold_cents,
        "US tax form threshold"
    );

    let data_path = PathBuf::from(cfg.data_dir_or_default());
    let sqlite_repo = Arc::new(
        SqliteRepo::connect(&data_path)
            .await
            .map_err(|e| anyhow::anyhow!("SQLite connect failed: {}", e))?,
    );
    let repo: Arc<dyn ComplianceRepoPort> = Arc::clone(&sqlite_repo) as Arc<dyn ComplianceRepoPort>;

    let evaluator = Arc::new(LegalDocumentEvaluator::new(Arc::clone(&repo), policy));
    let reports = Arc::new(ReportService::new(Arc::clone(&repo), Arc::clone(&evaluator)));

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("check") => {
            let ids = parse_expense_ids(&args[1..].join(" ")).map_err(|e| anyhow::anyhow!("{}", e))?;
            let scope = evaluator.scope();
            let outcomes = scope.required_legal_document_types_many(&ids).await;
            for line in decision_lines(&ids, &outcomes).map_err(|e| anyhow::anyhow!("{}", e))? {
                println!("{}", line);
            }
        }
        Some("report") => {
            let (host_id, year) = match (args.get(1), args.get(2)) {
                (Some(h), Some(y)) => (h.parse::<i64>()?, y.parse::<i32>()?),
                _ => anyhow::bail!("usage: payout-gate report <host-id> <year> [out.csv]"),
            };
            let rows = reports
                .outstanding_for_host(host_id, year)
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            let csv = report_to_csv(&rows).map_err(|e| anyhow::anyhow!("{}", e))?;
            match args.get(3) {
                Some(out) => {
                    tokio::fs::write(out, csv).await?;
                    info!(path = %out, rows = rows.len(), "report written");
                }
                None => print!("{}", csv),
            }
        }
        Some("seed") => {
            let Some(path) = args.get(1) else {
                anyhow::bail!("usage: payout-gate seed <fixture.json>");
            };
            let fixture = Fixture::load(path)
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            sqlite_repo
                .import(&fixture)
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            info!(db = %sqlite_repo.path().display(), "seed complete");
        }
        Some(other) => anyhow::bail!("unknown command '{}' (expected check, report or seed)", other),
        None => {
            payout_gate::adapters::ui::init_ui();
            let input_port: Arc<dyn InputPort> = Arc::new(TuiInputPort::new(evaluator, reports));
            input_port
                .run()
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;
        }
    }

    Ok(())
}
