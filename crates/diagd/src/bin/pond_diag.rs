//! Pond diagnosis CLI
//!
//! Runs the diagnosis core against a workbook file (JSON or YAML tables).
//!
//! Usage:
//!   pond-diag --workbook farm.yaml diagnose
//!   pond-diag --workbook farm.yaml --settings engine.yaml oxygen
//!   pond-diag --workbook farm.yaml troubleshoot drift_up
//!   pond-diag --workbook farm.yaml confusion --store predictions.jsonl DO
//!   pond-diag --workbook farm.yaml --settings engine.yaml monitor

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pond_core::Reading;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use pond_diagd::report::{
    render_aeration, render_calibration, render_confusion, render_detail, render_guide,
    render_summary, render_trend,
};
use pond_diagd::trend::ReadingColumns;
use pond_diagd::validation::InMemoryPredictionStore;
use pond_diagd::{
    AcidityAnalyzer, AcidityFault, AerationAdvisor, AutoDiagnosisMonitor, Clock, DiagnosisEngine,
    DiagnosisReport, EngineSettings, JsonlPredictionStore, LogSink, PredictionStore, SystemClock,
    TabularDataSource, TrendAnalyzer, ValidationTracker, WorkbookFile,
};

/// Pond diagnosis - rule evaluation, matrix scoring and sensor trends
#[derive(Parser, Debug)]
#[command(name = "pond-diag")]
#[command(about = "Decision support for pond monitoring")]
struct Args {
    /// Workbook file with the config and sensor tables (.json, .yaml)
    #[arg(long)]
    workbook: PathBuf,

    /// Engine settings file (.json, .yaml)
    #[arg(long)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Emergencies and ranked diagnosis
    Diagnose,
    /// Score breakdown and every rule outcome
    Detail,
    /// Dissolved-oxygen trend
    Oxygen,
    /// pH trend and sensor fault check
    Acidity,
    /// DO trend plus aerator sizing for the reference pond
    Aeration,
    /// pH sensor troubleshooting guide (all guides when no fault is given)
    Troubleshoot { fault: Option<String> },
    /// Confusion matrix for one prediction type
    Confusion {
        /// Prediction journal (JSONL)
        #[arg(long)]
        store: Option<PathBuf>,
        category: String,
    },
    /// Diagnose the newest sensor row: log the result, notify emergencies
    Monitor,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pond_diagd=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let settings = match &args.settings {
        Some(path) => EngineSettings::load(path)?,
        None => EngineSettings::default(),
    };
    let workbook = WorkbookFile::load(&args.workbook)
        .with_context(|| format!("loading workbook {}", args.workbook.display()))?;
    let source: Arc<dyn TabularDataSource> = Arc::new(workbook);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    match args.command {
        Command::Diagnose => {
            let engine = DiagnosisEngine::from_settings(&settings, Arc::clone(&source), clock);
            print!("{}", render_summary(&diagnose(&engine)?));
        }
        Command::Detail => {
            let engine = DiagnosisEngine::from_settings(&settings, Arc::clone(&source), clock);
            print!("{}", render_detail(&diagnose(&engine)?));
        }
        Command::Oxygen => {
            let history = readings(source.as_ref(), &settings.sensor_table, &settings.oxygen.keyword);
            let analyzer = TrendAnalyzer::new(settings.oxygen.profile(), clock);
            print!("{}", render_trend("DO", "mg/L", &analyzer.analyze(&history)));
        }
        Command::Acidity => {
            let history = readings(source.as_ref(), &settings.sensor_table, &settings.acidity.keyword);
            let analyzer = AcidityAnalyzer::new(settings.acidity.clone(), clock);
            print!("{}", render_calibration(&analyzer.calibration_status(&history)));
        }
        Command::Aeration => {
            let history = readings(source.as_ref(), &settings.sensor_table, &settings.oxygen.keyword);
            let advisor = AerationAdvisor::new(settings.pond.clone(), &settings.oxygen, clock);
            print!("{}", render_aeration(&advisor.recommend(&history)?));
        }
        Command::Troubleshoot { fault } => match fault {
            Some(name) => {
                let Some(fault) = AcidityFault::parse(&name) else {
                    let known: Vec<&str> = AcidityFault::GUIDED.iter().map(|f| f.as_str()).collect();
                    bail!("unknown fault '{}', expected one of: {}", name, known.join(", "));
                };
                print!("{}", render_guide(fault, fault.guide()));
            }
            None => {
                for fault in AcidityFault::GUIDED {
                    println!("{}", render_guide(fault, fault.guide()));
                }
            }
        },
        Command::Confusion { store, category } => {
            let store: Arc<dyn PredictionStore> = match store.or(settings.validation.store_path.clone()) {
                Some(path) => Arc::new(
                    JsonlPredictionStore::open(&path)
                        .with_context(|| format!("opening prediction journal {}", path.display()))?,
                ),
                None => Arc::new(InMemoryPredictionStore::new()),
            };
            let tracker = ValidationTracker::new(store, clock)
                .with_min_validated(settings.validation.min_validated);
            print!("{}", render_confusion(&tracker.build_confusion_matrix(&category)?));
        }
        Command::Monitor => {
            let engine = DiagnosisEngine::from_settings(&settings, Arc::clone(&source), clock);
            let report = diagnose(&engine)?;
            let monitor = AutoDiagnosisMonitor::from_settings(
                settings.monitor.clone(),
                Arc::new(LogSink::new("monitor")),
            )
            .context("opening diagnosis event log")?;

            let history = readings(source.as_ref(), &settings.sensor_table, &settings.oxygen.keyword);
            let observation = match history.last() {
                Some(latest) => monitor.observe_reading(latest, &report),
                None => monitor.observe(&report),
            };
            println!(
                "logged: {}, notified: {}",
                observation.logged, observation.notified
            );
        }
    }

    Ok(())
}

fn diagnose(engine: &DiagnosisEngine) -> Result<DiagnosisReport> {
    match engine.run() {
        Ok(report) => Ok(report),
        Err(e) => bail!("{} ({})", e, e.report().code.as_str()),
    }
}

/// Time-ordered readings for one instrument; empty when the table is missing.
fn readings(source: &dyn TabularDataSource, table: &str, keyword: &str) -> Vec<Reading> {
    match source.get_table(table) {
        Ok(table) => ReadingColumns::new(keyword).extract(&table),
        Err(e) => {
            warn!(table, error = %e, "Cannot read sensor table");
            Vec::new()
        }
    }
}
