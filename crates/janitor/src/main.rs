//! janitor - SQL endpoint janitor
//!
//! Entry point for a single cleanup run. It wires together:
//! - Configuration loading
//! - Store initialization
//! - One HTTP control-plane client per workspace
//! - The core pass (provisioning + retention)
//! - Report output

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use janitor_api::{RunReport, WorkspaceReport};
use janitor_config::{load_config, WorkspaceConfig};
use janitor_core::{render_html, render_text, Janitor};
use janitor_databricks::HttpWorkspaceClient;
use janitor_store::{AuditEvent, AuditEventType, SqliteStore, Store};
use janitor_util::{default_config_path, RunId};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// janitor - provisions shared SQL endpoints and removes lapsed ones
#[derive(Parser, Debug)]
#[command(name = "janitor")]
#[command(about = "Provisions shared SQL endpoints and deletes stopped endpoints whose lifecycle tags have lapsed", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/janitor/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set JANITOR_DATA_DIR env var)
    #[arg(short, long, env = "JANITOR_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Report directory override
    #[arg(short, long)]
    report_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Evaluate and report without creating, changing or deleting anything
    #[arg(long)]
    dry_run: bool,

    /// Only process the named workspace
    #[arg(short, long)]
    workspace: Option<String>,
}

/// Everything a run needs
struct Service {
    janitor: Janitor,
    store: Arc<dyn Store>,
    report_dir: PathBuf,
    dry_run: bool,
    only: Option<String>,
}

impl Service {
    fn new(args: &Args) -> Result<Self> {
        let policy = load_config(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            workspace_count = policy.workspaces.len(),
            "Configuration loaded"
        );

        if let Some(name) = &args.workspace {
            if policy.get_workspace(name).is_none() {
                bail!("Workspace {name:?} is not configured");
            }
        }

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| policy.service.data_dir.clone());
        let report_dir = args
            .report_dir
            .clone()
            .unwrap_or_else(|| policy.service.report_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join("janitor.db");
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        Ok(Self {
            janitor: Janitor::new(policy, store.clone()),
            store,
            report_dir,
            dry_run: args.dry_run,
            only: args.workspace.clone(),
        })
    }

    /// Workspaces to visit this run, in config order
    fn selected_workspaces(&self) -> Vec<WorkspaceConfig> {
        let policy = self.janitor.policy();
        match &self.only {
            Some(name) => policy.get_workspace(name).cloned().into_iter().collect(),
            None => {
                for skipped in policy.workspaces.iter().filter(|w| w.skip) {
                    info!(workspace = %skipped.name, "Workspace skipped by config");
                    let _ = self.store.append_audit(AuditEvent::new(
                        AuditEventType::WorkspaceSkipped {
                            workspace: skipped.name.clone(),
                        },
                    ));
                }
                policy.active_workspaces().cloned().collect()
            }
        }
    }

    async fn run(self) -> Result<RunReport> {
        let run_id = RunId::new();
        let started_at = janitor_util::now();
        let today = janitor_util::today();
        let workspaces = self.selected_workspaces();

        info!(run_id = %run_id, dry_run = self.dry_run, %today, "Run starting");
        self.store.append_audit(AuditEvent::new(AuditEventType::RunStarted {
            run_id: run_id.clone(),
            dry_run: self.dry_run,
            workspace_count: workspaces.len(),
        }))?;

        // Workspaces are processed strictly one after another
        let mut reports = Vec::with_capacity(workspaces.len());
        for workspace in &workspaces {
            let report = self.run_workspace(workspace, &run_id, today).await;
            reports.push(report);
        }

        let report = RunReport::new(
            run_id.clone(),
            started_at,
            janitor_util::now(),
            self.dry_run,
            reports,
        );

        self.store
            .save_run_report(&report)
            .context("Failed to save run report")?;
        self.store.append_audit(AuditEvent::new(AuditEventType::RunFinished {
            run_id,
            deleted: report.total_deleted(),
            failed: report.total_failed(),
        }))?;

        Ok(report)
    }

    async fn run_workspace(
        &self,
        workspace: &WorkspaceConfig,
        run_id: &RunId,
        today: NaiveDate,
    ) -> WorkspaceReport {
        let client = workspace
            .resolve_token()
            .map_err(|e| e.to_string())
            .and_then(|token| {
                HttpWorkspaceClient::new(
                    &workspace.url,
                    &token,
                    self.janitor.policy().service.request_timeout,
                )
                .map_err(|e| e.to_string())
            });

        match client {
            Ok(client) => {
                self.janitor
                    .run_workspace(&client, workspace, run_id, today, self.dry_run)
                    .await
            }
            Err(error) => {
                warn!(workspace = %workspace.name, %error, "Cannot connect to workspace");
                let _ = self.store.append_audit(AuditEvent::new(AuditEventType::WorkspaceFailed {
                    workspace: workspace.name.clone(),
                    error: error.clone(),
                }));
                let mut report = WorkspaceReport::new(&workspace.name, &workspace.url);
                report.error = Some(error);
                report
            }
        }
    }
}

/// Write `<run_id>.txt`, `.html` and `.json` into `dir`
fn write_reports(dir: &Path, report: &RunReport, text: &str, html: &str) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create report directory {:?}", dir))?;

    let stem = report.run_id.to_string();
    let json = serde_json::to_string_pretty(report).context("Failed to serialize run report")?;

    for (ext, contents) in [("txt", text), ("html", html), ("json", json.as_str())] {
        let path = dir.join(format!("{stem}.{ext}"));
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write report {:?}", path))?;
    }

    info!(report_dir = %dir.display(), run_id = %stem, "Reports written");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if args.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        mock_time = janitor_util::is_mock_time_active(),
        "janitor starting"
    );

    let service = Service::new(&args)?;
    let report_dir = service.report_dir.clone();
    let report_config = service.janitor.policy().report.clone();

    let report = service.run().await?;

    let text = render_text(&report, &report_config);
    let html = render_html(&report, &report_config);
    println!("{text}");
    write_reports(&report_dir, &report, &text, &html)?;

    info!(
        run_id = %report.run_id,
        deleted = report.total_deleted(),
        failed = report.total_failed(),
        "Run finished"
    );

    if report.is_clean() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}
