//! Plain-text and HTML rendering of run reports

use janitor_api::{ActionOutcome, RunReport, WorkspaceReport};
use janitor_config::ReportConfig;
use std::fmt::Write;

const SEPARATOR: &str = "######################################################";

/// Render a run report as text: a short header, then each workspace as
/// pretty-printed JSON followed by a separator line.
pub fn render_text(report: &RunReport, config: &ReportConfig) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", config.subject);
    if !config.recipients.is_empty() {
        let _ = writeln!(out, "To: {}", config.recipients.join(", "));
    }
    let _ = writeln!(out, "Run: {}", report.run_id);
    let _ = writeln!(
        out,
        "Started: {}  Finished: {}",
        janitor_util::format_datetime_full(&report.started_at),
        janitor_util::format_datetime_full(&report.finished_at)
    );
    if report.dry_run {
        let _ = writeln!(out, "DRY RUN: no endpoint was created, changed or deleted");
    }
    let _ = writeln!(
        out,
        "Deleted: {}  Failed: {}",
        report.total_deleted(),
        report.total_failed()
    );
    let _ = writeln!(out);

    for workspace in &report.workspaces {
        let json = serde_json::to_string_pretty(workspace)
            .unwrap_or_else(|e| format!("<failed to serialize report: {e}>"));
        let _ = writeln!(out, "{json}");
        let _ = writeln!(out, "{SEPARATOR}");
    }

    out
}

/// Render a run report as a standalone HTML document
pub fn render_html(report: &RunReport, config: &ReportConfig) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "<!DOCTYPE html>");
    let _ = writeln!(out, "<html><head><meta charset=\"utf-8\">");
    let _ = writeln!(out, "<title>{}</title>", escape(&config.subject));
    let _ = writeln!(out, "</head><body>");
    let _ = writeln!(out, "<h1>{}</h1>", escape(&config.subject));
    let _ = writeln!(
        out,
        "<p>Run <code>{}</code> finished {}{}</p>",
        report.run_id,
        escape(&janitor_util::format_datetime_full(&report.finished_at)),
        if report.dry_run { " (dry run)" } else { "" }
    );

    for workspace in &report.workspaces {
        render_workspace_html(&mut out, workspace);
    }

    let _ = writeln!(out, "</body></html>");
    out
}

fn render_workspace_html(out: &mut String, workspace: &WorkspaceReport) {
    let _ = writeln!(
        out,
        "<h2>{} <small>{}</small></h2>",
        escape(&workspace.workspace),
        escape(&workspace.url)
    );

    if let Some(error) = &workspace.error {
        let _ = writeln!(out, "<p><strong>Error:</strong> {}</p>", escape(error));
    }

    if !workspace.provisioned.is_empty() {
        let _ = writeln!(out, "<h3>Shared endpoints</h3>");
        let _ = writeln!(
            out,
            "<table border=\"1\"><tr><th>Name</th><th>ID</th><th>Created</th><th>Grant applied</th><th>Error</th></tr>"
        );
        for p in &workspace.provisioned {
            let id = p.endpoint_id.as_ref().map(|id| id.to_string()).unwrap_or_default();
            let _ = writeln!(
                out,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&p.name),
                escape(&id),
                yes_no(p.created),
                yes_no(p.acl_applied),
                escape(p.error.as_deref().unwrap_or(""))
            );
        }
        let _ = writeln!(out, "</table>");
    }

    let _ = writeln!(out, "<h3>Terminated endpoints</h3>");
    if workspace.endpoints.is_empty() {
        let _ = writeln!(out, "<p>None</p>");
        return;
    }

    let _ = writeln!(
        out,
        "<table border=\"1\"><tr><th>Name</th><th>ID</th><th>Creator</th><th>Size</th><th>Clusters</th><th>Auto stop (min)</th><th>KeepAlive</th><th>KeepUntil</th><th>Status</th></tr>"
    );
    for action in &workspace.endpoints {
        let c = &action.candidate;
        let d = &c.cluster_details;
        let clusters = format!(
            "{}-{}",
            opt(d.min_num_clusters),
            opt(d.max_num_clusters)
        );
        let status = match &action.outcome {
            ActionOutcome::Deleted => "deleted".to_string(),
            ActionOutcome::DryRun => "dry run".to_string(),
            ActionOutcome::Failed { error } => format!("failed: {error}"),
        };
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&c.cluster_name),
            escape(c.cluster_id.as_str()),
            escape(c.creator_user_name.as_deref().unwrap_or("")),
            escape(d.cluster_size.as_deref().unwrap_or("")),
            clusters,
            opt(c.autotermination_minutes),
            c.keep_alive,
            c.keep_until,
            escape(&status)
        );
    }
    let _ = writeln!(out, "</table>");
}

fn opt(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "?".into())
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

/// Minimal HTML escaping for text and attribute content
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
