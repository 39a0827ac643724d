//! Axum router and handlers for the approval HTTP surface (spec.md §6).
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. All handlers are `pub(crate)` so tests can compose the
//! router directly, mirroring `mqk-daemon::routes`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use dw_engine::mirror::{approval_url, audit, command_row};
use dw_schemas::CommandStatus;

use crate::api_types::{
    CommandDecisionRequest, CommandDecisionResponse, Decision, DocSummary, DocsResponse,
    ErrorResponse, StatusResponse, TickStatusEntry,
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/cmd/:doc_id/:cmd_id", get(cmd_page))
        .route("/api/command-decision", post(command_decision))
        .route("/api/status", get(status_handler))
        .route("/api/docs", get(docs_handler))
        .route("/v1/health", get(health_handler))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

/// Container liveness probe (SPEC_FULL.md §6, ambient — not in spec.md).
/// Intentionally cheap: no repository round-trip, just process-is-up.
pub(crate) async fn health_handler() -> Response {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response()
}

// ---------------------------------------------------------------------------
// GET /cmd/:docId/:cmdId
// ---------------------------------------------------------------------------

/// Renders a minimal approval page for one command (spec.md §6: "renders a
/// simple page"). No styling framework, no client-side JS beyond the plain
/// HTML forms that post back to `/api/command-decision`.
pub(crate) async fn cmd_page(
    State(st): State<AppState>,
    Path((doc_id, cmd_id)): Path<(String, String)>,
) -> Response {
    let cmd = match st.ctx.repo.get_command(&cmd_id).await {
        Ok(Some(cmd)) if cmd.doc_id == doc_id => cmd,
        Ok(_) => return (StatusCode::NOT_FOUND, "command not found").into_response(),
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };

    let decision_controls = if cmd.status == CommandStatus::PendingApproval {
        format!(
            r#"<form method="post" action="/api/command-decision" onsubmit="return submitDecision(event)">
  <input type="hidden" name="doc_id" value="{doc_id}">
  <input type="hidden" name="cmd_id" value="{cmd_id}">
  <button formaction="#" onclick="decide('APPROVED')">Approve</button>
  <button formaction="#" onclick="decide('REJECTED')">Reject</button>
</form>
<script>
function decide(d) {{
  fetch('/api/command-decision', {{
    method: 'POST',
    headers: {{'Content-Type': 'application/json'}},
    body: JSON.stringify({{doc_id: "{doc_id}", cmd_id: "{cmd_id}", decision: d}})
  }}).then(() => location.reload());
}}
</script>"#
        )
    } else {
        String::new()
    };

    let body = format!(
        r#"<!doctype html>
<html><head><title>{cmd_id}</title></head>
<body>
<h1>Command {cmd_id}</h1>
<p>Document: {doc_id}</p>
<pre>{raw}</pre>
<p>Status: {status}</p>
<p>Result: {result}</p>
<p>Error: {error}</p>
{decision_controls}
</body></html>"#,
        cmd_id = cmd.cmd_id,
        doc_id = cmd.doc_id,
        raw = html_escape(&cmd.raw_command),
        status = cmd.status.as_cell_text(),
        result = html_escape(cmd.result_text.as_deref().unwrap_or("")),
        error = html_escape(cmd.error_text.as_deref().unwrap_or("")),
    );

    Html(body).into_response()
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// ---------------------------------------------------------------------------
// POST /api/command-decision
// ---------------------------------------------------------------------------

/// Transitions a PENDING_APPROVAL command per the operator's decision and
/// mirrors the result back onto the document cell (spec.md §6). Matches the
/// cell-edit approval path in `dw-engine::poll` but driven by this API
/// instead of a document edit.
pub(crate) async fn command_decision(
    State(st): State<AppState>,
    Json(req): Json<CommandDecisionRequest>,
) -> Response {
    let cmd = match st.ctx.repo.get_command(&req.cmd_id).await {
        Ok(Some(cmd)) => cmd,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("command {} not found", req.cmd_id),
                }),
            )
                .into_response()
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse { error: e.to_string() }),
            )
                .into_response()
        }
    };

    if cmd.doc_id != req.doc_id {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "doc_id does not match the command's document".to_string(),
            }),
        )
            .into_response();
    }

    if cmd.status != CommandStatus::PendingApproval {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: format!("command is {:?}, not PENDING_APPROVAL", cmd.status),
            }),
        )
            .into_response();
    }

    let to = match req.decision {
        Decision::Approved => CommandStatus::Approved,
        Decision::Rejected => CommandStatus::Rejected,
    };

    if let Err(e) = st.ctx.repo.set_command_status(&req.cmd_id, to, None, None).await {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error: e.to_string() }),
        )
            .into_response();
    }

    let url = approval_url(&st.ctx.config.public_base_url, &req.doc_id, &req.cmd_id);
    let mut updated = cmd.clone();
    updated.status = to;
    if let Err(e) = st
        .ctx
        .document
        .write_command_row(&req.doc_id, command_row(&updated, url))
        .await
    {
        tracing::warn!(cmd_id = %req.cmd_id, error = %e, "failed to mirror decision onto document cell");
    }

    if let Err(e) = audit(&st.ctx, &req.doc_id, format!("{} {:?} (api)", req.cmd_id, to)).await {
        tracing::warn!(cmd_id = %req.cmd_id, error = %e, "failed to append audit row for decision");
    }

    (
        StatusCode::OK,
        Json(CommandDecisionResponse {
            cmd_id: req.cmd_id,
            status: to.as_cell_text().to_string(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /api/status
// ---------------------------------------------------------------------------

pub(crate) async fn status_handler(State(st): State<AppState>) -> Response {
    let docs = match st.ctx.repo.list_docs().await {
        Ok(docs) => docs,
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };

    let counts = match st.ctx.repo.count_commands_by_status().await {
        Ok(counts) => counts,
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };
    let mut pending_approval_commands = 0i64;
    let mut approved_commands = 0i64;
    for (status, count) in counts {
        match status {
            CommandStatus::PendingApproval => pending_approval_commands += count,
            CommandStatus::Approved => approved_commands += count,
            _ => {}
        }
    }

    let active_conditional_orders = match st.ctx.repo.list_active_conditional_orders(None).await {
        Ok(orders) => orders.len() as i64,
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };

    let ticks = st
        .tick_status
        .snapshot()
        .await
        .into_iter()
        .map(|(name, status)| {
            (
                name,
                TickStatusEntry {
                    running: status.running,
                    last_finished_at: status.last_finished_at,
                    last_error: status.last_error,
                },
            )
        })
        .collect();

    (
        StatusCode::OK,
        Json(StatusResponse {
            tracked_docs: docs.len(),
            pending_approval_commands,
            approved_commands,
            active_conditional_orders,
            ticks,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /api/docs
// ---------------------------------------------------------------------------

pub(crate) async fn docs_handler(State(st): State<AppState>) -> Response {
    match st.ctx.repo.list_docs().await {
        Ok(docs) => (
            StatusCode::OK,
            Json(DocsResponse {
                docs: docs
                    .into_iter()
                    .map(|d| DocSummary {
                        doc_id: d.doc_id,
                        display_name: d.display_name,
                        primary_address: d.primary_address,
                        secondary_address: d.secondary_address,
                        poll_failure_count: d.poll_failure_count,
                    })
                    .collect(),
            }),
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
