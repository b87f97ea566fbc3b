use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::analyzer::{AnalysisOptions, AnalysisWindow, PatternAnalyzer};
use crate::catalog::ColumnCatalog;
use crate::storage::StoreError;

use super::models::{AnalyzeRequest, AnalyzeResponse, ErrorResponse, ScopeQuery};
use super::AppState;

const DEFAULT_SCOPE: &str = "default";

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Run pattern analysis over a posted batch of query-history rows and
/// persist the resulting summaries under the request's scope.
pub async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> Response {
    if request.rows.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "rows must not be empty");
    }

    let scope = request
        .scope
        .clone()
        .unwrap_or_else(|| DEFAULT_SCOPE.to_string());

    let window = match request.window {
        Some(w) => {
            if w.start > w.end {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "window start must not be after window end",
                );
            }
            AnalysisWindow::new(w.start, w.end)
        }
        None => AnalysisWindow::days_back(
            chrono::Utc::now().date_naive(),
            state.config.window_days,
        ),
    };

    let options = AnalysisOptions {
        granularity: request
            .granularity
            .unwrap_or(state.config.bucket_granularity),
        min_hit_threshold: request
            .min_hit_threshold
            .unwrap_or(state.config.min_hit_threshold),
        window,
    };

    let catalog = ColumnCatalog::from_table_metas(&request.tables);
    let analyzer = PatternAnalyzer::new(options);

    log::info!(
        "analyze request: scope={}, rows={}, tables={}",
        scope,
        request.rows.len(),
        request.tables.len()
    );

    let report = analyzer.analyze(&request.rows, &catalog);

    let summaries: Vec<Value> = match report
        .summaries
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<_, _>>()
    {
        Ok(values) => values,
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("failed to serialize summaries: {}", e),
            )
        }
    };

    if let Err(e) = state.store.save_summaries(&scope, &summaries) {
        return store_error_response(e);
    }

    let response = AnalyzeResponse {
        run_id: report.run_id,
        scope,
        table_count: summaries.len(),
        summaries,
        failures: report.failures,
        skipped_rows: report.skipped_rows,
        schema_mismatches: report.schema_mismatches,
        cancelled: report.cancelled,
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// List stored summaries for a scope.
pub async fn list_patterns_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ScopeQuery>,
) -> Response {
    let scope = params.scope.unwrap_or_else(|| DEFAULT_SCOPE.to_string());
    match state.store.load_summaries(&scope) {
        Ok(summaries) => (StatusCode::OK, Json(summaries)).into_response(),
        Err(e) => store_error_response(e),
    }
}

/// Fetch one table's stored summary within a scope.
pub async fn get_pattern_handler(
    State(state): State<Arc<AppState>>,
    Path((scope, table)): Path<(String, String)>,
) -> Response {
    let summaries = match state.store.load_summaries(&scope) {
        Ok(summaries) => summaries,
        Err(e) => return store_error_response(e),
    };

    let wanted = table.to_lowercase();
    let found = summaries.into_iter().find(|s| {
        s.get("table")
            .and_then(Value::as_str)
            .is_some_and(|t| t == wanted || t.ends_with(&format!(".{}", wanted)))
    });

    match found {
        Some(summary) => (StatusCode::OK, Json(summary)).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            &format!("no summary for table `{}` in scope `{}`", table, scope),
        ),
    }
}

/// List known scopes.
pub async fn list_scopes_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.store.list_scopes() {
        Ok(scopes) => (StatusCode::OK, Json(scopes)).into_response(),
        Err(e) => store_error_response(e),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn store_error_response(e: StoreError) -> Response {
    log::error!("pattern store error: {}", e);
    error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
}
