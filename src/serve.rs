use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::aggregate::{self, ChartCache, Summary};
use crate::daterange::filter_by_date_range;
use crate::db::{self, CallUpdate};
use crate::models::{CallRecord, ChartSeries, Utterance};
use crate::normalize::normalize;
use crate::transcript;

#[derive(Clone)]
struct AppState {
    pool: PgPool,
    charts: Arc<Mutex<ChartCache>>,
}

pub async fn run(addr: &str, pool: PgPool) -> anyhow::Result<()> {
    let state = AppState {
        pool,
        charts: Arc::new(Mutex::new(ChartCache::default())),
    };
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    info!("listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("received CTRL+C, shutting down");
        })
        .await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/call-records",
            get(list_records).post(create_record).put(update_record),
        )
        .route("/api/call-notes", put(update_call_notes))
        .route("/api/managers-feedback", put(update_managers_feedback))
        .route("/api/analytics", get(analytics))
        .route("/api/transcript", get(get_transcript))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct Envelope<T> {
    message: String,
    data: T,
}

fn ok<T: Serialize>(message: &str, data: T) -> Response {
    Json(Envelope {
        message: message.to_string(),
        data,
    })
    .into_response()
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({ "message": message })),
    )
        .into_response()
}

#[derive(Deserialize)]
struct ListParams {
    member_id: String,
    team_id: Option<String>,
    status: Option<String>,
}

async fn list_records(State(state): State<AppState>, Query(params): Query<ListParams>) -> Response {
    match fetch_normalized(
        &state.pool,
        &params.member_id,
        params.team_id.as_deref(),
        params.status.as_deref(),
        None,
    )
    .await
    {
        Ok(records) => ok("Call records retrieved", records),
        Err(err) => {
            error!("failed to fetch call records: {err:#}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Error retrieving call records")
        }
    }
}

#[derive(Deserialize)]
struct CreateBody {
    member_id: String,
    #[serde(default)]
    team_id: String,
    session_id: String,
}

async fn create_record(State(state): State<AppState>, Json(body): Json<CreateBody>) -> Response {
    match db::create_pending(&state.pool, &body.member_id, &body.team_id, &body.session_id).await {
        Ok(pending) => (StatusCode::CREATED, ok("Call record initialized", pending)).into_response(),
        Err(err) => {
            error!("failed to create call record: {err:#}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Error creating call record")
        }
    }
}

#[derive(Deserialize)]
struct SessionParam {
    session_id: String,
}

async fn update_record(
    State(state): State<AppState>,
    Query(param): Query<SessionParam>,
    Json(update): Json<CallUpdate>,
) -> Response {
    match db::update_record(&state.pool, &param.session_id, &update).await {
        Ok(0) if is_empty_update(&update) => {
            json_error(StatusCode::BAD_REQUEST, "No fields to update")
        }
        Ok(0) => json_error(StatusCode::NOT_FOUND, "Call record not found"),
        Ok(_) => ok("Call record updated", param.session_id),
        Err(err) => {
            error!("failed to update call record: {err:#}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Error updating call record")
        }
    }
}

#[derive(Deserialize)]
struct NotesBody {
    member_id: String,
    session_id: String,
    call_notes: String,
}

async fn update_call_notes(State(state): State<AppState>, Json(body): Json<NotesBody>) -> Response {
    match db::update_notes(&state.pool, &body.member_id, &body.session_id, &body.call_notes).await {
        Ok(0) => json_error(StatusCode::NOT_FOUND, "Call record not found"),
        Ok(_) => ok("Call notes updated", body.session_id),
        Err(err) => {
            error!("failed to update call notes: {err:#}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Error updating call notes")
        }
    }
}

#[derive(Deserialize)]
struct FeedbackBody {
    member_id: String,
    session_id: String,
    managers_feedback: String,
}

async fn update_managers_feedback(
    State(state): State<AppState>,
    Json(body): Json<FeedbackBody>,
) -> Response {
    match db::update_feedback(
        &state.pool,
        &body.member_id,
        &body.session_id,
        &body.managers_feedback,
    )
    .await
    {
        Ok(0) => json_error(StatusCode::NOT_FOUND, "Call record not found"),
        Ok(_) => ok("Manager feedback updated", body.session_id),
        Err(err) => {
            error!("failed to update manager feedback: {err:#}");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error updating manager feedback",
            )
        }
    }
}

#[derive(Deserialize)]
struct AnalyticsParams {
    member_id: String,
    team_id: Option<String>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

#[derive(Serialize)]
struct Analytics {
    summary: Summary,
    charts: Vec<ChartSeries>,
}

async fn analytics(State(state): State<AppState>, Query(params): Query<AnalyticsParams>) -> Response {
    let records = match fetch_normalized(
        &state.pool,
        &params.member_id,
        params.team_id.as_deref(),
        None,
        None,
    )
    .await
    {
        Ok(records) => records,
        Err(err) => {
            error!("failed to fetch analytics input: {err:#}");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Error retrieving analytics");
        }
    };

    let windowed = match (params.from, params.to) {
        (Some(from), Some(to)) => filter_by_date_range(&records, from, to),
        _ => records,
    };

    let generation = aggregate::generation_of(&windowed);
    let charts = match state.charts.lock() {
        Ok(mut cache) => cache.charts(generation, &windowed).to_vec(),
        Err(_) => aggregate::all_series(&windowed),
    };

    ok(
        "Analytics computed",
        Analytics {
            summary: aggregate::aggregate(&windowed),
            charts,
        },
    )
}

#[derive(Deserialize)]
struct TranscriptParams {
    member_id: String,
    session_id: String,
}

#[derive(Serialize)]
struct TranscriptBody {
    session_id: String,
    entries: Vec<Utterance>,
}

async fn get_transcript(
    State(state): State<AppState>,
    Query(params): Query<TranscriptParams>,
) -> Response {
    let records = match fetch_normalized(
        &state.pool,
        &params.member_id,
        None,
        None,
        Some(&params.session_id),
    )
    .await
    {
        Ok(records) => records,
        Err(err) => {
            error!("failed to fetch transcript: {err:#}");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Error retrieving transcript");
        }
    };

    let Some(record) = records.into_iter().next() else {
        return json_error(StatusCode::NOT_FOUND, "Call record not found");
    };

    let entries = record
        .call_transcript
        .as_deref()
        .map(transcript::parse)
        .unwrap_or_default();

    ok(
        "Transcript parsed",
        TranscriptBody {
            session_id: record.session_id,
            entries,
        },
    )
}

async fn fetch_normalized(
    pool: &PgPool,
    member_id: &str,
    team_id: Option<&str>,
    status: Option<&str>,
    session_id: Option<&str>,
) -> anyhow::Result<Vec<CallRecord>> {
    let rows = db::fetch_records(pool, member_id, team_id, status, session_id).await?;
    Ok(rows.into_iter().map(normalize).collect())
}

fn is_empty_update(update: &CallUpdate) -> bool {
    serde_json::to_value(update)
        .map(|value| {
            value
                .as_object()
                .map(|map| map.values().all(|v| v.is_null()))
                .unwrap_or(true)
        })
        .unwrap_or(true)
}
