//! HTTP API v1 — board endpoints.
//!
//! Endpoints (`{board}` is `event`, `daily` or `topic-<topicId>`):
//!
//! - `GET    /v1/boards/{board}/slots`              — List occupied slots
//! - `POST   /v1/boards/{board}/slots`              — Place content at a slot
//! - `PUT    /v1/boards/{board}/slots`              — Replace the whole layout
//! - `DELETE /v1/boards/{board}/slots/{contentId}`  — Remove content, close the gap
//! - `POST   /v1/boards/{board}/rebuild`            — Re-derive the index from the slots
//! - `POST   /v1/boards/{board}/content`            — Create content with a generated id
//! - `PUT    /v1/boards/{board}/content/{contentId}` — Create or update content payload

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use slotboard_core::{CancelToken, ContentRecord, Error, KvError, SlotContent, SlotEntry};
use slotboard_engine::{
    BoardRef, Boards, DeleteOutcome, PlaceOutcome, RebuildReport, SlotAssignment, SlotEngine,
};

// ── State ─────────────────────────────────────────────────────────────────

/// Shared state for the v1 API.
pub struct ApiV1State {
    pub boards: Boards,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

impl ApiV1State {
    pub fn new(boards: Boards) -> Self {
        Self {
            boards,
            start_time: chrono::Utc::now(),
        }
    }

    fn engine(&self, board: &str) -> Result<SlotEngine, ApiError> {
        let board: BoardRef = board.parse()?;
        Ok(self.boards.resolve(&board)?)
    }
}

pub type SharedApiState = Arc<ApiV1State>;

/// Build the v1 API router.
pub fn v1_router(state: SharedApiState) -> Router {
    Router::new()
        .route(
            "/boards/{board}/slots",
            get(list_slots_handler)
                .post(place_handler)
                .put(reorder_handler),
        )
        .route("/boards/{board}/slots/{content_id}", delete(delete_handler))
        .route("/boards/{board}/rebuild", post(rebuild_handler))
        .route("/boards/{board}/content", post(create_content_handler))
        .route("/boards/{board}/content/{content_id}", put(upsert_content_handler))
        .with_state(state)
}

// ── Errors ────────────────────────────────────────────────────────────────

/// Engine error rendered as `{"error": ..., "retryable": ...}`.
#[derive(Debug)]
pub struct ApiError(pub Error);

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub retryable: bool,
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::CapacityExceeded { .. } => StatusCode::CONFLICT,
            Error::Backend(KvError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Cancelled => StatusCode::REQUEST_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self.0, status = status.as_u16(), "Board request failed");
        }
        let body = ErrorResponse {
            error: self.0.to_string(),
            retryable: self.0.is_retryable(),
        };
        (status, Json(body)).into_response()
    }
}

// ── DTOs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct SlotListResponse {
    pub board: String,
    pub slots: Vec<SlotEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRequest {
    pub slot: u32,
    pub content_id: String,
    #[serde(default)]
    pub content: Option<SlotContent>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub assignments: Vec<SlotAssignment>,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn list_slots_handler(
    State(state): State<SharedApiState>,
    Path(board): Path<String>,
) -> Result<Json<SlotListResponse>, ApiError> {
    let engine = state.engine(&board)?;
    let slots = engine.list().await?;
    Ok(Json(SlotListResponse { board, slots }))
}

async fn place_handler(
    State(state): State<SharedApiState>,
    Path(board): Path<String>,
    Json(req): Json<PlaceRequest>,
) -> Result<(StatusCode, Json<PlaceOutcome>), ApiError> {
    let engine = state.engine(&board)?;
    let outcome = engine
        .place(req.slot, &req.content_id, req.content, &CancelToken::new())
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn reorder_handler(
    State(state): State<SharedApiState>,
    Path(board): Path<String>,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<SlotListResponse>, ApiError> {
    let engine = state.engine(&board)?;
    let slots = engine.reorder(req.assignments, &CancelToken::new()).await?;
    Ok(Json(SlotListResponse { board, slots }))
}

async fn delete_handler(
    State(state): State<SharedApiState>,
    Path((board, content_id)): Path<(String, String)>,
) -> Result<Json<DeleteOutcome>, ApiError> {
    let engine = state.engine(&board)?;
    let outcome = engine.delete(&content_id, &CancelToken::new()).await?;
    Ok(Json(outcome))
}

async fn rebuild_handler(
    State(state): State<SharedApiState>,
    Path(board): Path<String>,
) -> Result<Json<RebuildReport>, ApiError> {
    let engine = state.engine(&board)?;
    let report = engine.rebuild(&CancelToken::new()).await?;
    info!(
        board = %board,
        occupied = report.entries.len(),
        stale = report.index_was_stale,
        healed = report.healed_records.len(),
        "Rebuild requested"
    );
    Ok(Json(report))
}

async fn create_content_handler(
    State(state): State<SharedApiState>,
    Path(board): Path<String>,
    Json(content): Json<SlotContent>,
) -> Result<(StatusCode, Json<ContentRecord>), ApiError> {
    let engine = state.engine(&board)?;
    let content_id = uuid::Uuid::new_v4().to_string();
    let record = engine.upsert_content(&content_id, content).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn upsert_content_handler(
    State(state): State<SharedApiState>,
    Path((board, content_id)): Path<(String, String)>,
    Json(content): Json<SlotContent>,
) -> Result<Json<ContentRecord>, ApiError> {
    let engine = state.engine(&board)?;
    let record = engine.upsert_content(&content_id, content).await?;
    Ok(Json(record))
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use slotboard_config::BoardsConfig;
    use slotboard_store::InMemoryKv;
    use tower::ServiceExt;

    fn test_api_state() -> SharedApiState {
        let boards = Boards::new(Arc::new(InMemoryKv::new()), BoardsConfig::default());
        Arc::new(ApiV1State::new(boards))
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(state: &SharedApiState, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = v1_router(state.clone()).oneshot(req).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    async fn list(state: &SharedApiState, board: &str) -> Vec<(u64, String)> {
        let req = Request::builder()
            .uri(format!("/boards/{board}/slots"))
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(state, req).await;
        assert_eq!(status, StatusCode::OK);
        json["slots"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| {
                (
                    e["slot"].as_u64().unwrap(),
                    e["contentId"].as_str().unwrap().to_string(),
                )
            })
            .collect()
    }

    async fn place(state: &SharedApiState, board: &str, slot: u32, id: &str) -> serde_json::Value {
        let req = json_request(
            "POST",
            &format!("/boards/{board}/slots"),
            serde_json::json!({
                "slot": slot,
                "contentId": id,
                "content": {"contentType": "event", "title": id}
            }),
        );
        let (status, json) = send(state, req).await;
        assert_eq!(status, StatusCode::CREATED);
        json
    }

    #[tokio::test]
    async fn place_list_delete_flow() {
        let state = test_api_state();

        place(&state, "event", 3, "E1").await;
        assert_eq!(list(&state, "event").await, vec![(3, "E1".to_string())]);

        let outcome = place(&state, "event", 3, "E2").await;
        assert_eq!(outcome["shifted"][0]["contentId"], "E1");
        assert_eq!(outcome["shifted"][0]["to"], 4);
        assert_eq!(
            list(&state, "event").await,
            vec![(3, "E2".to_string()), (4, "E1".to_string())]
        );

        let req = Request::builder()
            .method("DELETE")
            .uri("/boards/event/slots/E2")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(&state, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["slot"], 3);
        assert_eq!(list(&state, "event").await, vec![(3, "E1".to_string())]);
    }

    #[tokio::test]
    async fn slot_out_of_range_is_bad_request() {
        let state = test_api_state();
        let req = json_request(
            "POST",
            "/boards/event/slots",
            serde_json::json!({"slot": 7, "contentId": "E1", "content": {"contentType": "event", "title": "x"}}),
        );
        let (status, json) = send(&state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["retryable"], false);
        assert!(json["error"].as_str().unwrap().contains("slot 7"));
    }

    #[tokio::test]
    async fn unknown_board_is_bad_request() {
        let state = test_api_state();
        let req = Request::builder()
            .uri("/boards/weekly/slots")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_unplaced_is_not_found() {
        let state = test_api_state();
        let req = Request::builder()
            .method("DELETE")
            .uri("/boards/daily/slots/ghost")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(&state, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["retryable"], false);
    }

    #[tokio::test]
    async fn reorder_validates_then_applies() {
        let state = test_api_state();
        place(&state, "topic-sports", 1, "A").await;
        place(&state, "topic-sports", 2, "B").await;

        let req = json_request(
            "PUT",
            "/boards/topic-sports/slots",
            serde_json::json!({"assignments": [
                {"slot": 1, "contentId": "A"},
                {"slot": 1, "contentId": "B"}
            ]}),
        );
        let (status, _) = send(&state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let req = json_request(
            "PUT",
            "/boards/topic-sports/slots",
            serde_json::json!({"assignments": [{"slot": 1, "contentId": "does-not-exist"}]}),
        );
        let (status, _) = send(&state, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            list(&state, "topic-sports").await,
            vec![(1, "A".to_string()), (2, "B".to_string())]
        );

        let req = json_request(
            "PUT",
            "/boards/topic-sports/slots",
            serde_json::json!({"assignments": [
                {"slot": 1, "contentId": "B"},
                {"slot": 2, "contentId": null},
                {"slot": 3, "contentId": "A"}
            ]}),
        );
        let (status, json) = send(&state, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["slots"].as_array().unwrap().len(), 2);
        assert_eq!(
            list(&state, "topic-sports").await,
            vec![(1, "B".to_string()), (3, "A".to_string())]
        );
    }

    #[tokio::test]
    async fn full_board_rejects_when_configured() {
        let mut settings = BoardsConfig::default();
        settings.event.overflow = slotboard_core::OverflowPolicy::Reject;
        let state = Arc::new(ApiV1State::new(Boards::new(
            Arc::new(InMemoryKv::new()),
            settings,
        )));
        for n in 1..=6 {
            place(&state, "event", n, &format!("E{n}")).await;
        }

        let req = json_request(
            "POST",
            "/boards/event/slots",
            serde_json::json!({"slot": 1, "contentId": "NEW", "content": {"contentType": "event", "title": "new"}}),
        );
        let (status, _) = send(&state, req).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn content_create_upsert_and_place_by_id() {
        let state = test_api_state();

        let req = json_request(
            "POST",
            "/boards/daily/content",
            serde_json::json!({"contentType": "article", "title": "Generated"}),
        );
        let (status, created) = send(&state, req).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().unwrap().to_string();
        assert!(!id.is_empty());

        let req = json_request(
            "PUT",
            "/boards/daily/content/story-1",
            serde_json::json!({"contentType": "video", "title": "Clip", "url": "https://example.com/c.mp4"}),
        );
        let (status, record) = send(&state, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["content"]["contentType"], "video");

        // Existing content can be placed without resending the payload
        let req = json_request(
            "POST",
            "/boards/daily/slots",
            serde_json::json!({"slot": 1, "contentId": "story-1"}),
        );
        let (status, _) = send(&state, req).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(list(&state, "daily").await, vec![(1, "story-1".to_string())]);
    }

    #[tokio::test]
    async fn rebuild_returns_report() {
        let state = test_api_state();
        place(&state, "daily", 2, "A").await;

        let req = Request::builder()
            .method("POST")
            .uri("/boards/daily/rebuild")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(&state, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["indexWasStale"], false);
        assert_eq!(json["entries"][0]["slot"], 2);
    }

    #[test]
    fn error_statuses() {
        let cases = [
            (Error::Validation("x".into()), StatusCode::BAD_REQUEST),
            (Error::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                Error::CapacityExceeded {
                    scope: "event".into(),
                    capacity: 6,
                },
                StatusCode::CONFLICT,
            ),
            (
                Error::Backend(KvError::Unavailable("down".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                Error::Backend(KvError::Storage("bad".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (Error::Cancelled, StatusCode::REQUEST_TIMEOUT),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError(error).status(), status);
        }
    }
}
