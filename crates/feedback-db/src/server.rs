use std::future::Future;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{info, instrument, warn};

use crate::{
    config::Settings,
    document::Document,
    error::{FeedbackError, FeedbackResult, StoreError, ValidationError},
    metrics::{self, MetricsService},
    payload::{
        index_field, text_field, CommentPayload, DeleteCommentPayload, EditCommentPayload,
        Payload,
    },
    store::DocumentStore,
};

#[derive(Clone)]
pub struct FeedbackServer {
    settings: Settings,
    store: DocumentStore,
    metrics: Option<MetricsService>,
}

#[derive(Clone)]
struct ApiState {
    store: DocumentStore,
}

impl FeedbackServer {
    pub fn new(settings: Settings) -> FeedbackResult<Self> {
        settings.validate()?;
        let store = DocumentStore::from_config(&settings.store);
        let metrics = if settings.telemetry.metrics_enabled {
            Some(MetricsService::initialize()?)
        } else {
            None
        };
        Ok(Self {
            settings,
            store,
            metrics,
        })
    }

    pub fn store(&self) -> DocumentStore {
        self.store.clone()
    }

    pub fn router(&self) -> Router {
        let state = ApiState {
            store: self.store.clone(),
        };
        let mut router = Router::new()
            .route("/data", get(data_handler))
            .route("/like", post(like_handler))
            .route("/dislike", post(dislike_handler))
            .route("/comment", post(comment_handler))
            .route("/delete-comment", post(delete_comment_handler))
            .route("/edit-comment", post(edit_comment_handler));
        if let Some(metrics) = &self.metrics {
            router = router.merge(
                Router::new()
                    .route("/metrics", get(metrics_handler))
                    .with_state::<ApiState>(metrics.clone()),
            );
        }
        router
            .fallback_service(ServeDir::new(&self.settings.server.static_dir))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    #[instrument(skip(self))]
    pub async fn run(self) -> FeedbackResult<()> {
        let addr = self.settings.server.socket_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|err| FeedbackError::Internal(err.to_string()))?;
        info!(
            %addr,
            store = %self.store.path().display(),
            write_mode = ?self.store.write_mode(),
            "FeedbackDB listening"
        );
        self.serve(listener, shutdown_signal()).await
    }

    /// Serves on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> FeedbackResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|err| FeedbackError::Internal(err.to_string()))
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(?err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("ctrl-c received, shutting down");
}

#[derive(Debug, Serialize)]
struct OkResponse {
    ok: bool,
}

#[derive(Debug, Serialize)]
struct LikesResponse {
    ok: bool,
    likes: u64,
}

#[derive(Debug, Serialize)]
struct DislikesResponse {
    ok: bool,
    dislikes: u64,
}

async fn data_handler(State(state): State<ApiState>) -> Result<Json<Document>, ApiError> {
    let document = state.store.load().map_err(ApiError::query)?;
    Ok(Json(document))
}

async fn like_handler(State(state): State<ApiState>) -> Result<Json<LikesResponse>, ApiError> {
    let likes = state.store.increment_likes().map_err(ApiError::mutation)?;
    metrics::record_mutation("like");
    Ok(Json(LikesResponse { ok: true, likes }))
}

async fn dislike_handler(
    State(state): State<ApiState>,
) -> Result<Json<DislikesResponse>, ApiError> {
    let dislikes = state
        .store
        .increment_dislikes()
        .map_err(ApiError::mutation)?;
    metrics::record_mutation("dislike");
    Ok(Json(DislikesResponse { ok: true, dislikes }))
}

async fn comment_handler(
    State(state): State<ApiState>,
    Payload(payload): Payload<CommentPayload>,
) -> Result<Json<OkResponse>, ApiError> {
    state
        .store
        .add_comment(&text_field(&payload.text))
        .map_err(ApiError::mutation)?;
    metrics::record_mutation("comment");
    Ok(Json(OkResponse { ok: true }))
}

async fn delete_comment_handler(
    State(state): State<ApiState>,
    Payload(payload): Payload<DeleteCommentPayload>,
) -> Result<Json<OkResponse>, ApiError> {
    let index = index_field(&payload.index).ok_or(ApiError::Validation(
        ValidationError::InvalidIndex,
    ))?;
    state
        .store
        .delete_comment(index)
        .map_err(ApiError::mutation)?;
    metrics::record_mutation("delete_comment");
    Ok(Json(OkResponse { ok: true }))
}

async fn edit_comment_handler(
    State(state): State<ApiState>,
    Payload(payload): Payload<EditCommentPayload>,
) -> Result<Json<OkResponse>, ApiError> {
    let new_text = text_field(&payload.new_text);
    // Blank text is reported ahead of a bad index.
    let index = match index_field(&payload.index) {
        Some(index) => index,
        None if new_text.trim().is_empty() => {
            return Err(ApiError::Validation(ValidationError::EmptyNewText))
        }
        None => return Err(ApiError::Validation(ValidationError::InvalidIndex)),
    };
    state
        .store
        .edit_comment(index, &new_text)
        .map_err(ApiError::mutation)?;
    metrics::record_mutation("edit_comment");
    Ok(Json(OkResponse { ok: true }))
}

async fn metrics_handler(State(metrics): State<MetricsService>) -> String {
    metrics.render()
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    error: &'static str,
}

#[derive(Debug)]
enum ApiError {
    Validation(ValidationError),
    Read(String),
    Write(String),
}

impl ApiError {
    /// Failure while answering a read-only request.
    fn query(err: StoreError) -> Self {
        metrics::record_store_error(&err);
        match err {
            StoreError::Validation(reason) => ApiError::Validation(reason),
            StoreError::Read(reason) | StoreError::Write(reason) => ApiError::Read(reason),
        }
    }

    /// Failure inside a load-modify-save cycle. A failed load is reported as
    /// a write failure because the mutation did not happen.
    fn mutation(err: StoreError) -> Self {
        metrics::record_store_error(&err);
        match err {
            StoreError::Validation(reason) => ApiError::Validation(reason),
            StoreError::Read(reason) | StoreError::Write(reason) => ApiError::Write(reason),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            ApiError::Validation(reason) => (StatusCode::BAD_REQUEST, reason.tag()),
            ApiError::Read(reason) => {
                warn!(?reason, "failed to read feedback document");
                (StatusCode::INTERNAL_SERVER_ERROR, "read_error")
            }
            ApiError::Write(reason) => {
                warn!(?reason, "failed to update feedback document");
                (StatusCode::INTERNAL_SERVER_ERROR, "write_error")
            }
        };
        (status, Json(ApiErrorBody { error })).into_response()
    }
}
