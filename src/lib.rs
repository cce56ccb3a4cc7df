pub mod auth;
pub mod board;
pub mod calendar;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod ical;
pub mod masking;
pub mod models;
pub mod momence;
pub mod openapi;
pub mod settings;
pub mod store;
pub mod validation;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use handlers::{
    cancel_booking, check_in, check_out, create_member, filter_options, get_ical,
    grouped_sessions, healthz_live, healthz_ready, list_sessions, month_sessions, move_session,
    refresh_sessions, root, session_detail, week_sessions,
};
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::board::{SessionMover, UnwiredMover};
use crate::ical::ICalExporter;
use crate::momence::MomenceClient;
use crate::openapi::ApiDoc;
use crate::settings::Settings;
use crate::store::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub momence: Arc<MomenceClient>,
    pub store: Arc<SessionStore>,
    pub exporter: Arc<ICalExporter>,
    pub mover: Arc<dyn SessionMover>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            momence: Arc::new(MomenceClient::from_settings(&settings)),
            store: Arc::new(SessionStore::new()),
            exporter: Arc::new(ICalExporter::default()),
            mover: Arc::new(UnwiredMover),
            settings,
        }
    }

    pub fn with_mover(mut self, mover: Arc<dyn SessionMover>) -> Self {
        self.mover = mover;
        self
    }
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;

    let env_filter = if settings.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .without_time()
        .init();

    let state = AppState::new(settings);

    // Warm the store so the first request does not wait on the booking service.
    if let Err(err) = state.store.refresh(&state.momence, chrono::Utc::now()).await {
        warn!(error = %err, "initial session load failed, retrying on first request");
    }

    let app = build_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], state.settings.port));
    info!("Starting Studio Schedule API on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        );

    let mut router = Router::new()
        .route("/", get(root))
        .route("/healthz/live", get(healthz_live))
        .route("/healthz/ready", get(healthz_ready))
        .route("/sessions", get(list_sessions))
        .route("/sessions/grouped", get(grouped_sessions))
        .route("/sessions/week", get(week_sessions))
        .route("/sessions/month", get(month_sessions))
        .route("/sessions/filters", get(filter_options))
        .route("/sessions/refresh", post(refresh_sessions))
        .route("/sessions.ical", get(get_ical))
        .route("/sessions/{id}", get(session_detail))
        .route("/sessions/{id}/move", post(move_session))
        .route("/bookings/{id}", delete(cancel_booking))
        .route("/bookings/{id}/check-in", post(check_in).delete(check_out))
        .route("/members", post(create_member))
        .with_state(state.clone());

    if state.settings.enable_swagger {
        let openapi = ApiDoc::openapi();
        let swagger = SwaggerUi::new("/docs").url("/openapi.json", openapi);
        router = router.merge(swagger);
    }

    router.layer(trace_layer)
}
