use axum::extract::{Path, Query, State};
use axum::{Json, http::StatusCode, response::IntoResponse};
use axum_extra::extract::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::{
    AppState,
    auth::{contact_visibility, verify_token},
    calendar::{CalendarDay, month_view, week_view},
    engine::{
        FilterOptions, GroupBy, SessionCounts, SessionGroup, Tab, compute_visible_sessions,
        group_sessions, paginate, sort_sessions,
    },
    error::ApiError,
    masking::ContactVisibility,
    models::{Booking, Member, NewMember, Session, SessionDetail},
    store::Snapshot,
    validation::{SessionQuery, validate_new_member},
};

type BearerHeader = Option<TypedHeader<Authorization<Bearer>>>;

#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DetailQuery {
    pub token: Option<String>,
    pub unlock: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelQuery {
    pub token: Option<String>,
    #[serde(default)]
    pub late: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MoveRequest {
    pub group: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TabCounts {
    pub upcoming: usize,
    pub past: usize,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionListResponse {
    pub tab: Tab,
    pub sessions: Vec<Session>,
    pub counts: SessionCounts,
    pub tab_counts: TabCounts,
    pub active_filters: usize,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub fetched_at: Option<DateTime<Utc>>,
    pub refresh_error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupedSessionsResponse {
    pub group_by: GroupBy,
    pub groups: Vec<SessionGroup>,
    pub counts: SessionCounts,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CalendarResponse {
    pub days: Vec<CalendarDay>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetailResponse {
    pub session: SessionDetail,
    pub bookings: Vec<Booking>,
    pub contacts_revealed: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub sessions: usize,
    pub fetched_at: DateTime<Utc>,
}

fn authorize(state: &AppState, auth: BearerHeader, token: Option<&str>) -> Result<(), ApiError> {
    let auth_header = auth.map(|TypedHeader(a)| a);
    verify_token(&state.settings, auth_header, token)
}

async fn load(state: &AppState, now: DateTime<Utc>) -> Result<Snapshot, ApiError> {
    Ok(state.store.current(&state.momence, now).await?)
}

/// Visible sessions for the query's tab and filters, ordered by start time.
fn visible(
    snapshot: &Snapshot,
    query: &SessionQuery,
    now: DateTime<Utc>,
) -> Result<Vec<Session>, ApiError> {
    let tab = query.tab()?;
    let filters = query.filters()?;
    Ok(compute_visible_sessions(&snapshot.sessions, tab, &filters, now))
}

/// Booking changes alter counts, so the session list is reloaded. A failed
/// reload leaves the previous list in place.
async fn refresh_after_action(state: &AppState) {
    if let Err(err) = state.store.refresh(&state.momence, Utc::now()).await {
        warn!(error = %err, "session reload after booking action failed");
    }
}

#[utoipa::path(get, path = "/", tag = "schedule")]
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Studio Schedule API",
        "endpoints": {
            "/sessions": "Filtered, sorted and paginated session list with counts",
            "/sessions/grouped": "Sessions grouped for board layouts",
            "/sessions/week": "Weekly timeline",
            "/sessions/month": "Monthly grid",
            "/sessions/filters": "Available filter values",
            "/sessions.ical": "Download visible sessions as iCal file"
        }
    }))
}

#[utoipa::path(get, path = "/healthz/live", tag = "schedule")]
pub async fn healthz_live() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[utoipa::path(get, path = "/healthz/ready", tag = "schedule")]
pub async fn healthz_ready() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[utoipa::path(
    get,
    path = "/sessions",
    params(
        ("tab" = Option<String>, Query, description = "upcoming (default) or past"),
        ("search" = Option<String>, Query, description = "Case-insensitive match on name, description or instructor"),
        ("start" = Option<String>, Query, description = "Sessions starting strictly after this date or instant"),
        ("end" = Option<String>, Query, description = "Sessions starting strictly before this date or instant"),
        ("type" = Option<String>, Query, description = "fitness or private"),
        ("instructor" = Option<String>, Query, description = "Exact instructor name"),
        ("location" = Option<String>, Query, description = "Exact location name"),
        ("status" = Option<String>, Query, description = "upcoming, completed or cancelled"),
        ("capacity" = Option<String>, Query, description = "available, full or waitlist"),
        ("sort" = Option<String>, Query, description = "startsAt, name or bookingCount"),
        ("order" = Option<String>, Query, description = "asc or desc"),
        ("page" = Option<usize>, Query, description = "1-based page"),
        ("per_page" = Option<usize>, Query, description = "Items per page (1-100)"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Visible sessions", body = SessionListResponse),
        (status = 400, description = "Invalid filter"),
        (status = 401, description = "Invalid authentication token"),
        (status = 502, description = "Booking service unavailable")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "schedule"
)]
pub async fn list_sessions(
    State(state): State<AppState>,
    auth: BearerHeader,
    Query(query): Query<SessionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    let tab = query.tab()?;
    let filters = query.filters()?;
    let (key, order) = query.sort()?;
    let (page, per_page) = query.pagination()?;

    let now = Utc::now();
    let snapshot = load(&state, now).await?;
    let mut sessions = compute_visible_sessions(&snapshot.sessions, tab, &filters, now);
    sort_sessions(&mut sessions, key, order);

    let counts = SessionCounts::compute(&snapshot.sessions, now);
    let page = paginate(sessions, page, per_page);

    Ok(Json(SessionListResponse {
        tab,
        sessions: page.items,
        counts,
        tab_counts: TabCounts {
            upcoming: counts.upcoming_tab(),
            past: counts.past_tab(),
        },
        active_filters: filters.active_count(),
        page: page.page,
        total_pages: page.total_pages,
        total_items: page.total_items,
        fetched_at: snapshot.fetched_at,
        refresh_error: snapshot.last_error,
    }))
}

#[utoipa::path(
    get,
    path = "/sessions/grouped",
    params(
        ("group_by" = Option<String>, Query, description = "status (default), instructor, type, location or date"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Grouped sessions", body = GroupedSessionsResponse),
        (status = 401, description = "Invalid authentication token")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "schedule"
)]
pub async fn grouped_sessions(
    State(state): State<AppState>,
    auth: BearerHeader,
    Query(query): Query<SessionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    let group_by = query.group_by()?;
    let now = Utc::now();
    let snapshot = load(&state, now).await?;
    let sessions = visible(&snapshot, &query, now)?;

    Ok(Json(GroupedSessionsResponse {
        group_by,
        groups: group_sessions(&sessions, group_by, now, state.settings.timezone),
        counts: SessionCounts::compute(&snapshot.sessions, now),
    }))
}

#[utoipa::path(
    get,
    path = "/sessions/week",
    params(
        ("date" = Option<String>, Query, description = "Any day of the week (YYYY-MM-DD), defaults to today"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Monday to Sunday", body = CalendarResponse),
        (status = 401, description = "Invalid authentication token")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "schedule"
)]
pub async fn week_sessions(
    State(state): State<AppState>,
    auth: BearerHeader,
    Query(query): Query<SessionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    let tz = state.settings.timezone;
    let now = Utc::now();
    let anchor = query.anchor_date(now.with_timezone(&tz).date_naive())?;
    let snapshot = load(&state, now).await?;
    let sessions = visible(&snapshot, &query, now)?;

    Ok(Json(CalendarResponse {
        days: week_view(&sessions, anchor, tz),
    }))
}

#[utoipa::path(
    get,
    path = "/sessions/month",
    params(
        ("date" = Option<String>, Query, description = "Any day of the month (YYYY-MM-DD), defaults to today"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Whole weeks covering the month", body = CalendarResponse),
        (status = 401, description = "Invalid authentication token")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "schedule"
)]
pub async fn month_sessions(
    State(state): State<AppState>,
    auth: BearerHeader,
    Query(query): Query<SessionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    let tz = state.settings.timezone;
    let now = Utc::now();
    let anchor = query.anchor_date(now.with_timezone(&tz).date_naive())?;
    let snapshot = load(&state, now).await?;
    let sessions = visible(&snapshot, &query, now)?;

    Ok(Json(CalendarResponse {
        days: month_view(&sessions, anchor, tz),
    }))
}

#[utoipa::path(
    get,
    path = "/sessions/filters",
    params(
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Distinct filter values", body = FilterOptions),
        (status = 401, description = "Invalid authentication token")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "schedule"
)]
pub async fn filter_options(
    State(state): State<AppState>,
    auth: BearerHeader,
    Query(query): Query<TokenQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    let snapshot = load(&state, Utc::now()).await?;
    Ok(Json(FilterOptions::from_sessions(&snapshot.sessions)))
}

#[utoipa::path(
    get,
    path = "/sessions.ical",
    params(
        ("tab" = Option<String>, Query, description = "upcoming (default) or past"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "iCal file", content_type = "text/calendar"),
        (status = 401, description = "Invalid authentication token"),
        (status = 404, description = "No sessions found")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "schedule"
)]
pub async fn get_ical(
    State(state): State<AppState>,
    auth: BearerHeader,
    Query(query): Query<SessionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    let now = Utc::now();
    let snapshot = load(&state, now).await?;
    let sessions = visible(&snapshot, &query, now)?;

    if sessions.is_empty() {
        return Err(ApiError::NotFound("No sessions found".into()));
    }

    let body = state.exporter.generate(&sessions);
    Ok((
        StatusCode::OK,
        [
            ("content-type", "text/calendar"),
            (
                "content-disposition",
                "attachment; filename=class_schedule.ics",
            ),
        ],
        body,
    ))
}

#[utoipa::path(
    post,
    path = "/sessions/refresh",
    params(
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Session list reloaded", body = RefreshResponse),
        (status = 401, description = "Invalid authentication token"),
        (status = 502, description = "Reload failed, previous list kept")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "schedule"
)]
pub async fn refresh_sessions(
    State(state): State<AppState>,
    auth: BearerHeader,
    Query(query): Query<TokenQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    let now = Utc::now();
    let sessions = state.store.refresh(&state.momence, now).await?;
    Ok(Json(RefreshResponse {
        sessions,
        fetched_at: now,
    }))
}

#[utoipa::path(
    get,
    path = "/sessions/{id}",
    params(
        ("id" = i64, Path, description = "Session id"),
        ("unlock" = Option<String>, Query, description = "Key that reveals member contact details"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Session with bookings", body = SessionDetailResponse),
        (status = 401, description = "Invalid authentication token"),
        (status = 404, description = "Session not found")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "schedule"
)]
pub async fn session_detail(
    State(state): State<AppState>,
    auth: BearerHeader,
    Path(id): Path<i64>,
    Query(query): Query<DetailQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    let visibility = contact_visibility(&state.settings, query.unlock.as_deref());

    let (session, bookings) = futures::try_join!(
        state.momence.get_session_detail(id),
        state.momence.get_session_bookings(id)
    )?;

    Ok(Json(SessionDetailResponse {
        session,
        bookings: visibility.bookings(bookings),
        contacts_revealed: visibility == ContactVisibility::Revealed,
    }))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/move",
    params(
        ("id" = i64, Path, description = "Session id"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    request_body = MoveRequest,
    responses(
        (status = 204, description = "Session moved"),
        (status = 401, description = "Invalid authentication token"),
        (status = 501, description = "Board moves are not wired to a backend")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "board"
)]
pub async fn move_session(
    State(state): State<AppState>,
    auth: BearerHeader,
    Path(id): Path<i64>,
    Query(query): Query<TokenQuery>,
    Json(request): Json<MoveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    if request.group.trim().is_empty() {
        return Err(ApiError::BadRequest("group is required".into()));
    }
    state.mover.move_session(id, request.group).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/bookings/{id}/check-in",
    params(
        ("id" = i64, Path, description = "Booking id"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 204, description = "Checked in"),
        (status = 401, description = "Invalid authentication token")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "bookings"
)]
pub async fn check_in(
    State(state): State<AppState>,
    auth: BearerHeader,
    Path(id): Path<i64>,
    Query(query): Query<TokenQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    state.momence.check_in_booking(id).await?;
    refresh_after_action(&state).await;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/bookings/{id}/check-in",
    params(
        ("id" = i64, Path, description = "Booking id"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 204, description = "Check-in reverted"),
        (status = 401, description = "Invalid authentication token")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "bookings"
)]
pub async fn check_out(
    State(state): State<AppState>,
    auth: BearerHeader,
    Path(id): Path<i64>,
    Query(query): Query<TokenQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    state.momence.check_out_booking(id).await?;
    refresh_after_action(&state).await;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/bookings/{id}",
    params(
        ("id" = i64, Path, description = "Booking id"),
        ("late" = Option<bool>, Query, description = "Late cancellation, no refund"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 204, description = "Booking cancelled"),
        (status = 401, description = "Invalid authentication token")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "bookings"
)]
pub async fn cancel_booking(
    State(state): State<AppState>,
    auth: BearerHeader,
    Path(id): Path<i64>,
    Query(query): Query<CancelQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    state.momence.cancel_booking(id, query.late).await?;
    refresh_after_action(&state).await;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/members",
    params(
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    request_body = NewMember,
    responses(
        (status = 201, description = "Member created", body = Member),
        (status = 400, description = "Missing name or invalid email"),
        (status = 401, description = "Invalid authentication token")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "bookings"
)]
pub async fn create_member(
    State(state): State<AppState>,
    auth: BearerHeader,
    Query(query): Query<TokenQuery>,
    Json(member): Json<NewMember>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref())?;
    validate_new_member(&member)?;
    let created = state.momence.create_member(member).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
