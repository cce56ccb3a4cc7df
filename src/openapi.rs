use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::calendar::CalendarDay;
use crate::engine::{
    CapacityFilter, FilterOptions, GroupBy, SessionCounts, SessionGroup, SessionStatus, SortKey,
    SortOrder, StatusFilter, Tab,
};
use crate::handlers::{
    CalendarResponse, GroupedSessionsResponse, MoveRequest, RefreshResponse,
    SessionDetailResponse, SessionListResponse, TabCounts,
};
use crate::models::{
    Booking, BookingMember, Location, Member, NewMember, Session, SessionDetail, SessionType, Tag,
    Teacher,
};

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let Some(components) = openapi.components.as_mut() else {
            return;
        };
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
        components.add_security_scheme(
            "query_token",
            SecurityScheme::ApiKey(ApiKey::Query(ApiKeyValue::new("token"))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz_live,
        crate::handlers::healthz_ready,
        crate::handlers::list_sessions,
        crate::handlers::grouped_sessions,
        crate::handlers::week_sessions,
        crate::handlers::month_sessions,
        crate::handlers::filter_options,
        crate::handlers::get_ical,
        crate::handlers::refresh_sessions,
        crate::handlers::session_detail,
        crate::handlers::move_session,
        crate::handlers::check_in,
        crate::handlers::check_out,
        crate::handlers::cancel_booking,
        crate::handlers::create_member
    ),
    components(schemas(
        Session,
        SessionDetail,
        SessionType,
        Teacher,
        Location,
        Tag,
        Booking,
        BookingMember,
        Member,
        NewMember,
        Tab,
        SessionStatus,
        StatusFilter,
        CapacityFilter,
        SortKey,
        SortOrder,
        GroupBy,
        SessionCounts,
        SessionGroup,
        FilterOptions,
        CalendarDay,
        TabCounts,
        SessionListResponse,
        GroupedSessionsResponse,
        CalendarResponse,
        SessionDetailResponse,
        RefreshResponse,
        MoveRequest
    )),
    tags(
        (name = "schedule", description = "Session listing, filtering and views"),
        (name = "board", description = "Board column moves"),
        (name = "bookings", description = "Booking and member actions")
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;
