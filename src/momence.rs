//! Client for the Momence host API.
//!
//! Tokens come from the password grant and are refreshed five minutes
//! before they expire. A request answered with 401 triggers a fresh login
//! and is retried once.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::{Method, Response, StatusCode, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::models::{Booking, Member, NewMember, Paginated, Session, SessionDetail};
use crate::settings::Settings;

const REFRESH_MARGIN_MINUTES: i64 = 5;
const BOOKINGS_PAGE_SIZE: u32 = 50;
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Error)]
pub enum MomenceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Authentication failed with status {0}")]
    Auth(StatusCode),
    #[error("API error: {status} - {body}")]
    Api { status: StatusCode, body: String },
    #[error("Expected JSON but got {0}")]
    UnexpectedContent(String),
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl MomenceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, MomenceError::Api { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Which sessions `list_sessions` asks for.
#[derive(Debug, Clone, Copy)]
pub struct SessionScope {
    pub location_id: i64,
    pub lookback_days: i64,
    pub page_size: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    access_token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct TokenState {
    access: String,
    refresh: String,
    expires_at: DateTime<Utc>,
}

impl TokenState {
    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at - Duration::minutes(REFRESH_MARGIN_MINUTES)
    }
}

impl From<TokenResponse> for TokenState {
    fn from(value: TokenResponse) -> Self {
        Self {
            access: value.access_token,
            refresh: value.refresh_token,
            expires_at: value.access_token_expires_at,
        }
    }
}

pub struct MomenceClient {
    client: reqwest::Client,
    base_url: Arc<Url>,
    credentials: Credentials,
    scope: SessionScope,
    tokens: Mutex<Option<TokenState>>,
}

impl MomenceClient {
    pub fn new(base_url: Url, credentials: Credentials, scope: SessionScope) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: Arc::new(base_url),
            credentials,
            scope,
            tokens: Mutex::new(None),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.momence_base_url.clone(),
            Credentials {
                client_id: settings.momence_client_id.clone(),
                client_secret: settings.momence_client_secret.clone(),
                username: settings.momence_username.clone(),
                password: settings.momence_password.clone(),
            },
            SessionScope {
                location_id: settings.location_id,
                lookback_days: settings.lookback_days,
                page_size: settings.page_size,
            },
        )
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    async fn request_token(&self, grant: &[(&str, &str)]) -> Result<TokenState, MomenceError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(grant)
            .finish();
        let response = self
            .client
            .post(self.endpoint("/auth/token"))
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .header(header::ACCEPT, "application/json")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MomenceError::Auth(response.status()));
        }
        let token: TokenResponse = Self::decode(response).await?;
        Ok(token.into())
    }

    async fn login(&self) -> Result<TokenState, MomenceError> {
        info!(username = %self.credentials.username, "authenticating with Momence");
        self.request_token(&[
            ("grant_type", "password"),
            ("username", self.credentials.username.as_str()),
            ("password", self.credentials.password.as_str()),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenState, MomenceError> {
        debug!("refreshing Momence access token");
        self.request_token(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    /// Returns a usable access token, logging in or refreshing as needed.
    async fn access_token(&self, force_login: bool) -> Result<String, MomenceError> {
        let mut tokens = self.tokens.lock().await;
        let now = Utc::now();

        let next = match tokens.as_ref() {
            Some(current) if !force_login && !current.needs_refresh(now) => {
                return Ok(current.access.clone());
            }
            Some(current) if !force_login => match self.refresh(&current.refresh).await {
                Ok(state) => state,
                Err(err) => {
                    warn!(error = %err, "token refresh failed, logging in again");
                    self.login().await?
                }
            },
            _ => self.login().await?,
        };

        let access = next.access.clone();
        *tokens = Some(next);
        Ok(access)
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, MomenceError> {
        let build = |token: &str| {
            let request = self
                .client
                .request(method.clone(), url)
                .bearer_auth(token)
                .header(header::ACCEPT, "application/json");
            match body {
                Some(json) => request.json(json),
                None => request,
            }
        };

        let token = self.access_token(false).await?;
        let mut response = build(&token).send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(%url, "access token rejected, retrying after login");
            let token = self.access_token(true).await?;
            response = build(&token).send().await?;
        }

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(MomenceError::Api {
                status,
                body: text.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, MomenceError> {
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown content type")
            .to_string();
        if !content_type.contains("application/json") {
            return Err(MomenceError::UnexpectedContent(content_type));
        }
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Walks every page of a list endpoint.
    async fn fetch_all<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        page_size: u32,
    ) -> Result<Vec<T>, MomenceError> {
        let mut items = Vec::new();
        let mut page: u32 = 0;
        loop {
            let mut query = vec![
                ("page", page.to_string()),
                ("pageSize", page_size.to_string()),
            ];
            query.extend(params.iter().map(|(k, v)| (*k, v.clone())));
            let url = Url::parse_with_params(&self.endpoint(path), &query)?;

            let response = self.send(Method::GET, url.as_str(), None).await?;
            let batch: Paginated<T> = Self::decode(response).await?;
            let received = batch.payload.len();
            items.extend(batch.payload);

            if received == 0 || items.len() >= batch.pagination.total_count as usize {
                break;
            }
            page += 1;
        }
        Ok(items)
    }

    /// All sessions from `lookback_days` before `now` onwards, cancelled
    /// ones included, ordered by start time.
    pub async fn list_sessions(&self, now: DateTime<Utc>) -> Result<Vec<Session>, MomenceError> {
        let start_after = (now - Duration::days(self.scope.lookback_days))
            .date_naive()
            .to_string();
        let params = [
            ("sortOrder", "ASC".to_string()),
            ("sortBy", "startsAt".to_string()),
            ("includeCancelled", "true".to_string()),
            ("locationId", self.scope.location_id.to_string()),
            ("startAfter", start_after),
            ("types", "fitness".to_string()),
            ("types", "private".to_string()),
        ];
        let mut sessions: Vec<Session> = self
            .fetch_all("/host/sessions", &params, self.scope.page_size)
            .await?;
        sessions.sort_by_key(|s| s.starts_at);
        debug!(count = sessions.len(), "fetched sessions");
        Ok(sessions)
    }

    pub async fn get_session_detail(&self, session_id: i64) -> Result<SessionDetail, MomenceError> {
        let url = self.endpoint(&format!("/host/sessions/{session_id}"));
        let response = self.send(Method::GET, &url, None).await?;
        Self::decode(response).await
    }

    pub async fn get_session_bookings(&self, session_id: i64) -> Result<Vec<Booking>, MomenceError> {
        self.fetch_all(
            &format!("/host/sessions/{session_id}/bookings"),
            &[],
            BOOKINGS_PAGE_SIZE,
        )
        .await
    }

    pub async fn check_in_booking(&self, booking_id: i64) -> Result<(), MomenceError> {
        let url = self.endpoint(&format!("/host/session-bookings/{booking_id}/check-in"));
        self.send(Method::POST, &url, None).await?;
        info!(booking_id, "booking checked in");
        Ok(())
    }

    pub async fn check_out_booking(&self, booking_id: i64) -> Result<(), MomenceError> {
        let url = self.endpoint(&format!("/host/session-bookings/{booking_id}/check-in"));
        self.send(Method::DELETE, &url, None).await?;
        info!(booking_id, "booking checked out");
        Ok(())
    }

    /// Late cancellations are not refunded.
    pub async fn cancel_booking(
        &self,
        booking_id: i64,
        is_late_cancellation: bool,
    ) -> Result<(), MomenceError> {
        let url = self.endpoint(&format!("/host/session-bookings/{booking_id}"));
        let body = serde_json::json!({
            "refund": !is_late_cancellation,
            "disableNotifications": true,
            "isLateCancellation": is_late_cancellation,
        });
        self.send(Method::DELETE, &url, Some(&body)).await?;
        info!(booking_id, is_late_cancellation, "booking cancelled");
        Ok(())
    }

    pub async fn create_member(&self, member: NewMember) -> Result<Member, MomenceError> {
        let member = NewMember {
            home_location_id: member.home_location_id.or(Some(self.scope.location_id)),
            ..member
        };
        let body = serde_json::to_value(&member)?;
        let response = self
            .send(Method::POST, &self.endpoint("/host/members"), Some(&body))
            .await?;
        Self::decode(response).await
    }
}
