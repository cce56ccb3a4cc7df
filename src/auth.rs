use crate::settings::Settings;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;

use crate::error::ApiError;
use crate::masking::ContactVisibility;

pub fn verify_token(
    settings: &Settings,
    auth: Option<Authorization<Bearer>>,
    query_token: Option<&str>,
) -> Result<(), ApiError> {
    let provided_token = auth
        .map(|a| a.token().to_string())
        .or_else(|| query_token.map(|s| s.to_string()));
    match provided_token {
        Some(token) if token == settings.auth_token => Ok(()),
        _ => Err(ApiError::Unauthorized(
            "Invalid authentication token".into(),
        )),
    }
}

/// Contacts are shown in the clear only for the configured unlock key.
pub fn contact_visibility(settings: &Settings, unlock: Option<&str>) -> ContactVisibility {
    match (settings.contact_unlock_key.as_deref(), unlock) {
        (Some(key), Some(given)) if !key.is_empty() && key == given => ContactVisibility::Revealed,
        _ => ContactVisibility::Masked,
    }
}

#[cfg(test)]
pub(crate) fn test_settings() -> Settings {
    use url::Url;

    Settings {
        momence_base_url: Url::parse("https://example.com").unwrap(),
        momence_client_id: "client".to_string(),
        momence_client_secret: "secret".to_string(),
        momence_username: "desk@example.com".to_string(),
        momence_password: "password".to_string(),
        location_id: 36372,
        lookback_days: 30,
        page_size: 200,
        timezone: chrono_tz::Asia::Kolkata,
        debug: false,
        auth_token: "secret".to_string(),
        contact_unlock_key: Some("2303".to_string()),
        enable_swagger: true,
        port: 8080,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_token_header() {
        let settings = test_settings();
        let auth = Authorization::bearer("secret").unwrap();
        assert!(verify_token(&settings, Some(auth), None).is_ok());
    }

    #[test]
    fn test_verify_token_query() {
        let settings = test_settings();
        assert!(verify_token(&settings, None, Some("secret")).is_ok());
        assert!(verify_token(&settings, None, Some("bad")).is_err());
        assert!(verify_token(&settings, None, None).is_err());
    }

    #[test]
    fn test_contact_visibility() {
        let mut settings = test_settings();
        assert_eq!(
            contact_visibility(&settings, Some("2303")),
            ContactVisibility::Revealed
        );
        assert_eq!(
            contact_visibility(&settings, Some("0000")),
            ContactVisibility::Masked
        );
        assert_eq!(contact_visibility(&settings, None), ContactVisibility::Masked);

        settings.contact_unlock_key = None;
        assert_eq!(
            contact_visibility(&settings, Some("2303")),
            ContactVisibility::Masked
        );
    }
}
