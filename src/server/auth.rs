//! Gateway authentication and caller identity headers
//!
//! The upstream gateway has already authenticated the principal; this module
//! only checks the shared gateway token and turns the identity headers into a
//! [`CallerIdentity`].

use tiny_http::Header;

use crate::service::{CallerIdentity, Role, ServiceError};

pub const TOKEN_HEADER: &str = "X-Points-Token";
pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_NAME_HEADER: &str = "X-User-Name";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// First value of header `name` (case-insensitive), trimmed
pub fn header_value<'a>(headers: &'a [Header], name: &'static str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.field.equiv(name))
        .map(|h| h.value.as_str().trim())
}

/// True when no gateway token is configured or the request carries it
pub fn gateway_authorized(headers: &[Header], expected: Option<&str>) -> bool {
    let Some(expected) = expected.filter(|t| !t.trim().is_empty()) else {
        return true;
    };

    header_value(headers, TOKEN_HEADER)
        .map(|v| v == expected)
        .unwrap_or(false)
}

/// Build the caller identity from the gateway's headers.
///
/// A missing user id or an unknown role is an authentication failure. The
/// role defaults to `user` and the username to the user id.
pub fn caller_identity(headers: &[Header]) -> Result<CallerIdentity, ServiceError> {
    let user_id = header_value(headers, USER_ID_HEADER)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServiceError::Unauthenticated(format!("missing {USER_ID_HEADER} header")))?;

    let username = header_value(headers, USER_NAME_HEADER)
        .filter(|v| !v.is_empty())
        .unwrap_or(user_id);

    let role = match header_value(headers, USER_ROLE_HEADER).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse::<Role>()
            .map_err(|e| ServiceError::Unauthenticated(e.to_string()))?,
        None => Role::User,
    };

    Ok(CallerIdentity::new(user_id, username, role))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(name: &str, value: &str) -> Header {
        Header::from_bytes(name.as_bytes(), value.as_bytes()).unwrap()
    }

    #[test]
    fn test_gateway_token() {
        let headers = vec![header("x-points-token", "s3cret")];
        assert!(gateway_authorized(&headers, Some("s3cret")));
        assert!(!gateway_authorized(&headers, Some("other")));
        assert!(!gateway_authorized(&[], Some("s3cret")));
        // Empty configured token disables the check
        assert!(gateway_authorized(&[], Some("  ")));
        assert!(gateway_authorized(&[], None));
    }

    #[test]
    fn test_identity_defaults() {
        let identity = caller_identity(&[header(USER_ID_HEADER, "42")]).unwrap();
        assert_eq!(identity, CallerIdentity::user("42", "42"));
    }

    #[test]
    fn test_identity_with_role() {
        let headers = vec![
            header(USER_ID_HEADER, "1"),
            header(USER_NAME_HEADER, "root"),
            header(USER_ROLE_HEADER, "ADMIN"),
        ];
        assert_eq!(caller_identity(&headers).unwrap(), CallerIdentity::admin("1", "root"));
    }

    #[test]
    fn test_identity_rejects_missing_id_and_unknown_role() {
        assert!(matches!(
            caller_identity(&[header(USER_NAME_HEADER, "anon")]),
            Err(ServiceError::Unauthenticated(_))
        ));

        let headers = vec![header(USER_ID_HEADER, "1"), header(USER_ROLE_HEADER, "superuser")];
        assert!(matches!(
            caller_identity(&headers),
            Err(ServiceError::Unauthenticated(_))
        ));
    }
}
