//! Route table and request dispatch
//!
//! Transport-independent: takes method, path, headers and body text and
//! produces a status plus JSON body, so it is tested without sockets.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tiny_http::Header;
use tracing::{error, warn};
use uuid::Uuid;

use super::auth::{caller_identity, gateway_authorized};
use crate::service::{
    AdjustPointsRequest, ErrorClass, LikeRequest, ProgressionService, ServiceError, SignRequest,
};

/// Exposed operations, logged at startup
pub const ROUTES: &[(&str, &str, &str)] = &[
    ("GET", "/healthz", "liveness probe (no auth)"),
    ("POST", "/v1/points/adjust", "AdjustPointsAndExperience"),
    ("GET", "/v1/users/me", "GetUserInfo (caller)"),
    ("GET", "/v1/users/{user_id}", "GetUserInfo"),
    ("POST", "/v1/likes", "ProcessLike"),
    ("POST", "/v1/sign", "Sign"),
    ("GET", "/v1/admin/stats", "GetAdminStats"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route<'a> {
    Health,
    Adjust,
    Me,
    User(&'a str),
    Like,
    Sign,
    AdminStats,
}

fn parse_route<'a>(method: &str, path: &'a str) -> Option<Route<'a>> {
    let path = path.trim_end_matches('/');
    match (method, path) {
        ("GET", "/healthz") => Some(Route::Health),
        ("POST", "/v1/points/adjust") => Some(Route::Adjust),
        ("GET", "/v1/users/me") => Some(Route::Me),
        ("GET", p) => p
            .strip_prefix("/v1/users/")
            .filter(|id| !id.is_empty() && !id.contains('/'))
            .map(Route::User)
            .or((p == "/v1/admin/stats").then_some(Route::AdminStats)),
        ("POST", "/v1/likes") => Some(Route::Like),
        ("POST", "/v1/sign") => Some(Route::Sign),
        _ => None,
    }
}

/// HTTP status plus JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

impl Reply {
    fn ok<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => Self { status: 200, body },
            Err(e) => {
                error!("[points:http] Failed to serialize response: {}", e);
                Self::error(500, "internal", "failed to serialize response")
            }
        }
    }

    pub fn error(status: u16, error: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": error, "message": message.into() }),
        }
    }

    fn from_service_error(err: &ServiceError, request_id: Uuid) -> Self {
        let class = err.class();
        if class == ErrorClass::Internal {
            // Internal details stay in the log
            error!(%request_id, error = %err, "[points:http] Internal error");
            return Self::error(class.http_status(), class.as_str(), "internal error");
        }
        Self::error(class.http_status(), class.as_str(), err.to_string())
    }
}

/// Dispatches authenticated requests to the service
#[derive(Clone)]
pub struct Router {
    service: ProgressionService,
    gateway_token: Option<String>,
}

impl Router {
    pub fn new(service: ProgressionService, gateway_token: Option<String>) -> Self {
        Self {
            service,
            gateway_token: gateway_token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn auth_enabled(&self) -> bool {
        self.gateway_token.is_some()
    }

    pub fn handle(&self, method: &str, path: &str, headers: &[Header], body: &str, request_id: Uuid) -> Reply {
        let Some(route) = parse_route(method, path) else {
            return Reply::error(404, "not_found", format!("no route for {method} {path}"));
        };

        if route == Route::Health {
            return Reply::ok(&json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
            }));
        }

        if !gateway_authorized(headers, self.gateway_token.as_deref()) {
            warn!(%request_id, "[points:http] Rejected request without gateway token");
            return Reply::error(401, "unauthorized", "missing or invalid gateway token");
        }

        match self.dispatch(route, headers, body) {
            Ok(reply) => reply,
            Err(e) => Reply::from_service_error(&e, request_id),
        }
    }

    fn dispatch(&self, route: Route<'_>, headers: &[Header], body: &str) -> Result<Reply, ServiceError> {
        let caller = caller_identity(headers)?;
        let service = &self.service;

        let reply = match route {
            Route::Health => Reply::ok(&json!({ "status": "ok" })),
            Route::Adjust => {
                let req: AdjustPointsRequest = parse_body(body)?;
                Reply::ok(&service.adjust_points_and_experience(&caller, &req)?)
            }
            Route::Me => Reply::ok(&service.get_user_info(&caller, None)?),
            Route::User(user_id) => Reply::ok(&service.get_user_info(&caller, Some(user_id))?),
            Route::Like => {
                let req: LikeRequest = parse_body(body)?;
                Reply::ok(&service.process_like(&caller, &req)?)
            }
            Route::Sign => {
                let req: SignRequest = if body.trim().is_empty() {
                    SignRequest::default()
                } else {
                    parse_body(body)?
                };
                Reply::ok(&service.sign(&caller, &req)?)
            }
            Route::AdminStats => Reply::ok(&service.get_admin_stats(&caller)?),
        };
        Ok(reply)
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, ServiceError> {
    serde_json::from_str(body).map_err(|e| ServiceError::InvalidArgument(format!("invalid JSON body: {e}")))
}
