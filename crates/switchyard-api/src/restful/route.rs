// ── REST route parameters ──
//
// Capability bindings carry `{ "method": "GET", "path": "/api/v1/..." }`
// per action key. This module decodes that shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::GET,
            HttpMethod::Post => Self::POST,
            HttpMethod::Put => Self::PUT,
            HttpMethod::Patch => Self::PATCH,
            HttpMethod::Delete => Self::DELETE,
        }
    }
}

/// A REST endpoint an action key maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub method: HttpMethod,
    pub path: String,
}

impl Route {
    /// Decode the route recorded in a binding for `action`.
    pub fn from_params(action: &str, params: &Value) -> Result<Self, Error> {
        let route: Self =
            serde_json::from_value(params.clone()).map_err(|e| Error::UnsupportedAction {
                action: action.to_owned(),
                reason: format!("invalid REST route parameters: {e}"),
            })?;

        if !route.path.starts_with('/') {
            return Err(Error::UnsupportedAction {
                action: action.to_owned(),
                reason: format!("route path must be absolute, got '{}'", route.path),
            });
        }
        Ok(route)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_route_parameters() {
        let route = Route::from_params(
            "GetVLAN",
            &json!({ "method": "GET", "path": "/api/v1/vlans" }),
        )
        .unwrap();
        assert_eq!(route.method, HttpMethod::Get);
        assert_eq!(route.path, "/api/v1/vlans");
    }

    #[test]
    fn rejects_missing_method() {
        let err = Route::from_params("GetVLAN", &json!({ "path": "/api/v1/vlans" })).unwrap_err();
        assert!(matches!(err, Error::UnsupportedAction { ref action, .. } if action == "GetVLAN"));
    }

    #[test]
    fn rejects_relative_path() {
        let err = Route::from_params(
            "SetVLAN",
            &json!({ "method": "PUT", "path": "api/v1/vlans" }),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedAction { .. }));
    }
}
