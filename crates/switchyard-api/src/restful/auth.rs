// RESTful authentication
//
// Token login against the switch management API. The token is returned
// to the caller instead of being stored here: the session cache in the
// core owns token lifetime for every device.

use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::Error;
use crate::restful::client::{RestfulClient, parse_response};
use crate::southbound::Target;

pub const LOGIN_PATH: &str = "/api/v1/auth/login";

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

impl RestfulClient {
    /// Authenticate against one device and return the session token.
    ///
    /// `POST /api/v1/auth/login` with `{ username, password }`; the device
    /// answers `{ "token": "..." }`.
    pub async fn login_device(&self, target: Target<'_>) -> Result<String, Error> {
        let url = self.endpoint(target.address, LOGIN_PATH)?;
        debug!(device = %target.address, "logging in");

        let body = json!({
            "username": target.username,
            "password": target.password.expose_secret(),
        });

        let resp = self
            .http()
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let value = parse_response(resp).await?;
        let login: LoginResponse =
            serde_json::from_value(value.clone()).map_err(|e| Error::Deserialization {
                message: format!("login response without token: {e}"),
                body: value.to_string(),
            })?;

        if login.token.is_empty() {
            return Err(Error::Unauthorized {
                message: "device returned an empty session token".into(),
            });
        }

        debug!(device = %target.address, "login successful");
        Ok(login.token)
    }
}
