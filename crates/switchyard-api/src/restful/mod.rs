// RESTful southbound client
//
// Token-based HTTP client for switches exposing a JSON management API.
// `client` owns transport mechanics and status mapping, `auth` the login
// flow, and `route` the translation from binding parameters to requests.

pub mod auth;
pub mod client;
pub mod route;

pub use client::{RestfulClient, RestfulConfig};
pub use route::Route;
