//! Protocol Module
//!
//! Maps record requests to gateway calls and gateway results to status codes.
//! A transport (HTTP server, function host) parses its own framing, calls
//! `Request::route`, then `handle`, and writes the `Response` back.
//!
//! ## Routes
//! - `POST /records`      - Body: JSON document
//! - `GET  /records/{id}` - Body: empty
//!
//! ## Status Codes
//! - 200: OK (read)
//! - 201: CREATED (create)
//! - 400: BAD_REQUEST (malformed document or id)
//! - 404: NOT_FOUND (absent from both tiers, or unknown route)
//! - 405: METHOD_NOT_ALLOWED
//! - 500: INTERNAL_ERROR (backend failure)

mod handler;
mod request;
mod response;

pub use handler::handle;
pub use request::Request;
pub use response::{Response, Status};
