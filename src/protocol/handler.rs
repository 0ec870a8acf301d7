//! Request handler
//!
//! Executes a routed request against the gateway.

use crate::error::TierError;
use crate::gateway::Gateway;

use super::{Request, Response};

/// Execute a request and map the outcome to a response
pub fn handle(gateway: &Gateway, request: Request) -> Response {
    match request {
        Request::Create { body } => match gateway.create(&body).and_then(|r| r.to_json_bytes()) {
            Ok(json) => Response::created(json.to_vec()),
            Err(e) => error_response("create", None, e),
        },
        Request::Read { id } => match gateway.read(&id).and_then(|f| f.to_json_bytes()) {
            Ok(json) => Response::ok(json.to_vec()),
            Err(e) => error_response("read", Some(&id), e),
        },
    }
}

fn error_response(operation: &str, id: Option<&str>, error: TierError) -> Response {
    match error {
        TierError::Validation(message) => Response::bad_request(&message),
        TierError::NotFound(_) => Response::not_found("Record not found in hot or cold storage."),
        e => {
            tracing::error!(operation, record_id = ?id, error = %e, "Request failed");
            Response::internal_error("An error occurred.")
        }
    }
}
