//! Request definitions
//!
//! Represents record requests from clients.

use super::Response;

const RECORDS_PATH: &str = "/records";

/// A routed request
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Create a record from a JSON body
    Create { body: Vec<u8> },

    /// Read a record by id
    Read { id: String },
}

impl Request {
    /// Route a method/path pair
    ///
    /// Unknown paths yield a 404 response, a GET without an id yields a 400,
    /// and known paths with the wrong method yield a 405, all ready to send.
    pub fn route(method: &str, path: &str, body: Vec<u8>) -> Result<Self, Response> {
        let path = path.split('?').next().unwrap_or_default().trim_end_matches('/');

        if path == RECORDS_PATH {
            return if method.eq_ignore_ascii_case("POST") {
                Ok(Request::Create { body })
            } else if method.eq_ignore_ascii_case("GET") {
                Err(Response::bad_request("Please provide a record ID."))
            } else {
                Err(Response::method_not_allowed())
            };
        }

        if let Some(id) = path
            .strip_prefix(RECORDS_PATH)
            .and_then(|rest| rest.strip_prefix('/'))
        {
            if id.contains('/') {
                return Err(Response::not_found("Unknown route."));
            }
            return if method.eq_ignore_ascii_case("GET") {
                Ok(Request::Read { id: id.to_string() })
            } else {
                Err(Response::method_not_allowed())
            };
        }

        Err(Response::not_found("Unknown route."))
    }
}
