//! Response definitions
//!
//! Represents responses to clients.

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Status {
    Ok = 200,
    Created = 201,
    BadRequest = 400,
    NotFound = 404,
    MethodNotAllowed = 405,
    InternalError = 500,
}

impl Status {
    /// Numeric status code
    pub fn code(self) -> u16 {
        self as u16
    }
}

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const TEXT_CONTENT_TYPE: &str = "text/plain";

/// A response to send to client
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// JSON document on success, message text otherwise
    pub body: Vec<u8>,

    pub content_type: &'static str,
}

impl Response {
    /// 200 with a JSON document
    pub fn ok(body: Vec<u8>) -> Self {
        Self::json(Status::Ok, body)
    }

    /// 201 with the stored JSON document
    pub fn created(body: Vec<u8>) -> Self {
        Self::json(Status::Created, body)
    }

    pub fn bad_request(message: &str) -> Self {
        Self::text(Status::BadRequest, message)
    }

    pub fn not_found(message: &str) -> Self {
        Self::text(Status::NotFound, message)
    }

    pub fn method_not_allowed() -> Self {
        Self::text(Status::MethodNotAllowed, "Method not allowed.")
    }

    /// 500; the detail belongs in the log, not the body
    pub fn internal_error(message: &str) -> Self {
        Self::text(Status::InternalError, message)
    }

    fn json(status: Status, body: Vec<u8>) -> Self {
        Self {
            status,
            body,
            content_type: JSON_CONTENT_TYPE,
        }
    }

    fn text(status: Status, message: &str) -> Self {
        Self {
            status,
            body: message.as_bytes().to_vec(),
            content_type: TEXT_CONTENT_TYPE,
        }
    }
}
