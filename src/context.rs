//! Request/response abstractions the gate operates on.
//!
//! The gate never touches a real HTTP stack; it works against these two
//! context types and leaves the mapping to/from the surrounding framework
//! to the caller (see the demo binary for an axum bridge).

use std::collections::HashMap;

/// Incoming-request view handed to the gate and to downstream handlers.
///
/// `attributes` is the named slot map the gate exposes the resolved
/// identity through; everything else is informational.
#[derive(Debug, Clone)]
pub struct RequestContext<T> {
    pub method: String,
    pub path: String,
    pub request_id: Option<String>,
    pub attributes: HashMap<String, T>,
}

impl<T> Default for RequestContext<T> {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            path: "/".to_string(),
            request_id: None,
            attributes: HashMap::new(),
        }
    }
}

impl<T> RequestContext<T> {
    pub fn new(method: &str, path: &str) -> Self {
        Self { method: method.to_string(), path: path.to_string(), ..Default::default() }
    }

    /// Look up a named attribute (e.g. the identity attached by the gate).
    pub fn attribute(&self, name: &str) -> Option<&T> {
        self.attributes.get(name)
    }

    pub fn set_attribute(&mut self, name: &str, value: T) {
        self.attributes.insert(name.to_string(), value);
    }
}

/// Outgoing-response view threaded through the handler chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseContext {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Default for ResponseContext {
    fn default() -> Self {
        Self { status: 200, headers: Vec::new(), body: String::new() }
    }
}

impl ResponseContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the body, preserving anything already written.
    pub fn write(&mut self, chunk: &str) {
        self.body.push_str(chunk);
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Location header + redirect status in one step.
    pub fn with_redirect(self, location: &str, status: u16) -> Self {
        self.with_header("Location", location).with_status(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_write_appends() {
        let mut resp = ResponseContext::new();
        resp.write("Forbi");
        resp.write("dden");
        assert_eq!(resp.body, "Forbidden");
        assert_eq!(resp.status, 200);
    }

    #[test]
    fn response_with_status_and_redirect() {
        let resp = ResponseContext::new().with_redirect("/", 301);
        assert_eq!(resp.status, 301);
        assert_eq!(resp.headers, vec![("Location".to_string(), "/".to_string())]);
    }

    #[test]
    fn request_attributes_round_trip() {
        let mut req: RequestContext<String> = RequestContext::new("GET", "/admin");
        assert!(req.attribute("user").is_none());
        req.set_attribute("user", "alice".to_string());
        assert_eq!(req.attribute("user").map(String::as_str), Some("alice"));
    }
}
