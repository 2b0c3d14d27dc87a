//! Request-header provider supplied by the host application

use std::collections::HashMap;

/// Supplies headers the host requires on its own endpoints
pub trait HeaderProvider: Send + Sync {
    fn request_headers(&self) -> HashMap<String, String>;
}

/// Fixed set of headers, usually taken from `host.headers` in settings
#[derive(Debug, Clone, Default)]
pub struct StaticHeaders(HashMap<String, String>);

impl StaticHeaders {
    pub fn new(headers: HashMap<String, String>) -> Self {
        Self(headers)
    }
}

impl HeaderProvider for StaticHeaders {
    fn request_headers(&self) -> HashMap<String, String> {
        self.0.clone()
    }
}
