use std::net::SocketAddr;

use axum::{
    body::Bytes,
    http::{header, request::Parts, HeaderMap, Method, Uri, Version},
};

use agora_core::validation::FormFields;

/// An inbound request with its body fully read.
///
/// The pipeline is synchronous, so the host collects the body before
/// handing the request over.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub remote_addr: Option<SocketAddr>,
}

impl Request {
    pub fn from_parts(parts: Parts, body: Bytes, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body,
            remote_addr,
        }
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Decoded query string parameters.
    pub fn query(&self) -> FormFields {
        FormFields::parse(self.uri.query().unwrap_or_default().as_bytes())
    }

    /// Decoded `application/x-www-form-urlencoded` body.
    pub fn form(&self) -> FormFields {
        FormFields::parse(&self.body)
    }

    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Value of the `Host` header, falling back to the URI authority.
    pub fn host(&self) -> Option<&str> {
        self.header(header::HOST)
            .or_else(|| self.uri.authority().map(|a| a.as_str()))
    }

    /// Client IP without the port.
    pub fn client_ip(&self) -> Option<String> {
        self.remote_addr.map(|addr| addr.ip().to_string())
    }
}

// ==================== Builders ====================

#[cfg(test)]
impl Request {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Adds a header. Invalid values are skipped.
    pub fn with_header(mut self, name: axum::http::HeaderName, value: &str) -> Self {
        if let Ok(value) = axum::http::HeaderValue::from_str(value) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }
}
