use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

/// The single response of a request.
///
/// Status and headers can change until the first write. After that the
/// sink only accepts more body bytes.
#[derive(Debug)]
pub struct ResponseSink {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    written: bool,
}

impl Default for ResponseSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseSink {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            written: false,
        }
    }

    /// A written plain-text response, for when nothing else can render.
    pub fn plain(status: StatusCode, message: &str) -> Self {
        let mut sink = Self::new();
        sink.set_status(status);
        sink.set_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        sink.write_body(message.as_bytes());
        sink
    }

    pub fn is_written(&self) -> bool {
        self.written
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Bytes written so far.
    pub fn current_size(&self) -> usize {
        self.body.len()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns false, and changes nothing, once the response is written.
    pub fn set_status(&mut self, status: StatusCode) -> bool {
        if self.written {
            tracing::warn!(%status, "status change after response was written");
            return false;
        }
        self.status = status;
        true
    }

    /// Replaces a header. Returns false once the response is written.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> bool {
        if self.written {
            tracing::warn!(header = %name, "header change after response was written");
            return false;
        }
        self.headers.insert(name, value);
        true
    }

    /// Adds a header without replacing earlier values.
    pub fn append_header(&mut self, name: HeaderName, value: HeaderValue) -> bool {
        if self.written {
            tracing::warn!(header = %name, "header change after response was written");
            return false;
        }
        self.headers.append(name, value);
        true
    }

    /// Appends body bytes and freezes status and headers.
    ///
    /// Session persistence hooks into the first write, so callers go through
    /// `RequestScope::write` rather than calling this directly.
    pub(crate) fn write_body(&mut self, bytes: &[u8]) {
        self.written = true;
        self.body.extend_from_slice(bytes);
    }
}

impl IntoResponse for ResponseSink {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_new_sink_is_unwritten() {
        let sink = ResponseSink::new();
        assert!(!sink.is_written());
        assert_eq!(sink.status(), StatusCode::OK);
        assert_eq!(sink.current_size(), 0);
    }

    #[test]
    fn test_status_and_headers_freeze_after_write() {
        let mut sink = ResponseSink::new();
        assert!(sink.set_status(StatusCode::CREATED));
        sink.write_body(b"hello");

        assert!(sink.is_written());
        assert!(!sink.set_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!sink.set_header(header::LOCATION, HeaderValue::from_static("/")));
        assert_eq!(sink.status(), StatusCode::CREATED);
        assert!(sink.headers().get(header::LOCATION).is_none());

        sink.write_body(b" world");
        assert_eq!(sink.current_size(), 11);
        assert_eq!(sink.body(), b"hello world");
    }

    #[test]
    fn test_empty_write_still_marks_written() {
        let mut sink = ResponseSink::new();
        sink.write_body(&[]);
        assert!(sink.is_written());
        assert_eq!(sink.current_size(), 0);
    }

    #[tokio::test]
    async fn test_into_response() {
        let response = ResponseSink::plain(StatusCode::BAD_GATEWAY, "upstream").into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"upstream");
    }
}
