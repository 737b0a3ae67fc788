//! Request-line parsing.
//!
//! Only the first line of a request is inspected: method, path and an
//! optional query string. Everything after it is ignored; that is all the
//! route table needs.

use crate::error::{HttpError, HttpResult};

/// The parsed first line of an HTTP request. Borrows the frame payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLine<'a> {
    /// Raw method token, e.g. `GET`.
    pub method: &'a str,
    /// Path without the query string, e.g. `/led`.
    pub path: &'a str,
    /// Query string after `?`, e.g. `on=1&level=5`.
    pub query: Option<&'a str>,
}

impl<'a> RequestLine<'a> {
    /// Parse the request line out of a frame payload.
    ///
    /// A payload without the `HTTP/` version marker anywhere is rejected as
    /// [`HttpError::NotHttp`]; there is no point answering such a client
    /// with an error page.
    pub fn parse(payload: &'a [u8]) -> HttpResult<RequestLine<'a>> {
        if !payload.windows(5).any(|w| w == b"HTTP/") {
            return Err(HttpError::NotHttp);
        }
        let line_end = payload
            .iter()
            .position(|&b| b == b'\r' || b == b'\n')
            .unwrap_or(payload.len());
        let line = std::str::from_utf8(&payload[..line_end])
            .map_err(|_| HttpError::BadRequest("request line is not valid UTF-8".to_string()))?;

        let mut tokens = line.split_whitespace();
        let method = tokens
            .next()
            .ok_or_else(|| HttpError::BadRequest("empty request line".to_string()))?;
        let target = tokens
            .next()
            .ok_or_else(|| HttpError::BadRequest("missing request target".to_string()))?;

        let (path, query) = match target.split_once('?') {
            Some((path, query)) if !query.is_empty() => (path, Some(query)),
            Some((path, _)) => (path, None),
            None => (target, None),
        };

        Ok(RequestLine { method, path, query })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_request() {
        let line = RequestLine::parse(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
        assert_eq!(line.method, "GET");
        assert_eq!(line.path, "/");
        assert_eq!(line.query, None);
    }

    #[test]
    fn test_parse_with_query() {
        let line = RequestLine::parse(b"GET /led?on=1&level=5 HTTP/1.1\r\n").unwrap();
        assert_eq!(line.method, "GET");
        assert_eq!(line.path, "/led");
        assert_eq!(line.query, Some("on=1&level=5"));
    }

    #[test]
    fn test_parse_empty_query() {
        let line = RequestLine::parse(b"GET /led? HTTP/1.1\r\n").unwrap();
        assert_eq!(line.path, "/led");
        assert_eq!(line.query, None);
    }

    #[test]
    fn test_rejects_non_http_payload() {
        assert!(matches!(
            RequestLine::parse(b"hello raw tcp"),
            Err(HttpError::NotHttp)
        ));
    }

    #[test]
    fn test_rejects_bare_version_marker() {
        assert!(matches!(
            RequestLine::parse(b"HTTP/1.1"),
            Err(HttpError::BadRequest(_))
        ));
    }
}
