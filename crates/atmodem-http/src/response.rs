//! Canned HTTP responses.

/// Body of the generic success page.
pub const HTML_OK: &str = "<html><body><h1>Success!</h1></body></html>";

/// Body of the generic 404 page.
pub const HTML_NOT_FOUND: &str = "<html><body><h1>Requested page does not exist!</h1></body></html>";

/// Build a complete HTTP/1.1 response with an HTML body.
///
/// The connection is always closed after one response; the body's trailing
/// CRLF is counted in `Content-Length`.
pub fn html_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nConnection: Closed\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\n\r\n{}\r\n",
        status,
        body.len() + 2,
        body
    )
}

/// The generic `200 OK` response.
pub fn ok_page() -> String {
    html_response("200 OK", HTML_OK)
}

/// The generic `404 NOT FOUND` response.
pub fn not_found_page() -> String {
    html_response("404 NOT FOUND", HTML_NOT_FOUND)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_page_shape() {
        let page = ok_page();
        assert!(page.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(page.contains("Content-Length: 45\r\n"));
        assert!(page.ends_with("</body></html>\r\n"));
    }

    #[test]
    fn test_not_found_page_shape() {
        let page = not_found_page();
        assert!(page.starts_with("HTTP/1.1 404 NOT FOUND\r\n"));
        assert!(page.contains("Content-Length: 67\r\n"));
    }

    #[test]
    fn test_content_length_counts_trailing_crlf() {
        let page = html_response("200 OK", "abc");
        assert!(page.contains("Content-Length: 5\r\n"));
        assert!(page.ends_with("\r\n\r\nabc\r\n"));
    }
}
