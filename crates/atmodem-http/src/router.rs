//! The static route table.

/// HTTP request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Trace,
    Options,
    Connect,
    Patch,
}

impl HttpMethod {
    /// Parse a request-line method token.
    pub fn from_token(token: &str) -> Option<HttpMethod> {
        match token {
            "GET" => Some(HttpMethod::Get),
            "HEAD" => Some(HttpMethod::Head),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "DELETE" => Some(HttpMethod::Delete),
            "TRACE" => Some(HttpMethod::Trace),
            "OPTIONS" => Some(HttpMethod::Options),
            "CONNECT" => Some(HttpMethod::Connect),
            "PATCH" => Some(HttpMethod::Patch),
            _ => None,
        }
    }

    /// The request-line token for this method.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Connect => "CONNECT",
            HttpMethod::Patch => "PATCH",
        }
    }
}

/// Handle to one registered route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteId(usize);

/// One registered method + path pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    method: HttpMethod,
    path: String,
}

impl Route {
    /// The route's method.
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// The route's path, e.g. `/led`.
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Table of registered routes. Requests that match no entry are answered
/// with the canned 404 page.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Create an empty table.
    pub fn new() -> Router {
        Router::default()
    }

    /// Register a route and return its handle.
    pub fn register(&mut self, method: HttpMethod, path: &str) -> RouteId {
        self.routes.push(Route {
            method,
            path: path.to_string(),
        });
        RouteId(self.routes.len() - 1)
    }

    /// Look up an exact method + path match.
    pub fn lookup(&self, method: HttpMethod, path: &str) -> Option<RouteId> {
        self.routes
            .iter()
            .position(|r| r.method == method && r.path == path)
            .map(RouteId)
    }

    /// Look up with a raw request-line method token.
    pub fn lookup_token(&self, method_token: &str, path: &str) -> Option<RouteId> {
        HttpMethod::from_token(method_token).and_then(|m| self.lookup(m, path))
    }

    /// The route behind a handle.
    pub fn route(&self, id: RouteId) -> &Route {
        &self.routes[id.0]
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut router = Router::new();
        let home = router.register(HttpMethod::Get, "/");
        let led = router.register(HttpMethod::Post, "/led");

        assert_eq!(router.lookup(HttpMethod::Get, "/"), Some(home));
        assert_eq!(router.lookup(HttpMethod::Post, "/led"), Some(led));
        assert_eq!(router.lookup(HttpMethod::Get, "/led"), None);
        assert_eq!(router.lookup(HttpMethod::Get, "/missing"), None);
        assert_eq!(router.route(led).path(), "/led");
    }

    #[test]
    fn test_lookup_token() {
        let mut router = Router::new();
        let home = router.register(HttpMethod::Get, "/");
        assert_eq!(router.lookup_token("GET", "/"), Some(home));
        assert_eq!(router.lookup_token("BREW", "/"), None);
    }

    #[test]
    fn test_method_tokens_round_trip() {
        for method in [
            HttpMethod::Get,
            HttpMethod::Head,
            HttpMethod::Post,
            HttpMethod::Put,
            HttpMethod::Delete,
            HttpMethod::Trace,
            HttpMethod::Options,
            HttpMethod::Connect,
            HttpMethod::Patch,
        ] {
            assert_eq!(HttpMethod::from_token(method.as_str()), Some(method));
        }
    }
}
