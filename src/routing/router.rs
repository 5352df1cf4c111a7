//! Route table module
//!
//! An ordered table of `(method, pattern, endpoint)` entries searched linearly.
//! Patterns are `/`-separated literals with `:name` placeholders.

use hyper::Method;

/// One piece of a route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Compile a pattern such as `/api/notes/:id`
    pub fn parse(raw: &str) -> Self {
        let segments = split_path(raw)
            .map(|s| match s.strip_prefix(':') {
                Some(name) if !name.is_empty() => Segment::Param(name.to_string()),
                _ => Segment::Literal(s.to_string()),
            })
            .collect();
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match a request path, returning captured parameters
    pub fn matches(&self, path: &str) -> Option<Params> {
        let mut params = Params::default();
        let mut parts = split_path(path);

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(lit) => {
                    if lit != part {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = urlencoding::decode(part)
                        .map_or_else(|_| part.to_string(), std::borrow::Cow::into_owned);
                    params.push(name.clone(), value);
                }
            }
        }

        // Pattern exhausted; path must be too
        if parts.next().is_some() {
            return None;
        }
        Some(params)
    }
}

/// Non-empty path segments; a trailing slash is ignored
fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Captured path parameters in pattern order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    fn push(&mut self, name: String, value: String) {
        self.0.push((name, value));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Result of a route table lookup
#[derive(Debug, PartialEq, Eq)]
pub enum Lookup<T> {
    Found { endpoint: T, params: Params },
    /// Path is known but not for this method
    MethodNotAllowed { allow: Vec<Method> },
    NotFound,
}

#[derive(Debug, Clone)]
struct Route<T> {
    method: Method,
    pattern: Pattern,
    endpoint: T,
}

/// Linear route table
#[derive(Debug, Clone)]
pub struct Router<T> {
    routes: Vec<Route<T>>,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<T: Copy> Router<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route; earlier routes take precedence
    #[must_use]
    pub fn route(mut self, method: Method, pattern: &str, endpoint: T) -> Self {
        self.routes.push(Route {
            method,
            pattern: Pattern::parse(pattern),
            endpoint,
        });
        self
    }

    #[must_use]
    pub fn get(self, pattern: &str, endpoint: T) -> Self {
        self.route(Method::GET, pattern, endpoint)
    }

    #[must_use]
    pub fn post(self, pattern: &str, endpoint: T) -> Self {
        self.route(Method::POST, pattern, endpoint)
    }

    #[must_use]
    pub fn put(self, pattern: &str, endpoint: T) -> Self {
        self.route(Method::PUT, pattern, endpoint)
    }

    #[must_use]
    pub fn delete(self, pattern: &str, endpoint: T) -> Self {
        self.route(Method::DELETE, pattern, endpoint)
    }

    /// Registered `(method, pattern)` pairs in table order
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &str)> + '_ {
        self.routes.iter().map(|r| (&r.method, r.pattern.as_str()))
    }

    /// Find the first route matching method and path
    ///
    /// `HEAD` is served by `GET` routes.
    pub fn lookup(&self, method: &Method, path: &str) -> Lookup<T> {
        let mut allow: Vec<Method> = Vec::new();

        for route in &self.routes {
            let Some(params) = route.pattern.matches(path) else {
                continue;
            };

            if route.method == *method || (*method == Method::HEAD && route.method == Method::GET)
            {
                return Lookup::Found {
                    endpoint: route.endpoint,
                    params,
                };
            }

            if !allow.contains(&route.method) {
                allow.push(route.method.clone());
            }
        }

        if allow.is_empty() {
            return Lookup::NotFound;
        }

        if allow.contains(&Method::GET) && !allow.contains(&Method::HEAD) {
            allow.push(Method::HEAD);
        }
        allow.push(Method::OPTIONS);
        Lookup::MethodNotAllowed { allow }
    }

    /// Methods registered for a path, for `OPTIONS` and `Allow`
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        match self.lookup(&Method::OPTIONS, path) {
            Lookup::MethodNotAllowed { allow } => allow,
            Lookup::Found { .. } | Lookup::NotFound => Vec::new(),
        }
    }
}

/// Render methods for an `Allow` header
pub fn allow_header(methods: &[Method]) -> String {
    methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Router<&'static str> {
        Router::new()
            .get("/", "home")
            .get("/api/notes", "list")
            .post("/api/notes", "create")
            .get("/api/notes/:id", "read")
            .put("/api/notes/:id", "update")
            .delete("/api/notes/:id", "delete")
            .get("/api/notes/search", "never")
    }

    fn found(lookup: Lookup<&'static str>) -> (&'static str, Params) {
        match lookup {
            Lookup::Found { endpoint, params } => (endpoint, params),
            other => panic!("Expected Found, got {other:?}"),
        }
    }

    #[test]
    fn test_exact_match() {
        let router = table();
        let (endpoint, params) = found(router.lookup(&Method::GET, "/api/notes"));
        assert_eq!(endpoint, "list");
        assert_eq!(params, Params::default());

        let (endpoint, _) = found(router.lookup(&Method::POST, "/api/notes"));
        assert_eq!(endpoint, "create");
    }

    #[test]
    fn test_root_and_trailing_slash() {
        let router = table();
        assert_eq!(found(router.lookup(&Method::GET, "/")).0, "home");
        assert_eq!(found(router.lookup(&Method::GET, "/api/notes/")).0, "list");
    }

    #[test]
    fn test_params_are_captured_and_decoded() {
        let router = table();
        let (endpoint, params) = found(router.lookup(&Method::GET, "/api/notes/42"));
        assert_eq!(endpoint, "read");
        assert_eq!(params.get("id"), Some("42"));

        let (_, params) = found(router.lookup(&Method::DELETE, "/api/notes/a%20b"));
        assert_eq!(params.get("id"), Some("a b"));
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn test_first_registered_wins() {
        let router = table();
        // "/api/notes/:id" was registered before the literal "search" route
        assert_eq!(
            found(router.lookup(&Method::GET, "/api/notes/search")).0,
            "read"
        );
    }

    #[test]
    fn test_head_uses_get_routes() {
        let router = table();
        assert_eq!(found(router.lookup(&Method::HEAD, "/api/notes/1")).0, "read");
    }

    #[test]
    fn test_method_not_allowed() {
        let router = table();
        match router.lookup(&Method::PATCH, "/api/notes/1") {
            Lookup::MethodNotAllowed { allow } => {
                assert_eq!(
                    allow_header(&allow),
                    "GET, PUT, DELETE, HEAD, OPTIONS"
                );
            }
            other => panic!("Expected MethodNotAllowed, got {other:?}"),
        }
    }

    #[test]
    fn test_not_found() {
        let router = table();
        assert_eq!(router.lookup(&Method::GET, "/nope"), Lookup::NotFound);
        assert_eq!(router.lookup(&Method::GET, "/api/notes/1/extra"), Lookup::NotFound);
        // literal segments are case-sensitive
        assert_eq!(router.lookup(&Method::GET, "/API/notes"), Lookup::NotFound);
    }

    #[test]
    fn test_allowed_methods() {
        let router = table();
        assert_eq!(
            allow_header(&router.allowed_methods("/api/notes")),
            "GET, POST, HEAD, OPTIONS"
        );
        assert!(router.allowed_methods("/unknown").is_empty());
    }

    #[test]
    fn test_routes_listing() {
        let router = table();
        let listed: Vec<String> = router.routes().map(|(m, p)| format!("{m} {p}")).collect();
        assert_eq!(listed.len(), 7);
        assert_eq!(listed[0], "GET /");
        assert_eq!(listed[3], "GET /api/notes/:id");
    }

    #[test]
    fn test_pattern_parse() {
        let pattern = Pattern::parse("/users/:id/files");
        assert_eq!(pattern.as_str(), "/users/:id/files");
        assert!(pattern.matches("/users/7/files").is_some());
        assert!(pattern.matches("/users//files").is_none());
    }
}
