//! A small path router compiled from `:param` and `*` patterns
//!
//! Patterns are compiled once into a segment list rather than a regex:
//! `Literal` segments compare verbatim, `Param` segments capture one
//! path token, and a terminal `Wildcard` captures everything left
//! (including nothing) under the `*` parameter key. Matching scans
//! registered routes in order and returns the first hit.

use std::collections::HashMap;

use http::Method;

pub type Params = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Wildcard,
}

fn compile(pattern: &str) -> Vec<Segment> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match s {
            "*" => Segment::Wildcard,
            _ if s.starts_with(':') => Segment::Param(s[1..].to_string()),
            _ => Segment::Literal(s.to_string()),
        })
        .collect()
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn match_segments(segments: &[Segment], parts: &[&str]) -> Option<Params> {
    let mut params = Params::new();
    let mut index = 0;
    for segment in segments {
        match segment {
            Segment::Wildcard => {
                params.insert("*".to_string(), parts[index..].join("/"));
                return Some(params);
            }
            Segment::Literal(literal) => {
                if parts.get(index) != Some(&literal.as_str()) {
                    return None;
                }
                index += 1;
            }
            Segment::Param(name) => {
                let value = parts.get(index)?;
                params.insert(name.clone(), value.to_string());
                index += 1;
            }
        }
    }
    (index == parts.len()).then_some(params)
}

struct Route<H> {
    method: Method,
    segments: Vec<Segment>,
    handler: H,
}

/// First-match-wins router over `(method, pattern) -> handler` entries.
pub struct Router<H> {
    routes: Vec<Route<H>>,
}

impl<H> Default for Router<H> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<H> Router<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, method: Method, pattern: &str, handler: H) {
        self.routes.push(Route { method, segments: compile(pattern), handler });
    }

    /// Look up `(method, path)`. HEAD and OPTIONS fall back to a
    /// registered GET route when no exact-method route matches.
    pub fn matches(&self, method: &Method, path: &str) -> Option<(&H, Params)> {
        let parts = split_path(path);
        if let Some(found) = self.try_match(method, &parts) {
            return Some(found);
        }
        if *method == Method::HEAD || *method == Method::OPTIONS {
            return self.try_match(&Method::GET, &parts);
        }
        None
    }

    fn try_match(&self, method: &Method, parts: &[&str]) -> Option<(&H, Params)> {
        self.routes
            .iter()
            .filter(|route| route.method == *method)
            .find_map(|route| match_segments(&route.segments, parts).map(|params| (&route.handler, params)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_literal_path() {
        let mut router = Router::new();
        router.add(Method::GET, "/auth/info", "list-users");
        let (handler, params) = router.matches(&Method::GET, "/auth/info").unwrap();
        assert_eq!(*handler, "list-users");
        assert!(params.is_empty());
    }

    #[test]
    fn captures_named_params() {
        let mut router = Router::new();
        router.add(Method::GET, "/auth/info/:username", "get-user");
        let (handler, params) = router.matches(&Method::GET, "/auth/info/alice").unwrap();
        assert_eq!(*handler, "get-user");
        assert_eq!(params.get("username"), Some(&"alice".to_string()));
    }

    #[test]
    fn wildcard_captures_suffix_including_empty() {
        let mut router = Router::new();
        router.add(Method::GET, "/private/*", "private-get");

        let (_, params) = router.matches(&Method::GET, "/private/notes/today.json").unwrap();
        assert_eq!(params.get("*"), Some(&"notes/today.json".to_string()));

        let (_, params) = router.matches(&Method::GET, "/private").unwrap();
        assert_eq!(params.get("*"), Some(&String::new()));
    }

    #[test]
    fn segment_count_mismatch_does_not_match() {
        let mut router = Router::new();
        router.add(Method::GET, "/auth/info/:username", "get-user");
        assert!(router.matches(&Method::GET, "/auth/info/alice/extra").is_none());
        assert!(router.matches(&Method::GET, "/auth/info").is_none());
    }

    #[test]
    fn first_registered_route_wins_on_ambiguity() {
        let mut router = Router::new();
        router.add(Method::GET, "/auth/info/:username", "specific");
        router.add(Method::GET, "/auth/info/*", "catch-all");
        let (handler, _) = router.matches(&Method::GET, "/auth/info/alice").unwrap();
        assert_eq!(*handler, "specific");
    }

    #[test]
    fn head_falls_back_to_get_when_unregistered() {
        let mut router = Router::new();
        router.add(Method::GET, "/private/*", "private-get");
        let (handler, _) = router.matches(&Method::HEAD, "/private/notes.json").unwrap();
        assert_eq!(*handler, "private-get");
    }

    #[test]
    fn options_falls_back_to_get_when_unregistered() {
        let mut router = Router::new();
        router.add(Method::GET, "/auth/info", "list-users");
        let (handler, _) = router.matches(&Method::OPTIONS, "/auth/info").unwrap();
        assert_eq!(*handler, "list-users");
    }

    #[test]
    fn explicit_head_route_takes_priority_over_fallback() {
        let mut router = Router::new();
        router.add(Method::GET, "/private/*", "private-get");
        router.add(Method::HEAD, "/private/*", "private-head");
        let (handler, _) = router.matches(&Method::HEAD, "/private/notes.json").unwrap();
        assert_eq!(*handler, "private-head");
    }

    #[test]
    fn post_does_not_fall_back() {
        let mut router = Router::new();
        router.add(Method::GET, "/auth/info", "list-users");
        assert!(router.matches(&Method::POST, "/auth/info").is_none());
    }
}
