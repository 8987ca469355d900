//! Typed route templates
//!
//! A template such as `/files/application/:applicationId/download/:fileId`
//! is parsed once into literal and named-parameter segments. Matching a
//! concrete path requires the same number of segments and equal literals;
//! parameters capture the corresponding path segment by name.
//!
//! When several templates match, the one with the most literal segments
//! wins, so `/jobs/query` resolves to `/jobs/query` rather than `/jobs/:id`.
//! Ties go to the template registered first.

use axum::http::Method;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Literal(&'static str),
    Param(&'static str),
}

/// A parsed path template with `:name` parameter segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    raw: &'static str,
    segments: Vec<Segment>,
}

impl RouteTemplate {
    pub fn parse(raw: &'static str) -> Self {
        let segments = raw
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix(':') {
                Some(name) => Segment::Param(name),
                None => Segment::Literal(s),
            })
            .collect();

        Self { raw, segments }
    }

    pub fn as_str(&self) -> &'static str {
        self.raw
    }

    fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    /// Match already-split path segments, capturing parameters.
    pub fn capture(&self, path: &[&str]) -> Option<PathParams> {
        if path.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::default();
        for (segment, value) in self.segments.iter().zip(path) {
            match segment {
                Segment::Literal(lit) if lit == value => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => params.0.push((name, (*value).to_string())),
            }
        }
        Some(params)
    }
}

/// Named parameters captured from a path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(&'static str, String)>);

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Split a request path into non-empty segments, ignoring any query string
/// and trailing slash.
pub fn split_path(path: &str) -> Vec<&str> {
    let path = path.split_once('?').map_or(path, |(p, _)| p);
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Result of resolving a request against registered templates.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatch<K> {
    pub key: K,
    pub template: &'static str,
    pub params: PathParams,
}

/// Resolves `(method, path)` to the most specific registered template.
#[derive(Debug, Clone)]
pub struct RouteMatcher<K> {
    routes: Vec<(Method, RouteTemplate, K)>,
}

impl<K> Default for RouteMatcher<K> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<K: Copy> RouteMatcher<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, method: Method, template: &'static str, key: K) {
        self.routes.push((method, RouteTemplate::parse(template), key));
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn resolve(&self, method: &Method, path: &str) -> Option<RouteMatch<K>> {
        let segments = split_path(path);

        let mut best: Option<(usize, RouteMatch<K>)> = None;
        for (route_method, template, key) in &self.routes {
            if route_method != method {
                continue;
            }
            let Some(params) = template.capture(&segments) else {
                continue;
            };

            let score = template.literal_count();
            if best.as_ref().is_some_and(|(best_score, _)| *best_score >= score) {
                continue;
            }
            best = Some((
                score,
                RouteMatch {
                    key: *key,
                    template: template.as_str(),
                    params,
                },
            ));
        }

        best.map(|(_, matched)| matched)
    }
}
