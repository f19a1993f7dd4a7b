//! Segment-based host extraction and request rewriting.
//!
//! # Responsibilities
//! - Reinterpret one path segment as the destination authority
//! - Rebuild the path from the segments after it
//! - Keep scheme, authority, path, query and Host header self-consistent
//!
//! # Design Decisions
//! - Segments are the `/`-split of the path after the leading slash, so for
//!   `/spnegohttp/foo.com:12345/a/b/c` segment 1 is `foo.com:12345`
//! - An index at or past the end of the path is a routing error
//! - The query string survives the rewrite unchanged

use axum::http::header::HOST;
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{HeaderValue, Request, Uri};
use thiserror::Error;

/// Errors produced while rewriting a request target.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("segment index {index} out of bounds for path with {available} segments")]
    SegmentOutOfBounds { index: usize, available: usize },

    #[error("segment {index} ({segment:?}) is not a valid authority: {reason}")]
    InvalidAuthority {
        index: usize,
        segment: String,
        reason: String,
    },

    #[error("invalid scheme override {scheme:?}: {reason}")]
    InvalidScheme { scheme: String, reason: String },

    #[error("rewritten request target is invalid: {0}")]
    InvalidTarget(String),
}

/// Rewrites a request's target host and path from an embedded path segment.
pub struct SegmentRouter {
    target_host_segment: usize,
    scheme: Scheme,
}

impl SegmentRouter {
    /// Create a router for the given segment index and optional scheme
    /// override. An empty override falls back to plain http.
    pub fn new(target_host_segment: usize, scheme_override: Option<&str>) -> Result<Self, RoutingError> {
        let scheme = match scheme_override {
            Some(s) if !s.is_empty() => s.parse::<Scheme>().map_err(|e| RoutingError::InvalidScheme {
                scheme: s.to_string(),
                reason: e.to_string(),
            })?,
            _ => Scheme::HTTP,
        };
        Ok(Self {
            target_host_segment,
            scheme,
        })
    }

    /// Whether this router rewrites targets at all (segment index > 0).
    pub fn is_enabled(&self) -> bool {
        self.target_host_segment > 0
    }

    /// Rewrite the request in place. On error the request is untouched.
    pub fn rewrite<B>(&self, req: &mut Request<B>) -> Result<(), RoutingError> {
        if self.target_host_segment == 0 {
            return Ok(());
        }

        let uri = req.uri();
        let segments: Vec<&str> = uri.path().trim_start_matches('/').split('/').collect();
        let index = self.target_host_segment;

        if index >= segments.len() {
            return Err(RoutingError::SegmentOutOfBounds {
                index,
                available: segments.len(),
            });
        }

        let host = segments[index];
        let authority: Authority = host.parse().map_err(|e: axum::http::uri::InvalidUri| {
            RoutingError::InvalidAuthority {
                index,
                segment: host.to_string(),
                reason: e.to_string(),
            }
        })?;

        let mut target = format!("/{}", segments[index + 1..].join("/"));
        if let Some(query) = uri.query() {
            target.push('?');
            target.push_str(query);
        }
        let path_and_query: PathAndQuery = target
            .parse()
            .map_err(|e: axum::http::uri::InvalidUri| RoutingError::InvalidTarget(e.to_string()))?;

        let host_header = HeaderValue::from_str(authority.as_str())
            .map_err(|e| RoutingError::InvalidTarget(e.to_string()))?;

        let mut parts = uri.clone().into_parts();
        parts.scheme = Some(self.scheme.clone());
        parts.authority = Some(authority);
        parts.path_and_query = Some(path_and_query);
        let rewritten =
            Uri::from_parts(parts).map_err(|e| RoutingError::InvalidTarget(e.to_string()))?;

        *req.uri_mut() = rewritten;
        req.headers_mut().insert(HOST, host_header);
        Ok(())
    }
}
