//! Path routing
//!
//! A router maps a request path to a fresh tracer for that request, or `None`
//! when the path is not an LLM endpoint it knows about. Routers are plain
//! functions so provider modules stay stateless.

use crate::standards::EndpointTracer;

/// Maps a request path to a tracer for one request.
pub type Router = fn(&str) -> Option<Box<dyn EndpointTracer>>;

/// Ask each router in order; the first match wins.
pub fn route(routers: &[Router], path: &str) -> Option<Box<dyn EndpointTracer>> {
    routers.iter().find_map(|router| router(path))
}

/// Routers for every provider compiled into this build.
pub fn default_routers() -> Vec<Router> {
    #[allow(unused_mut)]
    let mut routers: Vec<Router> = Vec::new();
    #[cfg(feature = "openai")]
    routers.push(crate::standards::openai::router);
    #[cfg(feature = "anthropic")]
    routers.push(crate::standards::anthropic::router);
    #[cfg(feature = "google")]
    routers.push(crate::standards::gemini::router);
    routers
}
