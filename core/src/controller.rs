use axum::Router;

/// A set of routes registered onto the server as one unit.
pub struct RouteGroup {
    pub name: &'static str,
    pub prefix: &'static str,
    pub router: Router,
}

impl RouteGroup {
    pub fn new(name: &'static str, prefix: &'static str, router: Router) -> Self {
        RouteGroup { name, prefix, router }
    }

    /// Groups mounted at the root are merged rather than nested.
    pub fn is_root(&self) -> bool {
        self.prefix.is_empty() || self.prefix == "/"
    }
}

/// Implemented by `#[goodtables_macros::controller]`.
pub trait Controller {
    const NAME: &'static str;
    const PREFIX: &'static str;

    fn router() -> Router;

    fn group() -> RouteGroup {
        RouteGroup::new(Self::NAME, Self::PREFIX, Self::router())
    }
}
