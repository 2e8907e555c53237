//! Router binder: mounts each resource's action table under the admin prefix.
//! Action paths are written `/{id}` and become `:id` captures; routes sharing a path share
//! one method router, so a method may appear only once per path.

use crate::error::ConfigError;
use crate::handlers::resource::{create, delete, detail, list, update};
use crate::resource::{Action, Resource};
use crate::state::ResourceState;
use axum::http::Method;
use axum::routing::{MethodFilter, MethodRouter};
use axum::Router;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// `"/admin/"`, `"admin"` and `"/admin"` all mount at `/admin`; empty or `/` mounts at the root.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// Full router path for a sub-path below `base`. Only the `{id}` capture is understood.
fn router_path(base: &str, sub: &str) -> Result<String, ConfigError> {
    let invalid = || ConfigError::Validation(format!("unsupported route path: {}", sub));
    if sub.contains(':') || sub.contains('*') {
        return Err(invalid());
    }
    let converted = sub.replace("{id}", ":id");
    if converted.contains('{') || converted.contains('}') {
        return Err(invalid());
    }
    let path = format!("{}{}", base, converted);
    Ok(if path.is_empty() { "/".to_string() } else { path })
}

/// Accumulates the admin router. Consumed by value, so nothing can be re-bound once
/// the router is taken.
pub struct RouterBinder {
    prefix: String,
    paths: HashSet<String>,
    resources: HashSet<String>,
    router: Router,
}

impl RouterBinder {
    pub fn new(prefix: &str) -> Self {
        RouterBinder {
            prefix: normalize_prefix(prefix),
            paths: HashSet::new(),
            resources: HashSet::new(),
            router: Router::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Claim `sub` below the prefix for a route bound outside the resource table.
    pub fn reserve(&mut self, method: &Method, sub: &str) -> Result<String, ConfigError> {
        let path = router_path(&self.prefix, sub)?;
        if !self.paths.insert(path.clone()) {
            return Err(ConfigError::DuplicateRoute {
                method: method.to_string(),
                path,
            });
        }
        Ok(path)
    }

    pub fn merge(mut self, router: Router) -> Self {
        self.router = self.router.merge(router);
        self
    }

    /// Bind every remaining action of `resource` at `<prefix>/<name><sub-path>`.
    pub fn bind(mut self, resource: Resource) -> Result<Self, ConfigError> {
        let name = resource.name().to_string();
        if !self.resources.insert(name.clone()) {
            return Err(ConfigError::DuplicateResource(name));
        }
        let base = format!("{}/{}", self.prefix, name);

        let mut by_path: BTreeMap<String, Vec<(Method, Action)>> = BTreeMap::new();
        for (action, route) in resource.actions() {
            let path = router_path(&base, &route.path)?;
            let methods = by_path.entry(path.clone()).or_default();
            if methods.iter().any(|(m, _)| *m == route.method) || self.paths.contains(&path) {
                return Err(ConfigError::DuplicateRoute {
                    method: route.method.to_string(),
                    path,
                });
            }
            methods.push((route.method.clone(), *action));
        }

        let state = ResourceState {
            name: Arc::from(name.as_str()),
            engine: Arc::new(resource),
        };
        let mut router: Router<ResourceState> = Router::new();
        for (path, methods) in by_path {
            let mut method_router: MethodRouter<ResourceState> = MethodRouter::new();
            for (method, action) in methods {
                let filter = MethodFilter::try_from(method.clone()).map_err(|_| {
                    ConfigError::Validation(format!("unsupported method {} for {}", method, path))
                })?;
                tracing::info!(resource = %name, action = %action, method = %method, path = %path, "bind");
                method_router = match action {
                    Action::List => method_router.on(filter, list),
                    Action::Detail => method_router.on(filter, detail),
                    Action::Create => method_router.on(filter, create),
                    Action::Update => method_router.on(filter, update),
                    Action::Delete => method_router.on(filter, delete),
                };
            }
            router = router.route(&path, method_router);
            self.paths.insert(path);
        }
        self.router = self.router.merge(router.with_state(state));
        Ok(self)
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}
