//! Admin assembly: resources, auth collaborators and mount settings are passed in
//! explicitly and turned into one `axum::Router`.

use crate::auth::{Authorizer, CookieSession, SessionPolicy};
use crate::config::settings::DEFAULT_BODY_LIMIT;
use crate::config::{resolve, AdminConfig, ResourceConfig};
use crate::error::ConfigError;
use crate::handlers::schema::describe;
use crate::resource::Resource;
use crate::routes::{auth_routes, RouterBinder};
use crate::state::{AuthState, ResourceDescription, SchemaDescription};
use crate::store::Collection;
use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub struct Admin {
    title: Option<String>,
    mount_prefix: String,
    login_redirect: String,
    logout_redirect: String,
    authorizer: Arc<dyn Authorizer>,
    session: Arc<dyn SessionPolicy>,
    body_limit: usize,
    resources: Vec<Resource>,
}

impl Admin {
    pub fn new(authorizer: Arc<dyn Authorizer>) -> Self {
        Admin {
            title: None,
            mount_prefix: "/admin".into(),
            login_redirect: "/".into(),
            logout_redirect: "/".into(),
            authorizer,
            session: Arc::new(CookieSession::default()),
            body_limit: DEFAULT_BODY_LIMIT,
            resources: Vec::new(),
        }
    }

    /// Admin described by a config document; `open` supplies each resource's collection.
    pub fn from_config<F>(config: &AdminConfig, authorizer: Arc<dyn Authorizer>, open: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&ResourceConfig) -> Arc<dyn Collection>,
    {
        let resources = resolve(config, open)?;
        let mut admin = Admin::new(authorizer)
            .mount_prefix(config.mount_prefix.clone())
            .redirects(config.login_redirect.clone(), config.logout_redirect.clone());
        admin.title = config.title.clone();
        Ok(resources.into_iter().fold(admin, Admin::resource))
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn mount_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.mount_prefix = prefix.into();
        self
    }

    pub fn redirects(mut self, login: impl Into<String>, logout: impl Into<String>) -> Self {
        self.login_redirect = login.into();
        self.logout_redirect = logout.into();
        self
    }

    pub fn session(mut self, session: Arc<dyn SessionPolicy>) -> Self {
        self.session = session;
        self
    }

    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    pub fn resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn describe(&self) -> SchemaDescription {
        SchemaDescription {
            title: self.title.clone(),
            resources: self
                .resources
                .iter()
                .map(|r| ResourceDescription {
                    name: r.name().to_string(),
                    primary_key: r.primary_key().to_string(),
                    fields: r.schema().describe(),
                })
                .collect(),
        }
    }

    /// Bind auth, schema and every resource below the mount prefix.
    pub fn into_router(self) -> Result<Router, ConfigError> {
        let description = Arc::new(self.describe());
        let mut binder = RouterBinder::new(&self.mount_prefix);
        let token_path = binder.reserve(&Method::POST, "/token")?;
        let logout_path = binder.reserve(&Method::DELETE, "/logout")?;
        let schema_path = binder.reserve(&Method::GET, "/schema")?;

        let auth = AuthState {
            authorizer: self.authorizer,
            session: self.session,
            login_redirect: Arc::from(self.login_redirect.as_str()),
            logout_redirect: Arc::from(self.logout_redirect.as_str()),
        };
        let mut binder = binder
            .merge(auth_routes(&token_path, &logout_path, auth))
            .merge(Router::new().route(&schema_path, get(describe)).with_state(description));

        let count = self.resources.len();
        for resource in self.resources {
            binder = binder.bind(resource)?;
        }
        tracing::info!(prefix = %binder.prefix(), resources = count, "admin mounted");

        Ok(binder.into_router().layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(self.body_limit)),
        ))
    }
}
