//! Demo server: the blog admin (users, messages, followers). Collections live in PostgreSQL
//! when DATABASE_URL is set and in memory otherwise.

use rest_admin::{
    common_routes, ensure_database_exists, load_config, Admin, Collection, CookieSession, MemoryCollection,
    PgCollection, Settings, StaticAuthorizer,
};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("rest_admin=info".parse()?))
        .init();

    let settings = Settings::from_env()?;
    let config_path = settings
        .config_path
        .clone()
        .unwrap_or_else(|| "demos/blog.json".into());
    let config = load_config(&config_path).await?;

    let (username, password) = match (settings.username.clone(), settings.password.clone()) {
        (Some(u), Some(p)) => (u, p),
        _ => {
            tracing::warn!("ADMIN_USERNAME/ADMIN_PASSWORD not set, using admin/admin");
            ("admin".to_string(), "admin".to_string())
        }
    };
    let authorizer = Arc::new(StaticAuthorizer::new(username, password));

    let admin = match &settings.database_url {
        Some(url) => {
            ensure_database_exists(url).await?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await?;
            for rc in &config.resources {
                PgCollection::new(pool.clone(), &settings.pg_schema, rc.collection_name(), &rc.primary_key)
                    .ensure_table()
                    .await?;
            }
            tracing::info!(schema = %settings.pg_schema, "using postgres collections");
            Admin::from_config(&config, authorizer, |rc| {
                Arc::new(PgCollection::new(
                    pool.clone(),
                    &settings.pg_schema,
                    rc.collection_name(),
                    &rc.primary_key,
                )) as Arc<dyn Collection>
            })?
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory collections");
            Admin::from_config(&config, authorizer, |rc| {
                Arc::new(MemoryCollection::new(rc.collection_name()).with_primary_key(rc.primary_key.clone()))
                    as Arc<dyn Collection>
            })?
        }
    };

    let session = CookieSession::default().with_path(config.mount_prefix.clone());
    let admin = admin
        .session(Arc::new(session))
        .body_limit(settings.body_limit);

    let app = Router::new()
        .merge(common_routes())
        .merge(admin.into_router()?);

    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
