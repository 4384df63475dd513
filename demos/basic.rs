//! Basic example showing how to use dsn-tracing.
//!
//! Run with: cargo run --example basic

use dsn_tracing::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,dsn_tracing=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/test".into());

    let info = parse("postgres", &database_url)?;
    tracing::info!(database = %info.database, "parsed postgres DSN");

    // Attach the derived attributes to a connection span.
    let span = connection_span(&info.database, &info.attributes);
    let _guard = span.enter();
    tracing::info!("connection would be opened inside this span");
    drop(_guard);

    // The MySQL dialect works the same way, and never leaks the password
    // into the derived attributes.
    let info = parse("mysql", "app:s3cret@tcp(127.0.0.1:3306)/shop")?;
    for attr in &info.attributes {
        tracing::info!(key = attr.key, value = %attr.value, "mysql attribute");
    }

    // Unknown drivers degrade to a generic marker instead of failing.
    let info = parse("sqlite", "file:test.db")?;
    tracing::info!(attributes = info.attributes.len(), "unknown driver fallback");

    Ok(())
}
