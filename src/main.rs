//! Wicket - token gateway for the board service

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wicket::{
    config::Args,
    db::{redact_uri, MongoClient},
    server::{self, AppState, StorageBackend},
    store::{MongoPostStore, MongoUserStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("wicket={},info", args.log_level).into());
    tracing_subscriber::registry()
        .with(filter)
        .with(args.log_json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!args.log_json).then(|| tracing_subscriber::fmt::layer()))
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Wicket - board token gateway");
    info!("======================================");
    info!("Instance ID: {}", args.instance_id);
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {} (db: {})", redact_uri(&args.mongodb_uri), args.mongodb_db);
    info!(
        "Token lifetimes: access {}s, refresh {}s",
        args.access_token_ttl_secs, args.refresh_token_ttl_secs
    );
    info!("CORS origin: {}", args.cors_origin);
    info!(
        "Refresh cookie: SameSite={}, Secure={}",
        args.cookie_same_site,
        args.cookie_secure()
    );
    info!("Build: {} ({})", env!("GIT_COMMIT_SHORT"), env!("BUILD_TIMESTAMP"));
    info!("======================================");

    // Connect to MongoDB (in-memory fallback in dev mode)
    let state = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(mongo) => {
            let users = MongoUserStore::new(&mongo).await?;
            let posts = MongoPostStore::new(&mongo).await?;
            info!("MongoDB stores ready (db: {})", mongo.db_name());
            AppState::new(
                args.clone(),
                Arc::new(users),
                Arc::new(posts),
                StorageBackend::Mongo,
            )?
        }
        Err(e) => {
            if args.dev_mode {
                warn!("MongoDB connection failed (dev mode, using in-memory stores): {}", e);
                AppState::in_memory(args.clone())?
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    if let Err(e) = server::run(Arc::new(state)).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
