use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{Level, info, warn};

use server::config::AppConfig;
use server::database::init_db;
use server::marksheet::remarks::{ChatCompletionRemarks, FallbackRemarks, RemarkGenerator};
use server::seed;
use server::state::AppState;

fn remark_generator(config: &AppConfig) -> Arc<dyn RemarkGenerator> {
    if !config.remarks.enabled {
        info!("Remark generation disabled, using grade-based remarks");
        return Arc::new(FallbackRemarks);
    }
    match ChatCompletionRemarks::new(config.remarks.clone()) {
        Ok(client) => {
            info!(model = %config.remarks.model, "Remark generation enabled");
            Arc::new(client)
        }
        Err(e) => {
            warn!("Remark client unavailable, using grade-based remarks: {}", e);
            Arc::new(FallbackRemarks)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load()?;

    let db = init_db(&config.database).await?;
    seed::seed_role_permissions(&db).await?;
    seed::ensure_indexes(&db).await?;
    seed::ensure_super_admin(&db, &config.bootstrap).await?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = AppState {
        db,
        remarks: remark_generator(&config),
        config,
    };
    let app = server::build_router(state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
