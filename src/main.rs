use std::sync::Arc;

use anyhow::Context;
use fithero_onboarding::config::OnboardingConfig;
use fithero_onboarding::onboarding::{
    OnboardingManager, OnboardingRouteState, builtin_navigator, onboarding_routes,
};
use fithero_onboarding::store::{Database, LibSqlBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = OnboardingConfig::from_env()?;
    let mode = std::env::args().nth(1).unwrap_or_else(|| "serve".to_string());

    eprintln!("FitHero onboarding v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   User: {}", config.user_id);

    // ── Database ─────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .with_context(|| format!("failed to open database at {}", config.db_path.display()))?,
    );

    // ── Onboarding ───────────────────────────────────────────────────────
    let navigator = builtin_navigator()?;
    let manager = Arc::new(
        OnboardingManager::start_or_resume(db, navigator, &config, &serde_json::Map::new()).await,
    );

    match mode.as_str() {
        "serve" => {
            let app = onboarding_routes(OnboardingRouteState { manager });
            let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.http_port))
                .await
                .with_context(|| format!("failed to bind port {}", config.http_port))?;
            eprintln!("   API: http://0.0.0.0:{}/api/onboarding/session\n", config.http_port);
            tracing::info!(port = config.http_port, "Onboarding server started");
            axum::serve(listener, app).await?;
        }
        "cli" => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            fithero_onboarding::cli::run(&manager, stdin, std::io::stdout()).await?;
        }
        other => anyhow::bail!("unknown mode {other:?}, expected \"serve\" or \"cli\""),
    }

    Ok(())
}
