use anyhow::Context;
use tracing::{info, warn};

use session_gate::web::{router, AppState};
use session_gate::{
    init_tracing, AppConfig, CookieSessionStore, CredentialDirectory, InMemoryRepository,
    Principal,
};

fn seed_directory(config: &AppConfig) -> anyhow::Result<CredentialDirectory> {
    let directory = CredentialDirectory::new();
    let Some(admin) = &config.admin else {
        warn!("no admin account configured; nobody can log in");
        return Ok(directory);
    };

    let principal = Principal::new(admin.email.trim().to_lowercase()).with_roles(admin.roles.clone());
    let directory = directory
        .with_user(principal, &admin.email, admin.password.expose_secret())
        .context("registering admin account")?;
    info!(email = %admin.email, "admin account registered");
    Ok(directory)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    init_tracing();

    let mut config = AppConfig::load().context("loading configuration")?;
    let policy = config.take_cookie_policy().context("building cookie policy")?;
    info!(
        env = %config.app.env,
        cookie = %policy.name(),
        secure = policy.secure(),
        signing_keys = policy.keys().len(),
        "session-gate starting"
    );

    let state = AppState::new(
        CookieSessionStore::new(policy),
        seed_directory(&config)?,
        InMemoryRepository::new(),
    );

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}
