use anyhow::Context;

use forgecart_infra::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    forgecart_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let app = forgecart_api::app::build_app(&config)
        .await
        .context("failed to initialize services")?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        persistent = config.use_persistent_stores,
        tenant_header = config.allow_tenant_header,
        "listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
