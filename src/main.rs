#[tokio::main]
async fn main() -> anyhow::Result<()> {
    quiz_solver::telemetry::init();
    let cfg = quiz_solver::config::Config::load()?;
    tracing::debug!(?cfg, "loaded config");

    let (app, port) = quiz_solver::build_app(cfg)?;

    use tracing::info;
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
