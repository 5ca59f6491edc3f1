#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();
    let config = taskmanager_server::config::Config::from_env()?;
    taskmanager_server::web::start_web_server(config).await
}
