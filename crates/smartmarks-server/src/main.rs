use smartmarks_server::config::Config;
use smartmarks_server::{init_tracing, run_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(config.log_format);

    run_server(config).await
}
