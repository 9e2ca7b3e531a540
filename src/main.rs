mod scenario;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let root = args.next().unwrap_or_else(|| "HKCU".to_string());
    let subkey = args
        .next()
        .unwrap_or_else(|| scenario::DEFAULT_SUBKEY.to_string());

    scenario::run(&root, &subkey).await
}
