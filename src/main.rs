#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gestion_suite::cli::run_with_sys_args().await
}
