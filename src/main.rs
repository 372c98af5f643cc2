#[tokio::main]
async fn main() {
    if let Err(e) = worldkeeper_lib::run().await {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}
