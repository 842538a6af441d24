#[tokio::main]
async fn main() {
    if let Err(err) = pingfederate_mcp::mcp::server::run_stdio().await {
        eprintln!("pingfederate-mcp: {}", err);
        std::process::exit(1);
    }
}
