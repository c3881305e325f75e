//! `ferry` binary entrypoint.

#[tokio::main]
async fn main() {
    std::process::exit(ferry_cli::run().await);
}
