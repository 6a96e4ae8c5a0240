#![warn(clippy::uninlined_format_args)]

mod bootstrap;
mod presenter;
mod scenario;

#[tokio::main]
async fn main() {
    bootstrap::run().await;
}
