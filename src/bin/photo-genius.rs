//! Photo Genius CLI tool
//!
//! Runs the background-removal gateway or drives the upload → remove →
//! download workflow against a running gateway.

use photo_genius::cli;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}
