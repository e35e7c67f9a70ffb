use lockbox::cli::runner;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_logging() {
    // stderr only; stdout carries command output.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .compact(),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    init_logging();
    if let Err(e) = runner::run().await {
        eprintln!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}
