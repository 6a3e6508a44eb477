//! Recognize a CAPTCHA image from the command line.
//!
//! Run with:
//!   ANTIGATE_API_KEY=... cargo run --example recognize -- captcha.png [config.json]
//!
//! Ctrl-C cancels a pending recognition.

use antigate::{CancellationToken, SolverClient, SolverClientBuilder, SolverConfig};

#[tokio::main]
async fn main() -> antigate::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "antigate=debug,info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(image) = args.next() else {
        eprintln!("usage: recognize <image> [config.json]");
        std::process::exit(2);
    };

    // A config file wins; otherwise defaults plus ANTIGATE_API_KEY.
    let client: SolverClient = match args.next() {
        Some(config_path) => SolverClient::new(SolverConfig::from_json_file(config_path)?)?,
        None => SolverClientBuilder::new().build()?,
    };

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    match client.recognize_with_cancel(&image, &cancel).await {
        Ok(text) => println!("{text}"),
        Err(e) => {
            tracing::error!("recognition failed: {e}");
            std::process::exit(1);
        }
    }

    Ok(())
}
