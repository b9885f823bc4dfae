use lorascope::{
    arguments,
    logger::{self, LogTag},
};

/// Main entry point for lorascope
///
/// Headless service: opens the message store written by the external
/// gateway logger, starts the realtime poller, and serves the dashboard
/// transport (WebSocket feed + statistics API) until Ctrl-C.
#[tokio::main]
async fn main() {
    logger::init();

    if arguments::is_help_requested() {
        arguments::print_help();
        return;
    }

    logger::info(LogTag::System, "lorascope starting up");

    if let Err(e) = lorascope::run::run().await {
        logger::error(LogTag::System, &format!("lorascope failed: {:#}", e));
        std::process::exit(1);
    }
}
