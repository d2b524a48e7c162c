mod broker;
mod config;
mod display;
mod error;
mod login_service;
mod registry;

use tokio::process::Command;

use broker::Broker;
use config::Config;
use display::DisplayContext;
use error::BrokerError;
use login_service::LoggingLoginServiceClient;

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match Config::load(&args) {
        Ok(c) => c,
        Err(e) => {
            log::error!("configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        log::error!("session broker exiting: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), BrokerError> {
    log::info!("spawning authenticator helper at {}", config.helper_path.display());

    let mut child = Command::new(&config.helper_path)
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::inherit())
        .spawn()
        .map_err(|e| BrokerError::SpawnFailed(e.to_string()))?;

    let stdin = child.stdin.take().ok_or_else(|| {
        BrokerError::SpawnFailed("helper did not provide a stdin pipe".to_string())
    })?;
    let stdout = child.stdout.take().ok_or_else(|| {
        BrokerError::SpawnFailed("helper did not provide a stdout pipe".to_string())
    })?;

    let display = DisplayContext::new(":0");
    let login_service = LoggingLoginServiceClient::default();
    let mut broker = Broker::new(stdout, stdin, display, login_service, config);

    // The caller that submits `Start`/`End` (a greeter, over whatever
    // transport it uses) is out of scope here; this loop is the broker's
    // half of the contract — servicing whatever the helper asks for and
    // routing `LoginSucceeded`/`LoginFailed` back through `Broker::start`'s
    // reply channel once something upstream calls it.
    loop {
        match broker.dispatch_one().await {
            Ok(true) => continue,
            Ok(false) => {
                log::info!("helper channel closed, exiting");
                break;
            }
            Err(e) => {
                log::warn!("dispatch error: {}", e);
            }
        }
    }

    let _ = child.wait().await;
    Ok(())
}
