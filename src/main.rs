use anyhow::Result;
use chargebridge::logging::{get_logger, init_logging};
use chargebridge::store::StateStore;
use chargebridge::telemetry::ChannelDef;
use chargebridge::{BridgeHandle, Config};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

/// Writes every declaration and publish to stdout as one JSON object per line
struct StdoutStore;

impl StateStore for StdoutStore {
    fn define(&self, channel: &ChannelDef) {
        if let Ok(line) = serde_json::to_string(&json!({ "define": channel })) {
            println!("{}", line);
        }
    }

    fn publish(&self, key: &str, value: Value) {
        if let Ok(line) = serde_json::to_string(&json!({ "key": key, "value": value })) {
            println!("{}", line);
        }
    }
}

/// Read `key=value` commands from stdin until EOF
async fn read_commands(handle: BridgeHandle) {
    let logger = get_logger("stdin");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let Some((key, raw)) = line.split_once('=') else {
            if !line.trim().is_empty() {
                logger.warn(&format!("Expected key=value, got {:?}", line));
            }
            continue;
        };
        let raw = raw.trim();
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        if !handle.command(key.trim(), value) {
            break;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("chargebridge {} starting up", env!("APP_VERSION"));

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Invalid configuration: {}", e));
    }

    let (handle, mut bridge) = chargebridge::spawn(&config, StdoutStore);
    let stdin_task = tokio::spawn(read_commands(handle.clone()));

    let outcome = tokio::select! {
        joined = &mut bridge => joined,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            handle.shutdown().await;
            bridge.await
        }
    };
    stdin_task.abort();

    match outcome {
        Ok(Ok(())) => {
            info!("Bridge shutdown complete");
            Ok(())
        }
        Ok(Err(e)) => {
            error!("Bridge failed with error: {}", e);
            Err(anyhow::anyhow!("Bridge error: {}", e))
        }
        Err(e) => Err(anyhow::anyhow!("Bridge task panicked: {}", e)),
    }
}
