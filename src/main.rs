use anyhow::Context;
use apkpull::adb::{AdbClient, AdbRunner, DeviceManager};
use apkpull::core::logging::init_tracing;
use apkpull::core::Config;
use apkpull::ui::ConsoleUi;
use apkpull::web::{router, AppState};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");
    ConsoleUi::write_banner("apkpull");

    let config = Config::load().context("failed to load configuration")?;
    let client = AdbClient::from_config(&config);
    let startup = client.for_startup();

    match startup.ensure_present().await {
        Ok(version) => {
            ConsoleUi::info(&format!("{} ({})", version, client.adb_path().display()));
            if let Err(e) = startup.start_server().await {
                warn!("adb start-server failed: {}", e);
            }
        }
        Err(e) if e.is_not_found() => ConsoleUi::warn(
            "adb not found. Install Android platform-tools or set ADB_PATH; requests will fail until then.",
        ),
        Err(e) => ConsoleUi::warn(&format!("adb version check failed: {e}")),
    }

    if let Ok(devices) = DeviceManager::new(Arc::new(startup)).list_devices().await {
        ConsoleUi::render_device_table(&devices);
    }

    let runner: Arc<dyn AdbRunner> = Arc::new(client);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    ConsoleUi::success(&format!("Listening on http://{addr}"));
    info!("serving on {}", addr);

    axum::serve(listener, router(AppState::new(runner)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}
