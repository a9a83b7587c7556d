use anyhow::Context;
use apkpull::core::logging::init_tracing;
use apkpull::core::Config;
use apkpull::probe::StoreProbe;
use apkpull::ui::ConsoleUi;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing("warn");
    ConsoleUi::write_banner("store_probe");
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ConsoleUi::error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    let store = config.store;

    ConsoleUi::info(&format!(
        "Testing with email: {}, GSF id: {}",
        store.email.as_deref().unwrap_or("<unset>"),
        store.gsf_id.as_deref().unwrap_or("<unset>")
    ));
    if let Some(addr) = &store.resolve_addr {
        ConsoleUi::info(&format!("Resolving {} to {}", store.host, addr));
    }

    let probe = StoreProbe::new(store.clone()).context("failed to build HTTP client")?;
    ConsoleUi::info(&format!("Requesting details for {}...", store.package_id));
    let report = probe
        .run()
        .await
        .with_context(|| format!("request to {} failed", probe.details_url()))?;

    ConsoleUi::success(&format!(
        "{} answered HTTP {} in {} ms",
        store.host, report.status, report.elapsed_ms
    ));
    match report.first_chunk_len {
        Some(len) => ConsoleUi::success(&format!("First chunk received, size: {len} bytes")),
        None => ConsoleUi::warn("Response body was empty"),
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
