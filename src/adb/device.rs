use crate::adb::client::AdbRunner;
use crate::core::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const USABLE_STATE: &str = "device";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub serial: String,
    /// Raw state column as printed by adb (`device`, `offline`, `unauthorized`, ...).
    pub state: String,
}

impl Device {
    pub fn is_usable(&self) -> bool {
        self.state == USABLE_STATE
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceListing {
    pub devices: Vec<Device>,
    /// Non-blank lines that did not describe a usable device.
    pub skipped: usize,
}

/// Parses `adb devices` output, keeping only entries whose state is exactly `device`.
pub fn parse_devices(output: &str) -> DeviceListing {
    let mut listing = DeviceListing::default();
    let lines = output
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.starts_with('*'))
        .skip(1);

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let Some((serial, state)) = line.split_once(|c: char| c == '\t' || c == ' ') else {
            listing.skipped += 1;
            continue;
        };
        let device = Device {
            serial: serial.to_string(),
            state: state.trim().to_string(),
        };
        if device.serial.is_empty() || !device.is_usable() {
            listing.skipped += 1;
            continue;
        }
        listing.devices.push(device);
    }
    listing
}

pub struct DeviceManager {
    runner: Arc<dyn AdbRunner>,
}

impl DeviceManager {
    pub fn new(runner: Arc<dyn AdbRunner>) -> Self {
        Self { runner }
    }

    pub async fn list_devices(&self) -> Result<Vec<Device>> {
        Ok(self.list_devices_detailed().await?.devices)
    }

    pub async fn list_devices_detailed(&self) -> Result<DeviceListing> {
        let output = self.runner.run(&["devices"]).await?;
        let listing = parse_devices(&output);
        debug!(
            "found {} usable device(s), skipped {} line(s)",
            listing.devices.len(),
            listing.skipped
        );
        Ok(listing)
    }
}
