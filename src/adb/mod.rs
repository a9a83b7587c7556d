pub mod client;
pub mod device;
pub mod package;
pub mod retrieve;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{AdbClient, AdbRunner};
pub use device::{Device, DeviceListing, DeviceManager};
pub use package::{ApplicationRecord, PackageListing, PackageManager};
pub use retrieve::{PackageRetriever, RetrievedPackageFile, StagedDownload};
