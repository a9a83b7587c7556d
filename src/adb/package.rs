use crate::adb::client::{device_args, AdbRunner};
use crate::core::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const PACKAGE_PREFIX: &str = "package:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub package_id: String,
    pub install_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageListing {
    /// Sorted ascending by `package_id`.
    pub records: Vec<ApplicationRecord>,
    pub skipped: usize,
}

/// Parses `pm list packages -f` output (`package:<path>=<id>` per line).
///
/// Install paths may contain `=` themselves (`/data/app/~~abc==/base.apk`),
/// package ids never do, so each line is split on its last `=`.
pub fn parse_packages(output: &str) -> PackageListing {
    let mut listing = PackageListing::default();
    for line in output.lines().map(|l| l.trim_end_matches('\r')) {
        if line.trim().is_empty() {
            continue;
        }
        let record = line
            .strip_prefix(PACKAGE_PREFIX)
            .and_then(|rest| rest.rsplit_once('='))
            .filter(|(path, id)| !path.is_empty() && !id.is_empty())
            .map(|(path, id)| ApplicationRecord {
                package_id: id.to_string(),
                install_path: path.to_string(),
            });
        match record {
            Some(r) => listing.records.push(r),
            None => listing.skipped += 1,
        }
    }
    listing
        .records
        .sort_by(|a, b| a.package_id.cmp(&b.package_id));
    listing
}

pub struct PackageManager {
    runner: Arc<dyn AdbRunner>,
}

impl PackageManager {
    pub fn new(runner: Arc<dyn AdbRunner>) -> Self {
        Self { runner }
    }

    pub async fn list_third_party_packages(&self) -> Result<Vec<ApplicationRecord>> {
        Ok(self.list_third_party_detailed().await?.records)
    }

    pub async fn list_third_party_detailed(&self) -> Result<PackageListing> {
        let args = device_args(
            self.runner.as_ref(),
            &["shell", "pm", "list", "packages", "-f", "-3"],
        );
        let output = self.runner.run(&args).await?;
        let listing = parse_packages(&output);
        debug!(
            "listed {} package(s), skipped {} line(s)",
            listing.records.len(),
            listing.skipped
        );
        Ok(listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adb::testing::FakeRunner;
    use crate::core::ToolError;

    #[test]
    fn splits_on_last_equals() {
        let listing = parse_packages("package:/data/app/~~abc==/base.apk=com.example.app\n");
        assert_eq!(
            listing.records,
            vec![ApplicationRecord {
                package_id: "com.example.app".to_string(),
                install_path: "/data/app/~~abc==/base.apk".to_string(),
            }]
        );
        assert_eq!(listing.skipped, 0);
    }

    #[test]
    fn sorted_by_package_id() {
        let out = "package:/data/app/b/base.apk=b.app\npackage:/data/app/a/base.apk=a.app";
        let ids: Vec<_> = parse_packages(out)
            .records
            .into_iter()
            .map(|r| r.package_id)
            .collect();
        assert_eq!(ids, vec!["a.app", "b.app"]);
    }

    #[test]
    fn sort_is_bytewise() {
        let out = "package:/p1=com.zeta\npackage:/p2=Com.Alpha\npackage:/p3=com.alpha";
        let ids: Vec<_> = parse_packages(out)
            .records
            .into_iter()
            .map(|r| r.package_id)
            .collect();
        assert_eq!(ids, vec!["Com.Alpha", "com.alpha", "com.zeta"]);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let out = "package:/data/app/x/base.apk=com.ok\n\
                   com.no.prefix\n\
                   package:/data/app/no-separator.apk\n\
                   package:=com.empty.path\n\
                   package:/data/app/empty-id.apk=\n\
                   Package:/wrong/case=com.case\n";
        let listing = parse_packages(out);
        assert_eq!(listing.records.len(), 1);
        assert_eq!(listing.records[0].package_id, "com.ok");
        assert_eq!(listing.skipped, 5);
    }

    #[test]
    fn carriage_returns_are_stripped() {
        let listing = parse_packages("package:/data/app/x/base.apk=com.win\r\n");
        assert_eq!(listing.records[0].package_id, "com.win");
    }

    #[tokio::test]
    async fn repeated_listing_is_identical() {
        let out = "package:/b=b.app\npackage:/a=a.app\npackage:/c=c.app";
        let mgr = PackageManager::new(Arc::new(FakeRunner::ok(out)));
        let first = mgr.list_third_party_packages().await.unwrap();
        let second = mgr.list_third_party_packages().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn queries_third_party_packages_on_target() {
        let fake = Arc::new(FakeRunner::ok("").targeting("ABC123"));
        let mgr = PackageManager::new(fake.clone());
        assert!(mgr.list_third_party_packages().await.unwrap().is_empty());
        let expected: Vec<String> = ["-s", "ABC123", "shell", "pm", "list", "packages", "-f", "-3"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(fake.calls(), vec![expected]);
    }

    #[tokio::test]
    async fn tool_failure_is_surfaced() {
        let fake = FakeRunner::with(|_| {
            Err(ToolError::ExecutionFailed {
                code: Some(1),
                stderr: "error: no devices/emulators found".to_string(),
            })
        });
        let mgr = PackageManager::new(Arc::new(fake));
        let err = mgr.list_third_party_packages().await.unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
    }
}
