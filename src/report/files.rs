use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info};

const REPORT_EXTENSION: &str = "xlsx";

fn is_report(path: &Path, needle: &str) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };

    let is_xlsx = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(REPORT_EXTENSION));

    is_xlsx && name.contains(needle)
}

/// Report files in `dir` with their modification time. Partial downloads
/// keep a `.crdownload` extension and are skipped by the extension check.
fn reports_in(dir: &Path, needle: &str) -> Result<Vec<(PathBuf, SystemTime)>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Unable to read directory: {}", dir.display()))?;

    let mut reports = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || !is_report(&path, needle) {
            continue;
        }

        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .with_context(|| format!("Unable to stat {}", path.display()))?;
        reports.push((path, modified));
    }

    Ok(reports)
}

/// Newest `.xlsx` file in `dir` whose name contains `needle`.
pub fn find_latest_report(dir: &Path, needle: &str) -> Result<PathBuf> {
    info!(dir = %dir.display(), needle, "looking for the newest report");

    let latest = reports_in(dir, needle)?
        .into_iter()
        .max_by_key(|(_, modified)| *modified)
        .map(|(path, _)| path);

    match latest {
        Some(path) => {
            info!(file = %path.display(), "newest report found");
            Ok(path)
        }
        None => bail!(
            "No .{} file with '{}' in its name was found in {}",
            REPORT_EXTENSION,
            needle,
            dir.display()
        ),
    }
}

/// Waits for a report modified at or after `since` to show up in `dir`.
pub async fn wait_for_report(
    dir: &Path,
    needle: &str,
    since: SystemTime,
    timeout: Duration,
    poll: Duration,
) -> Result<PathBuf> {
    let started = Instant::now();

    loop {
        let fresh = reports_in(dir, needle)?
            .into_iter()
            .filter(|(_, modified)| *modified >= since)
            .max_by_key(|(_, modified)| *modified);

        if let Some((path, _)) = fresh {
            info!(file = %path.display(), "download finished");
            return Ok(path);
        }

        if started.elapsed() >= timeout {
            bail!(
                "No new report appeared in {} within {:?}",
                dir.display(),
                timeout
            );
        }

        debug!(dir = %dir.display(), "report not there yet");
        tokio::time::sleep(poll).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn only_xlsx_files_with_the_needle_count() {
        assert!(is_report(Path::new("/tmp/Report (3).xlsx"), "Report"));
        assert!(is_report(Path::new("/tmp/RankingReport.XLSX"), "Report"));
        assert!(!is_report(Path::new("/tmp/Report.xlsx.crdownload"), "Report"));
        assert!(!is_report(Path::new("/tmp/report.xlsx"), "Report"));
        assert!(!is_report(Path::new("/tmp/Report.csv"), "Report"));
    }

    #[test]
    fn picks_the_most_recently_modified_report() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("Report old.xlsx");
        let new = dir.path().join("Report new.xlsx");
        fs::write(&old, b"old").unwrap();
        fs::write(&new, b"new").unwrap();
        fs::write(dir.path().join("notes.xlsx"), b"other").unwrap();

        let past = SystemTime::now() - Duration::from_secs(3600);
        fs::File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(past)
            .unwrap();

        assert_eq!(find_latest_report(dir.path(), "Report").unwrap(), new);
    }

    #[test]
    fn missing_report_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_latest_report(dir.path(), "Report").unwrap_err();
        assert!(err.to_string().contains("Report"));
    }

    #[tokio::test]
    async fn wait_gives_up_after_the_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let result = wait_for_report(
            dir.path(),
            "Report",
            SystemTime::now(),
            Duration::from_millis(30),
            Duration::from_millis(10),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn wait_returns_a_fresh_download() {
        let dir = tempfile::tempdir().unwrap();
        let since = SystemTime::now() - Duration::from_secs(1);
        let path = dir.path().join("Report.xlsx");
        fs::write(&path, b"data").unwrap();

        let found = wait_for_report(
            dir.path(),
            "Report",
            since,
            Duration::from_secs(1),
            Duration::from_millis(10),
        )
        .await
        .unwrap();
        assert_eq!(found, path);
    }
}
