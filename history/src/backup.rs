//! Point-in-time history snapshots with age-based retention.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::error::HistoryError;
use crate::history::History;

const BACKUP_PREFIX: &str = "backup_";
const BACKUP_SUFFIX: &str = ".redb";

/// Result of one backup run.
#[derive(Debug, Clone)]
pub struct BackupReport {
    pub path: PathBuf,
    pub entries: usize,
    pub removed: Vec<PathBuf>,
}

/// Snapshot `history` into `dir/backup_YYYYmmdd_HHMMSS.redb`, then prune
/// snapshots in `dir` older than `retention`.
pub fn backup(
    history: &History,
    dir: &Path,
    retention: Duration,
    now: DateTime<Local>,
) -> Result<BackupReport, HistoryError> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join(backup_file_name(now));
    let entries = history.backend().snapshot_to(&path)?;
    info!(path = %path.display(), entries, "history: backup written");

    let cutoff = SystemTime::from(now)
        .checked_sub(retention)
        .unwrap_or(SystemTime::UNIX_EPOCH);
    let removed = prune_backups(dir, cutoff)?;

    Ok(BackupReport {
        path,
        entries,
        removed,
    })
}

/// Delete `backup_*.redb` files in `dir` last modified before `cutoff`.
/// Other files are left alone.
pub fn prune_backups(dir: &Path, cutoff: SystemTime) -> Result<Vec<PathBuf>, HistoryError> {
    let mut removed = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !(name.starts_with(BACKUP_PREFIX) && name.ends_with(BACKUP_SUFFIX)) {
            continue;
        }

        let modified = entry.metadata()?.modified()?;
        if modified >= cutoff {
            continue;
        }

        let path = entry.path();
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(file = name, "history: expired backup removed");
                removed.push(path);
            }
            Err(e) => warn!(file = name, error = %e, "history: failed to remove backup"),
        }
    }
    removed.sort();
    Ok(removed)
}

fn backup_file_name(now: DateTime<Local>) -> String {
    format!(
        "{BACKUP_PREFIX}{}{BACKUP_SUFFIX}",
        now.format("%Y%m%d_%H%M%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RedbBackend;
    use crate::types::Message;
    use chrono::TimeZone;

    const WEEK: Duration = Duration::from_secs(7 * 86400);

    #[test]
    fn test_file_name() {
        let t = Local.with_ymd_and_hms(2026, 3, 1, 2, 0, 5).unwrap();
        assert_eq!(backup_file_name(t), "backup_20260301_020005.redb");
    }

    #[test]
    fn test_backup_contains_history() {
        let dir = tempfile::tempdir().unwrap();
        let h = History::open(dir.path().join("live.redb")).unwrap();
        h.append("ou_a", Message::user("记住我")).unwrap();
        h.append("ou_b", Message::user("我也是")).unwrap();

        let report = backup(&h, &dir.path().join("backups"), WEEK, Local::now()).unwrap();
        assert_eq!(report.entries, 2);
        assert!(report.removed.is_empty());

        let restored = History::new(Box::new(RedbBackend::open(&report.path).unwrap()));
        assert_eq!(restored.recent("ou_a", 6).unwrap()[0].content, "记住我");
        assert_eq!(restored.count("ou_b").unwrap(), 1);
    }

    #[test]
    fn test_prune_only_old_backups() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("backup_20000101_000000.redb");
        let unrelated = dir.path().join("notes.txt");
        std::fs::write(&old, b"x").unwrap();
        std::fs::write(&unrelated, b"x").unwrap();

        // Everything on disk is older than a cutoff in the future.
        let cutoff = SystemTime::now() + Duration::from_secs(60);
        let removed = prune_backups(dir.path(), cutoff).unwrap();

        assert_eq!(removed, vec![old.clone()]);
        assert!(!old.exists());
        assert!(unrelated.exists());
    }

    #[test]
    fn test_recent_backups_kept() {
        let dir = tempfile::tempdir().unwrap();
        let h = History::memory();
        let first = backup(&h, dir.path(), WEEK, Local::now()).unwrap();
        let removed = prune_backups(dir.path(), SystemTime::now() - WEEK).unwrap();
        assert!(removed.is_empty());
        assert!(first.path.exists());
    }
}
