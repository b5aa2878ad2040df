//! Maintenance subcommands.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Local;
use cuncun_embed::Embedder;
use cuncun_history::backup;
use cuncun_vecstore::{MemoryIndex, VecIndex, save_library};
use serde::Deserialize;
use tracing::info;

use crate::app;
use crate::config::Config;

/// Run the matcher once and print what it decided.
pub async fn run_match(cfg: &Config, text: &str) -> Result<()> {
    let matcher = app::voice_matcher(cfg)?;
    if matcher.library_size().is_none() {
        bail!(
            "no voice library at {}; run `cuncun ingest` first",
            cfg.voice_index_path.display()
        );
    }

    match matcher.find(text).await {
        Some(m) => println!(
            "match: {} (fragment {:?}, distance {:.4})",
            m.path.display(),
            m.fragment,
            m.distance
        ),
        None => println!("no match"),
    }
    Ok(())
}

/// One line of an ingest manifest.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ManifestEntry {
    pub filename: String,
    pub text: String,
}

/// Parse a JSONL manifest. Blank lines and `#` comments are skipped.
pub fn parse_manifest(data: &str) -> Result<Vec<ManifestEntry>> {
    let mut entries = Vec::new();
    for (n, line) in data.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let entry: ManifestEntry =
            serde_json::from_str(line).with_context(|| format!("manifest line {}", n + 1))?;
        if entry.filename.is_empty() || entry.text.trim().is_empty() {
            bail!("manifest line {}: filename and text are required", n + 1);
        }
        entries.push(entry);
    }
    Ok(entries)
}

/// Embed every entry's text and index it under the clip filename.
pub async fn build_library(
    embedder: &dyn Embedder,
    entries: &[ManifestEntry],
) -> Result<MemoryIndex> {
    let index = MemoryIndex::new();
    if entries.is_empty() {
        return Ok(index);
    }
    let texts: Vec<&str> = entries.iter().map(|e| e.text.as_str()).collect();
    let vectors = embedder.embed_batch(&texts).await?;
    for (entry, vector) in entries.iter().zip(&vectors) {
        index
            .insert(&entry.filename, vector)
            .with_context(|| format!("index {}", entry.filename))?;
    }
    Ok(index)
}

/// Build the voice-library index file from a manifest.
pub async fn run_ingest(cfg: &Config, manifest: &Path) -> Result<()> {
    let Some(embedder) = app::embedder(cfg)? else {
        bail!("SILICONFLOW_API_KEY is required to ingest");
    };
    let data = std::fs::read_to_string(manifest)
        .with_context(|| format!("read {}", manifest.display()))?;
    let entries = parse_manifest(&data)?;

    for e in &entries {
        let clip = cfg.voice_lib.join(&e.filename);
        if !clip.exists() {
            tracing::warn!(clip = %clip.display(), "ingest: clip file missing");
        }
    }

    let index = build_library(embedder.as_ref(), &entries).await?;

    let out = &cfg.voice_index_path;
    if let Some(parent) = out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(out).with_context(|| format!("create {}", out.display()))?;
    save_library(&index, embedder.model(), &mut file)?;

    info!(path = %out.display(), clips = index.len(), "ingest: voice library written");
    println!("wrote {} clips to {}", index.len(), out.display());
    Ok(())
}

pub fn run_backup(cfg: &Config) -> Result<()> {
    let history = app::open_history(cfg)?;
    let report = backup(&history, &cfg.backup_dir, cfg.backup_retention(), Local::now())
        .context("backup")?;
    println!(
        "backup: {} ({} entries, {} expired removed)",
        report.path.display(),
        report.entries,
        report.removed.len()
    );
    Ok(())
}

pub fn run_clear_history(cfg: &Config, open_id: &str) -> Result<()> {
    let history = app::open_history(cfg)?;
    let removed = history.clear(open_id)?;
    info!(open_id, removed, "history: cleared");
    println!("removed {removed} messages for {open_id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::bot::tests::TableEmbedder;

    #[test]
    fn test_parse_manifest() {
        let data = r#"
# clips recorded 2026-03
{"filename": "praise.opus", "text": "挺好的"}

{"filename": "tired.opus", "text": "我有点累了"}
"#;
        let entries = parse_manifest(data).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].filename, "tired.opus");
    }

    #[test]
    fn test_parse_manifest_errors_name_line() {
        let err = parse_manifest("{\"filename\":\"a.opus\",\"text\":\"x\"}\nnope").unwrap_err();
        assert!(err.to_string().contains("line 2"));

        let err = parse_manifest(r#"{"filename":"","text":"x"}"#).unwrap_err();
        assert!(err.to_string().contains("required"));
    }

    #[tokio::test]
    async fn test_build_library() {
        let embedder = TableEmbedder(HashMap::from([
            ("挺好的".to_string(), vec![1.0, 0.0]),
            ("我有点累了".to_string(), vec![0.0, 1.0]),
        ]));
        let entries = parse_manifest(
            "{\"filename\":\"praise.opus\",\"text\":\"挺好的\"}\n{\"filename\":\"tired.opus\",\"text\":\"我有点累了\"}",
        )
        .unwrap();

        let index = build_library(&embedder, &entries).await.unwrap();
        assert_eq!(index.len(), 2);
        let hits = index.search(&[0.0, 1.0], 1).unwrap();
        assert_eq!(hits[0].id, "tired.opus");
    }

    #[test]
    fn test_backup_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            db_path: dir.path().join("memory.redb"),
            backup_dir: dir.path().join("backups"),
            ..Config::default()
        };
        {
            let h = app::open_history(&cfg).unwrap();
            h.append("ou_a", cuncun_history::Message::user("x")).unwrap();
        }

        run_backup(&cfg).unwrap();
        let backups: Vec<_> = std::fs::read_dir(&cfg.backup_dir).unwrap().collect();
        assert_eq!(backups.len(), 1);

        run_clear_history(&cfg, "ou_a").unwrap();
        assert_eq!(app::open_history(&cfg).unwrap().count("ou_a").unwrap(), 0);
    }
}
