// src/utils/snapshot.rs
use std::fs;
use std::path::{Path, PathBuf};

/// Saves a page snapshot for offline inspection when extraction goes wrong.
///
/// The dashboard markup drifts over time and selector failures are much easier
/// to diagnose from the exact HTML the extractor saw than from log lines.
/// Dumps are only written when a dump directory is configured; any write
/// failure is logged and swallowed so forensics never break a run.
pub fn dump_page(dir: Option<&Path>, label: &str, html: &str) -> Option<PathBuf> {
    let dir = dir?;
    if let Err(e) = fs::create_dir_all(dir) {
        tracing::warn!("Could not create snapshot dir {}: {}", dir.display(), e);
        return None;
    }

    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let path = dir.join(format!("{}-{}.html", stamp, sanitize(label)));
    match fs::write(&path, html) {
        Ok(()) => {
            tracing::info!("Saved page snapshot to {}", path.display());
            Some(path)
        }
        Err(e) => {
            tracing::warn!("Could not write snapshot {}: {}", path.display(), e);
            None
        }
    }
}

// Keep file names portable: labels come from free-form diagnostics.
fn sanitize(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_disabled_without_dir() {
        assert!(dump_page(None, "panel-timeout", "<html></html>").is_none());
    }

    #[test]
    fn test_dump_writes_sanitized_file() {
        let dir = std::env::temp_dir().join(format!("fleet-snap-{}", std::process::id()));
        let path = dump_page(Some(&dir), "no rows/page 2", "<html></html>")
            .expect("dump should succeed");
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with("-no_rows_page_2.html"));
        fs::remove_dir_all(&dir).ok();
    }
}
