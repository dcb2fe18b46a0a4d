//! Source file collection for a batch.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Expand command-line inputs into source files.
///
/// Files are taken as given. A directory contributes the regular files
/// directly inside it, sorted by name; hidden files and subdirectories are
/// skipped. Whether a file is actually a video is left to the probe.
pub fn collect_sources(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut sources = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let before = sources.len();
            sources.extend(files_in_dir(input));
            debug!("{:?}: {} file(s)", input, sources.len() - before);
        } else {
            if !input.exists() {
                warn!("Input does not exist: {:?}", input);
            }
            sources.push(input.clone());
        }
    }

    sources
}

fn files_in_dir(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| !is_hidden(e.path()))
        .map(|e| e.into_path())
        .collect()
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_directory_expands_one_level() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.mp4"), b"").unwrap();
        fs::write(dir.path().join("a.mkv"), b"").unwrap();
        fs::write(dir.path().join(".DS_Store"), b"").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.mp4"), b"").unwrap();

        let sources = collect_sources(&[dir.path().to_path_buf()]);
        assert_eq!(
            sources,
            vec![dir.path().join("a.mkv"), dir.path().join("b.mp4")]
        );
    }

    #[test]
    fn test_files_are_kept_in_order() {
        let inputs = vec![PathBuf::from("/missing/z.mp4"), PathBuf::from("/missing/a.mp4")];
        assert_eq!(collect_sources(&inputs), inputs);
    }
}
