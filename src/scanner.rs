use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;
use indicatif::{HumanBytes, HumanCount, ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::ScanOptions;
use crate::utils::FileInfo;

fn is_excluded(path: &Path, options: &ScanOptions) -> bool {
    options.exclude.iter().any(|excluded| excluded == path)
}

fn name_matches(path: &Path, options: &ScanOptions) -> bool {
    match (&options.mask, path.file_name()) {
        (None, _) => true,
        (Some(mask), Some(name)) => mask.is_match(&name.to_string_lossy()),
        (Some(_), None) => false,
    }
}

/// Lists the files to compare, in a stable order.
///
/// Each search path is walked in file name order. Excluded paths are neither
/// listed nor descended into, and without recursion only the direct children
/// of a search path are considered. A regular file is kept if it is at least
/// `min_size` bytes and its name matches the mask. Unreadable entries are
/// logged and skipped.
pub fn list_files(options: &ScanOptions) -> Result<Vec<FileInfo>> {
    let mut files = Vec::new();
    let mut seen = HashSet::new();
    let mut total_size = 0u64;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message("Listing files...");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    for root in &options.paths {
        if is_excluded(root, options) {
            debug!("Skipping excluded search path: '{}'", root.display());
            continue;
        }
        info!("Scanning {}", root.display());

        let max_depth = if options.recursive { usize::MAX } else { 1 };
        let walker = WalkDir::new(root)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_excluded(entry.path(), options));

        for entry in walker {
            pb.tick();
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to read directory entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let size = match path.metadata() {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    warn!("Failed to read metadata for '{}': {}", path.display(), e);
                    continue;
                }
            };
            if size < options.min_size || !name_matches(path, options) {
                continue;
            }
            if !seen.insert(path.to_path_buf()) {
                debug!("Already listed: '{}'", path.display());
                continue;
            }

            debug!("Found file: '{}' ({} bytes)", path.display(), size);
            total_size += size;
            files.push(FileInfo {
                path: path.to_path_buf(),
                size,
            });
            pb.set_message(format!("Listing files... {} found", files.len()));
        }
    }
    pb.finish_and_clear();

    info!(
        "Found {} files to compare ({})",
        HumanCount(files.len() as u64),
        HumanBytes(total_size)
    );
    Ok(files)
}
