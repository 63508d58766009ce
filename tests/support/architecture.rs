//! Source scanning helpers for the architecture contracts.

use std::fs;
use std::path::{Path, PathBuf};

/// One line of a Rust source file, located relative to the crate root.
#[derive(Debug)]
pub struct SourceLine {
    pub file: String,
    pub number: usize,
    pub text: String,
}

fn crate_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) {
    let mut pending = vec![dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir)
            .unwrap_or_else(|e| panic!("failed to read dir {}: {e}", dir.display()));
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                out.push(path);
            }
        }
    }
}

/// Every line of every `.rs` file under `relative_dir`.
fn source_lines(relative_dir: &str) -> Vec<SourceLine> {
    let root = crate_root();
    let mut files = Vec::new();
    walk(&root.join(relative_dir), &mut files);
    files.sort();

    files
        .into_iter()
        .flat_map(|path| {
            let content = fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
            let file = path
                .strip_prefix(&root)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            content
                .lines()
                .enumerate()
                .map(|(idx, text)| SourceLine {
                    file: file.clone(),
                    number: idx + 1,
                    text: text.to_string(),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Lines under `relative_dir` containing any of `patterns`.
pub fn lines_matching(relative_dir: &str, patterns: &[&str]) -> Vec<SourceLine> {
    source_lines(relative_dir)
        .into_iter()
        .filter(|line| patterns.iter().any(|p| line.text.contains(p)))
        .collect()
}

/// Like [`lines_matching`], ignoring the files listed in `allowed`.
pub fn lines_matching_outside(
    relative_dir: &str,
    patterns: &[&str],
    allowed: &[&str],
) -> Vec<SourceLine> {
    lines_matching(relative_dir, patterns)
        .into_iter()
        .filter(|line| !allowed.contains(&line.file.as_str()))
        .collect()
}

/// Lines in `mod.rs` files that are not module declarations, re-exports,
/// comments or cfg attributes.
pub fn mod_rs_violations(relative_dir: &str) -> Vec<SourceLine> {
    const ALLOWED_PREFIXES: [&str; 6] = ["//", "pub mod ", "pub(crate) mod ", "mod ", "pub use ", "#[cfg"];

    source_lines(relative_dir)
        .into_iter()
        .filter(|line| line.file.ends_with("/mod.rs"))
        .filter(|line| {
            let trimmed = line.text.trim();
            !trimmed.is_empty() && !ALLOWED_PREFIXES.iter().any(|p| trimmed.starts_with(p))
        })
        .collect()
}
