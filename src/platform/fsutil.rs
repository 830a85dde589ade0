//! Small filesystem utilities.

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::{PerftraceError, PerftraceResult};

/// Expands trace selectors into concrete files.
///
/// Plain paths are accepted as-is when they exist; anything carrying glob
/// metacharacters is matched against a walk rooted at the pattern's literal
/// prefix. The result is sorted and deduplicated.
pub fn find_trace_files(patterns: &[String]) -> PerftraceResult<Vec<PathBuf>> {
    let mut out = BTreeSet::new();
    let mut globs = Vec::new();

    for pattern in patterns {
        if has_glob_meta(pattern) {
            globs.push(pattern.clone());
            continue;
        }
        let candidate = PathBuf::from(pattern);
        if !candidate.is_file() {
            return Err(PerftraceError::InvalidArgument(format!(
                "trace file {pattern:?} does not exist"
            )));
        }
        out.insert(candidate);
    }

    if !globs.is_empty() {
        let set = compile_globset(&globs)?;
        for root in walk_roots(&globs) {
            for entry in WalkDir::new(&root)
                .follow_links(false)
                .into_iter()
                .filter_entry(|e| !should_skip_dir(e.path()))
            {
                let entry = entry.map_err(|e| {
                    let msg = e.to_string();
                    PerftraceError::Io(
                        e.into_io_error()
                            .unwrap_or_else(|| std::io::Error::other(msg)),
                    )
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let p = entry.path();
                let rel = p.strip_prefix(".").unwrap_or(p);
                if set.is_match(rel) || set.is_match(p) {
                    out.insert(rel.to_path_buf());
                }
            }
        }
    }

    tracing::debug!("resolved {} trace file(s)", out.len());
    Ok(out.into_iter().collect())
}

pub fn write_json(path: &Path, value: &impl Serialize) -> PerftraceResult<()> {
    ensure_parent(path)?;
    std::fs::write(path, serde_json::to_vec_pretty(value)?)?;
    Ok(())
}

pub fn write_text(path: &Path, value: &str) -> PerftraceResult<()> {
    ensure_parent(path)?;
    std::fs::write(path, value)?;
    Ok(())
}

fn ensure_parent(path: &Path) -> PerftraceResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn walk_roots(patterns: &[String]) -> BTreeSet<PathBuf> {
    let mut roots = BTreeSet::new();
    for pattern in patterns {
        let prefix = pattern
            .split(['*', '?', '[', ']', '{', '}'])
            .next()
            .unwrap_or_default();
        let trimmed = prefix.trim_end_matches('/');
        if trimmed.is_empty() {
            roots.insert(PathBuf::from("."));
            continue;
        }
        let p = PathBuf::from(trimmed);
        if p.is_dir() {
            roots.insert(p);
        } else {
            match p.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => {
                    roots.insert(parent.to_path_buf());
                }
                _ => {
                    roots.insert(PathBuf::from("."));
                }
            }
        }
    }
    roots
}

fn should_skip_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .is_some_and(|name| matches!(name, ".git" | "target" | "node_modules"))
}

fn compile_globset(patterns: &[String]) -> PerftraceResult<GlobSet> {
    let mut b = GlobSetBuilder::new();
    for p in patterns {
        let g = Glob::new(p)
            .map_err(|e| PerftraceError::InvalidArgument(format!("invalid glob {p:?}: {e}")))?;
        b.add(g);
    }
    b.build()
        .map_err(|e| PerftraceError::InvalidArgument(format!("invalid globset: {e}")))
}

fn has_glob_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', ']', '{', '}'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("perftrace-fsutil-{name}-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        dir
    }

    #[test]
    fn plain_path_is_accepted() {
        let root = temp_dir("plain");
        let trace = root.join("trace.speedscope.json");
        std::fs::write(&trace, br#"{"shared":{"frames":[]},"profiles":[]}"#).expect("write");
        let found = find_trace_files(&[trace.to_string_lossy().to_string()]).expect("find");
        assert_eq!(found, vec![trace]);
    }

    #[test]
    fn missing_plain_path_is_invalid_argument() {
        let err = find_trace_files(&["definitely-missing.speedscope.json".to_string()])
            .expect_err("must fail");
        assert!(matches!(err, PerftraceError::InvalidArgument(_)));
    }

    #[test]
    fn glob_matches_only_trace_files() {
        let root = temp_dir("glob");
        std::fs::write(root.join("a.speedscope.json"), b"{}").expect("write a");
        std::fs::write(root.join("b.speedscope.json"), b"{}").expect("write b");
        std::fs::write(root.join("notes.md"), b"# notes").expect("write notes");
        let pattern = format!("{}/*.speedscope.json", root.display());
        let found = find_trace_files(&[pattern]).expect("find");
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.to_string_lossy().ends_with(".speedscope.json")));
    }

    #[test]
    fn write_json_creates_parent_dirs() {
        let root = temp_dir("write");
        let out = root.join("nested").join("metrics.json");
        write_json(&out, &serde_json::json!({"ok": true})).expect("write");
        let back: serde_json::Value =
            serde_json::from_slice(&std::fs::read(out).expect("read")).expect("parse");
        assert_eq!(back["ok"], serde_json::json!(true));
    }
}
