//! Architectural Enforcement Integration Tests
//!
//! Source-scanning checks that keep the engine honest:
//! - No sleeping in production code (timers come from the tick interval)
//! - No process exits from the library
//! - No windowing, terminal UI or audio framework in `companion-core`
//!
//! The helpers here are shared by the tests under `tests/`.

use std::fs;
use std::path::{Path, PathBuf};

/// Workspace root, two levels above this package
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// Every `.rs` file below `dir` (relative to the workspace root)
pub fn rust_sources(dir: &str) -> Vec<PathBuf> {
    let root = workspace_root().join(dir);
    assert!(root.exists(), "expected source directory {}", root.display());

    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// One offending line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File containing the line
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// Trimmed source text
    pub text: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.line, self.text)
    }
}

/// Lines of production code in `content` containing any of `needles`
///
/// Comments are ignored, and scanning stops at the first `#[cfg(test)]`.
pub fn scan_production_lines(path: &Path, content: &str, needles: &[&str]) -> Vec<Violation> {
    let mut found = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        if line.trim_start().starts_with("#[cfg(test)]") {
            break;
        }

        let code_part = line.split("//").next().unwrap_or(line);
        if needles.iter().any(|n| code_part.contains(n)) {
            found.push(Violation {
                path: path.to_path_buf(),
                line: idx + 1,
                text: line.trim().to_string(),
            });
        }
    }

    found
}

/// Scan every production file under `dir`
pub fn scan_dir(dir: &str, needles: &[&str]) -> Vec<Violation> {
    rust_sources(dir)
        .iter()
        .filter_map(|path| {
            fs::read_to_string(path)
                .ok()
                .map(|content| scan_production_lines(path, &content, needles))
        })
        .flatten()
        .collect()
}

/// Fail with a readable report when `violations` is non-empty
pub fn report(rule: &str, violations: &[Violation]) {
    if violations.is_empty() {
        return;
    }

    eprintln!("\n❌ {rule}\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    panic!("\nFound {} violation(s): {rule}", violations.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_skips_comments_and_test_modules() {
        let code = "fn a() {}\n// std::thread::sleep(x)\nfn b() { std::thread::sleep(x); }\n#[cfg(test)]\nmod tests { fn c() { std::thread::sleep(x); } }\n";
        let found = scan_production_lines(Path::new("x.rs"), code, &["::sleep("]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, 3);
    }

    #[test]
    fn test_workspace_root_has_core() {
        assert!(workspace_root().join("companion/core/Cargo.toml").exists());
    }
}
