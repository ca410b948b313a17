//! Exclude engine: expands a per-profile pattern file into concrete path sets.
//!
//! Grounded on the shell-glob semantics of the original `ProfileExcludeFile.glob`:
//! a leading `/` anchors a pattern to the sync root; otherwise the pattern is
//! searched for throughout the tree (`**/` is interposed). Comments (`#`) and
//! blank lines are ignored. Patterns that match nothing are silently dropped.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use crate::relpath::to_relpath_string;

/// A single exclude pattern read from the pattern file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExcludePattern {
	pub raw: String,
	pub anchored: bool,
}

/// Parses and evaluates a profile's exclude pattern file.
#[derive(Debug, Default)]
pub struct ExcludeEngine {
	patterns: Vec<ExcludePattern>,
	/// Absolute paths that matched the patterns, populated by `glob`.
	pub files: HashSet<std::path::PathBuf>,
	/// Relative paths that matched the patterns, populated by `glob`.
	pub rel_files: HashSet<String>,
}

impl ExcludeEngine {
	/// Read pattern lines from `path`, skipping `#`-comments and blank lines.
	pub fn load(path: &Path) -> io::Result<Self> {
		let patterns = if path.exists() {
			let contents = fs::read_to_string(path)?;
			Self::parse(&contents)
		} else {
			Vec::new()
		};
		Ok(ExcludeEngine { patterns, files: HashSet::new(), rel_files: HashSet::new() })
	}

	fn parse(contents: &str) -> Vec<ExcludePattern> {
		contents
			.lines()
			.filter_map(|line| {
				let trimmed = line.trim();
				if trimmed.is_empty() || trimmed.starts_with('#') {
					return None;
				}
				let anchored = trimmed.starts_with('/');
				let raw = if anchored { trimmed.trim_start_matches('/').to_string() } else { trimmed.to_string() };
				Some(ExcludePattern { raw, anchored })
			})
			.collect()
	}

	pub fn patterns(&self) -> &[ExcludePattern] {
		&self.patterns
	}

	/// Evaluate every pattern against `start_path`, populating `files` and
	/// `rel_files`. Intended to be called exactly once per sync.
	pub fn glob(&mut self, start_path: &Path) {
		self.files.clear();
		for pattern in &self.patterns {
			let glob_str = if pattern.anchored {
				start_path.join(&pattern.raw).to_string_lossy().to_string()
			} else {
				start_path.join("**").join(&pattern.raw).to_string_lossy().to_string()
			};

			if let Ok(paths) = glob::glob(&glob_str) {
				for entry in paths.flatten() {
					self.files.insert(entry);
				}
			}
		}

		self.rel_files = self
			.files
			.iter()
			.filter_map(|p| p.strip_prefix(start_path).ok())
			.map(to_relpath_string)
			.collect();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs as stdfs;
	use tempfile::TempDir;

	#[test]
	fn parse_skips_comments_and_blank_lines() {
		let patterns = ExcludeEngine::parse("# a comment\n\n*.tmp\n/build\n");
		assert_eq!(patterns.len(), 2);
		assert_eq!(patterns[0], ExcludePattern { raw: "*.tmp".into(), anchored: false });
		assert_eq!(patterns[1], ExcludePattern { raw: "build".into(), anchored: true });
	}

	#[test]
	fn glob_anchored_pattern_matches_only_at_root() {
		let tmp = TempDir::new().unwrap();
		stdfs::create_dir(tmp.path().join("build")).unwrap();
		stdfs::write(tmp.path().join("build/out.o"), b"x").unwrap();
		stdfs::create_dir_all(tmp.path().join("sub/build")).unwrap();

		let mut engine = ExcludeEngine { patterns: ExcludeEngine::parse("/build"), ..Default::default() };
		engine.glob(tmp.path());

		assert!(engine.rel_files.contains("build"));
		assert!(!engine.rel_files.contains("sub/build"));
	}

	#[test]
	fn glob_unanchored_pattern_matches_anywhere() {
		let tmp = TempDir::new().unwrap();
		stdfs::create_dir_all(tmp.path().join("sub")).unwrap();
		stdfs::write(tmp.path().join("a.tmp"), b"x").unwrap();
		stdfs::write(tmp.path().join("sub/b.tmp"), b"x").unwrap();

		let mut engine = ExcludeEngine { patterns: ExcludeEngine::parse("*.tmp"), ..Default::default() };
		engine.glob(tmp.path());

		assert!(engine.rel_files.contains("a.tmp"));
		assert!(engine.rel_files.contains("sub/b.tmp"));
	}

	#[test]
	fn glob_pattern_matching_nothing_is_silently_ignored() {
		let tmp = TempDir::new().unwrap();
		let mut engine = ExcludeEngine { patterns: ExcludeEngine::parse("nope/*.xyz"), ..Default::default() };
		engine.glob(tmp.path());
		assert!(engine.rel_files.is_empty());
	}
}
