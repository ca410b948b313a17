//! Relative-path helpers shared by the path stores, databases and orchestrator.
//!
//! A relative path is forward-slash separated, rooted at a sync directory, never
//! contains `..` and never starts with `/`. Paths are compared byte-exact;
//! ordering by separator count descending (see [`by_depth_desc`]) guarantees
//! children sort before their parents, which the deletion executor relies on.

use std::path::{Path, PathBuf};

use chrono::Local;

/// Number of `/` separators in a relative path, used to order deepest-first.
pub fn depth(path: &str) -> usize {
	path.matches('/').count()
}

/// Sort paths so that deeper paths (more separators) come first.
///
/// Used before directory removal so a directory's contents are always
/// removed before the directory itself.
pub fn by_depth_desc(paths: &mut [String]) {
	paths.sort_by_key(|p| std::cmp::Reverse(depth(p)));
}

/// Returns true if `candidate` is `ancestor` itself or a descendant of it.
pub fn is_within(candidate: &str, ancestor: &str) -> bool {
	candidate == ancestor || candidate.starts_with(&format!("{ancestor}/"))
}

/// Produce a timestamped variant of a relative path.
///
/// ```ignore
/// timestamp_path("notes.txt", "conflict") == "notes_conflict-20170219-145503.txt"
/// ```
///
/// Uses local wall-clock time, matching the original tool's behavior.
pub fn timestamp_path(path: &str, keyword: &str) -> String {
	let p = Path::new(path);
	let stem = p.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
	let ext = p.extension().map(|e| format!(".{}", e.to_string_lossy())).unwrap_or_default();
	let parent = p.parent().filter(|parent| !parent.as_os_str().is_empty());

	let now = Local::now().format("%Y%m%d-%H%M%S");
	let filename = format!("{stem}_{keyword}-{now}{ext}");

	match parent {
		Some(parent) => to_relpath_string(&parent.join(filename)),
		None => filename,
	}
}

/// Convert a `PathBuf` to a forward-slash relative path string.
pub fn to_relpath_string(path: &Path) -> String {
	path.components()
		.map(|c| c.as_os_str().to_string_lossy().to_string())
		.collect::<Vec<_>>()
		.join("/")
}

/// Join a relative path onto an absolute root.
pub fn join(root: &Path, relpath: &str) -> PathBuf {
	root.join(relpath)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn depth_counts_separators() {
		assert_eq!(depth("a"), 0);
		assert_eq!(depth("a/b"), 1);
		assert_eq!(depth("a/b/c"), 2);
	}

	#[test]
	fn depth_desc_orders_children_first() {
		let mut paths = vec!["a".to_string(), "a/b".to_string(), "a/b/c".to_string()];
		by_depth_desc(&mut paths);
		assert_eq!(paths, vec!["a/b/c", "a/b", "a"]);
	}

	#[test]
	fn is_within_matches_self_and_descendants() {
		assert!(is_within("a/b", "a"));
		assert!(is_within("a", "a"));
		assert!(!is_within("ab", "a"));
		assert!(!is_within("a", "a/b"));
	}

	#[test]
	fn timestamp_path_keeps_extension_and_dir() {
		let result = timestamp_path("dir/notes.txt", "conflict");
		assert!(result.starts_with("dir/notes_conflict-"));
		assert!(result.ends_with(".txt"));
	}

	#[test]
	fn timestamp_path_no_extension() {
		let result = timestamp_path("README", "deleted");
		assert!(result.starts_with("README_deleted-"));
		assert!(!result.contains('.'));
	}
}
