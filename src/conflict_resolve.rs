//! Conflict resolution: a path modified on both sides since the last sync.
//!
//! Grounded on the original `_handle_conflicts`: only files conflict (a
//! directory's children are evaluated independently), and resolution is pure
//! mtime comparison — the older side is renamed out of the way so the newer
//! content becomes the one that transfers normally afterward.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use crate::relpath::timestamp_path;
use crate::tree::Stat;

/// Old-path -> new-path renames performed on each side.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConflictResolution {
	pub local_renamed: BTreeMap<String, String>,
	pub remote_renamed: BTreeMap<String, String>,
}

/// Resolve every path in `conflicts` that is a file in both `local_stats` and
/// `remote_stats`, performing the rename on disk under `local_root`/`remote_root`.
///
/// Directories (present in either stat map with `is_dir`) are skipped: their
/// children surface as their own conflicting paths if applicable.
pub fn resolve_conflicts<'a>(
	conflicts: impl IntoIterator<Item = &'a str>,
	local_stats: &BTreeMap<String, Stat>,
	remote_stats: &BTreeMap<String, Stat>,
	local_root: &Path,
	remote_root: &Path,
) -> io::Result<ConflictResolution> {
	let mut resolution = ConflictResolution::default();

	for path in conflicts {
		let (Some(local), Some(remote)) = (local_stats.get(path), remote_stats.get(path)) else {
			continue;
		};
		if local.is_dir || remote.is_dir {
			continue;
		}

		if local.mtime < remote.mtime {
			let new_path = timestamp_path(path, "conflict");
			rename_relpath(local_root, path, &new_path)?;
			resolution.local_renamed.insert(path.to_string(), new_path);
		} else if remote.mtime < local.mtime {
			let new_path = timestamp_path(path, "conflict");
			rename_relpath(remote_root, path, &new_path)?;
			resolution.remote_renamed.insert(path.to_string(), new_path);
		}
		// Equal mtimes: no action, considered the same version.
	}

	Ok(resolution)
}

fn rename_relpath(root: &Path, from: &str, to: &str) -> io::Result<()> {
	let to_abs = root.join(to);
	if let Some(parent) = to_abs.parent() {
		fs::create_dir_all(parent)?;
	}
	fs::rename(root.join(from), to_abs)
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	fn stat(mtime: i64) -> Stat {
		Stat { mtime, size_on_disk: 0, is_dir: false, is_symlink: false }
	}

	#[test]
	fn older_local_file_is_renamed() {
		let tmp = TempDir::new().unwrap();
		let local = tmp.path().join("local");
		let remote = tmp.path().join("remote");
		fs::create_dir_all(&local).unwrap();
		fs::create_dir_all(&remote).unwrap();
		fs::write(local.join("a.txt"), b"old").unwrap();
		fs::write(remote.join("a.txt"), b"new").unwrap();

		let mut local_stats = BTreeMap::new();
		local_stats.insert("a.txt".to_string(), stat(100));
		let mut remote_stats = BTreeMap::new();
		remote_stats.insert("a.txt".to_string(), stat(200));

		let resolution = resolve_conflicts(["a.txt"], &local_stats, &remote_stats, &local, &remote).unwrap();

		assert_eq!(resolution.local_renamed.len(), 1);
		assert!(resolution.remote_renamed.is_empty());
		assert!(!local.join("a.txt").exists());
		let new_name = &resolution.local_renamed["a.txt"];
		assert!(new_name.starts_with("a_conflict-"));
		assert!(local.join(new_name).exists());
	}

	#[test]
	fn equal_mtimes_take_no_action() {
		let tmp = TempDir::new().unwrap();
		let local = tmp.path().join("local");
		let remote = tmp.path().join("remote");
		fs::create_dir_all(&local).unwrap();
		fs::create_dir_all(&remote).unwrap();
		fs::write(local.join("a.txt"), b"x").unwrap();
		fs::write(remote.join("a.txt"), b"y").unwrap();

		let mut local_stats = BTreeMap::new();
		local_stats.insert("a.txt".to_string(), stat(100));
		let mut remote_stats = BTreeMap::new();
		remote_stats.insert("a.txt".to_string(), stat(100));

		let resolution = resolve_conflicts(["a.txt"], &local_stats, &remote_stats, &local, &remote).unwrap();
		assert!(resolution.local_renamed.is_empty());
		assert!(resolution.remote_renamed.is_empty());
		assert!(local.join("a.txt").exists());
	}

	#[test]
	fn directory_conflicts_are_skipped() {
		let tmp = TempDir::new().unwrap();
		let local = tmp.path().join("local");
		let remote = tmp.path().join("remote");
		fs::create_dir_all(local.join("d")).unwrap();
		fs::create_dir_all(remote.join("d")).unwrap();

		let mut local_stats = BTreeMap::new();
		local_stats.insert("d".to_string(), Stat { mtime: 1, size_on_disk: 0, is_dir: true, is_symlink: false });
		let mut remote_stats = BTreeMap::new();
		remote_stats.insert("d".to_string(), Stat { mtime: 2, size_on_disk: 0, is_dir: true, is_symlink: false });

		let resolution = resolve_conflicts(["d"], &local_stats, &remote_stats, &local, &remote).unwrap();
		assert!(resolution.local_renamed.is_empty());
		assert!(resolution.remote_renamed.is_empty());
	}
}
