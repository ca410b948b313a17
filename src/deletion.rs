//! Deletion computer and executor (spec §4.5, §7).
//!
//! Grounded on the original `_compute_deleted`/`_rm_local_files`/
//! `_rm_remote_files`/`_trash_files`: a path known to the profile database but
//! missing from one side propagates as a deletion on the other side. Remote
//! deletions are either hard (removed outright) or soft (renamed into a
//! "deleted" state) depending on whether the file is already sitting in one
//! of the user's trash directories.
//!
//! Every destructive loop here buffers the paths it actually managed to
//! remove/rename and flushes that buffer to the databases in a scope guard
//! that runs whether or not the loop finished cleanly, so a partial failure
//! never leaves a database out of sync with the filesystem it describes.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::relpath::timestamp_path;
use crate::remote_db::RemoteDatabase;

/// Paths to delete, split by which side and whether the remote side should be
/// a hard delete or a soft (trash) rename.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeletedPaths {
	pub local: BTreeSet<String>,
	pub remote_hard: BTreeSet<String>,
	pub remote_trash: BTreeSet<String>,
}

/// Colon-joined list of trash directories, checked by path membership.
pub struct TrashDirs {
	dirs: Vec<PathBuf>,
}

impl TrashDirs {
	pub fn new(dirs: Vec<PathBuf>) -> Self {
		TrashDirs { dirs }
	}

	/// True if `file` lives inside one of the configured trash directories.
	pub fn contains(&self, file: &Path) -> bool {
		self.dirs.iter().any(|dir| file.starts_with(dir))
	}
}

/// Compute which known paths must be deleted on each side.
///
/// `known` is the profile database's full tree; `local`/`remote` are the
/// current on-disk path sets (relative). `remote_is_dir` and `remote_root`
/// are used to classify and locate candidate paths when deciding between a
/// hard delete and a soft (trash) rename.
pub fn compute_deleted(
	known: &BTreeSet<String>,
	local: &BTreeSet<String>,
	remote: &BTreeSet<String>,
	remote_root: &Path,
	remote_is_dir: impl Fn(&str) -> bool,
	delete_always: bool,
	trash_dirs: &TrashDirs,
) -> DeletedPaths {
	let local_del: BTreeSet<String> = known.difference(remote).cloned().collect();
	let mut remote_del: BTreeSet<String> = known.difference(local).cloned().collect();

	let mut trash_paths = BTreeSet::new();
	if !delete_always {
		for path in &remote_del {
			if remote_is_dir(path) {
				// Directories are never explicitly soft-deleted; they vanish
				// from the DB once their last child does.
				continue;
			}
			let dest_path = remote_root.join(path);
			if dest_path.is_file() && !trash_dirs.contains(&dest_path) {
				trash_paths.insert(path.clone());
			}
		}
		for path in &trash_paths {
			remote_del.remove(path);
		}
	}

	DeletedPaths { local: local_del, remote_hard: remote_del, remote_trash: trash_paths }
}

/// Remove local files/directories in `paths` and purge them from both
/// databases, regardless of whether every removal succeeded.
pub fn rm_local_files<'a>(
	paths: impl IntoIterator<Item = &'a str>,
	local_root: &Path,
	local_db: &crate::profile_db::ProfileDatabase,
	remote_db: &RemoteDatabase,
) -> io::Result<()> {
	let mut deleted = Vec::new();
	let mut first_err = None;

	for path in paths {
		let full = local_root.join(path);
		let result = match fs::symlink_metadata(&full) {
			Ok(meta) if meta.is_dir() && !meta.file_type().is_symlink() => fs::remove_dir_all(&full),
			Ok(_) => fs::remove_file(&full),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(e),
		};
		match result {
			Ok(()) => deleted.push(path),
			Err(e) => {
				first_err.get_or_insert(e);
				break;
			}
		}
	}

	let flush_result = (|| -> Result<(), redb::Error> {
		remote_db.remove_all(deleted.iter().copied())?;
		local_db.remove_all(deleted.iter().copied())?;
		Ok(())
	})();
	flush_result.map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

	match first_err {
		Some(e) => Err(e),
		None => Ok(()),
	}
}

/// Remove remote files/directories in `paths` and purge them from both
/// databases, regardless of whether every removal succeeded.
pub fn rm_remote_files<'a>(
	paths: impl IntoIterator<Item = &'a str>,
	remote_root: &Path,
	local_db: &crate::profile_db::ProfileDatabase,
	remote_db: &RemoteDatabase,
) -> io::Result<()> {
	let mut deleted = Vec::new();
	let mut first_err = None;

	for path in paths {
		let full = remote_root.join(path);
		let result = match fs::symlink_metadata(&full) {
			Ok(meta) if meta.is_dir() && !meta.file_type().is_symlink() => fs::remove_dir_all(&full),
			Ok(_) => fs::remove_file(&full),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(e),
		};
		match result {
			Ok(()) => deleted.push(path),
			Err(e) => {
				first_err.get_or_insert(e);
				break;
			}
		}
	}

	let flush_result = (|| -> Result<(), redb::Error> {
		local_db.remove_all(deleted.iter().copied())?;
		remote_db.remove_all(deleted.iter().copied())?;
		Ok(())
	})();
	flush_result.map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

	match first_err {
		Some(e) => Err(e),
		None => Ok(()),
	}
}

/// Soft-delete (rename to a "deleted" marker) every path in `paths` on the
/// remote side, removing the old path from both databases and re-adding the
/// new, renamed path to the remote database as deleted.
pub fn trash_files<'a>(
	paths: impl IntoIterator<Item = &'a str>,
	remote_root: &Path,
	remote_is_dir: impl Fn(&str) -> bool,
	local_db: &crate::profile_db::ProfileDatabase,
	remote_db: &RemoteDatabase,
) -> io::Result<()> {
	let mut old_renamed = Vec::new();
	let mut new_renamed: Vec<(String, bool)> = Vec::new();
	let mut first_err = None;

	for path in paths {
		let new_path = timestamp_path(path, "deleted");
		let is_dir = remote_is_dir(path);
		let from = remote_root.join(path);
		let to = remote_root.join(&new_path);

		let result = (|| -> io::Result<()> {
			if let Some(parent) = to.parent() {
				fs::create_dir_all(parent)?;
			}
			fs::rename(&from, &to)
		})();

		match result {
			Ok(()) => {
				old_renamed.push(path.to_string());
				new_renamed.push((new_path, is_dir));
			}
			Err(e) => {
				first_err.get_or_insert(e);
				break;
			}
		}
	}

	let flush_result = (|| -> Result<(), redb::Error> {
		local_db.remove_all(old_renamed.iter().map(|s| s.as_str()))?;
		remote_db.remove_all(old_renamed.iter().map(|s| s.as_str()))?;
		for (new_path, is_dir) in &new_renamed {
			remote_db.add(new_path, 0, *is_dir)?;
			remote_db.set_deleted(new_path, true)?;
		}
		Ok(())
	})();
	flush_result.map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

	match first_err {
		Some(e) => Err(e),
		None => Ok(()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::profile_db::ProfileDatabase;
	use std::collections::BTreeSet;
	use tempfile::TempDir;

	fn set(items: &[&str]) -> BTreeSet<String> {
		items.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn compute_deleted_finds_each_side_gap() {
		let known = set(&["a.txt", "b.txt"]);
		let local = set(&["a.txt"]);
		let remote = set(&["b.txt"]);
		let trash = TrashDirs::new(vec![]);

		let result = compute_deleted(&known, &local, &remote, Path::new("/nonexistent"), |_| false, true, &trash);

		assert_eq!(result.local, set(&["b.txt"]));
		assert_eq!(result.remote_hard, set(&["a.txt"]));
	}

	#[test]
	fn compute_deleted_trashes_files_not_already_in_trash() {
		let tmp = TempDir::new().unwrap();
		let remote_root = tmp.path().join("remote");
		std::fs::create_dir_all(&remote_root).unwrap();
		std::fs::write(remote_root.join("gone.txt"), b"x").unwrap();

		let known = set(&["gone.txt"]);
		let local = set(&[]);
		let remote = set(&["gone.txt"]);
		let trash = TrashDirs::new(vec![]);

		let result = compute_deleted(&known, &local, &remote, &remote_root, |_| false, false, &trash);

		assert!(result.remote_hard.is_empty());
		assert_eq!(result.remote_trash, set(&["gone.txt"]));
	}

	#[test]
	fn rm_local_files_updates_both_dbs() {
		let tmp = TempDir::new().unwrap();
		let local_root = tmp.path().join("local");
		std::fs::create_dir_all(&local_root).unwrap();
		std::fs::write(local_root.join("a.txt"), b"x").unwrap();

		let local_db = ProfileDatabase::open(&tmp.path().join("local.db")).unwrap();
		local_db.add("a.txt", 1.0, false).unwrap();
		let remote_db = RemoteDatabase::open(&tmp.path().join("remote.db")).unwrap();
		remote_db.add("a.txt", 0, false).unwrap();

		rm_local_files(["a.txt"], &local_root, &local_db, &remote_db).unwrap();

		assert!(!local_root.join("a.txt").exists());
		assert!(local_db.get("a.txt").unwrap().is_none());
		assert!(remote_db.get("a.txt").unwrap().is_none());
	}

	#[test]
	fn trash_files_renames_and_marks_deleted() {
		let tmp = TempDir::new().unwrap();
		let remote_root = tmp.path().join("remote");
		std::fs::create_dir_all(&remote_root).unwrap();
		std::fs::write(remote_root.join("gone.txt"), b"x").unwrap();

		let local_db = ProfileDatabase::open(&tmp.path().join("local.db")).unwrap();
		local_db.add("gone.txt", 1.0, false).unwrap();
		let remote_db = RemoteDatabase::open(&tmp.path().join("remote.db")).unwrap();
		remote_db.add("gone.txt", 0, false).unwrap();

		trash_files(["gone.txt"], &remote_root, |_| false, &local_db, &remote_db).unwrap();

		assert!(!remote_root.join("gone.txt").exists());
		assert!(local_db.get("gone.txt").unwrap().is_none());
		assert!(remote_db.get("gone.txt").unwrap().is_none());

		let tree = remote_db.get_tree("", None, Some(true), None).unwrap();
		assert_eq!(tree.len(), 1);
	}
}
