//! Path stores: recursive filesystem views over the local and remote sync directories.
//!
//! `LocalTree` walks the user's working directory, which may contain real files,
//! real directories and symlinks into the remote tree. `RemoteTree` walks the
//! mirror, which only ever contains real files and directories. Both share the
//! same enumeration and `symlink_tree` machinery; the distinction is purely in
//! how callers use them.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use crate::relpath::to_relpath_string;

/// Per-entry metadata captured by a tree walk.
///
/// `mtime` is real seconds UTC; `size_on_disk` is `st_blocks * 512`, matching
/// the spec's definition of on-disk size (not apparent file size).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stat {
	pub mtime: i64,
	pub size_on_disk: u64,
	pub is_dir: bool,
	pub is_symlink: bool,
}

/// Which entry kinds an enumeration admits.
#[derive(Debug, Clone, Copy)]
pub struct EnumerateFilter {
	pub files: bool,
	pub dirs: bool,
	pub symlinks: bool,
}

impl EnumerateFilter {
	pub fn all() -> Self {
		EnumerateFilter { files: true, dirs: true, symlinks: true }
	}

	pub fn files_only() -> Self {
		EnumerateFilter { files: true, dirs: false, symlinks: false }
	}

	pub fn dirs_only() -> Self {
		EnumerateFilter { files: false, dirs: true, symlinks: false }
	}

	fn admits(&self, is_dir: bool, is_symlink: bool) -> bool {
		if is_symlink {
			self.symlinks
		} else if is_dir {
			self.dirs
		} else {
			self.files
		}
	}
}

/// A filesystem view rooted at `root`, used for both the local working
/// directory and the remote mirror.
pub struct SyncTree {
	pub root: PathBuf,
}

impl SyncTree {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		SyncTree { root: root.into() }
	}

	/// Recursively enumerate entries under the root, admitted by `filter` and
	/// not present in `exclude` (relative paths).
	///
	/// Entries are produced streamingly via a recursive walk and only collected
	/// into the returned map here; callers that only need a predicate (e.g.
	/// "does this path exist") should prefer walking directly rather than
	/// materializing the whole map.
	pub fn enumerate(
		&self,
		filter: EnumerateFilter,
		exclude: &std::collections::HashSet<String>,
	) -> io::Result<BTreeMap<String, Stat>> {
		let mut out = BTreeMap::new();
		if self.root.is_dir() {
			self.walk(&self.root, filter, exclude, &mut out)?;
		}
		Ok(out)
	}

	fn walk(
		&self,
		dir: &Path,
		filter: EnumerateFilter,
		exclude: &std::collections::HashSet<String>,
		out: &mut BTreeMap<String, Stat>,
	) -> io::Result<()> {
		for entry in fs::read_dir(dir)? {
			let entry = entry?;
			let path = entry.path();
			let meta = fs::symlink_metadata(&path)?;
			let is_symlink = meta.file_type().is_symlink();
			let is_dir = !is_symlink && meta.is_dir();

			let rel = to_relpath_string(path.strip_prefix(&self.root).unwrap_or(&path));
			if exclude.contains(&rel) {
				continue;
			}

			if filter.admits(is_dir, is_symlink) {
				out.insert(rel.clone(), stat_from_metadata(&meta));
			}

			if is_dir {
				self.walk(&path, filter, exclude, out)?;
			}
		}
		Ok(())
	}

	/// Total size-on-disk of every real file under the root (directories and
	/// symlinks excluded).
	pub fn total_size(&self) -> io::Result<u64> {
		let stats = self.enumerate(EnumerateFilter::files_only(), &Default::default())?;
		Ok(stats.values().map(|s| s.size_on_disk).sum())
	}

	/// Free space available in the filesystem containing the root, via
	/// `statvfs`.
	pub fn available_space(&self) -> io::Result<u64> {
		let c_path = std::ffi::CString::new(self.root.as_os_str().as_encoded_bytes())
			.map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
		unsafe {
			let mut stat: libc::statvfs = std::mem::zeroed();
			if libc::statvfs(c_path.as_ptr(), &mut stat) != 0 {
				return Err(io::Error::last_os_error());
			}
			Ok(stat.f_bsize as u64 * stat.f_bavail as u64)
		}
	}

	/// Block size of the filesystem containing the root, used as the
	/// per-symlink overhead assumed by the priority solver.
	pub fn block_size(&self) -> io::Result<u64> {
		let meta = fs::metadata(&self.root)?;
		Ok(meta.blksize())
	}

	/// Recreate a mirror tree under `dest`, where each path in `include_files`
	/// becomes a symlink into this tree and each path in `include_dirs` becomes
	/// a real directory. Paths in `exclude` are skipped entirely.
	///
	/// Idempotent: a pre-existing symlink at the target whose link target
	/// already matches is left untouched; anything else at that path is
	/// replaced.
	pub fn symlink_tree(
		&self,
		dest: &Path,
		include_files: &std::collections::HashSet<String>,
		include_dirs: &std::collections::HashSet<String>,
		exclude: &std::collections::HashSet<String>,
	) -> io::Result<()> {
		fs::create_dir_all(dest)?;

		let mut dirs: Vec<&String> = include_dirs.iter().filter(|d| !exclude.contains(*d)).collect();
		dirs.sort_by_key(|d| d.matches('/').count());
		for rel in dirs {
			fs::create_dir_all(dest.join(rel))?;
		}

		for rel in include_files.iter().filter(|f| !exclude.contains(*f)) {
			let target = self.root.join(rel);
			let link = dest.join(rel);
			if let Some(parent) = link.parent() {
				fs::create_dir_all(parent)?;
			}

			match fs::symlink_metadata(&link) {
				Ok(meta) if meta.file_type().is_symlink() => {
					let existing = fs::read_link(&link)?;
					if existing == target {
						continue;
					}
					fs::remove_file(&link)?;
				}
				Ok(meta) if meta.is_dir() => {
					fs::remove_dir_all(&link)?;
				}
				Ok(_) => {
					fs::remove_file(&link)?;
				}
				Err(e) if e.kind() == io::ErrorKind::NotFound => {}
				Err(e) => return Err(e),
			}
			std::os::unix::fs::symlink(&target, &link)?;
		}
		Ok(())
	}
}

fn stat_from_metadata(meta: &fs::Metadata) -> Stat {
	Stat {
		mtime: meta.mtime(),
		size_on_disk: meta.blocks() * 512,
		is_dir: meta.is_dir() && !meta.file_type().is_symlink(),
		is_symlink: meta.file_type().is_symlink(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashSet;
	use tempfile::TempDir;

	#[test]
	fn enumerate_finds_files_and_dirs() {
		let tmp = TempDir::new().unwrap();
		fs::create_dir(tmp.path().join("sub")).unwrap();
		fs::write(tmp.path().join("a.txt"), b"hello").unwrap();
		fs::write(tmp.path().join("sub/b.txt"), b"world").unwrap();

		let tree = SyncTree::new(tmp.path());
		let entries = tree.enumerate(EnumerateFilter::all(), &HashSet::new()).unwrap();

		assert!(entries.contains_key("a.txt"));
		assert!(entries.contains_key("sub"));
		assert!(entries.contains_key("sub/b.txt"));
		assert!(!entries["a.txt"].is_dir);
		assert!(entries["sub"].is_dir);
	}

	#[test]
	fn enumerate_respects_exclude() {
		let tmp = TempDir::new().unwrap();
		fs::write(tmp.path().join("a.txt"), b"hello").unwrap();
		fs::write(tmp.path().join("b.txt"), b"world").unwrap();

		let tree = SyncTree::new(tmp.path());
		let mut exclude = HashSet::new();
		exclude.insert("b.txt".to_string());
		let entries = tree.enumerate(EnumerateFilter::all(), &exclude).unwrap();

		assert!(entries.contains_key("a.txt"));
		assert!(!entries.contains_key("b.txt"));
	}

	#[test]
	fn symlink_tree_creates_symlinks_and_dirs() {
		let tmp = TempDir::new().unwrap();
		let remote = tmp.path().join("remote");
		let local = tmp.path().join("local");
		fs::create_dir_all(remote.join("sub")).unwrap();
		fs::write(remote.join("sub/f.txt"), b"data").unwrap();

		let tree = SyncTree::new(&remote);
		let mut files = HashSet::new();
		files.insert("sub/f.txt".to_string());
		let mut dirs = HashSet::new();
		dirs.insert("sub".to_string());

		tree.symlink_tree(&local, &files, &dirs, &HashSet::new()).unwrap();

		let link = local.join("sub/f.txt");
		let meta = fs::symlink_metadata(&link).unwrap();
		assert!(meta.file_type().is_symlink());
		assert_eq!(fs::read_link(&link).unwrap(), remote.join("sub/f.txt"));
	}

	#[test]
	fn symlink_tree_is_idempotent() {
		let tmp = TempDir::new().unwrap();
		let remote = tmp.path().join("remote");
		let local = tmp.path().join("local");
		fs::create_dir_all(&remote).unwrap();
		fs::write(remote.join("f.txt"), b"data").unwrap();

		let tree = SyncTree::new(&remote);
		let mut files = HashSet::new();
		files.insert("f.txt".to_string());

		tree.symlink_tree(&local, &files, &Default::default(), &Default::default()).unwrap();
		let before = fs::symlink_metadata(local.join("f.txt")).unwrap().modified().unwrap();

		// Re-running should leave the matching symlink alone.
		tree.symlink_tree(&local, &files, &Default::default(), &Default::default()).unwrap();
		let after = fs::symlink_metadata(local.join("f.txt")).unwrap().modified().unwrap();
		assert_eq!(before, after);
	}
}
