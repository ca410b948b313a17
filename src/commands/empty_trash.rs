//! The `empty-trash` command: delete every remote file marked for deletion.
//!
//! Grounded on `examples/original_source/zielen/commands/emptytrash.py`'s
//! `EmptyTrashCommand.main`: walk the remote database for paths with
//! `deleted=true`, remove each from the mounted remote directory, tolerating
//! a file that's already gone, and report the count removed.

use std::fs;
use std::io;

use crate::error::SyncrError;
use crate::profile::ProfileContext;
use crate::remote_db::RemoteDatabase;

const REMOTE_METADATA_DIR: &str = ".retain-sync";
const REMOTE_DB_FILE: &str = "remote.db";

pub fn empty_trash(ctx: &ProfileContext) -> Result<usize, SyncrError> {
	let remote_root = ctx.mount_dir();
	let remote_db = RemoteDatabase::open(&remote_root.join(REMOTE_METADATA_DIR).join(REMOTE_DB_FILE))?;

	let trashed: Vec<String> = remote_db.get_tree("", None, Some(true), None)?.into_keys().collect();

	let mut files_deleted = 0;
	let mut removed = Vec::new();
	for path in &trashed {
		match fs::remove_file(remote_root.join(path)) {
			Ok(()) => {
				files_deleted += 1;
				removed.push(path.as_str());
			}
			Err(e) if e.kind() == io::ErrorKind::NotFound => removed.push(path.as_str()),
			Err(e) => return Err(e.into()),
		}
	}
	remote_db.remove_all(removed)?;

	Ok(files_deleted)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs as stdfs;
	use tempfile::TempDir;

	fn write_profile(root: &std::path::Path, name: &str) {
		let dir = root.join(name);
		stdfs::create_dir_all(dir.join("mnt")).unwrap();
		stdfs::write(
			dir.join("config"),
			"LocalDir=/tmp/x\nRemoteHost=localhost\nRemoteUser=u\nPort=22\nRemoteDir=/tmp/y\nStorageLimit=1GiB\n",
		)
		.unwrap();
		stdfs::write(dir.join("exclude"), "").unwrap();
		stdfs::write(
			dir.join("info.json"),
			r#"{"status":"initialized","locked":false,"last_sync_utc":null,"version":"0.1.0","id":"abc","init_opts":{}}"#,
		)
		.unwrap();
		crate::profile_db::ProfileDatabase::open(&dir.join("local.db")).unwrap();
	}

	#[test]
	fn empty_trash_removes_files_and_db_rows() {
		let tmp = TempDir::new().unwrap();
		write_profile(tmp.path(), "work");
		let ctx = ProfileContext::load(tmp.path(), "work").unwrap();

		let remote_root = ctx.mount_dir();
		stdfs::create_dir_all(remote_root.join(REMOTE_METADATA_DIR)).unwrap();
		stdfs::write(remote_root.join("gone.txt"), b"x").unwrap();
		let remote_db =
			RemoteDatabase::open(&remote_root.join(REMOTE_METADATA_DIR).join(REMOTE_DB_FILE)).unwrap();
		remote_db.add("gone.txt", 0, false).unwrap();
		remote_db.set_deleted("gone.txt", true).unwrap();
		remote_db.add("kept.txt", 0, false).unwrap();
		drop(remote_db);

		let count = empty_trash(&ctx).unwrap();
		assert_eq!(count, 1);

		assert!(!remote_root.join("gone.txt").exists());
		let remote_db =
			RemoteDatabase::open(&remote_root.join(REMOTE_METADATA_DIR).join(REMOTE_DB_FILE)).unwrap();
		assert!(remote_db.get("gone.txt").unwrap().is_none());
		assert!(remote_db.get("kept.txt").unwrap().is_some());
	}

	#[test]
	fn empty_trash_tolerates_already_missing_file() {
		let tmp = TempDir::new().unwrap();
		write_profile(tmp.path(), "work");
		let ctx = ProfileContext::load(tmp.path(), "work").unwrap();

		let remote_root = ctx.mount_dir();
		stdfs::create_dir_all(remote_root.join(REMOTE_METADATA_DIR)).unwrap();
		let remote_db =
			RemoteDatabase::open(&remote_root.join(REMOTE_METADATA_DIR).join(REMOTE_DB_FILE)).unwrap();
		remote_db.add("missing.txt", 0, false).unwrap();
		remote_db.set_deleted("missing.txt", true).unwrap();
		drop(remote_db);

		let count = empty_trash(&ctx).unwrap();
		assert_eq!(count, 0);

		let remote_db =
			RemoteDatabase::open(&remote_root.join(REMOTE_METADATA_DIR).join(REMOTE_DB_FILE)).unwrap();
		assert!(remote_db.get("missing.txt").unwrap().is_none());
	}
}
