//! The `reset` command: clear a profile's local sync state.
//!
//! Thin per §1's scope note: drops the profile database and the recorded
//! last-sync time so the next `sync` treats every file as new, without
//! touching `config`/`exclude` or anything on the remote.

use std::path::Path;

use crate::error::SyncrError;
use crate::profile::ProfileContext;
use crate::profile_db::ProfileDatabase;

const LOCAL_DB_FILE: &str = "local.db";

pub fn reset(profiles_root: &Path, profile_name: &str) -> Result<(), SyncrError> {
	let mut ctx = ProfileContext::load(profiles_root, profile_name)?;

	let all_paths = ctx.db.get_tree("", None)?;
	ctx.db.remove_all(all_paths.keys().map(|s| s.as_str()))?;
	ctx.metadata.last_sync_utc = None;
	ctx.save_metadata()?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	fn write_profile(root: &Path, name: &str) {
		let dir = root.join(name);
		fs::create_dir_all(&dir).unwrap();
		fs::write(
			dir.join("config"),
			"LocalDir=/tmp/x\nRemoteHost=localhost\nRemoteUser=u\nPort=22\nRemoteDir=/tmp/y\nStorageLimit=1GiB\n",
		)
		.unwrap();
		fs::write(dir.join("exclude"), "").unwrap();
		fs::write(
			dir.join("info.json"),
			r#"{"status":"initialized","locked":false,"last_sync_utc":12345,"version":"0.1.0","id":"abc","init_opts":{}}"#,
		)
		.unwrap();
		let db = ProfileDatabase::open(&dir.join(LOCAL_DB_FILE)).unwrap();
		db.add("a.txt", 1.0, false).unwrap();
	}

	#[test]
	fn reset_clears_db_and_last_sync() {
		let tmp = TempDir::new().unwrap();
		write_profile(tmp.path(), "work");
		reset(tmp.path(), "work").unwrap();

		let ctx = ProfileContext::load(tmp.path(), "work").unwrap();
		assert_eq!(ctx.metadata.last_sync_utc, None);
		assert!(ctx.db.get("a.txt").unwrap().is_none());
	}
}
