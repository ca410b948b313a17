//! `ProfileContext`: the bundle of state a single profile's operations need.
//!
//! Per §9's "global mutable config" design note, nothing here is a process
//! global; a `ProfileContext` is built once per command invocation and
//! threaded explicitly through the orchestrator and its helpers.

use std::path::{Path, PathBuf};

use crate::error::SyncrError;
use crate::exclude::ExcludeEngine;
use crate::metadata_doc::MetadataDocument;
use crate::profile_config::ProfileConfig;
use crate::profile_db::ProfileDatabase;

const CONFIG_FILE: &str = "config";
const EXCLUDE_FILE: &str = "exclude";
const INFO_FILE: &str = "info.json";
const LOCAL_DB_FILE: &str = "local.db";
const MOUNT_DIR: &str = "mnt";

pub struct ProfileContext {
	pub name: String,
	pub profile_dir: PathBuf,
	pub config: ProfileConfig,
	pub exclude: ExcludeEngine,
	pub metadata: MetadataDocument,
	pub db: ProfileDatabase,
}

impl ProfileContext {
	/// Load every piece of on-disk state for the profile named `name`, found
	/// under `profiles_root/<name>/`.
	pub fn load(profiles_root: &Path, name: &str) -> Result<Self, SyncrError> {
		let profile_dir = profiles_root.join(name);
		if !profile_dir.is_dir() {
			return Err(SyncrError::Input(format!("no such profile: {name}")));
		}

		let config = ProfileConfig::load(&profile_dir.join(CONFIG_FILE))?;
		let exclude = ExcludeEngine::load(&profile_dir.join(EXCLUDE_FILE))?;
		let metadata = MetadataDocument::load(&profile_dir.join(INFO_FILE))?;
		let db = ProfileDatabase::open(&profile_dir.join(LOCAL_DB_FILE))?;

		if !metadata.is_initialized() {
			return Err(SyncrError::Status(format!(
				"profile {name} was only partially initialized; run `init {name}` again to finish setting it up"
			)));
		}

		Ok(ProfileContext { name: name.to_string(), profile_dir, config, exclude, metadata, db })
	}

	pub fn mount_dir(&self) -> PathBuf {
		self.profile_dir.join(MOUNT_DIR)
	}

	pub fn info_path(&self) -> PathBuf {
		self.profile_dir.join(INFO_FILE)
	}

	pub fn save_metadata(&self) -> Result<(), SyncrError> {
		self.metadata.save(&self.info_path())?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	fn write_profile(root: &Path, name: &str, status: &str) {
		let dir = root.join(name);
		fs::create_dir_all(&dir).unwrap();
		fs::write(
			dir.join(CONFIG_FILE),
			"LocalDir=/tmp/x\nRemoteHost=localhost\nRemoteUser=u\nPort=22\nRemoteDir=/tmp/y\nStorageLimit=1GiB\n",
		)
		.unwrap();
		fs::write(dir.join(EXCLUDE_FILE), "").unwrap();
		fs::write(
			dir.join(INFO_FILE),
			format!(r#"{{"status":"{status}","locked":false,"last_sync_utc":null,"version":"0.1.0","id":"abc","init_opts":{{}}}}"#),
		)
		.unwrap();
	}

	#[test]
	fn load_succeeds_for_initialized_profile() {
		let tmp = TempDir::new().unwrap();
		write_profile(tmp.path(), "work", "initialized");
		let ctx = ProfileContext::load(tmp.path(), "work").unwrap();
		assert_eq!(ctx.name, "work");
	}

	#[test]
	fn load_rejects_partial_profile() {
		let tmp = TempDir::new().unwrap();
		write_profile(tmp.path(), "work", "partial");
		let result = ProfileContext::load(tmp.path(), "work");
		assert!(matches!(result, Err(SyncrError::Status(_))));
	}

	#[test]
	fn load_rejects_unknown_profile() {
		let tmp = TempDir::new().unwrap();
		let result = ProfileContext::load(tmp.path(), "missing");
		assert!(matches!(result, Err(SyncrError::Input(_))));
	}
}
