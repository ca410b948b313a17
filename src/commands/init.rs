//! The `init` command: scaffold a new profile directory (§6 layout).
//!
//! Deliberately thin per §1's scope note: it creates the directory tree and
//! starter files, then leaves the profile in `partial` status until the
//! caller has edited `config`/`exclude` and re-run `init` to finish, the
//! same two-step flow the original's interactive wizard produced.

use std::fs;
use std::path::Path;

use uuid::Uuid;

use crate::error::SyncrError;
use crate::metadata_doc::{MetadataDocument, ProfileStatus};
use crate::profile_config::ProfileConfig;

const CONFIG_FILE: &str = "config";
const EXCLUDE_FILE: &str = "exclude";
const INFO_FILE: &str = "info.json";
const LOCAL_DB_FILE: &str = "local.db";
const MOUNT_DIR: &str = "mnt";

const CONFIG_TEMPLATE: &str = "\
# LocalDir=/path/to/local/directory
# RemoteHost=localhost
# RemoteUser=user
# Port=22
# RemoteDir=/path/to/remote/directory
# StorageLimit=10GiB
";

pub fn init(profiles_root: &Path, profile_name: &str) -> Result<(), SyncrError> {
	let profile_dir = profiles_root.join(profile_name);
	fs::create_dir_all(profile_dir.join(MOUNT_DIR))?;

	let config_path = profile_dir.join(CONFIG_FILE);
	if !config_path.exists() {
		fs::write(&config_path, CONFIG_TEMPLATE)?;
	}

	let exclude_path = profile_dir.join(EXCLUDE_FILE);
	if !exclude_path.exists() {
		fs::write(&exclude_path, "")?;
	}

	let info_path = profile_dir.join(INFO_FILE);
	let mut metadata = if info_path.exists() {
		MetadataDocument::load(&info_path)?
	} else {
		MetadataDocument::new(Uuid::new_v4().to_string(), env!("CARGO_PKG_VERSION").to_string(), serde_json::json!({}))
	};

	if ProfileConfig::load(&config_path).is_ok() {
		metadata.status = ProfileStatus::Initialized;
		crate::profile_db::ProfileDatabase::open(&profile_dir.join(LOCAL_DB_FILE))?;
	}
	metadata.save(&info_path)?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[test]
	fn init_leaves_profile_partial_without_a_filled_config() {
		let tmp = TempDir::new().unwrap();
		init(tmp.path(), "work").unwrap();
		let metadata = MetadataDocument::load(&tmp.path().join("work").join(INFO_FILE)).unwrap();
		assert_eq!(metadata.status, ProfileStatus::Partial);
	}

	#[test]
	fn init_finishes_once_config_is_valid() {
		let tmp = TempDir::new().unwrap();
		init(tmp.path(), "work").unwrap();
		fs::write(
			tmp.path().join("work").join(CONFIG_FILE),
			"LocalDir=/tmp/x\nRemoteHost=localhost\nRemoteUser=u\nPort=22\nRemoteDir=/tmp/y\nStorageLimit=1GiB\n",
		)
		.unwrap();
		init(tmp.path(), "work").unwrap();
		let metadata = MetadataDocument::load(&tmp.path().join("work").join(INFO_FILE)).unwrap();
		assert_eq!(metadata.status, ProfileStatus::Initialized);
	}
}
