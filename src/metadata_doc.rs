//! Per-profile `info.json` metadata document.
//!
//! Grounded on the original `ProfileInfoFile`: a small JSON document tracking
//! whether a profile finished initializing, whether it's currently locked,
//! when it last synced, and the options it was created with.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
	/// `init` started but did not finish; the profile cannot be synced.
	Partial,
	Initialized,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetadataDocument {
	pub status: ProfileStatus,
	pub locked: bool,
	pub last_sync_utc: Option<i64>,
	pub version: String,
	pub id: String,
	pub init_opts: serde_json::Value,
}

impl MetadataDocument {
	pub fn new(id: String, version: String, init_opts: serde_json::Value) -> Self {
		MetadataDocument { status: ProfileStatus::Partial, locked: false, last_sync_utc: None, version, id, init_opts }
	}

	pub fn load(path: &Path) -> io::Result<Self> {
		let contents = fs::read_to_string(path)?;
		serde_json::from_str(&contents).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
	}

	pub fn save(&self, path: &Path) -> io::Result<()> {
		let contents = serde_json::to_string_pretty(self).expect("serialize MetadataDocument");
		fs::write(path, contents)
	}

	pub fn is_initialized(&self) -> bool {
		self.status == ProfileStatus::Initialized
	}
}
