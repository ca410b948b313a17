//! Per-profile configuration (`config`, an INI-like key=value file).
//!
//! Grounded on the original `ProfileConfigFile`: required and optional keys
//! with defaults, boolean coercion, `RemoteHost` synonym normalization and
//! the binary-unit `StorageLimit` format.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SyncrError;

const REQUIRED_KEYS: &[&str] = &["LocalDir", "RemoteHost", "RemoteUser", "Port", "RemoteDir", "StorageLimit"];
const BOOL_KEYS: &[&str] = &["DeleteAlways", "SyncExtraFiles", "InflatePriority", "AccountForSize"];
const TRUE_VALS: &[&str] = &["yes", "true"];
const FALSE_VALS: &[&str] = &["no", "false"];
const HOST_SYNONYMS: &[&str] = &["localhost", "127.0.0.1"];

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileConfig {
	pub local_dir: PathBuf,
	/// `None` means the remote is a local path (host was empty or a synonym).
	pub remote_host: Option<String>,
	pub remote_user: String,
	pub port: u16,
	pub remote_dir: PathBuf,
	pub storage_limit_bytes: u64,
	pub sshfs_options: String,
	pub trash_dirs: Vec<PathBuf>,
	pub delete_always: bool,
	pub sync_extra_files: bool,
	pub inflate_priority: bool,
	pub account_for_size: bool,
}

impl ProfileConfig {
	pub fn load(path: &Path) -> Result<Self, SyncrError> {
		let contents = fs::read_to_string(path)?;
		Self::parse(&contents)
	}

	fn parse(contents: &str) -> Result<Self, SyncrError> {
		let raw = parse_key_values(contents);

		let missing: Vec<&str> = REQUIRED_KEYS.iter().filter(|k| !raw.contains_key(**k)).copied().collect();
		if !missing.is_empty() {
			return Err(SyncrError::Input(format!("missing required config keys: {}", missing.join(", "))));
		}

		for key in BOOL_KEYS {
			if let Some(value) = raw.get(*key) {
				if !value.is_empty() && !is_bool_value(value) {
					return Err(SyncrError::Input(format!("{key} must have a boolean value")));
				}
			}
		}

		let remote_host_raw = raw.get("RemoteHost").cloned().unwrap_or_default();
		let remote_host = if remote_host_raw.is_empty() || HOST_SYNONYMS.contains(&remote_host_raw.as_str()) {
			None
		} else {
			Some(remote_host_raw)
		};

		let port: u16 = raw
			.get("Port")
			.unwrap()
			.parse()
			.map_err(|_| SyncrError::Input("Port must be a valid port number".to_string()))?;

		let storage_limit_bytes = parse_storage_limit(raw.get("StorageLimit").unwrap())?;

		let trash_dirs = raw
			.get("TrashDirs")
			.cloned()
			.unwrap_or_else(default_trash_dirs)
			.split(':')
			.map(PathBuf::from)
			.collect();

		Ok(ProfileConfig {
			local_dir: PathBuf::from(raw.get("LocalDir").unwrap()),
			remote_host,
			remote_user: raw.get("RemoteUser").unwrap().clone(),
			port,
			remote_dir: PathBuf::from(raw.get("RemoteDir").unwrap()),
			storage_limit_bytes,
			sshfs_options: raw
				.get("SshfsOptions")
				.cloned()
				.unwrap_or_else(|| "reconnect,ServerAliveInterval=5,ServerAliveCountMax=3".to_string()),
			trash_dirs,
			delete_always: bool_or_default(&raw, "DeleteAlways", false),
			sync_extra_files: bool_or_default(&raw, "SyncExtraFiles", true),
			inflate_priority: bool_or_default(&raw, "InflatePriority", true),
			account_for_size: bool_or_default(&raw, "AccountForSize", true),
		})
	}
}

fn parse_key_values(contents: &str) -> BTreeMap<String, String> {
	let mut out = BTreeMap::new();
	for line in contents.lines() {
		let trimmed = line.trim();
		if trimmed.is_empty() || trimmed.starts_with('#') {
			continue;
		}
		if let Some((key, value)) = trimmed.split_once('=') {
			out.insert(key.trim().to_string(), value.trim().to_string());
		}
	}
	out
}

fn is_bool_value(value: &str) -> bool {
	let lower = value.to_lowercase();
	TRUE_VALS.contains(&lower.as_str()) || FALSE_VALS.contains(&lower.as_str())
}

fn bool_or_default(raw: &BTreeMap<String, String>, key: &str, default: bool) -> bool {
	match raw.get(key) {
		Some(value) if !value.is_empty() => TRUE_VALS.contains(&value.to_lowercase().as_str()),
		_ => default,
	}
}

fn default_trash_dirs() -> String {
	let data_home =
		std::env::var("XDG_DATA_HOME").unwrap_or_else(|_| format!("{}/.local/share", home_dir()));
	format!("{data_home}/Trash/files")
}

fn home_dir() -> String {
	std::env::var("HOME").unwrap_or_default()
}

/// Parse a `StorageLimit` value like `10GiB` / `500MB` into bytes, always
/// using binary units (K = 1024) even for metric-looking suffixes.
fn parse_storage_limit(value: &str) -> Result<u64, SyncrError> {
	if value.is_empty() {
		return Err(SyncrError::Input("StorageLimit must not be blank".to_string()));
	}

	let digits_end = value.find(|c: char| !c.is_ascii_digit()).unwrap_or(value.len());
	let (number_str, unit) = value.split_at(digits_end);
	let number: u64 = number_str
		.parse()
		.map_err(|_| SyncrError::Input("StorageLimit must start with an integer".to_string()))?;

	let multiplier: u64 = match unit {
		"K" | "KB" | "KiB" => 1024,
		"M" | "MB" | "MiB" => 1024 * 1024,
		"G" | "GB" | "GiB" => 1024 * 1024 * 1024,
		_ => {
			return Err(SyncrError::Input(format!(
				"StorageLimit unit must be one of K, KB, KiB, M, MB, MiB, G, GB, GiB (got {unit:?})"
			)))
		}
	};

	Ok(number * multiplier)
}
