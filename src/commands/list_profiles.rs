//! The `list-profiles` command: enumerate existing profiles.
//!
//! Grounded on the original `Command`'s profile discovery (scanning the
//! profiles directory for subdirectories), adapted to `std::fs::read_dir`.

use std::path::Path;

use crate::error::SyncrError;

pub fn list_profiles(profiles_root: &Path) -> Result<Vec<String>, SyncrError> {
	let mut names = Vec::new();
	if !profiles_root.is_dir() {
		return Ok(names);
	}

	for entry in std::fs::read_dir(profiles_root)? {
		let entry = entry?;
		if entry.file_type()?.is_dir() {
			if let Some(name) = entry.file_name().to_str() {
				names.push(name.to_string());
			}
		}
	}
	names.sort();
	Ok(names)
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[test]
	fn lists_profile_directories_sorted() {
		let tmp = TempDir::new().unwrap();
		std::fs::create_dir(tmp.path().join("zebra")).unwrap();
		std::fs::create_dir(tmp.path().join("apple")).unwrap();
		std::fs::write(tmp.path().join("not_a_dir"), "").unwrap();

		let names = list_profiles(tmp.path()).unwrap();
		assert_eq!(names, vec!["apple".to_string(), "zebra".to_string()]);
	}

	#[test]
	fn missing_root_returns_empty() {
		let tmp = TempDir::new().unwrap();
		let names = list_profiles(&tmp.path().join("nope")).unwrap();
		assert!(names.is_empty());
	}
}
