//! Profile database: per-path priority scores and directory flags.
//!
//! Backed by `redb`, following the same table-per-concern, bincode-serialized-value
//! pattern as the child cache (see `cache.rs`): every public operation opens its
//! own transaction, so no cross-operation atomicity is promised beyond what the
//! orchestrator's phase ordering provides (spec §5).

use std::collections::BTreeMap;
use std::path::Path;

use redb::{ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

const FILES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("files");

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ProfileEntry {
	pub priority: f64,
	pub is_directory: bool,
}

pub struct ProfileDatabase {
	db: redb::Database,
}

impl ProfileDatabase {
	pub fn open(db_path: &Path) -> Result<Self, redb::Error> {
		let db = redb::Database::create(db_path)?;
		{
			let write_txn = db.begin_write()?;
			let _ = write_txn.open_table(FILES_TABLE)?;
			write_txn.commit()?;
		}
		Ok(ProfileDatabase { db })
	}

	/// Insert `path` with `priority` if it doesn't already exist. No-op otherwise.
	pub fn add(&self, path: &str, priority: f64, is_dir: bool) -> Result<(), redb::Error> {
		let write_txn = self.db.begin_write()?;
		{
			let mut table = write_txn.open_table(FILES_TABLE)?;
			if table.get(path)?.is_none() {
				let entry = ProfileEntry { priority, is_directory: is_dir };
				let bytes = bincode::serialize(&entry).expect("serialize ProfileEntry");
				table.insert(path, bytes.as_slice())?;
			}
		}
		write_txn.commit()?;
		Ok(())
	}

	/// Insert every path in `files`/`dirs` that doesn't already exist, with
	/// priority `max(existing priorities) + 1`. Existing entries are untouched.
	pub fn add_inflated(
		&self,
		files: impl IntoIterator<Item = impl AsRef<str>>,
		dirs: impl IntoIterator<Item = impl AsRef<str>>,
	) -> Result<(), redb::Error> {
		let max = self.max_priority()?;
		let inflated = max + 1.0;
		for path in files {
			self.add(path.as_ref(), inflated, false)?;
		}
		for path in dirs {
			self.add(path.as_ref(), inflated, true)?;
		}
		Ok(())
	}

	fn max_priority(&self) -> Result<f64, redb::Error> {
		let read_txn = self.db.begin_read()?;
		let table = read_txn.open_table(FILES_TABLE)?;
		let mut max = 0.0f64;
		for row in table.iter()? {
			let (_, value) = row?;
			let entry: ProfileEntry = bincode::deserialize(value.value()).expect("deserialize ProfileEntry");
			if entry.priority > max {
				max = entry.priority;
			}
		}
		Ok(max)
	}

	pub fn remove(&self, path: &str) -> Result<(), redb::Error> {
		let write_txn = self.db.begin_write()?;
		{
			let mut table = write_txn.open_table(FILES_TABLE)?;
			table.remove(path)?;
		}
		write_txn.commit()?;
		Ok(())
	}

	pub fn remove_all<'a>(&self, paths: impl IntoIterator<Item = &'a str>) -> Result<(), redb::Error> {
		let write_txn = self.db.begin_write()?;
		{
			let mut table = write_txn.open_table(FILES_TABLE)?;
			for path in paths {
				table.remove(path)?;
			}
		}
		write_txn.commit()?;
		Ok(())
	}

	pub fn increment(&self, path: &str) -> Result<(), redb::Error> {
		let write_txn = self.db.begin_write()?;
		{
			let mut table = write_txn.open_table(FILES_TABLE)?;
			if let Some(existing) = table.get(path)?.map(|v| v.value().to_vec()) {
				let mut entry: ProfileEntry = bincode::deserialize(&existing).expect("deserialize ProfileEntry");
				entry.priority += 1.0;
				let bytes = bincode::serialize(&entry).expect("serialize ProfileEntry");
				table.insert(path, bytes.as_slice())?;
			}
		}
		write_txn.commit()?;
		Ok(())
	}

	/// Multiply every priority by `factor` (typically 0.99 for periodic decay).
	pub fn adjust_all(&self, factor: f64) -> Result<(), redb::Error> {
		let write_txn = self.db.begin_write()?;
		{
			let mut table = write_txn.open_table(FILES_TABLE)?;
			let rows: Vec<(String, ProfileEntry)> = {
				let mut rows = Vec::new();
				for row in table.iter()? {
					let (key, value) = row?;
					let entry: ProfileEntry =
						bincode::deserialize(value.value()).expect("deserialize ProfileEntry");
					rows.push((key.value().to_string(), entry));
				}
				rows
			};
			for (path, mut entry) in rows {
				entry.priority *= factor;
				let bytes = bincode::serialize(&entry).expect("serialize ProfileEntry");
				table.insert(path.as_str(), bytes.as_slice())?;
			}
		}
		write_txn.commit()?;
		Ok(())
	}

	pub fn get(&self, path: &str) -> Result<Option<ProfileEntry>, redb::Error> {
		let read_txn = self.db.begin_read()?;
		let table = read_txn.open_table(FILES_TABLE)?;
		match table.get(path)? {
			Some(value) => {
				let entry: ProfileEntry = bincode::deserialize(value.value()).expect("deserialize ProfileEntry");
				Ok(Some(entry))
			}
			None => Ok(None),
		}
	}

	/// All entries whose relative path starts with `prefix`, optionally
	/// filtered to directories (`Some(true)`) or files (`Some(false)`).
	pub fn get_tree(
		&self,
		prefix: &str,
		is_directory: Option<bool>,
	) -> Result<BTreeMap<String, ProfileEntry>, redb::Error> {
		let read_txn = self.db.begin_read()?;
		let table = read_txn.open_table(FILES_TABLE)?;
		let mut out = BTreeMap::new();
		for row in table.iter()? {
			let (key, value) = row?;
			let path = key.value().to_string();
			if !prefix.is_empty() && !crate::relpath::is_within(&path, prefix) {
				continue;
			}
			let entry: ProfileEntry = bincode::deserialize(value.value()).expect("deserialize ProfileEntry");
			if let Some(want_dir) = is_directory {
				if entry.is_directory != want_dir {
					continue;
				}
			}
			out.insert(path, entry);
		}
		Ok(out)
	}
}
