//! Remote database: last-sync timestamps and trash state for the remote mirror.
//!
//! Same `redb` table-per-concern shape as [`crate::profile_db`], adapted from
//! the original `DestDBFile`'s `path`/`lastsync`/`deleted` columns.

use std::collections::BTreeMap;
use std::path::Path;

use redb::{ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

const FILES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("files");

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RemoteEntry {
	pub last_sync_seconds_utc: i64,
	pub is_directory: bool,
	pub deleted: bool,
}

pub struct RemoteDatabase {
	db: redb::Database,
}

impl RemoteDatabase {
	pub fn open(db_path: &Path) -> Result<Self, redb::Error> {
		let db = redb::Database::create(db_path)?;
		{
			let write_txn = db.begin_write()?;
			let _ = write_txn.open_table(FILES_TABLE)?;
			write_txn.commit()?;
		}
		Ok(RemoteDatabase { db })
	}

	/// Insert `path` if it doesn't already exist. No-op otherwise, matching
	/// `ProfileDatabase::add`'s composite insert semantics.
	pub fn add(&self, path: &str, last_sync_seconds_utc: i64, is_dir: bool) -> Result<(), redb::Error> {
		let write_txn = self.db.begin_write()?;
		{
			let mut table = write_txn.open_table(FILES_TABLE)?;
			if table.get(path)?.is_none() {
				let entry = RemoteEntry { last_sync_seconds_utc, is_directory: is_dir, deleted: false };
				let bytes = bincode::serialize(&entry).expect("serialize RemoteEntry");
				table.insert(path, bytes.as_slice())?;
			}
		}
		write_txn.commit()?;
		Ok(())
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

	/// Mark `path` as deleted (awaiting trash) without removing its row, so
	/// the next sync knows not to re-pull it.
	pub fn set_deleted(&self, path: &str, deleted: bool) -> Result<(), redb::Error> {
		let write_txn = self.db.begin_write()?;
		{
			let mut table = write_txn.open_table(FILES_TABLE)?;
			if let Some(existing) = table.get(path)?.map(|v| v.value().to_vec()) {
				let mut entry: RemoteEntry = bincode::deserialize(&existing).expect("deserialize RemoteEntry");
				entry.deleted = deleted;
				let bytes = bincode::serialize(&entry).expect("serialize RemoteEntry");
				table.insert(path, bytes.as_slice())?;
			}
		}
		write_txn.commit()?;
		Ok(())
	}

	pub fn update_synctime(&self, path: &str, last_sync_seconds_utc: i64) -> Result<(), redb::Error> {
		let write_txn = self.db.begin_write()?;
		{
			let mut table = write_txn.open_table(FILES_TABLE)?;
			if let Some(existing) = table.get(path)?.map(|v| v.value().to_vec()) {
				let mut entry: RemoteEntry = bincode::deserialize(&existing).expect("deserialize RemoteEntry");
				entry.last_sync_seconds_utc = last_sync_seconds_utc;
				let bytes = bincode::serialize(&entry).expect("serialize RemoteEntry");
				table.insert(path, bytes.as_slice())?;
			}
		}
		write_txn.commit()?;
		Ok(())
	}

	pub fn get(&self, path: &str) -> Result<Option<RemoteEntry>, redb::Error> {
		let read_txn = self.db.begin_read()?;
		let table = read_txn.open_table(FILES_TABLE)?;
		match table.get(path)? {
			Some(value) => {
				let entry: RemoteEntry = bincode::deserialize(value.value()).expect("deserialize RemoteEntry");
				Ok(Some(entry))
			}
			None => Ok(None),
		}
	}

	/// All entries under `prefix`, optionally filtered by directory-ness and
	/// deleted-ness, and (if given) only those synced at or after `min_lastsync`.
	pub fn get_tree(
		&self,
		prefix: &str,
		directory: Option<bool>,
		deleted: Option<bool>,
		min_lastsync: Option<i64>,
	) -> Result<BTreeMap<String, RemoteEntry>, redb::Error> {
		let read_txn = self.db.begin_read()?;
		let table = read_txn.open_table(FILES_TABLE)?;
		let mut out = BTreeMap::new();
		for row in table.iter()? {
			let (key, value) = row?;
			let path = key.value().to_string();
			if !prefix.is_empty() && !crate::relpath::is_within(&path, prefix) {
				continue;
			}
			let entry: RemoteEntry = bincode::deserialize(value.value()).expect("deserialize RemoteEntry");
			if let Some(want_dir) = directory {
				if entry.is_directory != want_dir {
					continue;
				}
			}
			if let Some(want_deleted) = deleted {
				if entry.deleted != want_deleted {
					continue;
				}
			}
			if let Some(min) = min_lastsync {
				if entry.last_sync_seconds_utc < min {
					continue;
				}
			}
			out.insert(path, entry);
		}
		Ok(out)
	}
}
