//! Sync orchestrator: the fixed 18-phase sequence described in spec §4.8.
//!
//! Grounded on the original `sync` command's `main` method. Phase numbers in
//! comments below refer to the spec's numbered list so the mapping from
//! requirement to code stays explicit.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use crate::conflict_resolve::resolve_conflicts;
use crate::deletion::{compute_deleted, rm_local_files, rm_remote_files, trash_files, TrashDirs};
use crate::error::SyncrError;
use crate::exclude::ExcludeEngine;
use crate::lock::ProfileLock;
use crate::priority::{prioritize_dirs, prioritize_files, DirCandidate, FileCandidate};
use crate::profile::ProfileContext;
use crate::relpath::is_within;
use crate::remote_db::RemoteDatabase;
use crate::transfer::transfer_files;
use crate::tree::{EnumerateFilter, SyncTree};

const REMOTE_METADATA_DIR: &str = ".retain-sync";
const REMOTE_DB_FILE: &str = "remote.db";
const REMOTE_EXCLUDE_DIR: &str = "exclude";

fn now_utc() -> i64 {
	SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before epoch").as_secs() as i64
}

/// Run a full sync for the given profile. Acquires and releases the
/// per-profile lock for the duration of the run.
pub async fn run_sync(ctx: &mut ProfileContext) -> Result<(), SyncrError> {
	// Phase 1: lock profile; metadata/exclude/DBs are already loaded onto `ctx`.
	let _lock = ProfileLock::acquire(&ctx.profile_dir)?;
	debug!(profile = %ctx.name, "acquired profile lock");

	let local_root = ctx.config.local_dir.clone();
	let remote_root = ctx.mount_dir();
	let remote_meta_dir = remote_root.join(REMOTE_METADATA_DIR);
	let remote_exclude_dir = remote_meta_dir.join(REMOTE_EXCLUDE_DIR);

	// Mount/unmount of RemoteHost:RemoteDir onto `mnt/` is an external
	// collaborator's job (spec'd out of scope); `remote_host`/`remote_dir` are
	// only used here to report what we assume is already mounted there.
	debug!(
		profile = %ctx.name,
		remote_host = ?ctx.config.remote_host,
		remote_dir = %ctx.config.remote_dir.display(),
		mount_point = %remote_root.display(),
		"treating mount point as the live remote tree",
	);

	// Phase 2: publish this client's exclude file under the remote's metadata dir.
	fs::create_dir_all(&remote_exclude_dir)
		.map_err(|e| SyncrError::Server(format!("remote directory is unreachable: {e}")))?;
	let local_exclude_path = ctx.profile_dir.join("exclude");
	let remote_exclude_slot = remote_exclude_dir.join(&ctx.metadata.id);
	if local_exclude_path.exists() {
		fs::copy(&local_exclude_path, &remote_exclude_slot)
			.map_err(|e| SyncrError::Server(format!("remote directory is unreachable: {e}")))?;
	}

	let remote_db = RemoteDatabase::open(&remote_meta_dir.join(REMOTE_DB_FILE))?;

	// Phase 3: expand exclude globs against the local root.
	ctx.exclude.glob(&local_root);

	// Phase 4: snapshot both trees.
	let local_tree = SyncTree::new(&local_root);
	let remote_tree = SyncTree::new(&remote_root);
	let local_entries = local_tree.enumerate(EnumerateFilter::all(), &ctx.exclude.rel_files)?;
	let remote_entries = remote_tree.enumerate(EnumerateFilter::all(), &HashSet::new())?;

	let local_dirs: BTreeSet<String> = local_entries.iter().filter(|(_, s)| s.is_dir).map(|(p, _)| p.clone()).collect();
	let remote_dirs: BTreeSet<String> =
		remote_entries.iter().filter(|(_, s)| s.is_dir).map(|(p, _)| p.clone()).collect();
	let local_files: BTreeSet<String> = local_entries
		.iter()
		.filter(|(_, s)| !s.is_dir && !s.is_symlink)
		.map(|(p, _)| p.clone())
		.collect();
	let remote_files: BTreeSet<String> =
		remote_entries.iter().filter(|(_, s)| !s.is_dir).map(|(p, _)| p.clone()).collect();
	let local_non_symlinks: BTreeSet<String> =
		local_entries.iter().filter(|(_, s)| !s.is_symlink).map(|(p, _)| p.clone()).collect();

	let local_paths: BTreeSet<String> = local_entries.keys().cloned().collect();
	let remote_paths: BTreeSet<String> = remote_entries.keys().cloned().collect();
	let all_dirs: BTreeSet<String> = local_dirs.union(&remote_dirs).cloned().collect();
	let all_files: BTreeSet<String> = local_files.union(&remote_files).cloned().collect();
	let all_paths: BTreeSet<String> = local_paths.union(&remote_paths).cloned().collect();

	// Phase 5: drop remote-DB trash entries whose file is actually gone.
	let deleted_trash: BTreeSet<String> =
		remote_db.get_tree("", None, Some(true), None)?.keys().filter(|p| !remote_paths.contains(*p)).cloned().collect();
	remote_db.remove_all(deleted_trash.iter().map(|s| s.as_str()))?;

	// Phase 6: compute added-since-last-sync paths.
	let known: BTreeSet<String> = ctx.db.get_tree("", None)?.keys().cloned().collect();
	let remote_known: BTreeSet<String> = remote_db.get_tree("", None, None, None)?.keys().cloned().collect();
	let added_local: BTreeSet<String> = local_non_symlinks.difference(&known).cloned().collect();
	let added_remote: BTreeSet<String> = remote_paths.difference(&remote_known).cloned().collect();

	// Phase 7: compute and execute deletions.
	let trash_dirs = TrashDirs::new(ctx.config.trash_dirs.clone());
	let deleted = compute_deleted(
		&known,
		&local_paths,
		&remote_paths,
		&remote_root,
		|p| remote_dirs.contains(p),
		ctx.config.delete_always,
		&trash_dirs,
	);
	rm_local_files(deleted.local.iter().map(|s| s.as_str()), &local_root, &ctx.db, &remote_db)?;
	rm_remote_files(deleted.remote_hard.iter().map(|s| s.as_str()), &remote_root, &ctx.db, &remote_db)
		.map_err(|_| SyncrError::Server("the connection to the remote directory was lost".to_string()))?;
	trash_files(deleted.remote_trash.iter().map(|s| s.as_str()), &remote_root, |p| remote_dirs.contains(p), &ctx.db, &remote_db)
		.map_err(|_| SyncrError::Server("the connection to the remote directory was lost".to_string()))?;

	// Phase 8: compute modified-since-last-sync paths.
	let last_sync = ctx.metadata.last_sync_utc.unwrap_or(0);
	let modified_local: BTreeSet<String> =
		local_files.iter().filter(|p| local_entries[*p].mtime as i64 > last_sync && known.contains(*p)).cloned().collect();
	let mut modified_remote: BTreeSet<String> = remote_files
		.iter()
		.filter(|p| remote_entries[*p].mtime as i64 > last_sync && remote_known.contains(*p))
		.cloned()
		.collect();
	modified_remote.extend(
		remote_db.get_tree("", Some(false), Some(false), Some(last_sync))?.into_keys(),
	);

	// Phase 9: resolve conflicts, then merge into the updated sets.
	let local_changed: BTreeSet<String> = modified_local.union(&added_local).cloned().collect();
	let remote_changed: BTreeSet<String> = modified_remote.union(&added_remote).cloned().collect();
	let conflicts: Vec<String> = local_changed.intersection(&remote_changed).cloned().collect();

	let resolution = resolve_conflicts(
		conflicts.iter().map(|s| s.as_str()),
		&local_entries,
		&remote_entries,
		&local_root,
		&remote_root,
	)?;

	ctx.db.remove_all(
		resolution
			.local_renamed
			.keys()
			.chain(resolution.remote_renamed.keys())
			.map(|s| s.as_str()),
	)?;
	remote_db.remove_all(resolution.remote_renamed.keys().map(|s| s.as_str()))?;
	for new_path in resolution.remote_renamed.values() {
		remote_db.add(new_path, now_utc(), false)?;
	}

	let mut updated_local: BTreeSet<String> = local_changed.iter().filter(|p| !resolution.local_renamed.contains_key(*p)).cloned().collect();
	updated_local.extend(resolution.local_renamed.values().cloned());
	let mut updated_remote: BTreeSet<String> = remote_changed.iter().filter(|p| !resolution.remote_renamed.contains_key(*p)).cloned().collect();
	updated_remote.extend(resolution.remote_renamed.values().cloned());
	let updated_all: BTreeSet<String> = updated_local.union(&updated_remote).cloned().collect();

	// Phase 10: push local changes to the remote.
	let push_list: Vec<String> = updated_local.iter().cloned().collect();
	if !push_list.is_empty() {
		transfer_files(&local_root, &remote_root, &push_list, &[])
			.await
			.map_err(|_| SyncrError::Server("the connection to the remote directory was lost".to_string()))?;
	}
	let synctime = now_utc();
	for path in &updated_local {
		if remote_db.get(path)?.is_some() {
			remote_db.update_synctime(path, synctime)?;
		} else {
			remote_db.add(path, synctime, all_dirs.contains(path))?;
		}
	}

	// Phase 11: lay down symlinks for new-from-remote content before touching the profile DB.
	let new_from_remote_files: HashSet<String> = updated_remote.difference(&all_dirs).cloned().collect();
	let new_from_remote_dirs: HashSet<String> = updated_remote.difference(&all_files).cloned().collect();
	let already_deleted = remote_db.get_tree("", None, Some(true), None)?.into_keys().collect::<HashSet<_>>();
	remote_tree
		.symlink_tree(&local_root, &new_from_remote_files, &new_from_remote_dirs, &already_deleted)
		.map_err(|_| SyncrError::Server("the connection to the remote directory was lost".to_string()))?;

	// Phase 12: add resolved paths to the profile DB.
	let new_files: Vec<String> = updated_all.difference(&all_dirs).cloned().collect();
	let new_dirs: Vec<String> = updated_all.difference(&all_files).cloned().collect();
	if ctx.config.inflate_priority {
		ctx.db.add_inflated(new_files.iter().map(|s| s.as_str()), new_dirs.iter().map(|s| s.as_str()))?;
	} else {
		for path in &new_files {
			ctx.db.add(path, 0.0, false)?;
		}
		for path in &new_dirs {
			ctx.db.add(path, 0.0, true)?;
		}
	}

	// Phase 13: which excluded files are still physically present remotely.
	let remote_excluded: BTreeSet<String> =
		ctx.exclude.rel_files.iter().filter(|p| all_paths.contains(p.as_str())).cloned().collect();

	// Phase 14: priority solver.
	let symlink_block = local_tree.block_size()?;
	let dir_entries = ctx.db.get_tree("", Some(true))?;
	let file_entries = ctx.db.get_tree("", Some(false))?;

	let dir_candidates: Vec<DirCandidate> = dir_entries
		.iter()
		.map(|(path, entry)| {
			let subtree_size: u64 = remote_entries
				.iter()
				.filter(|(p, s)| !s.is_dir && is_within(p, path))
				.map(|(_, s)| s.size_on_disk)
				.sum();
			DirCandidate { path: path.clone(), priority: entry.priority, subtree_size }
		})
		.collect();
	let file_candidates: Vec<FileCandidate> = file_entries
		.iter()
		.filter(|(path, _)| !ctx.exclude.rel_files.contains(*path))
		.map(|(path, entry)| {
			let size = remote_entries.get(path).map(|s| s.size_on_disk).unwrap_or(0);
			FileCandidate { path: path.clone(), priority: entry.priority, size }
		})
		.collect();

	let db_tree = ctx.db.get_tree("", None)?;
	let subtree_members = |dir_path: &str| -> Vec<(String, bool)> {
		db_tree
			.iter()
			.filter(|(p, _)| p.as_str() != dir_path && is_within(p, dir_path))
			.map(|(p, e)| (p.clone(), e.is_directory))
			.collect()
	};

	let (selected_dirs, remaining) = prioritize_dirs(
		&dir_candidates,
		subtree_members,
		ctx.config.storage_limit_bytes,
		file_entries.len(),
		symlink_block,
		ctx.config.account_for_size,
	);
	let selected_files = if ctx.config.sync_extra_files {
		prioritize_files(&file_candidates, &selected_dirs, remaining, symlink_block, ctx.config.account_for_size).0
	} else {
		BTreeSet::new()
	};

	// Phase 15: materialize the selected set, symlink the rest.
	let materialize: BTreeSet<String> =
		selected_dirs.union(&selected_files).cloned().collect::<BTreeSet<_>>().union(&remote_excluded).cloned().collect();
	update_local(ctx, &remote_tree, &remote_root, &local_root, &materialize, &all_paths).await?;

	// Phase 16: prune excluded files every client has opted out of.
	rm_excluded_files(&remote_excluded, &remote_exclude_dir, &local_root, &remote_root, &ctx.db, &remote_db)?;

	// Phase 17: fsync-equivalent durability barrier.
	sync_filesystem();

	// Phase 18: write last_sync and release the lock.
	ctx.metadata.last_sync_utc = Some(now_utc());
	ctx.save_metadata()?;
	info!(profile = %ctx.name, "sync complete");

	Ok(())
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn sync_filesystem() {
	unsafe {
		libc::sync();
	}
}

#[cfg(not(unix))]
fn sync_filesystem() {}

/// Phases 14-15 helper: copy `materialize` from the remote into the local
/// tree via the transfer tool, then overlay symlinks for everything else.
async fn update_local(
	ctx: &ProfileContext,
	remote_tree: &SyncTree,
	remote_root: &Path,
	local_root: &Path,
	materialize: &BTreeSet<String>,
	all_paths: &BTreeSet<String>,
) -> Result<(), SyncrError> {
	let db_tree = ctx.db.get_tree("", None)?;
	let mut expand = BTreeSet::new();
	for path in materialize {
		expand.insert(path.clone());
		for (sub, _) in db_tree.iter().filter(|(p, _)| is_within(p, path)) {
			expand.insert(sub.clone());
		}
	}

	let to_materialize: Vec<String> = expand
		.iter()
		.filter(|p| !db_tree.get(*p).map(|e| e.is_directory).unwrap_or(false))
		.cloned()
		.collect();
	if !to_materialize.is_empty() {
		transfer_files(remote_root, local_root, &to_materialize, &[])
			.await
			.map_err(|_| SyncrError::Server("the connection to the remote directory was lost".to_string()))?;
	}

	let symlink_files: HashSet<String> = all_paths
		.iter()
		.filter(|p| !expand.contains(*p) && !db_tree.get(*p).map(|e| e.is_directory).unwrap_or(false))
		.cloned()
		.collect();
	let symlink_dirs: HashSet<String> = all_paths
		.iter()
		.filter(|p| !expand.contains(*p) && db_tree.get(*p).map(|e| e.is_directory).unwrap_or(false))
		.cloned()
		.collect();

	remote_tree.symlink_tree(local_root, &symlink_files, &symlink_dirs, &HashSet::new())?;
	Ok(())
}

/// Phase 16: remove remote-excluded paths only if *every* client's exclude
/// pattern file also excludes them.
fn rm_excluded_files(
	candidates: &BTreeSet<String>,
	remote_exclude_dir: &Path,
	local_root: &Path,
	remote_root: &Path,
	local_db: &crate::profile_db::ProfileDatabase,
	remote_db: &RemoteDatabase,
) -> Result<(), SyncrError> {
	if candidates.is_empty() || !remote_exclude_dir.is_dir() {
		return Ok(());
	}

	let mut per_client_rel_files: Vec<HashSet<String>> = Vec::new();
	for entry in fs::read_dir(remote_exclude_dir)? {
		let entry = entry?;
		let mut engine = ExcludeEngine::load(&entry.path())?;
		engine.glob(local_root);
		per_client_rel_files.push(engine.rel_files);
	}

	let to_remove: BTreeSet<&String> = candidates
		.iter()
		.filter(|path| per_client_rel_files.iter().all(|set| set.contains(path.as_str())))
		.collect();

	rm_remote_files(to_remove.into_iter().map(|s| s.as_str()), remote_root, local_db, remote_db)
		.map_err(|_| SyncrError::Server("the connection to the remote directory was lost".to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn now_utc_is_positive() {
		assert!(now_utc() > 0);
	}
}
