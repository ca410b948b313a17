//! Two-stage priority solver (spec §4.7).
//!
//! Grounded on the original `_prioritize_dirs`/`_prioritize_files`: directories
//! are chosen first, greedily by a size-adjusted priority score, under a
//! budget that assumes every tracked file starts out as a one-block symlink;
//! loose files are then packed into whatever budget remains.

use std::collections::BTreeSet;

use crate::relpath::is_within;

/// A directory candidate: its path, profile-DB priority, and total on-disk
/// size of everything in its remote subtree.
#[derive(Debug, Clone)]
pub struct DirCandidate {
	pub path: String,
	pub priority: f64,
	pub subtree_size: u64,
}

/// A file candidate: its path, profile-DB priority, and on-disk size.
#[derive(Debug, Clone)]
pub struct FileCandidate {
	pub path: String,
	pub priority: f64,
	pub size: u64,
}

fn adjusted_priority(priority: f64, size: u64, account_for_size: bool) -> f64 {
	if account_for_size {
		if size == 0 {
			0.0
		} else {
			priority / size as f64
		}
	} else {
		priority
	}
}

/// Stage 1: select directories to materialize.
///
/// `subtree_members(dir_path)` must return every descendant path (not
/// including `dir_path` itself) together with whether it is a directory,
/// drawn from the profile database's subtree for that path.
///
/// Returns the selected directory paths and the space remaining afterward.
pub fn prioritize_dirs(
	dirs: &[DirCandidate],
	subtree_members: impl Fn(&str) -> Vec<(String, bool)>,
	storage_limit: u64,
	num_tracked_files: usize,
	symlink_block: u64,
	account_for_size: bool,
) -> (BTreeSet<String>, i64) {
	let mut ordered: Vec<&DirCandidate> = dirs.iter().collect();
	ordered.sort_by(|a, b| {
		let pa = adjusted_priority(a.priority, a.subtree_size, account_for_size);
		let pb = adjusted_priority(b.priority, b.subtree_size, account_for_size);
		pb.partial_cmp(&pa).unwrap_or(std::cmp::Ordering::Equal)
	});

	let mut selected_dirs: BTreeSet<String> = BTreeSet::new();
	let mut selected_subdirs: BTreeSet<String> = BTreeSet::new();
	let mut selected_files: BTreeSet<String> = BTreeSet::new();

	let sizes: std::collections::HashMap<&str, u64> =
		dirs.iter().map(|d| (d.path.as_str(), d.subtree_size)).collect();

	let mut remaining: i64 = storage_limit as i64 - (num_tracked_files as i64 * symlink_block as i64);

	for dir in ordered {
		if selected_subdirs.contains(&dir.path) {
			continue;
		}
		if dir.subtree_size > storage_limit {
			continue;
		}

		let members = subtree_members(&dir.path);
		let mut contained_files: BTreeSet<String> = BTreeSet::new();
		let mut contained_dirs: BTreeSet<String> = BTreeSet::new();
		let mut subdirs_size: u64 = 0;
		for (subpath, is_dir) in &members {
			if *is_dir {
				contained_dirs.insert(subpath.clone());
			} else {
				contained_files.insert(subpath.clone());
			}
			if selected_dirs.contains(subpath) {
				subdirs_size += sizes.get(subpath.as_str()).copied().unwrap_or(0);
			}
		}

		let newly_materialized = contained_files.difference(&selected_files).count() as i64;
		let new_remaining =
			remaining - dir.subtree_size as i64 + subdirs_size as i64 + newly_materialized * symlink_block as i64;

		if new_remaining > 0 {
			for d in &contained_dirs {
				selected_dirs.remove(d);
			}
			selected_subdirs.extend(contained_dirs);
			selected_files.extend(contained_files);
			selected_dirs.insert(dir.path.clone());
			remaining = new_remaining;
		}
	}

	(selected_dirs, remaining)
}

/// Stage 2: pack loose files (outside any selected directory) into whatever
/// budget `prioritize_dirs` left behind.
pub fn prioritize_files(
	files: &[FileCandidate],
	selected_dirs: &BTreeSet<String>,
	space_limit: i64,
	symlink_block: u64,
	account_for_size: bool,
) -> (BTreeSet<String>, i64) {
	let mut ordered: Vec<&FileCandidate> = files
		.iter()
		.filter(|f| !selected_dirs.iter().any(|d| is_within(&f.path, d)))
		.collect();
	ordered.sort_by(|a, b| {
		let pa = adjusted_priority(a.priority, a.size, account_for_size);
		let pb = adjusted_priority(b.priority, b.size, account_for_size);
		pb.partial_cmp(&pa).unwrap_or(std::cmp::Ordering::Equal)
	});

	let mut selected = BTreeSet::new();
	let mut remaining = space_limit;
	for file in ordered {
		let new_remaining = remaining - file.size as i64 + symlink_block as i64;
		if new_remaining > 0 {
			selected.insert(file.path.clone());
			remaining = new_remaining;
		}
	}

	(selected, remaining)
}
