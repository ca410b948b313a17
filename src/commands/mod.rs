//! Subcommand implementations (SPEC_FULL §10.4).
//!
//! `sync` and `empty_trash` are grounded on the original `SyncCommand` /
//! `EmptyTrashCommand`; `init`/`reset`/`list_profiles` are intentionally
//! thin per §1's scope note — they satisfy the directory layout from §6
//! without reimplementing interactive setup.

mod empty_trash;
mod init;
mod list_profiles;
mod reset;
mod sync;

pub use empty_trash::empty_trash;
pub use init::init;
pub use list_profiles::list_profiles;
pub use reset::reset;
pub use sync::sync;

use std::env;
use std::path::PathBuf;

/// The per-user directory holding all profile subdirectories
/// (`~/.syncr/profiles`, following the teacher's `init_syncr_dir`).
pub fn profiles_root() -> std::io::Result<PathBuf> {
	let home = env::var("HOME")
		.map_err(|_| std::io::Error::new(std::io::ErrorKind::NotFound, "HOME is not set"))?;
	let root = PathBuf::from(home).join(".syncr").join("profiles");
	std::fs::create_dir_all(&root)?;
	Ok(root)
}
