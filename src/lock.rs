//! Per-profile advisory lock (spec §5).
//!
//! A PID-file dropped in the profile directory, removed on drop or on
//! receipt of SIGTERM/SIGINT so that an interrupted sync doesn't leave the
//! profile permanently locked. Mutual exclusion is per-profile only: two
//! different profiles may hold their own locks concurrently.

use std::path;
use std::sync::OnceLock;

use tracing::{debug, info, warn};

static LOCK_FILE_PATH: OnceLock<std::sync::Mutex<Option<path::PathBuf>>> = OnceLock::new();

const LOCK_FILE_NAME: &str = ".syncr-lock";

/// Held for the duration of a sync (or any other state-mutating command)
/// against a single profile.
pub struct ProfileLock {
	path: path::PathBuf,
}

impl ProfileLock {
	/// Acquire the lock for the profile directory `profile_dir`.
	///
	/// Returns an error with a message describing "another operation is
	/// already taking place" if the lock file already exists.
	pub fn acquire(profile_dir: &path::Path) -> Result<Self, crate::error::SyncrError> {
		let lock_path = profile_dir.join(LOCK_FILE_NAME);

		if lock_path.exists() {
			return Err(crate::error::SyncrError::Status(
				"another operation is already taking place for this profile".to_string(),
			));
		}

		let pid = std::process::id();
		std::fs::write(&lock_path, pid.to_string())?;

		let storage = LOCK_FILE_PATH.get_or_init(|| std::sync::Mutex::new(None));
		if let Ok(mut guard) = storage.lock() {
			*guard = Some(lock_path.clone());
		}

		Ok(ProfileLock { path: lock_path })
	}

	fn remove_now(&self) {
		let _ = std::fs::remove_file(&self.path);
		if let Some(storage) = LOCK_FILE_PATH.get() {
			if let Ok(mut guard) = storage.lock() {
				*guard = None;
			}
		}
	}
}

impl Drop for ProfileLock {
	fn drop(&mut self) {
		self.remove_now();
	}
}

/// Install SIGTERM/SIGINT handlers that remove the active lock file before
/// the process exits. Forwards the signal semantics of §5's cancellation
/// model: a SIGINT between phases must still release the lock.
pub fn install_signal_handlers() {
	tokio::spawn(async {
		use tokio::signal;

		let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(stream) => stream,
			Err(e) => {
				warn!("failed to install SIGTERM handler: {}", e);
				return;
			}
		};
		let mut sigint = match signal::unix::signal(signal::unix::SignalKind::interrupt()) {
			Ok(stream) => stream,
			Err(e) => {
				warn!("failed to install SIGINT handler: {}", e);
				return;
			}
		};

		tokio::select! {
			_ = sigterm.recv() => {
				debug!("received SIGTERM, releasing profile lock");
				cleanup_lock_file();
				std::process::exit(130);
			}
			_ = sigint.recv() => {
				debug!("received SIGINT, releasing profile lock");
				cleanup_lock_file();
				std::process::exit(130);
			}
		}
	});
}

fn cleanup_lock_file() {
	if let Some(storage) = LOCK_FILE_PATH.get() {
		if let Ok(guard) = storage.lock() {
			if let Some(path) = guard.as_ref() {
				let _ = std::fs::remove_file(path);
				info!("released profile lock {} on signal", path.display());
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	#[test]
	fn acquire_writes_pid_and_removes_on_drop() {
		let tmp = TempDir::new().unwrap();
		let lock_path = tmp.path().join(LOCK_FILE_NAME);
		{
			let lock = ProfileLock::acquire(tmp.path()).unwrap();
			assert!(lock.path.exists());
			let content = fs::read_to_string(&lock.path).unwrap();
			assert_eq!(content, std::process::id().to_string());
		}
		assert!(!lock_path.exists());
	}

	#[test]
	fn second_acquire_fails_while_held() {
		let tmp = TempDir::new().unwrap();
		let _lock = ProfileLock::acquire(tmp.path()).unwrap();
		let result = ProfileLock::acquire(tmp.path());
		assert!(result.is_err());
	}

	#[test]
	fn acquire_succeeds_again_after_release() {
		let tmp = TempDir::new().unwrap();
		{
			let _lock = ProfileLock::acquire(tmp.path()).unwrap();
		}
		assert!(ProfileLock::acquire(tmp.path()).is_ok());
	}
}
