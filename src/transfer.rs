//! External transfer tool invocation (SPEC_FULL §10.6).
//!
//! Grounded on `connection.rs`'s `tokio::process::Command` usage and the
//! original `rsync_cmd`: file lists and exclude lists are written to temp
//! files and passed by `--files-from`/`--exclude-from`, with every relative
//! path prefixed by a leading slash so the transfer tool anchors them at its
//! source root rather than matching anywhere in the tree.

use std::io::Write;
use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::info;

use crate::error::SyncrError;

const TRANSFER_BIN: &str = "rsync";
const STDERR_TAIL_LINES: usize = 5;

/// Run the transfer tool to copy `files` (relative paths) from `src_root` to
/// `dest_root`, skipping anything in `exclude`.
///
/// On non-zero exit, returns `SyncrError::TransferFailed` carrying the last
/// few lines of stderr.
pub async fn transfer_files(
	src_root: &Path,
	dest_root: &Path,
	files: &[String],
	exclude: &[String],
) -> Result<(), SyncrError> {
	let files_from = write_temp_list(files)?;
	let exclude_from = write_temp_list(exclude)?;

	let mut command = Command::new(TRANSFER_BIN);
	command
		.arg("--archive")
		.arg("--relative")
		.arg("--info=progress2")
		.arg(format!("--exclude-from={}", exclude_from.path().display()))
		.arg(format!("--files-from={}", files_from.path().display()))
		.arg(format!("{}/", src_root.display()))
		.arg(format!("{}/", dest_root.display()))
		.stdin(Stdio::null())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped());

	run_and_check(command).await
}

async fn run_and_check(mut command: Command) -> Result<(), SyncrError> {
	let mut child = command.spawn().map_err(SyncrError::Io)?;

	// Progress lines (`--info=progress2`) stream continuously on stdout; they
	// must be drained concurrently with stderr or the OS pipe buffer fills
	// and the child blocks on write before `wait()` is ever reached.
	let stdout = child.stdout.take();
	let progress_task = tokio::spawn(async move {
		if let Some(stdout) = stdout {
			let mut lines = BufReader::new(stdout).lines();
			while let Ok(Some(line)) = lines.next_line().await {
				info!(target: "syncr::transfer", "{line}");
			}
		}
	});

	let mut stderr_buf = String::new();
	if let Some(mut stderr) = child.stderr.take() {
		stderr.read_to_string(&mut stderr_buf).await.map_err(SyncrError::Io)?;
	}

	let status = child.wait().await.map_err(SyncrError::Io)?;
	let _ = progress_task.await;
	if status.success() {
		return Ok(());
	}

	let tail: String = stderr_buf.lines().rev().take(STDERR_TAIL_LINES).collect::<Vec<_>>().into_iter().rev().fold(
		String::new(),
		|mut acc, line| {
			if !acc.is_empty() {
				acc.push('\n');
			}
			acc.push_str(line);
			acc
		},
	);

	Err(SyncrError::TransferFailed { exit_code: status.code(), stderr_tail: tail })
}

fn write_temp_list(paths: &[String]) -> Result<tempfile::NamedTempFile, SyncrError> {
	let mut file = tempfile::NamedTempFile::new().map_err(SyncrError::Io)?;
	for path in paths {
		writeln!(file, "/{path}").map_err(SyncrError::Io)?;
	}
	file.flush().map_err(SyncrError::Io)?;
	Ok(file)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn write_temp_list_prefixes_leading_slash() {
		let file = write_temp_list(&["a.txt".to_string(), "sub/b.txt".to_string()]).unwrap();
		let contents = std::fs::read_to_string(file.path()).unwrap();
		assert_eq!(contents, "/a.txt\n/sub/b.txt\n");
	}

	#[tokio::test]
	async fn transfer_failed_surfaces_nonzero_exit() {
		let mut command = Command::new("false");
		command.stdout(Stdio::piped()).stderr(Stdio::piped());
		let result = run_and_check(command).await;
		assert!(matches!(result, Err(SyncrError::TransferFailed { .. })));
	}

	#[tokio::test]
	async fn transfer_succeeds_on_zero_exit() {
		let mut command = Command::new("true");
		command.stdout(Stdio::piped()).stderr(Stdio::piped());
		let result = run_and_check(command).await;
		assert!(result.is_ok());
	}
}
