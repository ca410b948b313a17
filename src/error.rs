//! Error types for syncr operations.
//!
//! Flat enum matching the taxonomy each fatal error class maps to on the
//! command line: a single `Error:`-prefixed line on stderr, exit 1.

use std::error::Error;
use std::fmt;
use std::io;

#[derive(Debug)]
pub enum SyncrError {
	/// User-supplied argument doesn't identify a profile, or a config value
	/// is invalid.
	Input(String),

	/// Profile is already locked, or is in `partial` status.
	Status(String),

	/// The remote directory became unreachable mid-operation.
	Server(String),

	/// Non-zero exit from the external transfer tool. Carries the last few
	/// lines of its stderr.
	TransferFailed { exit_code: Option<i32>, stderr_tail: String },

	Io(io::Error),
	Db(redb::Error),
	Json(serde_json::Error),
}

impl fmt::Display for SyncrError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncrError::Input(message) => write!(f, "{}", message),
			SyncrError::Status(message) => write!(f, "{}", message),
			SyncrError::Server(message) => write!(f, "{}", message),
			SyncrError::TransferFailed { exit_code, stderr_tail } => {
				write!(f, "transfer tool failed")?;
				if let Some(code) = exit_code {
					write!(f, " (exit code {})", code)?;
				}
				write!(f, ":\n{}", indent(stderr_tail))
			}
			SyncrError::Io(e) => write!(f, "{}", e),
			SyncrError::Db(e) => write!(f, "{}", e),
			SyncrError::Json(e) => write!(f, "{}", e),
		}
	}
}

fn indent(text: &str) -> String {
	text.lines().map(|line| format!("    {}", line)).collect::<Vec<_>>().join("\n")
}

impl Error for SyncrError {}

impl From<io::Error> for SyncrError {
	fn from(e: io::Error) -> Self {
		SyncrError::Io(e)
	}
}

impl From<redb::Error> for SyncrError {
	fn from(e: redb::Error) -> Self {
		SyncrError::Db(e)
	}
}

impl From<redb::TransactionError> for SyncrError {
	fn from(e: redb::TransactionError) -> Self {
		SyncrError::Db(e.into())
	}
}

impl From<redb::TableError> for SyncrError {
	fn from(e: redb::TableError) -> Self {
		SyncrError::Db(e.into())
	}
}

impl From<redb::StorageError> for SyncrError {
	fn from(e: redb::StorageError) -> Self {
		SyncrError::Db(e.into())
	}
}

impl From<redb::CommitError> for SyncrError {
	fn from(e: redb::CommitError) -> Self {
		SyncrError::Db(e.into())
	}
}

impl From<serde_json::Error> for SyncrError {
	fn from(e: serde_json::Error) -> Self {
		SyncrError::Json(e)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn transfer_failed_indents_stderr_tail() {
		let err = SyncrError::TransferFailed { exit_code: Some(23), stderr_tail: "line one\nline two".to_string() };
		let message = err.to_string();
		assert!(message.contains("exit code 23"));
		assert!(message.contains("    line one"));
		assert!(message.contains("    line two"));
	}

	#[test]
	fn status_and_input_display_their_message_verbatim() {
		assert_eq!(SyncrError::Input("bad profile".to_string()).to_string(), "bad profile");
		assert_eq!(SyncrError::Status("already locked".to_string()).to_string(), "already locked");
	}
}
