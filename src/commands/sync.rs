//! The `sync` command: load a profile's state and run the orchestrator.

use tracing::info;

use crate::error::SyncrError;
use crate::orchestrator;
use crate::profile::ProfileContext;

pub async fn sync(profiles_root: &std::path::Path, profile_name: &str) -> Result<(), SyncrError> {
	info!(profile = %profile_name, "loading profile");
	let mut ctx = ProfileContext::load(profiles_root, profile_name)?;
	orchestrator::run_sync(&mut ctx).await
}
