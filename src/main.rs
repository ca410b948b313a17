use clap::{Parser, Subcommand};

use syncr::commands;
use syncr::error::SyncrError;
use syncr::lock;
use syncr::logging;

#[derive(Parser)]
#[command(name = "syncr", version, about = "Selective two-way directory synchronizer")]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Create or finish setting up a profile.
	Init { profile: String },
	/// Synchronize a profile's local and remote directories.
	Sync { profile: String },
	/// Clear a profile's local sync state.
	Reset { profile: String },
	/// List known profiles.
	ListProfiles,
	/// Permanently delete files the remote has marked for deletion.
	EmptyTrash { profile: String },
}

#[tokio::main]
async fn main() {
	logging::init_tracing();
	lock::install_signal_handlers();

	if let Err(e) = run().await {
		eprintln!("Error: {e}");
		if let SyncrError::Status(message) = &e {
			if message.contains("partially initialized") {
				eprintln!("Run `syncr init <profile>` again once `config` and `exclude` are filled in.");
			}
		}
		std::process::exit(1);
	}
}

async fn run() -> Result<(), SyncrError> {
	let cli = Cli::parse();
	let profiles_root = commands::profiles_root()?;

	match cli.command {
		Commands::Init { profile } => commands::init(&profiles_root, &profile),
		Commands::Sync { profile } => commands::sync(&profiles_root, &profile).await,
		Commands::Reset { profile } => commands::reset(&profiles_root, &profile),
		Commands::ListProfiles => {
			for name in commands::list_profiles(&profiles_root)? {
				println!("{name}");
			}
			Ok(())
		}
		Commands::EmptyTrash { profile } => {
			let ctx = syncr::profile::ProfileContext::load(&profiles_root, &profile)?;
			let count = commands::empty_trash(&ctx)?;
			println!("{count} files deleted");
			Ok(())
		}
	}
}

// vim: ts=4
