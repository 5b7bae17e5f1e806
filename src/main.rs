use std::{path::PathBuf, process::ExitCode, sync::Mutex};

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use tasks2subissues::{ConfigError, ConvertError, Report, Settings, convert, create_client};
use tracing_subscriber::EnvFilter;

const TRACE_FILE_ENV: &str = "TASKS2SUBISSUES_TRACE_FILE";

/// Convert the task list of a GitHub issue into sub-issues.
///
/// Tasks referencing issues of another owner are linked through placeholder issues
/// created in `--refrepo`. Converted lines are removed from the issue body, unless
/// some task failed, in which case the body is left exactly as it was.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
	/// GitHub token with write access to the target (and reference) repo
	#[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
	token: Option<String>,
	/// HTML URL of the issue holding the task list
	#[arg(long = "issueurl", value_name = "URL")]
	issue_url: String,
	/// HTML URL of a repo under the target's owner, for placeholders of other owners' issues
	#[arg(long = "refrepo", value_name = "URL")]
	ref_repo: Option<String>,
	/// Pause between sub-issue link calls
	#[arg(long, value_name = "MS")]
	link_delay_ms: Option<u64>,
	#[arg(long, value_name = "URL")]
	api_url: Option<String>,
	/// TOML settings file
	#[arg(long, env = "TASKS2SUBISSUES_CONFIG", value_name = "PATH")]
	config: Option<PathBuf>,
}

impl Cli {
	/// Settings file and environment, overridden by whatever was passed on the command line.
	fn settings(&self) -> Result<Settings, ConfigError> {
		let mut settings = Settings::load(self.config.as_deref())?;
		if let Some(token) = &self.token {
			settings.token = Some(token.clone());
		}
		if let Some(ref_repo) = &self.ref_repo {
			settings.ref_repo = Some(ref_repo.clone());
		}
		if let Some(delay) = self.link_delay_ms {
			settings.link_delay_ms = delay;
		}
		if let Some(api_url) = &self.api_url {
			settings.api_url = api_url.clone();
		}
		Ok(settings)
	}
}

fn log_filter() -> EnvFilter {
	EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(option_env!("LOG_DIRECTIVES").unwrap_or("info")))
}

fn init_tracing() -> Result<()> {
	let initialized = match std::env::var_os(TRACE_FILE_ENV) {
		Some(path) => {
			let path = PathBuf::from(path);
			let file = std::fs::File::create(&path).wrap_err_with(|| format!("failed to create trace file {}", path.display()))?;
			tracing_subscriber::fmt().json().with_env_filter(log_filter()).with_writer(Mutex::new(file)).try_init()
		}
		None => tracing_subscriber::fmt().with_env_filter(log_filter()).with_writer(std::io::stderr).try_init(),
	};
	initialized.map_err(|e| eyre!(e))
}

async fn run(cli: &Cli) -> Result<Report, ConvertError> {
	let settings = cli.settings()?;
	let token = settings.token()?;
	let config = settings.run_config(&cli.issue_url)?;
	tracing::debug!(?config, api_url = %settings.api_url, "settings resolved");

	let client = create_client(token, &settings.api_url).map_err(ConvertError::Client)?;
	convert(client.as_ref(), &config).await
}

#[tokio::main]
async fn main() -> ExitCode {
	let cli = Cli::parse();

	if let Err(e) = color_eyre::install().and_then(|()| init_tracing()) {
		eprintln!("Error: {e:?}");
		return ExitCode::from(2);
	}

	match run(&cli).await {
		Ok(report) => {
			println!("{report}");
			if report.is_success() { ExitCode::SUCCESS } else { ExitCode::from(1) }
		}
		Err(ConvertError::Config(e)) => {
			eprintln!("{:?}", miette::Report::new(e));
			ExitCode::from(2)
		}
		Err(e) => {
			eprintln!("Error: {:?}", color_eyre::Report::new(e));
			ExitCode::from(2)
		}
	}
}
