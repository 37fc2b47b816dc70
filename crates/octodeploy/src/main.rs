mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use secrecy::SecretString;
use tracing_subscriber::EnvFilter;

use octodeploy_config::{self as config, Profile};
use octodeploy_core::{ProviderConfig, TlsVerification};

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        if let CliError::Invalid(ref diags) = err {
            output::print_diagnostics(diags);
        }
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "octodeploy", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &cli.global).await
        }
    }
}

/// Build a `ProviderConfig` from the config file, active profile and
/// command-line overrides.
pub(crate) fn provider_config(global: &GlobalOpts) -> Result<ProviderConfig, CliError> {
    let cfg = config::load_config_or_default();

    let (name, mut profile) = match cfg.profile(global.profile.as_deref()) {
        Some((name, profile)) => (name.to_owned(), profile.clone()),
        None => {
            if let Some(ref requested) = global.profile {
                return Err(CliError::ProfileNotFound {
                    name: requested.clone(),
                    available: available_profiles(&cfg),
                });
            }
            ("default".to_owned(), Profile::default())
        }
    };

    if let Some(ref address) = global.address {
        profile.address.clone_from(address);
    }
    if profile.address.is_empty() {
        return Err(CliError::NoConfig {
            path: config::config_path().display().to_string(),
        });
    }
    if global.space.is_some() {
        profile.space_id.clone_from(&global.space);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }

    let api_key = global.api_key.clone().map(SecretString::from);
    let mut provider = config::profile_to_provider_config(&profile, &name, &cfg.defaults, api_key)?;
    if global.insecure {
        provider.tls = TlsVerification::DangerAcceptInvalid;
    }
    tracing::debug!(
        profile = %name,
        address = %provider.address,
        timeout = ?provider.timeout,
        "resolved provider config"
    );
    Ok(provider)
}

fn available_profiles(cfg: &config::Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}
