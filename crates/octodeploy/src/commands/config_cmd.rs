//! Config subcommand handlers.

use dialoguer::{Input, Password, Select};
use owo_colors::OwoColorize;

use octodeploy_config::{self as config, Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

/// Map a dialoguer failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Copy of `cfg` with every plaintext API key masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.api_key.is_some() {
            profile.api_key = Some(REDACTED.into());
        }
    }
    cfg
}

// ── Handler ──────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global),

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            output::print_output(&output::render(global.output, &redacted(&cfg))?);
            Ok(())
        }

        ConfigCommand::SetKey => {
            let cfg = config::load_config_or_default();
            let profile_name = active_profile_name(global, &cfg);
            let key = Password::new()
                .with_prompt(format!("API key for '{profile_name}'"))
                .interact()
                .map_err(prompt_err)?;
            if key.trim().is_empty() {
                return Err(CliError::Validation {
                    field: "api_key".into(),
                    reason: "API key cannot be empty".into(),
                });
            }
            config::store_api_key(&profile_name, key.trim())?;
            eprintln!("{} API key stored in system keyring for '{profile_name}'", "✓".green());
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }
    }
}

// ── Init: interactive wizard ─────────────────────────────────────────

fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = config::load_config_or_default();
    eprintln!("octodeploy configuration wizard");
    eprintln!("   Config path: {}\n", config::config_path().display());

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default(active_profile_name(global, &cfg))
        .interact_text()
        .map_err(prompt_err)?;

    let address: String = Input::new()
        .with_prompt("Octopus server URL")
        .default("https://octopus.example.com".into())
        .validate_with(|input: &String| -> Result<(), String> {
            url::Url::parse(input)
                .map(|_| ())
                .map_err(|e| format!("invalid URL: {e}"))
        })
        .interact_text()
        .map_err(prompt_err)?;

    let space_id: String = Input::new()
        .with_prompt("Default space ID (blank for the server default)")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;

    let key = Password::new()
        .with_prompt("API key")
        .interact()
        .map_err(prompt_err)?;
    if key.trim().is_empty() {
        return Err(CliError::Validation {
            field: "api_key".into(),
            reason: "API key cannot be empty".into(),
        });
    }

    let store_choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let store_selection = Select::new()
        .with_prompt("Where to store the API key?")
        .items(store_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let api_key = if store_selection == 0 {
        config::store_api_key(&profile_name, key.trim())?;
        eprintln!("   {} API key stored in system keyring", "✓".green());
        None
    } else {
        Some(key.trim().to_owned())
    };

    let profile = Profile {
        address,
        space_id: Some(space_id).filter(|s| !s.trim().is_empty()),
        api_key,
        ..Profile::default()
    };
    cfg.profiles.insert(profile_name.clone(), profile);
    if cfg.default_profile.is_none() || cfg.profiles.len() == 1 {
        cfg.default_profile = Some(profile_name.clone());
    }

    let path = config::save_config(&cfg)?;
    eprintln!("\n{} Configuration written to {}", "✓".green(), path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: octodeploy data octopusdeploy_environments -f query.json");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_masks_plaintext_keys() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "prod".into(),
            Profile {
                address: "https://octopus.example.com".into(),
                api_key: Some("API-SECRET".into()),
                ..Profile::default()
            },
        );
        cfg.profiles.insert(
            "keyring".into(),
            Profile {
                address: "https://octopus.local".into(),
                ..Profile::default()
            },
        );

        let masked = redacted(&cfg);
        assert_eq!(masked.profiles["prod"].api_key.as_deref(), Some(REDACTED));
        assert_eq!(masked.profiles["keyring"].api_key, None);
    }
}
