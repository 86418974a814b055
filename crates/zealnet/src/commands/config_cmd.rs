//! Config subcommand handlers.

use dialoguer::{Confirm, Input, Select};

use zealnet_config::{BackoffKind, Config, Profile, config_path, load_config_or_default, save_config};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        ConfigCommand::Show => {
            let cfg = zealnet_config::load_config()?;
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("<unprintable: {e}>")),
                |c| c.active_profile_name(global.profile.as_deref()),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config_path().display().to_string(), false);
            Ok(())
        }
    }
}

// ── Init: interactive wizard ────────────────────────────────────────

fn init() -> Result<(), CliError> {
    let path = config_path();
    eprintln!("ZealNet configuration wizard");
    eprintln!("   Config path: {}\n", path.display());

    let mut cfg: Config = load_config_or_default();

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    if cfg.profiles.contains_key(&profile_name)
        && !Confirm::new()
            .with_prompt(format!("Profile '{profile_name}' exists. Overwrite?"))
            .default(false)
            .interact()
            .map_err(prompt_err)?
    {
        return Ok(());
    }

    let api_url: String = Input::new()
        .with_prompt("Portal API URL")
        .default("http://192.168.88.1:3000".into())
        .validate_with(|input: &String| -> Result<(), String> {
            match url::Url::parse(input) {
                Ok(u) if matches!(u.scheme(), "http" | "https") => Ok(()),
                Ok(u) => Err(format!("expected http or https, got '{}'", u.scheme())),
                Err(e) => Err(e.to_string()),
            }
        })
        .interact_text()
        .map_err(prompt_err)?;

    let backoff_choices = &["Fixed delay", "Exponential backoff"];
    let backoff = Select::new()
        .with_prompt("Socket reconnection")
        .items(backoff_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let insecure = api_url.starts_with("https")
        && Confirm::new()
            .with_prompt("Accept self-signed certificates?")
            .default(false)
            .interact()
            .map_err(prompt_err)?;

    let profile = Profile {
        api_url,
        insecure: insecure.then_some(true),
        reconnect_backoff: (backoff == 1).then_some(BackoffKind::Exponential),
        ..Profile::default()
    };
    cfg.profiles.insert(profile_name.clone(), profile);
    if cfg.profiles.len() == 1 {
        cfg.default_profile = Some(profile_name.clone());
    }

    let written = save_config(&cfg)?;
    eprintln!("\nConfiguration written to {}", written.display());
    eprintln!("  Profile: {profile_name}");
    eprintln!("\n  Store your token with: zealnet auth set-token --profile {profile_name}");
    Ok(())
}
