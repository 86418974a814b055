//! Auth token handlers.
//!
//! The token lives in the profile's store, where the socket client and the
//! REST client of later runs pick it up.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use zealnet_core::FileStore;
use zealnet_core::storage::{clear_auth_token, read_auth_token, write_auth_token};

use crate::cli::{AuthArgs, AuthCommand, GlobalOpts};
use crate::config::resolve_data_dir;
use crate::error::CliError;
use crate::output::{self, detail_line, should_color};

use super::util;

#[derive(Serialize)]
struct TokenStatus {
    stored: bool,
    token: Option<String>,
    data_dir: String,
}

pub fn handle(args: AuthArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let data_dir = resolve_data_dir(global)?;
    let store = FileStore::open(&data_dir)?;
    let color = should_color(&global.color);

    match args.command {
        AuthCommand::SetToken { token } => {
            let token = match token {
                Some(token) => token,
                None => rpassword::prompt_password("Portal auth token: ")?,
            };
            if token.trim().is_empty() {
                return Err(CliError::Validation {
                    field: "token".into(),
                    reason: "token cannot be empty".into(),
                });
            }
            write_auth_token(&store, &SecretString::from(token))?;
            output::print_output(&output::success("Token stored", color), global.quiet);
            Ok(())
        }

        AuthCommand::ClearToken => {
            clear_auth_token(&store)?;
            output::print_output(&output::success("Token removed", color), global.quiet);
            Ok(())
        }

        AuthCommand::Status => {
            let token = read_auth_token(&store)?;
            let status = TokenStatus {
                stored: token.is_some(),
                token: token.as_ref().map(|t| util::mask(t.expose_secret())),
                data_dir: data_dir.display().to_string(),
            };
            let out = output::render_single(
                &global.output,
                &status,
                |s| {
                    [
                        detail_line("token", s.token.as_deref().unwrap_or("(none)"), color),
                        detail_line("data dir", &s.data_dir, color),
                    ]
                    .join("\n")
                },
                |s| s.stored.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
