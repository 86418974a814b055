//! Hotspot command handlers: redirect parsing and controller login.

use serde::Serialize;
use url::Url;

use zealnet_core::{
    CoreError, HotspotError, HotspotParams, HttpNavigator, NavigationOutcome, Navigator, format_mac,
    generate_session_password, is_hotspot_redirect, redirect_to_login, user_identifier,
};

use crate::cli::{GlobalOpts, HotspotArgs, HotspotCommand};
use crate::config::resolve_transport;
use crate::error::CliError;
use crate::output::{self, detail_line, should_color};

// ── Output shapes ────────────────────────────────────────────────────

#[derive(Serialize)]
struct ParsedRedirect {
    #[serde(flatten)]
    params: HotspotParams,
    is_hotspot: bool,
    user: String,
    session_password: String,
}

#[derive(Serialize)]
struct LoginResult {
    url: String,
    status: Option<u16>,
    submitted: bool,
}

/// Navigator that only reports the URL it would visit.
struct PrintNavigator;

impl Navigator for PrintNavigator {
    async fn navigate(&self, url: &Url) -> Result<NavigationOutcome, HotspotError> {
        Ok(NavigationOutcome {
            url: url.clone(),
            status: None,
        })
    }
}

// ── Handler ──────────────────────────────────────────────────────────

pub async fn handle(args: HotspotArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        HotspotCommand::Parse { url } => {
            let params = parse_redirect(&url);
            let parsed = ParsedRedirect {
                is_hotspot: is_hotspot_redirect(&params),
                user: user_identifier(&params).to_owned(),
                session_password: generate_session_password(params.mac.as_deref()),
                params,
            };
            let color = should_color(&global.color);
            let out = output::render_single(
                &global.output,
                &parsed,
                |p| parsed_detail(p, color),
                |p| p.params.link_login.clone().unwrap_or_default(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        HotspotCommand::Login {
            url,
            username,
            password,
            prompt_password,
            follow,
        } => {
            let params = parse_redirect(&url);
            if !is_hotspot_redirect(&params) {
                tracing::warn!("URL does not look like a hotspot redirect");
            }

            let username = username.unwrap_or_else(|| user_identifier(&params).to_owned());
            let password = if prompt_password {
                rpassword::prompt_password("Hotspot password: ")?
            } else {
                password.unwrap_or_else(|| generate_session_password(params.mac.as_deref()))
            };

            let outcome = if follow {
                let http = resolve_transport(global)?
                    .build_client()
                    .map_err(CoreError::from)?;
                redirect_to_login(&HttpNavigator::new(http), &params, &username, &password).await?
            } else {
                redirect_to_login(&PrintNavigator, &params, &username, &password).await?
            };

            let result = LoginResult {
                url: outcome.url.to_string(),
                status: outcome.status,
                submitted: follow,
            };
            let color = should_color(&global.color);
            let out = output::render_single(
                &global.output,
                &result,
                |r| login_detail(r, color),
                |r| r.url.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

/// Accept either a full redirect URL or a bare query string.
fn parse_redirect(raw: &str) -> HotspotParams {
    match Url::parse(raw.trim()) {
        Ok(url) if !url.cannot_be_a_base() => HotspotParams::from_url(&url),
        _ => HotspotParams::from_query(raw.trim()),
    }
}

fn parsed_detail(p: &ParsedRedirect, color: bool) -> String {
    let show = |v: Option<&str>| v.unwrap_or("-").to_owned();
    let mac = p.params.mac.as_deref().map_or_else(|| "-".into(), format_mac);
    [
        detail_line("hotspot", if p.is_hotspot { "yes" } else { "no" }, color),
        detail_line("user", &p.user, color),
        detail_line("mac", &mac, color),
        detail_line("ip", &show(p.params.ip.as_deref()), color),
        detail_line("login url", &show(p.params.link_login.as_deref()), color),
        detail_line("destination", &show(p.params.link_orig.as_deref()), color),
        detail_line("error", &show(p.params.error.as_deref()), color),
        detail_line("chap id", &show(p.params.chap_id.as_deref()), color),
    ]
    .join("\n")
}

fn login_detail(r: &LoginResult, color: bool) -> String {
    if r.submitted {
        let status = r.status.map_or_else(|| "-".into(), |s| s.to_string());
        [
            output::success("Login submitted", color),
            detail_line("final url", &r.url, color),
            detail_line("status", &status, color),
        ]
        .join("\n")
    } else {
        r.url.clone()
    }
}
