//! Live socket command handlers.

use tokio::sync::mpsc;

use zealnet_core::{
    ConnectionState, Portal, SocketCallbacks, SocketClient, SocketMessage, SocketOptions,
};

use crate::cli::{GlobalOpts, OutputFormat, SocketArgs, SocketCommand};
use crate::config::{request_timeout, resolve_portal};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(args: SocketArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let portal = Portal::new(resolve_portal(global)?)?;

    let result = match args.command {
        SocketCommand::Listen { types, count } => {
            listen(portal.socket(), types.as_deref(), count, global).await
        }
        SocketCommand::Send { kind, data } => {
            let data = match data {
                Some(raw) => util::parse_json_arg("data", &raw)?,
                None => serde_json::Value::Null,
            };
            send_one(portal.socket(), &SocketMessage::new(kind, data), global).await
        }
    };

    portal.shutdown().await;
    result
}

// ── listen ───────────────────────────────────────────────────────────

async fn listen(
    socket: &SocketClient,
    types: Option<&[String]>,
    count: Option<usize>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let callbacks = SocketCallbacks::new()
        .on_open(|| tracing::info!("socket connected"))
        .on_message(move |msg| {
            let _ = tx.send(msg.clone());
        })
        .on_close(|code, reason| tracing::info!(?code, reason, "socket closed"))
        .on_error(|error| tracing::warn!(error, "socket error"));

    socket.connect(callbacks, SocketOptions::default())?;
    let mut state = socket.watch_state();
    let mut printed = 0usize;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("interrupted");
                break;
            }
            failed = state.wait_for(|s| matches!(s, ConnectionState::Failed { .. })) => {
                match failed.map(|s| *s) {
                    Ok(ConnectionState::Failed { attempts }) => {
                        return Err(CliError::SocketFailed { attempts });
                    }
                    _ => break,
                }
            }
            Some(msg) = rx.recv() => {
                if types.is_some_and(|t| !t.iter().any(|k| *k == msg.kind)) {
                    continue;
                }
                output::print_output(&render_message(&msg, &global.output)?, global.quiet);
                printed += 1;
                if count.is_some_and(|n| printed >= n) {
                    break;
                }
            }
        }
    }

    socket.disconnect();
    Ok(())
}

/// One message per line for streaming formats, one document per message for YAML.
fn render_message(msg: &SocketMessage, format: &OutputFormat) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Json | OutputFormat::JsonCompact => serde_json::to_string(msg)?,
        OutputFormat::Yaml => format!(
            "---\n{}",
            serde_yaml::to_string(msg).map_err(|e| CliError::Internal(e.to_string()))?
        ),
        OutputFormat::Table | OutputFormat::Plain => format!("{}\t{}", msg.kind, msg.data),
    })
}

// ── send ─────────────────────────────────────────────────────────────

async fn send_one(
    socket: &SocketClient,
    message: &SocketMessage,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let timeout = request_timeout(global);
    socket.connect(SocketCallbacks::new(), SocketOptions::default())?;

    let mut state = socket.watch_state();
    let opened = tokio::time::timeout(
        timeout,
        state.wait_for(|s| matches!(s, ConnectionState::Connected | ConnectionState::Failed { .. })),
    )
    .await
    .map_err(|_| CliError::Timeout)?
    .map(|s| *s)
    .map_err(|_| CliError::Internal("socket state channel closed".into()))?;

    if let ConnectionState::Failed { attempts } = opened {
        return Err(CliError::SocketFailed { attempts });
    }

    if !socket.send(message) {
        return Err(CliError::ConnectionFailed {
            url: socket.default_url().to_string(),
            reason: "connection closed before the message was sent".into(),
        });
    }
    socket.disconnect();

    // The close handshake flushes the frame already handed to the socket.
    let _ = tokio::time::timeout(
        timeout,
        state.wait_for(|s| *s == ConnectionState::Disconnected),
    )
    .await;

    let color = output::should_color(&global.color);
    output::print_output(
        &output::success(&format!("Sent {}", message.kind), color),
        global.quiet,
    );
    Ok(())
}
