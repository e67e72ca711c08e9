// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command Server (§4.H): a line-oriented TCP service, one spawned task per
//! connection (teacher's `Listener::run` shape in
//! `oj-daemon/src/listener/mod.rs`), with every command dispatched through a
//! single process-wide `cmd_lock` so two connections' commands never
//! interleave.

use crate::ctx::DaemonCtx;
use crate::error::CommandError;
use autophone_core::PhoneConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

const BANNER: &str = "Hello? Yes this is Autophone.\n";

/// TCP acceptor for the operator command channel.
pub struct CommandServer {
    listener: TcpListener,
    ctx: Arc<DaemonCtx>,
}

impl CommandServer {
    /// Binds `addr` with `SO_REUSEADDR` set before listening, matching the
    /// original's `allow_reuse_address = True`.
    pub fn bind(addr: SocketAddr, ctx: Arc<DaemonCtx>) -> std::io::Result<Self> {
        let socket = socket2::Socket::new(
            socket2::Domain::for_address(addr),
            socket2::Type::STREAM,
            None,
        )?;
        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;
        socket.listen(128)?;
        socket.set_nonblocking(true)?;
        let listener = TcpListener::from_std(socket.into())?;
        Ok(Self { listener, ctx })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept loop: runs until the process is killed. Each connection is
    /// handled on its own spawned task so a slow or hung client never blocks
    /// new connections or other in-flight ones.
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, _peer)) => {
                    let ctx = self.ctx.clone();
                    tokio::spawn(async move {
                        handle_connection(stream, ctx).await;
                    });
                }
                Err(e) => tracing::error!(error = %e, "command server accept error"),
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, ctx: Arc<DaemonCtx>) {
    let (reader, mut writer) = stream.into_split();
    if writer.write_all(BANNER.as_bytes()).await.is_err() {
        return;
    }

    let mut lines = BufReader::new(reader).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "command connection read error");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let outcome = {
            let _guard = ctx.cmd_lock.lock().await;
            route_command(&ctx, line).await
        };

        match outcome {
            RouteOutcome::Reply(resp) => {
                if writer.write_all(format!("{resp}\n").as_bytes()).await.is_err() {
                    break;
                }
            }
            RouteOutcome::ReplyAndShutdown(resp) => {
                let _ = writer.write_all(format!("{resp}\n").as_bytes()).await;
                ctx.shutdown.notify_one();
                break;
            }
            RouteOutcome::CloseSilently => break,
        }
    }
}

enum RouteOutcome {
    Reply(String),
    ReplyAndShutdown(String),
    CloseSilently,
}

/// Dispatches one already-trimmed, non-empty line under the caller's held
/// `cmd_lock` guard (§4.H command table).
async fn route_command(ctx: &Arc<DaemonCtx>, line: &str) -> RouteOutcome {
    let (keyword, rest) = match line.split_once(char::is_whitespace) {
        Some((k, r)) => (k, r.trim()),
        None => (line, ""),
    };

    match keyword.to_ascii_lowercase().as_str() {
        "stop" => RouteOutcome::ReplyAndShutdown("ok".to_string()),
        "log" => {
            tracing::info!(text = rest, "operator log");
            RouteOutcome::Reply("ok".to_string())
        }
        "triggerjobs" => match crate::dispatcher::trigger_jobs(ctx, rest) {
            Ok(()) => RouteOutcome::Reply("ok".to_string()),
            Err(e) => RouteOutcome::Reply(format!("Error: {e}")),
        },
        "register" => match parse_register(rest) {
            Ok(cfg) => {
                crate::fleet::register(ctx, cfg);
                RouteOutcome::Reply("ok".to_string())
            }
            Err(e) => RouteOutcome::Reply(format!("Error: {e}")),
        },
        "status" => {
            let report = format_status_report(ctx);
            let resp = if report.is_empty() { "ok".to_string() } else { format!("{report}\nok") };
            RouteOutcome::Reply(resp)
        }
        "quit" | "exit" => RouteOutcome::CloseSilently,
        other => RouteOutcome::Reply(format!("Unknown command \"{other}\"")),
    }
}

/// Parses a `register` command's URL-encoded form (§4.H, §9).
///
/// The whole query string is lowercased *before* splitting on `&`/`=`
/// (matching the original's `urlparse.parse_qs(data.lower())`), so a colon
/// MAC like `AA:BB:01` becomes `aa:bb:01` before the `:`→`_` substitution.
/// `pool` (the serial) is the one field the original uppercases back after
/// the whole string was lowercased; this redesign preserves that literal
/// round-trip rather than silently dropping it.
fn parse_register(raw: &str) -> Result<PhoneConfig, CommandError> {
    let lowered = raw.to_ascii_lowercase();
    let mut fields: std::collections::HashMap<String, String> =
        url::form_urlencoded::parse(lowered.as_bytes())
            .into_owned()
            .collect();

    let mac = fields.remove("name").ok_or(CommandError::MissingField("name"))?;
    let hardware = fields
        .remove("hardware")
        .ok_or(CommandError::MissingField("hardware"))?;
    let serial = fields
        .remove("pool")
        .ok_or(CommandError::MissingField("pool"))?
        .to_ascii_uppercase();
    let ip = fields.remove("ipaddr").ok_or(CommandError::MissingField("ipaddr"))?;
    let cmdport = fields
        .remove("cmdport")
        .ok_or(CommandError::MissingField("cmdport"))?;
    let os_version = fields.remove("os").ok_or(CommandError::MissingField("os"))?;

    let sut_cmd_port: u16 = cmdport
        .parse()
        .map_err(|_| CommandError::MalformedPair(format!("cmdport={cmdport}")))?;

    let phone_id = format!("{}_{hardware}", mac.replace(':', "_"));

    Ok(PhoneConfig {
        phone_id,
        serial,
        ip,
        sut_cmd_port,
        machine_type: hardware,
        os_version,
    })
}

/// Renders the `status` report (§4.H): one line per known worker, current
/// build pretty-printed from epoch, time since last update, current state
/// and its duration, previous state and its age if any.
fn format_status_report(ctx: &DaemonCtx) -> String {
    let views = ctx.views.lock();
    let now = ctx.clock.epoch_secs();

    let mut phone_ids: Vec<&String> = views.keys().collect();
    phone_ids.sort();

    let mut lines = Vec::with_capacity(phone_ids.len());
    for phone_id in phone_ids {
        let view = &views[phone_id];
        let Some(last) = &view.last else { continue };

        let build = last
            .build
            .map(format_epoch)
            .unwrap_or_else(|| "unknown".to_string());
        let since_update = now.saturating_sub(last.timestamp_epoch_secs);
        let current_duration = view
            .first_of_current_type
            .as_ref()
            .map(|first| now.saturating_sub(first.timestamp_epoch_secs))
            .unwrap_or(0);

        let mut line = format!(
            "{phone_id}: build={build} last_update={since_update}s_ago state={} for {current_duration}s",
            last.state
        );
        if let Some(prev) = &view.last_of_previous_type {
            let age = now.saturating_sub(prev.timestamp_epoch_secs);
            line.push_str(&format!(" previous={} ({age}s_ago)", prev.state));
        }
        lines.push(line);
    }

    lines.join("\n")
}

fn format_epoch(epoch_secs: u64) -> String {
    match time::OffsetDateTime::from_unix_timestamp(epoch_secs as i64) {
        Ok(dt) => format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02} UTC",
            dt.year(),
            u8::from(dt.month()),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second()
        ),
        Err(_) => "invalid timestamp".to_string(),
    }
}
