//! Built-in command handlers.

use std::sync::LazyLock;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use futures::future::BoxFuture;
use regex::Regex;

use super::{HandlerFn, Invocation};
use crate::mention::MentionSpan;
use crate::reply::Reply;

/// Rounds of the `speed` workload
const SPEED_ITERATIONS: usize = 10_000;

/// Characters of `/userinfo:` input skipped before scanning for mids
const USERINFO_SKIP_CHARS: usize = 10;

const STATUS_MESSAGE_LIMIT: usize = 100;

const MID_PATTERN: &str = "u[a-f0-9]{32}";

static MID_REGEX: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(MID_PATTERN).ok());

/// Built-in commands in registration order
pub fn builtin() -> [(&'static str, &'static str, HandlerFn); 7] {
    [
        ("help", "Send Help Message", help as HandlerFn),
        ("speed", "Send Speed Test Message", speed as HandlerFn),
        ("time", "Send Current Time Message", time as HandlerFn),
        ("me", "Send My Contact", me as HandlerFn),
        ("mid", "Send Mid Info Message", mid as HandlerFn),
        ("gid", "Send Group ID Message", gid as HandlerFn),
        ("userinfo", "Send User Info Message", userinfo as HandlerFn),
    ]
}

fn help<'a>(inv: &'a Invocation<'a>) -> BoxFuture<'a, Result<Reply>> {
    Box::pin(async move { Ok(Reply::Text(inv.registry.help_text())) })
}

fn speed<'a>(_inv: &'a Invocation<'a>) -> BoxFuture<'a, Result<Reply>> {
    Box::pin(async move {
        let elapsed = tokio::task::spawn_blocking(run_speed_workload)
            .await
            .context("Speed test task failed")?;
        Ok(Reply::Text(format!("SpeedTest: {} s", elapsed)))
    })
}

/// Seconds taken by the fixed string-join workload
fn run_speed_workload() -> f64 {
    let started = Instant::now();
    for _ in 0..SPEED_ITERATIONS {
        let joined = (0..100)
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join("-");
        std::hint::black_box(joined);
    }
    started.elapsed().as_secs_f64()
}

fn time<'a>(inv: &'a Invocation<'a>) -> BoxFuture<'a, Result<Reply>> {
    Box::pin(async move {
        let millis = inv.transport.server_time().await?;
        Ok(Reply::Text(format!("time: {}", format_server_time(millis)?)))
    })
}

fn format_server_time(millis: i64) -> Result<String> {
    let local = Local
        .timestamp_millis_opt(millis)
        .single()
        .with_context(|| format!("Server time out of range: {}", millis))?;
    Ok(local.format("%Y-%m-%d %I:%M:%S %p").to_string())
}

fn me<'a>(inv: &'a Invocation<'a>) -> BoxFuture<'a, Result<Reply>> {
    Box::pin(async move {
        let msg = inv.message;
        match inv
            .transport
            .send_contact(&msg.to, &msg.from, &inv.settings.operator_name)
            .await
        {
            Ok(()) => Ok(Reply::Silent),
            Err(e) => Ok(Reply::Failure(format!("Error sending contact: {}", e))),
        }
    })
}

fn mid<'a>(inv: &'a Invocation<'a>) -> BoxFuture<'a, Result<Reply>> {
    Box::pin(async move {
        let mentionees = inv.transport.mentionees(inv.message);
        if mentionees.is_empty() {
            return Ok(Reply::Text(inv.message.from.clone()));
        }

        let mut lines = Vec::with_capacity(mentionees.len());
        for target in &mentionees {
            match inv.transport.get_contact(target).await {
                Ok(contact) => lines.push(format!("@{} {}", contact.display_name, target)),
                Err(e) => return Ok(Reply::Failure(format!("Error fetching contact: {}", e))),
            }
        }

        let spans = mention_spans(&lines, &mentionees);
        Ok(Reply::TextWithAnnotations(lines.join("\n"), spans))
    })
}

/// One span per line, each covering the whole line at its offset in the
/// newline-joined text
fn mention_spans(lines: &[String], targets: &[String]) -> Vec<MentionSpan> {
    let mut offset = 0;
    lines
        .iter()
        .zip(targets)
        .map(|(line, target)| {
            let length = line.chars().count();
            let span = MentionSpan {
                start: offset,
                length,
                target: target.clone(),
            };
            offset += length + 1;
            span
        })
        .collect()
}

fn gid<'a>(inv: &'a Invocation<'a>) -> BoxFuture<'a, Result<Reply>> {
    Box::pin(async move { Ok(Reply::Text(inv.message.to.clone())) })
}

fn userinfo<'a>(inv: &'a Invocation<'a>) -> BoxFuture<'a, Result<Reply>> {
    Box::pin(async move {
        let mut targets = inv.transport.mentionees(inv.message);
        if targets.is_empty() {
            targets = extract_mids(inv.argument.unwrap_or_default());
        }

        let Some(target) = targets.first() else {
            return Ok(Reply::Silent);
        };

        let contact = match inv.transport.get_contact(target).await {
            Ok(contact) => contact,
            Err(e) => return Ok(Reply::Failure(format!("Error fetching user info: {}", e))),
        };

        let status: String = contact
            .status_message
            .chars()
            .take(STATUS_MESSAGE_LIMIT)
            .collect();
        let cdn = inv.settings.profile_cdn.trim_end_matches('/');

        Ok(Reply::Text(format!(
            "User Name:\n{}\nUser Mid:\n{}\nStatus Message:\n(Only show 100 words!)\n{}\nProfile Link:\n{}/{}",
            contact.display_name, contact.mid, status, cdn, contact.picture_status
        )))
    })
}

/// Mids (`u` + 32 hex chars, not glued to other hex chars) found after the
/// command prefix of `/userinfo:` input
fn extract_mids(text: &str) -> Vec<String> {
    let Some(pattern) = MID_REGEX.as_ref() else {
        return Vec::new();
    };
    let tail: String = text.chars().skip(USERINFO_SKIP_CHARS).collect();
    let is_hex = |c: char| matches!(c, 'a'..='f' | '0'..='9');

    pattern
        .find_iter(&tail)
        .filter(|m| {
            let before = tail[..m.start()].chars().next_back();
            let after = tail[m.end()..].chars().next();
            !before.is_some_and(is_hex) && !after.is_some_and(is_hex)
        })
        .map(|m| m.as_str().to_string())
        .collect()
}
