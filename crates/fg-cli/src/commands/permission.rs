//! Notification-blocking permission.

use std::io::Write;

use anyhow::Result;
use fg_core::{AppShield, NotificationBlocker};

use super::util::runtime;

pub fn run<W: Write, B: NotificationBlocker>(writer: &mut W, blocker: B, request: bool) -> Result<()> {
    let shield = AppShield::new(blocker);
    let granted = runtime()?.block_on(shield.permission(request));
    write_result(writer, granted)
}

fn write_result<W: Write>(writer: &mut W, granted: bool) -> Result<()> {
    let state = if granted { "granted" } else { "not granted" };
    writeln!(writer, "Notification blocking permission: {state}")?;
    if !granted {
        writeln!(
            writer,
            "Focus sessions will run without blocking apps. Run `fg permission --request` to ask again."
        )?;
    }
    Ok(())
}
