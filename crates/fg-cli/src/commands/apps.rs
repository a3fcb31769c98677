//! Allowed-app management.

use std::io::Write;

use anyhow::Result;
use fg_core::{AppId, AppShield, FocusLedger, InstalledApp, SnapshotStore};

use super::util::{report_warning, runtime};
use crate::blocker::Blocker;

/// Lists installed apps as reported by the blocker.
pub fn list<W: Write, S: SnapshotStore>(
    writer: &mut W,
    ledger: &FocusLedger<S>,
    blocker: Blocker,
) -> Result<()> {
    let shield = AppShield::new(blocker);
    let apps = runtime()?.block_on(shield.installed_apps());
    render(writer, ledger, &apps)
}

fn render<W: Write, S: SnapshotStore>(
    writer: &mut W,
    ledger: &FocusLedger<S>,
    apps: &[InstalledApp],
) -> Result<()> {
    if apps.is_empty() {
        writeln!(writer, "No installed apps reported.")?;
    }
    for app in apps {
        let state = if ledger.is_allowed(&app.app_id) {
            "allowed"
        } else {
            "blocked"
        };
        writeln!(
            writer,
            "{:<8} {:<28} {}",
            state,
            app.app_id.as_str(),
            app.display_name
        )?;
    }

    // Allowed IDs the blocker does not know about still count.
    let unknown: Vec<&AppId> = ledger
        .allowed_apps()
        .iter()
        .filter(|id| !apps.iter().any(|app| &app.app_id == *id))
        .collect();
    if !unknown.is_empty() {
        writeln!(writer, "Also allowed:")?;
        for app_id in unknown {
            writeln!(writer, "- {app_id}")?;
        }
    }
    Ok(())
}

pub fn toggle<W: Write, S: SnapshotStore>(
    writer: &mut W,
    ledger: &mut FocusLedger<S>,
    app_id: &str,
) -> Result<()> {
    let app_id: AppId = app_id.parse()?;
    let allowed = ledger.toggle_allowed_app(app_id.clone());
    report_warning(allowed.warning.as_ref());
    if allowed.value {
        writeln!(writer, "{app_id} is now allowed during focus sessions.")?;
    } else {
        writeln!(writer, "{app_id} will be blocked during focus sessions.")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use fg_core::{LedgerDefaults, LocalBlocker, MemoryStore};
    use insta::assert_snapshot;

    fn ledger() -> FocusLedger<MemoryStore> {
        FocusLedger::load(MemoryStore::new(), LedgerDefaults::default()).0
    }

    #[test]
    fn toggle_twice_restores_blocking() {
        let mut ledger = ledger();
        let mut output = Vec::new();
        toggle(&mut output, &mut ledger, "com.whatsapp").unwrap();
        assert!(ledger.is_allowed(&"com.whatsapp".parse().unwrap()));
        toggle(&mut output, &mut ledger, "com.whatsapp").unwrap();
        assert!(ledger.allowed_apps().is_empty());

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "com.whatsapp is now allowed during focus sessions.\n\
             com.whatsapp will be blocked during focus sessions.\n"
        );
    }

    #[test]
    fn toggle_rejects_blank_id() {
        let mut ledger = ledger();
        let mut output = Vec::new();
        assert!(toggle(&mut output, &mut ledger, "  ").is_err());
        assert!(ledger.allowed_apps().is_empty());
    }

    #[tokio::test]
    async fn render_marks_allowed_apps() {
        let mut ledger = ledger();
        let _ = ledger.toggle_allowed_app("com.spotify.music".parse().unwrap());
        let _ = ledger.toggle_allowed_app("org.example.notes".parse().unwrap());
        let apps = AppShield::new(LocalBlocker::new()).installed_apps().await;

        let mut output = Vec::new();
        render(&mut output, &ledger, &apps[5..]).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        blocked  com.whatsapp                 WhatsApp
        allowed  com.spotify.music            Spotify
        blocked  com.netflix.mediaclient      Netflix
        Also allowed:
        - org.example.notes
        ");
    }
}
