use std::path::Path;

use anyhow::Result;
use notify::{Event, EventKind, RecursiveMode, Watcher};

use crate::runtime::Command;

/// Surveille le fichier config et pousse chaque version valide dans `tx`.
///
/// The runtime applies it at the next Idle. Retourne le Watcher (doit
/// rester vivant tant que l'app tourne).
///
/// # Errors
/// Returns an error if the watcher cannot be created or the path cannot be watched.
pub fn spawn_config_watcher(
    config_path: &Path,
    tx: flume::Sender<Command>,
) -> Result<impl Watcher + use<>> {
    let path = config_path.to_path_buf();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let Ok(event) = res else {
            return;
        };
        if !matches!(event.kind, EventKind::Modify(_)) {
            return;
        }
        match mf_core::config::load_config(&path) {
            Ok(new_config) => {
                log::info!("Config rechargée depuis {}", path.display());
                // Runtime gone: nothing left to reconfigure.
                let _ = tx.send(Command::Reload(new_config));
            }
            Err(e) => {
                log::warn!("Erreur de rechargement config : {e:#}");
            }
        }
    })?;

    watcher.watch(config_path, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}
