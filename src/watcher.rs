use crate::config::TintaConfig;
use crate::services::SyncService;
use notify::{EventKind, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const DEBOUNCE_MS: u64 = 1500;

// what operations does our async worker know?
enum SyncCommand {
    Changed(PathBuf),
    Removed(PathBuf),
}

/// Spawns a background task that watches the content directory and keeps the
/// database and asset store in sync with it.
pub fn start_directory_watcher(sync_service: Arc<SyncService>, config: Arc<TintaConfig>) {
    // the conveyor belt
    let (tx, mut rx) = mpsc::channel::<SyncCommand>(100);

    // emergency alarm for channel overflow, shared between the OS watcher
    // callback and the async worker
    let needs_full_sync = Arc::new(AtomicBool::new(false));
    let needs_full_sync_clone = needs_full_sync.clone();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if let Ok(event) = res {
            // only care about the first path for these simple events
            if let Some(path) = event.paths.first() {
                // only .md files; ignore editor swap/temp files
                let ext = path.extension().and_then(|s| s.to_str());
                let filename = path.file_name().and_then(|s| s.to_str()).unwrap_or("");

                if ext != Some("md") || filename.starts_with('.') || filename.ends_with('~') {
                    return;
                }

                let command = match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) => {
                        Some(SyncCommand::Changed(path.clone()))
                    }
                    EventKind::Remove(_) => Some(SyncCommand::Removed(path.clone())),
                    _ => None,
                };

                if let Some(cmd) = command {
                    if let Err(mpsc::error::TrySendError::Full(_)) = tx.try_send(cmd) {
                        needs_full_sync_clone.store(true, Ordering::SeqCst);
                        println!(
                            "Warning: File event dropped due to high traffic. Triggering Full Sync."
                        );
                    }
                }
            }
        }
    })
    .expect("Failed to initialize file watcher");

    watcher
        .watch(&config.content_dir, RecursiveMode::Recursive)
        .expect("Failed to watch content directory");

    tokio::spawn(async move {
        let _kept_alive_watcher = watcher;

        let mut pending_changes: HashSet<PathBuf> = HashSet::new();
        let mut pending_removals: HashSet<PathBuf> = HashSet::new();

        loop {
            // wait for the first event of a burst
            let first_cmd = match rx.recv().await {
                Some(cmd) => cmd,
                None => break,
            };
            collect(first_cmd, &mut pending_changes, &mut pending_removals);

            // keep collecting until the directory goes quiet
            loop {
                match tokio::time::timeout(Duration::from_millis(DEBOUNCE_MS), rx.recv()).await {
                    Ok(Some(cmd)) => collect(cmd, &mut pending_changes, &mut pending_removals),
                    Ok(None) => return,
                    Err(_) => break,
                }
            }

            if needs_full_sync.swap(false, Ordering::SeqCst) {
                pending_changes.clear();
                pending_removals.clear();
                if let Err(e) = sync_service.full_sync().await {
                    eprintln!("Full sync failed: {:#}", e);
                }
                continue;
            }

            for path in pending_changes.drain() {
                if let Err(e) = sync_service.sync_file(&path).await {
                    eprintln!("Failed to sync {}: {:#}", path.display(), e);
                }
            }
            for path in pending_removals.drain() {
                if let Err(e) = sync_service.remove_file(&path).await {
                    eprintln!("Failed to remove {}: {:#}", path.display(), e);
                }
            }
        }
    });
}

// a later change supersedes a pending removal of the same path, and the
// other way around
fn collect(
    cmd: SyncCommand,
    pending_changes: &mut HashSet<PathBuf>,
    pending_removals: &mut HashSet<PathBuf>,
) {
    match cmd {
        SyncCommand::Changed(path) => {
            pending_removals.remove(&path);
            pending_changes.insert(path);
        }
        SyncCommand::Removed(path) => {
            pending_changes.remove(&path);
            pending_removals.insert(path);
        }
    }
}
