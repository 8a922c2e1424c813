use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::time::Duration;
use tracing::{error, info};

/// Quiet period used to coalesce bursts of file events (editors write
/// temp files, rename, then touch)
const DEBOUNCE: Duration = Duration::from_millis(100);

/// Watches the template directory and fires a callback on changes.
///
/// The watch stops when this value is dropped.
pub struct TemplateWatcher {
    _watcher: RecommendedWatcher,
}

impl TemplateWatcher {
    pub fn new<F>(dir: &Path, on_change: F) -> Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let (tx, rx) = channel::<notify::Result<Event>>();

        let mut watcher = RecommendedWatcher::new(tx, Config::default())?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        info!("Watching prompt templates in {}", dir.display());

        std::thread::spawn(move || loop {
            match rx.recv() {
                Ok(Ok(event)) => {
                    if !is_content_change(&event.kind) {
                        continue;
                    }
                    // Swallow the rest of the burst before firing once
                    loop {
                        match rx.recv_timeout(DEBOUNCE) {
                            Ok(_) => continue,
                            Err(RecvTimeoutError::Timeout) => break,
                            Err(RecvTimeoutError::Disconnected) => return,
                        }
                    }
                    info!("Prompt template change detected, invalidating cache");
                    on_change();
                }
                Ok(Err(e)) => error!("Template watch error: {:?}", e),
                // Sender lives in the watcher; this fires when it is dropped
                Err(_) => break,
            }
        });

        Ok(Self { _watcher: watcher })
    }
}

fn is_content_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}
