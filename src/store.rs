use crate::error::ScoutError;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Ids of listings already notified, persisted as a JSON array.
///
/// The in-memory set is authoritative; a failed save only risks
/// duplicate notifications after a restart.
#[derive(Debug)]
pub struct SeenStore {
    path: PathBuf,
    ids: HashSet<String>,
}

impl SeenStore {
    /// Load persisted ids, falling back to an empty set on any failure
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let ids = match read_ids(&path).await {
            Ok(ids) => {
                info!("Loaded {} seen ids from {}", ids.len(), path.display());
                ids
            }
            Err(ReadFailure::Missing) => {
                warn!("No state file at {}, starting fresh", path.display());
                HashSet::new()
            }
            Err(ReadFailure::Other(e)) => {
                warn!("Cannot read state, starting fresh ({})", e);
                HashSet::new()
            }
        };
        Self { path, ids }
    }

    /// Persist the full set; failures are logged and otherwise ignored
    pub async fn save(&self) {
        match self.write_ids().await {
            Ok(()) => info!("State saved ({} IDs)", self.ids.len()),
            Err(e) => warn!("State NOT saved ({})", e),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Write to a sibling temp file, then rename over the target
    async fn write_ids(&self) -> Result<(), ScoutError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }

        let mut sorted: Vec<&String> = self.ids.iter().collect();
        sorted.sort();
        let json = serde_json::to_vec_pretty(&sorted)?;

        let tmp = tmp_path(&self.path);
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

enum ReadFailure {
    Missing,
    Other(ScoutError),
}

async fn read_ids(path: &Path) -> Result<HashSet<String>, ReadFailure> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(ReadFailure::Missing),
        Err(e) => return Err(ReadFailure::Other(e.into())),
    };
    serde_json::from_slice(&bytes).map_err(|e| ReadFailure::Other(e.into()))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    struct WarnCounter(Arc<Mutex<usize>>);

    impl<S: Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == Level::WARN {
                *self.0.lock().unwrap() += 1;
            }
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_and_warns() {
        let warnings = Arc::new(Mutex::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(warnings.clone()));
        let _guard = tracing::subscriber::set_default(subscriber);

        let dir = tempfile::tempdir().unwrap();
        let store = SeenStore::load(dir.path().join("notified.json")).await;

        assert_eq!(store.len(), 0);
        assert_eq!(*warnings.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notified.json");
        std::fs::write(&path, b"\x80\x04not json").unwrap();

        let store = SeenStore::load(&path).await;
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_save_then_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("notified.json");

        let mut store = SeenStore::load(&path).await;
        assert!(store.insert("wbm_u1"));
        assert!(store.insert("gewobag_a1"));
        assert!(!store.insert("wbm_u1"));
        store.save().await;

        let reloaded = SeenStore::load(&path).await;
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains("wbm_u1"));
        assert!(reloaded.contains("gewobag_a1"));
        assert!(!tmp_path(&path).exists());

        let on_disk: Vec<String> =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(on_disk, vec!["gewobag_a1", "wbm_u1"]);
    }

    #[tokio::test]
    async fn test_unwritable_location_keeps_memory_state() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the parent directory should be
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();

        let mut store = SeenStore::load(blocker.join("notified.json")).await;
        store.insert("wbm_u1");
        store.save().await;

        assert!(store.contains("wbm_u1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_tmp_path_is_sibling() {
        assert_eq!(
            tmp_path(Path::new("/var/lib/scout/notified.json")),
            PathBuf::from("/var/lib/scout/notified.json.tmp")
        );
    }
}
