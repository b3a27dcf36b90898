use std::{io::ErrorKind, path::PathBuf, sync::Arc};

use anyhow::Context;
use deskclock_common::RuntimeConfig;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppStore {
    runtime_path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

impl AppStore {
    pub fn from_env() -> Self {
        let data_dir = std::env::var("DESKCLOCK_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.deskclock"));
        Self::new(data_dir)
    }

    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            runtime_path: Arc::new(data_dir.join("runtime.json")),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn load(&self) -> anyhow::Result<RuntimeConfig> {
        let _guard = self.lock.lock().await;
        let mut runtime = match tokio::fs::read(self.runtime_path.as_ref()).await {
            Ok(raw) => serde_json::from_slice::<RuntimeConfig>(&raw).with_context(|| {
                format!("malformed config at {}", self.runtime_path.display())
            })?,
            Err(err) if err.kind() == ErrorKind::NotFound => RuntimeConfig::default(),
            Err(err) => return Err(err.into()),
        };
        runtime.sanitize();
        Ok(runtime)
    }

    pub async fn save(&self, runtime: &RuntimeConfig) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        let path = self.runtime_path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let payload = serde_json::to_vec_pretty(runtime)?;
        tokio::fs::write(path, payload)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    pub async fn clear(&self) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        match tokio::fs::remove_file(self.runtime_path.as_ref()).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn temp_store(name: &str) -> (AppStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!("deskclock-{name}-{}", std::process::id()));
        (AppStore::new(dir.clone()), dir)
    }

    #[tokio::test]
    async fn missing_file_loads_defaults() {
        let (store, _) = temp_store("missing");
        let runtime = store.load().await.unwrap();
        assert_eq!(runtime, RuntimeConfig::default());
    }

    #[tokio::test]
    async fn saved_config_round_trips_and_clears() {
        let (store, dir) = temp_store("roundtrip");
        let mut runtime = RuntimeConfig::default();
        runtime.display.auto_brightness = true;
        runtime.device.hostname = "office".to_string();

        store.save(&runtime).await.unwrap();
        assert_eq!(store.load().await.unwrap(), runtime);

        store.clear().await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), RuntimeConfig::default());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn loaded_config_is_sanitized() {
        let (store, dir) = temp_store("sanitize");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(
            dir.join("runtime.json"),
            r#"{"display":{"min_brightness":12,"max_brightness":3,"date_duration":200}}"#,
        )
        .await
        .unwrap();

        let runtime = store.load().await.unwrap();
        assert_eq!(runtime.display.min_brightness, 3);
        assert_eq!(runtime.display.max_brightness, 12);
        assert_eq!(runtime.display.date_duration, 60);

        let _ = std::fs::remove_dir_all(dir);
    }
}
