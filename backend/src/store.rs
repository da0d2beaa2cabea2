use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use exchange_core::{Room, RoomId};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;
use uuid::Uuid;

const LOG_TARGET: &str = "backend::store";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("room {0} not found")]
    NotFound(RoomId),
    #[error("failed to read room {id}: {reason}")]
    Read { id: RoomId, reason: String },
    #[error("failed to write room {id}: {reason}")]
    Write { id: RoomId, reason: String },
}

/// Durable storage of whole rooms, keyed by room id. Saves overwrite the
/// previous snapshot; there are no partial updates.
#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn load(&self, id: &str) -> Result<Room, StoreError>;
    async fn save(&self, room: &Room) -> Result<(), StoreError>;
}

#[derive(Default)]
pub struct MemoryRoomStore {
    rooms: RwLock<HashMap<RoomId, Room>>,
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn load(&self, id: &str) -> Result<Room, StoreError> {
        self.rooms
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn save(&self, room: &Room) -> Result<(), StoreError> {
        self.rooms
            .write()
            .await
            .insert(room.id().to_string(), room.clone());
        Ok(())
    }
}

/// One pretty-printed JSON document per room under `dir`.
pub struct JsonFileRoomStore {
    dir: PathBuf,
}

impl JsonFileRoomStore {
    pub async fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    // Only ids that parse as UUIDs ever become file names.
    fn path_for(&self, id: &str) -> Option<PathBuf> {
        Uuid::parse_str(id)
            .ok()
            .map(|uuid| self.dir.join(format!("{uuid}.json")))
    }
}

#[async_trait]
impl RoomStore for JsonFileRoomStore {
    async fn load(&self, id: &str) -> Result<Room, StoreError> {
        let path = self
            .path_for(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()))
            }
            Err(err) => {
                return Err(StoreError::Read {
                    id: id.to_string(),
                    reason: err.to_string(),
                })
            }
        };

        serde_json::from_slice(&bytes).map_err(|err| StoreError::Read {
            id: id.to_string(),
            reason: err.to_string(),
        })
    }

    async fn save(&self, room: &Room) -> Result<(), StoreError> {
        let write_err = |reason: String| StoreError::Write {
            id: room.id().to_string(),
            reason,
        };
        let path = self
            .path_for(room.id())
            .ok_or_else(|| write_err("room id is not a uuid".into()))?;

        let json = serde_json::to_vec_pretty(room).map_err(|err| write_err(err.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|err| write_err(err.to_string()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|err| write_err(err.to_string()))?;

        debug!(target: LOG_TARGET, room_id = %room.id(), path = %path.display(), "room saved");
        Ok(())
    }
}

/// Serializes load-modify-save cycles per room id. Without it two joins, or a
/// join racing the draw, would overwrite each other.
#[derive(Clone, Default)]
pub struct RoomLocks {
    inner: Arc<Mutex<HashMap<RoomId, Arc<Mutex<()>>>>>,
}

impl RoomLocks {
    pub async fn acquire(&self, room_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().await;
            // Entries nobody holds or waits on can go.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(room_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exchange_core::{admit_participant, create_room, perform_draw, resolve_match};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::time::Duration;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("exchange_rooms_{}", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn memory_store_overwrites_whole_room() {
        let store = MemoryRoomStore::default();
        let mut room = create_room("Team", "Friday", "10");
        store.save(&room).await.unwrap();

        admit_participant(&mut room, "alice", None).unwrap();
        store.save(&room).await.unwrap();

        let loaded = store.load(room.id()).await.unwrap();
        assert_eq!(loaded, room);
        assert!(matches!(
            store.load("missing").await,
            Err(StoreError::NotFound(id)) if id == "missing"
        ));
    }

    #[tokio::test]
    async fn file_store_persists_across_instances() {
        let dir = temp_dir();
        let mut room = create_room("Family", "2024-12-24", "40");
        admit_participant(&mut room, "alice", Some("tea".into())).unwrap();
        admit_participant(&mut room, "bob", None).unwrap();
        perform_draw(&mut room, &mut ChaCha8Rng::seed_from_u64(3)).unwrap();

        let store = JsonFileRoomStore::open(&dir).await.unwrap();
        store.save(&room).await.unwrap();
        assert!(tokio::fs::metadata(dir.join(format!("{}.json", room.id())))
            .await
            .is_ok());

        let reopened = JsonFileRoomStore::open(&dir).await.unwrap();
        let loaded = reopened.load(room.id()).await.unwrap();
        assert_eq!(loaded, room);
        let alice = &loaded.participants()[0].id;
        assert_eq!(resolve_match(&loaded, alice).unwrap().recipient_name, "bob");

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn file_store_rejects_unknown_and_unsafe_ids() {
        let dir = temp_dir();
        let store = JsonFileRoomStore::open(&dir).await.unwrap();

        let unknown = Uuid::new_v4().to_string();
        assert!(matches!(store.load(&unknown).await, Err(StoreError::NotFound(_))));
        assert!(matches!(
            store.load("../../etc/passwd").await,
            Err(StoreError::NotFound(_))
        ));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn file_store_reports_corrupt_documents() {
        let dir = temp_dir();
        let store = JsonFileRoomStore::open(&dir).await.unwrap();
        let id = Uuid::new_v4().to_string();
        tokio::fs::write(dir.join(format!("{id}.json")), b"{ not json")
            .await
            .unwrap();

        assert!(matches!(store.load(&id).await, Err(StoreError::Read { .. })));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn locks_serialize_same_room_only() {
        let locks = RoomLocks::default();
        let held = locks.acquire("a").await;

        let other = tokio::time::timeout(Duration::from_millis(100), locks.acquire("b")).await;
        assert!(other.is_ok());

        let same = tokio::time::timeout(Duration::from_millis(50), locks.acquire("a")).await;
        assert!(same.is_err());

        drop(held);
        let again = tokio::time::timeout(Duration::from_millis(100), locks.acquire("a")).await;
        assert!(again.is_ok());
    }
}
