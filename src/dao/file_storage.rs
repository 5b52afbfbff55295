use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, error, instrument};

use crate::{
    dao::storage::StorageEngine,
    model::{
        apperror::{ApplicationError, ErrorType},
        entities::{Amenity, Entity, EntityKind, Model, composite_key},
    },
};

/**
 * Storage engine keeping every entity in memory and mirroring it to a single JSON document.
 *
 * The document is an object keyed by `"Type.id"` whose values are the entities with their `__class__`.
 * All mutations hold the write lock until the document is flushed, so there is a single writer per process.
 * Each mutation is applied to a copy of the index which only replaces the live index once the flush succeeded.
 */
pub struct FileStorage {
    /**
     * Path of the JSON document.
     */
    file_path: PathBuf,
    /**
     * In memory index of all entities by composite key.
     */
    objects: RwLock<BTreeMap<String, Entity>>,
}

impl FileStorage {
    /**
     * Creates an empty file storage. Call `reload` to read the persisted document.
     *
     * # Arguments
     * `file_path`: Path of the JSON document.
     */
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        FileStorage { file_path: file_path.into(), objects: RwLock::new(BTreeMap::new()) }
    }

    /**
     * Reads and parses the document. A missing document is an empty index.
     * Keys are rebuilt from the entities themselves.
     */
    async fn read_document(file_path: &Path) -> Result<BTreeMap<String, Entity>, ApplicationError> {
        let contents = match tokio::fs::read(file_path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("No storage document at {}, starting empty", file_path.display());
                return Ok(BTreeMap::new());
            }
            Err(err) => return Err(ApplicationError::new(ErrorType::StorageError, format!("Failed to read storage document: {err}"))),
        };
        let document: BTreeMap<String, Entity> =
            serde_json::from_slice(&contents).map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to parse storage document: {err}")))?;
        Ok(document.into_values().map(|entity| (entity.key(), entity)).collect())
    }

    /**
     * Writes the index to a temporary sibling file and renames it over the document.
     */
    async fn flush(&self, objects: &BTreeMap<String, Entity>) -> Result<(), ApplicationError> {
        let document = serde_json::to_vec(objects).map_err(|err| ApplicationError::new(ErrorType::StorageError, format!("Failed to serialize storage document: {err}")))?;
        let mut temporary_path = self.file_path.clone().into_os_string();
        temporary_path.push(".tmp");
        let temporary_path = PathBuf::from(temporary_path);
        tokio::fs::write(&temporary_path, document).await.map_err(|err| {
            error!("Failed to write {}: {}", temporary_path.display(), err);
            ApplicationError::new(ErrorType::StorageError, format!("Failed to write storage document: {err}"))
        })?;
        tokio::fs::rename(&temporary_path, &self.file_path)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::StorageError, format!("Failed to replace storage document: {err}")))?;
        Ok(())
    }

    /**
     * Referential integrity: every parent the entity references must be stored.
     */
    fn check_parents(objects: &BTreeMap<String, Entity>, entity: &Entity) -> Result<(), ApplicationError> {
        for (kind, id) in entity.parents() {
            if !objects.contains_key(&composite_key(kind, id)) {
                debug!("{} {} references missing {} {}", entity.kind().class_name(), entity.id(), kind.class_name(), id);
                return Err(ApplicationError::new(ErrorType::ConstraintViolation, "Missing parent value".to_string()));
            }
        }
        Ok(())
    }

    /**
     * A user email may only be registered once.
     */
    fn check_unique_email(objects: &BTreeMap<String, Entity>, entity: &Entity) -> Result<(), ApplicationError> {
        let Entity::User(user) = entity else {
            return Ok(());
        };
        let taken = objects.values().any(|stored| matches!(stored, Entity::User(other) if other.email == user.email && other.id != user.id));
        if taken {
            debug!("Email of {} already registered", entity.key());
            return Err(ApplicationError::new(ErrorType::ConstraintViolation, "Already exists".to_string()));
        }
        Ok(())
    }

    /**
     * Validates and stores the entity under the write lock.
     *
     * # Arguments
     * `entity`: The entity to store. Its `updated_at` and place links are refreshed in place.
     * `must_exist`: Fail with `NotFound` instead of inserting an absent entity.
     */
    async fn write(&self, entity: &mut Entity, must_exist: bool) -> Result<(), ApplicationError> {
        let mut objects = self.objects.write().await;
        if must_exist && !objects.contains_key(&entity.key()) {
            debug!("{} was removed before the update", entity.key());
            return Err(ApplicationError::not_found(entity.kind().class_name()));
        }
        Self::check_parents(&objects, entity)?;
        Self::check_unique_email(&objects, entity)?;
        if let Entity::Place(place) = entity {
            // Links only change through link_amenity and unlink_amenity.
            place.amenity_ids = match objects.get(&composite_key(EntityKind::Place, &place.id)) {
                Some(Entity::Place(stored)) => stored.amenity_ids.clone(),
                _ => vec![],
            };
        }
        entity.touch();
        let mut updated = objects.clone();
        updated.insert(entity.key(), entity.clone());
        self.flush(&updated).await?;
        *objects = updated;
        debug!("Saved {}", entity.key());
        Ok(())
    }

    /**
     * Collects the key of the root entity and, transitively, of every entity referencing a collected one.
     */
    fn cascade(objects: &BTreeMap<String, Entity>, root_key: String) -> BTreeSet<String> {
        let mut removed = BTreeSet::from([root_key]);
        loop {
            let dependents: Vec<String> = objects
                .iter()
                .filter(|(key, _)| !removed.contains(*key))
                .filter(|(_, entity)| entity.parents().into_iter().any(|(kind, id)| removed.contains(&composite_key(kind, id))))
                .map(|(key, _)| key.clone())
                .collect();
            if dependents.is_empty() {
                return removed;
            }
            removed.extend(dependents);
        }
    }
}

#[async_trait]
impl StorageEngine for FileStorage {
    async fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Entity>, ApplicationError> {
        Ok(self.objects.read().await.get(&composite_key(kind, id)).cloned())
    }

    async fn all(&self, kind: Option<EntityKind>) -> Result<BTreeMap<String, Entity>, ApplicationError> {
        let objects = self.objects.read().await;
        Ok(objects.iter().filter(|(_, entity)| kind.is_none_or(|kind| entity.kind() == kind)).map(|(key, entity)| (key.clone(), entity.clone())).collect())
    }

    #[instrument(skip(self, entity), fields(key = entity.key()))]
    async fn save(&self, entity: &mut Entity) -> Result<(), ApplicationError> {
        self.write(entity, false).await
    }

    #[instrument(skip(self, entity), fields(key = entity.key()))]
    async fn update(&self, entity: &mut Entity) -> Result<(), ApplicationError> {
        self.write(entity, true).await
    }

    #[instrument(skip(self, entity), fields(key = entity.key()))]
    async fn delete(&self, entity: &Entity) -> Result<(), ApplicationError> {
        let mut objects = self.objects.write().await;
        let key = entity.key();
        if !objects.contains_key(&key) {
            debug!("{} already absent", key);
            return Ok(());
        }
        let removed = Self::cascade(&objects, key);
        let mut updated: BTreeMap<String, Entity> = objects.iter().filter(|(key, _)| !removed.contains(*key)).map(|(key, entity)| (key.clone(), entity.clone())).collect();
        if entity.kind() == EntityKind::Amenity {
            for stored in updated.values_mut() {
                if let Entity::Place(place) = stored {
                    place.amenity_ids.retain(|amenity_id| amenity_id != entity.id());
                }
            }
        }
        self.flush(&updated).await?;
        *objects = updated;
        debug!("Deleted {} entities", removed.len());
        Ok(())
    }

    #[instrument(skip(self), fields(file = %self.file_path.display()))]
    async fn reload(&self) -> Result<(), ApplicationError> {
        let document = Self::read_document(&self.file_path).await?;
        debug!("Loaded {} entities", document.len());
        *self.objects.write().await = document;
        Ok(())
    }

    async fn list_amenities(&self, place_id: &str) -> Result<Vec<Amenity>, ApplicationError> {
        let objects = self.objects.read().await;
        let Some(Entity::Place(place)) = objects.get(&composite_key(EntityKind::Place, place_id)) else {
            return Ok(vec![]);
        };
        Ok(place
            .amenity_ids
            .iter()
            .filter_map(|amenity_id| objects.get(&composite_key(EntityKind::Amenity, amenity_id)).cloned())
            .filter_map(Amenity::from_entity)
            .collect())
    }

    #[instrument(skip(self))]
    async fn link_amenity(&self, place_id: &str, amenity_id: &str) -> Result<bool, ApplicationError> {
        let mut objects = self.objects.write().await;
        if !objects.contains_key(&composite_key(EntityKind::Amenity, amenity_id)) {
            return Err(ApplicationError::not_found("Amenity"));
        }
        let mut updated = objects.clone();
        let Some(Entity::Place(place)) = updated.get_mut(&composite_key(EntityKind::Place, place_id)) else {
            return Err(ApplicationError::not_found("Place"));
        };
        if place.amenity_ids.iter().any(|linked| linked == amenity_id) {
            return Ok(false);
        }
        place.amenity_ids.push(amenity_id.to_string());
        place.updated_at = chrono::Utc::now();
        self.flush(&updated).await?;
        *objects = updated;
        Ok(true)
    }

    #[instrument(skip(self))]
    async fn unlink_amenity(&self, place_id: &str, amenity_id: &str) -> Result<bool, ApplicationError> {
        let mut objects = self.objects.write().await;
        let mut updated = objects.clone();
        let Some(Entity::Place(place)) = updated.get_mut(&composite_key(EntityKind::Place, place_id)) else {
            return Err(ApplicationError::not_found("Place"));
        };
        let linked_before = place.amenity_ids.len();
        place.amenity_ids.retain(|linked| linked != amenity_id);
        if place.amenity_ids.len() == linked_before {
            return Ok(false);
        }
        place.updated_at = chrono::Utc::now();
        self.flush(&updated).await?;
        *objects = updated;
        Ok(true)
    }
}
