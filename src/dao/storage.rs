use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::model::{
    apperror::ApplicationError,
    entities::{Amenity, City, Entity, EntityKind, Model, Place, Review},
};

/**
 * Contract shared by the file backed and the relational storage engines.
 *
 * Route and search logic only ever talks to this trait. Whether the place to amenity relation is a
 * denormalized id list or a join table is hidden behind `list_amenities`, `link_amenity` and `unlink_amenity`.
 */
#[async_trait]
pub trait StorageEngine: Send + Sync {
    /**
     * Looks up a single entity. An unknown id is `None`, never an error.
     */
    async fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Entity>, ApplicationError>;

    /**
     * All entities keyed by their composite `"Type.id"` key, optionally restricted to one kind.
     */
    async fn all(&self, kind: Option<EntityKind>) -> Result<BTreeMap<String, Entity>, ApplicationError>;

    /**
     * Cardinality of `all` for the same argument.
     */
    async fn count(&self, kind: Option<EntityKind>) -> Result<usize, ApplicationError> {
        Ok(self.all(kind).await?.len())
    }

    /**
     * Persists a new or modified entity and refreshes its `updated_at`.
     * A user whose email belongs to another user is rejected with `ConstraintViolation`.
     */
    async fn save(&self, entity: &mut Entity) -> Result<(), ApplicationError>;

    /**
     * Like `save`, but only for an entity that is still stored. Fails with `NotFound` once it has been deleted.
     */
    async fn update(&self, entity: &mut Entity) -> Result<(), ApplicationError>;

    /**
     * Removes an entity together with everything depending on it. Deleting an absent entity is a no-op.
     */
    async fn delete(&self, entity: &Entity) -> Result<(), ApplicationError>;

    /**
     * Re-reads persisted state. Only meaningful for the file backed engine.
     */
    async fn reload(&self) -> Result<(), ApplicationError>;

    /**
     * Amenities linked to the place. An unknown place has none.
     */
    async fn list_amenities(&self, place_id: &str) -> Result<Vec<Amenity>, ApplicationError>;

    /**
     * Links an amenity to a place. Returns false if they were already linked.
     */
    async fn link_amenity(&self, place_id: &str, amenity_id: &str) -> Result<bool, ApplicationError>;

    /**
     * Removes the link between a place and an amenity. Returns false if they were not linked.
     */
    async fn unlink_amenity(&self, place_id: &str, amenity_id: &str) -> Result<bool, ApplicationError>;

    async fn cities_of_state(&self, state_id: &str) -> Result<Vec<City>, ApplicationError> {
        let cities = all_of::<City>(self.all(Some(EntityKind::City)).await?);
        Ok(cities.into_iter().filter(|city| city.state_id == state_id).collect())
    }

    async fn places_of_city(&self, city_id: &str) -> Result<Vec<Place>, ApplicationError> {
        let places = all_of::<Place>(self.all(Some(EntityKind::Place)).await?);
        Ok(places.into_iter().filter(|place| place.city_id == city_id).collect())
    }

    async fn reviews_of_place(&self, place_id: &str) -> Result<Vec<Review>, ApplicationError> {
        let reviews = all_of::<Review>(self.all(Some(EntityKind::Review)).await?);
        Ok(reviews.into_iter().filter(|review| review.place_id == place_id).collect())
    }
}

/**
 * Keeps the entities of type `T` from an `all` result, in key order.
 */
pub fn all_of<T: Model>(entities: BTreeMap<String, Entity>) -> Vec<T> {
    entities.into_values().filter_map(T::from_entity).collect()
}
