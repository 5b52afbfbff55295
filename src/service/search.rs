use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, instrument};

use crate::{
    dao::storage::{StorageEngine, all_of},
    model::{
        apperror::ApplicationError,
        entities::{EntityKind, Place},
        models::PlaceSearchInputType,
    },
};

/**
 * Searches places by location and amenities.
 *
 * States and cities are combined by union: a place matches if it lies in any listed state or any listed city.
 * With neither given, every place is a candidate. Amenities are combined by intersection: a candidate is kept only
 * if it is linked to every listed amenity. Unknown state, city and amenity ids are skipped.
 *
 * # Arguments
 * `storage`: The storage engine to search.
 * `filter`: The search filters.
 *
 * # Returns
 * The matching places without duplicates, in no particular order.
 */
#[instrument(skip(storage), fields(result))]
pub async fn search_places(storage: &dyn StorageEngine, filter: &PlaceSearchInputType) -> Result<Vec<Place>, ApplicationError> {
    let places = matching_places(storage, filter).await?;
    tracing::Span::current().record("result", places.len());
    Ok(places)
}

async fn matching_places(storage: &dyn StorageEngine, filter: &PlaceSearchInputType) -> Result<Vec<Place>, ApplicationError> {
    if filter.is_unconstrained() {
        return Ok(all_of::<Place>(storage.all(Some(EntityKind::Place)).await?));
    }

    let mut candidates: BTreeMap<String, Place> = BTreeMap::new();
    for state_id in &filter.states {
        for city in storage.cities_of_state(state_id).await? {
            candidates.extend(storage.places_of_city(&city.id).await?.into_iter().map(|place| (place.id.clone(), place)));
        }
    }
    for city_id in &filter.cities {
        if storage.get(EntityKind::City, city_id).await?.is_none() {
            debug!("Skipping unknown city {}", city_id);
            continue;
        }
        candidates.extend(storage.places_of_city(city_id).await?.into_iter().map(|place| (place.id.clone(), place)));
    }
    if filter.states.is_empty() && filter.cities.is_empty() {
        candidates = all_of::<Place>(storage.all(Some(EntityKind::Place)).await?).into_iter().map(|place| (place.id.clone(), place)).collect();
    }

    let mut required_amenities = BTreeSet::new();
    for amenity_id in &filter.amenities {
        if storage.get(EntityKind::Amenity, amenity_id).await?.is_some() {
            required_amenities.insert(amenity_id.clone());
        } else {
            debug!("Skipping unknown amenity {}", amenity_id);
        }
    }
    if required_amenities.is_empty() {
        return Ok(candidates.into_values().collect());
    }

    let mut places = Vec::with_capacity(candidates.len());
    for place in candidates.into_values() {
        let linked_amenities: BTreeSet<String> = storage.list_amenities(&place.id).await?.into_iter().map(|amenity| amenity.id).collect();
        if linked_amenities.is_superset(&required_amenities) {
            places.push(place);
        }
    }
    Ok(places)
}
