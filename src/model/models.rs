use std::collections::BTreeSet;

use crate::model::entities::Place;

/**
 * Input for creating an entity that only carries a name (state, city, amenity).
 */
#[derive(Debug, Clone)]
pub struct NamedAddInputType {
    pub name: String,
}

/**
 * Input for updating an entity that only carries a name.
 */
#[derive(Debug, Clone, Default)]
pub struct NamedUpdateInputType {
    pub name: Option<String>,
}

/**
 * Input for creating a user. The password is still in clear text here.
 */
#[derive(Debug, Clone)]
pub struct UserAddInputType {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/**
 * Input for updating a user. The email can not be changed.
 */
#[derive(Debug, Clone, Default)]
pub struct UserUpdateInputType {
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/**
 * Optional descriptive attributes of a place, shared by create and update.
 */
#[derive(Debug, Clone, Default)]
pub struct PlaceAttributesInputType {
    pub description: Option<String>,
    pub number_rooms: Option<i32>,
    pub number_bathrooms: Option<i32>,
    pub max_guest: Option<i32>,
    pub price_by_night: Option<i32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl PlaceAttributesInputType {
    /**
     * Copies every present attribute onto the place, leaving the others untouched.
     */
    pub fn apply(self, place: &mut Place) {
        if let Some(description) = self.description {
            place.description = Some(description);
        }
        if let Some(number_rooms) = self.number_rooms {
            place.number_rooms = number_rooms;
        }
        if let Some(number_bathrooms) = self.number_bathrooms {
            place.number_bathrooms = number_bathrooms;
        }
        if let Some(max_guest) = self.max_guest {
            place.max_guest = max_guest;
        }
        if let Some(price_by_night) = self.price_by_night {
            place.price_by_night = price_by_night;
        }
        if let Some(latitude) = self.latitude {
            place.latitude = Some(latitude);
        }
        if let Some(longitude) = self.longitude {
            place.longitude = Some(longitude);
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlaceAddInputType {
    /**
     * Required. Both fields are checked by the service once the city is known to exist.
     */
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub attributes: PlaceAttributesInputType,
}

#[derive(Debug, Clone, Default)]
pub struct PlaceUpdateInputType {
    pub name: Option<String>,
    pub attributes: PlaceAttributesInputType,
}

#[derive(Debug, Clone)]
pub struct ReviewAddInputType {
    pub user_id: String,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct ReviewUpdateInputType {
    pub text: Option<String>,
}

/**
 * Filters for the place search. An empty set means no constraint on that dimension.
 */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceSearchInputType {
    pub states: BTreeSet<String>,
    pub cities: BTreeSet<String>,
    pub amenities: BTreeSet<String>,
}

impl PlaceSearchInputType {
    /**
     * True when none of the three filters carries an id.
     */
    pub fn is_unconstrained(&self) -> bool {
        self.states.is_empty() && self.cities.is_empty() && self.amenities.is_empty()
    }
}

/**
 * Number of stored entities per type.
 */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogStatsOutputType {
    pub amenities: usize,
    pub cities: usize,
    pub places: usize,
    pub reviews: usize,
    pub states: usize,
    pub users: usize,
}
