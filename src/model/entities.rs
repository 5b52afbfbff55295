use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/**
 * The entity types stored in the catalog.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Amenity,
    City,
    Place,
    Review,
    State,
    User,
}

impl EntityKind {
    /**
     * Every entity kind, in class name order.
     */
    pub const ALL: [EntityKind; 6] = [EntityKind::Amenity, EntityKind::City, EntityKind::Place, EntityKind::Review, EntityKind::State, EntityKind::User];

    /**
     * The class name used in composite keys and in the `__class__` discriminator.
     */
    pub fn class_name(self) -> &'static str {
        match self {
            EntityKind::Amenity => "Amenity",
            EntityKind::City => "City",
            EntityKind::Place => "Place",
            EntityKind::Review => "Review",
            EntityKind::State => "State",
            EntityKind::User => "User",
        }
    }
}

/**
 * Builds the `"Type.id"` key addressing an entity in the file backed index.
 */
pub fn composite_key(kind: EntityKind, id: &str) -> String {
    format!("{}.{}", kind.class_name(), id)
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
}

impl State {
    pub fn new(name: String) -> Self {
        let now = Utc::now();
        State { id: new_id(), created_at: now, updated_at: now, name }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub state_id: String,
    pub name: String,
}

impl City {
    pub fn new(state_id: String, name: String) -> Self {
        let now = Utc::now();
        City { id: new_id(), created_at: now, updated_at: now, state_id, name }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amenity {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
}

impl Amenity {
    pub fn new(name: String) -> Self {
        let now = Utc::now();
        Amenity { id: new_id(), created_at: now, updated_at: now, name }
    }
}

/**
 * A registered user. The password is always an argon2 PHC string, never the clear text.
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl User {
    pub fn new(email: String, password: String, first_name: Option<String>, last_name: Option<String>) -> Self {
        let now = Utc::now();
        User { id: new_id(), created_at: now, updated_at: now, email, password, first_name, last_name }
    }
}

/**
 * A rentable place.
 *
 * `amenity_ids` is the denormalized place to amenity relation. The file backed engine persists it as is,
 * the relational engine ignores it on save and fills it from the join table when loading.
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub city_id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub number_rooms: i32,
    #[serde(default)]
    pub number_bathrooms: i32,
    #[serde(default)]
    pub max_guest: i32,
    #[serde(default)]
    pub price_by_night: i32,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub amenity_ids: Vec<String>,
}

impl Place {
    pub fn new(city_id: String, user_id: String, name: String) -> Self {
        let now = Utc::now();
        Place {
            id: new_id(),
            created_at: now,
            updated_at: now,
            city_id,
            user_id,
            name,
            description: None,
            number_rooms: 0,
            number_bathrooms: 0,
            max_guest: 0,
            price_by_night: 0,
            latitude: None,
            longitude: None,
            amenity_ids: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub place_id: String,
    pub user_id: String,
    pub text: String,
}

impl Review {
    pub fn new(place_id: String, user_id: String, text: String) -> Self {
        let now = Utc::now();
        Review { id: new_id(), created_at: now, updated_at: now, place_id, user_id, text }
    }
}

/**
 * Any stored entity. Serialized as a flat object carrying a `__class__` discriminator,
 * which is both the persisted document value and the response representation.
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__class__")]
pub enum Entity {
    Amenity(Amenity),
    City(City),
    Place(Place),
    Review(Review),
    State(State),
    User(User),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Amenity(_) => EntityKind::Amenity,
            Entity::City(_) => EntityKind::City,
            Entity::Place(_) => EntityKind::Place,
            Entity::Review(_) => EntityKind::Review,
            Entity::State(_) => EntityKind::State,
            Entity::User(_) => EntityKind::User,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Entity::Amenity(amenity) => &amenity.id,
            Entity::City(city) => &city.id,
            Entity::Place(place) => &place.id,
            Entity::Review(review) => &review.id,
            Entity::State(state) => &state.id,
            Entity::User(user) => &user.id,
        }
    }

    /**
     * The composite `"Type.id"` key of this entity.
     */
    pub fn key(&self) -> String {
        composite_key(self.kind(), self.id())
    }

    /**
     * Refreshes `updated_at`. Called by the storage engines on every save.
     */
    pub fn touch(&mut self) {
        let now = Utc::now();
        match self {
            Entity::Amenity(amenity) => amenity.updated_at = now,
            Entity::City(city) => city.updated_at = now,
            Entity::Place(place) => place.updated_at = now,
            Entity::Review(review) => review.updated_at = now,
            Entity::State(state) => state.updated_at = now,
            Entity::User(user) => user.updated_at = now,
        }
    }

    /**
     * The entities this one references. Deleting any of them deletes this entity too.
     */
    pub fn parents(&self) -> Vec<(EntityKind, &str)> {
        match self {
            Entity::City(city) => vec![(EntityKind::State, city.state_id.as_str())],
            Entity::Place(place) => vec![(EntityKind::City, place.city_id.as_str()), (EntityKind::User, place.user_id.as_str())],
            Entity::Review(review) => vec![(EntityKind::Place, review.place_id.as_str()), (EntityKind::User, review.user_id.as_str())],
            Entity::Amenity(_) | Entity::State(_) | Entity::User(_) => vec![],
        }
    }
}

/**
 * Typed access to the variants of `Entity`.
 */
pub trait Model: Into<Entity> + Sized {
    const KIND: EntityKind;

    fn from_entity(entity: Entity) -> Option<Self>;
}

macro_rules! impl_model {
    ($model:ident) => {
        impl From<$model> for Entity {
            fn from(model: $model) -> Self {
                Entity::$model(model)
            }
        }

        impl Model for $model {
            const KIND: EntityKind = EntityKind::$model;

            fn from_entity(entity: Entity) -> Option<Self> {
                match entity {
                    Entity::$model(model) => Some(model),
                    _ => None,
                }
            }
        }
    };
}

impl_model!(Amenity);
impl_model!(City);
impl_model!(Place);
impl_model!(Review);
impl_model!(State);
impl_model!(User);
