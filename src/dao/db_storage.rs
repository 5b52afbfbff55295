use std::borrow::Cow;
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres, Transaction, postgres::PgRow};
use tracing::{Instrument, instrument};

use crate::{
    dao::storage::StorageEngine,
    model::{
        apperror::{ApplicationError, ErrorType},
        entities::{Amenity, City, Entity, EntityKind, Place, Review, State, User},
    },
};

/**
 * Database response type for states and amenities.
 */
pub type NamedDbResp = (String, String, DateTime<Utc>, DateTime<Utc>);

/**
 * Database response type for cities.
 */
pub type CityDbResp = (String, String, String, DateTime<Utc>, DateTime<Utc>);

/**
 * Database response type for users.
 */
pub type UserDbResp = (String, String, String, Option<String>, Option<String>, DateTime<Utc>, DateTime<Utc>);

/**
 * Database response type for places, including the aggregated amenity ids.
 */
pub type PlaceDbResp = (String, String, String, String, Option<String>, i32, i32, i32, i32, Option<f64>, Option<f64>, DateTime<Utc>, DateTime<Utc>, Vec<String>);

/**
 * Database response type for reviews.
 */
pub type ReviewDbResp = (String, String, String, String, DateTime<Utc>, DateTime<Utc>);

/**
 * SQL query for states, optionally restricted to one id.
 */
const QUERY_STATES: &str = "SELECT id, name, created_at, updated_at FROM states WHERE ($1::text IS NULL OR id = $1) ORDER BY id";

/**
 * SQL query for amenities, optionally restricted to one id.
 */
const QUERY_AMENITIES: &str = "SELECT id, name, created_at, updated_at FROM amenities WHERE ($1::text IS NULL OR id = $1) ORDER BY id";

/**
 * SQL query for cities, optionally restricted to one id and/or one state.
 */
const QUERY_CITIES: &str = "SELECT id, state_id, name, created_at, updated_at FROM cities WHERE ($1::text IS NULL OR id = $1) AND ($2::text IS NULL OR state_id = $2) ORDER BY id";

/**
 * SQL query for users, optionally restricted to one id.
 */
const QUERY_USERS: &str = "SELECT id, email, password, first_name, last_name, created_at, updated_at FROM users WHERE ($1::text IS NULL OR id = $1) ORDER BY id";

/**
 * SQL query for places with their amenity ids, optionally restricted to one id and/or one city.
 */
const QUERY_PLACES: &str = "SELECT p.id, p.city_id, p.user_id, p.name, p.description, p.number_rooms, p.number_bathrooms, p.max_guest, p.price_by_night,
                                   p.latitude, p.longitude, p.created_at, p.updated_at,
                                   COALESCE(ARRAY_AGG(pa.amenity_id::text ORDER BY pa.amenity_id) FILTER (WHERE pa.amenity_id IS NOT NULL), '{}'::text[]) AS amenity_ids
                            FROM places p LEFT JOIN place_amenity pa ON pa.place_id = p.id
                            WHERE ($1::text IS NULL OR p.id = $1) AND ($2::text IS NULL OR p.city_id = $2)
                            GROUP BY p.id
                            ORDER BY p.id";

/**
 * SQL query for reviews, optionally restricted to one id and/or one place.
 */
const QUERY_REVIEWS: &str = "SELECT id, place_id, user_id, text, created_at, updated_at FROM reviews WHERE ($1::text IS NULL OR id = $1) AND ($2::text IS NULL OR place_id = $2) ORDER BY id";

/**
 * SQL query for the amenities linked to a place.
 */
const QUERY_PLACE_AMENITIES: &str = "SELECT a.id, a.name, a.created_at, a.updated_at FROM amenities a JOIN place_amenity pa ON pa.amenity_id = a.id WHERE pa.place_id = $1 ORDER BY a.id";

/**
 * SQL query for the amenity ids linked to a place.
 */
const QUERY_PLACE_AMENITY_IDS: &str = "SELECT amenity_id::text FROM place_amenity WHERE place_id = $1 ORDER BY amenity_id";

const UPSERT_STATE: &str = "INSERT INTO states (id, name, created_at, updated_at) VALUES ($1, $2, $3, $4)
                            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, updated_at = EXCLUDED.updated_at";

const UPSERT_AMENITY: &str = "INSERT INTO amenities (id, name, created_at, updated_at) VALUES ($1, $2, $3, $4)
                              ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, updated_at = EXCLUDED.updated_at";

const UPSERT_CITY: &str = "INSERT INTO cities (id, state_id, name, created_at, updated_at) VALUES ($1, $2, $3, $4, $5)
                           ON CONFLICT (id) DO UPDATE SET state_id = EXCLUDED.state_id, name = EXCLUDED.name, updated_at = EXCLUDED.updated_at";

const UPSERT_USER: &str = "INSERT INTO users (id, email, password, first_name, last_name, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7)
                           ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email, password = EXCLUDED.password, first_name = EXCLUDED.first_name,
                           last_name = EXCLUDED.last_name, updated_at = EXCLUDED.updated_at";

const UPSERT_PLACE: &str = "INSERT INTO places (id, city_id, user_id, name, description, number_rooms, number_bathrooms, max_guest, price_by_night, latitude, longitude, created_at, updated_at)
                            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                            ON CONFLICT (id) DO UPDATE SET city_id = EXCLUDED.city_id, user_id = EXCLUDED.user_id, name = EXCLUDED.name, description = EXCLUDED.description,
                            number_rooms = EXCLUDED.number_rooms, number_bathrooms = EXCLUDED.number_bathrooms, max_guest = EXCLUDED.max_guest,
                            price_by_night = EXCLUDED.price_by_night, latitude = EXCLUDED.latitude, longitude = EXCLUDED.longitude, updated_at = EXCLUDED.updated_at";

const UPSERT_REVIEW: &str = "INSERT INTO reviews (id, place_id, user_id, text, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6)
                             ON CONFLICT (id) DO UPDATE SET place_id = EXCLUDED.place_id, user_id = EXCLUDED.user_id, text = EXCLUDED.text, updated_at = EXCLUDED.updated_at";

/**
 * SQL statement linking an amenity to a place. Existing links are left alone.
 */
const LINK_AMENITY: &str = "INSERT INTO place_amenity (place_id, amenity_id) VALUES ($1, $2) ON CONFLICT DO NOTHING";

const UNLINK_AMENITY: &str = "DELETE FROM place_amenity WHERE place_id = $1 AND amenity_id = $2";

const TOUCH_PLACE: &str = "UPDATE places SET updated_at = now() WHERE id = $1";

const PLACE_EXISTS: &str = "SELECT EXISTS (SELECT 1 FROM places WHERE id = $1)";

const AMENITY_EXISTS: &str = "SELECT EXISTS (SELECT 1 FROM amenities WHERE id = $1)";

/**
 * Table backing each entity kind.
 */
fn table_name(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Amenity => "amenities",
        EntityKind::City => "cities",
        EntityKind::Place => "places",
        EntityKind::Review => "reviews",
        EntityKind::State => "states",
        EntityKind::User => "users",
    }
}

/**
 * Storage engine mapping every entity kind to a Postgres table and the place to amenity relation to the `place_amenity` join table.
 *
 * Dependent rows are removed by `ON DELETE CASCADE` foreign keys. Every write runs in its own transaction.
 */
pub struct DbStorage {
    /**
     * Connection pool for database operations.
     */
    connection_pool: Pool<Postgres>,
}

impl DbStorage {
    /**
     * Creates a new instance of `DbStorage`.
     *
     * # Arguments
     * `connection_pool`: Connection pool to a database with the schema from `migrations/` applied.
     */
    pub fn new(connection_pool: Pool<Postgres>) -> Self {
        DbStorage { connection_pool }
    }

    /**
     * Runs a select and converts each row.
     *
     * # Arguments
     * `query`: SQL select.
     * `binds`: Values for the positional parameters, in order.
     */
    async fn fetch<R, T>(&self, query: &'static str, binds: &[Option<&str>]) -> Result<Vec<T>, ApplicationError>
    where
        R: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin,
        T: From<R>,
    {
        let span = tracing::Span::current();
        let mut select = sqlx::query_as::<Postgres, R>(query);
        for bind in binds {
            select = select.bind(*bind);
        }
        let rows = select
            .fetch_all(&self.connection_pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query: {err}")))?;
        Ok(rows.into_iter().map(T::from).collect())
    }

    /**
     * Entities of one kind, optionally restricted to one id.
     */
    async fn fetch_entities(&self, kind: EntityKind, id: Option<&str>) -> Result<Vec<Entity>, ApplicationError> {
        let entities = match kind {
            EntityKind::Amenity => self.fetch::<NamedDbResp, Amenity>(QUERY_AMENITIES, &[id]).await?.into_iter().map(Entity::from).collect(),
            EntityKind::City => self.fetch::<CityDbResp, City>(QUERY_CITIES, &[id, None]).await?.into_iter().map(Entity::from).collect(),
            EntityKind::Place => self.fetch::<PlaceDbResp, Place>(QUERY_PLACES, &[id, None]).await?.into_iter().map(Entity::from).collect(),
            EntityKind::Review => self.fetch::<ReviewDbResp, Review>(QUERY_REVIEWS, &[id, None]).await?.into_iter().map(Entity::from).collect(),
            EntityKind::State => self.fetch::<NamedDbResp, State>(QUERY_STATES, &[id]).await?.into_iter().map(Entity::from).collect(),
            EntityKind::User => self.fetch::<UserDbResp, User>(QUERY_USERS, &[id]).await?.into_iter().map(Entity::from).collect(),
        };
        Ok(entities)
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, ApplicationError> {
        self.connection_pool.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))
    }

    /**
     * Commits the transaction if the result is ok, otherwise rolls it back and returns the original error.
     */
    async fn finish<T>(transaction: Transaction<'static, Postgres>, result: Result<T, ApplicationError>) -> Result<T, ApplicationError> {
        match result {
            Ok(value) => {
                transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?;
                Ok(value)
            }
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                Err(err)
            }
        }
    }

    /**
     * Inserts or updates the row of an entity. Place links are not touched.
     */
    async fn upsert(transaction: &mut PgConnection, entity: &Entity) -> Result<(), ApplicationError> {
        let query = match entity {
            Entity::Amenity(amenity) => sqlx::query(UPSERT_AMENITY).bind(&amenity.id).bind(&amenity.name).bind(amenity.created_at).bind(amenity.updated_at),
            Entity::State(state) => sqlx::query(UPSERT_STATE).bind(&state.id).bind(&state.name).bind(state.created_at).bind(state.updated_at),
            Entity::City(city) => sqlx::query(UPSERT_CITY).bind(&city.id).bind(&city.state_id).bind(&city.name).bind(city.created_at).bind(city.updated_at),
            Entity::User(user) => sqlx::query(UPSERT_USER)
                .bind(&user.id)
                .bind(&user.email)
                .bind(&user.password)
                .bind(&user.first_name)
                .bind(&user.last_name)
                .bind(user.created_at)
                .bind(user.updated_at),
            Entity::Place(place) => sqlx::query(UPSERT_PLACE)
                .bind(&place.id)
                .bind(&place.city_id)
                .bind(&place.user_id)
                .bind(&place.name)
                .bind(&place.description)
                .bind(place.number_rooms)
                .bind(place.number_bathrooms)
                .bind(place.max_guest)
                .bind(place.price_by_night)
                .bind(place.latitude)
                .bind(place.longitude)
                .bind(place.created_at)
                .bind(place.updated_at),
            Entity::Review(review) => sqlx::query(UPSERT_REVIEW).bind(&review.id).bind(&review.place_id).bind(&review.user_id).bind(&review.text).bind(review.created_at).bind(review.updated_at),
        };
        query.execute(transaction).await.map_err(|err| Self::handle_database_error(err.as_database_error()))?;
        Ok(())
    }

    /**
     * Locks the row of the entity until the transaction ends.
     *
     * # Returns
     * Whether the row exists.
     */
    async fn lock_row(transaction: &mut PgConnection, entity: &Entity) -> Result<bool, ApplicationError> {
        let row: Option<(String,)> = sqlx::query_as(&format!("SELECT id FROM {} WHERE id = $1 FOR UPDATE", table_name(entity.kind())))
            .bind(entity.id())
            .fetch_optional(transaction)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to lock {}: {err}", entity.key())))?;
        Ok(row.is_some())
    }

    /**
     * Upserts the entity and reads back the place links.
     *
     * # Arguments
     * `must_exist`: Fail with `NotFound` instead of inserting an absent row.
     */
    async fn store(transaction: &mut PgConnection, entity: &Entity, must_exist: bool) -> Result<Option<Vec<String>>, ApplicationError> {
        if must_exist && !Self::lock_row(&mut *transaction, entity).await? {
            return Err(ApplicationError::not_found(entity.kind().class_name()));
        }
        Self::upsert(&mut *transaction, entity).await?;
        match entity {
            Entity::Place(place) => Self::amenity_ids(&mut *transaction, &place.id).await.map(Some),
            _ => Ok(None),
        }
    }

    async fn write(&self, entity: &mut Entity, must_exist: bool) -> Result<(), ApplicationError> {
        entity.touch();
        let mut transaction = self.begin().await?;
        let result = Self::store(&mut transaction, entity, must_exist).await;
        let amenity_ids = Self::finish(transaction, result).await?;
        if let (Entity::Place(place), Some(amenity_ids)) = (entity, amenity_ids) {
            place.amenity_ids = amenity_ids;
        }
        Ok(())
    }

    async fn amenity_ids(transaction: &mut PgConnection, place_id: &str) -> Result<Vec<String>, ApplicationError> {
        let rows: Vec<(String,)> = sqlx::query_as(QUERY_PLACE_AMENITY_IDS)
            .bind(place_id)
            .fetch_all(transaction)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to query amenity ids: {err}")))?;
        Ok(rows.into_iter().map(|(amenity_id,)| amenity_id).collect())
    }

    async fn exists(transaction: &mut PgConnection, query: &'static str, id: &str) -> Result<bool, ApplicationError> {
        let (exists,): (bool,) = sqlx::query_as(query)
            .bind(id)
            .fetch_one(transaction)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute existence query: {err}")))?;
        Ok(exists)
    }

    async fn link(transaction: &mut PgConnection, place_id: &str, amenity_id: &str) -> Result<bool, ApplicationError> {
        if !Self::exists(&mut *transaction, PLACE_EXISTS, place_id).await? {
            return Err(ApplicationError::not_found("Place"));
        }
        if !Self::exists(&mut *transaction, AMENITY_EXISTS, amenity_id).await? {
            return Err(ApplicationError::not_found("Amenity"));
        }
        let result = sqlx::query(LINK_AMENITY)
            .bind(place_id)
            .bind(amenity_id)
            .execute(&mut *transaction)
            .await
            .map_err(|err| Self::handle_database_error(err.as_database_error()))?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        sqlx::query(TOUCH_PLACE).bind(place_id).execute(&mut *transaction).await.map_err(|err| Self::handle_database_error(err.as_database_error()))?;
        Ok(true)
    }

    async fn unlink(transaction: &mut PgConnection, place_id: &str, amenity_id: &str) -> Result<bool, ApplicationError> {
        if !Self::exists(&mut *transaction, PLACE_EXISTS, place_id).await? {
            return Err(ApplicationError::not_found("Place"));
        }
        let result = sqlx::query(UNLINK_AMENITY)
            .bind(place_id)
            .bind(amenity_id)
            .execute(&mut *transaction)
            .await
            .map_err(|err| Self::handle_database_error(err.as_database_error()))?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        sqlx::query(TOUCH_PLACE).bind(place_id).execute(&mut *transaction).await.map_err(|err| Self::handle_database_error(err.as_database_error()))?;
        Ok(true)
    }

    /**
     * Handles database errors and maps them to application errors.
     *
     * # Arguments
     * `error`: The database error to handle.
     *
     * # Returns
     * An `ApplicationError` corresponding to the database error.
     */
    fn handle_database_error(error: Option<&dyn sqlx::error::DatabaseError>) -> ApplicationError {
        if let Some(db_error) = error {
            tracing::debug!("Database error: {}", db_error);
            if db_error.code() == Some(Cow::Borrowed("23505")) {
                // Unique violation
                return ApplicationError::new(ErrorType::ConstraintViolation, "Already exists".to_string());
            } else if db_error.code() == Some(Cow::Borrowed("23503")) {
                // Foreign key violation
                return ApplicationError::new(ErrorType::ConstraintViolation, "Missing parent value".to_string());
            } else if db_error.code() == Some(Cow::Borrowed("22001")) {
                // Value too long
                return ApplicationError::new(ErrorType::Validation, "Value too long".to_string());
            }
            tracing::error!("Unhandled database error: {}", db_error);
            return ApplicationError::new(ErrorType::DatabaseError, "Unhandled database error".to_string());
        }
        ApplicationError::new(ErrorType::DatabaseError, "Failed to execute database operation".to_string())
    }
}

#[async_trait]
impl StorageEngine for DbStorage {
    #[instrument(skip(self))]
    async fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Entity>, ApplicationError> {
        Ok(self.fetch_entities(kind, Some(id)).await?.into_iter().next())
    }

    #[instrument(skip(self))]
    async fn all(&self, kind: Option<EntityKind>) -> Result<BTreeMap<String, Entity>, ApplicationError> {
        let kinds = match kind {
            Some(kind) => vec![kind],
            None => EntityKind::ALL.to_vec(),
        };
        let mut entities = BTreeMap::new();
        for kind in kinds {
            entities.extend(self.fetch_entities(kind, None).await?.into_iter().map(|entity| (entity.key(), entity)));
        }
        Ok(entities)
    }

    #[instrument(skip(self))]
    async fn count(&self, kind: Option<EntityKind>) -> Result<usize, ApplicationError> {
        let kinds = match kind {
            Some(kind) => vec![kind],
            None => EntityKind::ALL.to_vec(),
        };
        let mut total = 0;
        for kind in kinds {
            let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table_name(kind)))
                .fetch_one(&self.connection_pool)
                .await
                .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to count {}: {err}", table_name(kind))))?;
            total += usize::try_from(count).map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Invalid row count: {err}")))?;
        }
        Ok(total)
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
        let mut transaction = self.begin().await?;
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table_name(entity.kind())))
            .bind(entity.id())
            .execute(&mut *transaction)
            .await
            .map_err(|err| Self::handle_database_error(err.as_database_error()));
        let result = Self::finish(transaction, result).await?;
        if result.rows_affected() == 0 {
            tracing::debug!("{} already absent", entity.key());
        }
        Ok(())
    }

    async fn reload(&self) -> Result<(), ApplicationError> {
        tracing::debug!("Relational storage has nothing to reload");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_amenities(&self, place_id: &str) -> Result<Vec<Amenity>, ApplicationError> {
        self.fetch::<NamedDbResp, Amenity>(QUERY_PLACE_AMENITIES, &[Some(place_id)]).await
    }

    #[instrument(skip(self))]
    async fn link_amenity(&self, place_id: &str, amenity_id: &str) -> Result<bool, ApplicationError> {
        let mut transaction = self.begin().await?;
        let result = Self::link(&mut transaction, place_id, amenity_id).await;
        Self::finish(transaction, result).await
    }

    #[instrument(skip(self))]
    async fn unlink_amenity(&self, place_id: &str, amenity_id: &str) -> Result<bool, ApplicationError> {
        let mut transaction = self.begin().await?;
        let result = Self::unlink(&mut transaction, place_id, amenity_id).await;
        Self::finish(transaction, result).await
    }

    #[instrument(skip(self))]
    async fn cities_of_state(&self, state_id: &str) -> Result<Vec<City>, ApplicationError> {
        self.fetch::<CityDbResp, City>(QUERY_CITIES, &[None, Some(state_id)]).await
    }

    #[instrument(skip(self))]
    async fn places_of_city(&self, city_id: &str) -> Result<Vec<Place>, ApplicationError> {
        self.fetch::<PlaceDbResp, Place>(QUERY_PLACES, &[None, Some(city_id)]).await
    }

    #[instrument(skip(self))]
    async fn reviews_of_place(&self, place_id: &str) -> Result<Vec<Review>, ApplicationError> {
        self.fetch::<ReviewDbResp, Review>(QUERY_REVIEWS, &[None, Some(place_id)]).await
    }
}

impl From<NamedDbResp> for State {
    fn from(row: NamedDbResp) -> Self {
        let (id, name, created_at, updated_at) = row;
        State { id, created_at, updated_at, name }
    }
}

impl From<NamedDbResp> for Amenity {
    fn from(row: NamedDbResp) -> Self {
        let (id, name, created_at, updated_at) = row;
        Amenity { id, created_at, updated_at, name }
    }
}

impl From<CityDbResp> for City {
    fn from(row: CityDbResp) -> Self {
        let (id, state_id, name, created_at, updated_at) = row;
        City { id, created_at, updated_at, state_id, name }
    }
}

impl From<UserDbResp> for User {
    fn from(row: UserDbResp) -> Self {
        let (id, email, password, first_name, last_name, created_at, updated_at) = row;
        User { id, created_at, updated_at, email, password, first_name, last_name }
    }
}

impl From<PlaceDbResp> for Place {
    fn from(row: PlaceDbResp) -> Self {
        let (id, city_id, user_id, name, description, number_rooms, number_bathrooms, max_guest, price_by_night, latitude, longitude, created_at, updated_at, amenity_ids) = row;
        Place { id, created_at, updated_at, city_id, user_id, name, description, number_rooms, number_bathrooms, max_guest, price_by_night, latitude, longitude, amenity_ids }
    }
}

impl From<ReviewDbResp> for Review {
    fn from(row: ReviewDbResp) -> Self {
        let (id, place_id, user_id, text, created_at, updated_at) = row;
        Review { id, created_at, updated_at, place_id, user_id, text }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_place_row_conversion() {
        let now = Utc::now();
        let row: PlaceDbResp = (
            "p1".to_string(),
            "c1".to_string(),
            "u1".to_string(),
            "Loft".to_string(),
            None,
            2,
            1,
            4,
            120,
            Some(37.77),
            Some(-122.41),
            now,
            now,
            vec!["a1".to_string()],
        );
        let place = Place::from(row);
        assert_eq!(place.id, "p1");
        assert_eq!(place.price_by_night, 120);
        assert_eq!(place.amenity_ids, vec!["a1".to_string()]);
    }

    #[test]
    fn test_table_names_are_distinct() {
        let names: std::collections::BTreeSet<&str> = EntityKind::ALL.into_iter().map(table_name).collect();
        assert_eq!(names.len(), EntityKind::ALL.len());
    }
}
