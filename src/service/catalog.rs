use std::sync::Arc;

use tracing::{info, instrument};

use crate::{
    dao::storage::{StorageEngine, all_of},
    model::{
        apperror::{ApplicationError, ErrorType},
        entities::{Amenity, City, Entity, EntityKind, Model, Place, Review, State, User},
        models::{
            CatalogStatsOutputType, NamedAddInputType, NamedUpdateInputType, PlaceAddInputType, PlaceSearchInputType, PlaceUpdateInputType, ReviewAddInputType, ReviewUpdateInputType,
            UserAddInputType, UserUpdateInputType,
        },
    },
    service::{password::hash_password, search::search_places},
};

/**
 * Represents the service for managing the rental catalog.
 *
 * All input has been validated for presence by the caller. This service checks that referenced entities exist
 * before anything is persisted, so a failed request never leaves a partial write behind.
 */
pub struct CatalogService {
    /**
     * The storage engine selected at startup.
     */
    storage: Arc<dyn StorageEngine>,
}

impl CatalogService {
    /**
     * Creates a new instance of `CatalogService`.
     *
     * # Arguments
     * `storage`: The storage engine, file backed or relational.
     */
    pub fn new(storage: Arc<dyn StorageEngine>) -> Self {
        CatalogService { storage }
    }

    /**
     * Retrieves one entity of type `T`.
     *
     * # Returns
     * The entity, or a `NotFound` error if no such entity exists.
     */
    pub async fn get<T: Model>(&self, id: &str) -> Result<T, ApplicationError> {
        self.storage.get(T::KIND, id).await?.and_then(T::from_entity).ok_or_else(|| ApplicationError::not_found(T::KIND.class_name()))
    }

    /**
     * Retrieves all entities of type `T`.
     */
    pub async fn list<T: Model>(&self) -> Result<Vec<T>, ApplicationError> {
        Ok(all_of::<T>(self.storage.all(Some(T::KIND)).await?))
    }

    /**
     * Deletes one entity of type `T` and everything that depends on it.
     *
     * # Returns
     * A `NotFound` error if no such entity exists.
     */
    #[instrument(skip(self), fields(class = T::KIND.class_name()))]
    pub async fn delete<T: Model>(&self, id: &str) -> Result<(), ApplicationError> {
        let entity = self.storage.get(T::KIND, id).await?.ok_or_else(|| ApplicationError::not_found(T::KIND.class_name()))?;
        self.storage.delete(&entity).await?;
        info!("Deleted {}", entity.key());
        Ok(())
    }

    /**
     * Saves the model and returns it as stored.
     */
    async fn store<T: Model>(&self, model: T) -> Result<T, ApplicationError> {
        let mut entity: Entity = model.into();
        self.storage.save(&mut entity).await?;
        Self::stored_as(entity)
    }

    /**
     * Saves a modified model. A model deleted since it was read stays deleted and yields `NotFound`.
     */
    async fn replace<T: Model>(&self, model: T) -> Result<T, ApplicationError> {
        let mut entity: Entity = model.into();
        self.storage.update(&mut entity).await?;
        Self::stored_as(entity)
    }

    fn stored_as<T: Model>(entity: Entity) -> Result<T, ApplicationError> {
        T::from_entity(entity).ok_or_else(|| ApplicationError::new(ErrorType::StorageError, format!("Storage returned another type than {}", T::KIND.class_name())))
    }

    /**
     * Counts the stored entities per type.
     */
    pub async fn get_stats(&self) -> Result<CatalogStatsOutputType, ApplicationError> {
        Ok(CatalogStatsOutputType {
            amenities: self.storage.count(Some(EntityKind::Amenity)).await?,
            cities: self.storage.count(Some(EntityKind::City)).await?,
            places: self.storage.count(Some(EntityKind::Place)).await?,
            reviews: self.storage.count(Some(EntityKind::Review)).await?,
            states: self.storage.count(Some(EntityKind::State)).await?,
            users: self.storage.count(Some(EntityKind::User)).await?,
        })
    }

    pub async fn add_state(&self, state_add_input: NamedAddInputType) -> Result<State, ApplicationError> {
        self.store(State::new(state_add_input.name)).await
    }

    pub async fn update_state(&self, state_id: &str, state_update_input: NamedUpdateInputType) -> Result<State, ApplicationError> {
        let mut state: State = self.get(state_id).await?;
        if let Some(name) = state_update_input.name {
            state.name = name;
        }
        self.replace(state).await
    }

    /**
     * Retrieves the cities of a state.
     *
     * # Returns
     * A `NotFound` error if the state does not exist.
     */
    pub async fn list_cities(&self, state_id: &str) -> Result<Vec<City>, ApplicationError> {
        let state: State = self.get(state_id).await?;
        self.storage.cities_of_state(&state.id).await
    }

    pub async fn add_city(&self, state_id: &str, city_add_input: NamedAddInputType) -> Result<City, ApplicationError> {
        let state: State = self.get(state_id).await?;
        self.store(City::new(state.id, city_add_input.name)).await
    }

    pub async fn update_city(&self, city_id: &str, city_update_input: NamedUpdateInputType) -> Result<City, ApplicationError> {
        let mut city: City = self.get(city_id).await?;
        if let Some(name) = city_update_input.name {
            city.name = name;
        }
        self.replace(city).await
    }

    pub async fn add_amenity(&self, amenity_add_input: NamedAddInputType) -> Result<Amenity, ApplicationError> {
        self.store(Amenity::new(amenity_add_input.name)).await
    }

    pub async fn update_amenity(&self, amenity_id: &str, amenity_update_input: NamedUpdateInputType) -> Result<Amenity, ApplicationError> {
        let mut amenity: Amenity = self.get(amenity_id).await?;
        if let Some(name) = amenity_update_input.name {
            amenity.name = name;
        }
        self.replace(amenity).await
    }

    /**
     * Adds a user. The email must not be registered yet and the password is stored as an argon2 hash.
     * The lookup here only spares the hashing for an obvious duplicate; the storage engine enforces uniqueness.
     */
    #[instrument(skip(self, user_add_input), fields(email = %user_add_input.email))]
    pub async fn add_user(&self, user_add_input: UserAddInputType) -> Result<User, ApplicationError> {
        let users: Vec<User> = self.list().await?;
        if users.iter().any(|user| user.email == user_add_input.email) {
            return Err(ApplicationError::new(ErrorType::ConstraintViolation, "Already exists".to_string()));
        }
        let password_hash = hash_password(&user_add_input.password)?;
        self.store(User::new(user_add_input.email, password_hash, user_add_input.first_name, user_add_input.last_name)).await
    }

    pub async fn update_user(&self, user_id: &str, user_update_input: UserUpdateInputType) -> Result<User, ApplicationError> {
        let mut user: User = self.get(user_id).await?;
        if let Some(password) = user_update_input.password {
            user.password = hash_password(&password)?;
        }
        if let Some(first_name) = user_update_input.first_name {
            user.first_name = Some(first_name);
        }
        if let Some(last_name) = user_update_input.last_name {
            user.last_name = Some(last_name);
        }
        self.replace(user).await
    }

    /**
     * Retrieves the places of a city.
     *
     * # Returns
     * A `NotFound` error if the city does not exist.
     */
    pub async fn list_places(&self, city_id: &str) -> Result<Vec<Place>, ApplicationError> {
        let city: City = self.get(city_id).await?;
        self.storage.places_of_city(&city.id).await
    }

    /**
     * Adds a place to a city. Both the city and the owning user must exist.
     *
     * # Returns
     * In order of precedence: `NotFound` for an unknown city, `Missing user_id`, `NotFound` for an unknown user, `Missing name`.
     */
    pub async fn add_place(&self, city_id: &str, place_add_input: PlaceAddInputType) -> Result<Place, ApplicationError> {
        let city: City = self.get(city_id).await?;
        let user_id = place_add_input.user_id.ok_or_else(|| ApplicationError::validation("Missing user_id"))?;
        let user: User = self.get(&user_id).await?;
        let name = place_add_input.name.ok_or_else(|| ApplicationError::validation("Missing name"))?;
        let mut place = Place::new(city.id, user.id, name);
        place_add_input.attributes.apply(&mut place);
        self.store(place).await
    }

    pub async fn update_place(&self, place_id: &str, place_update_input: PlaceUpdateInputType) -> Result<Place, ApplicationError> {
        let mut place: Place = self.get(place_id).await?;
        if let Some(name) = place_update_input.name {
            place.name = name;
        }
        place_update_input.attributes.apply(&mut place);
        self.replace(place).await
    }

    pub async fn list_reviews(&self, place_id: &str) -> Result<Vec<Review>, ApplicationError> {
        let place: Place = self.get(place_id).await?;
        self.storage.reviews_of_place(&place.id).await
    }

    /**
     * Adds a review to a place. Both the place and the reviewing user must exist.
     */
    pub async fn add_review(&self, place_id: &str, review_add_input: ReviewAddInputType) -> Result<Review, ApplicationError> {
        let place: Place = self.get(place_id).await?;
        let user: User = self.get(&review_add_input.user_id).await?;
        self.store(Review::new(place.id, user.id, review_add_input.text)).await
    }

    pub async fn update_review(&self, review_id: &str, review_update_input: ReviewUpdateInputType) -> Result<Review, ApplicationError> {
        let mut review: Review = self.get(review_id).await?;
        if let Some(text) = review_update_input.text {
            review.text = text;
        }
        self.replace(review).await
    }

    pub async fn list_place_amenities(&self, place_id: &str) -> Result<Vec<Amenity>, ApplicationError> {
        let place: Place = self.get(place_id).await?;
        self.storage.list_amenities(&place.id).await
    }

    /**
     * Links an amenity to a place.
     *
     * # Returns
     * The amenity and whether the link was created by this call. Linking twice is not an error.
     */
    #[instrument(skip(self))]
    pub async fn link_place_amenity(&self, place_id: &str, amenity_id: &str) -> Result<(Amenity, bool), ApplicationError> {
        let place: Place = self.get(place_id).await?;
        let amenity: Amenity = self.get(amenity_id).await?;
        let created = self.storage.link_amenity(&place.id, &amenity.id).await?;
        Ok((amenity, created))
    }

    /**
     * Removes the link between a place and an amenity.
     *
     * # Returns
     * A `NotFound` error if the place or amenity does not exist or they are not linked.
     */
    #[instrument(skip(self))]
    pub async fn unlink_place_amenity(&self, place_id: &str, amenity_id: &str) -> Result<(), ApplicationError> {
        let place: Place = self.get(place_id).await?;
        let amenity: Amenity = self.get(amenity_id).await?;
        if !self.storage.unlink_amenity(&place.id, &amenity.id).await? {
            return Err(ApplicationError::new(ErrorType::NotFound, "Amenity not linked to place".to_string()));
        }
        Ok(())
    }

    pub async fn search_places(&self, place_search_input: PlaceSearchInputType) -> Result<Vec<Place>, ApplicationError> {
        search_places(self.storage.as_ref(), &place_search_input).await
    }
}

#[cfg(test)]
mod test {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    use super::*;
    use crate::dao::file_storage::FileStorage;
    use crate::model::models::PlaceAttributesInputType;

    fn service(dir: &tempfile::TempDir) -> CatalogService {
        CatalogService::new(Arc::new(FileStorage::new(dir.path().join("file.json"))))
    }

    fn named(name: &str) -> NamedAddInputType {
        NamedAddInputType { name: name.to_string() }
    }

    async fn add_user(service: &CatalogService, email: &str) -> User {
        service.add_user(UserAddInputType { email: email.to_string(), password: "secret".to_string(), first_name: Some("Bob".to_string()), last_name: None }).await.unwrap()
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir);
        let err = service.get::<State>("missing").await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::NotFound);
        let err = service.delete::<State>("missing").await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::NotFound);
    }

    #[tokio::test]
    async fn test_add_and_update_state() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir);
        let state = service.add_state(named("California")).await.unwrap();
        let updated = service.update_state(&state.id, NamedUpdateInputType { name: Some("Nevada".to_string()) }).await.unwrap();
        assert_eq!(updated.id, state.id);
        assert_eq!(updated.created_at, state.created_at);
        assert_eq!(updated.name, "Nevada");
        let unchanged = service.update_state(&state.id, NamedUpdateInputType::default()).await.unwrap();
        assert_eq!(unchanged.name, "Nevada");
    }

    #[tokio::test]
    async fn test_add_city_requires_state() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir);
        let err = service.add_city("missing", named("Reno")).await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::NotFound);
        let state = service.add_state(named("Nevada")).await.unwrap();
        let city = service.add_city(&state.id, named("Reno")).await.unwrap();
        assert_eq!(city.state_id, state.id);
        assert_eq!(service.list_cities(&state.id).await.unwrap(), vec![city]);
    }

    #[tokio::test]
    async fn test_add_user_hashes_password_and_rejects_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir);
        let user = add_user(&service, "bob@example.com").await;
        assert_ne!(user.password, "secret");
        let parsed_hash = PasswordHash::new(&user.password).unwrap();
        assert!(Argon2::default().verify_password(b"secret", &parsed_hash).is_ok());
        let err = service
            .add_user(UserAddInputType { email: "bob@example.com".to_string(), password: "other".to_string(), first_name: None, last_name: None })
            .await
            .unwrap_err();
        assert_eq!(err.error_type, ErrorType::ConstraintViolation);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_add_user_registers_email_once() {
        let dir = tempfile::tempdir().unwrap();
        let service = Arc::new(service(&dir));
        let mut handles = vec![];
        for _ in 0..4 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.add_user(UserAddInputType { email: "dup@example.com".to_string(), password: "secret".to_string(), first_name: None, last_name: None }).await
            }));
        }
        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => assert_eq!(err.error_type, ErrorType::ConstraintViolation),
            }
        }
        assert_eq!(created, 1);
        let users: Vec<User> = service.list().await.unwrap();
        assert_eq!(users.iter().filter(|user| user.email == "dup@example.com").count(), 1);
    }

    #[tokio::test]
    async fn test_update_user_rehashes_password() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir);
        let user = add_user(&service, "bob@example.com").await;
        let updated = service.update_user(&user.id, UserUpdateInputType { password: Some("changed".to_string()), last_name: Some("Smith".to_string()), ..Default::default() }).await.unwrap();
        assert_eq!(updated.email, "bob@example.com");
        assert_eq!(updated.first_name.as_deref(), Some("Bob"));
        assert_eq!(updated.last_name.as_deref(), Some("Smith"));
        let parsed_hash = PasswordHash::new(&updated.password).unwrap();
        assert!(Argon2::default().verify_password(b"changed", &parsed_hash).is_ok());
    }

    #[tokio::test]
    async fn test_add_place_checks_city_and_user() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir);
        let state = service.add_state(named("California")).await.unwrap();
        let city = service.add_city(&state.id, named("San Francisco")).await.unwrap();
        let user = add_user(&service, "host@example.com").await;
        let input = |user_id: &str| PlaceAddInputType {
            user_id: Some(user_id.to_string()),
            name: Some("Loft".to_string()),
            attributes: PlaceAttributesInputType { price_by_night: Some(150), ..Default::default() },
        };
        assert_eq!(service.add_place("missing", input(&user.id)).await.unwrap_err().error_type, ErrorType::NotFound);
        assert_eq!(service.add_place(&city.id, input("missing")).await.unwrap_err().error_type, ErrorType::NotFound);
        let nameless = |user_id: &str| PlaceAddInputType { user_id: Some(user_id.to_string()), name: None, attributes: Default::default() };
        assert_eq!(service.add_place(&city.id, nameless("missing")).await.unwrap_err().error_type, ErrorType::NotFound);
        let err = service.add_place(&city.id, nameless(&user.id)).await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::Validation);
        assert_eq!(err.message, "Missing name");
        let ownerless = PlaceAddInputType { user_id: None, name: None, attributes: Default::default() };
        assert_eq!(service.add_place("missing", ownerless.clone()).await.unwrap_err().error_type, ErrorType::NotFound);
        assert_eq!(service.add_place(&city.id, ownerless).await.unwrap_err().message, "Missing user_id");
        let place = service.add_place(&city.id, input(&user.id)).await.unwrap();
        assert_eq!(place.price_by_night, 150);
        assert_eq!(place.user_id, user.id);
        assert_eq!(service.list_places(&city.id).await.unwrap().len(), 1);
        let updated = service.update_place(&place.id, PlaceUpdateInputType { name: Some("Studio".to_string()), ..Default::default() }).await.unwrap();
        assert_eq!(updated.name, "Studio");
        assert_eq!(updated.price_by_night, 150);
        assert_eq!(updated.city_id, city.id);
    }

    #[tokio::test]
    async fn test_reviews() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir);
        let state = service.add_state(named("California")).await.unwrap();
        let city = service.add_city(&state.id, named("San Francisco")).await.unwrap();
        let user = add_user(&service, "host@example.com").await;
        let place = service.add_place(&city.id, PlaceAddInputType { user_id: Some(user.id.clone()), name: Some("Loft".to_string()), attributes: Default::default() }).await.unwrap();
        let review = service.add_review(&place.id, ReviewAddInputType { user_id: user.id.clone(), text: "Lovely".to_string() }).await.unwrap();
        assert_eq!(service.list_reviews(&place.id).await.unwrap(), vec![review.clone()]);
        let updated = service.update_review(&review.id, ReviewUpdateInputType { text: Some("Noisy".to_string()) }).await.unwrap();
        assert_eq!(updated.text, "Noisy");
        service.delete::<User>(&user.id).await.unwrap();
        assert_eq!(service.get::<Review>(&review.id).await.unwrap_err().error_type, ErrorType::NotFound);
        assert_eq!(service.get::<Place>(&place.id).await.unwrap_err().error_type, ErrorType::NotFound);
    }

    #[tokio::test]
    async fn test_link_and_unlink_amenity() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir);
        let state = service.add_state(named("California")).await.unwrap();
        let city = service.add_city(&state.id, named("San Francisco")).await.unwrap();
        let user = add_user(&service, "host@example.com").await;
        let place = service.add_place(&city.id, PlaceAddInputType { user_id: Some(user.id.clone()), name: Some("Loft".to_string()), attributes: Default::default() }).await.unwrap();
        let wifi = service.add_amenity(named("Wifi")).await.unwrap();

        let (amenity, created) = service.link_place_amenity(&place.id, &wifi.id).await.unwrap();
        assert!(created);
        assert_eq!(amenity, wifi);
        let (_, created) = service.link_place_amenity(&place.id, &wifi.id).await.unwrap();
        assert!(!created);
        assert_eq!(service.list_place_amenities(&place.id).await.unwrap(), vec![wifi.clone()]);

        service.unlink_place_amenity(&place.id, &wifi.id).await.unwrap();
        let err = service.unlink_place_amenity(&place.id, &wifi.id).await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::NotFound);
        assert_eq!(service.link_place_amenity(&place.id, "missing").await.unwrap_err().error_type, ErrorType::NotFound);
    }

    #[tokio::test]
    async fn test_stats() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir);
        let state = service.add_state(named("California")).await.unwrap();
        service.add_city(&state.id, named("San Francisco")).await.unwrap();
        service.add_amenity(named("Wifi")).await.unwrap();
        let stats = service.get_stats().await.unwrap();
        assert_eq!(stats, CatalogStatsOutputType { amenities: 1, cities: 1, places: 0, reviews: 0, states: 1, users: 0 });
    }
}
