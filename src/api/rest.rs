use actix_web::{HttpRequest, HttpResponse, ResponseError, error::JsonPayloadError, http::StatusCode};
use serde::{Deserialize, Serialize, Serializer};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    entities::Entity,
    models::{
        CatalogStatsOutputType, NamedAddInputType, NamedUpdateInputType, PlaceAddInputType, PlaceAttributesInputType, PlaceSearchInputType, PlaceUpdateInputType, ReviewAddInputType,
        ReviewUpdateInputType, UserAddInputType, UserUpdateInputType,
    },
};

/***************** Named entity models *********************/

/**
 * Request body for creating or updating a state, city or amenity.
 * Keys other than `name` (such as `id` or `created_at`) are ignored.
 */
#[derive(Debug, Deserialize)]
pub struct NamedRequest {
    pub name: Option<String>,
}

impl TryFrom<NamedRequest> for NamedAddInputType {
    type Error = ApplicationError;

    fn try_from(request: NamedRequest) -> Result<Self, Self::Error> {
        let name = request.name.ok_or_else(|| ApplicationError::validation("Missing name"))?;
        Ok(NamedAddInputType { name })
    }
}

impl From<NamedRequest> for NamedUpdateInputType {
    fn from(request: NamedRequest) -> Self {
        NamedUpdateInputType { name: request.name }
    }
}

/***************** User models *********************/

/**
 * Request body for creating or updating a user.
 */
#[derive(Deserialize)]
pub struct UserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl TryFrom<UserRequest> for UserAddInputType {
    type Error = ApplicationError;

    fn try_from(request: UserRequest) -> Result<Self, Self::Error> {
        let email = request.email.ok_or_else(|| ApplicationError::validation("Missing email"))?;
        let password = request.password.ok_or_else(|| ApplicationError::validation("Missing password"))?;
        Ok(UserAddInputType { email, password, first_name: request.first_name, last_name: request.last_name })
    }
}

/**
 * The email of a user can not be changed, so it is dropped here.
 */
impl From<UserRequest> for UserUpdateInputType {
    fn from(request: UserRequest) -> Self {
        UserUpdateInputType { password: request.password, first_name: request.first_name, last_name: request.last_name }
    }
}

/***************** Place models *********************/

/**
 * Request body for creating or updating a place.
 */
#[derive(Debug, Deserialize)]
pub struct PlaceRequest {
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub number_rooms: Option<i32>,
    pub number_bathrooms: Option<i32>,
    pub max_guest: Option<i32>,
    pub price_by_night: Option<i32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl PlaceRequest {
    fn attributes(&self) -> PlaceAttributesInputType {
        PlaceAttributesInputType {
            description: self.description.clone(),
            number_rooms: self.number_rooms,
            number_bathrooms: self.number_bathrooms,
            max_guest: self.max_guest,
            price_by_night: self.price_by_night,
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/**
 * Presence of `user_id` and `name` is checked by the service, interleaved with the lookups of the city and user.
 */
impl From<PlaceRequest> for PlaceAddInputType {
    fn from(request: PlaceRequest) -> Self {
        let attributes = request.attributes();
        PlaceAddInputType { user_id: request.user_id, name: request.name, attributes }
    }
}

/**
 * The owner and city of a place are fixed, so `user_id` is dropped here.
 */
impl From<PlaceRequest> for PlaceUpdateInputType {
    fn from(request: PlaceRequest) -> Self {
        let attributes = request.attributes();
        PlaceUpdateInputType { name: request.name, attributes }
    }
}

/**
 * Request body for the place search. Every list is optional.
 */
#[derive(Debug, Deserialize)]
pub struct PlacesSearchRequest {
    pub states: Option<Vec<String>>,
    pub cities: Option<Vec<String>>,
    pub amenities: Option<Vec<String>>,
}

impl From<PlacesSearchRequest> for PlaceSearchInputType {
    fn from(request: PlacesSearchRequest) -> Self {
        PlaceSearchInputType {
            states: request.states.unwrap_or_default().into_iter().collect(),
            cities: request.cities.unwrap_or_default().into_iter().collect(),
            amenities: request.amenities.unwrap_or_default().into_iter().collect(),
        }
    }
}

/***************** Review models *********************/

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub user_id: Option<String>,
    pub text: Option<String>,
}

impl TryFrom<ReviewRequest> for ReviewAddInputType {
    type Error = ApplicationError;

    fn try_from(request: ReviewRequest) -> Result<Self, Self::Error> {
        let user_id = request.user_id.ok_or_else(|| ApplicationError::validation("Missing user_id"))?;
        let text = request.text.ok_or_else(|| ApplicationError::validation("Missing text"))?;
        Ok(ReviewAddInputType { user_id, text })
    }
}

impl From<ReviewRequest> for ReviewUpdateInputType {
    fn from(request: ReviewRequest) -> Self {
        ReviewUpdateInputType { text: request.text }
    }
}

/***************** Response models *********************/

/**
 * Response representation of any entity: its attributes plus `__class__`, without the password hash of users.
 */
#[derive(Debug)]
pub struct EntityResponse(Entity);

impl EntityResponse {
    pub fn new(entity: impl Into<Entity>) -> Self {
        EntityResponse(entity.into())
    }

    /**
     * Converts a list of entities into their response representation.
     */
    pub fn list<T: Into<Entity>>(entities: Vec<T>) -> Vec<Self> {
        entities.into_iter().map(EntityResponse::new).collect()
    }
}

impl Serialize for EntityResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut attributes = serde_json::to_value(&self.0).map_err(serde::ser::Error::custom)?;
        if let Some(attributes) = attributes.as_object_mut() {
            attributes.remove("password");
        }
        attributes.serialize(serializer)
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

/**
 * Number of stored entities per type.
 */
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    amenities: usize,
    cities: usize,
    places: usize,
    reviews: usize,
    states: usize,
    users: usize,
}

impl From<CatalogStatsOutputType> for StatsResponse {
    fn from(stats: CatalogStatsOutputType) -> Self {
        StatsResponse { amenities: stats.amenities, cities: stats.cities, places: stats.places, reviews: stats.reviews, states: stats.states, users: stats.users }
    }
}

/***************** Error models *********************/

/**
 * Custom error response for the application.
 */
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /**
     * The error code associated with the error type.
     */
    pub code: u16,
    /**
     * A human-readable message describing the error.
     */
    pub message: String,
}

impl ResponseError for ApplicationError {
    fn status_code(&self) -> StatusCode {
        get_statuscode(&self.error_type)
    }

    /**
     * Generates an error response for the application error. Not found responses have no body.
     */
    fn error_response(&self) -> HttpResponse {
        if self.error_type == ErrorType::NotFound {
            return HttpResponse::NotFound().finish();
        }
        let error_response = ErrorResponse { code: get_error_code(&self.error_type), message: self.message.clone() };
        HttpResponse::build(get_statuscode(&self.error_type)).json(&error_response)
    }
}

/**
 * Maps failures of the JSON body extractor (no body, wrong content type, malformed JSON, wrong shape) to a validation error.
 */
pub fn json_error_handler(err: JsonPayloadError, _request: &HttpRequest) -> actix_web::Error {
    tracing::debug!("Rejected request body: {}", err);
    ApplicationError::validation("Not a JSON").into()
}

/**
* Maps application errors to HTTP status codes.
*
* # Arguments
* `application_error`: The type of error that occurred.
*
* # Returns
* The corresponding HTTP status code.
*/
fn get_statuscode(application_error: &ErrorType) -> StatusCode {
    match application_error {
        ErrorType::NotFound => StatusCode::NOT_FOUND,
        ErrorType::Validation => StatusCode::BAD_REQUEST,
        ErrorType::ConstraintViolation => StatusCode::CONFLICT,
        ErrorType::Initialization | ErrorType::DatabaseError | ErrorType::StorageError | ErrorType::PasswordHashing => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/**
 * Maps application errors to error codes.
 *
 * # Arguments
 * `application_error`: The type of error that occurred.
 *
 * # Returns
 * The corresponding error code.
 */
fn get_error_code(application_error: &ErrorType) -> u16 {
    match application_error {
        ErrorType::Initialization => 1001,
        ErrorType::DatabaseError => 1003,
        ErrorType::NotFound => 1004,
        ErrorType::Validation => 1005,
        ErrorType::ConstraintViolation => 1006,
        ErrorType::StorageError => 1007,
        ErrorType::PasswordHashing => 1008,
    }
}
