use actix_web::{
    HttpRequest, HttpResponse, delete, get, post, put,
    web::{self, Path},
};
use serde_json::json;
use tracing::{Instrument, instrument};

use crate::{
    api::{
        place_endpoints,
        rest::{EntityResponse, NamedRequest, StatsResponse, StatusResponse, UserRequest, json_error_handler},
        state::AppState,
    },
    model::{
        apperror::ApplicationError,
        entities::{Amenity, City, State, User},
        models::{NamedAddInputType, NamedUpdateInputType, UserAddInputType, UserUpdateInputType},
    },
};

/**
 * Registers every catalog endpoint under `/api/v1`. Rejected JSON bodies are answered with `400 Not a JSON`.
 */
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .service(status)
            .service(stats)
            .service(states_list)
            .service(state_get)
            .service(state_add)
            .service(state_update)
            .service(state_delete)
            .service(cities_list)
            .service(city_add)
            .service(city_get)
            .service(city_update)
            .service(city_delete)
            .service(amenities_list)
            .service(amenity_get)
            .service(amenity_add)
            .service(amenity_update)
            .service(amenity_delete)
            .service(users_list)
            .service(user_get)
            .service(user_add)
            .service(user_update)
            .service(user_delete)
            .configure(place_endpoints::configure_routes),
    );
}

/***************** Index *********************/

/**
 * Liveness check.
 */
#[get("/status")]
pub async fn status() -> HttpResponse {
    HttpResponse::Ok().json(StatusResponse { status: "OK" })
}

/**
 * Number of stored entities per type.
 */
#[instrument(skip(http_request, app_state), fields(service = "stats", trace_id = get_trace_id(&http_request)))]
#[get("/stats")]
pub async fn stats(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let stats = app_state.catalog_service.get_stats().instrument(span).await?;
    Ok(HttpResponse::Ok().json(StatsResponse::from(stats)))
}

/***************** States *********************/

#[instrument(skip(http_request, app_state), fields(service = "listStates", trace_id = get_trace_id(&http_request)))]
#[get("/states")]
pub async fn states_list(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let states = app_state.catalog_service.list::<State>().instrument(span).await?;
    Ok(HttpResponse::Ok().json(EntityResponse::list(states)))
}

#[instrument(skip(http_request, app_state), fields(service = "getState", trace_id = get_trace_id(&http_request)))]
#[get("/states/{state_id}")]
pub async fn state_get(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let state = app_state.catalog_service.get::<State>(&path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(EntityResponse::new(state)))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "addState", trace_id = get_trace_id(&http_request)))]
#[post("/states")]
pub async fn state_add(http_request: HttpRequest, request_body: web::Json<NamedRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let state_add_input = NamedAddInputType::try_from(request_body.into_inner())?;
    let state = app_state.catalog_service.add_state(state_add_input).instrument(span).await?;
    Ok(HttpResponse::Created().json(EntityResponse::new(state)))
}

#[instrument(skip(http_request, app_state), fields(service = "updateState", trace_id = get_trace_id(&http_request)))]
#[put("/states/{state_id}")]
pub async fn state_update(path: Path<String>, http_request: HttpRequest, request_body: web::Json<NamedRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let state_update_input = NamedUpdateInputType::from(request_body.into_inner());
    let state = app_state.catalog_service.update_state(&path.into_inner(), state_update_input).instrument(span).await?;
    Ok(HttpResponse::Ok().json(EntityResponse::new(state)))
}

/**
 * Deletes a state together with its cities and everything below them.
 */
#[instrument(skip(http_request, app_state), fields(service = "deleteState", trace_id = get_trace_id(&http_request)))]
#[delete("/states/{state_id}")]
pub async fn state_delete(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.catalog_service.delete::<State>(&path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(json!({})))
}

/***************** Cities *********************/

#[instrument(skip(http_request, app_state), fields(service = "listCities", trace_id = get_trace_id(&http_request)))]
#[get("/states/{state_id}/cities")]
pub async fn cities_list(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let cities = app_state.catalog_service.list_cities(&path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(EntityResponse::list(cities)))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "addCity", trace_id = get_trace_id(&http_request)))]
#[post("/states/{state_id}/cities")]
pub async fn city_add(path: Path<String>, http_request: HttpRequest, request_body: web::Json<NamedRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let state_id = path.into_inner();
    let city_add_input = NamedAddInputType::try_from(request_body.into_inner())?;
    let city = app_state.catalog_service.add_city(&state_id, city_add_input).instrument(span).await?;
    Ok(HttpResponse::Created().json(EntityResponse::new(city)))
}

#[instrument(skip(http_request, app_state), fields(service = "getCity", trace_id = get_trace_id(&http_request)))]
#[get("/cities/{city_id}")]
pub async fn city_get(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let city = app_state.catalog_service.get::<City>(&path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(EntityResponse::new(city)))
}

#[instrument(skip(http_request, app_state), fields(service = "updateCity", trace_id = get_trace_id(&http_request)))]
#[put("/cities/{city_id}")]
pub async fn city_update(path: Path<String>, http_request: HttpRequest, request_body: web::Json<NamedRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let city_update_input = NamedUpdateInputType::from(request_body.into_inner());
    let city = app_state.catalog_service.update_city(&path.into_inner(), city_update_input).instrument(span).await?;
    Ok(HttpResponse::Ok().json(EntityResponse::new(city)))
}

#[instrument(skip(http_request, app_state), fields(service = "deleteCity", trace_id = get_trace_id(&http_request)))]
#[delete("/cities/{city_id}")]
pub async fn city_delete(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.catalog_service.delete::<City>(&path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(json!({})))
}

/***************** Amenities *********************/

#[instrument(skip(http_request, app_state), fields(service = "listAmenities", trace_id = get_trace_id(&http_request)))]
#[get("/amenities")]
pub async fn amenities_list(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let amenities = app_state.catalog_service.list::<Amenity>().instrument(span).await?;
    Ok(HttpResponse::Ok().json(EntityResponse::list(amenities)))
}

#[instrument(skip(http_request, app_state), fields(service = "getAmenity", trace_id = get_trace_id(&http_request)))]
#[get("/amenities/{amenity_id}")]
pub async fn amenity_get(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let amenity = app_state.catalog_service.get::<Amenity>(&path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(EntityResponse::new(amenity)))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "addAmenity", trace_id = get_trace_id(&http_request)))]
#[post("/amenities")]
pub async fn amenity_add(http_request: HttpRequest, request_body: web::Json<NamedRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let amenity_add_input = NamedAddInputType::try_from(request_body.into_inner())?;
    let amenity = app_state.catalog_service.add_amenity(amenity_add_input).instrument(span).await?;
    Ok(HttpResponse::Created().json(EntityResponse::new(amenity)))
}

#[instrument(skip(http_request, app_state), fields(service = "updateAmenity", trace_id = get_trace_id(&http_request)))]
#[put("/amenities/{amenity_id}")]
pub async fn amenity_update(path: Path<String>, http_request: HttpRequest, request_body: web::Json<NamedRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let amenity_update_input = NamedUpdateInputType::from(request_body.into_inner());
    let amenity = app_state.catalog_service.update_amenity(&path.into_inner(), amenity_update_input).instrument(span).await?;
    Ok(HttpResponse::Ok().json(EntityResponse::new(amenity)))
}

/**
 * Deletes an amenity and detaches it from every place it was linked to.
 */
#[instrument(skip(http_request, app_state), fields(service = "deleteAmenity", trace_id = get_trace_id(&http_request)))]
#[delete("/amenities/{amenity_id}")]
pub async fn amenity_delete(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.catalog_service.delete::<Amenity>(&path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(json!({})))
}

/***************** Users *********************/

#[instrument(skip(http_request, app_state), fields(service = "listUsers", trace_id = get_trace_id(&http_request)))]
#[get("/users")]
pub async fn users_list(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let users = app_state.catalog_service.list::<User>().instrument(span).await?;
    Ok(HttpResponse::Ok().json(EntityResponse::list(users)))
}

#[instrument(skip(http_request, app_state), fields(service = "getUser", trace_id = get_trace_id(&http_request)))]
#[get("/users/{user_id}")]
pub async fn user_get(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.catalog_service.get::<User>(&path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(EntityResponse::new(user)))
}

#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "addUser", trace_id = get_trace_id(&http_request)))]
#[post("/users")]
pub async fn user_add(http_request: HttpRequest, request_body: web::Json<UserRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user_add_input = UserAddInputType::try_from(request_body.into_inner())?;
    let user = app_state.catalog_service.add_user(user_add_input).instrument(span).await?;
    Ok(HttpResponse::Created().json(EntityResponse::new(user)))
}

#[instrument(skip(http_request, request_body, app_state), fields(service = "updateUser", trace_id = get_trace_id(&http_request)))]
#[put("/users/{user_id}")]
pub async fn user_update(path: Path<String>, http_request: HttpRequest, request_body: web::Json<UserRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user_update_input = UserUpdateInputType::from(request_body.into_inner());
    let user = app_state.catalog_service.update_user(&path.into_inner(), user_update_input).instrument(span).await?;
    Ok(HttpResponse::Ok().json(EntityResponse::new(user)))
}

#[instrument(skip(http_request, app_state), fields(service = "deleteUser", trace_id = get_trace_id(&http_request)))]
#[delete("/users/{user_id}")]
pub async fn user_delete(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.catalog_service.delete::<User>(&path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(json!({})))
}

/**
 * Retrieves the trace ID from the HTTP request headers.
 * If the trace ID is not present, a new UUID is generated.
 */
pub(crate) fn get_trace_id(http_request: &HttpRequest) -> String {
    http_request.headers().get("X-Trace-ID").and_then(|v| v.to_str().ok().map(std::string::ToString::to_string)).unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use actix_web::{App, http::StatusCode, test, test::TestRequest};
    use serde_json::Value;

    use super::*;
    use crate::{dao::file_storage::FileStorage, service::catalog::CatalogService};

    #[actix_web::test]
    async fn test_get_trace_id_exists() {
        let request = TestRequest::default().insert_header(("X-Trace-ID", "test")).to_http_request();
        let trace_id = get_trace_id(&request);
        assert_eq!(trace_id, "test");
    }

    #[actix_web::test]
    async fn test_get_trace_id_not_exists() {
        let request = TestRequest::default().to_http_request();
        let trace_id = get_trace_id(&request);
        assert!(!trace_id.is_empty());
    }

    fn app_state(dir: &tempfile::TempDir) -> web::Data<AppState> {
        let storage = Arc::new(FileStorage::new(dir.path().join("file.json")));
        web::Data::new(AppState::new(CatalogService::new(storage)))
    }

    #[actix_web::test]
    async fn test_status_and_empty_stats() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(app_state(&dir)).configure(configure_routes)).await;
        let body: Value = test::call_and_read_body_json(&app, TestRequest::get().uri("/api/v1/status").to_request()).await;
        assert_eq!(body["status"], "OK");
        let body: Value = test::call_and_read_body_json(&app, TestRequest::get().uri("/api/v1/stats").to_request()).await;
        assert_eq!(body["states"], 0);
        assert_eq!(body["users"], 0);
    }

    #[actix_web::test]
    async fn test_state_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(app_state(&dir)).configure(configure_routes)).await;

        let response = test::call_service(&app, TestRequest::post().uri("/api/v1/states").set_json(json!({"name": "California", "id": "ignored"})).to_request()).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let state: Value = test::read_body_json(response).await;
        assert_eq!(state["__class__"], "State");
        assert_eq!(state["name"], "California");
        let state_id = state["id"].as_str().unwrap().to_string();
        assert_ne!(state_id, "ignored");

        let response = test::call_service(&app, TestRequest::put().uri(&format!("/api/v1/states/{state_id}")).set_json(json!({"name": "Nevada", "created_at": "never"})).to_request()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let updated: Value = test::read_body_json(response).await;
        assert_eq!(updated["name"], "Nevada");
        assert_eq!(updated["created_at"], state["created_at"]);

        let response = test::call_service(&app, TestRequest::delete().uri(&format!("/api/v1/states/{state_id}")).to_request()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body, json!({}));

        let response = test::call_service(&app, TestRequest::get().uri(&format!("/api/v1/states/{state_id}")).to_request()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = test::read_body(response).await;
        assert!(body.is_empty());
    }

    #[actix_web::test]
    async fn test_missing_name_and_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(app_state(&dir)).configure(configure_routes)).await;

        let response = test::call_service(&app, TestRequest::post().uri("/api/v1/amenities").set_json(json!({"label": "Wifi"})).to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["message"], "Missing name");

        let request = TestRequest::post().uri("/api/v1/amenities").insert_header(("Content-Type", "application/json")).set_payload("{not json").to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["message"], "Not a JSON");
    }

    #[actix_web::test]
    async fn test_city_under_unknown_state() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(app_state(&dir)).configure(configure_routes)).await;
        let response = test::call_service(&app, TestRequest::post().uri("/api/v1/states/missing/cities").set_json(json!({"name": "Reno"})).to_request()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = test::call_service(&app, TestRequest::get().uri("/api/v1/states/missing/cities").to_request()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_user_never_exposes_password() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(app_state(&dir)).configure(configure_routes)).await;

        let response = test::call_service(&app, TestRequest::post().uri("/api/v1/users").set_json(json!({"email": "a@b.c"})).to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["message"], "Missing password");

        let response = test::call_service(&app, TestRequest::post().uri("/api/v1/users").set_json(json!({"email": "a@b.c", "password": "pwd", "first_name": "Ada"})).to_request()).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let user: Value = test::read_body_json(response).await;
        assert!(user.get("password").is_none());
        assert_eq!(user["first_name"], "Ada");

        let response = test::call_service(&app, TestRequest::post().uri("/api/v1/users").set_json(json!({"email": "a@b.c", "password": "other"})).to_request()).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let user_id = user["id"].as_str().unwrap();
        let response = test::call_service(&app, TestRequest::put().uri(&format!("/api/v1/users/{user_id}")).set_json(json!({"email": "new@b.c", "last_name": "Lovelace"})).to_request()).await;
        let updated: Value = test::read_body_json(response).await;
        assert_eq!(updated["email"], "a@b.c");
        assert_eq!(updated["last_name"], "Lovelace");
        assert!(updated.get("password").is_none());

        let users: Value = test::call_and_read_body_json(&app, TestRequest::get().uri("/api/v1/users").to_request()).await;
        assert_eq!(users.as_array().unwrap().len(), 1);
        assert!(users[0].get("password").is_none());
    }
}
