use actix_web::{
    HttpRequest, HttpResponse, delete, get, post, put,
    web::{self, Path},
};
use serde_json::json;
use tracing::{Instrument, instrument};

use crate::{
    api::{
        endpoints::get_trace_id,
        rest::{EntityResponse, PlaceRequest, PlacesSearchRequest, ReviewRequest},
        state::AppState,
    },
    model::{
        apperror::ApplicationError,
        entities::{Place, Review},
        models::{PlaceAddInputType, PlaceSearchInputType, PlaceUpdateInputType, ReviewAddInputType, ReviewUpdateInputType},
    },
};

/**
 * Registers the place, review and place amenity endpoints.
 */
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(places_search)
        .service(places_list)
        .service(place_add)
        .service(place_get)
        .service(place_update)
        .service(place_delete)
        .service(reviews_list)
        .service(review_add)
        .service(review_get)
        .service(review_update)
        .service(review_delete)
        .service(place_amenities_list)
        .service(place_amenity_link)
        .service(place_amenity_unlink);
}

/***************** Places *********************/

#[instrument(skip(http_request, app_state), fields(service = "listPlaces", trace_id = get_trace_id(&http_request)))]
#[get("/cities/{city_id}/places")]
pub async fn places_list(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let places = app_state.catalog_service.list_places(&path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(EntityResponse::list(places)))
}

/**
 * Adds a place to a city. The body must name the owning user.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "addPlace", trace_id = get_trace_id(&http_request)))]
#[post("/cities/{city_id}/places")]
pub async fn place_add(path: Path<String>, http_request: HttpRequest, request_body: web::Json<PlaceRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let city_id = path.into_inner();
    let place_add_input = PlaceAddInputType::from(request_body.into_inner());
    let place = app_state.catalog_service.add_place(&city_id, place_add_input).instrument(span).await?;
    Ok(HttpResponse::Created().json(EntityResponse::new(place)))
}

#[instrument(skip(http_request, app_state), fields(service = "getPlace", trace_id = get_trace_id(&http_request)))]
#[get("/places/{place_id}")]
pub async fn place_get(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let place = app_state.catalog_service.get::<Place>(&path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(EntityResponse::new(place)))
}

#[instrument(skip(http_request, app_state), fields(service = "updatePlace", trace_id = get_trace_id(&http_request)))]
#[put("/places/{place_id}")]
pub async fn place_update(path: Path<String>, http_request: HttpRequest, request_body: web::Json<PlaceRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let place_update_input = PlaceUpdateInputType::from(request_body.into_inner());
    let place = app_state.catalog_service.update_place(&path.into_inner(), place_update_input).instrument(span).await?;
    Ok(HttpResponse::Ok().json(EntityResponse::new(place)))
}

#[instrument(skip(http_request, app_state), fields(service = "deletePlace", trace_id = get_trace_id(&http_request)))]
#[delete("/places/{place_id}")]
pub async fn place_delete(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.catalog_service.delete::<Place>(&path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(json!({})))
}

/**
 * Searches places by states, cities and amenities. An empty object returns every place.
 */
#[instrument(skip(http_request, app_state), fields(service = "searchPlaces", trace_id = get_trace_id(&http_request)))]
#[post("/places_search")]
pub async fn places_search(http_request: HttpRequest, request_body: web::Json<PlacesSearchRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let place_search_input = PlaceSearchInputType::from(request_body.into_inner());
    let places = app_state.catalog_service.search_places(place_search_input).instrument(span).await?;
    Ok(HttpResponse::Ok().json(EntityResponse::list(places)))
}

/***************** Reviews *********************/

#[instrument(skip(http_request, app_state), fields(service = "listReviews", trace_id = get_trace_id(&http_request)))]
#[get("/places/{place_id}/reviews")]
pub async fn reviews_list(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let reviews = app_state.catalog_service.list_reviews(&path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(EntityResponse::list(reviews)))
}

#[instrument(level = "info", skip(http_request, app_state), fields(service = "addReview", trace_id = get_trace_id(&http_request)))]
#[post("/places/{place_id}/reviews")]
pub async fn review_add(path: Path<String>, http_request: HttpRequest, request_body: web::Json<ReviewRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let place_id = path.into_inner();
    let review_add_input = ReviewAddInputType::try_from(request_body.into_inner())?;
    let review = app_state.catalog_service.add_review(&place_id, review_add_input).instrument(span).await?;
    Ok(HttpResponse::Created().json(EntityResponse::new(review)))
}

#[instrument(skip(http_request, app_state), fields(service = "getReview", trace_id = get_trace_id(&http_request)))]
#[get("/reviews/{review_id}")]
pub async fn review_get(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let review = app_state.catalog_service.get::<Review>(&path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(EntityResponse::new(review)))
}

#[instrument(skip(http_request, app_state), fields(service = "updateReview", trace_id = get_trace_id(&http_request)))]
#[put("/reviews/{review_id}")]
pub async fn review_update(path: Path<String>, http_request: HttpRequest, request_body: web::Json<ReviewRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let review_update_input = ReviewUpdateInputType::from(request_body.into_inner());
    let review = app_state.catalog_service.update_review(&path.into_inner(), review_update_input).instrument(span).await?;
    Ok(HttpResponse::Ok().json(EntityResponse::new(review)))
}

#[instrument(skip(http_request, app_state), fields(service = "deleteReview", trace_id = get_trace_id(&http_request)))]
#[delete("/reviews/{review_id}")]
pub async fn review_delete(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.catalog_service.delete::<Review>(&path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(json!({})))
}

/***************** Place amenities *********************/

#[instrument(skip(http_request, app_state), fields(service = "listPlaceAmenities", trace_id = get_trace_id(&http_request)))]
#[get("/places/{place_id}/amenities")]
pub async fn place_amenities_list(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let amenities = app_state.catalog_service.list_place_amenities(&path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(EntityResponse::list(amenities)))
}

/**
 * Links an amenity to a place. Answers 201 for a new link and 200 if the link already existed.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "linkPlaceAmenity", trace_id = get_trace_id(&http_request)))]
#[post("/places/{place_id}/amenities/{amenity_id}")]
pub async fn place_amenity_link(path: Path<(String, String)>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let (place_id, amenity_id) = path.into_inner();
    let (amenity, created) = app_state.catalog_service.link_place_amenity(&place_id, &amenity_id).instrument(span).await?;
    if created {
        Ok(HttpResponse::Created().json(EntityResponse::new(amenity)))
    } else {
        Ok(HttpResponse::Ok().json(EntityResponse::new(amenity)))
    }
}

#[instrument(skip(http_request, app_state), fields(service = "unlinkPlaceAmenity", trace_id = get_trace_id(&http_request)))]
#[delete("/places/{place_id}/amenities/{amenity_id}")]
pub async fn place_amenity_unlink(path: Path<(String, String)>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let (place_id, amenity_id) = path.into_inner();
    app_state.catalog_service.unlink_place_amenity(&place_id, &amenity_id).instrument(span).await?;
    Ok(HttpResponse::Ok().json(json!({})))
}

#[cfg(test)]
mod test {
    use std::{collections::BTreeSet, sync::Arc};

    use actix_web::{
        App,
        http::StatusCode,
        test::{self, TestRequest},
    };
    use serde_json::Value;

    use super::*;
    use crate::{api::endpoints::configure_routes, dao::file_storage::FileStorage, service::catalog::CatalogService};

    macro_rules! post_json {
        ($app:expr, $uri:expr, $body:expr) => {{
            let uri: &str = &$uri;
            let response = test::call_service($app, TestRequest::post().uri(uri).set_json($body).to_request()).await;
            assert!(response.status().is_success(), "POST {} failed with {}", uri, response.status());
            let body: Value = test::read_body_json(response).await;
            body
        }};
    }

    fn id_of(value: &Value) -> String {
        value["id"].as_str().unwrap().to_string()
    }

    fn ids(values: &Value) -> BTreeSet<String> {
        values.as_array().unwrap().iter().map(id_of).collect()
    }

    #[actix_web::test]
    async fn test_place_search_over_http() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FileStorage::new(dir.path().join("file.json")));
        let state = web::Data::new(AppState::new(CatalogService::new(storage)));
        let app = test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let s1 = id_of(&post_json!(&app, "/api/v1/states", json!({"name": "S1"})));
        let s2 = id_of(&post_json!(&app, "/api/v1/states", json!({"name": "S2"})));
        let c1 = id_of(&post_json!(&app, &format!("/api/v1/states/{s1}/cities"), json!({"name": "C1"})));
        let c2 = id_of(&post_json!(&app, &format!("/api/v1/states/{s2}/cities"), json!({"name": "C2"})));
        let user = id_of(&post_json!(&app, "/api/v1/users", json!({"email": "host@example.com", "password": "pwd"})));
        let p1 = id_of(&post_json!(&app, &format!("/api/v1/cities/{c1}/places"), json!({"user_id": user, "name": "P1"})));
        let p2 = id_of(&post_json!(&app, &format!("/api/v1/cities/{c1}/places"), json!({"user_id": user, "name": "P2"})));
        let p3 = id_of(&post_json!(&app, &format!("/api/v1/cities/{c2}/places"), json!({"user_id": user, "name": "P3"})));
        let a1 = id_of(&post_json!(&app, "/api/v1/amenities", json!({"name": "A1"})));
        let a2 = id_of(&post_json!(&app, "/api/v1/amenities", json!({"name": "A2"})));
        for (place, amenity) in [(&p1, &a1), (&p1, &a2), (&p2, &a1)] {
            let response = test::call_service(&app, TestRequest::post().uri(&format!("/api/v1/places/{place}/amenities/{amenity}")).to_request()).await;
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let places = post_json!(&app, "/api/v1/places_search", json!({}));
        assert_eq!(ids(&places), BTreeSet::from([p1.clone(), p2.clone(), p3.clone()]));
        let places = post_json!(&app, "/api/v1/places_search", json!({"amenities": [a1, a2]}));
        assert_eq!(ids(&places), BTreeSet::from([p1.clone()]));
        let places = post_json!(&app, "/api/v1/places_search", json!({"states": [s1], "amenities": [a1]}));
        assert_eq!(ids(&places), BTreeSet::from([p1.clone(), p2.clone()]));
        let places = post_json!(&app, "/api/v1/places_search", json!({"states": [s1], "cities": [c2]}));
        assert_eq!(ids(&places), BTreeSet::from([p1.clone(), p2.clone(), p3.clone()]));
        let places = post_json!(&app, "/api/v1/places_search", json!({"states": [s2], "amenities": [a1]}));
        assert!(places.as_array().unwrap().is_empty());
        assert!(places.as_array().unwrap().iter().all(|place| place["__class__"] == "Place"));

        let request = TestRequest::post().uri("/api/v1/places_search").insert_header(("Content-Type", "text/plain")).set_payload("states").to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["message"], "Not a JSON");
    }

    #[actix_web::test]
    async fn test_place_amenity_links_and_cascade() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FileStorage::new(dir.path().join("file.json")));
        let state = web::Data::new(AppState::new(CatalogService::new(storage)));
        let app = test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let s1 = id_of(&post_json!(&app, "/api/v1/states", json!({"name": "S1"})));
        let c1 = id_of(&post_json!(&app, &format!("/api/v1/states/{s1}/cities"), json!({"name": "C1"})));
        let user = id_of(&post_json!(&app, "/api/v1/users", json!({"email": "host@example.com", "password": "pwd"})));

        let response = test::call_service(&app, TestRequest::post().uri(&format!("/api/v1/cities/{c1}/places")).set_json(json!({"user_id": "nobody", "name": "P"})).to_request()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let place = post_json!(&app, &format!("/api/v1/cities/{c1}/places"), json!({"user_id": user, "name": "Loft", "max_guest": 4, "latitude": 37.7}));
        assert_eq!(place["max_guest"], 4);
        assert_eq!(place["amenity_ids"], json!([]));
        let p1 = id_of(&place);
        let a1 = id_of(&post_json!(&app, "/api/v1/amenities", json!({"name": "Wifi"})));

        let link_uri = format!("/api/v1/places/{p1}/amenities/{a1}");
        let response = test::call_service(&app, TestRequest::post().uri(&link_uri).to_request()).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let response = test::call_service(&app, TestRequest::post().uri(&link_uri).to_request()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let amenities: Value = test::call_and_read_body_json(&app, TestRequest::get().uri(&format!("/api/v1/places/{p1}/amenities")).to_request()).await;
        assert_eq!(ids(&amenities), BTreeSet::from([a1.clone()]));

        let response = test::call_service(&app, TestRequest::put().uri(&format!("/api/v1/places/{p1}")).set_json(json!({"amenity_ids": [], "name": "Big Loft"})).to_request()).await;
        let updated: Value = test::read_body_json(response).await;
        assert_eq!(updated["name"], "Big Loft");
        assert_eq!(updated["amenity_ids"], json!([a1]));

        let review = post_json!(&app, &format!("/api/v1/places/{p1}/reviews"), json!({"user_id": user, "text": "Great"}));
        assert_eq!(review["__class__"], "Review");
        let response = test::call_service(&app, TestRequest::post().uri(&format!("/api/v1/places/{p1}/reviews")).set_json(json!({"user_id": user})).to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = test::call_service(&app, TestRequest::delete().uri(&link_uri).to_request()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let response = test::call_service(&app, TestRequest::delete().uri(&link_uri).to_request()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = test::call_service(&app, TestRequest::delete().uri(&format!("/api/v1/cities/{c1}")).to_request()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let response = test::call_service(&app, TestRequest::get().uri(&format!("/api/v1/places/{p1}")).to_request()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = test::call_service(&app, TestRequest::get().uri(&format!("/api/v1/reviews/{}", id_of(&review))).to_request()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let stats: Value = test::call_and_read_body_json(&app, TestRequest::get().uri("/api/v1/stats").to_request()).await;
        assert_eq!(stats["places"], 0);
        assert_eq!(stats["reviews"], 0);
        assert_eq!(stats["amenities"], 1);
    }

    #[actix_web::test]
    async fn test_place_add_check_order() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FileStorage::new(dir.path().join("file.json")));
        let state = web::Data::new(AppState::new(CatalogService::new(storage)));
        let app = test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let s1 = id_of(&post_json!(&app, "/api/v1/states", json!({"name": "S1"})));
        let c1 = id_of(&post_json!(&app, &format!("/api/v1/states/{s1}/cities"), json!({"name": "C1"})));
        let user = id_of(&post_json!(&app, "/api/v1/users", json!({"email": "host@example.com", "password": "pwd"})));
        let places_uri = format!("/api/v1/cities/{c1}/places");

        let response = test::call_service(&app, TestRequest::post().uri("/api/v1/cities/nowhere/places").set_json(json!({})).to_request()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = test::call_service(&app, TestRequest::post().uri(&places_uri).set_json(json!({"name": "P"})).to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["message"], "Missing user_id");

        let response = test::call_service(&app, TestRequest::post().uri(&places_uri).set_json(json!({"user_id": "nobody"})).to_request()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = test::call_service(&app, TestRequest::post().uri(&places_uri).set_json(json!({"user_id": user})).to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["message"], "Missing name");

        let places: Value = test::call_and_read_body_json(&app, TestRequest::get().uri(&places_uri).to_request()).await;
        assert!(places.as_array().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_place_search_without_body() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FileStorage::new(dir.path().join("file.json")));
        let state = web::Data::new(AppState::new(CatalogService::new(storage)));
        let app = test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let response = test::call_service(&app, TestRequest::post().uri("/api/v1/places_search").to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["message"], "Not a JSON");

        let request = TestRequest::post().uri("/api/v1/places_search").insert_header(("Content-Type", "application/json")).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["message"], "Not a JSON");
    }
}
