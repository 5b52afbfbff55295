use crate::service::catalog::CatalogService;

/**
* Represents the application state shared across the Actix web application.
*/
pub struct AppState {
    /**
     * The catalog service handling every entity operation and the place search.
     */
    pub catalog_service: CatalogService,
}

/**
 * Creates a new instance of `AppState`.
 *
 * # Arguments
 * `catalog_service`: The catalog service bound to the configured storage engine.
 */
impl AppState {
    pub fn new(catalog_service: CatalogService) -> Self {
        AppState { catalog_service }
    }
}
