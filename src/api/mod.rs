pub mod endpoints;
pub mod middleware;
pub mod place_endpoints;
pub mod rest;
pub mod state;
