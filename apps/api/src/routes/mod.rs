pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::companies::handlers as companies;
use crate::report::handlers as reports;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Reports
        .route("/api/v1/reports", post(reports::handle_report_from_json))
        .route("/api/v1/reports/parse", post(reports::handle_parse_cv))
        .route("/api/v1/reports/from-cv", post(reports::handle_report_from_cv))
        // Company list
        .route(
            "/api/v1/companies",
            get(companies::handle_list_companies).post(companies::handle_add_company),
        )
        .route(
            "/api/v1/companies/:id",
            patch(companies::handle_rename_company).delete(companies::handle_delete_company),
        )
        .with_state(state)
}
