use actix_web::{web, HttpResponse};
use std::sync::Arc;

use crate::AppState;
use keiba::models::HealthResponse;
use keiba::KeibaError;

/// Health check endpoint
pub async fn health_check(state: web::Data<Arc<AppState>>) -> Result<HttpResponse, KeibaError> {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_sessions: state.sessions()?.len(),
    };

    Ok(HttpResponse::Ok().json(response))
}

#[cfg(test)]
mod tests {
    use actix_web::{test, App};

    use crate::configure;
    use crate::handlers::testing;
    use keiba::models::HealthResponse;

    #[actix_web::test]
    async fn test_health_check() {
        let app = test::init_service(App::new().app_data(testing::state()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: HealthResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body.status, "ok");
        assert_eq!(body.active_sessions, 0);
    }
}
