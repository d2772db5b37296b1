use actix_web::{web, HttpResponse};
use std::sync::Arc;

use crate::AppState;
use keiba::core::{plan_bets, BetPlan, BetSelection};
use keiba::models::BetRequest;
use keiba::KeibaError;

fn build_plan(state: &AppState, session_id: &str, req: &BetRequest) -> Result<BetPlan, KeibaError> {
    let selection = BetSelection::try_from(req)?;

    let mut sessions = state.sessions()?;
    let session = sessions.get_mut(session_id)?;

    plan_bets(
        &selection,
        &session.entries,
        &state.config.generator(),
        &state.config.planner_options(),
    )
}

/// Combinations and stakes for the session's card
pub async fn plan(
    state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    req: web::Json<BetRequest>,
) -> Result<HttpResponse, KeibaError> {
    let plan = build_plan(&state, &path, &req)?;
    Ok(HttpResponse::Ok().json(plan))
}

/// Plan and record a simulated purchase; nothing is sent anywhere
pub async fn purchase(
    state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    req: web::Json<BetRequest>,
) -> Result<HttpResponse, KeibaError> {
    let plan = build_plan(&state, &path, &req)?;
    Ok(HttpResponse::Ok().json(plan.simulate_purchase()))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::json;

    use crate::configure;
    use crate::handlers::testing;
    use keiba::core::{BetPlan, BetType, PoolSource, PurchaseReceipt};
    use keiba::models::{ErrorResponse, SessionInfo};

    #[actix_web::test]
    async fn test_plan_trio_box() {
        let app = test::init_service(App::new().app_data(testing::state()).configure(configure)).await;

        let req = test::TestRequest::post().uri("/sessions").to_request();
        let info: SessionInfo = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::post()
            .uri(&format!("/sessions/{}/bets", info.session_id))
            .set_json(json!({
                "bet_type": "trio",
                "selected": ["アドマイヤテラ", "カランダガン", "サンプルA", "サンプルB"],
                "budget": 1000
            }))
            .to_request();
        let plan: BetPlan = test::call_and_read_body_json(&app, req).await;

        assert_eq!(plan.bet_type, BetType::Trio);
        assert_eq!(plan.pool_source, PoolSource::Selected);
        assert_eq!(plan.combination_count, 4);
        assert_eq!(plan.summary.total_staked, 1000);
        assert!(!plan.summary.over_budget);
    }

    #[actix_web::test]
    async fn test_plan_with_override_over_budget() {
        let app = test::init_service(App::new().app_data(testing::state()).configure(configure)).await;

        let req = test::TestRequest::post().uri("/sessions").to_request();
        let info: SessionInfo = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::post()
            .uri(&format!("/sessions/{}/bets", info.session_id))
            .set_json(json!({
                "bet_type": "馬単",
                "selected": ["アドマイヤテラ", "カランダガン"],
                "budget": 1000,
                "overrides": [{"combination": ["カランダガン", "アドマイヤテラ"], "stake": 800}]
            }))
            .to_request();
        let plan: BetPlan = test::call_and_read_body_json(&app, req).await;

        assert_eq!(plan.combination_count, 2);
        assert_eq!(plan.summary.total_staked, 1300);
        assert!(plan.summary.over_budget);
        assert_eq!(plan.summary.remaining, -300);
    }

    #[actix_web::test]
    async fn test_plan_errors() {
        let app = test::init_service(App::new().app_data(testing::state()).configure(configure)).await;

        let req = test::TestRequest::post().uri("/sessions").to_request();
        let info: SessionInfo = test::call_and_read_body_json(&app, req).await;
        let uri = format!("/sessions/{}/bets", info.session_id);

        let req = test::TestRequest::post()
            .uri(&uri)
            .set_json(json!({"bet_type": "pick6", "budget": 1000}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.error, "unknown_bet_type");

        let req = test::TestRequest::post()
            .uri(&uri)
            .set_json(json!({"bet_type": "win", "budget": -1}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri(&uri)
            .set_json(json!({"bet_type": "win", "selected": ["不明"], "budget": 100}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_stake_overflow_leaves_server_usable() {
        let app = test::init_service(App::new().app_data(testing::state()).configure(configure)).await;

        let req = test::TestRequest::post().uri("/sessions").to_request();
        let info: SessionInfo = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::post()
            .uri(&format!("/sessions/{}/purchase", info.session_id))
            .set_json(json!({
                "bet_type": "win",
                "selected": ["アドマイヤテラ", "カランダガン"],
                "budget": 1000,
                "overrides": [
                    {"combination": ["アドマイヤテラ"], "stake": i64::MAX},
                    {"combination": ["カランダガン"], "stake": 1}
                ]
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.error, "stake_overflow");

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri(&format!("/sessions/{}/bets", info.session_id))
            .set_json(json!({"bet_type": "win", "selected": ["アドマイヤテラ"], "budget": 100}))
            .to_request();
        let plan: BetPlan = test::call_and_read_body_json(&app, req).await;
        assert_eq!(plan.summary.total_staked, 100);
    }

    #[actix_web::test]
    async fn test_simulated_purchase_skips_zero_stakes() {
        let app = test::init_service(App::new().app_data(testing::state()).configure(configure)).await;

        let req = test::TestRequest::post().uri("/sessions").to_request();
        let info: SessionInfo = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::post()
            .uri(&format!("/sessions/{}/purchase", info.session_id))
            .set_json(json!({
                "bet_type": "win",
                "selected": ["アドマイヤテラ", "カランダガン", "サンプルA"],
                "budget": 1000,
                "auto_allocate": false,
                "overrides": [{"combination": ["カランダガン"], "stake": 500}]
            }))
            .to_request();
        let receipt: PurchaseReceipt = test::call_and_read_body_json(&app, req).await;

        assert_eq!(receipt.tickets.len(), 1);
        assert_eq!(receipt.total_stake, 500);
        assert_eq!(receipt.budget, 1000);
    }
}
