//! API router.
//!
//! Returns a composable `Router`: an unauthenticated liveness route
//! plus the protected `/api` routes behind bearer-token auth.
//! Middleware uses `Extension<ApiContext>` (injected as the outermost
//! layer); endpoint handlers use `State<ApiContext>`.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the full application router.
pub fn api_router(ctx: ApiContext) -> Router {
    // Protected routes — bearer auth required.
    //
    // Layers apply bottom-up: Extension (outermost) → auth → handler.
    // Extension must be outermost so the middleware can extract
    // ApiContext.
    let protected = Router::new()
        .route("/predict", post(endpoints::predict::submit))
        .route("/reports", get(endpoints::reports::list))
        .route(
            "/reports/:id",
            get(endpoints::reports::detail).delete(endpoints::reports::remove),
        )
        .route(
            "/reports/:id/images/:image_id",
            get(endpoints::reports::image),
        )
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(axum::Extension(ctx));

    // The mobile client is served from a different origin.
    Router::new()
        .route("/health", get(endpoints::health::check))
        .nest("/api", protected)
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::api::types::ApiContext;
    use crate::config::AppConfig;
    use crate::db::repository::token;
    use crate::db::sqlite::open_memory_database;
    use crate::predictor::{MockPredictor, PredictorClient};

    fn test_config() -> AppConfig {
        AppConfig::from_lookup(|key| match key {
            "CARDION_PREDICTOR_URL" => Some("http://127.0.0.1:9/predict".to_string()),
            _ => None,
        })
        .unwrap()
    }

    /// Build a context with an in-memory DB and one issued token.
    fn test_context(predictor: PredictorClient) -> (ApiContext, String) {
        let conn = open_memory_database().unwrap();
        let token = token::issue_token(&conn, "user-1").unwrap();
        (ApiContext::new(conn, predictor, test_config()), token)
    }

    fn fusion_predictor(prob: f64) -> PredictorClient {
        PredictorClient::Mock(MockPredictor::respond(
            json!({ "fusion_model": { "disease_prob": prob } }),
        ))
    }

    fn vitals_body() -> Value {
        json!({
            "age": "52",
            "gender": "male",
            "weight": "81.5",
            "height": "178",
            "smokingStatus": "yes",
            "alcoholConsumption": "no",
            "cholesterolLevel": "212",
            "bloodPressure": "135/88",
            "fastingBloodSugar": "no",
            "chestPainType": "no",
            "reportName": "Router test"
        })
    }

    fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(t) = token {
            builder = builder.header("Authorization", format!("Bearer {t}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json");
        if let Some(t) = token {
            builder = builder.header("Authorization", format!("Bearer {t}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn response_json(response: axum::http::Response<Body>) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_needs_no_auth() {
        let (ctx, _token) = test_context(fusion_predictor(0.5));
        let app = api_router(ctx);

        let response = app.oneshot(get_request("/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["status"], "ok");
        assert!(!json["version"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn predict_requires_auth() {
        let (ctx, _token) = test_context(fusion_predictor(0.5));
        let app = api_router(ctx);

        let req = json_request("POST", "/api/predict", None, &vitals_body());
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "AUTH_REQUIRED");
    }

    #[tokio::test]
    async fn invalid_token_returns_401() {
        let (ctx, _token) = test_context(fusion_predictor(0.5));
        let app = api_router(ctx);

        let response = app
            .oneshot(get_request("/api/reports", Some("wrong-token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn predict_full_flow_persists_report() {
        let (ctx, token) = test_context(fusion_predictor(0.9));
        let app = api_router(ctx.clone());

        let req = json_request("POST", "/api/predict", Some(&token), &vitals_body());
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["risk"], "High");
        assert_eq!(json["probability"], 0.9);
        assert_eq!(json["basis"], "fusion_image_tabular");
        assert_eq!(json["report_name"], "Router test");
        assert!(!json["recommendation"].as_str().unwrap().is_empty());
        let report_id = json["report_id"].as_str().unwrap().to_string();

        // The report is now listed for the same user.
        let app = api_router(ctx);
        let response = app
            .oneshot(get_request("/api/reports", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["count"], 1);
        assert_eq!(json["reports"][0]["id"], report_id.as_str());
        assert_eq!(json["reports"][0]["result"]["risk"], "High");
    }

    #[tokio::test]
    async fn predict_with_invalid_gender_returns_400() {
        let (ctx, token) = test_context(fusion_predictor(0.5));
        let app = api_router(ctx);

        let mut body = vitals_body();
        body["gender"] = json!("other");
        let req = json_request("POST", "/api/predict", Some(&token), &body);
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "VALIDATION");
        assert!(json["error"]["message"].as_str().unwrap().contains("gender"));
    }

    #[tokio::test]
    async fn predict_timeout_maps_to_504() {
        let (ctx, token) = test_context(PredictorClient::Mock(MockPredictor::timeout(60)));
        let app = api_router(ctx.clone());

        let req = json_request("POST", "/api/predict", Some(&token), &vitals_body());
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "PREDICTOR_TIMEOUT");

        // Nothing persisted on timeout.
        let app = api_router(ctx);
        let response = app
            .oneshot(get_request("/api/reports", Some(&token)))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["count"], 0);
    }

    #[tokio::test]
    async fn predict_unavailable_maps_to_502() {
        let (ctx, token) = test_context(PredictorClient::Mock(MockPredictor::unavailable(
            "connection refused",
        )));
        let app = api_router(ctx);

        let req = json_request("POST", "/api/predict", Some(&token), &vitals_body());
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "PREDICTOR_UNAVAILABLE");
        // Transport detail is not leaked to the client.
        assert!(!json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("connection refused"));
    }

    #[tokio::test]
    async fn reports_are_isolated_per_user() {
        let (ctx, token) = test_context(fusion_predictor(0.8));

        // user-1 creates a report.
        let app = api_router(ctx.clone());
        let req = json_request("POST", "/api/predict", Some(&token), &vitals_body());
        let response = app.oneshot(req).await.unwrap();
        let report_id = response_json(response).await["report_id"]
            .as_str()
            .unwrap()
            .to_string();

        // user-2 cannot fetch or delete it.
        let other_token = {
            let conn = ctx.db.lock().await;
            token::issue_token(&conn, "user-2").unwrap()
        };

        let app = api_router(ctx.clone());
        let response = app
            .oneshot(get_request(
                &format!("/api/reports/{report_id}"),
                Some(&other_token),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let app = api_router(ctx);
        let req = Request::builder()
            .method("DELETE")
            .uri(format!("/api/reports/{report_id}"))
            .header("Authorization", format!("Bearer {other_token}"))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_then_get_returns_404() {
        let (ctx, token) = test_context(fusion_predictor(0.2));

        let app = api_router(ctx.clone());
        let req = json_request("POST", "/api/predict", Some(&token), &vitals_body());
        let response = app.oneshot(req).await.unwrap();
        let report_id = response_json(response).await["report_id"]
            .as_str()
            .unwrap()
            .to_string();

        let app = api_router(ctx.clone());
        let req = Request::builder()
            .method("DELETE")
            .uri(format!("/api/reports/{report_id}"))
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let app = api_router(ctx);
        let response = app
            .oneshot(get_request(
                &format!("/api/reports/{report_id}"),
                Some(&token),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_report_id_is_400() {
        let (ctx, token) = test_context(fusion_predictor(0.5));
        let app = api_router(ctx);

        let response = app
            .oneshot(get_request("/api/reports/not-a-uuid", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let (ctx, token) = test_context(fusion_predictor(0.5));
        let app = api_router(ctx);

        let response = app
            .oneshot(get_request("/api/nonexistent", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn uploaded_image_round_trips_through_report() {
        let (ctx, token) = test_context(fusion_predictor(0.75));

        let jpeg: Vec<u8> = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9];
        let mut body = vitals_body();
        body["images"] = json!([format!(
            "data:image/jpeg;base64,{}",
            base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &jpeg)
        )]);

        let app = api_router(ctx.clone());
        let req = json_request("POST", "/api/predict", Some(&token), &body);
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let report_id = response_json(response).await["report_id"]
            .as_str()
            .unwrap()
            .to_string();

        // Detail lists the attachment metadata.
        let app = api_router(ctx.clone());
        let response = app
            .oneshot(get_request(
                &format!("/api/reports/{report_id}"),
                Some(&token),
            ))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["images"].as_array().unwrap().len(), 1);
        let image_id = json["images"][0]["id"].as_str().unwrap().to_string();

        // The image endpoint serves the original bytes back.
        let app = api_router(ctx);
        let response = app
            .oneshot(get_request(
                &format!("/api/reports/{report_id}/images/{image_id}"),
                Some(&token),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("Content-Type").unwrap(),
            "image/jpeg"
        );
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .unwrap();
        assert_eq!(bytes.as_ref(), jpeg.as_slice());
    }

    #[tokio::test]
    async fn too_many_images_rejected_before_predictor_runs() {
        // An unavailable predictor proves validation short-circuits.
        let (ctx, token) = test_context(PredictorClient::Mock(MockPredictor::unavailable("down")));
        let app = api_router(ctx);

        let encoded = base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            [0xFFu8, 0xD8, 0xFF, 0xD9],
        );
        let jpeg = encoded.as_str();
        let mut body = vitals_body();
        body["images"] = json!([jpeg, jpeg, jpeg, jpeg]);

        let req = json_request("POST", "/api/predict", Some(&token), &body);
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "VALIDATION");
    }
}
