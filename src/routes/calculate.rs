//! The main webhook endpoint: `POST /calculate`.

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use http::StatusCode;
use serde::Serialize;
use validator::{Validate, ValidationErrors};

use crate::{
    AppState,
    models::{ImpactResponse, UsageRequest},
    services::generate_calculation_id,
};

/// Body returned for request-shape validation failures (HTTP 422).
#[derive(Debug, Serialize)]
struct ValidationErrorBody {
    error: &'static str,
    details: ValidationErrors,
}

/// Calculate the environmental impact of one AI model inference call.
///
/// Returns HTTP 200 for both successful calculations and handled
/// calculation failures (`success = false`); only request-shape validation
/// problems produce a non-200 status (422).
#[tracing::instrument(name = "calculate", skip_all, fields(model = %request.model))]
pub async fn calculate(
    State(state): State<AppState>,
    Json(request): Json<UsageRequest>,
) -> Response {
    if let Err(details) = request.validate() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ValidationErrorBody {
                error: "Request validation failed",
                details,
            }),
        )
            .into_response();
    }

    let model = request.sanitized_model();
    let result =
        state
            .services
            .calculation
            .calculate(&model, request.input_tokens, request.output_tokens);
    let calculation_id =
        generate_calculation_id(&model, request.input_tokens, request.output_tokens);

    tracing::info!(
        success = result.success,
        calculation_id = %calculation_id,
        "calculation completed"
    );

    Json(ImpactResponse {
        model,
        input_tokens: request.input_tokens,
        output_tokens: request.output_tokens,
        total_tokens: request.input_tokens + request.output_tokens,
        energy_kwh: result.energy_kwh,
        gwp_kgco2eq: result.gwp_kgco2eq,
        calculation_id,
        timestamp: Utc::now().to_rfc3339(),
        success: result.success,
        error: result.error,
    })
    .into_response()
}

#[cfg(test)]
mod tests {
    use axum::{Router, body::Body};
    use http::Request;
    use http::StatusCode;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::test_support::test_app;

    async fn post_calculate(app: &Router, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/calculate")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn successful_calculation_returns_200() {
        let app = test_app("");

        let (status, body) = post_calculate(
            &app,
            json!({"model": "gpt-4o", "input_tokens": 1000, "output_tokens": 500}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["total_tokens"], 1500);
        assert!(body["energy_kwh"].as_f64().unwrap() > 0.0);
        assert!(body["gwp_kgco2eq"].as_f64().unwrap() > 0.0);
        assert!(body.get("error").is_none());
        assert!(body["timestamp"].as_str().unwrap().contains('T'));
    }

    #[tokio::test]
    async fn typo_model_is_normalized() {
        let app = test_app("");

        let (status, body) = post_calculate(
            &app,
            json!({"model": "gpt4o", "input_tokens": 1000, "output_tokens": 500}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn unknown_model_is_a_handled_failure_with_200() {
        let app = test_app("");

        let (status, body) = post_calculate(
            &app,
            json!({"model": "definitely-not-a-model-xyz", "input_tokens": 100, "output_tokens": 50}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert!(
            body["error"].as_str().unwrap().contains("not supported"),
            "unexpected error: {}",
            body["error"]
        );
        assert_eq!(body["energy_kwh"], 0.0);
        assert_eq!(body["gwp_kgco2eq"], 0.0);
    }

    #[tokio::test]
    async fn negative_tokens_fail_request_validation() {
        let app = test_app("");

        let (status, body) = post_calculate(
            &app,
            json!({"model": "gpt-4o", "input_tokens": -1, "output_tokens": 500}),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Request validation failed");
    }

    #[tokio::test]
    async fn disallowed_model_characters_fail_request_validation() {
        let app = test_app("");

        let (status, _) = post_calculate(
            &app,
            json!({"model": "gpt@4o", "input_tokens": 1, "output_tokens": 1}),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn oversized_metadata_fails_request_validation() {
        let app = test_app("");

        let (status, _) = post_calculate(
            &app,
            json!({
                "model": "gpt-4o",
                "input_tokens": 1,
                "output_tokens": 1,
                "metadata": {"blob": "x".repeat(2000)}
            }),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn calculation_ids_are_unique_per_call() {
        let app = test_app("");
        let payload = json!({"model": "gpt-4o", "input_tokens": 1000, "output_tokens": 500});

        let (_, first) = post_calculate(&app, payload.clone()).await;
        let (_, second) = post_calculate(&app, payload).await;

        let first_id = first["calculation_id"].as_str().unwrap();
        let second_id = second["calculation_id"].as_str().unwrap();
        assert!(first_id.starts_with("calc-"));
        assert_eq!(first_id.len(), "calc-".len() + 16);
        assert_ne!(first_id, second_id);

        // Figures for identical inputs are identical even though IDs differ
        assert_eq!(first["energy_kwh"], second["energy_kwh"]);
        assert_eq!(first["gwp_kgco2eq"], second["gwp_kgco2eq"]);
    }

    #[tokio::test]
    async fn model_is_echoed_lowercased_and_trimmed() {
        let app = test_app("");

        let (_, body) = post_calculate(
            &app,
            json!({"model": "  GPT-4o  ", "input_tokens": 10, "output_tokens": 10}),
        )
        .await;

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["success"], true);
    }
}
