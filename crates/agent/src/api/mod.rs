use crate::alerts::{EmailSender, Ingested, Pipeline};
use crate::config::ConfigError;
use crate::identity::IdentityLookup;
use crate::store::AlertStore;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use models::{AlertId, AlertPayload};
use std::sync::Arc;

mod error;

pub use error::ApiError;

/// Every response body of the API is an object with a `success` boolean,
/// alongside the fields of the response itself.
#[derive(serde::Serialize)]
struct Envelope<T> {
    success: bool,
    #[serde(flatten)]
    body: T,
}

/// Builds a JSON response in the common envelope.
pub fn respond<T: serde::Serialize>(status: StatusCode, success: bool, body: T) -> Response {
    (status, axum::Json(Envelope { success, body })).into_response()
}

#[derive(Debug, serde::Serialize)]
struct Submitted {
    alert_id: AlertId,
    sent: bool,
}

/// State of the API server. The pipeline is absent when the server was
/// started without its required configuration, in which case submissions
/// are answered with the configuration error.
pub struct App<S, I, ES> {
    pipeline: Result<Arc<Pipeline<S, I, ES>>, ConfigError>,
}

impl<S, I, ES> App<S, I, ES> {
    pub fn new(pipeline: Result<Arc<Pipeline<S, I, ES>>, ConfigError>) -> App<S, I, ES> {
        App { pipeline }
    }

    fn pipeline(&self) -> Result<&Pipeline<S, I, ES>, ConfigError> {
        self.pipeline.as_deref().map_err(Clone::clone)
    }
}

/// Build the agent's API router.
pub fn build_router<S, I, ES>(app: Arc<App<S, I, ES>>) -> axum::Router
where
    S: AlertStore,
    I: IdentityLookup,
    ES: EmailSender,
{
    use axum::routing::get;

    axum::Router::new()
        .route(
            "/",
            get(liveness)
                .post(submit_alert::<S, I, ES>)
                .fallback(method_not_allowed),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(app)
}

async fn liveness() -> &'static str {
    "Smart home alert service is running"
}

async fn method_not_allowed() -> ApiError {
    ApiError::new(
        StatusCode::METHOD_NOT_ALLOWED,
        anyhow::anyhow!("Method not allowed"),
    )
}

/// Stores a submitted alert and attempts to deliver it before responding.
async fn submit_alert<S, I, ES>(
    State(app): State<Arc<App<S, I, ES>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError>
where
    S: AlertStore,
    I: IdentityLookup,
    ES: EmailSender,
{
    if !is_json(&headers) {
        return Err(ApiError::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            anyhow::anyhow!("Content-Type must be application/json"),
        ));
    }

    let pipeline = app.pipeline()?;

    let new_alert = AlertPayload::parse(&body).map_err(|error| {
        tracing::info!(%error, "rejecting alert submission");
        error
    })?;

    let Ingested { alert_id, sent } = pipeline.ingest(&new_alert).await.map_err(|error| {
        tracing::error!(error = %format!("{error:#}"), "failed to store submitted alert");
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            anyhow::anyhow!("failed to store alert, please retry the request"),
        )
    })?;

    Ok(respond(StatusCode::OK, true, Submitted { alert_id, sent }))
}

fn is_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    else {
        return false;
    };
    let Ok(mime) = content_type.parse::<mime::Mime>() else {
        return false;
    };

    mime.type_() == mime::APPLICATION
        && (mime.subtype() == mime::JSON || mime.suffix().is_some_and(|s| s == mime::JSON))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::{self, FakeIdentity, Journal, MemoryStore, TestSender};
    use axum::body::Body;
    use axum::http::Request;
    use models::SentStatus;
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    struct Harness {
        store: MemoryStore,
        sender: TestSender,
        router: axum::Router,
    }

    fn harness() -> Harness {
        let journal = Journal::default();
        let store = MemoryStore::new(&journal);
        let identity = FakeIdentity::new(&journal);
        let sender = TestSender::new(&journal);
        let pipeline = test_support::pipeline(&store, &identity, &sender);
        let router = build_router(Arc::new(App::new(Ok(Arc::new(pipeline)))));
        Harness {
            store,
            sender,
            router,
        }
    }

    async fn call(
        router: &axum::Router,
        method: &str,
        content_type: Option<&str>,
        body: &str,
    ) -> (StatusCode, String) {
        let mut request = Request::builder().method(method).uri("/");
        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }
        let request = request.body(Body::from(body.to_string())).unwrap();

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn json(body: &str) -> serde_json::Value {
        serde_json::from_str(body).unwrap()
    }

    #[tokio::test]
    async fn test_liveness() {
        let h = harness();
        let (status, body) = call(&h.router, "GET", None, "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Smart home alert service is running");
    }

    #[tokio::test]
    async fn test_submit_alert_sends_one_email() {
        let h = harness();
        h.store.set_override("h1", "family@example.com");

        let (status, body) = call(
            &h.router,
            "POST",
            Some("application/json"),
            r#"{"home_id":"h1","device_id":"d1","message":"leak detected"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json(&body),
            serde_json::json!({"success": true, "alert_id": 1, "sent": true})
        );

        let sent = h.sender.take_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Smart Home Alert");
        assert_eq!(sent[0].recipient.email, "family@example.com");
        assert!(sent[0].text.contains("leak detected"));
        assert_eq!(h.store.status(AlertId::new(1)), SentStatus::Sent);
    }

    #[tokio::test]
    async fn test_undeliverable_alert_is_still_accepted() {
        let h = harness();

        let (status, body) = call(
            &h.router,
            "POST",
            Some("application/json; charset=utf-8"),
            r#"{"home_id":"h1","device_id":"d1","message":"leak detected"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json(&body),
            serde_json::json!({"success": true, "alert_id": 1, "sent": false})
        );
        assert_eq!(h.store.status(AlertId::new(1)), SentStatus::Unsent);
        assert!(h.sender.take_sent().is_empty());
    }

    #[tokio::test]
    async fn test_submit_alert_missing_message() {
        let h = harness();
        h.store.set_override("h1", "family@example.com");

        let (status, body) = call(
            &h.router,
            "POST",
            Some("application/json"),
            r#"{"home_id":"h1","device_id":"d1"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            json(&body),
            serde_json::json!({
                "success": false,
                "error": "Invalid message payload: missing required fields",
            })
        );
        assert!(h.store.alerts().is_empty());
        assert!(h.sender.take_sent().is_empty());

        let (status, body) = call(&h.router, "POST", Some("application/json"), "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["success"], false);
        assert!(h.store.alerts().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_non_json_and_other_methods() {
        let h = harness();
        let payload = r#"{"home_id":"h1","device_id":"d1","message":"leak detected"}"#;

        for content_type in [None, Some("text/plain"), Some("application/x-www-form-urlencoded")] {
            let (status, body) = call(&h.router, "POST", content_type, payload).await;
            assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE, "{content_type:?}");
            assert_eq!(json(&body)["success"], false);
        }

        for method in ["PUT", "DELETE", "PATCH"] {
            let (status, body) = call(&h.router, method, Some("application/json"), payload).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{method}");
            assert_eq!(
                json(&body),
                serde_json::json!({"success": false, "error": "Method not allowed"})
            );
        }
        assert!(h.store.alerts().is_empty());
    }

    #[tokio::test]
    async fn test_store_errors_are_500() {
        let h = harness();
        h.store.fail_inserts();

        let (status, body) = call(
            &h.router,
            "POST",
            Some("application/json"),
            r#"{"home_id":"h1","device_id":"d1","message":"leak detected"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json(&body),
            serde_json::json!({
                "success": false,
                "error": "failed to store alert, please retry the request",
            })
        );
    }

    #[tokio::test]
    async fn test_missing_configuration_is_reported() {
        let app: App<MemoryStore, FakeIdentity, TestSender> =
            App::new(Err(ConfigError::Missing("RESEND_API_KEY")));
        let router = build_router(Arc::new(app));

        let (status, body) = call(
            &router,
            "POST",
            Some("application/json"),
            r#"{"home_id":"h1","device_id":"d1","message":"leak detected"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json(&body),
            serde_json::json!({
                "success": false,
                "error": "missing required configuration: RESEND_API_KEY",
            })
        );

        // Liveness doesn't depend on configuration.
        let (status, _) = call(&router, "GET", None, "").await;
        assert_eq!(status, StatusCode::OK);
    }
}
