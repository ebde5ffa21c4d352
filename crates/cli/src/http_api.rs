use act_protocol::{
    codes, serialize_json, ErrorBody, ErrorEnvelope, HealthReport, TranslateRequest,
    TranslateResponse, API_SCHEMA_VERSION,
};
use act_translator::{TranslateError, Translator};
use anyhow::{Context as AnyhowContext, Result};
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderMap, HeaderValue, Method, Response as HttpResponse, StatusCode,
    },
    response::Response,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};

pub(crate) const AUTH_TOKEN_ENV: &str = "ACT_AUTH_TOKEN";

/// Who may call the server: an optional bearer token and the browser origins let through.
#[derive(Clone, Debug, Default)]
pub(crate) struct AccessPolicy {
    token: Option<String>,
    cors: Option<CorsLayer>,
}

impl AccessPolicy {
    /// `flag_token` wins over `ACT_AUTH_TOKEN`. A public server must carry a token.
    /// An origin of `*` lets every browser origin through.
    pub(crate) fn resolve(
        flag_token: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
        cors_origins: &[String],
        public: bool,
    ) -> Result<Self> {
        let token = match flag_token.map(str::to_string).or_else(|| lookup(AUTH_TOKEN_ENV)) {
            Some(raw) if raw.trim().is_empty() => anyhow::bail!("Auth token must be non-empty"),
            Some(raw) => Some(raw.trim().to_string()),
            None => None,
        };
        if public && token.is_none() {
            anyhow::bail!(
                "--public requires an auth token: set --auth-token or export {AUTH_TOKEN_ENV}"
            );
        }
        Ok(Self {
            token,
            cors: cors_layer(cors_origins)?,
        })
    }

    pub(crate) fn requires_token(&self) -> bool {
        self.token.is_some()
    }

    pub(crate) fn allows_browsers(&self) -> bool {
        self.cors.is_some()
    }

    fn authorizes(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = &self.token else {
            return true;
        };
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_credentials)
            .is_some_and(|presented| same_secret(presented, expected))
    }
}

fn cors_layer(origins: &[String]) -> Result<Option<CorsLayer>> {
    if origins.is_empty() {
        return Ok(None);
    }
    let allow_origin = if origins.iter().any(|origin| origin.trim() == "*") {
        AllowOrigin::any()
    } else {
        let values = origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin.trim())
                    .with_context(|| format!("Invalid CORS origin: {origin}"))
            })
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(values)
    };
    Ok(Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([CONTENT_TYPE, AUTHORIZATION]),
    ))
}

/// Credentials of an `Authorization: Bearer <token>` value; the scheme is case-insensitive.
fn bearer_credentials(value: &str) -> Option<&str> {
    let (scheme, credentials) = value.trim().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| credentials.trim())
}

/// Equal-length comparison that inspects every byte.
fn same_secret(presented: &str, expected: &str) -> bool {
    presented.len() == expected.len()
        && presented
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}

/// Resolve `bind`; any non-loopback address needs `public`.
pub(crate) async fn guarded_bind_addrs(bind: &str, public: bool) -> Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host(bind)
        .await
        .with_context(|| format!("Failed to resolve bind address: {bind}"))?
        .collect();
    if addrs.is_empty() {
        anyhow::bail!("Bind address resolved to no socket addresses: {bind}");
    }
    if let Some(exposed) = addrs.iter().find(|addr| !addr.ip().is_loopback()) {
        if !public {
            anyhow::bail!(
                "Refusing to bind to {exposed} without --public. To expose the translator, pass --public and set {AUTH_TOKEN_ENV} (or --auth-token)."
            );
        }
    }
    Ok(addrs)
}

#[derive(Clone)]
pub(crate) struct HttpState {
    pub translator: Translator,
    pub access: AccessPolicy,
}

pub(crate) fn router(state: Arc<HttpState>) -> Router {
    let cors = state.access.cors.clone();
    let router = Router::new()
        .route("/translate", post(translate_handler))
        .route("/health", get(health_handler))
        .with_state(state);
    match cors {
        Some(layer) => router.layer(layer),
        None => router,
    }
}

async fn translate_handler(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, StatusCode> {
    if let Some(rejection) = check_auth(&state, &headers)? {
        return Ok(rejection);
    }

    let request: TranslateRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                ErrorEnvelope::new(
                    codes::INVALID_REQUEST,
                    format!("Invalid JSON request: {err}"),
                    false,
                ),
            );
        }
    };

    let start = Instant::now();
    match state.translator.translate_detailed(&request.source_code).await {
        Ok(translation) => json_response(
            StatusCode::OK,
            &TranslateResponse::new(
                translation.text,
                translation.prompt.example_count,
                u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            ),
        ),
        Err(err) => {
            if err.is_bad_input() {
                log::debug!("Rejected translate request: {err}");
            } else {
                log::warn!("Translate request failed: {err}");
            }
            error_response(status_for(&err), envelope_for(&err))
        }
    }
}

async fn health_handler(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    if let Some(rejection) = check_auth(&state, &headers)? {
        return Ok(rejection);
    }

    let store = state.translator.context().store();
    json_response(
        StatusCode::OK,
        &HealthReport {
            status: "ok".to_string(),
            schema_version: API_SCHEMA_VERSION,
            examples: store.len(),
            dimension: store.dimension(),
            embedding_model: store.embedding_model().to_string(),
        },
    )
}

/// Bad input is the caller's fault; everything else is ours or upstream's.
pub(crate) fn status_for(err: &TranslateError) -> StatusCode {
    if err.is_bad_input() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

pub(crate) fn envelope_for(err: &TranslateError) -> ErrorEnvelope {
    ErrorEnvelope::new(err.code(), err.to_string(), err.is_retryable())
}

fn check_auth(state: &HttpState, headers: &HeaderMap) -> Result<Option<Response>, StatusCode> {
    if state.access.authorizes(headers) {
        return Ok(None);
    }
    error_response(
        StatusCode::UNAUTHORIZED,
        ErrorEnvelope::new(
            codes::UNAUTHORIZED,
            "Missing or invalid Authorization header",
            false,
        ),
    )
    .map(Some)
}

fn error_response(status: StatusCode, error: ErrorEnvelope) -> Result<Response, StatusCode> {
    json_response(status, &ErrorBody { error })
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Result<Response, StatusCode> {
    let bytes = serialize_json(value)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .into_bytes();

    let mut builder = HttpResponse::builder()
        .status(status)
        .header("content-type", "application/json");
    if status == StatusCode::UNAUTHORIZED {
        builder = builder.header("www-authenticate", "Bearer");
    }
    builder
        .body(Body::from(bytes))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use act_translator::{
        CompletionClient, CompletionError, CompletionRequest, CompletionResult, PromptTemplate,
        TranslationContext, TranslatorSettings,
    };
    use act_vector_store::{Embedder, Example, ExampleStore, StubEmbedder};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    struct FencedReply;

    #[async_trait]
    impl CompletionClient for FencedReply {
        fn model_id(&self) -> &str {
            "fenced"
        }

        async fn complete(&self, request: &CompletionRequest) -> CompletionResult<String> {
            if request.prompt.contains("FAIL") {
                return Err(CompletionError::EmptyResponse);
            }
            Ok("```csharp\nConsole.WriteLine(\"hi\");\n```".to_string())
        }
    }

    fn policy(token: Option<&str>, origins: &[&str]) -> AccessPolicy {
        let origins: Vec<String> = origins.iter().map(|o| (*o).to_string()).collect();
        AccessPolicy::resolve(token, |_| None, &origins, false).unwrap()
    }

    async fn spawn_server(access: AccessPolicy) -> String {
        let embedder = StubEmbedder::new(8);
        let mut store = ExampleStore::new(8, embedder.model_id());
        let example = Example::new("WriteLn('hi');", "Console.WriteLine(\"hi\");");
        let vector = embedder.embed(&example.input).await.unwrap();
        store.push(example, &vector).unwrap();

        let context = TranslationContext::new(
            Arc::new(store),
            Arc::new(embedder),
            Arc::new(FencedReply),
            PromptTemplate::default(),
            TranslatorSettings::default(),
        )
        .unwrap();
        let state = Arc::new(HttpState {
            translator: Translator::new(Arc::new(context)),
            access,
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn translate_returns_cleaned_code() {
        let base = spawn_server(AccessPolicy::default()).await;
        let response = reqwest::Client::new()
            .post(format!("{base}/translate"))
            .json(&json!({"delphi_code": "WriteLn('hi');"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["translated_code"], "Console.WriteLine(\"hi\");");
        assert_eq!(body["translated_csharp"], "Console.WriteLine(\"hi\");");
        assert_eq!(body["examples_used"], 1);
    }

    #[tokio::test]
    async fn blank_source_is_bad_request() {
        let base = spawn_server(AccessPolicy::default()).await;
        let response = reqwest::Client::new()
            .post(format!("{base}/translate"))
            .json(&json!({"source_code": "   "}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"]["code"], "empty_input");
        assert_eq!(body["error"]["retryable"], false);
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let base = spawn_server(AccessPolicy::default()).await;
        let response = reqwest::Client::new()
            .post(format!("{base}/translate"))
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"]["code"], "invalid_request");
    }

    #[tokio::test]
    async fn upstream_failure_is_internal_error() {
        let base = spawn_server(AccessPolicy::default()).await;
        let response = reqwest::Client::new()
            .post(format!("{base}/translate"))
            .json(&json!({"source_code": "FAIL"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 500);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"]["code"], "generation_failed");
        assert_eq!(body["error"]["retryable"], true);
    }

    #[tokio::test]
    async fn auth_token_guards_every_route() {
        let base = spawn_server(policy(Some("tok"), &[])).await;
        let client = reqwest::Client::new();

        let denied = client.get(format!("{base}/health")).send().await.unwrap();
        assert_eq!(denied.status(), 401);
        assert_eq!(
            denied.headers().get("www-authenticate").unwrap(),
            "Bearer"
        );

        let health: HealthReport = client
            .get(format!("{base}/health"))
            .bearer_auth("tok")
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health.status, "ok");
        assert_eq!(health.examples, 1);
        assert_eq!(health.dimension, 8);
        assert_eq!(health.embedding_model, "stub");
    }

    #[test]
    fn status_mapping_splits_input_from_internal() {
        assert_eq!(
            status_for(&TranslateError::EmptyInput),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&TranslateError::IndexOutOfRange {
                position: 9,
                len: 1
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let envelope = envelope_for(&TranslateError::DimensionMismatch {
            expected: 1536,
            actual: 8,
        });
        assert_eq!(envelope.code, "dimension_mismatch");
        assert!(!envelope.retryable);
        assert!(envelope.hint.is_some());
    }

    #[tokio::test]
    async fn listed_origin_gets_cors_headers() {
        let base = spawn_server(policy(None, &["http://localhost:3000"])).await;
        let client = reqwest::Client::new();

        let preflight = client
            .request(reqwest::Method::OPTIONS, format!("{base}/translate"))
            .header("origin", "http://localhost:3000")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type")
            .send()
            .await
            .unwrap();
        assert!(preflight.status().is_success());
        assert_eq!(
            preflight
                .headers()
                .get("access-control-allow-origin")
                .unwrap(),
            "http://localhost:3000"
        );

        let allowed = client
            .post(format!("{base}/translate"))
            .header("origin", "http://localhost:3000")
            .json(&json!({"delphi_code": "WriteLn('hi');"}))
            .send()
            .await
            .unwrap();
        assert_eq!(allowed.status(), 200);
        assert_eq!(
            allowed.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:3000"
        );

        let other = client
            .get(format!("{base}/health"))
            .header("origin", "http://evil.example")
            .send()
            .await
            .unwrap();
        assert!(other.headers().get("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn no_cors_headers_unless_enabled() {
        let base = spawn_server(AccessPolicy::default()).await;
        let response = reqwest::Client::new()
            .get(format!("{base}/health"))
            .header("origin", "http://localhost:3000")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert!(response
            .headers()
            .get("access-control-allow-origin")
            .is_none());
    }

    #[test]
    fn wildcard_origin_and_bad_origins() {
        assert!(policy(None, &["*"]).allows_browsers());
        assert!(!policy(None, &[]).allows_browsers());
        assert!(
            AccessPolicy::resolve(None, |_| None, &["bad\norigin".to_string()], false).is_err()
        );
    }

    #[test]
    fn bearer_scheme_is_case_insensitive_and_token_exact() {
        let access = policy(Some("  s3cret  "), &[]);
        let with = |value: &str| {
            let mut headers = HeaderMap::new();
            headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
            headers
        };
        assert!(access.authorizes(&with("Bearer s3cret")));
        assert!(access.authorizes(&with("bearer   s3cret ")));
        assert!(!access.authorizes(&with("s3cret")));
        assert!(!access.authorizes(&with("Basic s3cret")));
        assert!(!access.authorizes(&with("Bearer s3cre")));
        assert!(!access.authorizes(&HeaderMap::new()));
        assert!(AccessPolicy::default().authorizes(&HeaderMap::new()));
    }

    #[test]
    fn token_sources_and_public_requirement() {
        let from_env = AccessPolicy::resolve(
            None,
            |key| (key == AUTH_TOKEN_ENV).then(|| "env-token".to_string()),
            &[],
            true,
        )
        .unwrap();
        assert_eq!(from_env.token.as_deref(), Some("env-token"));

        let flag_wins = AccessPolicy::resolve(
            Some("flag-token"),
            |_| Some("env-token".to_string()),
            &[],
            false,
        )
        .unwrap();
        assert_eq!(flag_wins.token.as_deref(), Some("flag-token"));

        assert!(AccessPolicy::resolve(Some("   "), |_| None, &[], false).is_err());
        let err = AccessPolicy::resolve(None, |_| None, &[], true).unwrap_err();
        assert!(err.to_string().contains("--public requires an auth token"));
    }

    #[tokio::test]
    async fn non_loopback_bind_needs_public() {
        guarded_bind_addrs("127.0.0.1:0", false).await.unwrap();
        let err = guarded_bind_addrs("0.0.0.0:0", false).await.unwrap_err();
        assert!(err.to_string().starts_with("Refusing to bind to 0.0.0.0:0"));
        guarded_bind_addrs("0.0.0.0:0", true).await.unwrap();
    }
}
