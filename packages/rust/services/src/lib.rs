//! HTTP plumbing for the services Aragorn chains together.
//!
//! [`ServiceClient::post`] is the single request/response primitive: every
//! stage goes through it and gets either the decoded JSON object or an
//! [`AragornError`] naming the service. The [`clients`] module binds it to the
//! concrete Strider, Answer Coalesce and aragorn-ranker endpoints.

pub mod clients;

use std::time::Duration;

use aragorn_shared::{AragornError, JsonMap, Result};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error, instrument};
use url::Url;

pub use clients::{coalesce, expand, overlay, score, score_request, weight};

/// Maximum number of redirects to follow on a service call.
const MAX_REDIRECTS: usize = 5;

/// User-Agent string for service requests.
const USER_AGENT: &str = concat!("Aragorn/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client for all pipeline stages.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    client: Client,
}

impl ServiceClient {
    /// Build a client. `timeout_secs = None` keeps reqwest's default (no timeout).
    pub fn new(timeout_secs: Option<u64>) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS));

        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder
            .build()
            .map_err(|e| AragornError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// POST `body` as JSON to a named service and decode the reply as a JSON object.
    ///
    /// Any non-success status is logged and returned as [`AragornError::Upstream`].
    /// A success body that is not a JSON object is [`AragornError::Decode`].
    /// An empty object `{}` is a valid reply here; callers decide whether it's usable.
    #[instrument(skip_all, fields(service = name, url = %url))]
    pub async fn post<B>(
        &self,
        name: &str,
        url: &Url,
        body: &B,
        params: Option<&[(&str, &str)]>,
    ) -> Result<JsonMap>
    where
        B: Serialize + ?Sized,
    {
        let mut request = self.client.post(url.clone()).json(body);
        if let Some(params) = params {
            request = request.query(params);
        }

        let response = request.send().await.map_err(|e| {
            error!(service = name, error = %e, "request to service failed");
            AragornError::Network(format!("{name} ({url}): {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(
                service = name,
                status = status.as_u16(),
                "error response from service"
            );
            return Err(AragornError::Upstream {
                service: name.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await.map_err(|e| {
            AragornError::Network(format!("{name} ({url}): failed to read body: {e}"))
        })?;

        let decoded = decode_object(name, &text).inspect_err(|e| {
            error!(service = name, error = %e, "undecodable response from service");
        })?;

        debug!(service = name, keys = decoded.len(), "service responded");
        Ok(decoded)
    }
}

/// Parse `text` as a JSON object, attributing failures to `service`.
pub(crate) fn decode_object(service: &str, text: &str) -> Result<JsonMap> {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(other) => Err(AragornError::decode(
            service,
            format!("expected a JSON object, got {}", json_kind(&other)),
        )),
        Err(e) => Err(AragornError::decode(service, e)),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn url_for(server: &MockServer, route: &str) -> Url {
        Url::parse(&format!("{}{route}", server.uri())).unwrap()
    }

    #[tokio::test]
    async fn post_returns_decoded_body_on_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/echo"))
            .and(body_json(json!({"ping": true})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"x": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let client = ServiceClient::new(Some(5)).unwrap();
        let answer = client
            .post("echo", &url_for(&server, "/echo"), &json!({"ping": true}), None)
            .await
            .unwrap();

        assert_eq!(serde_json::Value::Object(answer), json!({"x": 1}));
    }

    #[tokio::test]
    async fn post_non_success_is_upstream_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/score"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "boom"})))
            .mount(&server)
            .await;

        let client = ServiceClient::new(None).unwrap();
        let err = client
            .post("score", &url_for(&server, "/score"), &json!({}), None)
            .await
            .unwrap_err();

        match err {
            AragornError::Upstream { service, status } => {
                assert_eq!(service, "score");
                assert_eq!(status, 500);
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn post_sends_query_params() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/overlay"))
            .and(query_param("max_results", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = ServiceClient::new(None).unwrap();
        let answer = client
            .post(
                "omnicorp",
                &url_for(&server, "/overlay"),
                &json!({}),
                Some(&[("max_results", "10")]),
            )
            .await
            .unwrap();

        assert_eq!(answer.get("ok"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn post_empty_object_is_not_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = ServiceClient::new(None).unwrap();
        let answer = client
            .post("weight", &url_for(&server, "/weight"), &json!({}), None)
            .await
            .unwrap();

        assert!(answer.is_empty());
    }

    #[tokio::test]
    async fn post_non_object_body_is_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[1, 2, 3]"))
            .mount(&server)
            .await;

        let client = ServiceClient::new(None).unwrap();
        let err = client
            .post("coalesce", &url_for(&server, "/coalesce/all"), &json!({}), None)
            .await
            .unwrap_err();

        assert!(matches!(err, AragornError::Decode { .. }));
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn decode_object_rejects_garbage() {
        let err = decode_object("strider", "<html>nope</html>").unwrap_err();
        assert!(err.to_string().starts_with("could not decode response from strider"));
    }
}
