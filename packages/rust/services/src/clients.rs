//! Per-service clients: Strider expansion, Answer Coalesce, and the three
//! aragorn-ranker stages.

use aragorn_shared::{AragornError, Endpoints, ExpansionSource, JsonMap, Message, Result};
use tracing::{debug, instrument};

use crate::{ServiceClient, decode_object};

/// Service names used in logs and errors.
pub const STRIDER: &str = "strider";
pub const COALESCE: &str = "coalesce";
pub const OMNICORP: &str = "omnicorp";
pub const WEIGHT: &str = "weight";
pub const SCORE: &str = "score";

/// Expand a query into answers, either via Strider or a captured fixture.
#[instrument(skip_all)]
pub async fn expand(
    client: &ServiceClient,
    source: &ExpansionSource,
    message: &Message,
) -> Result<JsonMap> {
    match source {
        ExpansionSource::Service(url) => client.post(STRIDER, url, message, None).await,
        ExpansionSource::Fixture(path) => {
            debug!(path = %path.display(), "reading strider answer from fixture");
            let text = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| AragornError::io(path, e))?;
            decode_object(STRIDER, &text)
        }
    }
}

/// Merge equivalent answers with the given coalesce method.
#[instrument(skip_all, fields(kind = %kind))]
pub async fn coalesce(
    client: &ServiceClient,
    endpoints: &Endpoints,
    kind: &str,
    answer: &JsonMap,
) -> Result<JsonMap> {
    let url = endpoints.coalesce_for(kind)?;
    client.post(COALESCE, &url, answer, None).await
}

/// Overlay literature co-occurrence (omnicorp) onto the answer graph.
#[instrument(skip_all)]
pub async fn overlay(
    client: &ServiceClient,
    endpoints: &Endpoints,
    answer: &JsonMap,
) -> Result<JsonMap> {
    client.post(OMNICORP, &endpoints.omnicorp, answer, None).await
}

/// Apply correctness weighting to the overlaid answer.
#[instrument(skip_all)]
pub async fn weight(
    client: &ServiceClient,
    endpoints: &Endpoints,
    answer: &JsonMap,
) -> Result<JsonMap> {
    client.post(WEIGHT, &endpoints.weight, answer, None).await
}

/// Score the weighted answer. The request is always a `{"message": ...}` envelope.
#[instrument(skip_all)]
pub async fn score(
    client: &ServiceClient,
    endpoints: &Endpoints,
    answer: &JsonMap,
) -> Result<JsonMap> {
    let request = score_request(answer);
    client.post(SCORE, &endpoints.score, &request, None).await
}

/// Build the scoring request envelope.
///
/// A weighted answer that already carries a top-level `message` object is sent
/// as `{"message": <that object>}`; anything else is wrapped whole.
pub fn score_request(answer: &JsonMap) -> JsonMap {
    let inner = match answer.get("message") {
        Some(message @ serde_json::Value::Object(_)) => message.clone(),
        _ => serde_json::Value::Object(answer.clone()),
    };

    let mut envelope = JsonMap::new();
    envelope.insert("message".to_string(), inner);
    envelope
}
