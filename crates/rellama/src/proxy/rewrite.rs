//! Request body rewriting for model redirects.

use bytes::Bytes;
use serde_json::Value;

use crate::config::ConfigStore;

/// Whether a route's request body carries a rewritable `model` field.
///
/// Only generation and chat completions name a model at the top level; tags,
/// pull, show and friends either have no model or must not be redirected.
pub fn is_rewritable_route(route: &str) -> bool {
    let path = route.split('?').next().unwrap_or(route);
    let path = path.trim_end_matches('/');
    path.ends_with("generate") || path.ends_with("chat")
}

/// Apply the configured model redirect to a request body.
///
/// Returns the original bytes untouched when the body is not a JSON object,
/// has no string `model` field, or the redirect resolves to the same name.
/// A client sending something unexpected still gets its request forwarded;
/// the backend is the one that decides whether to reject it.
pub fn rewrite_model(config: &ConfigStore, body: Bytes) -> Bytes {
    let mut json: Value = match serde_json::from_slice(&body) {
        Ok(json) => json,
        Err(e) => {
            tracing::debug!("Forwarding body as-is (not valid JSON): {e}");
            return body;
        }
    };

    let Some(model) = json.get("model").and_then(Value::as_str) else {
        tracing::debug!("Forwarding body as-is (no model field)");
        return body;
    };

    let resolved = config.resolve_model(model);
    if resolved == model {
        return body;
    }

    tracing::info!("Redirecting model '{model}' to '{resolved}'");
    json["model"] = Value::String(resolved);

    match serde_json::to_vec(&json) {
        Ok(rewritten) => Bytes::from(rewritten),
        Err(e) => {
            tracing::warn!("Failed to serialize rewritten body, forwarding original: {e}");
            body
        }
    }
}
