use crate::types::Principal;
use axum::{Json, extract::Request};
use serde_json::{Value, json};

pub async fn health() -> &'static str {
    "OK"
}

/// Fallback for protected paths that have no handler mounted in this
/// process. Reports what the gates let through so deployments can be
/// checked end to end.
pub async fn echo_principal(req: Request) -> Json<Value> {
    let principal = req.extensions().get::<Principal>().map(|p| {
        json!({
            "userID": p.user_id,
            "role": p.role,
            "email": p.email,
        })
    });

    Json(json!({
        "method": req.method().as_str(),
        "path": req.uri().path(),
        "principal": principal,
    }))
}
