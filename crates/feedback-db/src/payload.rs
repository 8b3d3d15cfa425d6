use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

/// Lenient request body: JSON or urlencoded form, falling back to
/// `T::default()` when the body is missing or malformed.
#[derive(Debug)]
pub struct Payload<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(false);
        let parsed = if is_form {
            Form::<T>::from_request(req, state)
                .await
                .map(|Form(value)| value)
                .ok()
        } else {
            Json::<T>::from_request(req, state)
                .await
                .map(|Json(value)| value)
                .ok()
        };
        Ok(Self(parsed.unwrap_or_default()))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentPayload {
    #[serde(default)]
    pub text: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteCommentPayload {
    #[serde(default)]
    pub index: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditCommentPayload {
    #[serde(default)]
    pub index: Value,
    #[serde(default)]
    pub new_text: Value,
}

/// Reads a text field the way a loosely typed client sends it: scalars are
/// stringified, anything else counts as empty.
pub fn text_field(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

/// Accepts a non-negative integer or a string holding one.
pub fn index_field(value: &Value) -> Option<usize> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                    .map(|f| f as u64)
            })
            .and_then(|n| usize::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
