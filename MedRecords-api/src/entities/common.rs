use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 400 body: messages keyed by field, or one such map per item for batch requests
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidationErrorResponse {
    #[schema(value_type = Object, example = json!({"age": ["Ensure this value is greater than or equal to 0."]}))]
    pub error: serde_json::Value,
}

/// 403 and 404 body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DetailResponse {
    #[schema(example = "Not found.")]
    pub detail: String,
}

/// 500 body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UnexpectedErrorResponse {
    /// Always "Something went wrong"
    pub error: String,
    /// Error text; its format is not stable
    pub details: String,
}
