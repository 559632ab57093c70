//! Payloads for the variables admin endpoints.

use serde::Deserialize;
use validator::Validate;

use crate::application::services::variable_service::MAX_KEY_LENGTH;

/// `POST /values` body. Upserts by key.
#[derive(Debug, Deserialize, Validate)]
pub struct UpsertVariableRequest {
    #[validate(length(min = 1, max = 255, message = "Key must be 1 to 255 characters"))]
    pub key: String,
    #[serde(default)]
    pub value: String,
}
