#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Not found: {entity} {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Validation failed: {0}")]
    Validation(String),
}
