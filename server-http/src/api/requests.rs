use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct InvalidateRequest {
    pub pattern: String,
}
