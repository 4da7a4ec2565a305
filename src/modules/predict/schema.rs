use serde::{Deserialize, Serialize};

use crate::modules::predict::error::FaultKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub transcript: String,
    pub translation: String,
    pub target_language: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub kind: FaultKind,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct FormatsResponse {
    pub formats: Vec<&'static str>,
    pub default_target_language: &'static str,
}
