//! Model lifecycle endpoint handlers

use std::collections::HashMap;

use axum::{
    Json,
    extract::{
        Multipart, Query, State, multipart::MultipartRejection, rejection::QueryRejection,
    },
};
use bytes::Bytes;
use tracing::{debug, warn};

use crate::api::state::AppState;
use crate::api::types::{
    ApiError, MessageResponse, ModelNameQuery, ModelTypesResponse, PredictResponse, TrainQuery,
};
use crate::domain::DomainError;
use crate::infrastructure::dataset::{parse_csv, parse_params};
use crate::infrastructure::services::TrainRequest;

/// Multipart fields keyed by name; later duplicates replace earlier ones
struct Upload {
    fields: HashMap<String, Bytes>,
}

impl Upload {
    async fn read(multipart: Result<Multipart, MultipartRejection>) -> Result<Self, ApiError> {
        let mut multipart = multipart
            .map_err(|e| ApiError::bad_request(format!("Expected multipart form data: {}", e)))?;

        let mut fields = HashMap::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let data = field.bytes().await.map_err(|e| {
                ApiError::bad_request(format!("Failed to read field '{}': {}", name, e))
            })?;
            fields.insert(name, data);
        }

        Ok(Self { fields })
    }

    fn take(&mut self, name: &str) -> Result<Bytes, ApiError> {
        self.fields
            .remove(name)
            .ok_or_else(|| ApiError::bad_request(format!("Missing multipart field '{}'", name)))
    }
}

fn query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(value)| value)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

/// POST /train
pub async fn train(
    State(state): State<AppState>,
    params: Result<Query<TrainQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let TrainQuery {
        model_type,
        model_name,
    } = query(params)?;

    // reject unknown types before touching the request body
    if !state.model_service.is_supported(&model_type) {
        warn!(model_type = %model_type, "Unsupported model type requested");
        return Err(DomainError::unsupported_type(model_type).into());
    }

    let mut upload = Upload::read(multipart).await?;
    let params = parse_params(&upload.take("params")?)?;
    let data = parse_csv(&upload.take("file")?)?;

    state
        .model_service
        .train(TrainRequest {
            model_type,
            model_name,
            params,
            data,
        })
        .await?;

    Ok(Json(MessageResponse::new("Model trained and saved")))
}

/// POST /retrain
pub async fn retrain(
    State(state): State<AppState>,
    params: Result<Query<ModelNameQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let ModelNameQuery { model_name } = query(params)?;

    let mut upload = Upload::read(multipart).await?;
    let data = parse_csv(&upload.take("file")?)?;

    state.model_service.retrain(&model_name, data).await?;

    Ok(Json(MessageResponse::new("Model retrained and saved")))
}

/// POST /predict
pub async fn predict(
    State(state): State<AppState>,
    params: Result<Query<ModelNameQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let ModelNameQuery { model_name } = query(params)?;

    let mut upload = Upload::read(multipart).await?;
    let data = parse_csv(&upload.take("file")?)?;

    let labels = state.model_service.predict(&model_name, data).await?;
    debug!(model_name = %model_name, count = labels.len(), "Predictions produced");

    Ok(Json(PredictResponse::from_labels(&labels)))
}

/// DELETE /delete_model
pub async fn delete_model(
    State(state): State<AppState>,
    params: Result<Query<ModelNameQuery>, QueryRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let ModelNameQuery { model_name } = query(params)?;

    state.model_service.delete(&model_name).await?;

    Ok(Json(MessageResponse::new("Model deleted")))
}

/// GET /model-types
pub async fn model_types(State(state): State<AppState>) -> Json<ModelTypesResponse> {
    Json(ModelTypesResponse {
        model_types: state.model_service.model_types(),
    })
}
