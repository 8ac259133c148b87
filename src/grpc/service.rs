use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::{info, instrument, warn};

use super::proto::model_service_server::{ModelService, ModelServiceServer};
use super::proto::{
    DeleteModelRequest, DeleteModelResponse, Empty, ModelType, ModelTypesResponse,
    PredictRequest, PredictResponse, RetrainModelRequest, RetrainModelResponse,
    TrainModelRequest, TrainModelResponse,
};
use crate::api::MAX_UPLOAD_BYTES;
use crate::api::state::ModelServiceTrait;
use crate::domain::{BackendErrorKind, DomainError};
use crate::infrastructure::dataset::{parse_csv, parse_params};
use crate::infrastructure::services::TrainRequest;

/// Map a domain error onto an RPC status
pub fn status_from_domain(err: DomainError) -> Status {
    match &err {
        DomainError::NotFound { message } => Status::not_found(message.clone()),
        DomainError::UnsupportedType { .. } => {
            Status::invalid_argument(format!("{}; see GetModelTypes", err))
        }
        DomainError::InvalidParams { .. } => Status::invalid_argument(err.to_string()),
        DomainError::Backend {
            kind: BackendErrorKind::Timeout,
            ..
        } => Status::deadline_exceeded(err.to_string()),
        DomainError::Backend { .. } => Status::internal(err.to_string()),
    }
}

/// tonic adapter over the model service
#[derive(Clone)]
pub struct ModelServiceGrpc {
    service: Arc<dyn ModelServiceTrait>,
}

impl ModelServiceGrpc {
    pub fn new(service: Arc<dyn ModelServiceTrait>) -> Self {
        Self { service }
    }

    /// Server accepting uploads as large as the REST router does
    pub fn into_server(self) -> ModelServiceServer<Self> {
        ModelServiceServer::new(self).max_decoding_message_size(MAX_UPLOAD_BYTES)
    }
}

#[tonic::async_trait]
impl ModelService for ModelServiceGrpc {
    #[instrument(skip_all, fields(model_type = %request.get_ref().model_type, model_name = %request.get_ref().model_name))]
    async fn train_model(
        &self,
        request: Request<TrainModelRequest>,
    ) -> Result<Response<TrainModelResponse>, Status> {
        let request = request.into_inner();
        info!("TrainModel");

        if !self.service.is_supported(&request.model_type) {
            warn!("Unsupported model type requested");
            return Err(status_from_domain(DomainError::unsupported_type(
                request.model_type,
            )));
        }

        let params = parse_params(request.params_json.as_bytes()).map_err(status_from_domain)?;
        let data = parse_csv(&request.file_content).map_err(status_from_domain)?;

        self.service
            .train(TrainRequest {
                model_type: request.model_type,
                model_name: request.model_name,
                params,
                data,
            })
            .await
            .map_err(status_from_domain)?;

        Ok(Response::new(TrainModelResponse {
            message: "Model trained and saved".to_string(),
        }))
    }

    #[instrument(skip_all, fields(model_name = %request.get_ref().model_name))]
    async fn retrain_model(
        &self,
        request: Request<RetrainModelRequest>,
    ) -> Result<Response<RetrainModelResponse>, Status> {
        let request = request.into_inner();
        info!("RetrainModel");

        let data = parse_csv(&request.file_content).map_err(status_from_domain)?;
        self.service
            .retrain(&request.model_name, data)
            .await
            .map_err(status_from_domain)?;

        Ok(Response::new(RetrainModelResponse {
            message: "Model retrained and saved".to_string(),
        }))
    }

    #[instrument(skip_all, fields(model_name = %request.get_ref().model_name))]
    async fn predict(
        &self,
        request: Request<PredictRequest>,
    ) -> Result<Response<PredictResponse>, Status> {
        let request = request.into_inner();
        info!("Predict");

        let data = parse_csv(&request.file_content).map_err(status_from_domain)?;
        let labels = self
            .service
            .predict(&request.model_name, data)
            .await
            .map_err(status_from_domain)?;

        Ok(Response::new(PredictResponse {
            predictions: labels.iter().map(ToString::to_string).collect(),
        }))
    }

    #[instrument(skip_all, fields(model_name = %request.get_ref().model_name))]
    async fn delete_model(
        &self,
        request: Request<DeleteModelRequest>,
    ) -> Result<Response<DeleteModelResponse>, Status> {
        let request = request.into_inner();
        info!("DeleteModel");

        self.service
            .delete(&request.model_name)
            .await
            .map_err(status_from_domain)?;

        Ok(Response::new(DeleteModelResponse {
            message: "Model deleted".to_string(),
        }))
    }

    async fn get_model_types(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<ModelTypesResponse>, Status> {
        info!("GetModelTypes");

        let model_types = self
            .service
            .model_types()
            .into_iter()
            .map(|info| ModelType { name: info.name })
            .collect();

        Ok(Response::new(ModelTypesResponse { model_types }))
    }

    async fn health_check(&self, _request: Request<Empty>) -> Result<Response<Empty>, Status> {
        info!("HealthCheck");
        Ok(Response::new(Empty {}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    use crate::api::state::MockModelServiceTrait;
    use crate::infrastructure::artifact::{ArtifactLayout, ArtifactStore};
    use crate::infrastructure::estimator::EstimatorRegistry;
    use crate::infrastructure::services::ModelService as LifecycleService;
    use crate::infrastructure::storage::InMemoryBackend;

    const TRAINING_CSV: &[u8] =
        b"x1,x2,label\n0.0,0.1,a\n0.3,0.0,a\n0.1,0.4,a\n5.0,5.2,b\n5.3,4.9,b\n4.8,5.1,b\n";

    fn grpc() -> ModelServiceGrpc {
        let store = ArtifactStore::new(Arc::new(InMemoryBackend::new()), ArtifactLayout::default());
        let service = LifecycleService::new(EstimatorRegistry::with_defaults(), store);
        ModelServiceGrpc::new(Arc::new(service))
    }

    fn train_request(model_type: &str, model_name: &str) -> Request<TrainModelRequest> {
        Request::new(TrainModelRequest {
            model_type: model_type.to_string(),
            model_name: model_name.to_string(),
            params_json: r#"{"random_state": 1}"#.to_string(),
            file_content: TRAINING_CSV.to_vec(),
        })
    }

    #[tokio::test]
    async fn test_train_and_predict_as_strings() {
        let svc = grpc();
        svc.train_model(train_request("SVC", "m1")).await.unwrap();

        let response = svc
            .predict(Request::new(PredictRequest {
                model_name: "m1".to_string(),
                file_content: b"x1,x2\n0.2,0.2\n5.1,5.0\n".to_vec(),
            }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.predictions, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_unsupported_type_is_invalid_argument() {
        let status = grpc()
            .train_model(train_request("KNN", "m1"))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn test_missing_model_is_not_found() {
        let svc = grpc();

        let status = svc
            .delete_model(Request::new(DeleteModelRequest {
                model_name: "ghost".to_string(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::NotFound);

        let status = svc
            .retrain_model(Request::new(RetrainModelRequest {
                model_name: "ghost".to_string(),
                file_content: TRAINING_CSV.to_vec(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::NotFound);
    }

    #[tokio::test]
    async fn test_malformed_csv_is_invalid_argument() {
        let status = grpc()
            .predict(Request::new(PredictRequest {
                model_name: "m1".to_string(),
                file_content: b"a,b\n1\n".to_vec(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn test_backend_errors_map_to_internal_and_deadline() {
        let mut service = MockModelServiceTrait::new();
        service.expect_delete().returning(|name| {
            if name == "slow" {
                Err(DomainError::timeout("backend stalled"))
            } else {
                Err(DomainError::io("disk full"))
            }
        });
        let svc = ModelServiceGrpc::new(Arc::new(service));

        let delete = |name: &str| {
            svc.delete_model(Request::new(DeleteModelRequest {
                model_name: name.to_string(),
            }))
        };

        assert_eq!(delete("slow").await.unwrap_err().code(), Code::DeadlineExceeded);
        assert_eq!(delete("m1").await.unwrap_err().code(), Code::Internal);
    }

    #[tokio::test]
    async fn test_model_types_and_health() {
        let svc = grpc();

        let types = svc
            .get_model_types(Request::new(Empty {}))
            .await
            .unwrap()
            .into_inner();
        let names: Vec<_> = types.model_types.into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["SVC", "RandomForest"]);

        assert!(svc.health_check(Request::new(Empty {})).await.is_ok());
    }

    #[tokio::test]
    async fn test_server_accepts_uploads_beyond_default_limit() {
        use crate::grpc::proto::model_service_client::ModelServiceClient;
        use tonic::transport::{Server, server::TcpIncoming};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let incoming = TcpIncoming::from_listener(listener, true, None).unwrap();
        let server = tokio::spawn(
            Server::builder()
                .add_service(grpc().into_server())
                .serve_with_incoming(incoming),
        );

        let mut client = ModelServiceClient::connect(format!("http://{}", addr))
            .await
            .unwrap();

        // ~6 MiB, above tonic's 4 MiB default
        let mut file_content = b"x1\n".to_vec();
        for _ in 0..(3 * 1024 * 1024) {
            file_content.extend_from_slice(b"1\n");
        }

        let status = client
            .predict(PredictRequest {
                model_name: "ghost".to_string(),
                file_content,
            })
            .await
            .unwrap_err();

        // decoded and answered by the service rather than rejected for size
        assert_eq!(status.code(), Code::NotFound);

        server.abort();
    }
}
