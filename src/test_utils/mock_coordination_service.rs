use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio_stream::wrappers::ReceiverStream;
use tonic::codec::CompressionEncoding;
use tonic::Request;
use tonic::Response;
use tonic::Status;
use tracing::debug;

use crate::proto::v1::coordination_service_server::CoordinationService;
use crate::proto::v1::coordination_service_server::CoordinationServiceServer;
use crate::proto::v1::CompareAndSetRequest;
use crate::proto::v1::CompareAndSetResponse;
use crate::proto::v1::GetRequest;
use crate::proto::v1::GetResponse;
use crate::proto::v1::WatchRequest;
use crate::proto::v1::WatchUpdate;
use crate::CoordinationStore;
use crate::MemoryStore;
use crate::Version;

/// In-process coordination service speaking the real wire protocol, backed
/// by a [`MemoryStore`]. Lets unit tests exercise [`crate::GrpcStore`]
/// end to end without an external server.
pub struct MockCoordinationNode {
    pub store: Arc<MemoryStore>,
}

impl MockCoordinationNode {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// Serves on an ephemeral localhost port until `rx` resolves.
    /// Returns the bound address.
    pub async fn mock_listener(self, rx: oneshot::Receiver<()>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        debug!("starting mock coordination service on {addr}");

        tokio::spawn(async move {
            tonic::transport::Server::builder()
                .add_service(
                    CoordinationServiceServer::new(self)
                        .accept_compressed(CompressionEncoding::Gzip)
                        .send_compressed(CompressionEncoding::Gzip),
                )
                .serve_with_incoming_shutdown(tokio_stream::wrappers::TcpListenerStream::new(listener), async {
                    rx.await.ok();
                })
                .await
                .unwrap();
        });

        addr
    }
}

#[tonic::async_trait]
impl CoordinationService for MockCoordinationNode {
    async fn get(&self, request: Request<GetRequest>) -> Result<Response<GetResponse>, Status> {
        let req = request.into_inner();
        match self.store.get(&req.path).await {
            Ok(value) => Ok(Response::new(GetResponse {
                value: value.data,
                version: value.version.0,
            })),
            Err(e) => Err(Status::not_found(e.to_string())),
        }
    }

    async fn compare_and_set(
        &self,
        request: Request<CompareAndSetRequest>,
    ) -> Result<Response<CompareAndSetResponse>, Status> {
        let req = request.into_inner();
        match self
            .store
            .compare_and_set(&req.path, req.value, Version(req.expected_version))
            .await
        {
            Ok(version) => Ok(Response::new(CompareAndSetResponse { version: version.0 })),
            Err(e) if e.is_cas_conflict() => Err(Status::aborted(e.to_string())),
            Err(e) => Err(Status::not_found(e.to_string())),
        }
    }

    type GetAndWatchStream = ReceiverStream<Result<WatchUpdate, Status>>;

    async fn get_and_watch(
        &self,
        request: Request<WatchRequest>,
    ) -> Result<Response<Self::GetAndWatchStream>, Status> {
        let req = request.into_inner();
        let (value, signal) = self
            .store
            .get_and_watch(&req.path)
            .await
            .map_err(|e| Status::not_found(e.to_string()))?;

        let (tx, rx) = mpsc::channel(2);
        tx.send(Ok(WatchUpdate {
            value: value.data,
            version: value.version.0,
            fired: false,
        }))
        .await
        .ok();

        let store = self.store.clone();
        tokio::spawn(async move {
            match signal.await {
                Ok(Ok(())) => {
                    let update = match store.get(&req.path).await {
                        Ok(value) => Ok(WatchUpdate {
                            value: value.data,
                            version: value.version.0,
                            fired: true,
                        }),
                        Err(e) => Err(Status::internal(e.to_string())),
                    };
                    tx.send(update).await.ok();
                }
                Ok(Err(fault)) => {
                    tx.send(Err(Status::internal(fault.to_string()))).await.ok();
                }
                Err(_) => {}
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
