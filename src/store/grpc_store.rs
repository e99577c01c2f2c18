use std::time::Duration;

use tokio::sync::oneshot;
use tokio_stream::StreamExt;
use tonic::async_trait;
use tonic::codec::CompressionEncoding;
use tonic::transport::Channel;
use tonic::transport::Endpoint;
use tonic::Code;
use tonic::Status;
use tracing::debug;
use tracing::error;
use tracing::info;

use super::CoordinationStore;
use super::Version;
use super::VersionedValue;
use super::WatchSignal;
use crate::proto::v1::coordination_service_client::CoordinationServiceClient;
use crate::proto::v1::CompareAndSetRequest;
use crate::proto::v1::GetRequest;
use crate::proto::v1::WatchRequest;
use crate::utils::split_hosts;
use crate::ConnectionError;
use crate::Error;
use crate::Result;
use crate::WatchError;
use crate::WatcherConfig;

/// Remote coordination store over gRPC.
///
/// Holds exactly one channel for the handle's lifetime. Hosts from the
/// comma-separated list are probed in order at construction; the first one
/// that accepts a connection wins. No reconnection is attempted at this
/// layer — a lost connection surfaces as read/write/watch errors.
#[derive(Clone, Debug)]
pub struct GrpcStore {
    // Tonic's Channel is thread-safe and reference-counted.
    channel: Channel,
    config: WatcherConfig,
}

impl GrpcStore {
    /// Probes each host in `hosts` and keeps the first reachable channel.
    pub async fn connect(hosts: &str, config: &WatcherConfig) -> Result<Self> {
        let endpoints = split_hosts(hosts)?;

        for addr in &endpoints {
            match Self::create_channel(addr.clone(), config).await {
                Ok(channel) => {
                    info!("connected to coordination service at {addr}");
                    return Ok(Self {
                        channel,
                        config: config.clone(),
                    });
                }
                Err(e) => {
                    error!("connect to {addr} failed: {e:?}");
                    continue; // Connection failed, try next
                }
            }
        }

        Err(ConnectionError::NoReachableHost { hosts: endpoints }.into())
    }

    pub(crate) async fn create_channel(addr: String, config: &WatcherConfig) -> Result<Channel> {
        debug!("create_channel, addr = {:?}", &addr);
        let mut endpoint = Endpoint::try_from(addr.clone())
            .map_err(|_| ConnectionError::InvalidUri(addr))?
            .connect_timeout(config.connect_timeout())
            .tcp_keepalive(Some(Duration::from_secs(config.tcp_keepalive_in_secs)))
            .http2_keep_alive_interval(Duration::from_secs(config.http2_keep_alive_interval_in_secs))
            .keep_alive_timeout(Duration::from_secs(config.http2_keep_alive_timeout_in_secs));

        // 0 disables the per-request timeout
        if config.request_timeout_in_ms != 0 {
            endpoint = endpoint.timeout(config.request_timeout());
        }

        endpoint.connect().await.map_err(Into::into)
    }

    fn make_client(&self) -> CoordinationServiceClient<Channel> {
        let mut client = CoordinationServiceClient::new(self.channel.clone());
        if self.config.enable_compression {
            client = client
                .send_compressed(CompressionEncoding::Gzip)
                .accept_compressed(CompressionEncoding::Gzip);
        }
        client
    }

    fn read_error(path: &str, status: &Status) -> Error {
        Error::Read {
            path: path.to_string(),
            reason: status.message().to_string(),
        }
    }

    fn write_error(path: &str, status: &Status) -> Error {
        match status.code() {
            Code::Aborted | Code::FailedPrecondition => Error::CasConflict {
                path: path.to_string(),
            },
            _ => Error::Write {
                path: path.to_string(),
                reason: status.message().to_string(),
            },
        }
    }
}

#[async_trait]
impl CoordinationStore for GrpcStore {
    async fn get(&self, path: &str) -> Result<VersionedValue> {
        let mut client = self.make_client();
        let request = GetRequest {
            path: path.to_string(),
        };

        match client.get(request).await {
            Ok(response) => {
                let inner = response.into_inner();
                debug!("[:GrpcStore:get] {path} at version {}", inner.version);
                Ok(VersionedValue {
                    data: inner.value,
                    version: Version(inner.version),
                })
            }
            Err(status) => {
                error!("[:GrpcStore:get] status: {:?}", status);
                Err(Self::read_error(path, &status))
            }
        }
    }

    async fn compare_and_set(&self, path: &str, value: Vec<u8>, expected: Version) -> Result<Version> {
        let mut client = self.make_client();
        let request = CompareAndSetRequest {
            path: path.to_string(),
            value,
            expected_version: expected.0,
        };

        match client.compare_and_set(request).await {
            Ok(response) => Ok(Version(response.into_inner().version)),
            Err(status) => {
                error!("[:GrpcStore:compare_and_set] status: {:?}", status);
                Err(Self::write_error(path, &status))
            }
        }
    }

    async fn get_and_watch(&self, path: &str) -> Result<(VersionedValue, WatchSignal)> {
        let mut client = self.make_client();
        let request = WatchRequest {
            path: path.to_string(),
        };

        let mut stream = match client.get_and_watch(request).await {
            Ok(response) => response.into_inner(),
            Err(status) => {
                error!("[:GrpcStore:get_and_watch] status: {:?}", status);
                return Err(Self::read_error(path, &status));
            }
        };

        // The arming frame carries the state at registration time.
        let current = match stream.next().await {
            Some(Ok(update)) => VersionedValue {
                data: update.value,
                version: Version(update.version),
            },
            Some(Err(status)) => return Err(Self::read_error(path, &status)),
            None => {
                return Err(Error::Read {
                    path: path.to_string(),
                    reason: "watch stream closed before the arming frame".to_string(),
                })
            }
        };

        let (tx, rx) = oneshot::channel();
        let watched = path.to_string();
        tokio::spawn(async move {
            let outcome = match stream.next().await {
                Some(Ok(update)) => {
                    debug!("watch on {watched} fired at version {}", update.version);
                    Ok(())
                }
                Some(Err(status)) => Err(WatchError::Service(status.message().to_string())),
                None => Err(WatchError::ChannelClosed),
            };
            if tx.send(outcome).is_err() {
                debug!("watch on {watched} was abandoned before firing");
            }
        });

        Ok((current, rx))
    }
}
