use std::path::PathBuf;
use std::time::Duration;
use std::{pin, task};

use async_trait::async_trait;
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::rt::{Read, Write};
use hyper::{Request, StatusCode, Uri};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::{Connected, Connection};
use hyper_util::rt::{TokioExecutor, TokioIo};

use super::payload::{ContainerInspect, ContainerStats, ContainerSummary};
use super::{Error, Result, RuntimeClient};
use crate::container::{ContainerID, ContainerRef, ContainerState};
use crate::metrics::{self, FileMetric, ResourceMetric};

/// A connected unix stream dressed up so hyper's pooling client can treat it
/// like any other connection.
struct UnixStream(TokioIo<tokio::net::UnixStream>);

impl Connection for UnixStream {
    fn connected(&self) -> Connected {
        Connected::new()
    }
}

impl Read for UnixStream {
    fn poll_read(
        self: pin::Pin<&mut Self>,
        cx: &mut task::Context<'_>,
        buf: hyper::rt::ReadBufCursor<'_>,
    ) -> task::Poll<std::io::Result<()>> {
        pin::Pin::new(&mut self.get_mut().0).poll_read(cx, buf)
    }
}

impl Write for UnixStream {
    fn poll_write(
        self: pin::Pin<&mut Self>,
        cx: &mut task::Context<'_>,
        buf: &[u8],
    ) -> task::Poll<std::io::Result<usize>> {
        pin::Pin::new(&mut self.get_mut().0).poll_write(cx, buf)
    }

    fn poll_flush(
        self: pin::Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> task::Poll<std::io::Result<()>> {
        pin::Pin::new(&mut self.get_mut().0).poll_flush(cx)
    }

    fn poll_shutdown(
        self: pin::Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> task::Poll<std::io::Result<()>> {
        pin::Pin::new(&mut self.get_mut().0).poll_shutdown(cx)
    }
}

#[derive(Debug, Clone)]
struct UnixConnector {
    path: PathBuf,
}

impl tower::Service<Uri> for UnixConnector {
    type Response = UnixStream;

    type Error = std::io::Error;

    type Future =
        pin::Pin<Box<dyn Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(
        &mut self,
        _cx: &mut task::Context<'_>,
    ) -> task::Poll<std::result::Result<(), Self::Error>> {
        task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: Uri) -> Self::Future {
        let path = self.path.clone();
        Box::pin(async move {
            let stream = tokio::net::UnixStream::connect(path).await?;

            Ok(UnixStream(TokioIo::new(stream)))
        })
    }
}

/// Read-only Docker Engine API client bound to a local control socket.
///
/// Every request runs under the configured timeout; the client never blocks
/// a caller longer than that budget.
#[derive(Clone)]
pub struct DockerClient {
    client: Client<UnixConnector, Empty<Bytes>>,
    socket_path: PathBuf,
    timeout: Duration,
}

impl DockerClient {
    pub fn new(socket_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        let socket_path = socket_path.into();
        let client = Client::builder(TokioExecutor::new()).build(UnixConnector {
            path: socket_path.clone(),
        });
        Self {
            client,
            socket_path,
            timeout,
        }
    }

    /// Verifies that the runtime answers on the control socket at all.
    ///
    /// Run once at startup; a failure here is fatal for the process.
    pub async fn ping(&self) -> Result<()> {
        let endpoint = "/_ping";
        let (status, _body) = self.get(endpoint).await?;
        if !status.is_success() {
            return Err(Error::UnexpectedStatus {
                endpoint: endpoint.to_owned(),
                status,
            });
        }

        Ok(())
    }

    /// Issues a GET against the runtime socket and collects the body, all
    /// under the per-call timeout.
    async fn get(&self, endpoint: &str) -> Result<(StatusCode, Bytes)> {
        let uri =
            Uri::try_from(format!("http://localhost{endpoint}")).map_err(|source| {
                Error::InvalidUri {
                    endpoint: endpoint.to_owned(),
                    source,
                }
            })?;
        let request = Request::builder()
            .uri(uri)
            .body(Empty::new())
            .expect("GET request from validated uri");

        let roundtrip = async {
            let response =
                self.client
                    .request(request)
                    .await
                    .map_err(|source| Error::Unreachable {
                        path: self.socket_path.clone(),
                        source,
                    })?;
            let status = response.status();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|source| Error::Body {
                    endpoint: endpoint.to_owned(),
                    source,
                })?
                .to_bytes();

            Ok((status, body))
        };

        match tokio::time::timeout(self.timeout, roundtrip).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                endpoint: endpoint.to_owned(),
                timeout: self.timeout,
            }),
        }
    }
}

/// Maps an HTTP response onto the typed payload or the error taxonomy.
///
/// A 404 means the container disappeared between enumeration and this query,
/// which is an expected race, not a protocol violation.
fn decode_payload<T: serde::de::DeserializeOwned>(
    endpoint: &str,
    status: StatusCode,
    body: &[u8],
) -> Result<T> {
    if status == StatusCode::NOT_FOUND {
        return Err(Error::Vanished {
            endpoint: endpoint.to_owned(),
        });
    }
    if !status.is_success() {
        return Err(Error::UnexpectedStatus {
            endpoint: endpoint.to_owned(),
            status,
        });
    }

    serde_json::from_slice(body).map_err(|source| Error::Decode {
        endpoint: endpoint.to_owned(),
        source,
    })
}

#[async_trait]
impl RuntimeClient for DockerClient {
    async fn list_containers(&self) -> Result<Vec<ContainerRef>> {
        let endpoint = "/containers/json";
        let (status, body) = self.get(endpoint).await?;
        let summaries: Vec<ContainerSummary> = decode_payload(endpoint, status, &body)?;

        let mut refs = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let id = match ContainerID::new(&summary.id) {
                Ok(id) => id,
                Err(err) => {
                    log::warn!("skipping container with invalid id: {}", err);
                    continue;
                }
            };
            let state = ContainerState::parse(&summary.state);
            refs.push(ContainerRef::new(id, summary.display_name(), state));
        }

        Ok(refs)
    }

    async fn fetch_file_metrics(&self, id: &ContainerID) -> Result<Vec<FileMetric>> {
        let endpoint = format!("/containers/{id}/json?size=true");
        let (status, body) = self.get(&endpoint).await?;
        let inspect: ContainerInspect = decode_payload(&endpoint, status, &body)?;

        Ok(metrics::files_from_inspect(&inspect))
    }

    async fn fetch_resource_metrics(&self, id: &ContainerID) -> Result<ResourceMetric> {
        let endpoint = format!("/containers/{id}/stats?stream=false");
        let (status, body) = self.get(&endpoint).await?;
        let stats: ContainerStats = decode_payload(&endpoint, status, &body)?;

        Ok(metrics::resources_from_stats(&stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ErrorKind;

    #[test]
    fn test_decode_payload_not_found_is_vanished() {
        let err = decode_payload::<ContainerInspect>("/containers/x/json", StatusCode::NOT_FOUND, b"")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Vanished);
    }

    #[test]
    fn test_decode_payload_server_error_is_protocol() {
        let err = decode_payload::<ContainerInspect>(
            "/containers/x/json",
            StatusCode::INTERNAL_SERVER_ERROR,
            b"boom",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        match err {
            Error::UnexpectedStatus { status, .. } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR)
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_decode_payload_malformed_body_is_protocol() {
        let err = decode_payload::<ContainerStats>("/containers/x/stats", StatusCode::OK, b"{oops")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn test_decode_payload_success() {
        let stats: ContainerStats = decode_payload(
            "/containers/x/stats",
            StatusCode::OK,
            br#"{"memory_stats":{"usage":42}}"#,
        )
        .unwrap();
        assert_eq!(stats.memory_stats.usage, Some(42));
    }
}
