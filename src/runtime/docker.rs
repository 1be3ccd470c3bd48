use std::collections::HashMap;
use std::path::PathBuf;

use bytes::{Bytes, BytesMut};
use http_body_util::{BodyExt, Empty};
use hyper::body::Incoming;
use hyper::client::conn::http1;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;
use tokio::sync::mpsc;

use super::RuntimeClient;
use crate::container::{ContainerID, ContainerMetadata};

/// Raw stats document as sent by the Docker Engine.
pub type Stats = serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to connect to socket `{path}`: {source}")]
    SocketConnect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP handshake on socket `{path}` failed: {source}")]
    Handshake {
        path: PathBuf,
        #[source]
        source: hyper::Error,
    },
    #[error("failed to build request `{uri}`: {source}")]
    Request {
        uri: String,
        #[source]
        source: hyper::http::Error,
    },
    #[error("request `{uri}` failed: {source}")]
    Send {
        uri: String,
        #[source]
        source: hyper::Error,
    },
    #[error("request `{uri}` returned {status}: {message}")]
    Status {
        uri: String,
        status: StatusCode,
        message: String,
    },
    #[error("failed to read response body of `{uri}`: {source}")]
    Body {
        uri: String,
        #[source]
        source: hyper::Error,
    },
    #[error("failed to decode response of `{uri}`: {source}")]
    Decode {
        uri: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Client for the Docker Engine API listening on a unix socket.
///
/// Every request uses its own HTTP/1 connection, so one client can serve any
/// number of concurrent stats streams.
#[derive(Debug, Clone)]
pub struct DockerClient {
    socket_path: PathBuf,
}

impl DockerClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    /// Sends a `GET` request for `uri`.
    ///
    /// The returned sender has to be kept alive until the response body is consumed.
    async fn get(&self, uri: &str) -> Result<(http1::SendRequest<Empty<Bytes>>, Response<Incoming>)> {
        let stream =
            UnixStream::connect(&self.socket_path)
                .await
                .map_err(|source| Error::SocketConnect {
                    path: self.socket_path.clone(),
                    source,
                })?;
        let (mut sender, connection) = http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|source| Error::Handshake {
                path: self.socket_path.clone(),
                source,
            })?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                log::debug!("docker connection closed: {}", err);
            }
        });

        let request = Request::get(uri)
            .header(hyper::header::HOST, "docker")
            .body(Empty::<Bytes>::new())
            .map_err(|source| Error::Request {
                uri: uri.to_owned(),
                source,
            })?;
        log::trace!("GET {}", uri);
        let response = sender
            .send_request(request)
            .await
            .map_err(|source| Error::Send {
                uri: uri.to_owned(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = read_body(uri, response).await?;
            return Err(Error::Status {
                uri: uri.to_owned(),
                status,
                message: error_message(&body),
            });
        }

        Ok((sender, response))
    }
}

impl RuntimeClient for DockerClient {
    type Snapshot = Stats;
    type Error = Error;

    async fn inspect(&self, container_id: &ContainerID) -> Result<ContainerMetadata> {
        let uri = format!("/containers/{container_id}/json");
        let (_sender, response) = self.get(&uri).await?;
        let body = read_body(&uri, response).await?;
        let inspect: InspectResponse =
            serde_json::from_slice(&body).map_err(|source| Error::Decode {
                uri: uri.clone(),
                source,
            })?;
        Ok(inspect.into())
    }

    async fn stream(&self, container_id: &ContainerID, snapshots: mpsc::Sender<Stats>) -> Result<()> {
        let uri = format!("/containers/{container_id}/stats?stream=true");
        let (_sender, response) = self.get(&uri).await?;
        log::debug!("streaming stats of container `{}`", container_id);

        let mut body = response.into_body();
        let mut lines = LineBuffer::default();
        while let Some(frame) = body.frame().await {
            let frame = frame.map_err(|source| Error::Body {
                uri: uri.clone(),
                source,
            })?;
            let Ok(data) = frame.into_data() else {
                continue;
            };
            lines.extend(&data);

            while let Some(line) = lines.next_line() {
                if !forward(&uri, &line, &snapshots).await? {
                    return Ok(());
                }
            }
        }
        forward(&uri, lines.rest(), &snapshots).await?;

        log::debug!("stats stream of container `{}` ended", container_id);
        Ok(())
    }
}

/// Splits a chunked body into `\n` terminated lines.
///
/// Bytes already searched for a newline are not searched again.
#[derive(Debug, Default)]
struct LineBuffer {
    buf: BytesMut,
    scanned: usize,
}

impl LineBuffer {
    fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Removes and returns the next complete line, newline included.
    fn next_line(&mut self) -> Option<BytesMut> {
        match self.buf[self.scanned..].iter().position(|b| *b == b'\n') {
            Some(pos) => {
                let line = self.buf.split_to(self.scanned + pos + 1);
                self.scanned = 0;
                Some(line)
            }
            None => {
                self.scanned = self.buf.len();
                None
            }
        }
    }

    /// Bytes after the last newline.
    fn rest(&self) -> &[u8] {
        &self.buf
    }
}

/// Decodes one stats document and sends it. Returns `false` once the receiver is gone.
async fn forward(uri: &str, line: &[u8], snapshots: &mpsc::Sender<Stats>) -> Result<bool> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return Ok(true);
    }
    let stats: Stats = serde_json::from_slice(line).map_err(|source| Error::Decode {
        uri: uri.to_owned(),
        source,
    })?;
    Ok(snapshots.send(stats).await.is_ok())
}

async fn read_body(uri: &str, response: Response<Incoming>) -> Result<Bytes> {
    Ok(response
        .into_body()
        .collect()
        .await
        .map_err(|source| Error::Body {
            uri: uri.to_owned(),
            source,
        })?
        .to_bytes())
}

/// Extracts `message` from a Docker error body, falling back to the raw body.
fn error_message(body: &[u8]) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorResponse {
        message: String,
    }

    match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(err) => err.message,
        Err(_) => String::from_utf8_lossy(body).trim().to_owned(),
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectResponse {
    #[serde(default)]
    name: String,
    #[serde(default)]
    config: Option<InspectConfig>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectConfig {
    #[serde(default)]
    labels: Option<HashMap<String, String>>,
    #[serde(default)]
    env: Option<Vec<String>>,
}

impl From<InspectResponse> for ContainerMetadata {
    fn from(value: InspectResponse) -> Self {
        let config = value.config.unwrap_or_default();
        ContainerMetadata::new(
            value.name.trim_start_matches('/'),
            config.labels.unwrap_or_default(),
            config.env.unwrap_or_default(),
        )
    }
}
