//! Shared helpers for mail tests: log capture, an in-memory Mandrill fake
//! and a one-shot mock HTTP server.

use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing_subscriber::fmt::MakeWriter;

use super::client::{MandrillApi, ProviderError};
use super::message::{ProviderPayload, TemplatePayload};
use super::response::DeliveryResult;

/// In-memory sink for formatted log lines
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn subscriber(buffer: LogBuffer) -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_writer(buffer)
        .with_ansi(false)
        .without_time()
        .with_max_level(tracing::Level::INFO)
        .finish()
}

/// Run `f` with a capturing subscriber and return its result and the logs.
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buffer = LogBuffer::default();
    let result = tracing::subscriber::with_default(subscriber(buffer.clone()), f);
    (result, buffer.contents())
}

/// Install a capturing subscriber on the current thread until the guard drops.
///
/// Only reliable on the current-thread runtime `#[tokio::test]` uses.
pub fn capture_logs_scoped() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let guard = tracing::subscriber::set_default(subscriber(buffer.clone()));
    (buffer, guard)
}

/// Recorded provider call
#[derive(Debug, Clone)]
pub enum Call {
    Send(ProviderPayload),
    SendTemplate(String, ProviderPayload),
}

/// Fake Mandrill client returning canned results and recording each call
#[derive(Clone, Default)]
pub struct FakeMandrill {
    results: Vec<DeliveryResult>,
    failure: Option<String>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl FakeMandrill {
    pub fn returning(results: Vec<DeliveryResult>) -> Self {
        Self {
            results,
            ..Self::default()
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn respond(&self) -> Result<Vec<DeliveryResult>, ProviderError> {
        match &self.failure {
            Some(message) => Err(ProviderError::Api {
                code: -1,
                name: "GeneralError".to_string(),
                message: message.clone(),
            }),
            None => Ok(self.results.clone()),
        }
    }
}

#[async_trait]
impl MandrillApi for FakeMandrill {
    async fn send(&self, payload: &ProviderPayload) -> Result<Vec<DeliveryResult>, ProviderError> {
        self.calls.lock().unwrap().push(Call::Send(payload.clone()));
        self.respond()
    }

    async fn send_template(
        &self,
        template: &TemplatePayload,
        payload: &ProviderPayload,
    ) -> Result<Vec<DeliveryResult>, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::SendTemplate(template.template_name.clone(), payload.clone()));
        self.respond()
    }

    async fn ping(&self) -> Result<(), ProviderError> {
        self.respond().map(|_| ())
    }
}

/// A minimal mock HTTP server built on tokio that returns canned responses.
pub struct MockMandrillServer {
    listener: TcpListener,
    pub base_url: String,
}

impl MockMandrillServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock server");
        let port = listener.local_addr().unwrap().port();
        let base_url = format!("http://127.0.0.1:{port}/api/1.0");
        Self { listener, base_url }
    }

    /// Accept one connection, answer with the given status and JSON body,
    /// and return the raw request text.
    pub async fn respond_once(self, status_code: u16, body: &str) -> String {
        let (mut stream, _) = self.listener.accept().await.unwrap();

        let request = read_request(&mut stream).await;

        let response = format!(
            "HTTP/1.1 {status_code} OK\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n\
             {body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();

        request
    }
}

/// Read headers plus a `Content-Length` body.
async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];

    loop {
        let n = stream.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&data);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if data.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&data).into_owned()
}

/// JSON body of a raw HTTP request.
pub fn request_json(raw: &str) -> serde_json::Value {
    let body = raw.split_once("\r\n\r\n").map(|(_, b)| b).unwrap_or_default();
    serde_json::from_str(body).expect("request body should be JSON")
}
