#![allow(dead_code)]

use std::io::{BufRead, BufReader, Cursor, Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};
use wastedetect_frontend::ImageUpload;

/// What `/health` answers with.
#[derive(Clone, Copy)]
pub enum HealthReply {
    Ok,
    Unavailable,
    Delayed(Duration),
}

/// What `/predict` answers with.
#[derive(Clone)]
pub enum PredictReply {
    Json(Value),
    Error(StatusCode, Value),
    Malformed,
    Delayed(Duration, Value),
}

#[derive(Debug, Clone)]
pub struct ReceivedUpload {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub len: usize,
}

pub struct MockBackend {
    health: HealthReply,
    reply: Mutex<PredictReply>,
    health_hits: AtomicUsize,
    predict_hits: AtomicUsize,
    uploads: Mutex<Vec<ReceivedUpload>>,
}

impl MockBackend {
    pub fn health_hits(&self) -> usize {
        self.health_hits.load(Ordering::SeqCst)
    }

    pub fn predict_hits(&self) -> usize {
        self.predict_hits.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> Vec<ReceivedUpload> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn set_reply(&self, reply: PredictReply) {
        *self.reply.lock().unwrap() = reply;
    }
}

/// Serves a fake detection backend on an ephemeral port from its own runtime
/// thread and returns its base URL.
pub fn spawn_backend(healthy: bool, reply: PredictReply) -> (String, Arc<MockBackend>) {
    let health = if healthy {
        HealthReply::Ok
    } else {
        HealthReply::Unavailable
    };
    spawn_backend_with(health, reply)
}

pub fn spawn_backend_with(health: HealthReply, reply: PredictReply) -> (String, Arc<MockBackend>) {
    let backend = Arc::new(MockBackend {
        health,
        reply: Mutex::new(reply),
        health_hits: AtomicUsize::new(0),
        predict_hits: AtomicUsize::new(0),
        uploads: Mutex::new(Vec::new()),
    });
    let state = backend.clone();
    let (tx, rx) = mpsc::channel::<SocketAddr>();
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("tokio runtime");
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("bind ephemeral port");
            tx.send(listener.local_addr().expect("local addr"))
                .expect("report address");
            let router = Router::new()
                .route("/health", get(self::health))
                .route("/predict", post(predict))
                .with_state(state);
            axum::serve(listener, router).await.expect("serve mock backend");
        });
    });
    let addr = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("mock backend did not start");
    (format!("http://{addr}"), backend)
}

/// Answers one request with `status_line`, announces a longer body than it
/// sends, then closes the connection.
pub fn spawn_truncating_backend(status_line: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    std::thread::spawn(move || {
        let Ok((stream, _)) = listener.accept() else {
            return;
        };
        let mut reader = BufReader::new(stream);
        let mut content_length = 0usize;
        let mut chunked = false;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                break;
            }
            let lower = line.to_ascii_lowercase();
            if let Some(value) = lower.strip_prefix("content-length:") {
                content_length = value.trim().parse().unwrap_or(0);
            }
            if lower.starts_with("transfer-encoding:") && lower.contains("chunked") {
                chunked = true;
            }
        }
        if chunked {
            let mut tail = Vec::new();
            while !tail.ends_with(b"0\r\n\r\n") {
                let mut byte = [0u8; 1];
                if reader.read(&mut byte).unwrap_or(0) == 0 {
                    break;
                }
                tail.push(byte[0]);
            }
        } else {
            let mut body = vec![0u8; content_length];
            let _ = reader.read_exact(&mut body);
        }
        let mut stream = reader.into_inner();
        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: 4096\r\nconnection: close\r\n\r\n{{\"detail\": \"cut"
        );
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.flush();
    });
    format!("http://{addr}")
}

/// A URL nothing is listening on.
pub fn dead_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

async fn health(State(backend): State<Arc<MockBackend>>) -> Response {
    backend.health_hits.fetch_add(1, Ordering::SeqCst);
    let healthy = Json(json!({
        "status": "healthy",
        "segmentation_model_loaded": true,
        "classification_model_loaded": true,
    }));
    match backend.health {
        HealthReply::Ok => healthy.into_response(),
        HealthReply::Unavailable => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "detail": "warming up" })),
        )
            .into_response(),
        HealthReply::Delayed(delay) => {
            tokio::time::sleep(delay).await;
            healthy.into_response()
        }
    }
}

async fn predict(State(backend): State<Arc<MockBackend>>, mut multipart: Multipart) -> Response {
    backend.predict_hits.fetch_add(1, Ordering::SeqCst);
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let len = field.bytes().await.map(|bytes| bytes.len()).unwrap_or(0);
        backend.uploads.lock().unwrap().push(ReceivedUpload {
            field: name,
            file_name,
            content_type,
            len,
        });
    }

    let reply = backend.reply.lock().unwrap().clone();
    match reply {
        PredictReply::Json(body) => Json(body).into_response(),
        PredictReply::Error(status, body) => (status, Json(body)).into_response(),
        PredictReply::Malformed => (StatusCode::OK, "{\"results\": [").into_response(),
        PredictReply::Delayed(delay, body) => {
            tokio::time::sleep(delay).await;
            Json(body).into_response()
        }
    }
}

/// Backend response with a single classified crop.
pub fn single_box(label: &str, probability: f64) -> Value {
    json!({
        "status": "success",
        "request_id": "req-1",
        "results": [{
            "boxes": [{
                "x1": 12.0, "y1": 20.5, "x2": 140.0, "y2": 210.0,
                "confidence": 0.81,
                "class": 0,
                "class_name": "object",
                "classification_results": {
                    "status": "success",
                    "top_classes": [
                        { "class_id": 3, "class_name": label, "probability": probability },
                        { "class_id": 7, "class_name": "glass_jar", "probability": 0.05 }
                    ]
                },
                "crop_url": "/static/images/crop_req-1_0.png"
            }],
            "shape": [480, 640]
        }],
        "image_urls": {
            "original_image": "/static/images/original_req-1.png",
            "annotated_image": "/static/images/annotated_req-1.png"
        }
    })
}

pub fn no_boxes() -> Value {
    json!({
        "status": "success",
        "request_id": "req-2",
        "results": [{ "boxes": [], "shape": [480, 640] }],
        "image_urls": {
            "original_image": "/static/images/original_req-2.png",
            "annotated_image": "/static/images/annotated_req-2.png"
        }
    })
}

pub fn encoded(format: ImageFormat) -> Vec<u8> {
    let image = RgbImage::from_pixel(8, 6, Rgb([40, 160, 90]));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, format).expect("encode test image");
    bytes.into_inner()
}

pub fn png(name: &str) -> ImageUpload {
    ImageUpload::new(name, "image/png", encoded(ImageFormat::Png))
}

pub fn jpeg(name: &str) -> ImageUpload {
    ImageUpload::new(name, "image/jpeg", encoded(ImageFormat::Jpeg))
}
