//! Image scoring web server
//!
//! Accepts an uploaded image, runs it through a pre-built classifier, and
//! returns one probability score.
//! Endpoints:
//! - GET  /health   - Health check ("Hello World!")
//! - POST /         - Score an uploaded image (multipart field `file`)
//! - GET  /model    - Info about the loaded model
//! - GET  /metrics  - Prometheus metrics

use anyhow::{ensure, Context};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use clap::Parser;
use classifier::{Classifier, InputLayout, InputSpec};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use vision_config::{load_config, load_from_path, CentralConfig, ModelConfig};

mod handlers;
mod metrics;
mod normalize;
mod prediction;
mod types;
mod upload;

use handlers::{get_model_info, health, metrics_handler, predict};
use upload::UploadSettings;

/// Command-line overrides; these win over config.toml and environment.
#[derive(Debug, Parser)]
#[command(name = "vision-web", version, about = "Score uploaded images with a pre-built classifier")]
struct Args {
    /// Path to config.toml
    #[arg(long, env = "VISION_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the ONNX model artifact
    #[arg(long)]
    model: Option<String>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,
}

/// Information about the loaded model.
#[derive(Debug, Default, Clone)]
pub struct ModelInfo {
    pub loaded: bool,
    pub path: Option<String>,
    /// When the model file was last modified (Unix timestamp)
    pub file_modified: Option<u64>,
    /// When the model was loaded into memory (Unix timestamp)
    pub loaded_at: Option<u64>,
}

impl ModelInfo {
    fn for_artifact(path: &Path) -> Self {
        let file_modified = path
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs());

        Self {
            loaded: true,
            path: Some(path.to_string_lossy().to_string()),
            file_modified,
            loaded_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .ok(),
        }
    }
}

/// Shared application state
pub struct AppState {
    /// The loaded model, shared by all requests
    pub classifier: Arc<dyn Classifier>,
    /// Upload directory, form field, and allowed extensions
    pub upload: UploadSettings,
    /// Target resolution and layout of the model input
    pub input_spec: InputSpec,
    pub model_info: ModelInfo,
}

/// Build the application state from configuration and a loaded classifier.
/// Creates the upload directory if it is missing.
pub fn build_state(
    config: &CentralConfig,
    classifier: Arc<dyn Classifier>,
    model_info: ModelInfo,
) -> anyhow::Result<Arc<AppState>> {
    let upload = UploadSettings::from(&config.upload);
    upload
        .prepare_dir()
        .with_context(|| format!("Failed to create upload directory {}", upload.dir.display()))?;

    let layout: InputLayout = config.model.layout.parse()?;
    let input_spec = InputSpec::new(config.model.input_width, config.model.input_height, layout);

    Ok(Arc::new(AppState {
        classifier,
        upload,
        input_spec,
        model_info,
    }))
}

/// Create the application router with the given state.
/// This is separated out for testing purposes.
pub fn create_app(state: Arc<AppState>) -> Router {
    metrics::init_metrics();
    metrics::MODEL_LOADED.set(i64::from(state.model_info.loaded));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/", post(predict))
        .route("/model", get(get_model_info))
        .route("/metrics", get(metrics_handler))
        .layer(DefaultBodyLimit::max(state.upload.max_bytes))
        .layer(cors)
        .with_state(state)
}

/// Fail unless the model artifact exists.
fn check_model_artifact(path: &Path) -> anyhow::Result<()> {
    ensure!(
        path.is_file(),
        "Model not stored at {}; cannot load model",
        path.display()
    );
    Ok(())
}

#[cfg(feature = "onnx")]
fn load_classifier(config: &ModelConfig) -> anyhow::Result<Arc<dyn Classifier>> {
    let classifier = classifier::OnnxClassifier::load(
        &config.path,
        config.input_name.as_deref(),
        config.intra_threads,
    )
    .with_context(|| format!("Failed to load model from {}", config.path))?;
    Ok(Arc::new(classifier))
}

#[cfg(not(feature = "onnx"))]
fn load_classifier(config: &ModelConfig) -> anyhow::Result<Arc<dyn Classifier>> {
    anyhow::bail!(
        "built without the `onnx` feature; cannot load {}",
        config.path
    )
}

fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},ort=warn", level)));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

/// Creates a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, stopping server...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_from_path(path),
        None => load_config(),
    };
    if let Some(model) = args.model {
        config.model.path = model;
    }
    if let Some(port) = args.port {
        config.web.port = port;
    }

    init_tracing(&config.common.log_level);
    info!(
        "Configuration: model={}, upload_dir={}, form_field={}",
        config.model.path, config.upload.dir, config.upload.form_field
    );

    let model_path = PathBuf::from(&config.model.path);
    check_model_artifact(&model_path)?;
    let classifier = load_classifier(&config.model)?;
    info!("Loaded model from {}", model_path.display());

    let state = build_state(&config, classifier, ModelInfo::for_artifact(&model_path))?;
    let app = create_app(state);

    let addr = format!("{}:{}", config.web.host, config.web.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ModelInfoResponse, ScoreResponse};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use classifier::{ClassifierError, ConstantClassifier, ImageTensor};
    use http_body_util::BodyExt;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "vision-test-boundary";

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn classify(&self, _input: &ImageTensor) -> Result<f32, ClassifierError> {
            Err(ClassifierError::InferenceFailed("session exploded".to_string()))
        }
    }

    /// Keeps a copy of every tensor it is asked to score.
    #[derive(Default)]
    struct RecordingClassifier {
        seen: Mutex<Vec<ImageTensor>>,
    }

    impl Classifier for RecordingClassifier {
        fn classify(&self, input: &ImageTensor) -> Result<f32, ClassifierError> {
            self.seen.lock().unwrap().push(input.clone());
            Ok(0.3)
        }
    }

    /// Create application state backed by a temp upload dir (no model file)
    fn create_test_state(
        upload_dir: &TempDir,
        classifier: Arc<dyn Classifier>,
        tweak: impl FnOnce(&mut CentralConfig),
    ) -> Arc<AppState> {
        let mut config = CentralConfig::default();
        config.upload.dir = upload_dir.path().to_string_lossy().to_string();
        tweak(&mut config);

        let model_info = ModelInfo {
            loaded: true,
            path: Some("memory://constant".to_string()),
            ..ModelInfo::default()
        };
        build_state(&config, classifier, model_info).expect("Failed to build test state")
    }

    fn constant_app(upload_dir: &TempDir, score: f32) -> Router {
        create_app(create_test_state(
            upload_dir,
            Arc::new(ConstantClassifier::new(score)),
            |_| {},
        ))
    }

    fn encode(format: ImageFormat) -> Vec<u8> {
        let image = match format {
            ImageFormat::Gif => {
                DynamicImage::ImageRgba8(RgbaImage::from_pixel(24, 24, Rgba([10, 200, 30, 255])))
            }
            _ => DynamicImage::ImageRgb8(RgbImage::from_pixel(24, 24, Rgb([10, 200, 30]))),
        };
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    fn multipart_body(field: &str, file_name: &str, bytes: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    /// Helper to make a GET request and return response body as string
    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    /// Helper to POST a single-file multipart form to `/`
    async fn post_file(
        app: Router,
        field: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> (StatusCode, String) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header(
                        "content-type",
                        format!("multipart/form-data; boundary={BOUNDARY}"),
                    )
                    .body(Body::from(multipart_body(field, file_name, bytes)))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn upload_count(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let dir = TempDir::new().unwrap();
        let (status, body) = get(constant_app(&dir, 0.5), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Hello World!");
    }

    #[tokio::test]
    async fn test_png_upload_returns_rounded_score() {
        let dir = TempDir::new().unwrap();
        let app = constant_app(&dir, 0.8765);

        let (status, body) = post_file(app, "file", "frog.png", &encode(ImageFormat::Png)).await;

        assert_eq!(status, StatusCode::OK, "body: {}", body);
        let response: ScoreResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(response.score, 0.88);
        assert_eq!(upload_count(&dir), 0, "temp file should be removed");
    }

    #[tokio::test]
    async fn test_jpg_upload_is_accepted() {
        let dir = TempDir::new().unwrap();
        let app = constant_app(&dir, 0.1);

        let (status, body) = post_file(app, "file", "frog.jpg", &encode(ImageFormat::Jpeg)).await;

        assert_eq!(status, StatusCode::OK, "body: {}", body);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        let score = json["score"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&score));
        assert_eq!(upload_count(&dir), 0);
    }

    #[tokio::test]
    async fn test_gif_upload_is_converted_before_inference() {
        let dir = TempDir::new().unwrap();
        let recorder = Arc::new(RecordingClassifier::default());
        let app = create_app(create_test_state(&dir, recorder.clone(), |_| {}));

        let (status, body) = post_file(app, "file", "frog.gif", &encode(ImageFormat::Gif)).await;

        assert_eq!(status, StatusCode::OK, "body: {}", body);
        let response: ScoreResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(response.score, 0.3);
        assert_eq!(upload_count(&dir), 0, "neither GIF nor PNG should remain");

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let tensor = &seen[0];
        assert_eq!(tensor.shape(), &[1, 224, 224, 3]);
        // Every pixel of the first frame is (10, 200, 30), alpha dropped
        let values = tensor.to_vec();
        assert!(values.chunks(3).all(|pixel| *pixel == [10.0, 200.0, 30.0]));
    }

    #[tokio::test]
    async fn test_exact_tie_score_rounds_to_even() {
        let dir = TempDir::new().unwrap();
        let (status, body) =
            post_file(constant_app(&dir, 0.625), "file", "frog.png", &encode(ImageFormat::Png))
                .await;

        assert_eq!(status, StatusCode::OK, "body: {}", body);
        assert_eq!(body, r#"{"score":0.62}"#);
    }

    #[tokio::test]
    async fn test_invalid_extension_rejected() {
        let dir = TempDir::new().unwrap();
        let app = constant_app(&dir, 0.5);

        let (status, body) = post_file(app, "file", "frog.bmp", b"BM....").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            "Invalid file extension; got .bmp instead of allowed: [.gif, .png, .jpg]"
        );
        assert_eq!(upload_count(&dir), 0, "rejected uploads are never stored");
    }

    #[tokio::test]
    async fn test_extension_match_is_case_sensitive() {
        let dir = TempDir::new().unwrap();
        let app = constant_app(&dir, 0.5);

        let (status, body) = post_file(app, "file", "FROG.PNG", &encode(ImageFormat::Png)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("got .PNG"));
    }

    #[tokio::test]
    async fn test_jpeg_spelling_rejected() {
        let dir = TempDir::new().unwrap();
        let app = constant_app(&dir, 0.5);

        let (status, body) = post_file(app, "file", "frog.jpeg", &encode(ImageFormat::Jpeg)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("got .jpeg"));
    }

    #[tokio::test]
    async fn test_missing_field_rejected() {
        let dir = TempDir::new().unwrap();
        let app = constant_app(&dir, 0.5);

        let (status, body) = post_file(app, "value", "frog.png", &encode(ImageFormat::Png)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("Missing multipart field 'file'"));
    }

    #[tokio::test]
    async fn test_configured_form_field() {
        let dir = TempDir::new().unwrap();
        let state = create_test_state(&dir, Arc::new(ConstantClassifier::new(0.61)), |config| {
            config.upload.form_field = "value".to_string();
        });

        let (status, body) = post_file(
            create_app(Arc::clone(&state)),
            "value",
            "frog.png",
            &encode(ImageFormat::Png),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "body: {}", body);
        let response: ScoreResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(response.score, 0.61);

        let (status, _) =
            post_file(create_app(state), "file", "frog.png", &encode(ImageFormat::Png)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_corrupt_image_rejected_and_cleaned_up() {
        let dir = TempDir::new().unwrap();
        let app = constant_app(&dir, 0.5);

        let (status, body) = post_file(app, "file", "frog.png", b"not really a png").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("Failed to decode image"));
        assert_eq!(upload_count(&dir), 0);
    }

    #[tokio::test]
    async fn test_inference_failure_is_500_and_cleaned_up() {
        let dir = TempDir::new().unwrap();
        let app = create_app(create_test_state(&dir, Arc::new(FailingClassifier), |_| {}));

        let (status, body) = post_file(app, "file", "frog.png", &encode(ImageFormat::Png)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("session exploded"));
        assert_eq!(upload_count(&dir), 0);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let dir = TempDir::new().unwrap();
        let app = create_app(create_test_state(
            &dir,
            Arc::new(ConstantClassifier::default()),
            |config| config.upload.max_bytes = 64,
        ));

        let (status, _) = post_file(app, "file", "big.png", &[0u8; 4096]).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(upload_count(&dir), 0);
    }

    #[tokio::test]
    async fn test_upload_dir_is_created() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("incoming");
        let mut config = CentralConfig::default();
        config.upload.dir = nested.to_string_lossy().to_string();

        build_state(
            &config,
            Arc::new(ConstantClassifier::default()),
            ModelInfo::default(),
        )
        .unwrap();
        assert!(nested.is_dir());
    }

    #[tokio::test]
    async fn test_model_info_endpoint() {
        let dir = TempDir::new().unwrap();
        let (status, body) = get(constant_app(&dir, 0.5), "/model").await;

        assert_eq!(status, StatusCode::OK);
        let response: ModelInfoResponse = serde_json::from_str(&body).unwrap();
        assert!(response.loaded);
        assert_eq!(response.path.as_deref(), Some("memory://constant"));
        assert_eq!((response.input_width, response.input_height), (224, 224));
        assert_eq!(response.layout, "nhwc");
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let dir = TempDir::new().unwrap();
        let (status, body) = get(constant_app(&dir, 0.5), "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("vision_model_loaded"));
        assert!(body.contains("vision_predictions_total"));
    }

    #[tokio::test]
    async fn test_every_endpoint_records_latency() {
        let dir = TempDir::new().unwrap();
        let count = |endpoint: &str| {
            metrics::REQUEST_LATENCY
                .with_label_values(&[endpoint, "GET"])
                .get_sample_count()
        };
        let before = [count("/health"), count("/model"), count("/metrics")];

        for uri in ["/health", "/model", "/metrics"] {
            let (status, _) = get(constant_app(&dir, 0.5), uri).await;
            assert_eq!(status, StatusCode::OK);
        }

        assert!(count("/health") > before[0]);
        assert!(count("/model") > before[1]);
        assert!(count("/metrics") > before[2]);
    }

    #[test]
    fn test_invalid_layout_fails_state_build() {
        let dir = TempDir::new().unwrap();
        let mut config = CentralConfig::default();
        config.upload.dir = dir.path().to_string_lossy().to_string();
        config.model.layout = "chw".to_string();

        let result = build_state(
            &config,
            Arc::new(ConstantClassifier::default()),
            ModelInfo::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_model_artifact_is_fatal() {
        let err = check_model_artifact(Path::new("/nonexistent/model.onnx")).unwrap_err();
        assert!(err.to_string().contains("cannot load model"));
    }

    #[test]
    fn test_model_info_for_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.onnx");
        std::fs::write(&path, b"onnx").unwrap();

        check_model_artifact(&path).unwrap();
        let info = ModelInfo::for_artifact(&path);
        assert!(info.loaded);
        assert!(info.file_modified.is_some());
        assert!(info.loaded_at.is_some());
    }
}
