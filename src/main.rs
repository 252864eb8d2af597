//! Identity document extraction server: upload an image of a driving license
//! or passport, get back the holder's name, document number, expiry, and date
//! of birth as JSON.

mod config;
mod extract;
mod ocr;
mod preprocess;
mod schema;

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use config::AppConfig;
use ocr::remote::RemoteOcrProvider;
use ocr::tesseract::TesseractProvider;
use ocr::{OcrProvider, OcrProviderKind};
use schema::{DocumentType, FieldRecord};

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<AppConfig>,
    providers: Arc<HashMap<OcrProviderKind, Arc<dyn OcrProvider>>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "id_extractor=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    // Register OCR backends
    let mut providers: HashMap<OcrProviderKind, Arc<dyn OcrProvider>> = HashMap::new();
    providers.insert(
        OcrProviderKind::Tesseract,
        Arc::new(TesseractProvider::new(
            config.tesseract_command.clone(),
            config.ocr_language.clone(),
        )),
    );
    if let Some(url) = config.sidecar_url.clone() {
        providers.insert(
            OcrProviderKind::Remote,
            Arc::new(RemoteOcrProvider::new(reqwest::Client::new(), url)),
        );
    }
    info!("registered {} OCR provider(s)", providers.len());

    let max_upload = config.max_upload_bytes;
    let bind_addr = config.bind_addr.clone();

    let state = AppState {
        config: Arc::new(config),
        providers: Arc::new(providers),
    };

    // Build router
    let app = Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload_document))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Run server
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

#[derive(serde::Deserialize)]
struct UploadQuery {
    ocr: Option<String>,
}

/// Upload a document image and extract identity fields from it.
async fn upload_document(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<Json<FieldRecord>, (StatusCode, String)> {
    // Pick the OCR backend
    let kind = match query.ocr.as_deref() {
        Some(s) => OcrProviderKind::from_str(s)
            .ok_or_else(|| (StatusCode::BAD_REQUEST, format!("Unknown OCR provider: {}", s)))?,
        None => state.config.default_provider,
    };
    let provider = state.providers.get(&kind).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!("OCR provider not configured: {:?}", kind),
        )
    })?;

    // Read the uploaded file and the document type selector
    let mut filename = String::new();
    let mut file_data = Vec::new();
    let mut document_type = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Multipart error: {}", e)))?
    {
        let field_name = field.name().map(|s| s.to_string());
        match field_name.as_deref() {
            Some("file") => {
                filename = field.file_name().unwrap_or("document").to_string();
                file_data = field
                    .bytes()
                    .await
                    .map_err(|e| {
                        (StatusCode::BAD_REQUEST, format!("Failed to read file: {}", e))
                    })?
                    .to_vec();
            }
            Some("documentType") => {
                document_type = field.text().await.map_err(|e| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read documentType: {}", e),
                    )
                })?;
            }
            _ => {}
        }
    }

    if file_data.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No file uploaded".to_string()));
    }

    let upload_id = Uuid::new_v4().simple().to_string();
    info!(
        "upload {}: {} ({} bytes), documentType={:?}, ocr={}",
        upload_id,
        filename,
        file_data.len(),
        document_type,
        provider.name()
    );

    // Clean the image for OCR
    let cleaned = preprocess::clean_for_ocr(&file_data).map_err(|e| {
        error!("upload {}: preprocessing failed: {}", upload_id, e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error processing file: {}", e),
        )
    })?;

    // Recognize text
    let raw_text = provider.recognize(&cleaned).await.map_err(|e| {
        error!("upload {}: OCR failed: {}", upload_id, e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error processing file: {}", e),
        )
    })?;

    // Extract fields; an unrecognized document type yields an all-"Not found"
    // record rather than an error
    let doc_type = DocumentType::from_str(&document_type);
    let record = extract::extract_fields(&raw_text, doc_type);

    info!("upload {}: extraction complete", upload_id);
    Ok(Json(record))
}
