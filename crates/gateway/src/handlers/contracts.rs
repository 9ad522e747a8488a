//! Contract upload and analysis handlers

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
        Multipart, Path, Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::middleware::CurrentUser;
use crate::AppState;
use clauselens_analysis::pdf::looks_like_pdf;
use clauselens_common::{
    db::{models::UserFeedback, AnalysisDetail, AnalysisSummary},
    errors::{AppError, Result},
};

const FILE_FIELD: &str = "contract";
const TYPE_FIELD: &str = "contractType";
const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Parsed multipart body
#[derive(Debug, Default)]
struct ContractUpload {
    file: Option<Vec<u8>>,
    contract_type: Option<String>,
}

impl ContractUpload {
    fn require_file(&mut self) -> Result<Vec<u8>> {
        self.file.take().ok_or_else(no_file)
    }
}

fn no_file() -> AppError {
    AppError::Validation {
        message: "No file uploaded".to_string(),
        field: Some(FILE_FIELD.to_string()),
    }
}

/// Map a multipart read failure, keeping body-limit hits as 413
fn multipart_error(err: MultipartError, headers: &HeaderMap, limit: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        let size = headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        return AppError::PayloadTooLarge { size, limit };
    }
    AppError::InvalidFormat {
        message: err.body_text(),
    }
}

async fn read_upload(
    state: &AppState,
    headers: &HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<ContractUpload> {
    // A body that is not multipart carries no file
    let mut multipart = multipart.map_err(|_| no_file())?;
    let limit = state.config.upload.max_bytes;
    let mut upload = ContractUpload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, headers, limit))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(FILE_FIELD) => {
                let content_type = field.content_type().unwrap_or("").to_string();
                if !content_type.eq_ignore_ascii_case(PDF_CONTENT_TYPE) {
                    return Err(AppError::UnsupportedMediaType {
                        content_type: if content_type.is_empty() {
                            "unknown".to_string()
                        } else {
                            content_type
                        },
                    });
                }

                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, headers, limit))?;
                if bytes.len() > limit {
                    return Err(AppError::PayloadTooLarge {
                        size: Some(bytes.len()),
                        limit,
                    });
                }
                if !looks_like_pdf(&bytes) {
                    return Err(AppError::UnsupportedMediaType { content_type });
                }
                upload.file = Some(bytes.to_vec());
            }
            Some(TYPE_FIELD) => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e, headers, limit))?;
                upload.contract_type = Some(text);
            }
            _ => {}
        }
    }

    Ok(upload)
}

#[derive(Debug, Serialize)]
pub struct DetectTypeResponse {
    #[serde(rename = "detectedType")]
    pub detected_type: String,
}

/// Detect the contract type of an uploaded PDF
pub async fn detect_type(
    State(state): State<AppState>,
    current: CurrentUser,
    headers: HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectTypeResponse>> {
    let mut upload = read_upload(&state, &headers, multipart).await?;
    let bytes = upload.require_file()?;

    let detected_type = state
        .analyzer
        .detect_contract_type(&current.user, bytes)
        .await?;

    Ok(Json(DetectTypeResponse { detected_type }))
}

/// Run and store a full analysis of an uploaded PDF
pub async fn analyze(
    State(state): State<AppState>,
    current: CurrentUser,
    headers: HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisDetail>> {
    let mut upload = read_upload(&state, &headers, multipart).await?;
    let bytes = upload.require_file()?;

    let contract_type = upload
        .contract_type
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::MissingField {
            field: TYPE_FIELD.to_string(),
        })?;

    let detail = state
        .analyzer
        .analyze(&current.user, bytes, &contract_type)
        .await?;

    tracing::info!(
        contract_id = %detail.id(),
        user_id = %current.user.id,
        contract_type = %contract_type,
        "Contract analyzed"
    );

    Ok(Json(detail))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ListQuery {
    #[serde(default)]
    pub offset: u64,

    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u64,
}

fn default_limit() -> u64 {
    20
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub items: Vec<AnalysisSummary>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

/// Newest-first list of the caller's analyses
pub async fn user_contracts(
    State(state): State<AppState>,
    current: CurrentUser,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<ListResponse>> {
    let Query(query) = query.map_err(|e| AppError::InvalidFormat {
        message: e.body_text(),
    })?;
    query.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("limit".to_string()),
    })?;

    let (items, total) = state
        .analyzer
        .store()
        .list_for_user(current.user.id, query.offset, query.limit)
        .await?;

    Ok(Json(ListResponse {
        items,
        total,
        offset: query.offset,
        limit: query.limit,
    }))
}

fn parse_contract_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::InvalidFormat {
        message: format!("Invalid contract id: {}", raw),
    })
}

/// One analysis, cache first
pub async fn get_contract(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(raw_id): Path<String>,
) -> Result<Json<AnalysisDetail>> {
    let id = parse_contract_id(&raw_id)?;

    let detail = state
        .analyzer
        .store()
        .fetch_for_user(current.user.id, id)
        .await?
        .ok_or_else(|| AppError::ContractNotFound { id: id.to_string() })?;

    Ok(Json(detail))
}

#[derive(Debug, Deserialize, Validate)]
pub struct FeedbackRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,

    #[serde(default)]
    #[validate(length(max = 5000))]
    pub comments: String,
}

/// Rate an analysis
pub async fn submit_feedback(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(raw_id): Path<String>,
    body: std::result::Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserFeedback>)> {
    let id = parse_contract_id(&raw_id)?;
    let Json(request) = body.map_err(|e| AppError::InvalidFormat {
        message: e.body_text(),
    })?;
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let feedback = state
        .analyzer
        .store()
        .record_feedback(current.user.id, id, request.rating, &request.comments)
        .await?;

    tracing::info!(contract_id = %id, rating = request.rating, "Feedback recorded");

    Ok((StatusCode::OK, Json(feedback)))
}
