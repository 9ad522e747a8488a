//! Router-level tests driving the full middleware stack with `oneshot`

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use clauselens_common::{
    ai::MockGenerator,
    cache::{keys, Cache},
    config::AppConfig,
    db::{
        models::{ContractAnalysis, FinancialTerms, Opportunity, Risk, User, UserFeedback},
        AnalysisDetail, DbPool, Repository,
    },
};
use clauselens_gateway::{create_router, AppState};
use http_body_util::BodyExt;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use sea_orm::{DatabaseBackend, MockDatabase};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.session_secret = Some("router-test-secret".to_string());
    config
}

fn user(is_premium: bool) -> User {
    let now = chrono::Utc::now();
    User {
        id: Uuid::new_v4(),
        google_id: format!("g-{}", Uuid::new_v4()),
        email: "reader@example.com".into(),
        display_name: "Reader".into(),
        profile_picture: None,
        is_premium,
        created_at: now.into(),
        updated_at: now.into(),
    }
}

fn cached_detail(user_id: Uuid) -> AnalysisDetail {
    let id = Uuid::new_v4();
    AnalysisDetail {
        analysis: ContractAnalysis {
            id,
            user_id,
            contract_text: "Lease text".into(),
            contract_type: "Lease".into(),
            summary: "Twelve month residential lease.".into(),
            recommendations: serde_json::json!([]),
            key_clauses: serde_json::json!([]),
            legal_compliance: None,
            negotiation_points: serde_json::json!([]),
            contract_duration: Some(12),
            contract_duration_text: Some("12 months".into()),
            termination_conditions: None,
            overall_score: Some(64),
            performance_metrics: serde_json::json!([]),
            specific_clauses: None,
            tier: "free".into(),
            language: "en".into(),
            ai_model: "mock-generator".into(),
            version: 1,
            expiration_date: None,
            created_at: chrono::Utc::now().into(),
        },
        risks: vec![Risk {
            id: Uuid::new_v4(),
            contract_id: id,
            risk: "Early termination fee".into(),
            explanation: "Two months of rent.".into(),
            severity: "high".into(),
        }],
        opportunities: Vec::new(),
        financial_terms: None,
        compensation_structure: None,
        feedback: None,
    }
}

fn analysis_row(user_id: Uuid, summary: &str) -> ContractAnalysis {
    let mut row = cached_detail(user_id).analysis;
    row.id = Uuid::new_v4();
    row.summary = summary.into();
    row
}

/// Single-page PDF whose text layer reads `text`
fn build_pdf(text: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![72.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

fn state_with(config: AppConfig, db: MockDatabase) -> AppState {
    let repository = Repository::new(DbPool::from_connection(db.into_connection()));
    AppState::new(
        config,
        repository,
        Cache::in_memory(),
        Arc::new(MockGenerator::new()),
        None,
    )
    .unwrap()
}

/// Database that answers one user lookup per entry
fn db_with_users(users: &[User]) -> MockDatabase {
    users.iter().fold(MockDatabase::new(DatabaseBackend::Postgres), |db, u| {
        db.append_query_results([vec![u.clone()]])
    })
}

fn bearer(state: &AppState, user: &User) -> String {
    format!("Bearer {}", state.sessions.issue(user.id).unwrap())
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn multipart_request(uri: &str, auth: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
    let boundary = "clauselens-boundary";
    Request::post(uri)
        .header(header::AUTHORIZATION, auth)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(multipart_body(boundary, parts)))
        .unwrap()
}

fn multipart_body(boundary: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, content_type, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        match content_type {
            Some(ct) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"contract.pdf\"\r\nContent-Type: {}\r\n\r\n",
                    name, ct
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            ),
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    body
}

#[tokio::test]
async fn test_health() {
    let app = create_router(state_with(test_config(), MockDatabase::new(DatabaseBackend::Postgres)));
    let request = Request::get("/health").body(Body::empty()).unwrap();

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = create_router(state_with(test_config(), MockDatabase::new(DatabaseBackend::Postgres)));
    let request = Request::get("/nope").body(Body::empty()).unwrap();

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert_eq!(body["error"]["message"], "Route not found");
}

#[tokio::test]
async fn test_missing_session_is_unauthorized() {
    let app = create_router(state_with(test_config(), MockDatabase::new(DatabaseBackend::Postgres)));
    let request = Request::get("/auth/current-user").body(Body::empty()).unwrap();

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_garbage_token_is_invalid_session() {
    let app = create_router(state_with(test_config(), MockDatabase::new(DatabaseBackend::Postgres)));
    let request = Request::get("/auth/current-user")
        .header(header::AUTHORIZATION, "Bearer not.a.jwt")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_SESSION");
}

#[tokio::test]
async fn test_session_cookie_resolves_current_user() {
    let reader = user(false);
    let state = state_with(test_config(), db_with_users(&[reader.clone()]));
    let token = state.sessions.issue(reader.id).unwrap();
    let cookie = format!("theme=dark; {}={}", state.sessions.cookie_name(), token);

    let request = Request::get("/auth/current-user")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(create_router(state), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], reader.id.to_string());
    assert_eq!(body["display_name"], "Reader");
    assert!(body.get("google_id").is_none());
}

#[tokio::test]
async fn test_membership_status_for_premium_user() {
    let member = user(true);
    let state = state_with(test_config(), db_with_users(&[member.clone()]));
    let auth = bearer(&state, &member);

    let request = Request::get("/payments/membership-status")
        .header(header::AUTHORIZATION, auth)
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(create_router(state), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "status": "active" }));
}

#[tokio::test]
async fn test_cached_contract_is_served() {
    let reader = user(false);
    let state = state_with(test_config(), db_with_users(&[reader.clone()]));
    let detail = cached_detail(reader.id);
    state
        .cache
        .set(&keys::contract(detail.id()), &detail)
        .await
        .unwrap();
    let auth = bearer(&state, &reader);

    let request = Request::get(format!("/contracts/contract/{}", detail.id()))
        .header(header::AUTHORIZATION, auth)
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(create_router(state), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], detail.id().to_string());
    assert_eq!(body["risks"][0]["severity"], "high");
    assert_eq!(body["contract_duration"], 12);
}

#[tokio::test]
async fn test_malformed_contract_id_is_bad_request() {
    let reader = user(false);
    let state = state_with(test_config(), db_with_users(&[reader.clone()]));
    let auth = bearer(&state, &reader);

    let request = Request::get("/contracts/contract/12345")
        .header(header::AUTHORIZATION, auth)
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(create_router(state), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_FORMAT");
}

#[tokio::test]
async fn test_detect_type_without_file() {
    let reader = user(false);
    let state = state_with(test_config(), db_with_users(&[reader.clone()]));
    let auth = bearer(&state, &reader);

    let request = Request::post("/contracts/detect-type")
        .header(header::AUTHORIZATION, auth)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let (status, body) = send(create_router(state), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["message"], "Validation failed: No file uploaded");
    assert_eq!(body["error"]["field"], "contract");
}

#[tokio::test]
async fn test_analyze_requires_contract_type() {
    let reader = user(false);
    let state = state_with(test_config(), db_with_users(&[reader.clone()]));
    let auth = bearer(&state, &reader);

    let boundary = "clauselens-boundary";
    let body = multipart_body(
        boundary,
        &[("contract", Some("application/pdf"), b"%PDF-1.4\n%%EOF\n")],
    );
    let request = Request::post("/contracts/analyze")
        .header(header::AUTHORIZATION, auth)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(create_router(state), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "MISSING_FIELD");
    assert_eq!(body["error"]["field"], "contractType");
}

#[tokio::test]
async fn test_non_pdf_upload_is_rejected() {
    let reader = user(false);
    let state = state_with(test_config(), db_with_users(&[reader.clone()]));
    let auth = bearer(&state, &reader);

    let boundary = "clauselens-boundary";
    let body = multipart_body(
        boundary,
        &[
            ("contract", Some("text/plain"), b"just text"),
            ("contractType", None, b"Lease"),
        ],
    );
    let request = Request::post("/contracts/analyze")
        .header(header::AUTHORIZATION, auth)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(create_router(state), request).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["error"]["code"], "UNSUPPORTED_MEDIA_TYPE");
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let reader = user(false);
    let state = state_with(test_config(), db_with_users(&[reader.clone()]));
    let auth = bearer(&state, &reader);
    let app = create_router(state);

    let logout = Request::get("/auth/logout")
        .header(header::AUTHORIZATION, auth.clone())
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(logout).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("clauselens_session=;"));
    assert!(cookie.contains("Max-Age=0"));

    // Revocation is checked before the user lookup, so no second row is needed
    let again = Request::get("/auth/current-user")
        .header(header::AUTHORIZATION, auth)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, again).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_SESSION");
}

#[tokio::test]
async fn test_analysis_routes_are_rate_limited_per_user() {
    let mut config = test_config();
    config.rate_limit.requests_per_second = 1;
    config.rate_limit.burst = 1;
    let heavy = user(false);
    let other = user(false);
    // One lookup per authenticated request: heavy, heavy, other
    let state = state_with(
        config,
        db_with_users(&[heavy.clone(), heavy.clone(), other.clone()]),
    );
    let heavy_auth = bearer(&state, &heavy);
    let other_auth = bearer(&state, &other);
    let app = create_router(state);

    let no_file = |auth: &str| {
        Request::post("/contracts/detect-type")
            .header(header::AUTHORIZATION, auth)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap()
    };

    // Anonymous callers are turned away before they can use up anyone's quota
    let anonymous = Request::post("/contracts/detect-type").body(Body::empty()).unwrap();
    let (status, _) = send(app.clone(), anonymous).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(app.clone(), no_file(&heavy_auth)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = send(app.clone(), no_file(&heavy_auth)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "RATE_LIMITED");

    let (status, body) = send(app, no_file(&other_auth)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_analyze_persists_and_caches_report() {
    let reader = user(false);
    let row = analysis_row(reader.id, "Mutual non-disclosure agreement between two companies.");
    let id = row.id;
    let risk = |severity: &str| Risk {
        id: Uuid::new_v4(),
        contract_id: id,
        risk: "Broad definition".into(),
        explanation: "Covers oral disclosures.".into(),
        severity: severity.into(),
    };
    let db = db_with_users(&[reader.clone()])
        .append_query_results([vec![row]])
        .append_query_results([vec![risk("high")]])
        .append_query_results([vec![risk("low")]])
        .append_query_results([vec![Opportunity {
            id: Uuid::new_v4(),
            contract_id: id,
            opportunity: "Mutual obligations".into(),
            explanation: "Both parties are equally bound.".into(),
            impact: "medium".into(),
        }]])
        .append_query_results([vec![FinancialTerms {
            id: Uuid::new_v4(),
            contract_id: id,
            description: "No payments".into(),
            details: serde_json::json!([]),
        }]]);
    let state = state_with(test_config(), db);
    let auth = bearer(&state, &reader);
    let cache = state.cache.clone();

    let pdf = build_pdf("Mutual NDA between A and B");
    let request = multipart_request(
        "/contracts/analyze",
        &auth,
        &[
            ("contract", Some("application/pdf"), pdf.as_slice()),
            ("contractType", None, b"Non-Disclosure Agreement"),
        ],
    );

    let (status, body) = send(create_router(state), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.to_string());
    assert_eq!(body["risks"].as_array().unwrap().len(), 2);
    assert_eq!(body["opportunities"][0]["impact"], "medium");
    assert_eq!(body["financial_terms"]["description"], "No payments");

    let cached: Option<AnalysisDetail> = cache.get(&keys::contract(id)).await.unwrap();
    let cached = cached.expect("analysis cached after save");
    assert_eq!(cached.owner(), reader.id);
    assert_eq!(cached.risks.len(), 2);
}

#[tokio::test]
async fn test_oversized_upload_is_payload_too_large() {
    let mut config = test_config();
    config.upload.max_bytes = 100;
    let reader = user(false);
    let state = state_with(config, db_with_users(&[reader.clone()]));
    let auth = bearer(&state, &reader);

    let mut pdf = b"%PDF-1.4\n".to_vec();
    pdf.resize(1000, b'a');
    let request = multipart_request(
        "/contracts/detect-type",
        &auth,
        &[("contract", Some("application/pdf"), pdf.as_slice())],
    );

    let (status, body) = send(create_router(state), request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
    assert_eq!(
        body["error"]["message"],
        "Payload too large: 1000 bytes exceeds limit of 100 bytes"
    );
}

#[tokio::test]
async fn test_body_over_limit_without_length_omits_size() {
    let mut config = test_config();
    config.upload.max_bytes = 100;
    let reader = user(false);
    let state = state_with(config, db_with_users(&[reader.clone()]));
    let auth = bearer(&state, &reader);

    // Past the multipart allowance, so the body limit trips mid-stream
    let mut pdf = b"%PDF-1.4\n".to_vec();
    pdf.resize(100 * 1024, b'a');
    let request = multipart_request(
        "/contracts/detect-type",
        &auth,
        &[("contract", Some("application/pdf"), pdf.as_slice())],
    );
    assert!(request.headers().get(header::CONTENT_LENGTH).is_none());

    let (status, body) = send(create_router(state), request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        body["error"]["message"],
        "Payload too large: exceeds limit of 100 bytes"
    );
}

#[tokio::test]
async fn test_user_contracts_pages_newest_first() {
    let reader = user(false);
    let newer = analysis_row(reader.id, "Newer lease");
    let mut older = analysis_row(reader.id, "Older lease");
    older.created_at = (chrono::Utc::now() - chrono::Duration::days(3)).into();

    let count = BTreeMap::from([("num_items", sea_orm::Value::from(7i64))]);
    let db = db_with_users(&[reader.clone()])
        .append_query_results([vec![count]])
        .append_query_results([vec![newer.clone(), older.clone()]]);
    let state = state_with(test_config(), db);
    let auth = bearer(&state, &reader);

    let request = Request::get("/contracts/user-contracts?offset=2&limit=2")
        .header(header::AUTHORIZATION, auth)
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(create_router(state), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 7);
    assert_eq!(body["offset"], 2);
    assert_eq!(body["limit"], 2);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], newer.id.to_string());
    assert_eq!(items[1]["id"], older.id.to_string());
    assert!(items[0].get("contract_text").is_none());
}

#[tokio::test]
async fn test_user_contracts_rejects_oversized_page() {
    let reader = user(false);
    let state = state_with(test_config(), db_with_users(&[reader.clone()]));
    let auth = bearer(&state, &reader);

    let request = Request::get("/contracts/user-contracts?limit=500")
        .header(header::AUTHORIZATION, auth)
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(create_router(state), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["field"], "limit");
}

#[tokio::test]
async fn test_feedback_is_stored_and_cache_invalidated() {
    let reader = user(false);
    let detail = cached_detail(reader.id);
    let id = detail.id();
    let now = chrono::Utc::now();
    let stored = UserFeedback {
        id: Uuid::new_v4(),
        contract_id: id,
        rating: 4,
        comments: "Clear summary".into(),
        created_at: now.into(),
        updated_at: now.into(),
    };
    let db = db_with_users(&[reader.clone()])
        .append_query_results([vec![detail.analysis.clone()]])
        .append_query_results([Vec::<UserFeedback>::new()])
        .append_query_results([vec![stored]]);
    let state = state_with(test_config(), db);
    state.cache.set(&keys::contract(id), &detail).await.unwrap();
    let auth = bearer(&state, &reader);
    let cache = state.cache.clone();

    let request = Request::post(format!("/contracts/contract/{}/feedback", id))
        .header(header::AUTHORIZATION, auth)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"rating":4,"comments":"Clear summary"}"#))
        .unwrap();

    let (status, body) = send(create_router(state), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rating"], 4);
    assert_eq!(body["contract_id"], id.to_string());

    let cached: Option<AnalysisDetail> = cache.get(&keys::contract(id)).await.unwrap();
    assert!(cached.is_none());
}

#[tokio::test]
async fn test_feedback_on_foreign_contract_is_not_found() {
    let reader = user(false);
    let db = db_with_users(&[reader.clone()])
        .append_query_results([Vec::<ContractAnalysis>::new()]);
    let state = state_with(test_config(), db);
    let auth = bearer(&state, &reader);

    let request = Request::post(format!("/contracts/contract/{}/feedback", Uuid::new_v4()))
        .header(header::AUTHORIZATION, auth)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"rating":5}"#))
        .unwrap();

    let (status, body) = send(create_router(state), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "CONTRACT_NOT_FOUND");
}

#[test]
fn test_missing_session_secret_is_configuration_error() {
    let result = AppState::new(
        AppConfig::default(),
        Repository::new(DbPool::from_connection(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        )),
        Cache::in_memory(),
        Arc::new(MockGenerator::new()),
        None,
    );
    assert!(result.is_err());
}
