//! Integration tests for the store REST client against an in-process
//! stub server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use slitmask_client::messages::MaskLookup;
use slitmask_client::{MaskApi, MaskApiError};
use slitmask_core::catalog::{CellValue, NumericColumn, ObjectRecord};
use slitmask_core::diff::diff;
use slitmask_core::payload::{assemble, AssemblyContext, MaskParameterSet};

const USER: &str = "observer1";

/// Bodies received by the stub, for later inspection.
#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Value>>>);

impl Recorder {
    fn push(&self, v: Value) {
        self.0.lock().unwrap().push(v);
    }

    fn take(&self) -> Vec<Value> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

/// Serve `router` on an ephemeral port and return the API base URL.
async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api")
}

fn user_of(headers: &HeaderMap) -> String {
    headers
        .get("user-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn generation_request() -> slitmask_core::payload::GenerationRequest {
    let params = MaskParameterSet {
        title: Some("field-a".into()),
        ..Default::default()
    };
    assemble(
        &params,
        &AssemblyContext {
            user_id: USER.into(),
            project_name: Some("cosmos".into()),
            objects: Some("targets".into()),
            today: chrono::NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
        },
    )
}

// ---------------------------------------------------------------------------
// Mask lookup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_mask_returns_document_with_identity_and_project() {
    let router = Router::new().route(
        "/api/masks/{mask}/",
        get(
            |Path(mask): Path<String>,
             Query(q): Query<HashMap<String, String>>,
             headers: HeaderMap| async move {
                assert_eq!(mask, "m1");
                assert_eq!(q.get("project_name").map(String::as_str), Some("cosmos"));
                assert_eq!(user_of(&headers), USER);
                Json(json!({
                    "features": [{"id": "S1", "ra": "10:00:00", "dec": "+02:23:00",
                                  "width": 0.1, "a_len": 0.2, "angle": 0.0}],
                    "obj_list": [{"name": "obj1", "priority": 3, "aux": {"a_len": 2.0}}],
                    "excluded_obj_list": [],
                    "center_ra": "10:00:00",
                    "center_dec": "+02:23:00"
                }))
            },
        ),
    );
    let api = MaskApi::new(spawn(router).await, USER);

    let lookup = api.fetch_mask("m1", "cosmos").await.unwrap();

    let MaskLookup::Found(doc) = lookup else {
        panic!("expected a mask document");
    };
    assert_eq!(doc.features.len(), 1);
    assert_eq!(doc.obj_list[0].a_len, CellValue::Number(2.0));
    assert_eq!(doc.center_dec(), "+02:23:00");
}

#[tokio::test]
async fn mask_and_instrument_names_stay_one_path_segment() {
    let recorder = Recorder::default();
    let router = Router::new()
        .route(
            "/api/masks/{mask}/",
            get(
                |State(rec): State<Recorder>,
                 Path(mask): Path<String>,
                 Query(q): Query<HashMap<String, String>>| async move {
                    rec.push(json!({"mask": mask, "project": q.get("project_name")}));
                    Json(json!({"features": []}))
                },
            ),
        )
        .route(
            "/api/instruments/{name}/",
            get(|State(rec): State<Recorder>, Path(name): Path<String>| async move {
                rec.push(json!({"instrument": name}));
                Json(json!({"filters": [], "dispersers": []}))
            }),
        )
        .with_state(recorder.clone());
    let api = MaskApi::new(spawn(router).await, USER);

    let lookup = api.fetch_mask("field/a?b", "cosmos").await.unwrap();
    assert_matches!(lookup, MaskLookup::Found(_));
    api.fetch_instrument_config("IMACS f/2").await.unwrap();

    assert_eq!(
        recorder.take(),
        [
            json!({"mask": "field/a?b", "project": "cosmos"}),
            json!({"instrument": "IMACS f/2"}),
        ]
    );
}

#[tokio::test]
async fn fetch_mask_maps_404_to_not_found() {
    let router = Router::new().route(
        "/api/masks/{mask}/",
        get(|| async { (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))) }),
    );
    let api = MaskApi::new(spawn(router).await, USER);

    assert_matches!(api.fetch_mask("m1", "cosmos").await, Ok(MaskLookup::NotFound));
}

#[tokio::test]
async fn fetch_mask_surfaces_other_failures() {
    let router = Router::new().route(
        "/api/masks/{mask}/",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let api = MaskApi::new(spawn(router).await, USER);

    let err = api.fetch_mask("m1", "cosmos").await.unwrap_err();
    assert_matches!(err, MaskApiError::ApiError { status: 500, ref body } if body == "boom");
}

// ---------------------------------------------------------------------------
// Catalog lists
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_object_list_takes_first_entry_and_flattens_aux() {
    let router = Router::new().route(
        "/api/objects/viewlist/",
        get(|Query(q): Query<HashMap<String, String>>| async move {
            assert_eq!(q.get("list_name").map(String::as_str), Some("targets"));
            Json(json!([{
                "list_name": "targets",
                "objects": [
                    {"id": 1, "name": "obj1", "type": "galaxy", "priority": 2,
                     "aux": {"b_len": "4.5", "mag": 20.1}}
                ]
            }]))
        }),
    );
    let api = MaskApi::new(spawn(router).await, USER);

    let entry = api.fetch_object_list("targets").await.unwrap();

    assert_eq!(entry.list_name, "targets");
    assert_eq!(entry.objects.len(), 1);
    assert_eq!(entry.objects[0].b_len, CellValue::from("4.5"));
    assert_eq!(entry.objects[0].extra["mag"], json!(20.1));
}

#[tokio::test]
async fn fetch_object_list_without_objects_is_rejected() {
    let router = Router::new().route(
        "/api/objects/viewlist/",
        get(|| async { Json(json!([{"list_name": "targets"}])) }),
    );
    let api = MaskApi::new(spawn(router).await, USER);

    assert_matches!(
        api.fetch_object_list("targets").await,
        Err(MaskApiError::Core(_))
    );
}

#[tokio::test]
async fn list_project_masks_returns_names() {
    let router = Router::new().route(
        "/api/masks/get_project_masks",
        get(|| async { Json(json!([{"name": "m1", "status": "draft"}, {"name": "m2"}])) }),
    );
    let api = MaskApi::new(spawn(router).await, USER);

    assert_eq!(api.list_project_masks("cosmos").await.unwrap(), ["m1", "m2"]);
}

#[tokio::test]
async fn instrument_config_is_normalized() {
    let router = Router::new().route(
        "/api/instruments/{name}/",
        get(|Path(name): Path<String>| async move {
            assert_eq!(name, "IMACS_sc");
            Json(json!({"filters": ["f1"], "dispersers": ["IMACS_grism_400", 300]}))
        }),
    );
    let api = MaskApi::new(spawn(router).await, USER);

    let config = api.fetch_instrument_config("IMACS_sc").await.unwrap();
    assert_eq!(config.dispersers, ["IMACS_grism_400", "300"]);
}

// ---------------------------------------------------------------------------
// Object edits
// ---------------------------------------------------------------------------

#[tokio::test]
async fn patch_object_sends_flat_body() {
    let recorder = Recorder::default();
    let router = Router::new()
        .route(
            "/api/objects/edit/",
            patch(
                |State(rec): State<Recorder>,
                 headers: HeaderMap,
                 Json(body): Json<Value>| async move {
                    assert_eq!(user_of(&headers), USER);
                    rec.push(body);
                    Json(json!({"message": "Object 'obj1' updated"}))
                },
            ),
        )
        .with_state(recorder.clone());
    let api = MaskApi::new(spawn(router).await, USER);

    let obj1 = ObjectRecord::named("obj1");
    let baseline = vec![obj1.clone().with(NumericColumn::Priority, "3")];
    let draft = vec![obj1.with(NumericColumn::Priority, "5")];
    let patches = diff(&baseline, &draft, &NumericColumn::ALL, "targets", USER);
    api.patch_object(&patches[0]).await.unwrap();

    assert_eq!(
        recorder.take(),
        [json!({
            "list_name": "targets",
            "obj_name": "obj1",
            "user_id": USER,
            "priority": 5
        })]
    );
}

#[tokio::test]
async fn patch_object_rejects_non_success() {
    let router = Router::new().route(
        "/api/objects/edit/",
        patch(|| async { (StatusCode::BAD_REQUEST, "bad priority") }),
    );
    let api = MaskApi::new(spawn(router).await, USER);

    let patches = diff(
        &[ObjectRecord::named("obj1")],
        &[ObjectRecord::named("obj1").with(NumericColumn::ALen, 1.0)],
        &NumericColumn::ALL,
        "targets",
        USER,
    );
    let err = api.patch_object(&patches[0]).await.unwrap_err();
    assert_eq!(err.status(), Some(400));
}

// ---------------------------------------------------------------------------
// Mask generation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generate_mask_reads_direct_stream_with_filename_override() {
    let recorder = Recorder::default();
    let router = Router::new()
        .route(
            "/api/masks/generate/",
            post(|State(rec): State<Recorder>, Json(body): Json<Value>| async move {
                rec.push(body);
                (
                    [
                        (header::CONTENT_TYPE, "application/octet-stream"),
                        (
                            header::CONTENT_DISPOSITION,
                            "attachment; filename=\"field-a.SMF\"",
                        ),
                    ],
                    b"SMF-CONTENT".to_vec(),
                )
            }),
        )
        .with_state(recorder.clone());
    let api = MaskApi::new(spawn(router).await, USER);

    let artifact = api.generate_mask(&generation_request()).await.unwrap();

    assert_eq!(artifact.filename, "field-a.SMF");
    assert_eq!(artifact.bytes, b"SMF-CONTENT");
    let sent = recorder.take();
    assert_eq!(sent[0]["title"], "field-a");
    assert_eq!(sent[0]["objects"], "targets");
    assert!(sent[0].get("SLEXTEND").is_none());
}

#[tokio::test]
async fn generate_mask_follows_json_pointer() {
    let router = Router::new()
        .route(
            "/api/masks/generate/",
            post(|| async { Json(json!({"path": "/api/files/field-a"})) }),
        )
        .route(
            "/api/files/field-a",
            get(|headers: HeaderMap| async move {
                assert_eq!(user_of(&headers), USER);
                let disposition = "attachment; filename=downloaded.smf";
                ([(header::CONTENT_DISPOSITION, disposition)], "FILE")
            }),
        );
    let api = MaskApi::new(spawn(router).await, USER);

    let artifact = api.generate_mask(&generation_request()).await.unwrap();

    assert_eq!(artifact.filename, "downloaded.smf");
    assert_eq!(artifact.bytes, b"FILE");
}

#[tokio::test]
async fn generate_mask_defaults_filename_from_title() {
    let router = Router::new().route(
        "/api/masks/generate/",
        post(|| async { ([(header::CONTENT_TYPE, "application/octet-stream")], "X") }),
    );
    let api = MaskApi::new(spawn(router).await, USER);

    let artifact = api.generate_mask(&generation_request()).await.unwrap();
    assert_eq!(artifact.filename, "field-a.smf");
}

#[tokio::test]
async fn generate_mask_pointer_without_path_fails() {
    let router = Router::new().route(
        "/api/masks/generate/",
        post(|| async { (StatusCode::CREATED, Json(json!({"created": "/srv/x.SMF"}))) }),
    );
    let api = MaskApi::new(spawn(router).await, USER);

    assert_matches!(
        api.generate_mask(&generation_request()).await,
        Err(MaskApiError::MissingArtifactPath)
    );
}

#[tokio::test]
async fn generate_mask_failure_carries_status_and_body() {
    let router = Router::new().route(
        "/api/masks/generate/",
        post(|| async {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "mask name already exists for project"})),
            )
        }),
    );
    let api = MaskApi::new(spawn(router).await, USER);

    let err = api.generate_mask(&generation_request()).await.unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert!(err.to_string().contains("already exists"));
}

// ---------------------------------------------------------------------------
// Finalization and machine code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn complete_mask_posts_names() {
    let recorder = Recorder::default();
    let router = Router::new()
        .route(
            "/api/masks/complete/",
            post(|State(rec): State<Recorder>, Json(body): Json<Value>| async move {
                rec.push(body);
                StatusCode::OK
            }),
        )
        .with_state(recorder.clone());
    let api = MaskApi::new(spawn(router).await, USER);

    api.complete_mask("cosmos", "field-a").await.unwrap();

    assert_eq!(
        recorder.take(),
        [json!({"project_name": "cosmos", "mask_name": "field-a"})]
    );
}

#[tokio::test]
async fn complete_mask_reports_store_message() {
    let router = Router::new().route(
        "/api/masks/complete/",
        post(|| async { (StatusCode::BAD_REQUEST, Json(json!({"detail": "already final"}))) }),
    );
    let api = MaskApi::new(spawn(router).await, USER);

    let err = api.complete_mask("cosmos", "field-a").await.unwrap_err();
    assert_matches!(err, MaskApiError::Message(ref m) if m == "already final");
}

#[tokio::test]
async fn machine_code_uses_code_response_filename_even_for_pointer() {
    let router = Router::new()
        .route(
            "/api/machine/generate/",
            post(|headers: HeaderMap, body: Bytes| async move {
                let ct = headers
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                assert!(ct.starts_with("multipart/form-data"));
                let text = String::from_utf8_lossy(&body);
                assert!(text.contains("field-a"));
                StatusCode::OK
            }),
        )
        .route(
            "/api/machine/get-machine-code/",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(q.get("mask_name").map(String::as_str), Some("field-a"));
                let disposition = "attachment; filename=\"field-a.code\"";
                (
                    [(header::CONTENT_DISPOSITION, disposition)],
                    Json(json!({"file": "/api/files/code"})),
                )
            }),
        )
        .route(
            "/api/files/code",
            get(|| async {
                let disposition = "attachment; filename=ignored.txt";
                ([(header::CONTENT_DISPOSITION, disposition)], "G01 X0")
            }),
        );
    let api = MaskApi::new(spawn(router).await, USER);

    let artifact = api.generate_machine_code("cosmos", "field-a").await.unwrap();

    assert_eq!(artifact.filename, "field-a.code");
    assert_eq!(artifact.bytes, b"G01 X0");
}

#[tokio::test]
async fn machine_code_plain_text_gets_default_name() {
    let router = Router::new()
        .route("/api/machine/generate/", post(|| async { StatusCode::OK }))
        .route("/api/machine/get-machine-code/", get(|| async { "G01 X0" }));
    let api = MaskApi::new(spawn(router).await, USER);

    let artifact = api.generate_machine_code("cosmos", "field-a").await.unwrap();

    assert_eq!(artifact.filename, "field-a_machine_code.txt");
    assert_eq!(artifact.content_type.as_deref(), Some("text/plain; charset=utf-8"));
}

#[tokio::test]
async fn machine_code_generation_failure_stops_before_download() {
    let router = Router::new().route(
        "/api/machine/generate/",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "maskgen crashed") }),
    );
    let api = MaskApi::new(spawn(router).await, USER);

    let result = api.generate_machine_code("cosmos", "field-a").await;
    let err = result.unwrap_err();
    assert_eq!(err.status(), Some(500));
}
