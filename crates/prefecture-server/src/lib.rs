//! HTTP front end for the Préfecture portal.
//!
//! Mounts [`prefecture_api`] under `/api` behind Basic authentication, and
//! adds the two unauthenticated routes: account registration and signed
//! file downloads.

pub mod auth;
pub mod blob;
pub mod error;
pub mod notify;

pub use error::Error;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Json, Router,
  extract::{Path, Query, State},
  http::{StatusCode, header},
  middleware,
  response::{IntoResponse, Response},
  routing::{get, post},
};
use prefecture_core::{
  Catalog, Portal,
  notify::Notifier,
  portal::DEFAULT_PAGE_SIZE,
  profile::ProfileNames,
  session::Registration,
  store::PortalStore,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use blob::FsBlobStore;
use notify::NotifyConfig;

/// Shortest password accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 8;

// ─── Configuration ───────────────────────────────────────────────────────────

fn default_page_size() -> usize { DEFAULT_PAGE_SIZE }

fn default_link_ttl_secs() -> u64 { 3600 }

/// Runtime server configuration, deserialised from `config.toml` and
/// `PREFECTURE__*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:           String,
  pub port:           u16,
  /// Public origin used to build download URLs.
  pub base_url:       String,
  pub store_path:     PathBuf,
  pub blob_dir:       PathBuf,
  /// Key for signing download links.
  pub signing_secret: String,
  #[serde(default = "default_page_size")]
  pub page_size:      usize,
  #[serde(default = "default_link_ttl_secs")]
  pub link_ttl_secs:  u64,
  #[serde(default)]
  pub notify:         Option<NotifyConfig>,
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub portal:  Portal<S>,
  pub catalog: Catalog<S, FsBlobStore>,
  pub blobs:   Arc<FsBlobStore>,
  pub config:  Arc<ServerConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      portal:  self.portal.clone(),
      catalog: self.catalog.clone(),
      blobs:   Arc::clone(&self.blobs),
      config:  Arc::clone(&self.config),
    }
  }
}

impl<S: PortalStore> AppState<S> {
  pub fn new(store: Arc<S>, config: ServerConfig, notifier: Arc<dyn Notifier>) -> Self {
    let blobs = Arc::new(FsBlobStore::new(
      &config.blob_dir,
      &config.base_url,
      &config.signing_secret,
    ));
    let portal = Portal::new(Arc::clone(&store))
      .with_notifier(notifier)
      .with_page_size(config.page_size);
    let catalog = Catalog::new(store, Arc::clone(&blobs))
      .with_link_ttl(Duration::from_secs(config.link_ttl_secs));
    Self { portal, catalog, blobs, config: Arc::new(config) }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the complete application router.
pub fn router<S: PortalStore + 'static>(state: AppState<S>) -> Router {
  let api = prefecture_api::api_router(state.portal.clone(), state.catalog.clone())
    .layer(middleware::from_fn_with_state(state.clone(), auth::authenticate::<S>));

  Router::new()
    .route("/register", post(register::<S>))
    .route("/files/{*path}", get(download::<S>))
    .with_state(state)
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

// ─── Route handlers ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub email:      String,
  pub password:   String,
  #[serde(default)]
  pub first_name: Option<String>,
  #[serde(default)]
  pub last_name:  Option<String>,
}

/// `POST /register`
async fn register<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  Json(body): Json<RegisterBody>,
) -> Result<Response, Error> {
  if body.password.chars().count() < MIN_PASSWORD_LEN {
    return Err(
      prefecture_core::Error::invalid(
        "password",
        format!("must be at least {MIN_PASSWORD_LEN} characters"),
      )
      .into(),
    );
  }

  let password_hash = auth::hash_password(&body.password)?;
  let profile = state
    .portal
    .register(Registration {
      email: body.email,
      password_hash,
      names: ProfileNames { first_name: body.first_name, last_name: body.last_name },
    })
    .await?;
  Ok((StatusCode::CREATED, Json(profile)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct LinkParams {
  pub expires: i64,
  pub sig:     String,
}

fn content_type_for(path: &str) -> &'static str {
  let ext = path.rsplit_once('.').map(|(_, e)| e).unwrap_or_default();
  match ext {
    "pdf" => "application/pdf",
    "png" => "image/png",
    "jpg" | "jpeg" => "image/jpeg",
    "txt" => "text/plain; charset=utf-8",
    "zip" => "application/zip",
    _ => "application/octet-stream",
  }
}

/// `GET /files/{*path}?expires=&sig=`
async fn download<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  Path(path): Path<String>,
  Query(params): Query<LinkParams>,
) -> Result<Response, Error> {
  state.blobs.verify(&path, params.expires, &params.sig)?;
  let bytes = state.blobs.read(&path).await?;
  Ok(([(header::CONTENT_TYPE, content_type_for(&path))], bytes).into_response())
}

// ─── Integration tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, header},
  };
  use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
  use prefecture_core::{notify::NoopNotifier, profile::Role};
  use prefecture_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  const BASE_URL: &str = "http://localhost:8080";

  async fn make_state(dir: &tempfile::TempDir) -> AppState<SqliteStore> {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let config = ServerConfig {
      host:           "127.0.0.1".to_string(),
      port:           8080,
      base_url:       BASE_URL.to_string(),
      store_path:     PathBuf::from(":memory:"),
      blob_dir:       dir.path().to_path_buf(),
      signing_secret: "test-secret".to_string(),
      page_size:      10,
      link_ttl_secs:  60,
      notify:         None,
    };
    AppState::new(store, config, Arc::new(NoopNotifier))
  }

  fn auth_header(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  async fn oneshot_raw(
    state: &AppState<SqliteStore>,
    method: &str,
    uri: &str,
    auth: Option<(&str, &str)>,
    body: Body,
  ) -> Response {
    let mut builder = Request::builder()
      .method(method)
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/json");
    if let Some((user, pass)) = auth {
      builder = builder.header(header::AUTHORIZATION, auth_header(user, pass));
    }
    router(state.clone()).oneshot(builder.body(body).unwrap()).await.unwrap()
  }

  async fn json_body(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  async fn register_user(state: &AppState<SqliteStore>, email: &str, password: &str) {
    let body = json!({ "email": email, "password": password, "first_name": "Ada" });
    let resp = oneshot_raw(state, "POST", "/register", None, Body::from(body.to_string())).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
  }

  // ── Registration & sign-in ───────────────────────────────────────────────

  #[tokio::test]
  async fn register_then_read_own_profile() {
    let dir = tempfile::tempdir().unwrap();
    let state = make_state(&dir).await;
    register_user(&state, "Ada@Uni.edu", "lovelace1").await;

    let resp = oneshot_raw(
      &state,
      "GET",
      "/api/me",
      Some(("ada@uni.edu", "lovelace1")),
      Body::empty(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let me = json_body(resp).await;
    assert_eq!(me["email"], "ada@uni.edu");
    assert_eq!(me["role"], "student");
    assert_eq!(me["first_name"], "Ada");
  }

  #[tokio::test]
  async fn registration_validates_input() {
    let dir = tempfile::tempdir().unwrap();
    let state = make_state(&dir).await;

    let short = json!({ "email": "a@uni.edu", "password": "short" });
    let resp =
      oneshot_raw(&state, "POST", "/register", None, Body::from(short.to_string())).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(resp).await["field"], "password");

    register_user(&state, "a@uni.edu", "long-enough").await;
    let dup = json!({ "email": "A@uni.edu", "password": "long-enough" });
    let resp = oneshot_raw(&state, "POST", "/register", None, Body::from(dup.to_string())).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(resp).await["field"], "email");
  }

  #[tokio::test]
  async fn bad_credentials_are_challenged() {
    let dir = tempfile::tempdir().unwrap();
    let state = make_state(&dir).await;
    register_user(&state, "a@uni.edu", "long-enough").await;

    let resp = oneshot_raw(
      &state,
      "GET",
      "/api/questions",
      Some(("a@uni.edu", "wrong-password")),
      Body::empty(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));

    let resp = oneshot_raw(&state, "GET", "/api/questions", None, Body::empty()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  // ── Documents & signed links ─────────────────────────────────────────────

  #[tokio::test]
  async fn signed_download_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let state = make_state(&dir).await;
    register_user(&state, "admin@uni.edu", "admin-pass").await;
    register_user(&state, "student@uni.edu", "student-pass").await;
    state.portal.assign_role("admin@uni.edu", Role::Admin).await.unwrap();

    let resp = oneshot_raw(
      &state,
      "POST",
      "/api/documents?name=Analyse&level=L2&file_name=analyse.pdf",
      Some(("admin@uni.edu", "admin-pass")),
      Body::from("%PDF-1.7 fake"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let doc = json_body(resp).await;
    let id = doc["document_id"].as_str().unwrap().to_owned();

    let resp = oneshot_raw(
      &state,
      "GET",
      &format!("/api/documents/{id}/link"),
      Some(("student@uni.edu", "student-pass")),
      Body::empty(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let link = json_body(resp).await;
    let url = link["url"].as_str().unwrap();
    let uri = url.strip_prefix(BASE_URL).unwrap().to_owned();

    let resp = oneshot_raw(&state, "GET", &uri, None, Body::empty()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/pdf");
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"%PDF-1.7 fake");

    let tampered = uri.replace("expires=", "expires=1");
    let resp = oneshot_raw(&state, "GET", &tampered, None, Body::empty()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  }
}
