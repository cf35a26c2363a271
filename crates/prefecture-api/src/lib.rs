//! JSON REST API for the Préfecture portal.
//!
//! Exposes an axum [`Router`] backed by a [`Portal`] and a [`Catalog`].
//! Authentication is the embedding server's job: every request must carry a
//! [`Caller`](prefecture_core::profile::Caller) request extension, which is
//! [`Caller::Anonymous`](prefecture_core::profile::Caller::Anonymous) when no
//! credentials were presented.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", prefecture_api::api_router(portal.clone(), catalog.clone()))
//! ```

pub mod admin;
pub mod documents;
pub mod error;
pub mod profiles;
pub mod questions;
pub mod reactions;

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{delete, get, post},
};
use prefecture_core::{Catalog, Portal, blob::BlobStore, store::PortalStore};

pub use error::ApiError;

/// Build the fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, B>(portal: Portal<S>, catalog: Catalog<S, B>) -> Router<()>
where
  S: PortalStore + 'static,
  B: BlobStore + 'static,
{
  let questions = Router::new()
    // Student surface
    .route("/questions", get(questions::feed::<S>).post(questions::create::<S>))
    .route("/questions/mine", get(questions::mine::<S>))
    .route(
      "/questions/{id}",
      get(questions::get_one::<S>)
        .put(questions::edit::<S>)
        .delete(questions::delete::<S>),
    )
    .route(
      "/questions/{id}/reactions",
      get(reactions::tally::<S>).post(reactions::react::<S>),
    )
    // Moderation
    .route("/admin/questions", get(admin::queue::<S>).post(admin::create::<S>))
    .route("/admin/questions/{id}", delete(admin::delete::<S>))
    .route("/admin/questions/{id}/answer", post(admin::answer::<S>))
    .route("/admin/questions/{id}/publish", post(admin::publish::<S>))
    .route("/admin/questions/{id}/unpublish", post(admin::unpublish::<S>))
    // Profiles
    .route("/me", get(profiles::me::<S>).patch(profiles::update_me::<S>))
    .route("/profiles", get(profiles::list::<S>))
    .with_state(portal);

  let documents = Router::new()
    .route(
      "/documents",
      get(documents::list::<S, B>).post(documents::upload::<S, B>),
    )
    .route("/documents/{id}", delete(documents::delete::<S, B>))
    .route("/documents/{id}/link", get(documents::link::<S, B>))
    .layer(DefaultBodyLimit::max(documents::MAX_UPLOAD_BYTES))
    .with_state(catalog);

  questions.merge(documents)
}

#[cfg(test)]
mod tests {
  use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
  };

  use axum::{
    Extension,
    body::{Body, Bytes},
    http::{Request, StatusCode},
  };
  use prefecture_core::{blob::SignedLink, profile::Caller};
  use prefecture_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  use super::*;

  /// Blob store keeping everything in a map.
  #[derive(Default)]
  struct MemoryBlobs(Mutex<HashMap<String, Bytes>>);

  impl BlobStore for MemoryBlobs {
    type Error = std::io::Error;

    async fn put(&self, path: &str, bytes: Bytes) -> Result<String, Self::Error> {
      self.0.lock().unwrap().insert(path.to_owned(), bytes);
      Ok(format!("mem://{path}"))
    }

    async fn remove(&self, path: &str) -> Result<(), Self::Error> {
      self.0.lock().unwrap().remove(path);
      Ok(())
    }

    fn sign(&self, path: &str, ttl: Duration) -> Result<SignedLink, Self::Error> {
      Ok(SignedLink {
        url:        format!("mem://{path}?sig=test"),
        expires_at: chrono::Utc::now() + chrono::Duration::from_std(ttl).unwrap(),
      })
    }
  }

  struct App {
    portal:  Portal<SqliteStore>,
    catalog: Catalog<SqliteStore, MemoryBlobs>,
  }

  impl App {
    async fn new() -> Self {
      let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
      let portal = Portal::new(store.clone());
      let catalog = Catalog::new(store, Arc::new(MemoryBlobs::default()));
      Self { portal, catalog }
    }

    async fn call(
      &self,
      caller: Caller,
      method: &str,
      uri: &str,
      body: Option<Value>,
    ) -> (StatusCode, Value) {
      let body = match body {
        Some(v) => Body::from(v.to_string()),
        None => Body::empty(),
      };
      let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
      self.send(caller, req).await
    }

    async fn send(&self, caller: Caller, req: Request<Body>) -> (StatusCode, Value) {
      let resp = api_router(self.portal.clone(), self.catalog.clone())
        .layer(Extension(caller))
        .oneshot(req)
        .await
        .unwrap();
      let status = resp.status();
      let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
      let value = if bytes.is_empty() {
        Value::Null
      } else {
        serde_json::from_slice(&bytes).unwrap()
      };
      (status, value)
    }
  }

  fn id_of(v: &Value) -> String { v["question_id"].as_str().unwrap().to_owned() }

  // ── Questions ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn anonymous_caller_is_unauthorized() {
    let app = App::new().await;
    let (status, body) = app.call(Caller::Anonymous, "GET", "/questions", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "permission");
  }

  #[tokio::test]
  async fn submission_is_private_until_published() {
    let app = App::new().await;
    let author = Caller::student(Uuid::new_v4());
    let other = Caller::student(Uuid::new_v4());
    let admin = Caller::admin(Uuid::new_v4());

    let (status, created) = app
      .call(
        author,
        "POST",
        "/questions",
        Some(json!({ "theme": "stage", "full_text": "Is the internship graded?" })),
      )
      .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "pending");
    assert_eq!(created["visible"], false);
    assert_eq!(created["mine"], true);
    assert!(created.get("author_id").is_none());
    let id = id_of(&created);

    let (status, _) = app.call(other, "GET", &format!("/questions/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
      .call(admin, "POST", &format!("/admin/questions/{id}/publish"), None)
      .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, answered) = app
      .call(
        admin,
        "POST",
        &format!("/admin/questions/{id}/answer"),
        Some(json!({ "official_answer": "Yes, 3 ECTS." })),
      )
      .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(answered["status"], "answered");

    app
      .call(admin, "POST", &format!("/admin/questions/{id}/publish"), None)
      .await;

    let (status, feed) = app.call(other, "GET", "/questions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed["items"].as_array().unwrap().len(), 1);
    assert_eq!(feed["items"][0]["mine"], false);
    assert_eq!(feed["has_more"], false);

    let (status, body) = app
      .call(
        author,
        "PUT",
        &format!("/questions/{id}"),
        Some(json!({ "theme": "stage", "full_text": "too late" })),
      )
      .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "permission");
  }

  #[tokio::test]
  async fn validation_errors_name_the_field() {
    let app = App::new().await;
    let (status, body) = app
      .call(
        Caller::student(Uuid::new_v4()),
        "POST",
        "/questions",
        Some(json!({ "theme": "sports", "full_text": "?" })),
      )
      .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["field"], "theme");
  }

  #[tokio::test]
  async fn reactions_toggle_over_http() {
    let app = App::new().await;
    let admin = Caller::admin(Uuid::new_v4());
    let student = Caller::student(Uuid::new_v4());

    let (_, created) = app
      .call(
        admin,
        "POST",
        "/admin/questions",
        Some(json!({
          "theme": "faculty",
          "full_text": "Where is the library?",
          "official_answer": "Building B."
        })),
      )
      .await;
    let uri = format!("/questions/{}/reactions", id_of(&created));

    let (_, tally) = app
      .call(student, "POST", &uri, Some(json!({ "kind": "like" })))
      .await;
    assert_eq!(tally["like_count"], 1);
    assert_eq!(tally["caller_reaction"], "like");

    let (_, tally) = app
      .call(student, "POST", &uri, Some(json!({ "kind": "like" })))
      .await;
    assert_eq!(tally["like_count"], 0);
    assert_eq!(tally["caller_reaction"], Value::Null);
  }

  // ── Documents ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn only_admins_upload_documents() {
    let app = App::new().await;
    let upload = || {
      Request::builder()
        .method("POST")
        .uri("/documents?name=Algebra&level=L1&file_name=algebra.pdf")
        .header("content-type", "application/pdf")
        .body(Body::from("%PDF-1.4"))
        .unwrap()
    };

    let (status, _) = app.send(Caller::student(Uuid::new_v4()), upload()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, doc) = app.send(Caller::admin(Uuid::new_v4()), upload()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(doc["level"], "L1");
    assert_eq!(doc["size_bytes"], 8);

    let student = Caller::student(Uuid::new_v4());
    let (status, list) = app.call(student, "GET", "/documents?level=L1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let id = doc["document_id"].as_str().unwrap();
    let (status, link) = app
      .call(student, "GET", &format!("/documents/{id}/link"), None)
      .await;
    assert_eq!(status, StatusCode::OK);
    assert!(link["url"].as_str().unwrap().contains("sig="));
  }
}
