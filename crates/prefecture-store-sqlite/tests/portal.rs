//! The portal engine driven end to end over an in-memory SQLite store.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
  time::Duration,
};

use bytes::Bytes;
use prefecture_core::{
  Catalog, Denial, Error, Portal,
  blob::{BlobStore, SignedLink},
  document::{DocumentDraft, Level},
  lifecycle::Filter,
  notify::{Notifier, Submission},
  profile::{Caller, Role},
  portal::MAX_PAGE_SIZE,
  question::{AdminDraft, Question, QuestionDraft, QuestionStatus, Theme, derive_title},
  reaction::ReactionKind,
  session::Registration,
  store::PortalStore,
};
use prefecture_store_sqlite::SqliteStore;
use uuid::Uuid;

#[derive(Default)]
struct Recorder(Mutex<Vec<Submission>>);

impl Notifier for Recorder {
  fn question_submitted(&self, submission: Submission) {
    self.0.lock().unwrap().push(submission);
  }
}

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
      url:        format!("mem://{path}?ttl={}", ttl.as_secs()),
      expires_at: chrono::Utc::now() + chrono::Duration::from_std(ttl).unwrap(),
    })
  }
}

struct Fixture {
  portal:   Portal<SqliteStore>,
  notices:  Arc<Recorder>,
  store:    Arc<SqliteStore>,
  student:  Caller,
  other:    Caller,
  admin:    Caller,
}

async fn fixture(page_size: usize) -> Fixture {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let notices = Arc::new(Recorder::default());
  let portal = Portal::new(Arc::clone(&store))
    .with_notifier(notices.clone())
    .with_page_size(page_size);
  Fixture {
    portal,
    notices,
    store,
    student: Caller::student(Uuid::new_v4()),
    other: Caller::student(Uuid::new_v4()),
    admin: Caller::admin(Uuid::new_v4()),
  }
}

fn draft(text: &str) -> QuestionDraft { QuestionDraft::new("examen", text) }

fn no_filter() -> Filter { Filter::default() }

// ─── Lifecycle ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn submission_starts_pending_hidden_and_notifies() {
  let f = fixture(10).await;
  let view = f.portal.create(&f.admin, &draft("  When is the exam?  ")).await.unwrap();

  assert_eq!(view.status, QuestionStatus::Pending);
  assert!(!view.visible);
  assert!(view.mine);
  assert_eq!(view.full_text, "When is the exam?");
  assert_eq!(view.theme, Theme::Examination);

  let notices = f.notices.0.lock().unwrap();
  assert_eq!(notices.len(), 1);
  assert_eq!(notices[0].question_id, view.question_id);
}

#[tokio::test]
async fn anonymous_callers_are_refused() {
  let f = fixture(10).await;
  let err = f.portal.create(&Caller::Anonymous, &draft("x")).await.unwrap_err();
  assert!(matches!(err, Error::Permission(Denial::NotAuthenticated)));
  assert!(f.notices.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn authors_edit_and_withdraw_only_while_pending() {
  let f = fixture(10).await;
  let q = f.portal.create(&f.student, &draft("first wording")).await.unwrap();

  let err = f
    .portal
    .edit(&f.other, q.question_id, &draft("hijack"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Permission(Denial::NotAuthor)));
  let err = f.portal.delete(&f.other, q.question_id).await.unwrap_err();
  assert!(matches!(err, Error::Permission(Denial::NotAuthor)));
  let unchanged = f.portal.question(&f.student, q.question_id).await.unwrap();
  assert_eq!(unchanged.full_text, "first wording");

  let edited = f
    .portal
    .edit(&f.student, q.question_id, &QuestionDraft::new("stage", "second wording"))
    .await
    .unwrap();
  assert_eq!(edited.title, "second wording");
  assert_eq!(edited.theme, Theme::Internship);

  f.portal.answer(&f.admin, q.question_id, "Done.").await.unwrap();

  let err = f
    .portal
    .edit(&f.student, q.question_id, &draft("third"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Permission(Denial::AlreadyAnswered)));
  let err = f.portal.delete(&f.student, q.question_id).await.unwrap_err();
  assert!(matches!(err, Error::Permission(Denial::AlreadyAnswered)));

  f.portal.admin_delete(&f.admin, q.question_id).await.unwrap();
  let err = f.portal.delete(&f.student, Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, Error::NotFound { .. }));
}

#[tokio::test]
async fn author_withdraws_pending_question() {
  let f = fixture(10).await;
  let q = f.portal.create(&f.student, &draft("oops")).await.unwrap();
  f.portal.delete(&f.student, q.question_id).await.unwrap();
  let err = f.portal.question(&f.student, q.question_id).await.unwrap_err();
  assert!(matches!(err, Error::NotFound { .. }));
}

#[tokio::test]
async fn answering_is_validated_and_idempotent() {
  let f = fixture(10).await;
  let q = f.portal.create(&f.student, &draft("Is attendance mandatory?")).await.unwrap();

  let err = f.portal.answer(&f.student, q.question_id, "yes").await.unwrap_err();
  assert!(matches!(err, Error::Permission(Denial::NotAdmin)));

  let err = f.portal.answer(&f.admin, q.question_id, "   ").await.unwrap_err();
  assert!(matches!(err, Error::Validation { field: "official_answer", .. }));

  let first = f.portal.answer(&f.admin, q.question_id, " Yes. ").await.unwrap();
  assert_eq!(first.status, QuestionStatus::Answered);
  assert_eq!(first.official_answer.as_deref(), Some("Yes."));
  assert!(!first.visible);

  let second = f.portal.answer(&f.admin, q.question_id, "No.").await.unwrap();
  assert_eq!(second.official_answer.as_deref(), Some("Yes."));

  let err = f.portal.answer(&f.admin, Uuid::new_v4(), "x").await.unwrap_err();
  assert!(matches!(err, Error::NotFound { .. }));
}

#[tokio::test]
async fn publishing_requires_an_answer() {
  let f = fixture(10).await;
  let q = f.portal.create(&f.student, &draft("Where is room 101?")).await.unwrap();

  let err = f.portal.publish(&f.admin, q.question_id).await.unwrap_err();
  assert!(matches!(err, Error::Permission(Denial::NotYetAnswered)));

  f.portal.answer(&f.admin, q.question_id, "Ground floor.").await.unwrap();
  let published = f.portal.publish(&f.admin, q.question_id).await.unwrap();
  assert!(published.visible);

  let seen = f.portal.question(&f.other, q.question_id).await.unwrap();
  assert!(!seen.mine);

  let hidden = f.portal.unpublish(&f.admin, q.question_id).await.unwrap();
  assert!(!hidden.visible);
  assert_eq!(hidden.status, QuestionStatus::Answered);

  let err = f.portal.question(&f.other, q.question_id).await.unwrap_err();
  assert!(matches!(err, Error::NotFound { .. }));
  assert!(f.portal.question(&f.student, q.question_id).await.unwrap().mine);

  let err = f.portal.publish(&f.admin, Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, Error::NotFound { .. }));
}

#[tokio::test]
async fn admin_entries_bypass_the_queue() {
  let f = fixture(10).await;
  let faq = f
    .portal
    .admin_create(&f.admin, &AdminDraft {
      theme:           "faculty".into(),
      full_text:       "Opening hours?".into(),
      official_answer: Some("8am to 6pm.".into()),
      status:          QuestionStatus::Answered,
      visible:         true,
    })
    .await
    .unwrap();
  assert!(f.notices.0.lock().unwrap().is_empty());

  let feed = f.portal.public_feed(&f.student, 0, &no_filter()).await.unwrap();
  assert_eq!(feed.items.len(), 1);
  assert_eq!(feed.items[0].question_id, faq.question_id);

  f.portal.admin_delete(&f.admin, faq.question_id).await.unwrap();
  let err = f.portal.admin_delete(&f.admin, faq.question_id).await.unwrap_err();
  assert!(matches!(err, Error::NotFound { .. }));
}

// ─── Listings ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn feed_pages_newest_first() {
  let f = fixture(2).await;
  let mut ids = Vec::new();
  for text in ["one", "two", "three"] {
    let q = f.portal.create(&f.student, &draft(text)).await.unwrap();
    f.portal.answer(&f.admin, q.question_id, "ok").await.unwrap();
    f.portal.publish(&f.admin, q.question_id).await.unwrap();
    ids.push(q.question_id);
    tokio::time::sleep(Duration::from_millis(5)).await;
  }

  let first = f.portal.public_feed(&f.other, 0, &no_filter()).await.unwrap();
  assert_eq!(first.items.len(), 2);
  assert!(first.has_more);
  assert_eq!(first.items[0].question_id, ids[2]);
  assert_eq!(first.items[1].question_id, ids[1]);

  let second = f.portal.public_feed(&f.other, 1, &no_filter()).await.unwrap();
  assert_eq!(second.items.len(), 1);
  assert!(!second.has_more);
  assert_eq!(second.items[0].question_id, ids[0]);

  let beyond = f.portal.public_feed(&f.other, 7, &no_filter()).await.unwrap();
  assert!(beyond.items.is_empty());
}

#[tokio::test]
async fn same_instant_rows_page_stably_by_id() {
  let f = fixture(10).await;
  let created_at = chrono::Utc::now();
  for i in 0..13 {
    let text = format!("batch question {i}");
    f.store
      .insert_question(Question {
        question_id: Uuid::new_v4(),
        title: derive_title(&text),
        full_text: text,
        theme: Theme::Faculty,
        official_answer: Some("Yes.".into()),
        status: QuestionStatus::Answered,
        visible: true,
        author_id: Uuid::new_v4(),
        created_at,
      })
      .await
      .unwrap();
  }

  let mut passes = Vec::new();
  for _ in 0..2 {
    let first = f.portal.public_feed(&f.student, 0, &no_filter()).await.unwrap();
    let second = f.portal.public_feed(&f.student, 1, &no_filter()).await.unwrap();
    assert_eq!((first.items.len(), first.has_more), (10, true));
    assert_eq!((second.items.len(), second.has_more), (3, false));
    let ids: Vec<Uuid> = first
      .items
      .iter()
      .chain(&second.items)
      .map(|q| q.question_id)
      .collect();
    passes.push(ids);
  }

  assert_eq!(passes[0], passes[1]);
  let mut expected = passes[0].clone();
  expected.sort_unstable_by(|a, b| b.cmp(a));
  expected.dedup();
  assert_eq!(passes[0], expected);
}

#[tokio::test]
async fn page_size_is_clamped() {
  let f = fixture(usize::MAX).await;
  f.portal
    .admin_create(&f.admin, &AdminDraft {
      theme:           "faculty".into(),
      full_text:       "Where is the cafeteria?".into(),
      official_answer: Some("Building C.".into()),
      status:          QuestionStatus::Answered,
      visible:         true,
    })
    .await
    .unwrap();

  let page = f.portal.public_feed(&f.student, 3, &no_filter()).await.unwrap();
  assert_eq!(page.page_size, MAX_PAGE_SIZE);
  assert!(page.items.is_empty());
  let page = f.portal.public_feed(&f.student, 0, &no_filter()).await.unwrap();
  assert_eq!(page.items.len(), 1);

  let f = fixture(0).await;
  let page = f.portal.public_feed(&f.student, 0, &no_filter()).await.unwrap();
  assert_eq!(page.page_size, 1);
}

#[tokio::test]
async fn own_questions_and_moderation_queue() {
  let f = fixture(10).await;
  let mine = f.portal.create(&f.student, &draft("Grading scale?")).await.unwrap();
  f.portal.create(&f.other, &QuestionDraft::new("stage", "Internship length?")).await.unwrap();

  let page = f.portal.my_questions(&f.student, 0, &no_filter()).await.unwrap();
  assert_eq!(page.items.len(), 1);
  assert_eq!(page.items[0].question_id, mine.question_id);

  let err = f
    .portal
    .moderation_queue(&f.student, None, 0, &no_filter())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Permission(Denial::NotAdmin)));

  let filter = Filter::parse(Some("stage"), None).unwrap();
  let queue = f
    .portal
    .moderation_queue(&f.admin, Some(QuestionStatus::Pending), 0, &filter)
    .await
    .unwrap();
  assert_eq!(queue.items.len(), 1);
  assert_eq!(queue.items[0].full_text, "Internship length?");

  let filter = Filter::parse(None, Some("GRADING")).unwrap();
  let queue = f.portal.moderation_queue(&f.admin, None, 0, &filter).await.unwrap();
  assert_eq!(queue.items.len(), 1);
}

// ─── Reactions ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn reactions_toggle_and_count_exactly() {
  let f = fixture(10).await;
  let q = f.portal.create(&f.student, &draft("Exam dates?")).await.unwrap();
  let id = q.question_id;

  // Hidden from other students until published.
  let err = f.portal.react(&f.other, id, ReactionKind::Like).await.unwrap_err();
  assert!(matches!(err, Error::NotFound { .. }));

  f.portal.answer(&f.admin, id, "June.").await.unwrap();
  f.portal.publish(&f.admin, id).await.unwrap();

  let t = f.portal.react(&f.other, id, ReactionKind::Like).await.unwrap();
  assert_eq!((t.like_count, t.dislike_count), (1, 0));
  assert_eq!(t.caller_reaction, Some(ReactionKind::Like));

  let t = f.portal.react(&f.student, id, ReactionKind::Dislike).await.unwrap();
  assert_eq!((t.like_count, t.dislike_count), (1, 1));

  let t = f.portal.react(&f.other, id, ReactionKind::Dislike).await.unwrap();
  assert_eq!((t.like_count, t.dislike_count), (0, 2));
  assert_eq!(t.caller_reaction, Some(ReactionKind::Dislike));

  let t = f.portal.react(&f.other, id, ReactionKind::Dislike).await.unwrap();
  assert_eq!((t.like_count, t.dislike_count), (0, 1));
  assert_eq!(t.caller_reaction, None);

  let t = f.portal.tally(&f.admin, id).await.unwrap();
  assert_eq!((t.like_count, t.dislike_count), (0, 1));
  assert_eq!(t.caller_reaction, None);
}

// ─── Accounts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn registration_sign_in_and_role_changes() {
  let f = fixture(10).await;
  let registration = |email: &str| Registration {
    email:         email.into(),
    password_hash: "$argon2id$stub".into(),
    names:         Default::default(),
  };

  let profile = f.portal.register(registration(" Eve@Uni.EDU ")).await.unwrap();
  assert_eq!(profile.email, "eve@uni.edu");
  assert_eq!(profile.role, Role::Student);

  let err = f.portal.register(registration("eve@uni.edu")).await.unwrap_err();
  assert!(matches!(err, Error::Validation { field: "email", .. }));

  let account = f.store.find_account("eve@uni.edu").await.unwrap().unwrap();
  let caller = f.portal.sign_in(&account).await.unwrap();
  assert_eq!(caller.user_id(), Some(profile.user_id));
  assert!(caller.require_admin().is_err());

  let promoted = f.portal.assign_role("EVE@uni.edu", Role::Admin).await.unwrap();
  assert_eq!(promoted.role, Role::Admin);
  let caller = f.portal.sign_in(&account).await.unwrap();
  assert!(caller.require_admin().is_ok());

  let err = f.portal.assign_role("nobody@uni.edu", Role::Admin).await.unwrap_err();
  assert!(matches!(err, Error::Validation { field: "email", .. }));
}

// ─── Documents ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn catalog_upload_link_and_delete() {
  let f = fixture(10).await;
  let blobs = Arc::new(MemoryBlobs::default());
  let catalog = Catalog::new(Arc::clone(&f.store), Arc::clone(&blobs))
    .with_link_ttl(Duration::from_secs(120));
  let meta = DocumentDraft {
    name:      "Syllabus".into(),
    level:     "Master1".into(),
    file_name: "syllabus.PDF".into(),
  };

  let err = catalog
    .upload(&f.student, &meta, Bytes::from_static(b"x"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Permission(Denial::NotAdmin)));

  let err = catalog.upload(&f.admin, &meta, Bytes::new()).await.unwrap_err();
  assert!(matches!(err, Error::Validation { field: "file", .. }));

  let doc = catalog
    .upload(&f.admin, &meta, Bytes::from_static(b"hello"))
    .await
    .unwrap();
  assert_eq!(doc.level, Level::Master1);
  assert_eq!(doc.size_bytes, 5);
  assert!(doc.storage_path.ends_with(".pdf"));
  assert_eq!(
    doc.content_hash,
    "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
  );
  assert!(blobs.0.lock().unwrap().contains_key(&doc.storage_path));

  assert_eq!(catalog.list(&f.student, Some(Level::Master1)).await.unwrap().len(), 1);
  assert!(catalog.list(&f.student, Some(Level::L1)).await.unwrap().is_empty());

  let link = catalog.link(&f.student, doc.document_id).await.unwrap();
  assert!(link.url.ends_with("?ttl=120"));

  catalog.delete(&f.admin, doc.document_id).await.unwrap();
  assert!(blobs.0.lock().unwrap().is_empty());
  let err = catalog.link(&f.student, doc.document_id).await.unwrap_err();
  assert!(matches!(err, Error::NotFound { .. }));
}
