//! [`Portal`]: the entry point for every question, reaction and profile
//! operation.
//!
//! Each operation takes the [`Caller`](crate::profile::Caller) explicitly;
//! the portal holds no session state of its own.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
  Error, Result,
  error::Resource,
  notify::{NoopNotifier, Notifier},
  profile::Caller,
  question::Question,
  store::PortalStore,
};

/// Listings are cut into pages of this many rows unless configured.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Upper bound accepted by [`Portal::with_page_size`].
pub const MAX_PAGE_SIZE: usize = 1000;

/// The question lifecycle engine and reaction aggregator over a store.
///
/// Cloning is cheap; the store and notifier are reference-counted.
pub struct Portal<S> {
  pub(crate) store:     Arc<S>,
  pub(crate) notifier:  Arc<dyn Notifier>,
  pub(crate) page_size: usize,
}

impl<S> Clone for Portal<S> {
  fn clone(&self) -> Self {
    Self {
      store:     Arc::clone(&self.store),
      notifier:  Arc::clone(&self.notifier),
      page_size: self.page_size,
    }
  }
}

impl<S: PortalStore> Portal<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self {
      store,
      notifier: Arc::new(NoopNotifier),
      page_size: DEFAULT_PAGE_SIZE,
    }
  }

  pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
    self.notifier = notifier;
    self
  }

  pub fn with_page_size(mut self, page_size: usize) -> Self {
    self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    self
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  /// Fetch a question the caller is allowed to see. Hidden and missing
  /// questions are indistinguishable.
  pub(crate) async fn visible_question(
    &self,
    caller: &Caller,
    question_id: Uuid,
  ) -> Result<Question> {
    self
      .store
      .get_question(question_id)
      .await
      .map_err(Error::transient)?
      .filter(|q| q.is_visible_to(caller))
      .ok_or_else(|| not_found(question_id))
  }
}

pub(crate) fn not_found(question_id: Uuid) -> Error {
  Error::NotFound { kind: Resource::Question, id: question_id }
}
