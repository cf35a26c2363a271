//! The reaction aggregator: one like or dislike per user per question.

use tracing::debug;
use uuid::Uuid;

use crate::{
  Error, Result,
  portal::Portal,
  profile::Caller,
  reaction::{ReactionKind, Tally},
  store::PortalStore,
};

impl<S: PortalStore> Portal<S> {
  /// Submit a reaction and return the fresh tally.
  ///
  /// With no prior reaction the kind is recorded; the same kind again
  /// withdraws it; the other kind replaces it in one atomic write.
  pub async fn react(
    &self,
    caller: &Caller,
    question_id: Uuid,
    kind: ReactionKind,
  ) -> Result<Tally> {
    let member = caller.require_member()?;
    self.visible_question(caller, question_id).await?;

    let held = self
      .store
      .toggle_reaction(question_id, member.user_id, kind)
      .await
      .map_err(Error::transient)?;
    debug!(%question_id, submitted = %kind, held = ?held, "reaction toggled");

    self
      .store
      .tally(question_id, Some(member.user_id))
      .await
      .map_err(Error::transient)
  }

  /// Current counts for a question the caller can see.
  pub async fn tally(&self, caller: &Caller, question_id: Uuid) -> Result<Tally> {
    let member = caller.require_member()?;
    self.visible_question(caller, question_id).await?;

    self
      .store
      .tally(question_id, Some(member.user_id))
      .await
      .map_err(Error::transient)
  }
}
