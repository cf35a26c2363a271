//! Like/dislike reactions on questions.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The two reactions a user may hold on a question.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReactionKind {
  Like,
  Dislike,
}

/// Exact reaction counts for one question, decorated with the caller's own
/// reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tally {
  pub like_count:      u64,
  pub dislike_count:   u64,
  pub caller_reaction: Option<ReactionKind>,
}

/// The reaction a user ends up holding after submitting `submitted` while
/// holding `current`. Re-submitting the same kind withdraws it.
pub fn toggled(
  current: Option<ReactionKind>,
  submitted: ReactionKind,
) -> Option<ReactionKind> {
  match current {
    Some(kind) if kind == submitted => None,
    _ => Some(submitted),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn toggle_rules() {
    use ReactionKind::*;
    assert_eq!(toggled(None, Like), Some(Like));
    assert_eq!(toggled(Some(Like), Like), None);
    assert_eq!(toggled(Some(Like), Dislike), Some(Dislike));
    assert_eq!(toggled(Some(Dislike), Like), Some(Like));
  }
}
