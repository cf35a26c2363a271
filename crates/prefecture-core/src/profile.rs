//! Profiles, credentials, and the per-request caller context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{Denial, Error, Result};

/// What a signed-in user is allowed to do.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Role {
  #[default]
  #[serde(alias = "etudiant")]
  #[strum(to_string = "student", serialize = "etudiant")]
  Student,
  #[strum(to_string = "admin")]
  Admin,
}

/// A user's profile. Created on first authentication; the role is only ever
/// raised out of band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
  pub user_id:    Uuid,
  pub email:      String,
  pub role:       Role,
  pub first_name: Option<String>,
  pub last_name:  Option<String>,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::PortalStore::ensure_profile`]. The role is not
/// accepted from callers; new profiles are always students.
#[derive(Debug, Clone)]
pub struct NewProfile {
  pub user_id:    Uuid,
  pub email:      String,
  pub first_name: Option<String>,
  pub last_name:  Option<String>,
}

/// Optional display-name fields a user may edit on their own profile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileNames {
  pub first_name: Option<String>,
  pub last_name:  Option<String>,
}

impl ProfileNames {
  /// Trim both names, turning blanks into `None`.
  pub fn normalized(self) -> Self {
    fn clean(s: Option<String>) -> Option<String> {
      s.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
    }
    Self { first_name: clean(self.first_name), last_name: clean(self.last_name) }
  }
}

// ─── Credentials ─────────────────────────────────────────────────────────────

/// Sign-in credentials for one user. The hash is an argon2 PHC string.
#[derive(Debug, Clone)]
pub struct Account {
  pub user_id:       Uuid,
  pub email:         String,
  pub password_hash: String,
  pub created_at:    DateTime<Utc>,
}

/// Lower-case and trim an email address, rejecting obviously malformed ones.
pub fn normalize_email(raw: &str) -> Result<String> {
  let email = raw.trim().to_lowercase();
  match email.split_once('@') {
    Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
    _ => Err(Error::invalid("email", "not a valid email address")),
  }
}

// ─── Caller ──────────────────────────────────────────────────────────────────

/// An authenticated user as seen by a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Member {
  pub user_id: Uuid,
  pub role:    Role,
}

impl Member {
  pub fn is_admin(&self) -> bool { self.role == Role::Admin }
}

/// Who is issuing an operation. Built once per request by the transport
/// layer and passed explicitly into every engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Caller {
  #[default]
  Anonymous,
  Member(Member),
}

impl Caller {
  pub fn student(user_id: Uuid) -> Self {
    Self::Member(Member { user_id, role: Role::Student })
  }

  pub fn admin(user_id: Uuid) -> Self {
    Self::Member(Member { user_id, role: Role::Admin })
  }

  pub fn user_id(&self) -> Option<Uuid> {
    match self {
      Self::Anonymous => None,
      Self::Member(m) => Some(m.user_id),
    }
  }

  /// The signed-in member, or [`Denial::NotAuthenticated`].
  pub fn require_member(&self) -> Result<Member> {
    match self {
      Self::Anonymous => Err(Error::Permission(Denial::NotAuthenticated)),
      Self::Member(m) => Ok(*m),
    }
  }

  /// The signed-in admin, or the appropriate denial.
  pub fn require_admin(&self) -> Result<Member> {
    let member = self.require_member()?;
    if member.is_admin() {
      Ok(member)
    } else {
      Err(Error::Permission(Denial::NotAdmin))
    }
  }
}
