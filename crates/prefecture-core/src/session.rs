//! Turning verified credentials into a [`Caller`], and profile upkeep.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  error::Resource,
  portal::Portal,
  profile::{
    Account, Caller, Member, NewProfile, Profile, ProfileNames, Role, normalize_email,
  },
  store::PortalStore,
};

/// A sign-up request whose password has already been hashed by the caller.
#[derive(Debug, Clone)]
pub struct Registration {
  pub email:         String,
  pub password_hash: String,
  pub names:         ProfileNames,
}

impl<S: PortalStore> Portal<S> {
  /// Build the request context for an account whose credentials were just
  /// verified. A missing profile is created on the spot as a student.
  pub async fn sign_in(&self, account: &Account) -> Result<Caller> {
    let profile = self
      .store
      .ensure_profile(NewProfile {
        user_id:    account.user_id,
        email:      account.email.clone(),
        first_name: None,
        last_name:  None,
      })
      .await
      .map_err(Error::transient)?;

    Ok(Caller::Member(Member { user_id: profile.user_id, role: profile.role }))
  }

  /// Create credentials and the matching student profile.
  pub async fn register(&self, registration: Registration) -> Result<Profile> {
    let email = normalize_email(&registration.email)?;
    let account = Account {
      user_id:       Uuid::new_v4(),
      email:         email.clone(),
      password_hash: registration.password_hash,
      created_at:    Utc::now(),
    };
    let user_id = account.user_id;

    let created = self
      .store
      .create_account(account)
      .await
      .map_err(Error::transient)?;
    if !created {
      return Err(Error::invalid("email", "an account already exists for this email"));
    }

    let names = registration.names.normalized();
    let profile = self
      .store
      .ensure_profile(NewProfile {
        user_id,
        email,
        first_name: names.first_name,
        last_name: names.last_name,
      })
      .await
      .map_err(Error::transient)?;
    info!(%user_id, "account registered");
    Ok(profile)
  }

  /// The caller's own profile.
  pub async fn profile(&self, caller: &Caller) -> Result<Profile> {
    let member = caller.require_member()?;
    self
      .store
      .get_profile(member.user_id)
      .await
      .map_err(Error::transient)?
      .ok_or(Error::NotFound { kind: Resource::Profile, id: member.user_id })
  }

  /// Change the caller's display names.
  pub async fn update_names(&self, caller: &Caller, names: ProfileNames) -> Result<Profile> {
    let member = caller.require_member()?;
    self
      .store
      .update_profile_names(member.user_id, names.normalized())
      .await
      .map_err(Error::transient)?
      .ok_or(Error::NotFound { kind: Resource::Profile, id: member.user_id })
  }

  /// Every profile; admin only.
  pub async fn profiles(&self, caller: &Caller) -> Result<Vec<Profile>> {
    caller.require_admin()?;
    self.store.list_profiles().await.map_err(Error::transient)
  }

  /// Out-of-band role change for the account registered under `email`.
  /// Not reachable from any request path.
  pub async fn assign_role(&self, email: &str, role: Role) -> Result<Profile> {
    let email = normalize_email(email)?;
    let account = self
      .store
      .find_account(&email)
      .await
      .map_err(Error::transient)?
      .ok_or_else(|| Error::invalid("email", "no account is registered with this email"))?;

    self.sign_in(&account).await?;
    if !self
      .store
      .set_role(account.user_id, role)
      .await
      .map_err(Error::transient)?
    {
      return Err(Error::NotFound { kind: Resource::Profile, id: account.user_id });
    }
    warn!(user_id = %account.user_id, %role, "role changed out of band");

    self
      .store
      .get_profile(account.user_id)
      .await
      .map_err(Error::transient)?
      .ok_or(Error::NotFound { kind: Resource::Profile, id: account.user_id })
  }
}
