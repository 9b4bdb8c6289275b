//! User accounts.
//!
//! Password and session-token issuance live upstream; the core stores the
//! token only to resolve it back to a principal on each request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::principal::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:        Uuid,
  pub username:       String,
  pub first_name:     Option<String>,
  pub last_name:      Option<String>,
  pub email:          Option<String>,
  pub phone:          Option<String>,
  pub role:           Role,
  /// Home structure code; `None` for global admins.
  pub structure_code: Option<String>,
  /// New accounts start inactive and must be explicitly activated.
  pub is_active:      bool,
  pub is_super_admin: bool,
  /// Opaque bearer token for the user's single active session.
  pub session_token:  Option<String>,
  pub created_at:     DateTime<Utc>,
  pub created_by:     Option<Uuid>,
  pub last_seen_at:   Option<DateTime<Utc>>,
}

impl User {
  pub fn full_name(&self) -> String {
    match (&self.first_name, &self.last_name) {
      (Some(f), Some(l)) => format!("{f} {l}"),
      (Some(f), None) => f.clone(),
      (None, Some(l)) => l.clone(),
      (None, None) => self.username.clone(),
    }
  }
}

/// Input to [`crate::store::SituationStore::create_user`].
/// `user_id` and `created_at` are assigned by the store; accounts are
/// created inactive.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username:       String,
  pub first_name:     Option<String>,
  pub last_name:      Option<String>,
  pub email:          Option<String>,
  pub phone:          Option<String>,
  pub role:           Role,
  pub structure_code: Option<String>,
  pub is_super_admin: bool,
  pub created_by:     Option<Uuid>,
}

impl NewUser {
  pub fn new(username: impl Into<String>, role: Role) -> Self {
    Self {
      username:       username.into(),
      first_name:     None,
      last_name:      None,
      email:          None,
      phone:          None,
      role,
      structure_code: None,
      is_super_admin: false,
      created_by:     None,
    }
  }

  pub fn at_structure(mut self, code: impl Into<String>) -> Self {
    self.structure_code = Some(code.into());
    self
  }
}
