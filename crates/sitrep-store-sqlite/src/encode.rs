//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. UUIDs are stored as
//! hyphenated lowercase strings. Statuses and roles are stored as their
//! historical integer codes, report kinds as snake_case strings.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sitrep_core::{
  period::Period,
  principal::Role,
  situation::{RejectionEvent, ReportKind, Situation, Status},
  user::User,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_opt_dt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

pub fn decode_status(code: i64) -> Result<Status> {
  Status::from_code(code)
    .ok_or_else(|| Error::Decode(format!("unknown status code: {code}")))
}

pub fn decode_role(code: i64) -> Result<Role> {
  Role::from_code(code)
    .ok_or_else(|| Error::Decode(format!("unknown role code: {code}")))
}

pub fn encode_kind(kind: ReportKind) -> String { kind.to_string() }

pub fn decode_kind(s: &str) -> Result<ReportKind> {
  ReportKind::from_str(s)
    .map_err(|_| Error::Decode(format!("unknown report kind: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `situations` row.
pub struct RawSituation {
  pub situation_id:       String,
  pub structure_code:     String,
  pub month:              String,
  pub year:               String,
  pub kind:               String,
  pub status:             i64,
  pub owner_user_id:      String,
  pub created_at:         String,
  pub edited_at:          Option<String>,
  pub confirmed_at:       Option<String>,
  pub dri_validated_at:   Option<String>,
  pub admin_validated_at: Option<String>,
}

impl RawSituation {
  /// Column list matching the field order above; keep the two in sync.
  pub const COLUMNS: &'static str = "situation_id, structure_code, month, \
     year, kind, status, owner_user_id, created_at, edited_at, confirmed_at, \
     dri_validated_at, admin_validated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      situation_id:       row.get(0)?,
      structure_code:     row.get(1)?,
      month:              row.get(2)?,
      year:               row.get(3)?,
      kind:               row.get(4)?,
      status:             row.get(5)?,
      owner_user_id:      row.get(6)?,
      created_at:         row.get(7)?,
      edited_at:          row.get(8)?,
      confirmed_at:       row.get(9)?,
      dri_validated_at:   row.get(10)?,
      admin_validated_at: row.get(11)?,
    })
  }

  pub fn into_situation(self) -> Result<Situation> {
    Ok(Situation {
      situation_id:       decode_uuid(&self.situation_id)?,
      structure_code:     self.structure_code,
      period:             Period::new(self.month, self.year),
      kind:               decode_kind(&self.kind)?,
      status:             decode_status(self.status)?,
      owner_user_id:      decode_uuid(&self.owner_user_id)?,
      created_at:         decode_dt(&self.created_at)?,
      edited_at:          decode_opt_dt(self.edited_at.as_deref())?,
      confirmed_at:       decode_opt_dt(self.confirmed_at.as_deref())?,
      dri_validated_at:   decode_opt_dt(self.dri_validated_at.as_deref())?,
      admin_validated_at: decode_opt_dt(self.admin_validated_at.as_deref())?,
    })
  }
}

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:        String,
  pub username:       String,
  pub first_name:     Option<String>,
  pub last_name:      Option<String>,
  pub email:          Option<String>,
  pub phone:          Option<String>,
  pub role:           i64,
  pub structure_code: Option<String>,
  pub is_active:      bool,
  pub is_super_admin: bool,
  pub session_token:  Option<String>,
  pub created_at:     String,
  pub created_by:     Option<String>,
  pub last_seen_at:   Option<String>,
}

impl RawUser {
  pub const COLUMNS: &'static str = "user_id, username, first_name, \
     last_name, email, phone, role, structure_code, is_active, \
     is_super_admin, session_token, created_at, created_by, last_seen_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:        row.get(0)?,
      username:       row.get(1)?,
      first_name:     row.get(2)?,
      last_name:      row.get(3)?,
      email:          row.get(4)?,
      phone:          row.get(5)?,
      role:           row.get(6)?,
      structure_code: row.get(7)?,
      is_active:      row.get(8)?,
      is_super_admin: row.get(9)?,
      session_token:  row.get(10)?,
      created_at:     row.get(11)?,
      created_by:     row.get(12)?,
      last_seen_at:   row.get(13)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:        decode_uuid(&self.user_id)?,
      username:       self.username,
      first_name:     self.first_name,
      last_name:      self.last_name,
      email:          self.email,
      phone:          self.phone,
      role:           decode_role(self.role)?,
      structure_code: self.structure_code,
      is_active:      self.is_active,
      is_super_admin: self.is_super_admin,
      session_token:  self.session_token,
      created_at:     decode_dt(&self.created_at)?,
      created_by:     self
        .created_by
        .as_deref()
        .map(decode_uuid)
        .transpose()?,
      last_seen_at:   decode_opt_dt(self.last_seen_at.as_deref())?,
    })
  }
}

/// Raw strings from a `rejection_history` row.
pub struct RawRejection {
  pub situation_id: String,
  pub comment:      String,
  pub rejected_by:  String,
  pub rejected_at:  String,
}

impl RawRejection {
  pub fn into_event(self) -> Result<RejectionEvent> {
    Ok(RejectionEvent {
      situation_id: decode_uuid(&self.situation_id)?,
      comment:      self.comment,
      rejected_by:  decode_uuid(&self.rejected_by)?,
      rejected_at:  decode_dt(&self.rejected_at)?,
    })
  }
}
