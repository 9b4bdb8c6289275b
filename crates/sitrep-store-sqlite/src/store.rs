//! [`SqliteStore`] — the SQLite implementation of [`SituationStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use sitrep_core::{
  catalog::{
    self, CatalogEntry, Category, DriIndicator, Indicator, Objective,
    StrategicCatalogEntry, StrategicIndicator,
  },
  declaration::{AnalysisRow, DeclarationRow},
  period::Period,
  principal::Role,
  situation::{
    NewSituation, RejectionEvent, ReportKind, Situation, Status,
  },
  store::{AnalysisFilter, SituationQuery, SituationStore, ValidationAuthority},
  structure::{Structure, StructureKind},
  user::{NewUser, User},
};

use crate::{
  Error, Result,
  encode::{
    RawRejection, RawSituation, RawUser, encode_dt, encode_kind, encode_uuid,
  },
  schema::SCHEMA,
};

type CoreError = sitrep_core::Error;

/// Live and draft shadow table names for a declaration family.
fn declaration_tables(kind: ReportKind) -> (&'static str, &'static str) {
  match kind {
    ReportKind::Operational => ("declarations_op", "declarations_op_draft"),
    ReportKind::Strategic => ("declarations_strat", "declarations_strat_draft"),
    ReportKind::DriSelf => ("declarations_dri", "declarations_dri_draft"),
  }
}

/// `?, ?, ...` for an `IN` list of `n` values.
fn placeholders(n: usize) -> String {
  let mut s = String::from("?");
  for _ in 1..n {
    s.push_str(", ?");
  }
  s
}

/// Load a situation row for update inside a transaction.
fn load_raw(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<Option<RawSituation>> {
  conn
    .query_row(
      &format!(
        "SELECT {} FROM situations WHERE situation_id = ?1",
        RawSituation::COLUMNS
      ),
      rusqlite::params![id],
      RawSituation::from_row,
    )
    .optional()
}

fn insert_declarations(
  conn: &rusqlite::Connection,
  table: &str,
  situation_id: &str,
  rows: &[DeclarationRow],
) -> rusqlite::Result<()> {
  let mut stmt = conn.prepare(&format!(
    "INSERT INTO {table} (situation_id, indicator_id, numerator, denominator, \
     rate, target, gap) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
  ))?;
  for row in rows {
    stmt.execute(rusqlite::params![
      situation_id,
      row.indicator_id,
      row.numerator,
      row.denominator,
      row.rate,
      row.target,
      row.gap,
    ])?;
  }
  Ok(())
}

fn select_declarations(
  conn: &rusqlite::Connection,
  table: &str,
  situation_id: &str,
) -> rusqlite::Result<Vec<DeclarationRow>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT indicator_id, numerator, denominator, rate, target, gap \
     FROM {table} WHERE situation_id = ?1 ORDER BY indicator_id"
  ))?;
  let rows = stmt
    .query_map(rusqlite::params![situation_id], |row| {
      Ok(DeclarationRow {
        indicator_id: row.get(0)?,
        numerator:    row.get(1)?,
        denominator:  row.get(2)?,
        rate:         row.get(3)?,
        target:       row.get(4)?,
        gap:          row.get(5)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A sitrep store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── SituationStore impl ─────────────────────────────────────────────────────

impl SituationStore for SqliteStore {
  type Error = Error;

  // ── Structures ────────────────────────────────────────────────────────

  async fn create_structure(&self, structure: Structure) -> Result<()> {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        match &structure {
          Structure::Dri { code, label } => {
            tx.execute(
              "INSERT INTO dris (code, label) VALUES (?1, ?2)",
              rusqlite::params![code, label],
            )?;
          }
          Structure::Diw { code, label, parent_dri } => {
            let parent_exists: bool = tx
              .query_row(
                "SELECT 1 FROM dris WHERE code = ?1",
                rusqlite::params![parent_dri],
                |_| Ok(true),
              )
              .optional()?
              .unwrap_or(false);
            if !parent_exists {
              return Ok(Err(CoreError::StructureNotFound(parent_dri.clone())));
            }
            tx.execute(
              "INSERT INTO diws (code, label, parent_dri) VALUES (?1, ?2, ?3)",
              rusqlite::params![code, label, parent_dri],
            )?;
          }
          Structure::Dc { code, label, description } => {
            tx.execute(
              "INSERT INTO dcs (code, label, description) VALUES (?1, ?2, ?3)",
              rusqlite::params![code, label, description],
            )?;
          }
        }
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;
    outcome.map_err(Error::Core)
  }

  async fn resolve_structure(&self, code: String) -> Result<Option<Structure>> {
    self
      .conn
      .call(move |conn| {
        // Lookup order DC > DRI > DIW; first match wins.
        let dc = conn
          .query_row(
            "SELECT code, label, description FROM dcs WHERE code = ?1",
            rusqlite::params![code],
            |row| {
              Ok(Structure::Dc {
                code:        row.get(0)?,
                label:       row.get(1)?,
                description: row.get(2)?,
              })
            },
          )
          .optional()?;
        if dc.is_some() {
          return Ok(dc);
        }

        let dri = conn
          .query_row(
            "SELECT code, label FROM dris WHERE code = ?1",
            rusqlite::params![code],
            |row| {
              Ok(Structure::Dri { code: row.get(0)?, label: row.get(1)? })
            },
          )
          .optional()?;
        if dri.is_some() {
          return Ok(dri);
        }

        let diw = conn
          .query_row(
            "SELECT code, label, parent_dri FROM diws WHERE code = ?1",
            rusqlite::params![code],
            |row| {
              Ok(Structure::Diw {
                code:       row.get(0)?,
                label:      row.get(1)?,
                parent_dri: row.get(2)?,
              })
            },
          )
          .optional()?;
        Ok(diw)
      })
      .await
      .map_err(Error::Database)
  }

  async fn children_of(&self, dri_code: String) -> Result<Vec<String>> {
    self
      .conn
      .call(move |conn| {
        let mut stmt = conn
          .prepare("SELECT code FROM diws WHERE parent_dri = ?1 ORDER BY code")?;
        let codes = stmt
          .query_map(rusqlite::params![dri_code], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(codes)
      })
      .await
      .map_err(Error::Database)
  }

  async fn list_structures(
    &self,
    kind: Option<StructureKind>,
  ) -> Result<Vec<Structure>> {
    self
      .conn
      .call(move |conn| {
        let mut out = Vec::new();

        if matches!(kind, None | Some(StructureKind::Dc)) {
          let mut stmt = conn
            .prepare("SELECT code, label, description FROM dcs ORDER BY code")?;
          out.extend(
            stmt
              .query_map([], |row| {
                Ok(Structure::Dc {
                  code:        row.get(0)?,
                  label:       row.get(1)?,
                  description: row.get(2)?,
                })
              })?
              .collect::<rusqlite::Result<Vec<_>>>()?,
          );
        }

        if matches!(kind, None | Some(StructureKind::Dri)) {
          let mut stmt =
            conn.prepare("SELECT code, label FROM dris ORDER BY code")?;
          out.extend(
            stmt
              .query_map([], |row| {
                Ok(Structure::Dri { code: row.get(0)?, label: row.get(1)? })
              })?
              .collect::<rusqlite::Result<Vec<_>>>()?,
          );
        }

        if matches!(kind, None | Some(StructureKind::Diw)) {
          let mut stmt = conn
            .prepare("SELECT code, label, parent_dri FROM diws ORDER BY code")?;
          out.extend(
            stmt
              .query_map([], |row| {
                Ok(Structure::Diw {
                  code:       row.get(0)?,
                  label:      row.get(1)?,
                  parent_dri: row.get(2)?,
                })
              })?
              .collect::<rusqlite::Result<Vec<_>>>()?,
          );
        }

        Ok(out)
      })
      .await
      .map_err(Error::Database)
  }

  // ── Users ─────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    let user = User {
      user_id:        Uuid::new_v4(),
      username:       input.username,
      first_name:     input.first_name,
      last_name:      input.last_name,
      email:          input.email,
      phone:          input.phone,
      role:           input.role,
      structure_code: input.structure_code,
      is_active:      false,
      is_super_admin: input.is_super_admin,
      session_token:  None,
      created_at:     Utc::now(),
      created_by:     input.created_by,
      last_seen_at:   None,
    };

    let row = user.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, username, first_name, last_name, \
           email, phone, role, structure_code, is_active, is_super_admin, \
           session_token, created_at, created_by, last_seen_at) \
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
          rusqlite::params![
            encode_uuid(row.user_id),
            row.username,
            row.first_name,
            row.last_name,
            row.email,
            row.phone,
            row.role.code(),
            row.structure_code,
            row.is_active,
            row.is_super_admin,
            row.session_token,
            encode_dt(row.created_at),
            row.created_by.map(encode_uuid),
            Option::<String>::None,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM users WHERE user_id = ?1", RawUser::COLUMNS),
              rusqlite::params![id_str],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn user_by_session_token(&self, token: String) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM users WHERE session_token = ?1",
                RawUser::COLUMNS
              ),
              rusqlite::params![token],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn set_user_active(&self, id: Uuid, active: bool) -> Result<()> {
    let id_str = encode_uuid(id);
    let outcome = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE users SET is_active = ?2 WHERE user_id = ?1",
          rusqlite::params![id_str, active],
        )?;
        if changed == 0 {
          return Ok(Err(CoreError::UserNotFound(id)));
        }
        Ok(Ok(()))
      })
      .await?;
    outcome.map_err(Error::Core)
  }

  async fn set_session_token(&self, id: Uuid, token: Option<String>) -> Result<()> {
    let id_str = encode_uuid(id);
    let outcome = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE users SET session_token = ?2 WHERE user_id = ?1",
          rusqlite::params![id_str, token],
        )?;
        if changed == 0 {
          return Ok(Err(CoreError::UserNotFound(id)));
        }
        Ok(Ok(()))
      })
      .await?;
    outcome.map_err(Error::Core)
  }

  async fn delete_user(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let owned: i64 = tx.query_row(
          "SELECT COUNT(*) FROM situations WHERE owner_user_id = ?1",
          rusqlite::params![id_str],
          |row| row.get(0),
        )?;
        if owned > 0 {
          return Ok(Err(CoreError::OwnedSituationsExist(id)));
        }
        let changed = tx.execute(
          "DELETE FROM users WHERE user_id = ?1",
          rusqlite::params![id_str],
        )?;
        if changed == 0 {
          return Ok(Err(CoreError::UserNotFound(id)));
        }
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;
    outcome.map_err(Error::Core)
  }

  async fn user_ids_with_role_at(
    &self,
    role: Role,
    structure_code: String,
  ) -> Result<Vec<Uuid>> {
    let ids: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT user_id FROM users WHERE role = ?1 AND structure_code = ?2",
        )?;
        let ids = stmt
          .query_map(rusqlite::params![role.code(), structure_code], |row| {
            row.get(0)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
      })
      .await?;
    ids
      .iter()
      .map(|s| crate::encode::decode_uuid(s))
      .collect()
  }

  // ── Catalog ───────────────────────────────────────────────────────────

  async fn create_category(&self, category: Category) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO categories (category_id, label) VALUES (?1, ?2)",
          rusqlite::params![category.category_id, category.label],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::Database)
  }

  async fn list_categories(&self) -> Result<Vec<Category>> {
    self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare("SELECT category_id, label FROM categories ORDER BY category_id")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(Category { category_id: row.get(0)?, label: row.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::Database)
  }

  async fn create_objective(
    &self,
    category_id: String,
    label: String,
  ) -> Result<Objective> {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let exists: bool = tx
          .query_row(
            "SELECT 1 FROM categories WHERE category_id = ?1",
            rusqlite::params![category_id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Ok(Err(CoreError::CategoryNotFound(category_id)));
        }
        tx.execute(
          "INSERT INTO objectives (label, category_id) VALUES (?1, ?2)",
          rusqlite::params![label, category_id],
        )?;
        let objective_id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(Ok(Objective { objective_id, label, category_id }))
      })
      .await?;
    outcome.map_err(Error::Core)
  }

  async fn create_indicator(
    &self,
    category_id: String,
    label: String,
  ) -> Result<Indicator> {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let last_seq: Option<u32> = tx
          .query_row(
            "SELECT last_op_seq FROM categories WHERE category_id = ?1",
            rusqlite::params![category_id],
            |row| row.get(0),
          )
          .optional()?;
        let Some(last_seq) = last_seq else {
          return Ok(Err(CoreError::CategoryNotFound(category_id)));
        };

        let indicator_id = catalog::indicator_id(&category_id, last_seq);
        tx.execute(
          "UPDATE categories SET last_op_seq = ?2 WHERE category_id = ?1",
          rusqlite::params![category_id, last_seq + 1],
        )?;
        tx.execute(
          "INSERT INTO indicators (indicator_id, label, category_id) \
           VALUES (?1, ?2, ?3)",
          rusqlite::params![indicator_id, label, category_id],
        )?;
        tx.commit()?;
        Ok(Ok(Indicator { indicator_id, label, category_id }))
      })
      .await?;
    outcome.map_err(Error::Core)
  }

  async fn create_strategic_indicator(
    &self,
    category_id: String,
    objective_id: i64,
    label: String,
  ) -> Result<StrategicIndicator> {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let last_seq: Option<u32> = tx
          .query_row(
            "SELECT last_strat_seq FROM categories WHERE category_id = ?1",
            rusqlite::params![category_id],
            |row| row.get(0),
          )
          .optional()?;
        let Some(last_seq) = last_seq else {
          return Ok(Err(CoreError::CategoryNotFound(category_id)));
        };

        let indicator_id = catalog::indicator_id(&category_id, last_seq);
        tx.execute(
          "UPDATE categories SET last_strat_seq = ?2 WHERE category_id = ?1",
          rusqlite::params![category_id, last_seq + 1],
        )?;
        tx.execute(
          "INSERT INTO strategic_indicators (indicator_id, label, category_id, \
           objective_id) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![indicator_id, label, category_id, objective_id],
        )?;
        tx.commit()?;
        Ok(Ok(StrategicIndicator {
          indicator_id,
          label,
          category_id,
          objective_id,
        }))
      })
      .await?;
    outcome.map_err(Error::Core)
  }

  async fn upsert_dri_indicator(&self, indicator: DriIndicator) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO dri_indicators (indicator_id, label) VALUES (?1, ?2) \
           ON CONFLICT (indicator_id) DO UPDATE SET label = excluded.label",
          rusqlite::params![indicator.indicator_id, indicator.label],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::Database)
  }

  async fn operational_catalog(
    &self,
    structure_code: String,
    year: String,
  ) -> Result<Vec<CatalogEntry>> {
    self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT i.indicator_id, i.label, i.category_id, COALESCE(t.value, 0) \
           FROM indicators i \
           LEFT JOIN targets_op t ON t.indicator_id = i.indicator_id \
             AND t.structure_code = ?1 AND t.year = ?2 \
           ORDER BY i.indicator_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![structure_code, year], |row| {
            Ok(CatalogEntry {
              indicator_id: row.get(0)?,
              label:        row.get(1)?,
              category_id:  row.get(2)?,
              target:       row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::Database)
  }

  async fn strategic_catalog(
    &self,
    year: String,
  ) -> Result<Vec<StrategicCatalogEntry>> {
    self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT si.indicator_id, si.label, si.category_id, c.label, \
             si.objective_id, o.label, COALESCE(t.value, 0) \
           FROM strategic_indicators si \
           JOIN categories c ON c.category_id = si.category_id \
           JOIN objectives o ON o.objective_id = si.objective_id \
           LEFT JOIN targets_strat t ON t.indicator_id = si.indicator_id \
             AND t.year = ?1 \
           ORDER BY si.category_id, si.objective_id, si.indicator_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![year], |row| {
            Ok(StrategicCatalogEntry {
              indicator_id:    row.get(0)?,
              label:           row.get(1)?,
              category_id:     row.get(2)?,
              category_label:  row.get(3)?,
              objective_id:    row.get(4)?,
              objective_label: row.get(5)?,
              target:          row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::Database)
  }

  async fn dri_catalog(
    &self,
    dri_code: String,
    year: String,
  ) -> Result<Vec<CatalogEntry>> {
    let id_list = catalog::DRI_SELF_INDICATORS
      .map(|i| i.to_string())
      .join(", ");
    self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT d.indicator_id, d.label, COALESCE(t.value, 0) \
           FROM dri_indicators d \
           LEFT JOIN targets_dri t ON t.indicator_id = d.indicator_id \
             AND t.dri_code = ?1 AND t.year = ?2 \
           WHERE d.indicator_id IN ({id_list}) \
           ORDER BY d.indicator_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![dri_code, year], |row| {
            let id: i64 = row.get(0)?;
            Ok(CatalogEntry {
              indicator_id: id.to_string(),
              label:        row.get(1)?,
              category_id:  String::new(),
              target:       row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::Database)
  }

  async fn indicator_labels(
    &self,
    kind: ReportKind,
  ) -> Result<Vec<(String, String)>> {
    let sql = match kind {
      ReportKind::Operational => "SELECT indicator_id, label FROM indicators",
      ReportKind::Strategic => {
        "SELECT indicator_id, label FROM strategic_indicators"
      }
      ReportKind::DriSelf => {
        "SELECT CAST(indicator_id AS TEXT), label FROM dri_indicators"
      }
    };
    self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::Database)
  }

  async fn set_operational_target(
    &self,
    indicator_id: String,
    structure_code: String,
    year: String,
    value: f64,
  ) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO targets_op (indicator_id, structure_code, year, value) \
           VALUES (?1, ?2, ?3, ?4) \
           ON CONFLICT (indicator_id, structure_code, year) \
           DO UPDATE SET value = excluded.value",
          rusqlite::params![indicator_id, structure_code, year, value],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::Database)
  }

  async fn set_strategic_target(
    &self,
    indicator_id: String,
    year: String,
    value: f64,
  ) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO targets_strat (indicator_id, year, value) \
           VALUES (?1, ?2, ?3) \
           ON CONFLICT (indicator_id, year) DO UPDATE SET value = excluded.value",
          rusqlite::params![indicator_id, year, value],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::Database)
  }

  async fn set_dri_target(
    &self,
    indicator_id: i64,
    dri_code: String,
    year: String,
    value: f64,
  ) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO targets_dri (indicator_id, dri_code, year, value) \
           VALUES (?1, ?2, ?3, ?4) \
           ON CONFLICT (indicator_id, dri_code, year) \
           DO UPDATE SET value = excluded.value",
          rusqlite::params![indicator_id, dri_code, year, value],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::Database)
  }

  async fn materialize_default_targets(
    &self,
    structure_code: String,
    year: String,
  ) -> Result<usize> {
    self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT INTO targets_op (indicator_id, structure_code, year, value) \
           SELECT i.indicator_id, ?1, ?2, 0 FROM indicators i \
           WHERE NOT EXISTS (SELECT 1 FROM targets_op t \
             WHERE t.indicator_id = i.indicator_id \
               AND t.structure_code = ?1 AND t.year = ?2)",
          rusqlite::params![structure_code, year],
        )?;
        Ok(inserted)
      })
      .await
      .map_err(Error::Database)
  }

  // ── Situations ────────────────────────────────────────────────────────

  async fn create_situation(&self, input: NewSituation) -> Result<Situation> {
    let situation = Situation {
      situation_id:       Uuid::new_v4(),
      structure_code:     input.structure_code,
      period:             input.period,
      kind:               input.kind,
      status:             Status::Draft,
      owner_user_id:      input.owner_user_id,
      created_at:         Utc::now(),
      edited_at:          None,
      confirmed_at:       None,
      dri_validated_at:   None,
      admin_validated_at: None,
    };

    let row = situation.clone();
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        // One situation per (structure, month, year); month names compare
        // case-insensitively.
        let duplicate: bool = tx
          .query_row(
            "SELECT 1 FROM situations WHERE structure_code = ?1 \
             AND lower(month) = lower(?2) AND year = ?3",
            rusqlite::params![
              row.structure_code,
              row.period.month,
              row.period.year
            ],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if duplicate {
          return Ok(Err(CoreError::DuplicatePeriod {
            structure: row.structure_code.clone(),
            month:     row.period.month.clone(),
            year:      row.period.year.clone(),
          }));
        }

        tx.execute(
          "INSERT INTO situations (situation_id, structure_code, month, year, \
           kind, status, owner_user_id, created_at) \
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            encode_uuid(row.situation_id),
            row.structure_code,
            row.period.month,
            row.period.year,
            encode_kind(row.kind),
            row.status.code(),
            encode_uuid(row.owner_user_id),
            encode_dt(row.created_at),
          ],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;

    outcome.map_err(Error::Core)?;
    Ok(situation)
  }

  async fn get_situation(&self, id: Uuid) -> Result<Option<Situation>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawSituation> = self
      .conn
      .call(move |conn| Ok(load_raw(conn, &id_str)?))
      .await?;
    raw.map(RawSituation::into_situation).transpose()
  }

  async fn list_situations(&self, query: &SituationQuery) -> Result<Vec<Situation>> {
    let mut conds: Vec<String> = Vec::new();
    let mut params: Vec<rusqlite::types::Value> = Vec::new();

    if let Some(structures) = &query.structures {
      if structures.is_empty() {
        return Ok(Vec::new());
      }
      conds.push(format!(
        "structure_code IN ({})",
        placeholders(structures.len())
      ));
      params.extend(structures.iter().cloned().map(Into::into));
    }
    if let Some(owner) = query.owner {
      conds.push("owner_user_id = ?".into());
      params.push(encode_uuid(owner).into());
    }
    if let Some(status) = query.status {
      conds.push("status = ?".into());
      params.push(status.code().into());
    }
    if let Some(kind) = query.kind {
      conds.push("kind = ?".into());
      params.push(encode_kind(kind).into());
    }
    if let Some(year) = &query.year {
      conds.push("year = ?".into());
      params.push(year.clone().into());
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };
    let sql = format!(
      "SELECT {} FROM situations {where_clause} ORDER BY created_at DESC",
      RawSituation::COLUMNS
    );

    let raws: Vec<RawSituation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            RawSituation::from_row(row)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSituation::into_situation).collect()
  }

  async fn replace_draft(&self, id: Uuid, rows: Vec<DeclarationRow>) -> Result<()> {
    let id_str = encode_uuid(id);
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(raw) = load_raw(&tx, &id_str)? else {
          return Ok(Err(CoreError::SituationNotFound(id)));
        };
        let Ok(kind) = raw.kind.parse::<ReportKind>() else {
          return Ok(Err(CoreError::Storage(format!(
            "unknown report kind: {:?}",
            raw.kind
          ))));
        };
        let (_, draft) = declaration_tables(kind);

        tx.execute(
          &format!("DELETE FROM {draft} WHERE situation_id = ?1"),
          rusqlite::params![id_str],
        )?;
        insert_declarations(&tx, draft, &id_str, &rows)?;
        tx.execute(
          "UPDATE situations SET edited_at = ?2 WHERE situation_id = ?1",
          rusqlite::params![id_str, encode_dt(Utc::now())],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;
    outcome.map_err(Error::Core)
  }

  async fn confirm_situation(
    &self,
    id: Uuid,
    rows: Vec<DeclarationRow>,
  ) -> Result<Situation> {
    let id_str = encode_uuid(id);
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(mut raw) = load_raw(&tx, &id_str)? else {
          return Ok(Err(CoreError::SituationNotFound(id)));
        };
        let Some(status) = Status::from_code(raw.status) else {
          return Ok(Err(CoreError::Storage(format!(
            "unknown status code: {}",
            raw.status
          ))));
        };
        if !status.is_editable() {
          return Ok(Err(CoreError::InvalidTransition {
            from:   status,
            action: "confirm",
          }));
        }
        let Ok(kind) = raw.kind.parse::<ReportKind>() else {
          return Ok(Err(CoreError::Storage(format!(
            "unknown report kind: {:?}",
            raw.kind
          ))));
        };
        let (live, draft) = declaration_tables(kind);

        tx.execute(
          &format!("DELETE FROM {live} WHERE situation_id = ?1"),
          rusqlite::params![id_str],
        )?;
        tx.execute(
          &format!("DELETE FROM {draft} WHERE situation_id = ?1"),
          rusqlite::params![id_str],
        )?;
        insert_declarations(&tx, live, &id_str, &rows)?;

        let now = encode_dt(Utc::now());
        tx.execute(
          "UPDATE situations SET status = ?2, confirmed_at = ?3 \
           WHERE situation_id = ?1",
          rusqlite::params![id_str, Status::Submitted.code(), now],
        )?;
        tx.commit()?;

        raw.status = Status::Submitted.code();
        raw.confirmed_at = Some(now);
        Ok(Ok(raw))
      })
      .await?;
    outcome.map_err(Error::Core)?.into_situation()
  }

  async fn validate_situation(
    &self,
    id: Uuid,
    authority: ValidationAuthority,
  ) -> Result<Situation> {
    let id_str = encode_uuid(id);
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(mut raw) = load_raw(&tx, &id_str)? else {
          return Ok(Err(CoreError::SituationNotFound(id)));
        };
        let Some(status) = Status::from_code(raw.status) else {
          return Ok(Err(CoreError::Storage(format!(
            "unknown status code: {}",
            raw.status
          ))));
        };
        if status != Status::Submitted {
          return Ok(Err(CoreError::InvalidTransition {
            from:   status,
            action: "validate",
          }));
        }

        let now = encode_dt(Utc::now());
        let column = match authority {
          ValidationAuthority::Dri => "dri_validated_at",
          ValidationAuthority::Admin => "admin_validated_at",
        };
        tx.execute(
          &format!(
            "UPDATE situations SET status = ?2, {column} = ?3 \
             WHERE situation_id = ?1"
          ),
          rusqlite::params![id_str, Status::Validated.code(), now],
        )?;
        tx.commit()?;

        raw.status = Status::Validated.code();
        match authority {
          ValidationAuthority::Dri => raw.dri_validated_at = Some(now),
          ValidationAuthority::Admin => raw.admin_validated_at = Some(now),
        }
        Ok(Ok(raw))
      })
      .await?;
    outcome.map_err(Error::Core)?.into_situation()
  }

  async fn reject_situation(
    &self,
    id: Uuid,
    comment: String,
    rejected_by: Uuid,
  ) -> Result<Situation> {
    let id_str = encode_uuid(id);
    let by_str = encode_uuid(rejected_by);
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(mut raw) = load_raw(&tx, &id_str)? else {
          return Ok(Err(CoreError::SituationNotFound(id)));
        };
        let Some(status) = Status::from_code(raw.status) else {
          return Ok(Err(CoreError::Storage(format!(
            "unknown status code: {}",
            raw.status
          ))));
        };
        if status != Status::Submitted {
          return Ok(Err(CoreError::InvalidTransition {
            from:   status,
            action: "reject",
          }));
        }
        let Ok(kind) = raw.kind.parse::<ReportKind>() else {
          return Ok(Err(CoreError::Storage(format!(
            "unknown report kind: {:?}",
            raw.kind
          ))));
        };
        let (live, draft) = declaration_tables(kind);

        // Bounce the live rows back into the draft shadow, values preserved.
        tx.execute(
          &format!(
            "INSERT INTO {draft} (situation_id, indicator_id, numerator, \
             denominator, rate, target, gap) \
             SELECT situation_id, indicator_id, numerator, denominator, rate, \
             target, gap FROM {live} WHERE situation_id = ?1"
          ),
          rusqlite::params![id_str],
        )?;
        tx.execute(
          &format!("DELETE FROM {live} WHERE situation_id = ?1"),
          rusqlite::params![id_str],
        )?;

        let now = encode_dt(Utc::now());
        tx.execute(
          "INSERT INTO rejection_history (situation_id, comment, rejected_by, \
           rejected_at) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, comment, by_str, now],
        )?;
        tx.execute(
          "UPDATE situations SET status = ?2, edited_at = ?3 \
           WHERE situation_id = ?1",
          rusqlite::params![id_str, Status::Rejected.code(), now],
        )?;
        tx.commit()?;

        raw.status = Status::Rejected.code();
        raw.edited_at = Some(now);
        Ok(Ok(raw))
      })
      .await?;
    outcome.map_err(Error::Core)?.into_situation()
  }

  async fn delete_situation(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    let outcome = self
      .conn
      .call(move |conn| {
        // Declaration rows go with the situation via ON DELETE CASCADE;
        // rejection history intentionally survives.
        let changed = conn.execute(
          "DELETE FROM situations WHERE situation_id = ?1",
          rusqlite::params![id_str],
        )?;
        if changed == 0 {
          return Ok(Err(CoreError::SituationNotFound(id)));
        }
        Ok(Ok(()))
      })
      .await?;
    outcome.map_err(Error::Core)
  }

  // ── Declarations & history ────────────────────────────────────────────

  async fn live_declarations(&self, id: Uuid) -> Result<Vec<DeclarationRow>> {
    let id_str = encode_uuid(id);
    let outcome = self
      .conn
      .call(move |conn| {
        let Some(raw) = load_raw(conn, &id_str)? else {
          return Ok(Err(CoreError::SituationNotFound(id)));
        };
        let Ok(kind) = raw.kind.parse::<ReportKind>() else {
          return Ok(Err(CoreError::Storage(format!(
            "unknown report kind: {:?}",
            raw.kind
          ))));
        };
        let (live, _) = declaration_tables(kind);
        Ok(Ok(select_declarations(conn, live, &id_str)?))
      })
      .await?;
    outcome.map_err(Error::Core)
  }

  async fn draft_declarations(&self, id: Uuid) -> Result<Vec<DeclarationRow>> {
    let id_str = encode_uuid(id);
    let outcome = self
      .conn
      .call(move |conn| {
        let Some(raw) = load_raw(conn, &id_str)? else {
          return Ok(Err(CoreError::SituationNotFound(id)));
        };
        let Ok(kind) = raw.kind.parse::<ReportKind>() else {
          return Ok(Err(CoreError::Storage(format!(
            "unknown report kind: {:?}",
            raw.kind
          ))));
        };
        let (_, draft) = declaration_tables(kind);
        Ok(Ok(select_declarations(conn, draft, &id_str)?))
      })
      .await?;
    outcome.map_err(Error::Core)
  }

  async fn declarations_for_situations(
    &self,
    kind: ReportKind,
    ids: Vec<Uuid>,
  ) -> Result<Vec<AnalysisRow>> {
    if ids.is_empty() {
      return Ok(Vec::new());
    }
    let (live, _) = declaration_tables(kind);
    let category_select = match kind {
      ReportKind::Operational => ", i.category_id",
      ReportKind::Strategic => ", i.category_id",
      ReportKind::DriSelf => ", ''",
    };
    let category_join = match kind {
      ReportKind::Operational => {
        "JOIN indicators i ON i.indicator_id = d.indicator_id"
      }
      ReportKind::Strategic => {
        "JOIN strategic_indicators i ON i.indicator_id = d.indicator_id"
      }
      ReportKind::DriSelf => "",
    };

    let id_strs: Vec<rusqlite::types::Value> =
      ids.iter().map(|i| encode_uuid(*i).into()).collect();
    let sql = format!(
      "SELECT s.situation_id, s.structure_code, s.month, s.year, \
       d.indicator_id, d.numerator, d.denominator, d.rate, d.target, d.gap\
       {category_select} \
       FROM {live} d \
       JOIN situations s ON s.situation_id = d.situation_id \
       {category_join} \
       WHERE d.situation_id IN ({}) \
       ORDER BY d.indicator_id",
      placeholders(id_strs.len())
    );

    let raws: Vec<(String, String, String, String, DeclarationRow, String)> =
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&sql)?;
          let rows = stmt
            .query_map(rusqlite::params_from_iter(id_strs.iter()), |row| {
              Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                DeclarationRow {
                  indicator_id: row.get(4)?,
                  numerator:    row.get(5)?,
                  denominator:  row.get(6)?,
                  rate:         row.get(7)?,
                  target:       row.get(8)?,
                  gap:          row.get(9)?,
                },
                row.get(10)?,
              ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?;

    raws
      .into_iter()
      .map(|(sid, structure, month, year, row, category)| {
        Ok(AnalysisRow {
          situation_id:   crate::encode::decode_uuid(&sid)?,
          structure_code: structure,
          month,
          year,
          category_id:    category,
          row,
        })
      })
      .collect()
  }

  async fn analysis_rows(&self, filter: &AnalysisFilter) -> Result<Vec<AnalysisRow>> {
    let kind = filter.kind;
    let (live, _) = declaration_tables(kind);
    let category_select = match kind {
      ReportKind::DriSelf => ", ''",
      _ => ", i.category_id",
    };
    let category_join = match kind {
      ReportKind::Operational => {
        "JOIN indicators i ON i.indicator_id = d.indicator_id"
      }
      ReportKind::Strategic => {
        "JOIN strategic_indicators i ON i.indicator_id = d.indicator_id"
      }
      ReportKind::DriSelf => "",
    };

    let mut conds: Vec<String> = Vec::new();
    let mut params: Vec<rusqlite::types::Value> = Vec::new();

    if let Some(structures) = &filter.structures {
      if structures.is_empty() {
        return Ok(Vec::new());
      }
      conds.push(format!(
        "s.structure_code IN ({})",
        placeholders(structures.len())
      ));
      params.extend(structures.iter().cloned().map(Into::into));
    }
    if let Some(year) = &filter.year {
      conds.push("s.year = ?".into());
      params.push(year.clone().into());
    }
    if let Some(category) = &filter.category_id {
      if kind != ReportKind::DriSelf {
        conds.push("i.category_id = ?".into());
        params.push(category.clone().into());
      }
    }
    if let Some(indicator) = &filter.indicator_id {
      conds.push("d.indicator_id = ?".into());
      params.push(indicator.clone().into());
    }
    if let Some(months) = &filter.months {
      if months.is_empty() {
        return Ok(Vec::new());
      }
      conds.push(format!("lower(s.month) IN ({})", placeholders(months.len())));
      params.extend(months.iter().map(|m| m.to_lowercase().into()));
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };
    let sql = format!(
      "SELECT s.situation_id, s.structure_code, s.month, s.year, \
       d.indicator_id, d.numerator, d.denominator, d.rate, d.target, d.gap\
       {category_select} \
       FROM {live} d \
       JOIN situations s ON s.situation_id = d.situation_id \
       {category_join} \
       {where_clause} \
       ORDER BY d.indicator_id"
    );

    let raws: Vec<(String, String, String, String, DeclarationRow, String)> =
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&sql)?;
          let rows = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
              Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                DeclarationRow {
                  indicator_id: row.get(4)?,
                  numerator:    row.get(5)?,
                  denominator:  row.get(6)?,
                  rate:         row.get(7)?,
                  target:       row.get(8)?,
                  gap:          row.get(9)?,
                },
                row.get(10)?,
              ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?;

    raws
      .into_iter()
      .map(|(sid, structure, month, year, row, category)| {
        Ok(AnalysisRow {
          situation_id:   crate::encode::decode_uuid(&sid)?,
          structure_code: structure,
          month,
          year,
          category_id:    category,
          row,
        })
      })
      .collect()
  }

  async fn rejection_history(&self, id: Uuid) -> Result<Vec<RejectionEvent>> {
    let id_str = encode_uuid(id);
    let raws: Vec<RawRejection> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT situation_id, comment, rejected_by, rejected_at \
           FROM rejection_history WHERE situation_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok(RawRejection {
              situation_id: row.get(0)?,
              comment:      row.get(1)?,
              rejected_by:  row.get(2)?,
              rejected_at:  row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawRejection::into_event).collect()
  }

  async fn filed_periods(&self, structure_code: String) -> Result<Vec<Period>> {
    self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT month, year FROM situations WHERE structure_code = ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![structure_code], |row| {
            Ok(Period::new(
              row.get::<_, String>(0)?,
              row.get::<_, String>(1)?,
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::Database)
  }
}
