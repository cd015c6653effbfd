use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use rusqlite::{Connection, Row};
use tracing::debug;
use uuid::Uuid;

use dossier_types::{
    AdminReview, ApplicantRole, DocumentType, OnboardingRecord, OnboardingStatus, Requirement,
    Requirements, ReviewStatus, UserSummary,
};

use crate::documents::{insert_document, query_document, query_document_by_type};
use crate::models::{NewDocument, OnboardingFilter, OnboardingRow, SwapOutcome, UserSummaryRow};
use crate::{Database, DbError, OptionalExt, now_ts, ts};

const ONBOARDING_COLUMNS: &str = "o.id, o.user_id, o.user_role, o.status, o.progress, \
     o.review_status, o.reviewed_by, o.reviewed_at, o.review_comments, o.created_at, o.updated_at";

impl Database {
    // -- Onboarding records --

    pub fn get_onboarding(&self, id: Uuid) -> Result<Option<OnboardingRecord>> {
        self.with_conn(|conn| load_record(conn, "o.id", &id.to_string()))
    }

    pub fn get_onboarding_by_user(&self, user_id: Uuid) -> Result<Option<OnboardingRecord>> {
        self.with_conn(|conn| load_record(conn, "o.user_id", &user_id.to_string()))
    }

    /// Returns the user's record, creating it from `requirements` if absent.
    ///
    /// Concurrent callers race on the UNIQUE(user_id) constraint; the loser's
    /// insert is ignored and both read back the same row.
    pub fn create_onboarding(
        &self,
        user_id: Uuid,
        role: ApplicantRole,
        status: OnboardingStatus,
        requirements: &Requirements,
    ) -> Result<OnboardingRecord> {
        let user = user_id.to_string();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = now_ts();
            let id = Uuid::new_v4().to_string();

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO onboarding (id, user_id, user_role, status, progress,
                                                   created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)",
                rusqlite::params![&id, &user, role.as_str(), status.as_str(), &now],
            )?;

            if inserted > 0 {
                let mut stmt = tx.prepare(
                    "INSERT INTO onboarding_requirements (onboarding_id, document_type, required, completed)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for (ty, req) in requirements {
                    stmt.execute(rusqlite::params![&id, ty.as_str(), req.required, req.completed])?;
                }
                debug!(user_id = %user, onboarding_id = %id, "Created onboarding record");
            }

            let record = load_record(&tx, "o.user_id", &user)?
                .ok_or_else(|| anyhow::anyhow!("Onboarding for user {} vanished after insert", user))?;
            tx.commit()?;
            Ok(record)
        })
    }

    pub fn set_progress(&self, id: Uuid, progress: u8) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE onboarding SET progress = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![progress, now_ts(), id.to_string()],
            )?;
            Ok(())
        })
    }

    /// Links `doc` as the current document of its type, replacing any previous
    /// one, then lets `settle` update the record before it is written back.
    ///
    /// The whole swap is one transaction. The replaced row is returned so the
    /// caller can remove its file once the commit has succeeded.
    pub fn swap_document<F>(&self, doc: &NewDocument, settle: F) -> Result<SwapOutcome>
    where
        F: FnOnce(&mut OnboardingRecord),
    {
        let onboarding_id = doc.onboarding_id.to_string();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let mut record = load_record(&tx, "o.id", &onboarding_id)?
                .with_context(|| format!("Onboarding {} not found", onboarding_id))?;

            let replaced = query_document_by_type(&tx, &onboarding_id, doc.document_type)?;
            if let Some(old) = &replaced {
                tx.execute(
                    "DELETE FROM onboarding_documents WHERE id = ?1",
                    [old.id.to_string()],
                )?;
            }

            insert_document(&tx, doc)?;
            record.documents.insert(doc.document_type, doc.id);

            settle(&mut record);

            write_requirements(&tx, &onboarding_id, &record.requirements)?;
            tx.execute(
                "UPDATE onboarding SET status = ?1, progress = ?2, updated_at = ?3 WHERE id = ?4",
                rusqlite::params![record.status.as_str(), record.progress, now_ts(), &onboarding_id],
            )?;

            let document = query_document(&tx, &doc.id.to_string())?
                .ok_or_else(|| anyhow::anyhow!("Document {} vanished after insert", doc.id))?;
            let record = load_record(&tx, "o.id", &onboarding_id)?
                .ok_or_else(|| anyhow::anyhow!("Onboarding {} vanished", onboarding_id))?;

            tx.commit()?;
            Ok(SwapOutcome {
                record,
                document,
                replaced,
            })
        })
    }

    /// Moves a record to `to` only if its status is still one of `from`, and
    /// puts its admin review back to pending.
    ///
    /// Returns `Err(DbError::Conflict)` if another request changed the status
    /// first, `Ok(None)` if the record does not exist.
    pub fn submit_for_review(
        &self,
        id: Uuid,
        from: &[OnboardingStatus],
        to: OnboardingStatus,
    ) -> Result<Option<OnboardingRecord>> {
        let id = id.to_string();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let (guard, extra) = status_guard(from, 5);
            let mut params = vec![
                to.as_str().to_string(),
                ReviewStatus::Pending.as_str().to_string(),
                now_ts(),
                id.clone(),
            ];
            params.extend(extra);

            let sql = format!(
                "UPDATE onboarding SET status = ?1, review_status = ?2, updated_at = ?3
                 WHERE id = ?4{guard}"
            );
            let changed = tx.execute(&sql, rusqlite::params_from_iter(params.iter()))?;

            let record = load_record(&tx, "o.id", &id)?;
            if changed == 0 && record.is_some() {
                return Err(DbError::Conflict("status").into());
            }
            tx.commit()?;
            Ok(record)
        })
    }

    /// Applies an admin decision to one record. With `from` set the update is
    /// conditional in the same way as [`Database::submit_for_review`].
    pub fn record_review(
        &self,
        id: Uuid,
        from: Option<&[OnboardingStatus]>,
        to: OnboardingStatus,
        review: &AdminReview,
    ) -> Result<Option<OnboardingRecord>> {
        let id = id.to_string();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let (guard, extra) = match from {
                Some(from) => status_guard(from, 8),
                None => (String::new(), Vec::new()),
            };

            let mut params = review_params(to, review);
            params.push(Some(id.clone()));
            params.extend(extra.into_iter().map(Some));

            let sql = format!(
                "UPDATE onboarding SET status = ?1, review_status = ?2, reviewed_by = ?3,
                                       reviewed_at = ?4, review_comments = ?5, updated_at = ?6
                 WHERE id = ?7{guard}"
            );
            let changed = tx.execute(&sql, rusqlite::params_from_iter(params.iter()))?;

            let record = load_record(&tx, "o.id", &id)?;
            if changed == 0 && record.is_some() {
                return Err(DbError::Conflict("status").into());
            }
            tx.commit()?;
            Ok(record)
        })
    }

    /// Unconditionally applies one decision to many records. Returns how many
    /// records were actually updated; unknown ids are skipped and repeated ids
    /// count once. Existing comments are kept when `review.comments` is `None`.
    pub fn record_review_many(
        &self,
        ids: &[Uuid],
        to: OnboardingStatus,
        review: &AdminReview,
    ) -> Result<usize> {
        let ids: BTreeSet<Uuid> = ids.iter().copied().collect();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let base = review_params(to, review);
            let mut modified = 0;
            {
                let mut stmt = tx.prepare(
                    "UPDATE onboarding SET status = ?1, review_status = ?2, reviewed_by = ?3,
                                           reviewed_at = ?4,
                                           review_comments = COALESCE(?5, review_comments),
                                           updated_at = ?6
                     WHERE id = ?7",
                )?;
                for id in &ids {
                    let mut params = base.clone();
                    params.push(Some(id.to_string()));
                    modified += stmt.execute(rusqlite::params_from_iter(params.iter()))?;
                }
            }
            tx.commit()?;
            Ok(modified)
        })
    }

    /// Records matching `filter`, newest first, each with its owner's summary.
    /// `page` is `(limit, offset)`; `None` returns everything.
    pub fn list_onboarding(
        &self,
        filter: OnboardingFilter,
        page: Option<(u32, u64)>,
    ) -> Result<Vec<(OnboardingRecord, Option<UserSummary>)>> {
        self.with_conn(|conn| {
            let (clause, params) = filter_clause(filter);
            let mut sql = format!(
                "SELECT {ONBOARDING_COLUMNS}, u.id, u.email, u.first_name, u.last_name, u.company
                 FROM onboarding o
                 LEFT JOIN users u ON u.id = o.user_id
                 {clause}
                 ORDER BY o.created_at DESC, o.rowid DESC"
            );
            if let Some((limit, offset)) = page {
                sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));
            }

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                    let summary = match row.get::<_, Option<String>>(11)? {
                        Some(id) => Some(UserSummaryRow {
                            id,
                            email: row.get(12)?,
                            first_name: row.get(13)?,
                            last_name: row.get(14)?,
                            company: row.get(15)?,
                        }),
                        None => None,
                    };
                    Ok((map_onboarding(row)?, summary))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(row, summary)| {
                    let record = hydrate(conn, row)?;
                    let summary = summary.map(UserSummaryRow::into_summary).transpose()?;
                    Ok((record, summary))
                })
                .collect()
        })
    }

    pub fn count_onboarding(&self, filter: OnboardingFilter) -> Result<u64> {
        self.with_conn(|conn| {
            let (clause, params) = filter_clause(filter);
            let sql = format!("SELECT COUNT(*) FROM onboarding o {clause}");
            let count: i64 =
                conn.query_row(&sql, rusqlite::params_from_iter(params.iter()), |r| r.get(0))?;
            Ok(count.max(0) as u64)
        })
    }
}

/// ` AND status IN (?n, ?n+1, ...)` with placeholders numbered from `first`.
fn status_guard(from: &[OnboardingStatus], first: usize) -> (String, Vec<String>) {
    if from.is_empty() {
        return (" AND 0".to_string(), Vec::new());
    }
    let placeholders: Vec<String> = (0..from.len()).map(|i| format!("?{}", first + i)).collect();
    let params = from.iter().map(|s| s.as_str().to_string()).collect();
    (format!(" AND status IN ({})", placeholders.join(", ")), params)
}

/// Parameters `?1..=?6` shared by the review updates.
fn review_params(to: OnboardingStatus, review: &AdminReview) -> Vec<Option<String>> {
    vec![
        Some(to.as_str().to_string()),
        Some(review.status.as_str().to_string()),
        review.reviewed_by.map(|id| id.to_string()),
        review.reviewed_at.map(ts),
        review.comments.clone(),
        Some(now_ts()),
    ]
}

fn filter_clause(filter: OnboardingFilter) -> (String, Vec<String>) {
    let mut conditions = Vec::new();
    let mut params = Vec::new();
    if let Some(status) = filter.status {
        params.push(status.as_str().to_string());
        conditions.push(format!("o.status = ?{}", params.len()));
    }
    if let Some(role) = filter.role {
        params.push(role.as_str().to_string());
        conditions.push(format!("o.user_role = ?{}", params.len()));
    }
    if conditions.is_empty() {
        (String::new(), params)
    } else {
        (format!("WHERE {}", conditions.join(" AND ")), params)
    }
}

fn load_record(conn: &Connection, column: &str, value: &str) -> Result<Option<OnboardingRecord>> {
    let sql = format!("SELECT {ONBOARDING_COLUMNS} FROM onboarding o WHERE {column} = ?1");
    let row = conn
        .prepare(&sql)?
        .query_row([value], map_onboarding)
        .optional()?;

    row.map(|row| hydrate(conn, row)).transpose()
}

fn hydrate(conn: &Connection, row: OnboardingRow) -> Result<OnboardingRecord> {
    let requirements = load_requirements(conn, &row.id)?;
    let documents = load_document_ids(conn, &row.id)?;
    row.into_record(requirements, documents)
}

fn load_requirements(conn: &Connection, onboarding_id: &str) -> Result<Requirements> {
    let mut stmt = conn.prepare(
        "SELECT document_type, required, completed FROM onboarding_requirements
         WHERE onboarding_id = ?1",
    )?;
    let rows = stmt
        .query_map([onboarding_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?, row.get::<_, bool>(2)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(ty, required, completed)| {
            Ok((ty.parse::<DocumentType>()?, Requirement { required, completed }))
        })
        .collect()
}

fn load_document_ids(conn: &Connection, onboarding_id: &str) -> Result<BTreeMap<DocumentType, Uuid>> {
    let mut stmt = conn.prepare(
        "SELECT document_type, id FROM onboarding_documents WHERE onboarding_id = ?1",
    )?;
    let rows = stmt
        .query_map([onboarding_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(ty, id)| Ok((ty.parse::<DocumentType>()?, id.parse::<Uuid>()?)))
        .collect()
}

fn write_requirements(conn: &Connection, onboarding_id: &str, requirements: &Requirements) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO onboarding_requirements (onboarding_id, document_type, required, completed)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (onboarding_id, document_type)
         DO UPDATE SET required = excluded.required, completed = excluded.completed",
    )?;
    for (ty, req) in requirements {
        stmt.execute(rusqlite::params![onboarding_id, ty.as_str(), req.required, req.completed])?;
    }
    Ok(())
}

fn map_onboarding(row: &Row<'_>) -> rusqlite::Result<OnboardingRow> {
    Ok(OnboardingRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        user_role: row.get(2)?,
        status: row.get(3)?,
        progress: row.get(4)?,
        review_status: row.get(5)?,
        reviewed_by: row.get(6)?,
        reviewed_at: row.get(7)?,
        review_comments: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}
