use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use crate::models::{NewUser, UserRow};
use crate::{Database, OptionalExt, now_ts, ts, unique_violation};

const USER_COLUMNS: &str = "id, email, password, first_name, last_name, company, role, \
     is_email_verified, is_active, last_login, created_at";

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &NewUser<'_>) -> Result<UserRow> {
        let (token, expires) = match user.verification_token {
            Some((token, expires)) => (Some(token), Some(ts(expires))),
            None => (None, None),
        };
        let id = user.id.to_string();
        self.with_conn_mut(|conn| {
            let now = now_ts();
            conn.execute(
                "INSERT INTO users (id, email, password, first_name, last_name, company, role,
                                    is_email_verified, email_verification_token,
                                    email_verification_expires, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
                rusqlite::params![
                    &id,
                    user.email,
                    user.password_hash,
                    user.first_name,
                    user.last_name,
                    user.company,
                    user.role.as_str(),
                    user.is_email_verified,
                    token,
                    expires,
                    now,
                ],
            )
            .map_err(|e| unique_violation(e, "email"))?;

            query_user(conn, "id", &id)?
                .ok_or_else(|| anyhow::anyhow!("User {} vanished after insert", id))
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", &id.to_string()))
    }

    pub fn set_verification_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET email_verification_token = ?1, email_verification_expires = ?2,
                                  updated_at = ?3
                 WHERE id = ?4",
                rusqlite::params![token, ts(expires), now_ts(), user_id.to_string()],
            )?;
            Ok(())
        })
    }

    /// Consumes an unexpired verification token. Returns the verified user.
    pub fn verify_email(&self, token: &str, now: DateTime<Utc>) -> Result<Option<UserRow>> {
        self.with_conn_mut(|conn| {
            let id: Option<String> = conn
                .query_row(
                    "SELECT id FROM users
                     WHERE email_verification_token = ?1 AND email_verification_expires > ?2",
                    rusqlite::params![token, ts(now)],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(id) = id else {
                return Ok(None);
            };

            conn.execute(
                "UPDATE users SET is_email_verified = 1, email_verification_token = NULL,
                                  email_verification_expires = NULL, updated_at = ?1
                 WHERE id = ?2",
                rusqlite::params![now_ts(), &id],
            )?;
            query_user(conn, "id", &id)
        })
    }

    pub fn set_reset_token(&self, user_id: Uuid, token: &str, expires: DateTime<Utc>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET password_reset_token = ?1, password_reset_expires = ?2,
                                  updated_at = ?3
                 WHERE id = ?4",
                rusqlite::params![token, ts(expires), now_ts(), user_id.to_string()],
            )?;
            Ok(())
        })
    }

    /// Replaces the password for an unexpired reset token. Returns false when
    /// the token is unknown or expired.
    pub fn reset_password(&self, token: &str, password_hash: &str, now: DateTime<Utc>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET password = ?1, password_reset_token = NULL,
                                  password_reset_expires = NULL, updated_at = ?2
                 WHERE password_reset_token = ?3 AND password_reset_expires > ?4",
                rusqlite::params![password_hash, now_ts(), token, ts(now)],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn record_login(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET last_login = ?1 WHERE id = ?2",
                rusqlite::params![ts(at), user_id.to_string()],
            )?;
            Ok(())
        })
    }

    pub fn update_profile(
        &self,
        user_id: Uuid,
        first_name: &str,
        last_name: &str,
        company: Option<&str>,
    ) -> Result<Option<UserRow>> {
        let id = user_id.to_string();
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET first_name = ?1, last_name = ?2, company = ?3, updated_at = ?4
                 WHERE id = ?5",
                rusqlite::params![first_name, last_name, company, now_ts(), &id],
            )?;
            query_user(conn, "id", &id)
        })
    }

    pub fn set_user_active(&self, user_id: Uuid, active: bool) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![active, now_ts(), user_id.to_string()],
            )?;
            Ok(())
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is always one of the literals above, never caller input.
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt.query_row([value], map_user).optional()?;

    Ok(row)
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        password: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        company: row.get(5)?,
        role: row.get(6)?,
        is_email_verified: row.get(7)?,
        is_active: row.get(8)?,
        last_login: row.get(9)?,
        created_at: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbError;
    use dossier_types::Role;

    fn new_user<'a>(email: &'a str) -> NewUser<'a> {
        NewUser {
            id: Uuid::new_v4(),
            email,
            password_hash: "hash",
            first_name: "Ada",
            last_name: "Lovelace",
            company: Some("Analytical Engines"),
            role: Role::Seller,
            is_email_verified: false,
            verification_token: None,
        }
    }

    #[test]
    fn duplicate_email_is_a_conflict() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&new_user("ada@example.com")).unwrap();

        let err = db.create_user(&new_user("ada@example.com")).unwrap_err();
        assert!(matches!(err.downcast_ref::<DbError>(), Some(DbError::Conflict("email"))));
    }

    #[test]
    fn verification_token_is_single_use_and_expires() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        let fresh = NewUser {
            verification_token: Some(("fresh", now + chrono::Duration::hours(24))),
            ..new_user("fresh@example.com")
        };
        let stale = NewUser {
            verification_token: Some(("stale", now - chrono::Duration::hours(1))),
            ..new_user("stale@example.com")
        };
        db.create_user(&fresh).unwrap();
        db.create_user(&stale).unwrap();

        let verified = db.verify_email("fresh", now).unwrap().unwrap();
        assert!(verified.is_email_verified);
        assert!(db.verify_email("fresh", now).unwrap().is_none());
        assert!(db.verify_email("stale", now).unwrap().is_none());
    }

    #[test]
    fn reset_password_requires_live_token() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user(&new_user("reset@example.com")).unwrap();
        let id = user.user_id().unwrap();
        let now = Utc::now();

        db.set_reset_token(id, "tok", now + chrono::Duration::hours(1)).unwrap();
        assert!(!db.reset_password("other", "new-hash", now).unwrap());
        assert!(db.reset_password("tok", "new-hash", now).unwrap());
        assert!(!db.reset_password("tok", "newer-hash", now).unwrap());

        let row = db.get_user_by_id(id).unwrap().unwrap();
        assert_eq!(row.password, "new-hash");
    }

    #[test]
    fn profile_round_trips_through_row() {
        let db = Database::open_in_memory().unwrap();
        let row = db.create_user(&new_user("p@example.com")).unwrap();
        let profile = row.to_profile().unwrap();
        assert_eq!(profile.role, Role::Seller);
        assert_eq!(profile.company.as_deref(), Some("Analytical Engines"));
        assert!(profile.is_active);
        assert!(profile.last_login.is_none());
    }
}
