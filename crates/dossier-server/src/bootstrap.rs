use anyhow::Result;
use tracing::info;
use uuid::Uuid;

use dossier_api::auth::hash_password;
use dossier_api::config::AdminSeed;
use dossier_db::{Database, NewUser};
use dossier_types::Role;

/// Creates the configured admin account unless the email is already taken.
/// An existing account is left untouched, whatever its role.
pub fn seed_admin(db: &Database, seed: &AdminSeed) -> Result<()> {
    let email = seed.email.trim().to_lowercase();
    if db.get_user_by_email(&email)?.is_some() {
        info!("Bootstrap admin {} already exists", email);
        return Ok(());
    }

    let password_hash = hash_password(&seed.password)?;
    db.create_user(&NewUser {
        id: Uuid::new_v4(),
        email: &email,
        password_hash: &password_hash,
        first_name: "Admin",
        last_name: "User",
        company: None,
        role: Role::Admin,
        is_email_verified: true,
        verification_token: None,
    })?;

    info!("Created bootstrap admin {}", email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeding_twice_keeps_one_admin() {
        let db = Database::open_in_memory().unwrap();
        let seed = AdminSeed {
            email: "Root@Example.com".into(),
            password: "admin-password".into(),
        };

        seed_admin(&db, &seed).unwrap();
        seed_admin(&db, &seed).unwrap();

        let row = db.get_user_by_email("root@example.com").unwrap().unwrap();
        assert_eq!(row.role().unwrap(), Role::Admin);
        assert!(row.is_email_verified);
        assert!(row.is_active);
    }
}
