//! User, session and billing-index storage.
//!
//! All functions are blocking; call them from `spawn_blocking`.

use redb::{Database, ReadableDatabase, ReadableTable};
use uuid::Uuid;

use super::{decode, encode, tables};
use crate::error::{AppError, Result};
use crate::models::{SessionRecord, Tier, User, UserRecord};
use crate::security::{generate_session_token, hash_password, verify_password};

/// Fields collected at registration
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub password: &'a str,
}

/// Create a user on the free tier
///
/// Returns `UserAlreadyExists` if the email is taken.
pub fn create_user(db: &Database, new_user: NewUser<'_>, pepper: &str, now: i64) -> Result<User> {
    let email = User::normalize_email(new_user.email);
    let user_id = Uuid::new_v4().to_string();

    let record = UserRecord {
        email: email.clone(),
        name: new_user.name.trim().to_string(),
        password_hash: hash_password(new_user.password, pepper)?,
        tier: Tier::Free,
        stripe_customer_id: None,
        stripe_subscription_id: None,
        paypal_subscription_id: None,
        created_at: now,
    };

    let write_txn = db.begin_write()?;
    {
        let mut by_email = write_txn.open_table(tables::USERS_BY_EMAIL)?;
        if by_email.get(email.as_str())?.is_some() {
            tracing::info!("Registration attempt for existing email");
            return Err(AppError::UserAlreadyExists);
        }
        by_email.insert(email.as_str(), user_id.as_str())?;

        let mut users = write_txn.open_table(tables::USERS)?;
        let bytes = encode(&record)?;
        users.insert(user_id.as_str(), bytes.as_slice())?;
    }
    write_txn.commit()?;

    tracing::info!("New user registered: {}", user_id);

    Ok(User::from_record(&user_id, &record))
}

/// Load a user record by id
pub fn find_user(db: &Database, user_id: &str) -> Result<Option<UserRecord>> {
    let read_txn = db.begin_read()?;
    let users = read_txn.open_table(tables::USERS)?;
    users
        .get(user_id)?
        .map(|bytes| decode(bytes.value()))
        .transpose()
}

/// Resolve a user id from an email address
pub fn find_user_id_by_email(db: &Database, email: &str) -> Result<Option<String>> {
    let email = User::normalize_email(email);
    let read_txn = db.begin_read()?;
    let by_email = read_txn.open_table(tables::USERS_BY_EMAIL)?;
    Ok(by_email
        .get(email.as_str())?
        .map(|id| id.value().to_string()))
}

/// Check an email/password pair
///
/// Unknown email and wrong password both yield `InvalidCredentials`.
pub fn verify_credentials(db: &Database, email: &str, password: &str, pepper: &str) -> Result<User> {
    let user_id = find_user_id_by_email(db, email)?.ok_or(AppError::InvalidCredentials)?;
    let record = find_user(db, &user_id)?.ok_or(AppError::InvalidCredentials)?;

    if !verify_password(password, &record.password_hash, pepper) {
        tracing::warn!("Failed login for user {}", user_id);
        return Err(AppError::InvalidCredentials);
    }

    Ok(User::from_record(&user_id, &record))
}

/// Open a session and return its bearer token
pub fn create_session(db: &Database, user_id: &str, now: i64, ttl_secs: i64) -> Result<String> {
    let token = generate_session_token();
    let record = SessionRecord {
        user_id: user_id.to_string(),
        created_at: now,
        expires_at: now + ttl_secs,
    };

    let write_txn = db.begin_write()?;
    {
        let mut sessions = write_txn.open_table(tables::SESSIONS)?;
        let bytes = encode(&record)?;
        sessions.insert(token.as_str(), bytes.as_slice())?;
    }
    write_txn.commit()?;

    Ok(token)
}

/// Resolve a bearer token to its user id, ignoring expired sessions
pub fn resolve_session(db: &Database, token: &str, now: i64) -> Result<Option<String>> {
    let read_txn = db.begin_read()?;
    let sessions = read_txn.open_table(tables::SESSIONS)?;

    let Some(bytes) = sessions.get(token)? else {
        return Ok(None);
    };
    let record: SessionRecord = decode(bytes.value())?;

    if record.is_expired(now) {
        tracing::debug!("Expired session for user {}", record.user_id);
        return Ok(None);
    }

    Ok(Some(record.user_id))
}

/// Delete a session; returns whether it existed
pub fn revoke_session(db: &Database, token: &str) -> Result<bool> {
    let write_txn = db.begin_write()?;
    let existed = {
        let mut sessions = write_txn.open_table(tables::SESSIONS)?;
        let removed = sessions.remove(token)?;
        removed.is_some()
    };
    write_txn.commit()?;
    Ok(existed)
}

fn update_user<F>(db: &Database, user_id: &str, mutate: F) -> Result<UserRecord>
where
    F: FnOnce(&mut UserRecord),
{
    let write_txn = db.begin_write()?;
    let record = {
        let mut users = write_txn.open_table(tables::USERS)?;
        let mut record: UserRecord = match users.get(user_id)? {
            Some(bytes) => decode(bytes.value())?,
            None => return Err(AppError::UserNotFound),
        };

        mutate(&mut record);

        let bytes = encode(&record)?;
        users.insert(user_id, bytes.as_slice())?;
        record
    };
    write_txn.commit()?;
    Ok(record)
}

/// Change a user's tier
pub fn set_tier(db: &Database, user_id: &str, tier: Tier) -> Result<User> {
    let record = update_user(db, user_id, |record| record.tier = tier)?;
    tracing::info!("User {} tier set to {}", user_id, tier);
    Ok(User::from_record(user_id, &record))
}

/// Apply a completed checkout: set the tier and remember the billing ids
pub fn apply_checkout(
    db: &Database,
    user_id: &str,
    tier: Tier,
    customer_id: Option<&str>,
    subscription_id: Option<&str>,
) -> Result<()> {
    let write_txn = db.begin_write()?;
    {
        let mut users = write_txn.open_table(tables::USERS)?;
        let mut record: UserRecord = match users.get(user_id)? {
            Some(bytes) => decode(bytes.value())?,
            None => return Err(AppError::UserNotFound),
        };

        record.tier = tier;
        if let Some(customer_id) = customer_id {
            record.stripe_customer_id = Some(customer_id.to_string());
        }
        if let Some(subscription_id) = subscription_id {
            record.stripe_subscription_id = Some(subscription_id.to_string());
        }

        let bytes = encode(&record)?;
        users.insert(user_id, bytes.as_slice())?;

        if let Some(customer_id) = customer_id {
            let mut customers = write_txn.open_table(tables::STRIPE_CUSTOMERS)?;
            customers.insert(customer_id, user_id)?;
        }
    }
    write_txn.commit()?;

    tracing::info!("User {} upgraded to {}", user_id, tier);
    Ok(())
}

/// Apply a verified PayPal subscription: set the tier and remember its id
pub fn apply_paypal_subscription(
    db: &Database,
    user_id: &str,
    tier: Tier,
    subscription_id: &str,
) -> Result<User> {
    let record = update_user(db, user_id, |record| {
        record.tier = tier;
        record.paypal_subscription_id = Some(subscription_id.to_string());
    })?;
    tracing::info!(
        "User {} subscribed to {} via PayPal ({})",
        user_id,
        tier,
        subscription_id
    );
    Ok(User::from_record(user_id, &record))
}

/// Resolve the user owning a Stripe customer id
pub fn find_user_id_by_customer(db: &Database, customer_id: &str) -> Result<Option<String>> {
    let read_txn = db.begin_read()?;
    let customers = read_txn.open_table(tables::STRIPE_CUSTOMERS)?;
    Ok(customers
        .get(customer_id)?
        .map(|id| id.value().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_database;
    use tempfile::TempDir;

    const PEPPER: &str = "pepper";

    fn new_user<'a>(email: &'a str) -> NewUser<'a> {
        NewUser {
            email,
            name: "Ada",
            password: "secret123",
        }
    }

    #[test]
    fn test_create_and_login() {
        let dir = TempDir::new().unwrap();
        let db = open_database(dir.path().join("test.db")).unwrap();

        let user = create_user(&db, new_user("Ada@Example.com "), PEPPER, 100).unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.tier, Tier::Free);

        let record = find_user(&db, &user.id).unwrap().unwrap();
        assert!(record.password_hash.starts_with("$argon2id$"));
        assert!(!record.password_hash.contains("secret123"));

        let logged_in = verify_credentials(&db, "ada@example.com", "secret123", PEPPER).unwrap();
        assert_eq!(logged_in.id, user.id);

        assert!(matches!(
            verify_credentials(&db, "ada@example.com", "wrong", PEPPER),
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            verify_credentials(&db, "nobody@example.com", "secret123", PEPPER),
            Err(AppError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let dir = TempDir::new().unwrap();
        let db = open_database(dir.path().join("test.db")).unwrap();

        create_user(&db, new_user("ada@example.com"), PEPPER, 100).unwrap();
        assert!(matches!(
            create_user(&db, new_user("ADA@example.com"), PEPPER, 101),
            Err(AppError::UserAlreadyExists)
        ));
    }

    #[test]
    fn test_session_lifecycle() {
        let dir = TempDir::new().unwrap();
        let db = open_database(dir.path().join("test.db")).unwrap();

        let token = create_session(&db, "user-1", 1000, 60).unwrap();
        assert_eq!(
            resolve_session(&db, &token, 1059).unwrap().as_deref(),
            Some("user-1")
        );
        assert_eq!(resolve_session(&db, &token, 1060).unwrap(), None);
        assert_eq!(resolve_session(&db, "unknown", 1000).unwrap(), None);

        assert!(revoke_session(&db, &token).unwrap());
        assert!(!revoke_session(&db, &token).unwrap());
        assert_eq!(resolve_session(&db, &token, 1001).unwrap(), None);
    }

    #[test]
    fn test_checkout_indexes_customer() {
        let dir = TempDir::new().unwrap();
        let db = open_database(dir.path().join("test.db")).unwrap();
        let user = create_user(&db, new_user("ada@example.com"), PEPPER, 100).unwrap();

        apply_checkout(&db, &user.id, Tier::Pro, Some("cus_123"), Some("sub_9")).unwrap();

        let record = find_user(&db, &user.id).unwrap().unwrap();
        assert_eq!(record.tier, Tier::Pro);
        assert_eq!(record.stripe_subscription_id.as_deref(), Some("sub_9"));
        assert_eq!(
            find_user_id_by_customer(&db, "cus_123").unwrap(),
            Some(user.id.clone())
        );

        set_tier(&db, &user.id, Tier::Free).unwrap();
        assert_eq!(find_user(&db, &user.id).unwrap().unwrap().tier, Tier::Free);
    }

    #[test]
    fn test_paypal_subscription_sets_tier() {
        let dir = TempDir::new().unwrap();
        let db = open_database(dir.path().join("test.db")).unwrap();
        let user = create_user(&db, new_user("ada@example.com"), PEPPER, 100).unwrap();

        let updated = apply_paypal_subscription(&db, &user.id, Tier::Premium, "I-ABC").unwrap();
        assert_eq!(updated.tier, Tier::Premium);

        let record = find_user(&db, &user.id).unwrap().unwrap();
        assert_eq!(record.paypal_subscription_id.as_deref(), Some("I-ABC"));
        assert!(matches!(
            apply_paypal_subscription(&db, "missing", Tier::Pro, "I-ABC"),
            Err(AppError::UserNotFound)
        ));
    }

    #[test]
    fn test_set_tier_unknown_user() {
        let dir = TempDir::new().unwrap();
        let db = open_database(dir.path().join("test.db")).unwrap();
        assert!(matches!(
            set_tier(&db, "missing", Tier::Pro),
            Err(AppError::UserNotFound)
        ));
    }
}
