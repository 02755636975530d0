use chirpy_types::models::{Chirp, RefreshToken, User, ValidationError, clean_chirp_body, normalize_email};
use tracing::info;

use crate::error::{Result, StoreError};
use crate::ids::EntityKind;
use crate::models::Document;
use crate::Database;

impl Database {
    // -- Chirps --

    /// Validate and mask `body`, then store it under a fresh id.
    pub fn create_chirp(&self, user_id: i64, body: &str) -> Result<Chirp> {
        let body = clean_chirp_body(body)?;
        self.mutate(|doc, ids| {
            let chirp = Chirp {
                id: ids.next(EntityKind::Chirp)?,
                body,
                user_id,
            };
            doc.chirps.insert(chirp.id, chirp.clone());
            Ok(chirp)
        })
    }

    /// All chirps in ascending id order, optionally only those by `author_id`.
    pub fn get_chirps(&self, author_id: Option<i64>) -> Result<Vec<Chirp>> {
        self.read(|doc| {
            Ok(doc
                .chirps
                .values()
                .filter(|c| author_id.is_none_or(|id| c.user_id == id))
                .cloned()
                .collect())
        })
    }

    pub fn get_chirp(&self, id: i64) -> Result<Chirp> {
        self.read(|doc| doc.chirps.get(&id).cloned().ok_or(StoreError::NotFound))
    }

    /// Returns whether a chirp was removed. Deleting an absent id is not an error.
    pub fn delete_chirp(&self, id: i64) -> Result<bool> {
        self.mutate(|doc, _| Ok(doc.chirps.remove(&id).is_some()))
    }

    // -- Users --

    /// Create a user. The email is normalized and checked for uniqueness
    /// before an id is allocated, so a rejected create doesn't burn an id.
    pub fn create_user(&self, email: &str, password_hash: &str) -> Result<User> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(ValidationError::EmptyEmail.into());
        }

        let user = self.mutate(|doc, ids| {
            if find_user_by_email(doc, &email).is_some() {
                return Err(StoreError::DuplicateEmail);
            }
            let user = User {
                id: ids.next(EntityKind::User)?,
                email,
                password_hash: password_hash.to_string(),
                is_chirpy_red: false,
            };
            doc.users.insert(user.id, user.clone());
            Ok(user)
        })?;

        info!("Created user {}", user.id);
        Ok(user)
    }

    pub fn get_users(&self) -> Result<Vec<User>> {
        self.read(|doc| Ok(doc.users.values().cloned().collect()))
    }

    pub fn get_user(&self, id: i64) -> Result<User> {
        self.read(|doc| doc.users.get(&id).cloned().ok_or(StoreError::NotFound))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<User> {
        let email = normalize_email(email);
        self.read(|doc| find_user_by_email(doc, &email).cloned().ok_or(StoreError::NotFound))
    }

    /// Replace the stored user with the same id. The write happens even if
    /// nothing changed.
    pub fn update_user(&self, user: User) -> Result<User> {
        let user = User {
            email: normalize_email(&user.email),
            ..user
        };
        if user.email.is_empty() {
            return Err(ValidationError::EmptyEmail.into());
        }

        self.mutate(|doc, _| {
            if !doc.users.contains_key(&user.id) {
                return Err(StoreError::NotFound);
            }
            if find_user_by_email(doc, &user.email).is_some_and(|other| other.id != user.id) {
                return Err(StoreError::DuplicateEmail);
            }
            doc.users.insert(user.id, user.clone());
            Ok(user)
        })
    }

    /// Change a user's email and password digest in place. Other fields keep
    /// whatever value is on disk at the time of the write.
    pub fn update_credentials(&self, id: i64, email: &str, password_hash: &str) -> Result<User> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(ValidationError::EmptyEmail.into());
        }

        let user = self.mutate(|doc, _| {
            if find_user_by_email(doc, &email).is_some_and(|other| other.id != id) {
                return Err(StoreError::DuplicateEmail);
            }
            let user = doc.users.get_mut(&id).ok_or(StoreError::NotFound)?;
            user.email = email;
            user.password_hash = password_hash.to_string();
            Ok(user.clone())
        })?;

        info!("Updated credentials for user {}", user.id);
        Ok(user)
    }

    pub fn set_chirpy_red(&self, user_id: i64, is_chirpy_red: bool) -> Result<User> {
        self.mutate(|doc, _| {
            let user = doc.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
            user.is_chirpy_red = is_chirpy_red;
            Ok(user.clone())
        })
    }

    // -- Refresh tokens --

    /// Store `token` as its owner's only refresh token, replacing any previous one.
    pub fn save_refresh_token(&self, token: RefreshToken) -> Result<RefreshToken> {
        self.mutate(|doc, _| {
            doc.tokens.insert(token.user_id, token.clone());
            Ok(token)
        })
    }

    pub fn get_refresh_token(&self, token: &str) -> Result<RefreshToken> {
        self.read(|doc| find_refresh_token(doc, token).cloned().ok_or(StoreError::NotFound))
    }

    /// Returns whether a token was removed. Same idempotent policy as `delete_chirp`.
    pub fn delete_refresh_token(&self, token: &str) -> Result<bool> {
        self.mutate(|doc, _| {
            let owner = find_refresh_token(doc, token).map(|t| t.user_id);
            Ok(owner.is_some_and(|id| doc.tokens.remove(&id).is_some()))
        })
    }
}

fn find_user_by_email<'a>(doc: &'a Document, email: &str) -> Option<&'a User> {
    doc.users.values().find(|u| u.email == email)
}

fn find_refresh_token<'a>(doc: &'a Document, token: &str) -> Option<&'a RefreshToken> {
    doc.tokens.values().find(|t| t.token == token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::collections::HashSet;
    use std::fs;
    use tempfile::TempDir;

    fn open(dir: &TempDir) -> Database {
        Database::open(&dir.path().join("database.json"), false).unwrap()
    }

    fn token_for(user_id: i64, token: &str) -> RefreshToken {
        RefreshToken {
            user_id,
            token: token.to_string(),
            expires_at: Utc::now() + Duration::days(60),
        }
    }

    #[test]
    fn chirp_ids_strictly_increase_and_survive_deletes() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);

        let first = db.create_chirp(1, "one").unwrap();
        let second = db.create_chirp(1, "two").unwrap();
        assert!(db.delete_chirp(second.id).unwrap());
        let third = db.create_chirp(1, "three").unwrap();

        assert_eq!((first.id, second.id, third.id), (1, 2, 3));
    }

    #[test]
    fn create_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);

        let chirp = db.create_chirp(7, "hello fornax world").unwrap();
        assert_eq!(chirp.body, "hello **** world");
        assert_eq!(db.get_chirp(chirp.id).unwrap(), chirp);
    }

    #[test]
    fn overlong_chirp_is_rejected_without_allocating() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);

        let err = db.create_chirp(1, &"x".repeat(141)).unwrap_err();
        assert!(matches!(err, StoreError::Validation(ValidationError::ChirpTooLong)));
        assert_eq!(db.ids().last(EntityKind::Chirp).unwrap(), 0);
    }

    #[test]
    fn get_chirps_filters_by_author_in_id_order() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        for (author, body) in [(1, "a"), (2, "b"), (1, "c"), (2, "d")] {
            db.create_chirp(author, body).unwrap();
        }

        let all: Vec<_> = db.get_chirps(None).unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(all, vec![1, 2, 3, 4]);

        let by_two: Vec<_> = db.get_chirps(Some(2)).unwrap().into_iter().map(|c| c.body).collect();
        assert_eq!(by_two, vec!["b", "d"]);
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        let chirp = db.create_chirp(1, "bye").unwrap();
        db.create_chirp(1, "stay").unwrap();

        assert!(db.delete_chirp(chirp.id).unwrap());
        let after_one = fs::read(db.path()).unwrap();
        assert!(!db.delete_chirp(chirp.id).unwrap());
        let after_two = fs::read(db.path()).unwrap();

        assert_eq!(after_one, after_two);
        assert!(matches!(db.get_chirp(chirp.id), Err(StoreError::NotFound)));
    }

    #[test]
    fn duplicate_email_is_rejected_before_allocating() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);

        let user = db.create_user("Saul@Bettercall.com", "hash").unwrap();
        assert_eq!(user.email, "saul@bettercall.com");

        let err = db.create_user("  SAUL@bettercall.com", "hash").unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
        assert_eq!(db.ids().last(EntityKind::User).unwrap(), 1);

        let next = db.create_user("kim@wexler.com", "hash").unwrap();
        assert_eq!(next.id, 2);
    }

    #[test]
    fn empty_email_is_a_validation_failure() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        assert!(matches!(db.create_user("   ", "hash"), Err(StoreError::Validation(_))));
    }

    #[test]
    fn user_lookup_by_normalized_email() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        let user = db.create_user("walt@jpwynne.edu", "hash").unwrap();

        assert_eq!(db.get_user_by_email("WALT@jpwynne.edu").unwrap(), user);
        assert!(matches!(db.get_user_by_email("jesse@jpwynne.edu"), Err(StoreError::NotFound)));
    }

    #[test]
    fn get_users_lists_in_id_order() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        for email in ["c@x.io", "a@x.io", "b@x.io"] {
            db.create_user(email, "h").unwrap();
        }

        let emails: Vec<_> = db.get_users().unwrap().into_iter().map(|u| u.email).collect();
        assert_eq!(emails, vec!["c@x.io", "a@x.io", "b@x.io"]);
        assert!(matches!(db.get_user(4), Err(StoreError::NotFound)));
    }

    #[test]
    fn update_user_replaces_fields() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        let user = db.create_user("a@example.com", "old").unwrap();

        let updated = db
            .update_user(User {
                email: "B@example.com".into(),
                password_hash: "new".into(),
                ..user.clone()
            })
            .unwrap();

        assert_eq!(updated.email, "b@example.com");
        assert_eq!(db.get_user(user.id).unwrap(), updated);
    }

    #[test]
    fn update_user_rejects_taken_email_and_unknown_id() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        let a = db.create_user("a@example.com", "h").unwrap();
        db.create_user("b@example.com", "h").unwrap();

        let taken = User { email: "b@example.com".into(), ..a.clone() };
        assert!(matches!(db.update_user(taken), Err(StoreError::DuplicateEmail)));

        // keeping your own email is fine
        assert!(db.update_user(a.clone()).is_ok());

        let ghost = User { id: 99, ..a };
        assert!(matches!(db.update_user(ghost), Err(StoreError::NotFound)));
    }

    #[test]
    fn update_credentials_keeps_premium_flag_set_in_between() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        let user = db.create_user("walt@bb.com", "h1").unwrap();

        // the webhook lands after the caller last looked at the record
        let seen = db.get_user(user.id).unwrap();
        db.set_chirpy_red(user.id, true).unwrap();
        assert!(!seen.is_chirpy_red);

        let updated = db.update_credentials(user.id, "Heis@BB.com", "h2").unwrap();
        assert_eq!(updated.email, "heis@bb.com");
        assert_eq!(updated.password_hash, "h2");
        assert!(updated.is_chirpy_red);
        assert_eq!(db.get_user(user.id).unwrap(), updated);
    }

    #[test]
    fn update_credentials_rejects_taken_email_and_unknown_id() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        let a = db.create_user("a@example.com", "h").unwrap();
        db.create_user("b@example.com", "h").unwrap();

        assert!(matches!(
            db.update_credentials(a.id, "B@example.com", "x"),
            Err(StoreError::DuplicateEmail)
        ));
        assert_eq!(db.get_user(a.id).unwrap(), a);

        assert!(db.update_credentials(a.id, "a@example.com", "x").is_ok());
        assert!(matches!(db.update_credentials(99, "c@example.com", "x"), Err(StoreError::NotFound)));
        assert!(matches!(
            db.update_credentials(a.id, "  ", "x"),
            Err(StoreError::Validation(ValidationError::EmptyEmail))
        ));
    }

    #[test]
    fn concurrent_credential_updates_and_upgrades_both_stick() {
        const USERS: usize = 8;
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        let users: Vec<User> = (0..USERS)
            .map(|i| db.create_user(&format!("user{i}@x.io"), "h").unwrap())
            .collect();

        std::thread::scope(|s| {
            for user in &users {
                let db = &db;
                s.spawn(move || db.set_chirpy_red(user.id, true).unwrap());
                s.spawn(move || {
                    db.update_credentials(user.id, &format!("new{}@x.io", user.id), "h2")
                        .unwrap()
                });
            }
        });

        for user in db.get_users().unwrap() {
            assert!(user.is_chirpy_red);
            assert_eq!(user.email, format!("new{}@x.io", user.id));
            assert_eq!(user.password_hash, "h2");
        }
    }

    #[test]
    fn concurrent_creates_with_same_email_admit_one() {
        const WRITERS: usize = 16;
        let dir = TempDir::new().unwrap();
        let db = open(&dir);

        let results: Vec<Result<User>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..WRITERS)
                .map(|i| {
                    let db = &db;
                    // same address once normalized
                    let email = if i % 2 == 0 { " Walt@JPWynne.edu" } else { "walt@jpwynne.edu " };
                    s.spawn(move || db.create_user(email, "h"))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let created = results.iter().filter(|r| r.is_ok()).count();
        let duplicates = results
            .iter()
            .filter(|r| matches!(r, Err(StoreError::DuplicateEmail)))
            .count();
        assert_eq!(created, 1);
        assert_eq!(duplicates, WRITERS - 1);

        let users = db.get_users().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, "walt@jpwynne.edu");
        assert_eq!(users[0].id, 1);
    }

    #[test]
    fn set_chirpy_red_flips_flag() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        let user = db.create_user("a@example.com", "h").unwrap();

        assert!(db.set_chirpy_red(user.id, true).unwrap().is_chirpy_red);
        assert!(db.get_user(user.id).unwrap().is_chirpy_red);
        assert!(!db.set_chirpy_red(user.id, false).unwrap().is_chirpy_red);
        assert!(matches!(db.set_chirpy_red(42, true), Err(StoreError::NotFound)));
    }

    #[test]
    fn refresh_tokens_are_one_per_owner() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);

        db.save_refresh_token(token_for(1, "first")).unwrap();
        db.save_refresh_token(token_for(1, "second")).unwrap();
        db.save_refresh_token(token_for(2, "other")).unwrap();

        assert!(matches!(db.get_refresh_token("first"), Err(StoreError::NotFound)));
        assert_eq!(db.get_refresh_token("second").unwrap().user_id, 1);
        assert_eq!(db.read(|doc| Ok(doc.tokens.len())).unwrap(), 2);
    }

    #[test]
    fn delete_refresh_token_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        db.save_refresh_token(token_for(1, "abc")).unwrap();

        assert!(db.delete_refresh_token("abc").unwrap());
        assert!(!db.delete_refresh_token("abc").unwrap());
        assert!(matches!(db.get_refresh_token("abc"), Err(StoreError::NotFound)));
    }

    #[test]
    fn reopen_seeds_ids_from_disk() {
        let dir = TempDir::new().unwrap();
        {
            let db = open(&dir);
            db.create_chirp(1, "a").unwrap();
            db.create_chirp(1, "b").unwrap();
            db.create_user("a@example.com", "h").unwrap();
        }

        let db = open(&dir);
        assert_eq!(db.create_chirp(1, "c").unwrap().id, 3);
        assert_eq!(db.create_user("b@example.com", "h").unwrap().id, 2);
    }

    #[test]
    fn concurrent_creates_keep_every_record() {
        const WRITERS: usize = 16;
        let dir = TempDir::new().unwrap();
        let db = open(&dir);

        let ids: Vec<i64> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..WRITERS)
                .map(|i| {
                    let db = &db;
                    s.spawn(move || db.create_chirp(1, &format!("chirp {i}")).unwrap().id)
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let unique: HashSet<_> = ids.iter().copied().collect();
        assert_eq!(unique.len(), WRITERS);

        let stored = db.get_chirps(None).unwrap();
        assert_eq!(stored.len(), WRITERS);
        let stored_ids: HashSet<_> = stored.iter().map(|c| c.id).collect();
        assert_eq!(stored_ids, unique);
    }
}
