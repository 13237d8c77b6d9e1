use crate::{
    entities::{roles, user_profiles, user_roles, users},
    error::{ServiceError, ServiceResult},
};
use argon2::{
    Argon2, PasswordVerifier,
    password_hash::{PasswordHash, PasswordHasher, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use log::{info, warn};
use models::{
    auth::{AuthContext, RoleName},
    status::UserStatus,
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait, TryIntoModel, sea_query::OnConflict,
};
use serde::{Deserialize, Serialize};

/// Minimum number of characters in a password
pub const MIN_PASSWORD_LEN: usize = 6;

/// A user who has just proven their credentials
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: users::Model,
    pub roles: Vec<RoleName>,
}

impl AuthenticatedUser {
    pub fn context(&self) -> AuthContext {
        AuthContext {
            user_id: self.user.id,
            username: self.user.username.clone(),
            roles: self.roles.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub user: users::Model,
    pub profile: Option<user_profiles::Model>,
    pub roles: Vec<RoleName>,
}

/// Editable profile fields. Blank values clear the field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub bio: Option<String>,
    pub location: Option<String>,
    pub occupation: Option<String>,
    pub gender: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn hash_password(password: &str) -> ServiceResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::PasswordHash(e.to_string()))
}

fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash could not be parsed: {e}");
            false
        }
    }
}

pub struct IdentityService;

impl IdentityService {
    /// Creates an account with an empty profile and the student role.
    /// Returns the new user id.
    pub async fn register(
        db: &DatabaseConnection,
        username: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> ServiceResult<i64> {
        let username = username.trim();
        let email = email.trim();

        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(ServiceError::validation(
                "Please fill in all required fields",
            ));
        }
        if password != confirm_password {
            return Err(ServiceError::validation("Passwords do not match"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ServiceError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let password_hash = hash_password(password)?;

        let txn = db.begin().await?;

        // The unique indexes on username and email decide duplicates
        let user = users::ActiveModel {
            username: Set(username.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(password_hash),
            phone: Set(None),
            status: Set(UserStatus::Active),
            created_at: Set(Utc::now().naive_utc()),
            last_login: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| ServiceError::from_unique_violation(e, "Username or email already exists"))?;

        user_profiles::ActiveModel {
            user_id: Set(user.id),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        Self::grant_role(&txn, user.id, RoleName::Student).await?;

        txn.commit().await?;

        info!("Registered user {} ({})", user.id, user.username);
        Ok(user.id)
    }

    /// Checks credentials, records the login time and returns the user with
    /// their roles
    pub async fn authenticate(
        db: &DatabaseConnection,
        email: &str,
        password: &str,
    ) -> ServiceResult<AuthenticatedUser> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(ServiceError::validation("Please enter email and password"));
        }

        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(db)
            .await?
            .ok_or(ServiceError::Auth)?;

        if !verify_password(password, &user.password_hash) {
            return Err(ServiceError::Auth);
        }
        if user.status != UserStatus::Active {
            return Err(ServiceError::AccountDisabled);
        }

        let mut active: users::ActiveModel = user.into();
        active.last_login = Set(Some(Utc::now().naive_utc()));
        let user = active.update(db).await?;

        let roles = Self::roles_for_user(db, user.id).await?;

        info!("User {} signed in", user.id);
        Ok(AuthenticatedUser { user, roles })
    }

    /// Capability gate used in front of privileged operations
    pub fn require_any_role(ctx: &AuthContext, roles: &[RoleName]) -> ServiceResult<()> {
        if ctx.has_any_role(roles) {
            Ok(())
        } else {
            Err(ServiceError::forbidden("Access denied"))
        }
    }

    pub async fn roles_for_user<C: ConnectionTrait>(
        conn: &C,
        user_id: i64,
    ) -> ServiceResult<Vec<RoleName>> {
        let roles = roles::Entity::find()
            .inner_join(user_roles::Entity)
            .filter(user_roles::Column::UserId.eq(user_id))
            .order_by_asc(roles::Column::Id)
            .all(conn)
            .await?;

        Ok(roles.into_iter().map(|role| role.name).collect())
    }

    /// Adds a role to a user. Granting a role the user already has is a
    /// no-op.
    pub async fn grant_role<C: ConnectionTrait>(
        conn: &C,
        user_id: i64,
        role: RoleName,
    ) -> ServiceResult<()> {
        let role_row = roles::Entity::find()
            .filter(roles::Column::Name.eq(role))
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Role {role} is not defined")))?;

        user_roles::Entity::insert(user_roles::ActiveModel {
            user_id: Set(user_id),
            role_id: Set(role_row.id),
        })
        .on_conflict(
            OnConflict::columns([user_roles::Column::UserId, user_roles::Column::RoleId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

        Ok(())
    }

    pub async fn get_profile(db: &DatabaseConnection, user_id: i64) -> ServiceResult<ProfileView> {
        let user = users::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;

        let profile = user_profiles::Entity::find()
            .filter(user_profiles::Column::UserId.eq(user_id))
            .one(db)
            .await?;

        let roles = Self::roles_for_user(db, user_id).await?;

        Ok(ProfileView {
            user,
            profile,
            roles,
        })
    }

    pub async fn update_profile(
        db: &DatabaseConnection,
        user_id: i64,
        update: ProfileUpdate,
    ) -> ServiceResult<user_profiles::Model> {
        let existing = user_profiles::Entity::find()
            .filter(user_profiles::Column::UserId.eq(user_id))
            .one(db)
            .await?;

        // Accounts created before profiles existed get one lazily
        let mut active: user_profiles::ActiveModel = match existing {
            Some(profile) => profile.into(),
            None => user_profiles::ActiveModel {
                user_id: Set(user_id),
                ..Default::default()
            },
        };

        active.bio = Set(non_blank(update.bio));
        active.location = Set(non_blank(update.location));
        active.occupation = Set(non_blank(update.occupation));
        active.gender = Set(non_blank(update.gender));

        let profile = active.save(db).await?;
        let profile = profile.try_into_model()?;

        info!("Updated profile of user {user_id}");
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use sea_orm::PaginatorTrait;

    #[tokio::test]
    async fn test_register_then_login() {
        let db = testing::setup_db().await;

        let user_id = IdentityService::register(&db, "alice", "a@x.com", "secret1", "secret1")
            .await
            .unwrap();

        let profiles = user_profiles::Entity::find()
            .filter(user_profiles::Column::UserId.eq(user_id))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(profiles, 1);

        let role_rows = user_roles::Entity::find()
            .filter(user_roles::Column::UserId.eq(user_id))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(role_rows, 1);

        let signed_in = IdentityService::authenticate(&db, "a@x.com", "secret1")
            .await
            .unwrap();
        assert_eq!(signed_in.user.id, user_id);
        assert_eq!(signed_in.roles, vec![RoleName::Student]);
        assert!(signed_in.user.last_login.is_some());
        assert_ne!(signed_in.user.password_hash, "secret1");
    }

    #[tokio::test]
    async fn test_register_validation() {
        let db = testing::setup_db().await;

        let cases = [
            ("", "a@x.com", "secret1", "secret1"),
            ("alice", "  ", "secret1", "secret1"),
            ("alice", "a@x.com", "secret1", "secret2"),
            ("alice", "a@x.com", "short", "short"),
        ];

        for (username, email, password, confirm) in cases {
            let result = IdentityService::register(&db, username, email, password, confirm).await;
            assert!(
                matches!(result, Err(ServiceError::Validation(_))),
                "expected validation error for {username:?}/{email:?}"
            );
        }

        assert_eq!(users::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_username_or_email_conflicts() {
        let db = testing::setup_db().await;

        IdentityService::register(&db, "alice", "a@x.com", "secret1", "secret1")
            .await
            .unwrap();

        let same_name = IdentityService::register(&db, "alice", "b@x.com", "secret1", "secret1").await;
        assert!(matches!(same_name, Err(ServiceError::Conflict(_))));

        let same_email = IdentityService::register(&db, "bob", "a@x.com", "secret1", "secret1").await;
        assert!(matches!(same_email, Err(ServiceError::Conflict(_))));

        // The failed registrations must not leave profile rows behind
        assert_eq!(user_profiles::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_authenticate_failures() {
        let db = testing::setup_db().await;
        let user_id = IdentityService::register(&db, "alice", "a@x.com", "secret1", "secret1")
            .await
            .unwrap();

        let wrong_password = IdentityService::authenticate(&db, "a@x.com", "secret2").await;
        assert!(matches!(wrong_password, Err(ServiceError::Auth)));

        let unknown = IdentityService::authenticate(&db, "nobody@x.com", "secret1").await;
        assert!(matches!(unknown, Err(ServiceError::Auth)));

        let user = users::Entity::find_by_id(user_id).one(&db).await.unwrap().unwrap();
        let mut active: users::ActiveModel = user.into();
        active.status = Set(UserStatus::Disabled);
        active.update(&db).await.unwrap();

        let disabled = IdentityService::authenticate(&db, "a@x.com", "secret1").await;
        assert!(matches!(disabled, Err(ServiceError::AccountDisabled)));
    }

    #[tokio::test]
    async fn test_grant_role_is_idempotent() {
        let db = testing::setup_db().await;
        let student = testing::insert_student(&db, "sam").await;

        IdentityService::grant_role(&db, student.user_id, RoleName::Instructor)
            .await
            .unwrap();
        IdentityService::grant_role(&db, student.user_id, RoleName::Instructor)
            .await
            .unwrap();

        let roles = IdentityService::roles_for_user(&db, student.user_id).await.unwrap();
        assert_eq!(roles, vec![RoleName::Student, RoleName::Instructor]);
    }

    #[test]
    fn test_require_any_role() {
        let ctx = AuthContext {
            user_id: 1,
            username: "sam".to_string(),
            roles: vec![RoleName::Student],
        };
        assert!(matches!(
            IdentityService::require_any_role(&ctx, &models::auth::CATALOG_EDITORS),
            Err(ServiceError::Forbidden(_))
        ));
        assert!(IdentityService::require_any_role(&ctx, &[RoleName::Student]).is_ok());
    }

    #[tokio::test]
    async fn test_update_profile() {
        let db = testing::setup_db().await;
        let user_id = IdentityService::register(&db, "alice", "a@x.com", "secret1", "secret1")
            .await
            .unwrap();

        IdentityService::update_profile(
            &db,
            user_id,
            ProfileUpdate {
                bio: Some("Rustacean".to_string()),
                location: Some("  ".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let view = IdentityService::get_profile(&db, user_id).await.unwrap();
        let profile = view.profile.unwrap();
        assert_eq!(profile.bio.as_deref(), Some("Rustacean"));
        assert_eq!(profile.location, None);
        assert_eq!(view.roles, vec![RoleName::Student]);
    }
}
