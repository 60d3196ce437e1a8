use crate::{
    auth::{
        auth::{AuthUser, bearer_token},
        jwt::{generate_token, verify_token},
        password::verify_password,
    },
    clocking::tracker::AttendanceTracker,
    config::Config,
    error::AppError,
    model::{attendance::OWNER_USER_ID, role::Role},
    models::{LoginReqDto, TokenPair, TokenType},
    repository::{AttendanceStore, IdentityStore},
};
use actix_web::{HttpRequest, HttpResponse, Responder, get, web};
use tracing::{debug, info, instrument};

fn invalid_credentials() -> AppError {
    AppError::Unauthenticated("Invalid credentials".into())
}

/// Resolves a login email to a store identity.
///
/// A store's own email makes the caller its owner, using the owner's staff
/// row id when one exists in that store. Any other email must belong to a
/// staff row.
async fn resolve_identity<S: IdentityStore>(
    store: &S,
    email: &str,
    password: &str,
) -> Result<AuthUser, AppError> {
    if let Some(owned) = store.find_store_by_email(email).await? {
        if !verify_password(password, &owned.password_hash) {
            return Err(invalid_credentials());
        }

        let user_id = store
            .find_staff_by_email(email, Some(owned.id))
            .await?
            .map_or(OWNER_USER_ID, |staff| staff.id);
        debug!(store_id = owned.id, user_id, "Resolved store owner");

        return Ok(AuthUser {
            email: email.to_string(),
            store_id: owned.id,
            user_id,
            role: Role::StoreOwner,
        });
    }

    let staff = store
        .find_staff_by_email(email, None)
        .await?
        .ok_or_else(invalid_credentials)?;
    if !verify_password(password, &staff.password_hash) {
        return Err(invalid_credentials());
    }
    debug!(store_id = staff.store_id, user_id = staff.id, "Resolved staff member");

    Ok(AuthUser {
        email: email.to_string(),
        store_id: staff.store_id,
        user_id: staff.id,
        role: Role::Staff,
    })
}

/// Issues an access token plus a stored refresh token for `user`.
async fn issue_tokens<S: IdentityStore>(
    store: &S,
    user: &AuthUser,
    config: &Config,
) -> Result<TokenPair, AppError> {
    let (access_token, _) = generate_token(
        user,
        TokenType::Access,
        &config.jwt_secret,
        config.access_token_ttl,
    )?;
    let (refresh_token, refresh_claims) = generate_token(
        user,
        TokenType::Refresh,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )?;

    store
        .store_refresh_token(&user.email, &refresh_claims.jti, refresh_claims.exp as i64)
        .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Log in as a store owner or staff member
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in", body = TokenPair),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(tracker, config, user),
    fields(email = %user.email)
)]
pub async fn login<S: AttendanceStore + IdentityStore + 'static>(
    user: web::Json<LoginReqDto>,
    tracker: web::Data<AttendanceTracker<S>>,
    config: web::Data<Config>,
) -> Result<impl Responder, AppError> {
    info!("Login request received");

    let email = user.email.trim().to_lowercase();
    if email.is_empty() || user.password.is_empty() {
        return Err(AppError::BadRequest("Email and password required".into()));
    }

    let identity = resolve_identity(tracker.store(), &email, &user.password)
        .await
        .inspect_err(|e| info!(error = %e, "Login rejected"))?;
    let tokens = issue_tokens(tracker.store(), &identity, &config).await?;

    info!(store_id = identity.store_id, role = %identity.role, "Login successful");
    Ok(HttpResponse::Ok().json(tokens))
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Missing, revoked or expired refresh token")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
pub async fn refresh_token<S: AttendanceStore + IdentityStore + 'static>(
    req: HttpRequest,
    tracker: web::Data<AttendanceTracker<S>>,
    config: web::Data<Config>,
) -> Result<impl Responder, AppError> {
    let claims = verify_token(bearer_token(&req)?, &config.jwt_secret)?;
    if claims.token_type != TokenType::Refresh {
        return Err(AppError::Unauthenticated("Refresh token required".into()));
    }

    // Rotation: each refresh token works exactly once
    if !tracker.store().revoke_refresh_token(&claims.jti).await? {
        info!(jti = %claims.jti, "Refresh token reuse or unknown token");
        return Err(AppError::Unauthenticated("Invalid or expired token".into()));
    }

    let role = Role::from_id(claims.role)
        .ok_or_else(|| AppError::Unauthenticated("Invalid role".into()))?;
    let identity = AuthUser {
        email: claims.sub,
        store_id: claims.store_id,
        user_id: claims.user_id,
        role,
    };

    Ok(HttpResponse::Ok().json(issue_tokens(tracker.store(), &identity, &config).await?))
}

/// Revoke a refresh token
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Logged out (also when the token was unknown)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
pub async fn logout<S: AttendanceStore + IdentityStore + 'static>(
    req: HttpRequest,
    tracker: web::Data<AttendanceTracker<S>>,
    config: web::Data<Config>,
) -> impl Responder {
    let claims = bearer_token(&req).and_then(|t| verify_token(t, &config.jwt_secret));

    // only refresh tokens can logout; revocation is idempotent
    if let Ok(claims) = claims {
        if claims.token_type == TokenType::Refresh {
            let _ = tracker.store().revoke_refresh_token(&claims.jti).await;
        }
    }

    HttpResponse::NoContent().finish()
}

/// Identity carried by the current access token
#[utoipa::path(
    get,
    path = "/api/whoami",
    responses(
        (status = 200, description = "Authenticated identity", body = AuthUser),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
#[get("/whoami")]
pub async fn whoami(auth: AuthUser) -> impl Responder {
    HttpResponse::Ok().json(auth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clocking::policy::ClockingPolicy;
    use crate::model::{store::Store, store_user::StoreUser};
    use crate::repository::memory::MemoryStore;
    use actix_web::{App, http::StatusCode, test};
    use argon2::{
        Argon2,
        password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
    };
    use std::time::Duration;

    fn hash(password: &str) -> String {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .unwrap()
            .to_string()
    }

    fn staff(id: u64, store_id: u64, email: &str) -> StoreUser {
        StoreUser {
            id,
            store_id,
            full_name: "Jane Doe".into(),
            email_address: email.into(),
            password_hash: hash("staff-pass"),
        }
    }

    fn shop(id: u64, email: &str) -> Store {
        Store {
            id,
            name: format!("Shop {id}"),
            email_address: email.into(),
            password_hash: hash("owner-pass"),
        }
    }

    /// Store 7 whose owner also has a staff row, store 8 whose owner has none.
    fn directory() -> MemoryStore {
        MemoryStore::with_staff(vec![
            staff(3, 7, "jane@example.com"),
            staff(4, 7, "owner7@example.com"),
        ])
        .with_stores(vec![shop(7, "owner7@example.com"), shop(8, "owner8@example.com")])
    }

    #[actix_web::test]
    async fn store_email_logs_in_as_owner() {
        let store = directory();

        let owner = resolve_identity(&store, "owner7@example.com", "owner-pass")
            .await
            .unwrap();
        assert_eq!(owner.role, Role::StoreOwner);
        assert_eq!((owner.store_id, owner.user_id), (7, 4));

        let bare = resolve_identity(&store, "owner8@example.com", "owner-pass")
            .await
            .unwrap();
        assert_eq!(bare.role, Role::StoreOwner);
        assert_eq!((bare.store_id, bare.user_id), (8, OWNER_USER_ID));
    }

    #[actix_web::test]
    async fn owner_must_use_the_store_password() {
        let store = directory();
        let err = resolve_identity(&store, "owner7@example.com", "staff-pass")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));
    }

    #[actix_web::test]
    async fn other_emails_must_be_staff() {
        let store = directory();

        let jane = resolve_identity(&store, "jane@example.com", "staff-pass")
            .await
            .unwrap();
        assert_eq!(jane.role, Role::Staff);
        assert_eq!((jane.store_id, jane.user_id), (7, 3));

        for (email, password) in [
            ("jane@example.com", "owner-pass"),
            ("nobody@example.com", "staff-pass"),
        ] {
            let err = resolve_identity(&store, email, password).await.unwrap_err();
            assert!(matches!(err, AppError::Unauthenticated(_)), "{email}");
        }
    }

    #[actix_web::test]
    async fn lookup_failures_are_not_credentials_errors() {
        let store = directory();
        store
            .fail_lookups
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let err = resolve_identity(&store, "jane@example.com", "staff-pass")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }

    macro_rules! app {
        ($tracker:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(Config::for_tests()))
                    .app_data($tracker.clone())
                    .route("/auth/login", web::post().to(login::<MemoryStore>))
                    .route("/auth/refresh", web::post().to(refresh_token::<MemoryStore>)),
            )
            .await
        };
    }

    fn tracker() -> web::Data<AttendanceTracker<MemoryStore>> {
        web::Data::new(AttendanceTracker::new(
            directory(),
            ClockingPolicy::default(),
            Duration::from_secs(60),
        ))
    }

    #[actix_web::test]
    async fn login_issues_tokens_and_refresh_rotates_them() {
        let tracker = tracker();
        let app = app!(tracker);
        let config = Config::for_tests();

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(serde_json::json!({
                "email": " Owner8@Example.com ",
                "password": "owner-pass"
            }))
            .to_request();
        let tokens: TokenPair = test::call_and_read_body_json(&app, req).await;
        let claims = verify_token(&tokens.access_token, &config.jwt_secret).unwrap();
        assert_eq!(claims.store_id, 8);
        assert_eq!(claims.user_id, OWNER_USER_ID);
        assert_eq!(claims.role, Role::StoreOwner.id());
        assert_eq!(tracker.store().live_refresh_tokens(), 1);

        let refresh = || {
            test::TestRequest::post()
                .uri("/auth/refresh")
                .insert_header(("Authorization", format!("Bearer {}", tokens.refresh_token)))
                .to_request()
        };
        let resp = test::call_service(&app, refresh()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(tracker.store().live_refresh_tokens(), 1);

        // each refresh token works once
        let resp = test::call_service(&app, refresh()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn login_rejects_bad_input_and_credentials() {
        let tracker = tracker();
        let app = app!(tracker);

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(serde_json::json!({ "email": "  ", "password": "x" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(serde_json::json!({
                "email": "jane@example.com",
                "password": "wrong"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Invalid credentials");
        assert_eq!(tracker.store().live_refresh_tokens(), 0);
    }
}
