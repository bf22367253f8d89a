use crate::{
    api::employee::validate_pin,
    auth::{auth::AuthUser, jwt::generate_access_token, password::verify_password},
    config::Config,
    error::ApiError,
    model::{employee::Employee, role::Role},
    models::{LoginReqDto, PinReqDto},
    utils::pin_cache,
};
use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub role: Role,
}

#[derive(Serialize, ToSchema)]
pub struct PinSessionResponse {
    /// Staff token bound to the employee
    pub access_token: String,
    pub employee: Employee,
}

fn issue_token(role: Role, employee_id: Option<i64>, config: &Config) -> Result<String, ApiError> {
    generate_access_token(role, employee_id, &config.jwt_secret, config.access_token_ttl).map_err(|e| {
        error!(error = %e, "Failed to sign access token");
        ApiError::Internal(e.to_string())
    })
}

/// Log in as the shared staff or admin role
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, body = LoginResponse),
        (status = 400, description = "Password missing"),
        (status = 401, description = "Wrong password"),
        (status = 429, description = "Too many attempts")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(config, user), fields(role = %user.role))]
pub async fn login(user: web::Json<LoginReqDto>, config: web::Data<Config>) -> Result<impl Responder, ApiError> {
    info!("Login request received");

    if user.password.is_empty() {
        return Err(ApiError::validation("Password required"));
    }

    let hashed = match user.role {
        Role::Admin => &config.admin_password_hash,
        Role::Staff => &config.staff_password_hash,
    };

    debug!("Verifying password");
    if let Err(e) = verify_password(&user.password, hashed) {
        info!(error = %e, "Invalid credentials");
        return Err(ApiError::unauthorized("Incorrect password"));
    }

    let access_token = issue_token(user.role, None, &config)?;
    info!("Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        role: user.role,
    }))
}

/// Exchange a staff token and a PIN for a token bound to that employee
#[utoipa::path(
    post,
    path = "/auth/pin",
    request_body = PinReqDto,
    responses(
        (status = 200, body = PinSessionResponse),
        (status = 400, description = "PIN is not 4 digits"),
        (status = 401, description = "Unknown PIN"),
        (status = 403, description = "Not a staff session")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
#[instrument(name = "auth_pin", skip_all)]
pub async fn pin_session(
    auth: AuthUser,
    body: web::Json<PinReqDto>,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    if auth.role != Role::Staff {
        return Err(ApiError::forbidden("Staff only"));
    }

    let pin = body.pin.trim();
    validate_pin(pin)?;

    let employee = pin_cache::lookup(pool.get_ref(), pin)
        .await
        .map_err(|e| {
            error!(error = %e, "PIN lookup failed");
            ApiError::Backend(e)
        })?
        .ok_or_else(|| {
            info!("Unknown PIN entered");
            ApiError::unauthorized("Invalid PIN")
        })?;

    let access_token = issue_token(Role::Staff, Some(employee.id), &config)?;
    info!(employee_id = employee.id, "PIN session started");

    Ok(HttpResponse::Ok().json(PinSessionResponse { access_token, employee }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{jwt::verify_token, password::hash_password};
    use actix_web::{App, http::StatusCode, test};

    fn config_with_passwords() -> Config {
        let mut config = Config::for_tests();
        config.admin_password_hash = hash_password("admin-pass").unwrap();
        config.staff_password_hash = hash_password("staff-pass").unwrap();
        config
    }

    #[actix_web::test]
    async fn login_issues_role_token() {
        let config = config_with_passwords();
        let secret = config.jwt_secret.clone();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config))
                .route("/auth/login", web::post().to(login)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(serde_json::json!({"role": "admin", "password": "admin-pass"}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["role"], "admin");
        let claims = verify_token(body["access_token"].as_str().unwrap(), &secret).unwrap();
        assert_eq!(claims.role, Role::Admin.id());
        assert_eq!(claims.employee_id, None);
    }

    #[actix_web::test]
    async fn wrong_password_is_unauthorized() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config_with_passwords()))
                .route("/auth/login", web::post().to(login)),
        )
        .await;

        // staff password does not open the admin role
        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(serde_json::json!({"role": "admin", "password": "staff-pass"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn empty_password_is_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config_with_passwords()))
                .route("/auth/login", web::post().to(login)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(serde_json::json!({"role": "staff", "password": ""}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
