use crate::config::Config;
use crate::error::ApiError;
use crate::{auth::jwt::verify_token, model::role::Role};
use actix_web::{
    FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data,
};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub role: Role,

    /// Present only after a staff PIN session, or never for admins
    pub employee_id: Option<i64>,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Already decoded by the auth middleware on /api routes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(actix_web::error::ErrorInternalServerError(
                    "Config missing",
                )));
            }
        };

        let claims = match verify_token(token, &config.jwt_secret) {
            Ok(c) => c,
            Err(_) => return ready(Err(ErrorUnauthorized("Invalid token"))),
        };

        let role = match Role::from_id(claims.role) {
            Some(r) => r,
            None => return ready(Err(ErrorUnauthorized("Invalid role"))),
        };

        ready(Ok(AuthUser {
            role,
            employee_id: claims.employee_id,
        }))
    }
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Admin only"))
        }
    }

    /// The employee this staff session was bound to by PIN.
    pub fn require_employee(&self) -> Result<i64, ApiError> {
        match (self.role, self.employee_id) {
            (Role::Staff, Some(id)) => Ok(id),
            (Role::Staff, None) => Err(ApiError::forbidden("Enter your PIN first")),
            _ => Err(ApiError::forbidden("Staff only")),
        }
    }

    /// Which employee a read may look at. Admins may look at anyone (or
    /// everyone), staff only at themselves.
    pub fn scope_employee(&self, requested: Option<i64>) -> Result<Option<i64>, ApiError> {
        if self.is_admin() {
            return Ok(requested);
        }
        let own = self.require_employee()?;
        match requested {
            Some(id) if id != own => Err(ApiError::forbidden("Staff may only view their own records")),
            _ => Ok(Some(own)),
        }
    }
}
