//! OpenAPI document for the service.

use utoipa::OpenApi;

use super::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "clef",
        description = "Accounts and authentication for the Clef music catalog"
    ),
    paths(
        handlers::health::health,
        handlers::auth::register::register,
        handlers::auth::login::login,
        handlers::auth::session::logout,
        handlers::auth::verification::verify_email,
        handlers::auth::verification::resend_verification,
        handlers::auth::reset::forgot_password,
        handlers::auth::reset::reset_password,
        handlers::auth::account::me,
        handlers::auth::account::update_password,
        handlers::auth::account::delete_me,
    ),
    components(schemas(
        handlers::health::Health,
        handlers::auth::AccountResponse,
        handlers::auth::Role,
        handlers::auth::types::RegisterRequest,
        handlers::auth::types::RegisterResponse,
        handlers::auth::types::LoginRequest,
        handlers::auth::types::SessionResponse,
        handlers::auth::types::VerifyEmailRequest,
        handlers::auth::types::ResendVerificationRequest,
        handlers::auth::types::ForgotPasswordRequest,
        handlers::auth::types::ForgotPasswordResponse,
        handlers::auth::types::ResetPasswordRequest,
        handlers::auth::types::UpdatePasswordRequest,
    )),
    tags(
        (name = "auth", description = "Account authentication and security state"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
