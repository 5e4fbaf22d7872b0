//! Account endpoints for the authenticated user.
//!
//! Every route resolves the caller through [`AuthMiddleware`](crate::auth_middleware::AuthMiddleware).
pub mod delete;
pub mod logout;
pub mod me;
pub mod password;
pub mod settings;

use actix_web::web;

pub use self::{delete::*, logout::*, me::*, password::*, settings::*};

/// Registers all account endpoints under `/user`.
pub fn configure_user_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/user")
            .route("", web::post().to(get_authenticated_user))
            .route("", web::patch().to(patch_user))
            .route("", web::delete().to(delete_account))
            .route("/logout", web::post().to(logout))
            .route("/password", web::post().to(change_password)),
    );
}
