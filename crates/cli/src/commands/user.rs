//! User creation command.

use tracing::info;

use clover_storefront::services::auth::AuthService;

/// Create a user (with an empty customer profile) from the command line.
///
/// # Errors
///
/// Returns an error if validation fails (weak password, taken username) or
/// the database is unreachable.
pub async fn create(
    username: &str,
    email: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    let user = AuthService::new(&pool)
        .create_user(username, email, first_name, last_name, password)
        .await?;

    info!(user_id = %user.id, username = %user.username, "User created");
    Ok(())
}
