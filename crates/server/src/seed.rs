use auth::UserService;
use cakehouse_core::SeedConfig;
use tracing::{info, warn};

const DEFAULT_ADMIN_NAME: &str = "Administrator";

/// Create the bootstrap administrator when one is configured and none exists yet.
pub async fn seed_admin(users: &UserService, seed: &SeedConfig) -> anyhow::Result<()> {
    let (Some(email), Some(password)) = (seed.admin_email.as_deref(), seed.admin_password.as_deref())
    else {
        if seed.admin_email.is_some() || seed.admin_password.is_some() {
            warn!("Incomplete seed.admin_* settings; skipping admin seeding");
        }
        return Ok(());
    };
    let name = seed.admin_name.as_deref().unwrap_or(DEFAULT_ADMIN_NAME);

    match users.ensure_admin(name, email, password).await? {
        Some(admin) => info!(user_id = admin.id, email = %admin.email, "Created admin account"),
        None => info!("Admin account already present"),
    }

    Ok(())
}
