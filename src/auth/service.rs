use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::api::{ApiClient, IdentitySource};
use crate::models::User;
use crate::sync::UserSync;

use super::IdentityStore;

/// The authentication flow: sign-in/sign-up against the server, wired into
/// the identity synchronizer.
///
/// A failed attempt surfaces as an error and leaves any existing identity
/// untouched; only an explicit `sign_out` logs the user out.
pub struct AuthService<S, P> {
    api: ApiClient,
    users: UserSync<S, P>,
}

impl<S, P> AuthService<S, P>
where
    S: IdentitySource,
    P: IdentityStore + 'static,
{
    pub fn new(api: ApiClient, users: UserSync<S, P>) -> Self {
        Self { api, users }
    }

    /// Authenticate and install the returned identity.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        let user = self
            .api
            .sign_in(email, password)
            .await
            .inspect_err(|e| warn!(email, error = %e, "sign-in failed"))
            .context("Sign-in failed")?;
        self.users.update(&user)?;
        info!(user_id = user.id, "signed in");
        Ok(user)
    }

    /// Create an account and install the returned identity.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<User> {
        let user = self
            .api
            .sign_up(email, password)
            .await
            .inspect_err(|e| warn!(email, error = %e, "sign-up failed"))
            .context("Sign-up failed")?;
        self.users.update(&user)?;
        info!(user_id = user.id, "account created and signed in");
        Ok(user)
    }

    /// Log out, forgetting the identity everywhere.
    pub fn sign_out(&self) -> Result<()> {
        self.users.clear()
    }
}
