//! Sign-up, sign-in and sign-out flows and where each one navigates.

use std::fmt;

use crate::{EngineError, IdentityProvider};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Home,
    SignIn,
    SignUp,
    Dashboard,
}

impl Route {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::SignIn => "/sign-in",
            Self::SignUp => "/sign-up",
            Self::Dashboard => "/dashboard",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// `Replace` rewrites the current history entry so back-navigation cannot
/// return to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Navigation {
    Push(Route),
    Replace(Route),
}

/// Message to show under an auth form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthFailure(pub String);

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for AuthFailure {}

impl From<EngineError> for AuthFailure {
    fn from(err: EngineError) -> Self {
        if err.is_auth_failure() {
            return Self(err.to_string());
        }
        tracing::error!("auth backend error: {err}");
        Self("Something went wrong.".to_string())
    }
}

/// The sign-up page hides its own URL as soon as it is shown.
#[must_use]
pub fn sign_up_page_mounted() -> Navigation {
    Navigation::Replace(Route::Home)
}

pub async fn sign_up(
    identity: &impl IdentityProvider,
    email: &str,
    password: &str,
) -> Result<Navigation, AuthFailure> {
    identity.register(email, password).await?;
    Ok(Navigation::Push(Route::Dashboard))
}

pub async fn sign_in(
    identity: &impl IdentityProvider,
    email: &str,
    password: &str,
) -> Result<Navigation, AuthFailure> {
    identity.login(email, password).await?;
    Ok(Navigation::Push(Route::Dashboard))
}

/// Signs out and replaces the dashboard entry with the sign-in page.
/// Failures are logged and navigation is skipped.
pub async fn sign_out(identity: &impl IdentityProvider) -> Option<Navigation> {
    match identity.logout().await {
        Ok(()) => Some(Navigation::Replace(Route::SignIn)),
        Err(err) => {
            tracing::error!("Logout error: {err}");
            None
        }
    }
}

/// Where the "Dashboard" button leads.
#[must_use]
pub fn dashboard_entry(logged_in: bool) -> Navigation {
    if logged_in {
        Navigation::Push(Route::Dashboard)
    } else {
        Navigation::Push(Route::SignIn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_have_paths() {
        assert_eq!(Route::SignIn.to_string(), "/sign-in");
        assert_eq!(Route::Dashboard.path(), "/dashboard");
    }

    #[test]
    fn dashboard_button_depends_on_auth() {
        assert_eq!(dashboard_entry(true), Navigation::Push(Route::Dashboard));
        assert_eq!(dashboard_entry(false), Navigation::Push(Route::SignIn));
        assert_eq!(sign_up_page_mounted(), Navigation::Replace(Route::Home));
    }

    #[test]
    fn backend_errors_are_not_leaked() {
        let failure = AuthFailure::from(EngineError::InvalidDocument {
            path: "users/u1/settings/budget".to_string(),
            reason: "expected a number".to_string(),
        });
        assert_eq!(failure.0, "Something went wrong.");

        let failure = AuthFailure::from(EngineError::InvalidCredentials);
        assert_eq!(failure.0, "Invalid credentials");
    }
}
