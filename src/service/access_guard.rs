// service/access_guard.rs
use crate::models::usermodel::{Role, UserProfile};

pub const LOGIN_ROUTE: &str = "/login";

/// Roles a guarded route admits. An empty set admits any signed-in role.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteRequirement {
    pub allowed_roles: Vec<Role>,
}

impl RouteRequirement {
    pub fn roles(allowed_roles: Vec<Role>) -> Self {
        RouteRequirement { allowed_roles }
    }

    pub fn admits(&self, role: Role) -> bool {
        self.allowed_roles.is_empty() || self.allowed_roles.contains(&role)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuardDecision {
    Render,
    /// Not signed in; `from` is the location originally asked for.
    RedirectToLogin { from: String },
    /// Signed in with a role the route does not admit.
    RedirectToHome { home: &'static str },
}

/// Decides what happens to a navigation. Has no effects of its own.
pub fn decide(
    session: Option<&UserProfile>,
    requirement: &RouteRequirement,
    requested: &str,
) -> GuardDecision {
    match session {
        None => GuardDecision::RedirectToLogin {
            from: requested.to_string(),
        },
        Some(profile) if requirement.admits(profile.role()) => GuardDecision::Render,
        Some(profile) => GuardDecision::RedirectToHome {
            home: profile.role().home_route(),
        },
    }
}

/// `/login?from=<requested>` with the location percent-encoded.
pub fn login_location(from: &str) -> String {
    format!("{}?from={}", LOGIN_ROUTE, urlencoding::encode(from))
}
