//! Role-based gating of documentation content.
//!
//! Identity is resolved elsewhere (an OAuth provider plus organization
//! membership lookup). This module only consumes the outcome: an [`AppRole`]
//! and a privilege flag, bundled as a [`Viewer`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role a signed-in viewer holds inside the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppRole {
    Admin,
    Member,
    #[default]
    Guest,
}

impl AppRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppRole::Admin => "admin",
            AppRole::Member => "member",
            AppRole::Guest => "guest",
        }
    }
}

impl FromStr for AppRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(AppRole::Admin),
            "member" => Ok(AppRole::Member),
            "guest" => Ok(AppRole::Guest),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

impl fmt::Display for AppRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimum role a piece of content asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequiredRole {
    Authenticated,
    Member,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

/// A signed-in viewer as handed over by the identity collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Viewer {
    pub role: AppRole,
    #[serde(default)]
    pub privileged: bool,
}

impl Viewer {
    pub fn new(role: AppRole, privileged: bool) -> Self {
        Self { role, privileged }
    }

    /// Whether this viewer satisfies `required`
    pub fn can_access(&self, required: RequiredRole) -> bool {
        match required {
            RequiredRole::Authenticated => true,
            RequiredRole::Member => {
                matches!(self.role, AppRole::Admin | AppRole::Member) || self.privileged
            }
            RequiredRole::Admin => self.role == AppRole::Admin || self.privileged,
        }
    }
}

/// Outcome of checking an optional viewer against a requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    /// No viewer is signed in
    SignInRequired,
    /// Signed in, but the role falls short
    Forbidden,
}

/// Check an optional (possibly anonymous) viewer
pub fn check_access(viewer: Option<&Viewer>, required: RequiredRole) -> AccessDecision {
    match viewer {
        None => AccessDecision::SignInRequired,
        Some(v) if v.can_access(required) => AccessDecision::Granted,
        Some(_) => AccessDecision::Forbidden,
    }
}

/// Whether `path` is reachable without signing in
///
/// A public entry matches itself exactly and anything below it.
pub fn is_public_path(path: &str, public_paths: &[String]) -> bool {
    public_paths.iter().any(|public| {
        if path == public {
            return true;
        }
        let prefix = public.trim_end_matches('/');
        // "/" only matches the root itself
        !prefix.is_empty() && path.starts_with(&format!("{}/", prefix))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn public() -> Vec<String> {
        vec!["/".into(), "/tags".into(), "/api/auth".into()]
    }

    #[test]
    fn test_member_requirement() {
        assert!(Viewer::new(AppRole::Admin, false).can_access(RequiredRole::Member));
        assert!(Viewer::new(AppRole::Member, false).can_access(RequiredRole::Member));
        assert!(!Viewer::new(AppRole::Guest, false).can_access(RequiredRole::Member));
        assert!(Viewer::new(AppRole::Guest, true).can_access(RequiredRole::Member));
    }

    #[test]
    fn test_admin_requirement() {
        assert!(Viewer::new(AppRole::Admin, false).can_access(RequiredRole::Admin));
        assert!(!Viewer::new(AppRole::Member, false).can_access(RequiredRole::Admin));
        assert!(Viewer::new(AppRole::Member, true).can_access(RequiredRole::Admin));
    }

    #[test]
    fn test_authenticated_requirement() {
        assert!(Viewer::default().can_access(RequiredRole::Authenticated));
    }

    #[test]
    fn test_check_access() {
        assert_eq!(
            check_access(None, RequiredRole::Authenticated),
            AccessDecision::SignInRequired
        );
        let guest = Viewer::default();
        assert_eq!(
            check_access(Some(&guest), RequiredRole::Member),
            AccessDecision::Forbidden
        );
        let member = Viewer::new(AppRole::Member, false);
        assert_eq!(
            check_access(Some(&member), RequiredRole::Member),
            AccessDecision::Granted
        );
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Admin".parse::<AppRole>(), Ok(AppRole::Admin));
        assert_eq!(" member ".parse::<AppRole>(), Ok(AppRole::Member));
        assert!("owner".parse::<AppRole>().is_err());
    }

    #[test]
    fn test_public_paths() {
        let public = public();
        assert!(is_public_path("/", &public));
        assert!(is_public_path("/tags", &public));
        assert!(is_public_path("/tags/rust", &public));
        assert!(is_public_path("/api/auth/callback", &public));
        assert!(!is_public_path("/tagsoup", &public));
        assert!(!is_public_path("/docs/intro", &public));
    }
}
