use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub iat: Option<u64>,
}

impl JwtClaims {
    /// Clinic role, preferring `app_metadata.role` over the top-level claim.
    ///
    /// Supabase puts "authenticated" in the top-level `role`, so the clinic
    /// role normally travels in `app_metadata`.
    pub fn clinic_role(&self) -> Option<UserRole> {
        let from_metadata = self
            .app_metadata
            .as_ref()
            .and_then(|meta| meta.get("role"))
            .and_then(|role| role.as_str())
            .and_then(|role| role.parse().ok());

        from_metadata.or_else(|| self.role.as_deref().and_then(|role| role.parse().ok()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Professional,
    Patient,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Professional => "professional",
            UserRole::Patient => "patient",
        }
    }

    /// Admins and professionals run the clinic side of the schedule.
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Professional)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(UserRole::Admin),
            "professional" => Ok(UserRole::Professional),
            "patient" => Ok(UserRole::Patient),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Authenticated caller, inserted into request extensions by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: UserRole,
    pub email: Option<String>,
}

impl Actor {
    pub fn new(id: Uuid, role: UserRole) -> Self {
        Self { id, role, email: None }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_professional(&self) -> bool {
        self.role == UserRole::Professional
    }
}
