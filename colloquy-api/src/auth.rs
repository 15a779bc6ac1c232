use std::{fmt, str::FromStr};

use crate::UserId;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Junior,
    Senior,
    Lead,
    Admin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        *self == Role::Admin
    }

    /// Whether this role may edit comments written by someone else
    pub fn can_edit_others(&self) -> bool {
        matches!(self, Role::Senior | Role::Lead | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Junior => "junior",
            Role::Senior => "senior",
            Role::Lead => "lead",
            Role::Admin => "admin",
        })
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Role, String> {
        match s {
            "junior" => Ok(Role::Junior),
            "senior" => Ok(Role::Senior),
            "lead" => Ok(Role::Lead),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("unknown role {s:?}, expected junior, senior, lead or admin")),
        }
    }
}

/// The currently authenticated user, as provided by the session layer
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Actor {
    pub id: UserId,
    pub username: String,
    pub role: Role,
}
