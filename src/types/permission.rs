use std::fmt;

use serde::{Deserialize, Serialize};

/// Permission represents a bitmask of project-level permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(u32);

impl Permission {
    pub const PROJECT_READ: Permission = Permission(1 << 0); // 1
    pub const PROJECT_MANAGE: Permission = Permission(1 << 1); // 2

    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if this permission bitmask contains the required permission.
    #[must_use]
    pub const fn has(self, required: Permission) -> bool {
        self.0 & required.0 == required.0
    }

    #[must_use]
    pub const fn union(self, other: Permission) -> Permission {
        Permission(self.0 | other.0)
    }

    #[must_use]
    pub const fn difference(self, other: Permission) -> Permission {
        Permission(self.0 & !other.0)
    }

    /// Expands a bitmask to include implied permissions (manage implies read).
    /// Only meaningful for ALLOW bits, never for DENY.
    #[must_use]
    pub fn expand_implied(self) -> Permission {
        if self.has(Self::PROJECT_MANAGE) {
            return self.union(Self::PROJECT_READ);
        }
        self
    }

    pub fn parse(s: &str) -> Option<Permission> {
        match s {
            "project:read" => Some(Self::PROJECT_READ),
            "project:manage" => Some(Self::PROJECT_MANAGE),
            _ => None,
        }
    }

    /// Parses a comma separated list such as `project:read,project:manage`.
    pub fn parse_list(s: &str) -> Option<Permission> {
        let mut result = Permission::default();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            result = result.union(Self::parse(part)?);
        }
        Some(result)
    }

    #[must_use]
    pub fn to_strings(self) -> Vec<&'static str> {
        let mut perms = Vec::new();
        if self.has(Self::PROJECT_READ) {
            perms.push("project:read");
        }
        if self.has(Self::PROJECT_MANAGE) {
            perms.push("project:manage");
        }
        perms
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_strings().join(", "))
    }
}

impl From<i64> for Permission {
    fn from(bits: i64) -> Self {
        Self(bits as u32)
    }
}

impl From<Permission> for i64 {
    fn from(p: Permission) -> Self {
        p.0 as i64
    }
}
