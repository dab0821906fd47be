// security/src/roles.rs

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use serde::Deserialize;

use models::medical::Role;

pub mod permissions {
    pub const VISITS_READ: &str = "visits:read";
    pub const VISITS_WRITE: &str = "visits:write";
    pub const VISITS_CHECK_IN: &str = "visits:check_in";
    pub const VISITS_CHECK_OUT: &str = "visits:check_out";
    pub const VISITS_DELETE: &str = "visits:delete";
    pub const AUDIT_READ: &str = "audit:read";
    pub const SUPERUSER: &str = "superuser";
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RoleConfig {
    pub permissions: Vec<String>,
}

/// Role name to permission list, e.g.
///
/// ```yaml
/// roles:
///   nurse:
///     permissions: [visits:read, visits:write, visits:check_in]
/// ```
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RolesConfig {
    pub roles: HashMap<String, RoleConfig>,
}

impl Default for RolesConfig {
    fn default() -> Self {
        use permissions::*;
        let grant = |perms: &[&str]| RoleConfig {
            permissions: perms.iter().map(|p| p.to_string()).collect(),
        };
        let roles = HashMap::from([
            (Role::Admin.to_string(), grant(&[SUPERUSER])),
            (
                Role::Doctor.to_string(),
                grant(&[VISITS_READ, VISITS_WRITE, VISITS_CHECK_IN, VISITS_CHECK_OUT, VISITS_DELETE]),
            ),
            (
                Role::Nurse.to_string(),
                grant(&[VISITS_READ, VISITS_WRITE, VISITS_CHECK_IN]),
            ),
        ]);
        RolesConfig { roles }
    }
}

impl RolesConfig {
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read roles file {}", path.display()))?;
        let config = Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse roles file {}", path.display()))?;
        info!("Loaded {} role(s) from {}", config.roles.len(), path.display());
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: RolesConfig = serde_yaml::from_str(content)?;
        for name in config.roles.keys() {
            name.parse::<Role>().map_err(anyhow::Error::msg)?;
        }
        Ok(config)
    }

    pub fn permissions(&self, role: Role) -> Option<&[String]> {
        self.roles.get(role.as_str()).map(|r| r.permissions.as_slice())
    }

    pub fn has_permission(&self, role: Role, permission: &str) -> bool {
        self.permissions(role).is_some_and(|perms| {
            perms
                .iter()
                .any(|p| p == permission || p == permissions::SUPERUSER)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::permissions::*;
    use super::*;
    use std::io::Write;

    #[test]
    fn should_apply_default_grants() {
        let roles = RolesConfig::default();
        assert!(roles.has_permission(Role::Admin, AUDIT_READ));
        assert!(roles.has_permission(Role::Doctor, VISITS_CHECK_OUT));
        assert!(!roles.has_permission(Role::Doctor, AUDIT_READ));
        assert!(roles.has_permission(Role::Nurse, VISITS_CHECK_IN));
        assert!(!roles.has_permission(Role::Nurse, VISITS_DELETE));
    }

    #[test]
    fn should_load_roles_from_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "roles:\n  nurse:\n    permissions: [visits:read]\n  admin:\n    permissions: [superuser]"
        )
        .unwrap();
        let roles = RolesConfig::from_yaml_file(file.path()).unwrap();
        assert!(roles.has_permission(Role::Nurse, VISITS_READ));
        assert!(!roles.has_permission(Role::Nurse, VISITS_WRITE));
        assert!(roles.permissions(Role::Doctor).is_none());
    }

    #[test]
    fn should_reject_unknown_role_names() {
        let err = RolesConfig::from_yaml_str("roles:\n  janitor:\n    permissions: []").unwrap_err();
        assert!(err.to_string().contains("janitor"));
    }
}
