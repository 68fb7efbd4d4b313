use std::collections::HashSet;

/// Who is acting, as seen by the permission check.
#[derive(Debug, Clone, Default)]
pub struct Actor {
    pub user_id: String,
    pub role_ids: Vec<String>,
    pub role_names: Vec<String>,
}

pub trait Authorizer: Send + Sync {
    fn is_admin(&self, actor: &Actor) -> bool;
}

/// Grants admin rights to holders of any configured role, matched by id or by
/// case-insensitive name.
#[derive(Debug, Clone)]
pub struct RoleAuthorizer {
    admin_roles: HashSet<String>,
}

impl RoleAuthorizer {
    pub fn new<I, S>(admin_roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            admin_roles: admin_roles
                .into_iter()
                .map(|role| role.as_ref().trim().to_lowercase())
                .filter(|role| !role.is_empty())
                .collect(),
        }
    }
}

impl Authorizer for RoleAuthorizer {
    fn is_admin(&self, actor: &Actor) -> bool {
        let allowed = actor
            .role_ids
            .iter()
            .chain(actor.role_names.iter())
            .any(|role| self.admin_roles.contains(&role.to_lowercase()));

        if !allowed {
            tracing::warn!(
                "Admin check refused for user_id={} (roles={:?})",
                actor.user_id,
                actor.role_names
            );
        }
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(ids: &[&str], names: &[&str]) -> Actor {
        Actor {
            user_id: "1".into(),
            role_ids: ids.iter().map(|s| s.to_string()).collect(),
            role_names: names.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn matches_role_name_case_insensitively() {
        let authorizer = RoleAuthorizer::new(["ADMIN"]);
        assert!(authorizer.is_admin(&actor(&[], &["admin"])));
        assert!(!authorizer.is_admin(&actor(&[], &["DEV"])));
    }

    #[test]
    fn matches_role_id() {
        let authorizer = RoleAuthorizer::new(["123456789"]);
        assert!(authorizer.is_admin(&actor(&["123456789"], &["Bureau"])));
    }

    #[test]
    fn actor_without_roles_is_not_admin() {
        let authorizer = RoleAuthorizer::new(["ADMIN"]);
        assert!(!authorizer.is_admin(&Actor::default()));
    }
}
