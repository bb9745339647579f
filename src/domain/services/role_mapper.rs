use std::collections::BTreeSet;

use crate::domain::models::claims::TokenClaims;

/// Realm roles Keycloak creates per realm; they carry no authorization meaning here.
pub const DEFAULT_ROLE_PREFIX: &str = "default-roles-";
pub const ROLE_PREFIX: &str = "ROLE_";
pub const SCOPE_PREFIX: &str = "SCOPE_";

pub const ADMIN_AUTHORITY: &str = "ROLE_ADMIN";

/// Maps token claims to the set of local authorities.
///
/// Scope authorities come from `scope` (or `scp` when `scope` is absent), realm roles
/// from `realm_access.roles`: `offline-access` becomes `ROLE_OFFLINE_ACCESS`.
pub fn authorities(claims: &TokenClaims) -> BTreeSet<String> {
    let scopes = claims
        .scope
        .as_ref()
        .or(claims.scp.as_ref())
        .map(|s| s.scopes())
        .unwrap_or_default()
        .into_iter()
        .map(|scope| format!("{SCOPE_PREFIX}{scope}"));

    let roles = claims
        .realm_access
        .iter()
        .flat_map(|access| access.roles.iter())
        .filter_map(|role| realm_role_authority(role));

    scopes.chain(roles).collect()
}

fn realm_role_authority(role: &str) -> Option<String> {
    if role.starts_with(DEFAULT_ROLE_PREFIX) {
        return None;
    }
    Some(format!("{ROLE_PREFIX}{}", role.to_uppercase().replace('-', "_")))
}
