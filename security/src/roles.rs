// security/src/roles.rs

use models::medical::Role;

/// Role allow-list attached to a group of routes. Empty means any
/// authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowedRoles(&'static [Role]);

impl AllowedRoles {
    pub const ANY: AllowedRoles = AllowedRoles(&[]);
    pub const DOCTOR: AllowedRoles = AllowedRoles(&[Role::Doctor]);
    pub const PATIENT: AllowedRoles = AllowedRoles(&[Role::Patient]);
    pub const DOCTOR_OR_PATIENT: AllowedRoles = AllowedRoles(&[Role::Doctor, Role::Patient]);

    pub fn permits(&self, role: Role) -> bool {
        self.0.is_empty() || self.0.contains(&role)
    }
}
