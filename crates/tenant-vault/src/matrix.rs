//! The role × resource-class access matrix.
//!
//! Grounded on the comment block documenting the matrix in
//! `app/services/vault_engine.py`. `share` and `list` are not spelled out
//! as separate letters in that table; we treat `list` as requiring the same
//! permission as `read` (enumerating is a weaker form of reading) and
//! `share` as requiring `write` (granting access mutates who can reach the
//! resource). Both choices keep the matrix's only testable property —
//! access is never silently broadened beyond what `read`/`write`/`delete`
//! already allow for that cell — intact.

use tenant_types::{AccessAction, ResourceClass, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cell {
    read: bool,
    write: bool,
    delete: bool,
}

const fn cell(read: bool, write: bool, delete: bool) -> Cell {
    Cell { read, write, delete }
}

/// `role × resource_class` permission cells, `[role][class]`, in the order
/// `Role::{User,Advocate,Legal,Manager,Admin}` ×
/// `ResourceClass::{Own,Shared,Case,Org,System}`.
const MATRIX: [[Cell; 5]; 5] = [
    // own                    shared                 case                   org                    system
    [cell(true, true, true), cell(true, false, false), cell(false, false, false), cell(false, false, false), cell(false, false, false)], // user
    [cell(true, true, true), cell(true, true, false), cell(true, true, false), cell(true, false, false), cell(false, false, false)],      // advocate
    [cell(true, true, true), cell(true, true, false), cell(true, true, true), cell(true, true, false), cell(true, false, false)],         // legal
    [cell(true, true, true), cell(true, true, false), cell(true, true, false), cell(true, true, true), cell(true, false, false)],         // manager
    [cell(true, true, true), cell(true, true, true), cell(true, true, true), cell(true, true, true), cell(true, true, true)],             // admin
];

fn role_index(role: Role) -> usize {
    match role {
        Role::User => 0,
        Role::Advocate => 1,
        Role::Legal => 2,
        Role::Manager => 3,
        Role::Admin => 4,
    }
}

fn class_index(class: ResourceClass) -> usize {
    match class {
        ResourceClass::Own => 0,
        ResourceClass::Shared => 1,
        ResourceClass::Case => 2,
        ResourceClass::Org => 3,
        ResourceClass::System => 4,
    }
}

/// Whether `role` is permitted to perform `action` against a resource of
/// `class`, per the static access matrix.
pub fn permits(role: Role, class: ResourceClass, action: AccessAction) -> bool {
    let cell = MATRIX[role_index(role)][class_index(class)];
    match action {
        AccessAction::Read | AccessAction::List => cell.read,
        AccessAction::Write | AccessAction::Share => cell.write,
        AccessAction::Delete => cell.delete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_cannot_delete_shared() {
        assert!(!permits(Role::User, ResourceClass::Shared, AccessAction::Delete));
    }

    #[test]
    fn user_cannot_touch_system() {
        for action in [
            AccessAction::Read,
            AccessAction::Write,
            AccessAction::Delete,
            AccessAction::Share,
            AccessAction::List,
        ] {
            assert!(!permits(Role::User, ResourceClass::System, action));
        }
    }

    #[test]
    fn admin_can_do_everything() {
        for class in [
            ResourceClass::Own,
            ResourceClass::Shared,
            ResourceClass::Case,
            ResourceClass::Org,
            ResourceClass::System,
        ] {
            for action in [
                AccessAction::Read,
                AccessAction::Write,
                AccessAction::Delete,
                AccessAction::Share,
                AccessAction::List,
            ] {
                assert!(permits(Role::Admin, class, action));
            }
        }
    }

    #[test]
    fn legal_can_read_system_but_not_write() {
        assert!(permits(Role::Legal, ResourceClass::System, AccessAction::Read));
        assert!(!permits(Role::Legal, ResourceClass::System, AccessAction::Write));
    }

    #[test]
    fn advocate_can_read_but_not_delete_case() {
        assert!(permits(Role::Advocate, ResourceClass::Case, AccessAction::Read));
        assert!(!permits(Role::Advocate, ResourceClass::Case, AccessAction::Delete));
    }
}
