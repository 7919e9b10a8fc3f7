// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership of stored resources.
//!
//! Every record is owned by exactly one principal. Ownership grants full
//! control over that one resource and moves to a successor when the owner is
//! retired; records are never left without an owner.

use crate::access::{Principal, PrincipalId};

/// Trait for resources that have an owner.
pub trait OwnedResource {
    /// Get the owner's principal ID.
    fn owner_id(&self) -> PrincipalId;

    /// Hand the resource to another principal.
    fn transfer_to(&mut self, successor: PrincipalId);

    /// Check whether `principal` owns this resource.
    fn is_owned_by(&self, principal: &Principal) -> bool {
        self.owner_id() == principal.id
    }
}

/// Transfer every resource owned by `from` to `to`, returning the count moved.
pub fn reassign_owned<'a, T, I>(resources: I, from: PrincipalId, to: PrincipalId) -> usize
where
    T: OwnedResource + 'a,
    I: IntoIterator<Item = &'a mut T>,
{
    let mut moved = 0;
    for resource in resources {
        if resource.owner_id() == from {
            resource.transfer_to(to);
            moved += 1;
        }
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::PrivilegeLevel;

    struct TestResource {
        owner: PrincipalId,
    }

    impl OwnedResource for TestResource {
        fn owner_id(&self) -> PrincipalId {
            self.owner
        }

        fn transfer_to(&mut self, successor: PrincipalId) {
            self.owner = successor;
        }
    }

    #[test]
    fn ownership_check_matches_owner_only() {
        let owner = Principal::new("owner", PrivilegeLevel::User, String::new());
        let other = Principal::new("other", PrivilegeLevel::Admin, String::new());
        let resource = TestResource { owner: owner.id };

        assert!(resource.is_owned_by(&owner));
        assert!(!resource.is_owned_by(&other));
    }

    #[test]
    fn reassign_moves_only_matching_resources() {
        let from = PrincipalId::generate();
        let to = PrincipalId::generate();
        let bystander = PrincipalId::generate();

        let mut resources = vec![
            TestResource { owner: from },
            TestResource { owner: bystander },
            TestResource { owner: from },
        ];

        let moved = reassign_owned(resources.iter_mut(), from, to);
        assert_eq!(moved, 2);
        assert_eq!(resources[0].owner, to);
        assert_eq!(resources[1].owner, bystander);
        assert_eq!(resources[2].owner, to);
    }
}
