//! Property-based tests for membership selection.
//!
//! These exercise `select_membership` over arbitrary membership sets and
//! hints, checking that the hint is only ever advisory.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use keystone_shared::types::{OrganizationId, Role, UserId};

use crate::tenancy::membership::Membership;
use crate::tenancy::resolver::select_membership;

fn fixed_user() -> UserId {
    UserId::from_uuid(Uuid::from_u128(0x0001))
}

fn arb_role() -> impl Strategy<Value = Role> {
    prop::sample::select(Role::ALL.to_vec())
}

fn arb_membership() -> impl Strategy<Value = Membership> {
    (
        1u128..u128::MAX,
        arb_role(),
        any::<bool>(),
        0i64..10_000,
        prop::bool::weighted(0.9),
    )
        .prop_map(|(org, role, is_active, minutes, own)| Membership {
            user_id: if own {
                fixed_user()
            } else {
                UserId::from_uuid(Uuid::from_u128(0x0002))
            },
            organization_id: OrganizationId::from_uuid(Uuid::from_u128(org)),
            role,
            is_active,
            allowed_workspaces: vec![],
            joined_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + Duration::minutes(minutes),
        })
}

fn arb_memberships() -> impl Strategy<Value = Vec<Membership>> {
    prop::collection::vec(arb_membership(), 0..8)
}

/// Picks either an organization from the set (possibly inactive) or a
/// foreign one, so both sides of the hint boundary are covered.
fn arb_hint(memberships: &[Membership]) -> impl Strategy<Value = Option<OrganizationId>> + use<> {
    let known: Vec<OrganizationId> = memberships.iter().map(|m| m.organization_id).collect();
    let foreign = OrganizationId::from_uuid(Uuid::from_u128(u128::MAX));
    let mut choices = vec![None, Some(foreign)];
    choices.extend(known.into_iter().map(Some));
    prop::sample::select(choices)
}

fn memberships_and_hint() -> impl Strategy<Value = (Vec<Membership>, Option<OrganizationId>)> {
    arb_memberships().prop_flat_map(|ms| {
        let hint = arb_hint(&ms);
        (Just(ms), hint)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Whatever is selected is an active membership of the requesting user.
    #[test]
    fn prop_selection_is_active_own_membership((memberships, hint) in memberships_and_hint()) {
        if let Some(selected) = select_membership(&memberships, fixed_user(), hint) {
            prop_assert!(selected.is_active);
            prop_assert_eq!(selected.user_id, fixed_user());
        }
    }

    /// Nothing is selected exactly when the user has no active membership.
    #[test]
    fn prop_no_access_iff_no_active_membership((memberships, hint) in memberships_and_hint()) {
        let has_active = memberships
            .iter()
            .any(|m| m.is_active && m.user_id == fixed_user());
        prop_assert_eq!(select_membership(&memberships, fixed_user(), hint).is_some(), has_active);
    }

    /// A hint is honoured only if it names an active membership of the user.
    #[test]
    fn prop_hint_is_advisory((memberships, hint) in memberships_and_hint()) {
        let selected = select_membership(&memberships, fixed_user(), hint);
        let hint_valid = hint.is_some_and(|org| {
            memberships
                .iter()
                .any(|m| m.organization_id == org && m.is_active && m.user_id == fixed_user())
        });

        if hint_valid {
            prop_assert_eq!(selected.map(|m| m.organization_id), hint);
        } else {
            prop_assert_eq!(
                selected.map(|m| m.organization_id),
                select_membership(&memberships, fixed_user(), None).map(|m| m.organization_id)
            );
        }
    }

    /// Without a hint the earliest-joined active membership wins.
    #[test]
    fn prop_default_is_earliest_joined(memberships in arb_memberships()) {
        let earliest = memberships
            .iter()
            .filter(|m| m.is_active && m.user_id == fixed_user())
            .map(|m| m.joined_at)
            .min();
        prop_assert_eq!(
            select_membership(&memberships, fixed_user(), None).map(|m| m.joined_at),
            earliest
        );
    }

    /// Selection does not depend on the order the store returned rows in.
    #[test]
    fn prop_selection_is_order_independent((memberships, hint) in memberships_and_hint()) {
        let mut reversed = memberships.clone();
        reversed.reverse();
        prop_assert_eq!(
            select_membership(&memberships, fixed_user(), hint).map(|m| m.organization_id),
            select_membership(&reversed, fixed_user(), hint).map(|m| m.organization_id)
        );
    }
}
