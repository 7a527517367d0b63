//! Resolution of placement policy references into replica placement bundles.
//!
//! A bundle is the resolved rule set for one physical table id. Tables get a
//! bundle when they carry a policy reference; partitions get their own bundle
//! only when they override the table's policy.

use crate::model::{PartitionDefinition, PlacementSettings, PolicyInfo, PolicyRef, TableInfo};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerRole {
    Leader,
    Follower,
    Learner,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRule {
    pub role: PeerRole,
    pub count: u64,
    pub constraints: Vec<String>,
}

/// Resolved placement for one physical table or partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    /// Physical table id the bundle applies to.
    pub id: i64,
    /// Name of the policy the rules were derived from.
    pub policy: String,
    pub rules: Vec<PlacementRule>,
}

/// Followers provisioned when the policy does not say otherwise.
const DEFAULT_FOLLOWERS: u64 = 2;

fn rules_from_settings(settings: &PlacementSettings) -> Vec<PlacementRule> {
    let mut shared = Vec::new();
    if !settings.constraints.is_empty() {
        shared.extend(
            settings
                .constraints
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
        );
    }

    let mut leader_constraints = shared.clone();
    if !settings.primary_region.is_empty() {
        leader_constraints.push(format!("+region={}", settings.primary_region));
    }

    let mut follower_constraints = shared;
    if !settings.regions.is_empty() {
        follower_constraints.push(format!("+region={}", settings.regions.join("|")));
    }

    let followers = if settings.followers > 0 {
        settings.followers
    } else {
        DEFAULT_FOLLOWERS
    };

    let mut rules = vec![
        PlacementRule {
            role: PeerRole::Leader,
            count: 1,
            constraints: leader_constraints,
        },
        PlacementRule {
            role: PeerRole::Follower,
            count: followers,
            constraints: follower_constraints.clone(),
        },
    ];
    if settings.learners > 0 {
        rules.push(PlacementRule {
            role: PeerRole::Learner,
            count: settings.learners,
            constraints: follower_constraints,
        });
    }
    rules
}

/// Builds the bundle for one physical id from a resolved policy.
pub fn policy_bundle(physical_id: i64, policy: &PolicyInfo) -> Bundle {
    Bundle {
        id: physical_id,
        policy: policy.name.original().to_string(),
        rules: rules_from_settings(&policy.settings),
    }
}

/// Bundle for the table itself, if it references a policy the resolver knows.
pub fn new_table_bundle<F>(resolve: F, table: &TableInfo) -> Option<Arc<Bundle>>
where
    F: Fn(&PolicyRef) -> Option<Arc<PolicyInfo>>,
{
    let policy_ref = table.placement_policy.as_ref()?;
    let policy = resolve(policy_ref)?;
    Some(Arc::new(policy_bundle(table.id, &policy)))
}

/// Bundle for one partition, if it overrides the table's placement.
pub fn new_partition_bundle<F>(resolve: F, def: &PartitionDefinition) -> Option<Arc<Bundle>>
where
    F: Fn(&PolicyRef) -> Option<Arc<PolicyInfo>>,
{
    let policy_ref = def.placement_policy.as_ref()?;
    let policy = resolve(policy_ref)?;
    Some(Arc::new(policy_bundle(def.id, &policy)))
}
