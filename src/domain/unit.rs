//! Org units, permission grants and the communication graph.
//!
//! Units form a forest per tenant (`parent_id` links). Permission grants
//! attached to a unit apply to its members and to members of every unit
//! below it. Communication between two users is decided by
//! [`CommunicationGraph::can_communicate`].
//!
//! Everything here is pure: services load the tenant's units, memberships
//! and links, then ask these types for an answer.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

/// Organisational unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Unit {
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[schema(example = "Engineering")]
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Directed (optionally bidirectional) permission to communicate from one
/// unit's subtree-ancestry to another's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CommunicationLink {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub source_unit_id: Uuid,
    pub target_unit_id: Uuid,
    pub bidirectional: bool,
    pub created_at: DateTime<Utc>,
}

/// Permission granted to a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UnitGrant {
    pub id: Uuid,
    pub unit_id: Uuid,
    pub permission: Permission,
    pub created_at: DateTime<Utc>,
}

/// Fixed permission catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum Permission {
    #[serde(rename = "units.manage")]
    UnitsManage,
    #[serde(rename = "calendar.share")]
    CalendarShare,
    #[serde(rename = "chat.broadcast")]
    ChatBroadcast,
    #[serde(rename = "spreadsheet.edit")]
    SpreadsheetEdit,
    #[serde(rename = "phone.call")]
    PhoneCall,
    #[serde(rename = "code.edit")]
    CodeEdit,
    #[serde(rename = "remote.control")]
    RemoteControl,
}

impl Permission {
    pub const ALL: [Permission; 7] = [
        Permission::UnitsManage,
        Permission::CalendarShare,
        Permission::ChatBroadcast,
        Permission::SpreadsheetEdit,
        Permission::PhoneCall,
        Permission::CodeEdit,
        Permission::RemoteControl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::UnitsManage => "units.manage",
            Permission::CalendarShare => "calendar.share",
            Permission::ChatBroadcast => "chat.broadcast",
            Permission::SpreadsheetEdit => "spreadsheet.edit",
            Permission::PhoneCall => "phone.call",
            Permission::CodeEdit => "code.edit",
            Permission::RemoteControl => "remote.control",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| AppError::validation(format!("Unknown permission '{}'", s)))
    }
}

/// Parent map of one tenant's units.
#[derive(Debug, Clone, Default)]
pub struct UnitTree {
    parents: HashMap<Uuid, Option<Uuid>>,
}

impl UnitTree {
    pub fn new(units: &[Unit]) -> Self {
        Self {
            parents: units.iter().map(|u| (u.id, u.parent_id)).collect(),
        }
    }

    /// Build from `(id, parent_id)` pairs.
    pub fn from_edges<I: IntoIterator<Item = (Uuid, Option<Uuid>)>>(edges: I) -> Self {
        Self {
            parents: edges.into_iter().collect(),
        }
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.parents.contains_key(&id)
    }

    /// Ancestors of `id`, nearest first, excluding `id` itself. Stops on a
    /// dangling parent or a cycle in corrupt data.
    pub fn ancestors(&self, id: Uuid) -> Vec<Uuid> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut current = self.parents.get(&id).copied().flatten();

        while let Some(parent) = current {
            if !seen.insert(parent) || !self.parents.contains_key(&parent) {
                break;
            }
            chain.push(parent);
            current = self.parents.get(&parent).copied().flatten();
        }
        chain
    }

    /// `id` followed by its ancestors.
    pub fn lineage(&self, id: Uuid) -> Vec<Uuid> {
        let mut lineage = vec![id];
        lineage.extend(self.ancestors(id));
        lineage
    }

    /// True if `ancestor` appears strictly above `id`.
    pub fn is_ancestor(&self, ancestor: Uuid, id: Uuid) -> bool {
        self.ancestors(id).contains(&ancestor)
    }

    /// All units below `id`, breadth first.
    pub fn descendants(&self, id: Uuid) -> Vec<Uuid> {
        let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (&child, parent) in &self.parents {
            if let Some(parent) = parent {
                children.entry(*parent).or_default().push(child);
            }
        }
        for list in children.values_mut() {
            list.sort();
        }

        let mut result = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut frontier = vec![id];
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for node in frontier {
                for &child in children.get(&node).map(Vec::as_slice).unwrap_or(&[]) {
                    if seen.insert(child) {
                        result.push(child);
                        next.push(child);
                    }
                }
            }
            frontier = next;
        }
        result
    }

    /// Check that `unit` may hang under `new_parent`.
    pub fn validate_parent(&self, unit: Uuid, new_parent: Option<Uuid>) -> AppResult<()> {
        let Some(parent) = new_parent else {
            return Ok(());
        };
        if parent == unit {
            return Err(AppError::validation("A unit cannot be its own parent"));
        }
        if !self.contains(parent) {
            return Err(AppError::validation("Parent unit does not exist"));
        }
        if self.is_ancestor(unit, parent) {
            return Err(AppError::validation(
                "Parent unit is a descendant of this unit",
            ));
        }
        Ok(())
    }
}

/// Union of permissions granted to `member_units` or any of their ancestors.
pub fn effective_permissions(
    tree: &UnitTree,
    member_units: &[Uuid],
    grants: &[(Uuid, Permission)],
) -> Vec<Permission> {
    let reachable: HashSet<Uuid> = member_units
        .iter()
        .flat_map(|&unit| tree.lineage(unit))
        .collect();

    let mut permissions: Vec<Permission> = grants
        .iter()
        .filter(|(unit, _)| reachable.contains(unit))
        .map(|(_, permission)| *permission)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    permissions.sort();
    permissions
}

/// Evaluates who may talk to whom inside one tenant.
#[derive(Debug, Clone, Default)]
pub struct CommunicationGraph {
    tree: UnitTree,
    /// user -> units the user belongs to
    memberships: HashMap<Uuid, Vec<Uuid>>,
    /// source unit -> target units reachable through links
    edges: HashMap<Uuid, HashSet<Uuid>>,
}

impl CommunicationGraph {
    pub fn new(
        tree: UnitTree,
        memberships: impl IntoIterator<Item = (Uuid, Uuid)>,
        links: &[CommunicationLink],
    ) -> Self {
        let mut by_user: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (unit, user) in memberships {
            by_user.entry(user).or_default().push(unit);
        }

        let mut edges: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();
        for link in links {
            edges
                .entry(link.source_unit_id)
                .or_default()
                .insert(link.target_unit_id);
            if link.bidirectional {
                edges
                    .entry(link.target_unit_id)
                    .or_default()
                    .insert(link.source_unit_id);
            }
        }

        Self {
            tree,
            memberships: by_user,
            edges,
        }
    }

    fn units_of(&self, user: Uuid) -> &[Uuid] {
        self.memberships
            .get(&user)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Decide whether `from` may contact `to`. Admin overrides are applied
    /// by the caller; this only looks at units and links.
    ///
    /// Allowed when: same user, a shared unit, one user's unit sits above
    /// the other's (chain of command), or a link leads from any unit in
    /// `from`'s lineage to any unit in `to`'s lineage.
    pub fn can_communicate(&self, from: Uuid, to: Uuid) -> bool {
        if from == to {
            return true;
        }

        let from_units = self.units_of(from);
        let to_units = self.units_of(to);
        if from_units.is_empty() || to_units.is_empty() {
            return false;
        }

        let from_lineage: HashSet<Uuid> = from_units
            .iter()
            .flat_map(|&u| self.tree.lineage(u))
            .collect();
        let to_lineage: HashSet<Uuid> = to_units
            .iter()
            .flat_map(|&u| self.tree.lineage(u))
            .collect();

        // Shared unit, or one side's unit is an ancestor of the other's.
        if from_units.iter().any(|u| to_lineage.contains(u))
            || to_units.iter().any(|u| from_lineage.contains(u))
        {
            return true;
        }

        from_lineage.iter().any(|source| {
            self.edges
                .get(source)
                .is_some_and(|targets| targets.iter().any(|t| to_lineage.contains(t)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn link(source: u128, target: u128, bidirectional: bool) -> CommunicationLink {
        CommunicationLink {
            id: Uuid::new_v4(),
            tenant_id: id(999),
            source_unit_id: id(source),
            target_unit_id: id(target),
            bidirectional,
            created_at: Utc::now(),
        }
    }

    /// 1 (HQ)
    /// ├── 2 (Sales)
    /// │   └── 4 (Sales EU)
    /// └── 3 (Engineering)
    ///     └── 5 (Platform)
    /// 6 (Subsidiary, separate root)
    fn tree() -> UnitTree {
        UnitTree::from_edges([
            (id(1), None),
            (id(2), Some(id(1))),
            (id(3), Some(id(1))),
            (id(4), Some(id(2))),
            (id(5), Some(id(3))),
            (id(6), None),
        ])
    }

    #[test]
    fn test_ancestors_nearest_first() {
        assert_eq!(tree().ancestors(id(4)), vec![id(2), id(1)]);
        assert!(tree().ancestors(id(1)).is_empty());
        assert_eq!(tree().lineage(id(5)), vec![id(5), id(3), id(1)]);
    }

    #[test]
    fn test_ancestors_survive_corrupt_cycle() {
        let cyclic = UnitTree::from_edges([(id(1), Some(id(2))), (id(2), Some(id(1)))]);
        assert_eq!(cyclic.ancestors(id(1)), vec![id(2)]);
    }

    #[test]
    fn test_descendants() {
        assert_eq!(
            tree().descendants(id(1)).into_iter().collect::<HashSet<_>>(),
            HashSet::from([id(2), id(3), id(4), id(5)])
        );
        assert!(tree().descendants(id(6)).is_empty());
    }

    #[test]
    fn test_validate_parent_rejects_self_and_cycles() {
        let tree = tree();
        assert!(tree.validate_parent(id(2), None).is_ok());
        assert!(tree.validate_parent(id(2), Some(id(3))).is_ok());
        assert!(tree.validate_parent(id(2), Some(id(2))).is_err());
        // 4 sits below 2, so 2 cannot move under 4
        assert!(tree.validate_parent(id(2), Some(id(4))).is_err());
        assert!(tree.validate_parent(id(2), Some(id(42))).is_err());
    }

    #[test]
    fn test_permissions_inherit_downward() {
        let grants = vec![
            (id(1), Permission::PhoneCall),
            (id(3), Permission::CodeEdit),
            (id(6), Permission::RemoteControl),
        ];
        let platform = effective_permissions(&tree(), &[id(5)], &grants);
        assert_eq!(platform, vec![Permission::PhoneCall, Permission::CodeEdit]);

        let sales = effective_permissions(&tree(), &[id(4)], &grants);
        assert_eq!(sales, vec![Permission::PhoneCall]);

        assert!(effective_permissions(&tree(), &[], &grants).is_empty());
    }

    #[test]
    fn test_permission_parsing() {
        assert_eq!(
            "remote.control".parse::<Permission>().unwrap(),
            Permission::RemoteControl
        );
        assert!("root.everything".parse::<Permission>().is_err());
        let json = serde_json::to_string(&Permission::SpreadsheetEdit).unwrap();
        assert_eq!(json, "\"spreadsheet.edit\"");
    }

    fn graph(links: &[CommunicationLink]) -> CommunicationGraph {
        // users: 10 in HQ(1), 20 in Sales EU(4), 30 in Platform(5),
        // 40 in Sales EU(4), 50 in Subsidiary(6), 60 without unit
        CommunicationGraph::new(
            tree(),
            [
                (id(1), id(10)),
                (id(4), id(20)),
                (id(5), id(30)),
                (id(4), id(40)),
                (id(6), id(50)),
            ],
            links,
        )
    }

    #[test]
    fn test_same_unit_and_self() {
        let g = graph(&[]);
        assert!(g.can_communicate(id(20), id(40)));
        assert!(g.can_communicate(id(60), id(60)));
    }

    #[test]
    fn test_chain_of_command_both_directions() {
        let g = graph(&[]);
        assert!(g.can_communicate(id(10), id(30)));
        assert!(g.can_communicate(id(30), id(10)));
    }

    #[test]
    fn test_sibling_branches_blocked_without_link() {
        let g = graph(&[]);
        assert!(!g.can_communicate(id(20), id(30)));
        assert!(!g.can_communicate(id(30), id(50)));
        assert!(!g.can_communicate(id(60), id(10)));
    }

    #[test]
    fn test_directed_link_between_ancestors() {
        // Sales (2) may reach Engineering (3); covers their descendants.
        let g = graph(&[link(2, 3, false)]);
        assert!(g.can_communicate(id(20), id(30)));
        assert!(!g.can_communicate(id(30), id(20)));
    }

    #[test]
    fn test_bidirectional_link() {
        let g = graph(&[link(5, 6, true)]);
        assert!(g.can_communicate(id(30), id(50)));
        assert!(g.can_communicate(id(50), id(30)));
        assert!(!g.can_communicate(id(20), id(50)));
    }
}
