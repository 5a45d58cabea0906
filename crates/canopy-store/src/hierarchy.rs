//! Hierarchy and link engine.
//!
//! The only code that writes the relation fields of an [`Issue`]. Every
//! operation validates first, then updates both endpoints in memory; callers
//! persist the whole dataset once afterwards.
//!
//! Maintained invariants:
//! - `x.parentId == y` iff `y.childIds` contains `x`
//! - `x.blocks` contains `y` iff `y.blockedBy` contains `x`
//! - `x.relatedTo` contains `y` iff `y.relatedTo` contains `x`
//! - parent/child edges form a forest

use crate::dataset::Dataset;
use crate::issue::Issue;
use std::collections::{BTreeSet, HashSet, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HierarchyError {
    #[error("issue not found: {0}")]
    NotFound(String),

    #[error("circular reference: {parent} cannot become the parent of {issue}")]
    CircularReference { issue: String, parent: String },

    #[error("invalid link type `{0}` (expected one of: blocks, blocked_by, relates_to)")]
    InvalidLinkType(String),

    #[error("invalid link action `{0}` (expected create or remove)")]
    InvalidLinkAction(String),

    #[error("invalid link: {0}")]
    InvalidLink(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    Blocks,
    BlockedBy,
    RelatesTo,
}

impl LinkType {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkType::Blocks => "blocks",
            LinkType::BlockedBy => "blocked_by",
            LinkType::RelatesTo => "relates_to",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, HierarchyError> {
        let normalized = raw
            .trim()
            .to_lowercase()
            .replace(['-', ' '], "_");
        match normalized.as_str() {
            "blocks" | "block" => Ok(LinkType::Blocks),
            "blocked_by" | "is_blocked_by" => Ok(LinkType::BlockedBy),
            "relates_to" | "relates" | "related" | "related_to" => Ok(LinkType::RelatesTo),
            _ => Err(HierarchyError::InvalidLinkType(raw.to_string())),
        }
    }

    /// `(field on the source, mirror field on the target)`.
    fn fields(self) -> (RelationField, RelationField) {
        match self {
            LinkType::Blocks => (RelationField::Blocks, RelationField::BlockedBy),
            LinkType::BlockedBy => (RelationField::BlockedBy, RelationField::Blocks),
            LinkType::RelatesTo => (RelationField::RelatedTo, RelationField::RelatedTo),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    Create,
    Remove,
}

impl LinkAction {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkAction::Create => "create",
            LinkAction::Remove => "remove",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, HierarchyError> {
        match raw.trim().to_lowercase().as_str() {
            "create" | "add" | "link" => Ok(LinkAction::Create),
            "remove" | "delete" | "unlink" => Ok(LinkAction::Remove),
            _ => Err(HierarchyError::InvalidLinkAction(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelationField {
    Blocks,
    BlockedBy,
    RelatedTo,
}

impl Issue {
    fn relation_mut(&mut self, field: RelationField) -> &mut Vec<String> {
        match field {
            RelationField::Blocks => &mut self.blocks,
            RelationField::BlockedBy => &mut self.blocked_by,
            RelationField::RelatedTo => &mut self.related_to,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub issue_id: String,
    pub issue_key: String,
    pub previous_parent_id: Option<String>,
    pub new_parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOutcome {
    pub source_id: String,
    pub source_key: String,
    pub target_id: String,
    pub target_key: String,
    pub link_type: LinkType,
    pub action: LinkAction,
    /// False when the link already existed (create) or was absent (remove).
    pub changed: bool,
}

impl Dataset {
    /// Re-parent an issue, or detach it to root level with `None`.
    ///
    /// Rejects moves under the issue itself or under any of its descendants.
    pub fn move_issue(
        &mut self,
        id_or_key: &str,
        new_parent: Option<&str>,
    ) -> Result<MoveOutcome, HierarchyError> {
        let idx = self
            .index_of(id_or_key)
            .ok_or_else(|| HierarchyError::NotFound(id_or_key.to_string()))?;
        let issue_id = self.issues[idx].id.clone();
        let issue_key = self.issues[idx].key.clone();

        let parent_idx = match new_parent {
            Some(parent_ref) => {
                let parent_idx = self
                    .index_of(parent_ref)
                    .ok_or_else(|| HierarchyError::NotFound(parent_ref.to_string()))?;
                if parent_idx == idx || self.has_ancestor(parent_idx, &issue_id) {
                    return Err(HierarchyError::CircularReference {
                        issue: issue_key,
                        parent: self.issues[parent_idx].key.clone(),
                    });
                }
                Some(parent_idx)
            }
            None => None,
        };

        let previous_parent_id = self.issues[idx].parent_id.clone();
        let mut touched = BTreeSet::from([idx]);

        for (other_idx, other) in self.issues.iter_mut().enumerate() {
            if other.child_ids.contains(&issue_id) {
                other.child_ids.retain(|child| *child != issue_id);
                touched.insert(other_idx);
            }
        }

        let new_parent_id = match parent_idx {
            Some(parent_idx) => {
                let parent_id = self.issues[parent_idx].id.clone();
                self.issues[parent_idx].child_ids.push(issue_id.clone());
                self.issues[idx].parent_id = Some(parent_id.clone());
                touched.insert(parent_idx);
                Some(parent_id)
            }
            None => {
                self.issues[idx].parent_id = None;
                None
            }
        };

        for touched_idx in touched {
            self.issues[touched_idx].touch_updated_at();
        }

        tracing::debug!(
            issue = %issue_key,
            previous_parent = ?previous_parent_id,
            new_parent = ?new_parent_id,
            "moved issue"
        );
        Ok(MoveOutcome {
            issue_id,
            issue_key,
            previous_parent_id,
            new_parent_id,
        })
    }

    /// Create or remove a typed link, updating the mirror field on the target.
    ///
    /// Creating an existing link and removing a missing one are no-ops.
    pub fn link_issues(
        &mut self,
        source: &str,
        target: &str,
        link_type: LinkType,
        action: LinkAction,
    ) -> Result<LinkOutcome, HierarchyError> {
        let source_idx = self
            .index_of(source)
            .ok_or_else(|| HierarchyError::NotFound(source.to_string()))?;
        let target_idx = self
            .index_of(target)
            .ok_or_else(|| HierarchyError::NotFound(target.to_string()))?;
        if source_idx == target_idx {
            return Err(HierarchyError::InvalidLink(format!(
                "{} cannot be linked to itself",
                self.issues[source_idx].key
            )));
        }

        let source_id = self.issues[source_idx].id.clone();
        let target_id = self.issues[target_idx].id.clone();
        let (forward, mirror) = link_type.fields();

        let changed = match action {
            LinkAction::Create => {
                let forward_added =
                    push_unique(self.issues[source_idx].relation_mut(forward), &target_id);
                let mirror_added =
                    push_unique(self.issues[target_idx].relation_mut(mirror), &source_id);
                forward_added || mirror_added
            }
            LinkAction::Remove => {
                let mirror_removed =
                    remove_all(self.issues[target_idx].relation_mut(mirror), &source_id);
                let forward_removed =
                    remove_all(self.issues[source_idx].relation_mut(forward), &target_id);
                forward_removed || mirror_removed
            }
        };

        self.issues[source_idx].touch_updated_at();
        self.issues[target_idx].touch_updated_at();

        Ok(LinkOutcome {
            source_id,
            source_key: self.issues[source_idx].key.clone(),
            target_id,
            target_key: self.issues[target_idx].key.clone(),
            link_type,
            action,
            changed,
        })
    }

    /// Direct parent of an issue, if it has one that resolves.
    pub fn parent_of(&self, issue: &Issue) -> Option<&Issue> {
        issue
            .parent_id()
            .and_then(|parent_id| self.index_of_id(parent_id))
            .map(|idx| &self.issues[idx])
    }

    /// Descendants in breadth-first order, paired with their depth (1 = child).
    ///
    /// `max_depth = None` walks the whole subtree. Each issue is visited once,
    /// so corrupt cyclic data still terminates.
    pub fn descendants_breadth_first(
        &self,
        root: &Issue,
        max_depth: Option<usize>,
    ) -> Vec<(usize, &Issue)> {
        let mut out = Vec::new();
        let mut seen: HashSet<&str> = HashSet::from([root.id.as_str()]);
        let mut queue: VecDeque<(usize, &Issue)> = VecDeque::from([(0, root)]);

        while let Some((depth, node)) = queue.pop_front() {
            if max_depth.is_some_and(|limit| depth >= limit) {
                continue;
            }
            for child_id in node.child_ids() {
                let Some(child_idx) = self.index_of_id(child_id) else {
                    continue;
                };
                let child = &self.issues[child_idx];
                if seen.insert(child.id.as_str()) {
                    out.push((depth + 1, child));
                    queue.push_back((depth + 1, child));
                }
            }
        }
        out
    }

    /// Walk the parent chain above `start_idx` looking for `ancestor_id`.
    /// Bounded by the issue count so a corrupt cycle cannot hang the walk.
    fn has_ancestor(&self, start_idx: usize, ancestor_id: &str) -> bool {
        let mut cursor = self.issues[start_idx].parent_id.clone();
        let mut steps = 0usize;
        while let Some(current) = cursor {
            if current == ancestor_id {
                return true;
            }
            steps += 1;
            if steps > self.issues.len() {
                tracing::warn!(start = %self.issues[start_idx].key, "parent chain does not terminate");
                return false;
            }
            cursor = self
                .index_of_id(&current)
                .and_then(|idx| self.issues[idx].parent_id.clone());
        }
        false
    }
}

fn push_unique(values: &mut Vec<String>, value: &str) -> bool {
    if values.iter().any(|existing| existing == value) {
        return false;
    }
    values.push(value.to_string());
    true
}

fn remove_all(values: &mut Vec<String>, value: &str) -> bool {
    let before = values.len();
    values.retain(|existing| existing != value);
    values.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::IssueType;

    fn dataset(keys: &[&str]) -> Dataset {
        let issues = keys
            .iter()
            .map(|key| {
                Issue::new(
                    format!("id-{key}"),
                    key.to_string(),
                    IssueType::Task,
                    format!("Issue {key}"),
                    "u-1",
                )
            })
            .collect();
        Dataset::new(issues, vec![], vec![], vec![])
    }

    fn issue<'a>(dataset: &'a Dataset, key: &str) -> &'a Issue {
        dataset.issue(key).expect("issue should exist")
    }

    fn snapshot_hierarchy(dataset: &Dataset) -> Vec<(String, Option<String>, Vec<String>)> {
        dataset
            .issues()
            .iter()
            .map(|issue| {
                (
                    issue.id.clone(),
                    issue.parent_id().map(str::to_string),
                    issue.child_ids().to_vec(),
                )
            })
            .collect()
    }

    #[test]
    fn move_sets_both_sides_of_parent_link() {
        let mut data = dataset(&["A-1", "A-2"]);
        let outcome = data
            .move_issue("A-2", Some("A-1"))
            .expect("move should succeed");

        assert_eq!(outcome.new_parent_id.as_deref(), Some("id-A-1"));
        assert_eq!(issue(&data, "A-2").parent_id(), Some("id-A-1"));
        assert_eq!(issue(&data, "A-1").child_ids(), ["id-A-2".to_string()]);
    }

    #[test]
    fn reparent_detaches_from_previous_parent() {
        let mut data = dataset(&["A-1", "A-2", "A-3"]);
        data.move_issue("A-3", Some("A-1")).expect("first move");
        data.move_issue("A-3", Some("A-2")).expect("second move");

        assert!(issue(&data, "A-1").child_ids().is_empty());
        assert_eq!(issue(&data, "A-2").child_ids(), ["id-A-3".to_string()]);
        assert_eq!(issue(&data, "A-3").parent_id(), Some("id-A-2"));
    }

    #[test]
    fn move_to_root_clears_parent_everywhere() {
        let mut data = dataset(&["A-1", "A-2"]);
        data.move_issue("A-2", Some("A-1")).expect("move under parent");
        let outcome = data.move_issue("A-2", None).expect("move to root");

        assert_eq!(outcome.previous_parent_id.as_deref(), Some("id-A-1"));
        assert_eq!(issue(&data, "A-2").parent_id(), None);
        assert!(
            data.issues()
                .iter()
                .all(|other| !other.child_ids().contains(&"id-A-2".to_string()))
        );
    }

    #[test]
    fn move_under_self_is_circular_and_changes_nothing() {
        let mut data = dataset(&["A-1"]);
        let before = snapshot_hierarchy(&data);
        let err = data
            .move_issue("A-1", Some("A-1"))
            .expect_err("self parent must fail");

        assert!(matches!(err, HierarchyError::CircularReference { .. }));
        assert_eq!(snapshot_hierarchy(&data), before);
    }

    #[test]
    fn move_under_descendant_is_circular_and_changes_nothing() {
        let mut data = dataset(&["A-1", "A-2", "A-3"]);
        data.move_issue("A-2", Some("A-1")).expect("A-2 under A-1");
        data.move_issue("A-3", Some("A-2")).expect("A-3 under A-2");
        let before = snapshot_hierarchy(&data);

        let err = data
            .move_issue("A-1", Some("A-3"))
            .expect_err("ancestor under descendant must fail");
        assert_eq!(
            err,
            HierarchyError::CircularReference {
                issue: "A-1".to_string(),
                parent: "A-3".to_string()
            }
        );
        assert_eq!(snapshot_hierarchy(&data), before);
    }

    #[test]
    fn move_with_unknown_endpoints_is_not_found() {
        let mut data = dataset(&["A-1"]);
        assert_eq!(
            data.move_issue("A-9", None),
            Err(HierarchyError::NotFound("A-9".to_string()))
        );
        assert_eq!(
            data.move_issue("A-1", Some("A-9")),
            Err(HierarchyError::NotFound("A-9".to_string()))
        );
    }

    #[test]
    fn blocks_link_is_paired_and_removable() {
        let mut data = dataset(&["A-1", "A-2"]);
        data.link_issues("A-1", "A-2", LinkType::Blocks, LinkAction::Create)
            .expect("create should succeed");

        assert_eq!(issue(&data, "A-1").blocks(), ["id-A-2".to_string()]);
        assert_eq!(issue(&data, "A-2").blocked_by(), ["id-A-1".to_string()]);

        data.link_issues("A-1", "A-2", LinkType::Blocks, LinkAction::Remove)
            .expect("remove should succeed");
        assert!(issue(&data, "A-1").blocks().is_empty());
        assert!(issue(&data, "A-2").blocked_by().is_empty());
    }

    #[test]
    fn blocked_by_is_the_mirror_of_blocks() {
        let mut data = dataset(&["A-1", "A-2"]);
        data.link_issues("A-2", "A-1", LinkType::BlockedBy, LinkAction::Create)
            .expect("create should succeed");

        assert_eq!(issue(&data, "A-2").blocked_by(), ["id-A-1".to_string()]);
        assert_eq!(issue(&data, "A-1").blocks(), ["id-A-2".to_string()]);
    }

    #[test]
    fn create_is_idempotent_and_remove_of_missing_link_is_noop() {
        let mut data = dataset(&["A-1", "A-2"]);
        let first = data
            .link_issues("A-1", "A-2", LinkType::Blocks, LinkAction::Create)
            .expect("first create");
        let second = data
            .link_issues("A-1", "A-2", LinkType::Blocks, LinkAction::Create)
            .expect("second create");
        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(issue(&data, "A-1").blocks().len(), 1);

        let removed = data
            .link_issues("A-2", "A-1", LinkType::RelatesTo, LinkAction::Remove)
            .expect("missing link removal is fine");
        assert!(!removed.changed);
    }

    #[test]
    fn relates_to_is_symmetric_in_either_order() {
        for (source, target) in [("A-1", "A-2"), ("A-2", "A-1")] {
            let mut data = dataset(&["A-1", "A-2"]);
            data.link_issues(source, target, LinkType::RelatesTo, LinkAction::Create)
                .expect("create should succeed");
            assert_eq!(issue(&data, "A-1").related_to(), ["id-A-2".to_string()]);
            assert_eq!(issue(&data, "A-2").related_to(), ["id-A-1".to_string()]);
        }
    }

    #[test]
    fn self_link_and_unknown_link_type_are_rejected() {
        let mut data = dataset(&["A-1"]);
        assert!(matches!(
            data.link_issues("A-1", "A-1", LinkType::Blocks, LinkAction::Create),
            Err(HierarchyError::InvalidLink(_))
        ));
        assert_eq!(
            LinkType::parse("duplicates"),
            Err(HierarchyError::InvalidLinkType("duplicates".to_string()))
        );
        assert_eq!(LinkType::parse("Blocked-By"), Ok(LinkType::BlockedBy));
        assert_eq!(LinkAction::parse("REMOVE"), Ok(LinkAction::Remove));
    }

    #[test]
    fn descendants_are_breadth_first_and_depth_limited() {
        let mut data = dataset(&["A-1", "A-2", "A-3", "A-4"]);
        data.move_issue("A-2", Some("A-1")).expect("A-2 under A-1");
        data.move_issue("A-4", Some("A-2")).expect("A-4 under A-2");
        data.move_issue("A-3", Some("A-1")).expect("A-3 under A-1");

        let root = issue(&data, "A-1");
        let all: Vec<(usize, &str)> = data
            .descendants_breadth_first(root, None)
            .into_iter()
            .map(|(depth, issue)| (depth, issue.key.as_str()))
            .collect();
        assert_eq!(all, vec![(1, "A-2"), (1, "A-3"), (2, "A-4")]);

        let direct = data.descendants_breadth_first(root, Some(1));
        assert_eq!(direct.len(), 2);
        assert!(data.descendants_breadth_first(root, Some(0)).is_empty());
        assert_eq!(
            data.parent_of(issue(&data, "A-4")).map(|p| p.key.as_str()),
            Some("A-2")
        );
    }
}
