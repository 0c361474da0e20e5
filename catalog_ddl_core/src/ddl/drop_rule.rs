use std::collections::HashMap;

use crate::catalog::{LinkEnd, ObjectKind, RelationshipType, TypeTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropAction {
    /// The element at the other end is deleted too.
    Cascade,
    /// The drop fails unless the statement asked for CASCADE.
    Restrict,
}

/// Reaction to a link being severed because the element at `end` is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropRule {
    pub end: LinkEnd,
    /// When set, the dropped element must be of this type for the rule to fire.
    pub removed_filter: Option<TypeTag>,
    pub action: DropAction,
}

impl DropRule {
    pub fn new(end: LinkEnd, removed_filter: Option<TypeTag>, action: DropAction) -> Self {
        Self {
            end,
            removed_filter,
            action,
        }
    }

    pub fn cascade(end: LinkEnd) -> Self {
        Self::new(end, None, DropAction::Cascade)
    }

    pub fn restrict(end: LinkEnd) -> Self {
        Self::new(end, None, DropAction::Restrict)
    }

    pub fn with_filter(mut self, tag: TypeTag) -> Self {
        self.removed_filter = Some(tag);
        self
    }

    /// Whether the rule fires for an element of `removed_kind` dropped at `end`.
    pub fn applies_to(&self, end: LinkEnd, removed_kind: ObjectKind) -> bool {
        if self.end != end {
            return false;
        }
        match self.removed_filter {
            Some(tag) => removed_kind.is_a(tag),
            None => true,
        }
    }
}

/// Rules per relationship type, fixed once built.
#[derive(Debug, Default)]
pub struct DropRuleTable {
    rules: HashMap<RelationshipType, Vec<DropRule>>,
}

impl DropRuleTable {
    pub fn builder() -> DropRuleTableBuilder {
        DropRuleTableBuilder::default()
    }

    pub fn rules_for(&self, relationship: RelationshipType) -> &[DropRule] {
        self.rules
            .get(&relationship)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.rules.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct DropRuleTableBuilder {
    rules: HashMap<RelationshipType, Vec<DropRule>>,
}

impl DropRuleTableBuilder {
    pub fn add(&mut self, relationship: RelationshipType, rule: DropRule) -> &mut Self {
        self.rules.entry(relationship).or_default().push(rule);
        self
    }

    pub fn build(self) -> DropRuleTable {
        DropRuleTable { rules: self.rules }
    }
}
