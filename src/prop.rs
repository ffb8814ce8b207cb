//! Property list (§4 item 1): singly-linked annotations on expressions and
//! relations carrying planner hints.
//!
//! The original compiler threads these as a linked list of heterogeneous
//! pointers; per the design notes (§9) we encode each possible annotation as
//! a variant of a sum type and keep a flat `Vec` rather than reimplementing a
//! linked list.

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Prop {
    /// Authorizes the hash-probe short-circuit in `rel2bin_select` (§4.3.5,
    /// §4.3.11): the index to hash-probe into.
    HashIdx { index_name: String },
    /// Marks a join-equality predicate as backed by a join index, letting
    /// join lowering bypass general evaluation (§4.3.3).
    JoinIdx { index_name: String },
    /// Marks the base table in a plan carrying the most rows seen during
    /// planning (§4 item 5, `rel_partition`).
    Partition,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PropList(Vec<Prop>);

impl PropList {
    pub fn new() -> Self {
        PropList(Vec::new())
    }

    pub fn push(&mut self, prop: Prop) {
        self.0.push(prop);
    }

    pub fn has_hash_idx(&self) -> Option<&str> {
        self.0.iter().find_map(|p| match p {
            Prop::HashIdx { index_name } => Some(index_name.as_str()),
            _ => None,
        })
    }

    pub fn has_join_idx(&self) -> Option<&str> {
        self.0.iter().find_map(|p| match p {
            Prop::JoinIdx { index_name } => Some(index_name.as_str()),
            _ => None,
        })
    }

    pub fn is_partition(&self) -> bool {
        self.0.iter().any(|p| matches!(p, Prop::Partition))
    }

    pub fn set_partition(&mut self) {
        if !self.is_partition() {
            self.0.push(Prop::Partition);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Prop> {
        self.0.iter()
    }
}
