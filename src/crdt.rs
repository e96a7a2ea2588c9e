use crate::error::{LinesError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifier of a concurrently-authored item: one author byte plus a
/// per-author counter. Total order is lexicographic on (author, counter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CrdtId {
    pub author: u8,
    pub counter: u64,
}

impl CrdtId {
    /// Sentinel meaning "start of sequence" as a left reference and
    /// "end of sequence" as a right reference.
    pub const END_MARKER: CrdtId = CrdtId {
        author: 0,
        counter: 0,
    };

    pub fn new(author: u8, counter: u64) -> Self {
        Self { author, counter }
    }
}

impl fmt::Display for CrdtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.author, self.counter)
    }
}

/// Last-writer-wins register: the entry with the larger timestamp wins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LwwValue<T> {
    pub timestamp: CrdtId,
    pub value: T,
}

impl<T> LwwValue<T> {
    pub fn new(timestamp: CrdtId, value: T) -> Self {
        Self { timestamp, value }
    }

    /// Register with the zero timestamp, used for defaulted fields.
    pub fn unset(value: T) -> Self {
        Self {
            timestamp: CrdtId::END_MARKER,
            value,
        }
    }
}

/// Sequence entry payload. Deleted entries keep their span length but
/// carry no value, so "value present iff not deleted" holds by type.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemValue<T> {
    Present(T),
    Tombstone { length: u32 },
}

impl<T> ItemValue<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            ItemValue::Present(v) => Some(v),
            ItemValue::Tombstone { .. } => None,
        }
    }

    pub fn deleted_length(&self) -> u32 {
        match self {
            ItemValue::Present(_) => 0,
            ItemValue::Tombstone { length } => *length,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, ItemValue::Tombstone { .. })
    }
}

/// One CRDT sequence entry: the item id plus the ids of its neighbours
/// at insertion time. `END_MARKER` on either side refers to the
/// corresponding end of the sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct CrdtSequenceItem<T> {
    pub item_id: CrdtId,
    pub left_id: CrdtId,
    pub right_id: CrdtId,
    pub value: ItemValue<T>,
}

impl<T> CrdtSequenceItem<T> {
    pub fn new(item_id: CrdtId, left_id: CrdtId, right_id: CrdtId, value: T) -> Self {
        Self {
            item_id,
            left_id,
            right_id,
            value: ItemValue::Present(value),
        }
    }

    pub fn tombstone(item_id: CrdtId, left_id: CrdtId, right_id: CrdtId, length: u32) -> Self {
        Self {
            item_id,
            left_id,
            right_id,
            value: ItemValue::Tombstone { length },
        }
    }
}

/// Ordered container keyed by CRDT id. Entry order is not the key
/// order; it is recovered from the left/right references by
/// `sorted_ids`.
#[derive(Debug, Clone, PartialEq)]
pub struct CrdtSequence<T> {
    items: BTreeMap<CrdtId, CrdtSequenceItem<T>>,
}

impl<T> Default for CrdtSequence<T> {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }
}

impl<T> CrdtSequence<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn insert(&mut self, item: CrdtSequenceItem<T>) -> Result<()> {
        if self.items.contains_key(&item.item_id) {
            return Err(LinesError::DuplicateId(item.item_id));
        }
        self.items.insert(item.item_id, item);
        Ok(())
    }

    pub fn get(&self, id: CrdtId) -> Option<&CrdtSequenceItem<T>> {
        self.items.get(&id)
    }

    pub fn contains(&self, id: CrdtId) -> bool {
        self.items.contains_key(&id)
    }

    /// Iterate entries in key order (not sequence order).
    pub fn iter(&self) -> impl Iterator<Item = &CrdtSequenceItem<T>> {
        self.items.values()
    }

    /// Ids in canonical sequence order.
    pub fn sorted_ids(&self) -> Result<Vec<CrdtId>> {
        toposort(&self.items)
    }

    /// Entries in canonical sequence order.
    pub fn sorted_items(&self) -> Result<Vec<&CrdtSequenceItem<T>>> {
        Ok(self
            .sorted_ids()?
            .iter()
            .filter_map(|id| self.items.get(id))
            .collect())
    }

    /// (id, entry) pairs in canonical sequence order.
    pub fn sorted_pairs(&self) -> Result<Vec<(CrdtId, &CrdtSequenceItem<T>)>> {
        Ok(self
            .sorted_ids()?
            .iter()
            .filter_map(|id| self.items.get(id).map(|item| (*id, item)))
            .collect())
    }

    /// Present values in canonical sequence order; tombstones are skipped.
    pub fn sorted_values(&self) -> Result<Vec<&T>> {
        Ok(self
            .sorted_items()?
            .into_iter()
            .filter_map(|item| item.value.value())
            .collect())
    }
}

/// Sort key for the linearisation graph. The sentinels bracket every
/// id so the derived `Ord` breaks layer ties by ascending CRDT id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum SortNode {
    Start,
    Id(CrdtId),
    End,
}

/// Kahn-style layered topological sort over the left/right relation.
///
/// Each entry comes after its left reference (the end-marker counts as
/// a graph node; a dangling reference degrades to the start sentinel)
/// and before its right reference (dangling or end-marker degrades to
/// the end sentinel). Layers are peeled in ascending id order, which
/// makes the result deterministic across runs and platforms.
fn toposort<T>(items: &BTreeMap<CrdtId, CrdtSequenceItem<T>>) -> Result<Vec<CrdtId>> {
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let mut incoming: BTreeMap<SortNode, BTreeSet<SortNode>> = BTreeMap::new();
    let mut outgoing: BTreeMap<SortNode, BTreeSet<SortNode>> = BTreeMap::new();
    incoming.entry(SortNode::Start).or_default();
    incoming.entry(SortNode::End).or_default();

    let add_edge = |incoming: &mut BTreeMap<SortNode, BTreeSet<SortNode>>,
                    outgoing: &mut BTreeMap<SortNode, BTreeSet<SortNode>>,
                    from: SortNode,
                    to: SortNode| {
        incoming.entry(from).or_default();
        incoming.entry(to).or_default().insert(from);
        outgoing.entry(from).or_default().insert(to);
    };

    for (id, item) in items {
        let node = SortNode::Id(*id);
        let left = if item.left_id == CrdtId::END_MARKER || items.contains_key(&item.left_id) {
            SortNode::Id(item.left_id)
        } else {
            SortNode::Start
        };
        let right = if items.contains_key(&item.right_id) {
            SortNode::Id(item.right_id)
        } else {
            SortNode::End
        };
        add_edge(&mut incoming, &mut outgoing, left, node);
        add_edge(&mut incoming, &mut outgoing, node, right);
    }

    let mut result = Vec::with_capacity(items.len());
    loop {
        let ready: Vec<SortNode> = incoming
            .iter()
            .filter(|(_, sources)| sources.is_empty())
            .map(|(node, _)| *node)
            .collect();

        if ready.is_empty() {
            return Err(LinesError::CyclicOrder);
        }
        if ready == [SortNode::End] {
            // Done only once every other node has been peeled; a cycle
            // that never touches the end marker leaves its members
            // stuck with nonzero in-degrees while the sentinel idles.
            if incoming.len() == 1 {
                return Ok(result);
            }
            return Err(LinesError::CyclicOrder);
        }

        for node in ready {
            // The end sentinel is only peeled once it is alone.
            if node == SortNode::End {
                continue;
            }
            if let SortNode::Id(id) = node {
                if items.contains_key(&id) {
                    result.push(id);
                }
            }
            incoming.remove(&node);
            if let Some(successors) = outgoing.remove(&node) {
                for succ in successors {
                    if let Some(sources) = incoming.get_mut(&succ) {
                        sources.remove(&node);
                    }
                }
            }
        }
    }
}
