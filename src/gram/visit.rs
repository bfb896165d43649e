//! Visit a node only once
//!
//! A [`Visitor`] records which node identities a traversal has already
//! processed, so a graph touched from several independent origins at once
//! (a local edit, a remote sync, an external device, a programmatic model
//! update, a timed interpolation) never reprocesses the same node for one
//! logical event.
//!
//! Every mutating operation is atomic under one exclusive lock and holds it
//! across no blocking call, so a single visitor can be shared freely between
//! threads. A visitor is created per traversal, optionally seeded with
//! already-known state, and discarded when the traversal completes; it owns
//! no graph state.

use indexmap::IndexSet;
use parking_lot::Mutex;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::gram::graph::NodeId;

/// Origin flags describing which external actor triggered a visit.
///
/// Flags merge by bitwise union, so merging is associative and commutative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Origin(u16);

impl Origin {
    /// Local edit of the script text.
    pub const EDIT: Origin = Origin(1 << 0);
    /// Programmatic model update.
    pub const MODEL: Origin = Origin(1 << 1);
    /// Direct user gesture.
    pub const GESTURE: Origin = Origin(1 << 2);
    /// External device input.
    pub const DEVICE: Origin = Origin(1 << 3);
    /// Remote peer synchronization.
    pub const REMOTE: Origin = Origin(1 << 4);
    /// Timed interpolation.
    pub const TWEEN: Origin = Origin(1 << 5);

    const NAMES: [(Origin, &'static str); 6] = [
        (Origin::EDIT, "edit"),
        (Origin::MODEL, "model"),
        (Origin::GESTURE, "gesture"),
        (Origin::DEVICE, "device"),
        (Origin::REMOTE, "remote"),
        (Origin::TWEEN, "tween"),
    ];

    pub fn contains(self, other: Origin) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Origin) {
        self.0 |= other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn is_edit(self) -> bool {
        self.contains(Origin::EDIT)
    }

    pub fn is_model(self) -> bool {
        self.contains(Origin::MODEL)
    }

    pub fn is_gesture(self) -> bool {
        self.contains(Origin::GESTURE)
    }

    pub fn is_device(self) -> bool {
        self.contains(Origin::DEVICE)
    }

    pub fn is_remote(self) -> bool {
        self.contains(Origin::REMOTE)
    }

    pub fn is_tween(self) -> bool {
        self.contains(Origin::TWEEN)
    }
}

impl BitOr for Origin {
    type Output = Origin;

    fn bitor(self, rhs: Origin) -> Origin {
        Origin(self.0 | rhs.0)
    }
}

impl BitOrAssign for Origin {
    fn bitor_assign(&mut self, rhs: Origin) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "[{}]", names.join(", "))
    }
}

#[derive(Debug, Default)]
struct VisitState {
    visited: IndexSet<NodeId>,
    blocked: IndexSet<NodeId>,
    origin: Origin,
}

/// Cycle-safe, thread-safe record of visited node identities.
#[derive(Debug, Default)]
pub struct Visitor {
    state: Mutex<VisitState>,
}

impl Visitor {
    pub fn new(origin: Origin) -> Self {
        Self {
            state: Mutex::new(VisitState {
                visited: IndexSet::new(),
                blocked: IndexSet::new(),
                origin,
            }),
        }
    }

    /// A visitor seeded with identities that are already known to be
    /// processed.
    pub fn with_visited(ids: impl IntoIterator<Item = NodeId>, origin: Origin) -> Self {
        let visitor = Self::new(origin);
        visitor.mark_all(ids);
        visitor
    }

    /// First-visit test-and-set: true exactly once per identity, counting
    /// blocked identities as already seen. This is the idempotence
    /// primitive every traversal drives.
    pub fn new_visit(&self, id: NodeId) -> bool {
        let mut state = self.state.lock();
        if state.visited.contains(&id) || state.blocked.contains(&id) {
            false
        } else {
            state.visited.insert(id);
            true
        }
    }

    /// Unconditionally record an identity as visited.
    pub fn mark_visited(&self, id: NodeId) {
        self.state.lock().visited.insert(id);
    }

    /// Unconditionally record several identities as visited.
    pub fn mark_all(&self, ids: impl IntoIterator<Item = NodeId>) {
        let mut state = self.state.lock();
        for id in ids {
            state.visited.insert(id);
        }
    }

    /// Guard an identity while its state is partially constructed: it
    /// behaves as visited for [`new_visit`](Self::new_visit) and
    /// [`was_visited`](Self::was_visited) but is tracked separately.
    pub fn block(&self, id: NodeId) {
        self.state.lock().blocked.insert(id);
    }

    pub fn unblock(&self, id: NodeId) {
        self.state.lock().blocked.shift_remove(&id);
    }

    /// True when the identity was visited or is blocked.
    pub fn was_visited(&self, id: NodeId) -> bool {
        let state = self.state.lock();
        state.visited.contains(&id) || state.blocked.contains(&id)
    }

    /// True only when the identity is currently blocked, letting callers
    /// tell "skipped because guarded" from "skipped because processed".
    pub fn was_blocked(&self, id: NodeId) -> bool {
        self.state.lock().blocked.contains(&id)
    }

    /// Forget a visit so a later [`new_visit`](Self::new_visit) succeeds
    /// again, used when a node's processing is rolled back.
    pub fn remove(&self, id: NodeId) {
        self.state.lock().visited.shift_remove(&id);
    }

    /// Merge additional origin flags into the tag, fluently.
    pub fn with_origin(&self, origin: Origin) -> &Self {
        self.state.lock().origin |= origin;
        self
    }

    pub fn origin(&self) -> Origin {
        self.state.lock().origin
    }

    /// True unless the remote flag is present; callers use this to decide
    /// whether a change should be re-broadcast.
    pub fn is_local_origin(&self) -> bool {
        !self.origin().is_remote()
    }

    /// Snapshot of the visited identities in visit order.
    pub fn visited_ids(&self) -> Vec<NodeId> {
        self.state.lock().visited.iter().copied().collect()
    }
}

impl fmt::Display for Visitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        let ids: Vec<String> = state.visited.iter().map(|id| id.0.to_string()).collect();
        write!(f, "{}:({})", state.origin, ids.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_visit_is_idempotent() {
        let visitor = Visitor::new(Origin::MODEL);
        assert!(visitor.new_visit(NodeId(7)));
        assert!(!visitor.new_visit(NodeId(7)));
        assert!(!visitor.new_visit(NodeId(7)));
        assert!(visitor.new_visit(NodeId(8)));
    }

    #[test]
    fn test_remove_allows_a_fresh_visit() {
        let visitor = Visitor::new(Origin::MODEL);
        assert!(visitor.new_visit(NodeId(1)));
        visitor.remove(NodeId(1));
        assert!(visitor.new_visit(NodeId(1)));
    }

    #[test]
    fn test_blocked_counts_as_visited_but_is_tracked_apart() {
        let visitor = Visitor::new(Origin::MODEL);
        visitor.block(NodeId(3));
        assert!(!visitor.new_visit(NodeId(3)));
        assert!(visitor.was_visited(NodeId(3)));
        assert!(visitor.was_blocked(NodeId(3)));
        assert!(!visitor.was_blocked(NodeId(4)));

        visitor.unblock(NodeId(3));
        assert!(visitor.new_visit(NodeId(3)));
        assert!(!visitor.was_blocked(NodeId(3)));
    }

    #[test]
    fn test_seeding_marks_ids_visited() {
        let visitor = Visitor::with_visited([NodeId(1), NodeId(2)], Origin::EDIT);
        assert!(!visitor.new_visit(NodeId(1)));
        assert!(!visitor.new_visit(NodeId(2)));
        assert!(visitor.new_visit(NodeId(3)));
    }

    #[test]
    fn test_origin_merge_and_local_check() {
        let visitor = Visitor::new(Origin::EDIT);
        assert!(visitor.is_local_origin());
        visitor.with_origin(Origin::TWEEN).with_origin(Origin::REMOTE);
        assert!(visitor.origin().is_edit());
        assert!(visitor.origin().is_tween());
        assert!(!visitor.is_local_origin());
    }

    #[test]
    fn test_display_lists_origin_and_visits() {
        let visitor = Visitor::new(Origin::EDIT | Origin::REMOTE);
        visitor.mark_visited(NodeId(2));
        visitor.mark_visited(NodeId(5));
        assert_eq!(visitor.to_string(), "[edit, remote]:(2,5)");
    }
}
