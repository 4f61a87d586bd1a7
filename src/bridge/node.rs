//! Node arena - identity allocation for engine-visible nodes.
//!
//! The grid engine and the mounted components exchange opaque node handles
//! (the stand-in for whatever the embedding toolkit renders into). The
//! arena tracks which handles are alive and where they are attached, with a
//! free pool for O(1) index reuse.

use ahash::AHashMap;

/// Opaque handle to a mounted node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

/// Allocator and attachment tracker for node handles.
#[derive(Debug, Default)]
pub struct NodeArena {
    next: u32,
    free: Vec<u32>,
    /// Alive nodes and their parent (None while detached).
    parents: AHashMap<NodeId, Option<NodeId>>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh, detached node.
    pub fn create(&mut self) -> NodeId {
        let index = self.free.pop().unwrap_or_else(|| {
            let index = self.next;
            self.next += 1;
            index
        });
        let node = NodeId(index);
        self.parents.insert(node, None);
        node
    }

    /// Attach a node under a parent. Re-attaching moves it.
    pub fn attach(&mut self, child: NodeId, parent: NodeId) {
        if let Some(slot) = self.parents.get_mut(&child) {
            *slot = Some(parent);
        }
    }

    /// Detach a node from its parent, keeping it alive.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(slot) = self.parents.get_mut(&node) {
            *slot = None;
        }
    }

    /// Detach and free a node, returning its index to the pool.
    pub fn release(&mut self, node: NodeId) {
        if self.parents.remove(&node).is_some() {
            self.free.push(node.0);
        }
    }

    pub fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.parents.get(&node).copied().flatten()
    }

    pub fn is_alive(&self, node: NodeId) -> bool {
        self.parents.contains_key(&node)
    }

    pub fn live_count(&self) -> usize {
        self.parents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_attach_detach_release() {
        let mut arena = NodeArena::new();
        let parent = arena.create();
        let child = arena.create();
        assert!(arena.is_alive(child));
        assert_eq!(arena.parent_of(child), None);

        arena.attach(child, parent);
        assert_eq!(arena.parent_of(child), Some(parent));

        arena.detach(child);
        assert_eq!(arena.parent_of(child), None);
        assert!(arena.is_alive(child));

        arena.release(child);
        assert!(!arena.is_alive(child));
        assert_eq!(arena.live_count(), 1);
    }

    #[test]
    fn released_indices_are_reused() {
        let mut arena = NodeArena::new();
        let a = arena.create();
        arena.release(a);
        let b = arena.create();
        assert_eq!(a, b);
    }

    #[test]
    fn reattach_moves_the_node() {
        let mut arena = NodeArena::new();
        let p1 = arena.create();
        let p2 = arena.create();
        let child = arena.create();
        arena.attach(child, p1);
        arena.attach(child, p2);
        assert_eq!(arena.parent_of(child), Some(p2));
    }
}
