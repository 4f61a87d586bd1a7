//! Renderer adapter - a declarative component behind the engine's renderer
//! callback.
//!
//! The engine invokes the adapter for every redraw of every cell. Mounting
//! a declarative component is the dominant cost driver for large grids, so
//! the adapter caches the live instance per cell identity and, on a hit,
//! only pushes the new cell state into it and re-attaches its existing
//! root node.

use std::cell::RefCell;
use std::rc::Rc;

use crate::bridge::component::{CellContext, ComponentCtor, PropBag, RENDERER_MARKER};
use crate::bridge::node::{NodeArena, NodeId};
use crate::bridge::CachedCell;
use crate::cache::LruCache;
use crate::types::CacheKey;

pub(crate) type RendererCache = Rc<RefCell<LruCache<CacheKey, CachedCell>>>;

struct RendererShared {
    ctor: ComponentCtor,
    props: PropBag,
    cache: RendererCache,
    arena: Rc<RefCell<NodeArena>>,
}

/// Cheaply cloneable adapter matching the grid engine's renderer callback
/// shape: `(target_node, cell) -> node`.
#[derive(Clone)]
pub struct RendererHandle {
    inner: Rc<RendererShared>,
}

impl RendererHandle {
    pub(crate) fn new(
        ctor: ComponentCtor,
        props: PropBag,
        cache: RendererCache,
        arena: Rc<RefCell<NodeArena>>,
    ) -> Self {
        Self {
            inner: Rc::new(RendererShared {
                ctor,
                props,
                cache,
                arena,
            }),
        }
    }

    /// Render one cell: reuse the cached instance for this cell identity,
    /// or instantiate and mount on first sight. Returns the target node for
    /// the engine to place.
    pub fn render(&self, target: NodeId, cell: &CellContext) -> NodeId {
        let key = CacheKey::Cell {
            row: cell.row,
            col: cell.col,
        };

        let mut cache = self.inner.cache.borrow_mut();
        if let Some(cached) = cache.get(&key) {
            cached.instance.as_cell_mut().set_cell(cell);
            self.inner.arena.borrow_mut().attach(cached.root, target);
            return target;
        }

        let mut props = self.inner.props.clone();
        props.insert(RENDERER_MARKER, true);
        let mut mounted = self
            .inner
            .ctor
            .mount(&props, &mut self.inner.arena.borrow_mut());
        mounted.instance.as_cell_mut().set_cell(cell);
        self.inner.arena.borrow_mut().attach(mounted.root, target);
        cache.set(
            key,
            CachedCell {
                instance: mounted.instance,
                root: mounted.root,
            },
        );
        target
    }

    /// Name of the wrapped component.
    pub fn component_name(&self) -> &str {
        self.inner.ctor.name()
    }

    /// Identity comparison - two handles are the same adapter.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for RendererHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererHandle")
            .field("component", &self.inner.ctor.name())
            .finish_non_exhaustive()
    }
}
