//! Component bridge - declarative children as engine cell handlers.
//!
//! The grid engine expects plain callback functions and editor objects; the
//! embedding application writes declarative components. The bridge turns
//! tagged child components into cached adapter handles the engine can
//! invoke, reusing live instances across redraws instead of remounting.

pub mod component;
pub mod node;

mod editor;
mod renderer;

pub use component::{
    CellComponent, CellContext, CellInstance, ChildSpec, ComponentCtor, EditorComponent, Mounted,
    PropBag, EDITOR_MARKER, RENDERER_MARKER,
};
pub use editor::EditorHandle;
pub use node::{NodeArena, NodeId};
pub use renderer::RendererHandle;

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;

use crate::cache::LruCache;
use crate::types::{CacheKey, ComponentTag, ComposeError};

use editor::EditorCache;
use renderer::RendererCache;

/// A cached live instance together with the root node it owns. Owned
/// exclusively by one cache slot; its lifetime ends with the slot's
/// eviction or the bridge teardown.
pub struct CachedCell {
    pub instance: CellInstance,
    pub root: NodeId,
}

/// A child bridged into whichever adapter its tag calls for.
#[derive(Debug)]
pub enum BridgedChild {
    Renderer(RendererHandle),
    Editor(EditorHandle),
}

/// Owns the node arena and both adapter caches for one grid instance.
pub struct ComponentBridge {
    arena: Rc<RefCell<NodeArena>>,
    renderer_cache: RendererCache,
    editor_cache: EditorCache,
    /// Editor handles already built, for reuse across reconfigurations.
    editor_handles: AHashMap<CacheKey, EditorHandle>,
    /// Which component name claimed each explicit disambiguator.
    editor_keys: AHashMap<String, String>,
}

impl ComponentBridge {
    /// Create a bridge whose renderer cache holds at most
    /// `renderer_capacity` live instances.
    pub fn new(renderer_capacity: usize) -> Self {
        let arena = Rc::new(RefCell::new(NodeArena::new()));
        let disposal_arena = arena.clone();
        let renderer_cache = Rc::new(RefCell::new(LruCache::with_disposer(
            renderer_capacity,
            move |key: &CacheKey, mut cached: CachedCell| {
                if let Err(err) = cached.instance.as_cell_mut().destroy() {
                    tracing::error!(error = %err, ?key, "evicted renderer disposal failed");
                }
                disposal_arena.borrow_mut().release(cached.root);
            },
        )));

        Self {
            arena,
            renderer_cache,
            editor_cache: Rc::new(RefCell::new(AHashMap::new())),
            editor_handles: AHashMap::new(),
            editor_keys: AHashMap::new(),
        }
    }

    /// Shared node arena for this grid instance.
    pub fn arena(&self) -> Rc<RefCell<NodeArena>> {
        self.arena.clone()
    }

    /// Bridge a declarative child into the adapter its tag calls for.
    pub fn bridge_child(&mut self, child: &ChildSpec) -> Result<BridgedChild, ComposeError> {
        match child.classify()? {
            ComponentTag::Renderer => Ok(BridgedChild::Renderer(self.renderer_for(child))),
            ComponentTag::Editor => Ok(BridgedChild::Editor(self.editor_for(child)?)),
        }
    }

    /// Number of live renderer instances currently cached.
    pub fn cached_renderer_count(&self) -> usize {
        self.renderer_cache.borrow().len()
    }

    /// Number of live editor instances currently cached.
    pub fn cached_editor_count(&self) -> usize {
        self.editor_cache.borrow().len()
    }

    /// Destroy every cached instance and release every node. Disposal
    /// failures are logged and do not interrupt the teardown.
    pub fn teardown(&mut self) {
        self.renderer_cache.borrow_mut().drain();

        let entries: Vec<_> = self.editor_cache.borrow_mut().drain().collect();
        for (key, mut cached) in entries {
            if let Err(err) = cached.instance.as_cell_mut().destroy() {
                tracing::error!(error = %err, ?key, "cached editor disposal failed");
            }
            self.arena.borrow_mut().release(cached.root);
        }

        self.editor_handles.clear();
        self.editor_keys.clear();
    }

    fn renderer_for(&self, child: &ChildSpec) -> RendererHandle {
        RendererHandle::new(
            child.ctor.clone(),
            child.props.clone(),
            self.renderer_cache.clone(),
            self.arena.clone(),
        )
    }

    fn editor_for(&mut self, child: &ChildSpec) -> Result<EditorHandle, ComposeError> {
        let component = child.ctor.name().to_string();

        // An explicit disambiguator may only ever belong to one component
        // definition; reusing it elsewhere would alias cached state.
        if let Some(key) = &child.key {
            match self.editor_keys.get(key) {
                Some(owner) if *owner != component => {
                    return Err(ComposeError::DuplicateEditorKey {
                        key: key.clone(),
                        existing: owner.clone(),
                        incoming: component,
                    });
                }
                _ => {
                    self.editor_keys.insert(key.clone(), component.clone());
                }
            }
        }

        let cache_key = CacheKey::Named {
            component,
            disambiguator: child.key.clone(),
        };

        if let Some(existing) = self.editor_handles.get(&cache_key) {
            return Ok(existing.clone());
        }

        let handle = EditorHandle::new(
            child.ctor.clone(),
            child.props.clone(),
            cache_key.clone(),
            self.editor_cache.clone(),
            self.arena.clone(),
        );
        self.editor_handles.insert(cache_key, handle.clone());
        Ok(handle)
    }
}

// =============================================================================
// Tests
// =============================================================================
