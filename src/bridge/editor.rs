//! Editor adapter - a declarative component behind the engine's editor
//! capability set.
//!
//! Editors are shared across the cells of a column/type, so they cache by
//! component name plus an optional disambiguating key instead of by cell
//! address. The instance is created lazily on the first `prepare` call and
//! reused for the rest of its column's life; lifecycle calls are forwarded
//! to whatever capability methods the embedded component implements.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ahash::AHashMap;

use crate::bridge::component::{CellContext, ComponentCtor, EditorComponent, PropBag, EDITOR_MARKER};
use crate::bridge::node::NodeArena;
use crate::bridge::CachedCell;
use crate::types::{CacheKey, CellValue};

pub(crate) type EditorCache = Rc<RefCell<AHashMap<CacheKey, CachedCell>>>;

struct EditorShared {
    ctor: ComponentCtor,
    props: PropBag,
    key: CacheKey,
    cache: EditorCache,
    arena: Rc<RefCell<NodeArena>>,
    warned_missing_capability: Cell<bool>,
}

/// Cheaply cloneable adapter exposing the engine's editor capability set.
#[derive(Clone)]
pub struct EditorHandle {
    inner: Rc<EditorShared>,
}

impl EditorHandle {
    pub(crate) fn new(
        ctor: ComponentCtor,
        props: PropBag,
        key: CacheKey,
        cache: EditorCache,
        arena: Rc<RefCell<NodeArena>>,
    ) -> Self {
        Self {
            inner: Rc::new(EditorShared {
                ctor,
                props,
                key,
                cache,
                arena,
                warned_missing_capability: Cell::new(false),
            }),
        }
    }

    pub fn cache_key(&self) -> &CacheKey {
        &self.inner.key
    }

    /// First call instantiates and mounts the component; every call
    /// forwards to the live instance.
    pub fn prepare(&self, cell: &CellContext) {
        self.ensure_mounted();
        self.with_editor(|editor| editor.prepare(cell));
    }

    pub fn open(&self) {
        self.with_editor(|editor| editor.open());
    }

    pub fn close(&self) {
        self.with_editor(|editor| editor.close());
    }

    pub fn focus(&self) {
        self.with_editor(|editor| editor.focus());
    }

    pub fn set_value(&self, value: CellValue) {
        self.with_editor(|editor| editor.set_value(value));
    }

    /// Current value of the live editor, or `Null` before the first
    /// `prepare`.
    pub fn get_value(&self) -> CellValue {
        let cache = self.inner.cache.borrow();
        cache
            .get(&self.inner.key)
            .and_then(|cached| cached.instance.as_editor())
            .map(|editor| editor.get_value())
            .unwrap_or(CellValue::Null)
    }

    /// Identity comparison - two handles are the same adapter.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn ensure_mounted(&self) {
        let mut cache = self.inner.cache.borrow_mut();
        if cache.contains_key(&self.inner.key) {
            return;
        }
        let mut props = self.inner.props.clone();
        props.insert(EDITOR_MARKER, true);
        let mounted = self
            .inner
            .ctor
            .mount(&props, &mut self.inner.arena.borrow_mut());
        cache.insert(
            self.inner.key.clone(),
            CachedCell {
                instance: mounted.instance,
                root: mounted.root,
            },
        );
    }

    fn with_editor(&self, call: impl FnOnce(&mut dyn EditorComponent)) {
        let mut cache = self.inner.cache.borrow_mut();
        let Some(cached) = cache.get_mut(&self.inner.key) else {
            return;
        };
        match cached.instance.as_editor_mut() {
            Some(editor) => call(editor),
            None => {
                if !self.inner.warned_missing_capability.replace(true) {
                    tracing::warn!(
                        component = self.inner.ctor.name(),
                        "component mounted as editor does not expose the editor capability set"
                    );
                }
            }
        }
    }
}

impl std::fmt::Debug for EditorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorHandle")
            .field("component", &self.inner.ctor.name())
            .field("key", &self.inner.key)
            .finish_non_exhaustive()
    }
}
