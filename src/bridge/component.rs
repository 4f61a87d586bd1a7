//! The declarative-framework seam.
//!
//! Declarative children are handed to the bridge as [`ChildSpec`]s: a named
//! component constructor, the two reserved tag attributes, an optional
//! disambiguating key, and any extra props (forwarded verbatim to the
//! instantiated component). Mounting a component yields its live instance
//! (the data bag) plus the root node it owns.

use std::rc::Rc;

use crate::bridge::node::{NodeArena, NodeId};
use crate::types::{CellValue, ComponentTag, ComposeError, DisposeError, SettingsMap};

/// Props forwarded into a component instance.
pub type PropBag = SettingsMap;

/// Reserved marker prop injected into renderer instances.
pub const RENDERER_MARKER: &str = "is_renderer";
/// Reserved marker prop injected into editor instances.
pub const EDITOR_MARKER: &str = "is_editor";

/// Per-invocation cell state pushed into a live renderer or editor.
#[derive(Clone, Debug, PartialEq)]
pub struct CellContext {
    pub row: usize,
    pub col: usize,
    pub prop: String,
    pub value: CellValue,
}

// =============================================================================
// Component Contracts
// =============================================================================

/// A live component instance usable as a cell renderer.
pub trait CellComponent {
    /// Replace the instance's props in place (no remount).
    fn set_props(&mut self, props: &PropBag);

    /// Push new cell state into the live instance.
    fn set_cell(&mut self, cell: &CellContext);

    /// Tear the instance down. Failures are logged by the caller, never
    /// propagated into the redraw path.
    fn destroy(&mut self) -> Result<(), DisposeError>;
}

/// The editor capability set, as the grid engine expects it.
///
/// A polymorphic capability contract rather than a base class: every method
/// has a default no-op so components implement only what they need.
pub trait EditorComponent: CellComponent {
    fn prepare(&mut self, _cell: &CellContext) {}
    fn open(&mut self) {}
    fn close(&mut self) {}
    fn focus(&mut self) {}
    fn get_value(&self) -> CellValue {
        CellValue::Null
    }
    fn set_value(&mut self, _value: CellValue) {}
}

/// A mounted instance, tagged with the capability set it exposes.
pub enum CellInstance {
    Cell(Box<dyn CellComponent>),
    Editor(Box<dyn EditorComponent>),
}

impl CellInstance {
    pub fn as_cell_mut(&mut self) -> &mut dyn CellComponent {
        match self {
            CellInstance::Cell(inner) => inner.as_mut(),
            CellInstance::Editor(inner) => inner.as_mut(),
        }
    }

    pub fn as_editor_mut(&mut self) -> Option<&mut dyn EditorComponent> {
        match self {
            CellInstance::Cell(_) => None,
            CellInstance::Editor(inner) => Some(inner.as_mut()),
        }
    }

    pub fn as_editor(&self) -> Option<&dyn EditorComponent> {
        match self {
            CellInstance::Cell(_) => None,
            CellInstance::Editor(inner) => Some(inner.as_ref()),
        }
    }
}

/// Result of mounting a component: the live instance plus the root node it
/// owns.
pub struct Mounted {
    pub instance: CellInstance,
    pub root: NodeId,
}

// =============================================================================
// Component Constructor
// =============================================================================

type BuildFn = dyn Fn(&PropBag, &mut NodeArena) -> Mounted;

/// Named factory for component instances.
#[derive(Clone)]
pub struct ComponentCtor {
    name: String,
    build: Rc<BuildFn>,
}

impl ComponentCtor {
    pub fn new(
        name: impl Into<String>,
        build: impl Fn(&PropBag, &mut NodeArena) -> Mounted + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            build: Rc::new(build),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instantiate and mount the component with the given props.
    pub fn mount(&self, props: &PropBag, arena: &mut NodeArena) -> Mounted {
        (self.build)(props, arena)
    }
}

impl std::fmt::Debug for ComponentCtor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentCtor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Child Spec
// =============================================================================

/// A declarative child as composed by the embedding application.
#[derive(Clone, Debug)]
pub struct ChildSpec {
    pub ctor: ComponentCtor,
    /// The reserved renderer-marker attribute.
    pub renderer_tag: bool,
    /// The reserved editor-marker attribute.
    pub editor_tag: bool,
    /// Optional disambiguating key, required when the same editor component
    /// serves more than one column and must not share state.
    pub key: Option<String>,
    /// Extra declared props, forwarded verbatim to the instance.
    pub props: PropBag,
    /// Target column, or `None` for the grid-wide fallback slot.
    pub column: Option<usize>,
}

impl ChildSpec {
    pub fn renderer(ctor: ComponentCtor) -> Self {
        Self {
            ctor,
            renderer_tag: true,
            editor_tag: false,
            key: None,
            props: PropBag::new(),
            column: None,
        }
    }

    pub fn editor(ctor: ComponentCtor) -> Self {
        Self {
            ctor,
            renderer_tag: false,
            editor_tag: true,
            key: None,
            props: PropBag::new(),
            column: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_prop(
        mut self,
        name: impl Into<String>,
        value: impl Into<crate::types::SettingValue>,
    ) -> Self {
        self.props.insert(name, value);
        self
    }

    pub fn for_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    /// Classify the child by its reserved tag attributes. Both tags or
    /// neither tag is a fatal composition error.
    pub fn classify(&self) -> Result<ComponentTag, ComposeError> {
        match (self.renderer_tag, self.editor_tag) {
            (true, true) => Err(ComposeError::AmbiguousTag(self.ctor.name().to_string())),
            (true, false) => Ok(ComponentTag::Renderer),
            (false, true) => Ok(ComponentTag::Editor),
            (false, false) => Err(ComposeError::MissingTag(self.ctor.name().to_string())),
        }
    }
}
