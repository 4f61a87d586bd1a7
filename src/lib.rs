//! # spark-grid
//!
//! Reactive bindings for imperative grid-rendering engines.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for fine-grained reactivity.
//!
//! ## Architecture
//!
//! A [`host::GridHost`] owns one engine instance and keeps it synchronized
//! with a declaratively described configuration. Settings writes are
//! coalesced per update cycle; on flush, the previously applied snapshot is
//! diffed against the desired one and the engine receives the minimal
//! update:
//!
//! ```text
//! set()/signals → UpdateScheduler → TickQueue drain → reconcile → engine.update_settings
//! ```
//!
//! Declarative cell components are bridged into the engine's imperative
//! callback surface by [`bridge::ComponentBridge`]: renderer instances are
//! cached per cell in a bounded LRU, editor instances per component name
//! plus disambiguating key.
//!
//! ## Modules
//!
//! - [`types`] - Core types (SettingValue, SettingsMap, DiffResult, etc.)
//! - [`diff`] - Settings reconciliation and per-option policy
//! - [`schedule`] - Tick queue and the coalescing update scheduler
//! - [`bridge`] - Declarative component ↔ engine callback adapters
//! - [`engine`] - The consumed grid engine interface
//! - [`host`] - The handle owner tying it all together

pub mod bridge;
pub mod cache;
pub mod diff;
pub mod engine;
pub mod host;
pub mod schedule;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use diff::{reconcile, OptionFlags, OptionPolicy};

pub use schedule::{TickQueue, UpdateScheduler};

pub use cache::LruCache;

pub use bridge::{
    BridgedChild, CellComponent, CellContext, CellInstance, ChildSpec, ComponentBridge,
    ComponentCtor,
    EditorComponent, EditorHandle, Mounted, NodeArena, NodeId, PropBag, RendererHandle,
    EDITOR_MARKER, RENDERER_MARKER,
};

pub use engine::{EngineFactory, GridEngine, HookFn};

pub use host::{
    bind_setting, bind_settings, GridHost, SettingBinding, SettingsListener,
    DEFAULT_RENDERER_CACHE_CAPACITY,
};
