//! Grid engine interface - the imperative side of the bridge.
//!
//! The engine itself (cell storage, scrolling, selection, rendering) is an
//! external collaborator. This module defines only the surface the handle
//! owner consumes: construction from an initial configuration, settings
//! updates, and named lifecycle hooks.

use std::rc::Rc;

use crate::types::{DiffResult, SettingsMap};

/// Callback registered for a named engine lifecycle event.
pub type HookFn = Rc<dyn Fn()>;

/// The imperative grid engine, as consumed by the handle owner.
///
/// `update_settings` receives either a `PartialUpdate` (targeted changes
/// only) or a `FullReplace`; it is never invoked with `NoChange`.
pub trait GridEngine {
    /// Apply a settings update produced by reconciliation.
    fn update_settings(&mut self, update: &DiffResult);

    /// Redraw.
    fn render(&mut self);

    /// Current engine-side configuration.
    fn get_settings(&self) -> SettingsMap;

    /// Register a callback for a named lifecycle event
    /// (e.g. "afterUpdateSettings", "beforeInit").
    fn add_hook(&mut self, event: &str, callback: HookFn);

    /// Release every engine resource. Called exactly once, during handle
    /// owner teardown.
    fn destroy(&mut self);
}

/// Constructor for an engine instance, taking the complete initial
/// configuration.
pub type EngineFactory = Box<dyn FnOnce(SettingsMap) -> Box<dyn GridEngine>>;
