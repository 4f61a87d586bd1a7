//! Handle owner - the wrapper component around one grid engine instance.
//!
//! The host owns the engine handle, the adapter caches, and the desired
//! configuration. Property mutations are coalesced by the update scheduler;
//! on flush the diff engine compares the previously applied snapshot with
//! the desired one and pushes the minimal update into the engine.
//!
//! ```text
//! set(..) -> scheduler -> tick queue drain -> reconcile -> engine.update_settings
//! ```

pub mod reactive;

pub use reactive::{bind_setting, bind_settings, SettingBinding};

use std::cell::RefCell;
use std::rc::Rc;

use crate::bridge::{BridgedChild, ChildSpec, ComponentBridge, NodeArena};
use crate::diff::{reconcile, OptionPolicy};
use crate::engine::{EngineFactory, GridEngine, HookFn};
use crate::schedule::{TickQueue, UpdateScheduler};
use crate::types::{
    AppliedSnapshot, ComposeError, DiffResult, SettingName, SettingValue, SettingsMap,
};

/// Renderer adapters cached per grid instance, matching the original
/// wrapper's bound.
pub const DEFAULT_RENDERER_CACHE_CAPACITY: usize = 100;

/// Listener invoked after every non-`NoChange` reconciliation with exactly
/// the diff payload that was pushed to the engine.
pub type SettingsListener = Box<dyn FnMut(&DiffResult)>;

struct HostCore {
    /// `None` while destroyed, and transiently while the engine is checked
    /// out for a settings push.
    engine: Option<Box<dyn GridEngine>>,
    desired: SettingsMap,
    applied: Option<AppliedSnapshot>,
    policy: OptionPolicy,
    bridge: ComponentBridge,
    listeners: Vec<SettingsListener>,
    destroyed: bool,
}

impl HostCore {
    fn teardown(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.bridge.teardown();
        // Absent mid-push: the flush path destroys the checked-out engine.
        if let Some(mut engine) = self.engine.take() {
            engine.destroy();
        }
        self.applied = None;
        self.listeners.clear();
    }
}

/// Owns one grid engine instance and keeps it synchronized with the
/// desired configuration.
///
/// Dropping the host tears everything down: pending flushes are cancelled,
/// every cached component instance is destroyed and its node released, and
/// the engine is destroyed last.
pub struct GridHost {
    core: Rc<RefCell<HostCore>>,
    scheduler: Rc<UpdateScheduler>,
}

impl GridHost {
    /// Construct the engine and wire up the reconciliation pipeline.
    ///
    /// Child components are classified by their tag attributes and bridged
    /// into the initial settings: per-column children land in the `columns`
    /// option, untargeted children become the grid-wide `renderer`/`editor`
    /// fallback.
    pub fn mount(
        factory: EngineFactory,
        initial: SettingsMap,
        children: Vec<ChildSpec>,
        policy: OptionPolicy,
        queue: Rc<TickQueue>,
    ) -> Result<Self, ComposeError> {
        Self::mount_with_capacity(
            factory,
            initial,
            children,
            policy,
            queue,
            DEFAULT_RENDERER_CACHE_CAPACITY,
        )
    }

    /// [`mount`] with an explicit bound on the renderer instance cache.
    ///
    /// [`mount`]: GridHost::mount
    pub fn mount_with_capacity(
        factory: EngineFactory,
        initial: SettingsMap,
        children: Vec<ChildSpec>,
        policy: OptionPolicy,
        queue: Rc<TickQueue>,
        renderer_capacity: usize,
    ) -> Result<Self, ComposeError> {
        let mut bridge = ComponentBridge::new(renderer_capacity);
        let initial = compose_children(&mut bridge, initial, children)?;

        let engine = factory(initial.clone());
        let applied = AppliedSnapshot::capture(initial.clone(), policy.row_data_key());

        let core = Rc::new(RefCell::new(HostCore {
            engine: Some(engine),
            desired: initial,
            applied: Some(applied),
            policy,
            bridge,
            listeners: Vec::new(),
            destroyed: false,
        }));

        let scheduler = Rc::new(UpdateScheduler::new(queue));
        let sink_core = Rc::downgrade(&core);
        scheduler.set_sink(move |keys| {
            let Some(core) = sink_core.upgrade() else {
                return;
            };
            tracing::debug!(touched = keys.len(), "flushing settings cycle");
            if let Some(result) = push_pending(&core) {
                emit(&core, &result);
            }
        });

        Ok(Self { core, scheduler })
    }

    /// Record a desired option value. Any number of calls within one update
    /// cycle collapse into a single engine push.
    pub fn set(&self, name: impl Into<SettingName>, value: impl Into<SettingValue>) {
        let name = name.into();
        self.core.borrow_mut().desired.insert(name.clone(), value);
        self.scheduler.notify_changed(name);
    }

    /// Remove a desired option. Whether the engine sees a removal depends
    /// on the option's policy (sticky options are retained).
    pub fn unset(&self, name: &str) {
        self.core.borrow_mut().desired.remove(name);
        self.scheduler.notify_changed(name);
    }

    /// Engine configuration passthrough. While a settings push is in
    /// flight, serves the desired snapshot instead (the engine is busy
    /// applying exactly that snapshot), so lifecycle hooks may read
    /// settings mid-push. `None` once destroyed.
    pub fn get_settings(&self) -> Option<SettingsMap> {
        let core = self.core.borrow();
        if core.destroyed {
            return None;
        }
        match core.engine.as_ref() {
            Some(engine) => Some(engine.get_settings()),
            None => Some(core.desired.clone()),
        }
    }

    /// Ask the engine to redraw. A no-op once destroyed.
    pub fn render(&self) {
        let mut core = self.core.borrow_mut();
        if let Some(engine) = core.engine.as_mut() {
            engine.render();
        }
    }

    /// Direct access to the live engine handle, for the embedding
    /// application. Returns `None` once destroyed.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut (dyn GridEngine + 'static)) -> R) -> Option<R> {
        let mut core = self.core.borrow_mut();
        core.engine.as_deref_mut().map(f)
    }

    /// Shared node arena of this grid instance.
    pub fn arena(&self) -> Rc<RefCell<NodeArena>> {
        self.core.borrow().bridge.arena()
    }

    /// Register a listener for the settings-changed notification, emitted
    /// after every non-`NoChange` reconciliation with exactly the
    /// [`DiffResult`] payload.
    pub fn on_settings_change(&self, listener: impl FnMut(&DiffResult) + 'static) {
        self.core.borrow_mut().listeners.push(Box::new(listener));
    }

    /// Passthrough registration for a named engine lifecycle event.
    pub fn add_engine_hook(&self, event: &str, callback: HookFn) {
        let mut core = self.core.borrow_mut();
        if let Some(engine) = core.engine.as_mut() {
            engine.add_hook(event, callback);
        }
    }

    /// Number of live renderer instances currently cached.
    pub fn cached_renderer_count(&self) -> usize {
        self.core.borrow().bridge.cached_renderer_count()
    }

    /// Number of live editor instances currently cached.
    pub fn cached_editor_count(&self) -> usize {
        self.core.borrow().bridge.cached_editor_count()
    }

    pub fn is_destroyed(&self) -> bool {
        self.core.borrow().destroyed
    }

    /// Deterministic teardown: cancel any pending flush, destroy every
    /// cached component instance, release every node, then destroy the
    /// engine. Idempotent.
    pub fn destroy(&self) {
        self.scheduler.cancel();
        self.core.borrow_mut().teardown();
    }
}

impl Drop for GridHost {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Reconcile and push with the engine checked out of the core, so engine
/// lifecycle hooks may call back into the host during the push. Returns the
/// diff to announce, if any.
fn push_pending(core: &Rc<RefCell<HostCore>>) -> Option<DiffResult> {
    let (mut engine, result, desired) = {
        let mut state = core.borrow_mut();
        let Some(engine) = state.engine.take() else {
            // A change notification can legitimately race a teardown.
            tracing::warn!("settings changed after grid teardown, dropping reconciliation");
            return None;
        };
        let desired = state.desired.clone();
        let result = reconcile(state.applied.as_ref(), &desired, &state.policy);
        (engine, result, desired)
    };

    // Core is unborrowed here: a hook firing inside update_settings can
    // read settings, record new desired values, or destroy the host.
    if !result.is_no_change() {
        engine.update_settings(&result);
    }

    let mut state = core.borrow_mut();
    if state.destroyed {
        // A hook tore the host down mid-push; finish the engine here.
        engine.destroy();
        return None;
    }
    state.engine = Some(engine);

    // Re-track the applied snapshot and row shape even on NoChange, so
    // pass-through row mutations update the tracked field counts.
    let row_key = state.policy.row_data_key().map(str::to_string);
    state.applied = Some(AppliedSnapshot::capture(desired, row_key.as_deref()));

    (!result.is_no_change()).then_some(result)
}

/// Run the listeners outside the core borrow so they may call back into the
/// host.
fn emit(core: &Rc<RefCell<HostCore>>, result: &DiffResult) {
    let mut listeners = std::mem::take(&mut core.borrow_mut().listeners);
    for listener in &mut listeners {
        listener(result);
    }
    let mut core = core.borrow_mut();
    if core.destroyed {
        // A listener tore the host down; the taken closures go with it.
        return;
    }
    let added_during_emit = std::mem::take(&mut core.listeners);
    core.listeners = listeners;
    core.listeners.extend(added_during_emit);
}

/// Fold declarative children into the initial settings.
fn compose_children(
    bridge: &mut ComponentBridge,
    mut settings: SettingsMap,
    children: Vec<ChildSpec>,
) -> Result<SettingsMap, ComposeError> {
    let mut columns: Vec<SettingsMap> = Vec::new();
    let mut emit_columns = false;
    match settings.remove("columns") {
        Some(SettingValue::List(entries)) => {
            emit_columns = true;
            columns = entries
                .into_iter()
                .map(|entry| match entry {
                    SettingValue::Map(map) => map,
                    other => {
                        let mut map = SettingsMap::new();
                        map.insert("value", other);
                        map
                    }
                })
                .collect();
        }
        // Not column material; pass it through untouched.
        Some(other) => {
            settings.insert("columns", other);
        }
        None => {}
    }

    for child in &children {
        let bridged = bridge.bridge_child(child)?;
        let (slot_name, value) = match bridged {
            BridgedChild::Renderer(handle) => ("renderer", SettingValue::Renderer(handle)),
            BridgedChild::Editor(handle) => ("editor", SettingValue::Editor(handle)),
        };

        match child.column {
            None => {
                settings.insert(slot_name, value);
            }
            Some(index) => {
                if columns.len() <= index {
                    columns.resize_with(index + 1, SettingsMap::new);
                }
                columns[index].insert(slot_name, value);
                emit_columns = true;
            }
        }
    }

    if emit_columns {
        settings.insert(
            "columns",
            SettingValue::List(columns.into_iter().map(SettingValue::Map).collect()),
        );
    }
    Ok(settings)
}

// =============================================================================
// Tests
// =============================================================================
