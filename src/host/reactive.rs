//! Signal-driven settings.
//!
//! Binds a reactive signal to one grid option: the effect runs immediately
//! with the signal's current value and again on every change, recording the
//! value as desired and notifying the scheduler. Multiple signals changing
//! in the same update cycle still produce a single engine push.

use std::rc::Rc;

use spark_signals::{effect, Signal};

use crate::types::{SettingName, SettingValue};

use super::GridHost;

/// Handle returned by the bind functions that allows unbinding.
///
/// Dropping the binding does NOT stop the effect; call [`unbind`] for
/// deterministic cleanup. Bindings outliving their host are harmless: once
/// the host is destroyed and dropped, effect runs become no-ops.
///
/// [`unbind`]: SettingBinding::unbind
pub struct SettingBinding {
    stops: Vec<Box<dyn FnOnce()>>,
}

impl SettingBinding {
    /// Stop every effect owned by this binding.
    pub fn unbind(self) {
        for stop in self.stops {
            stop();
        }
    }

    /// Fold another binding into this one, so both unbind together.
    pub fn merge(&mut self, other: SettingBinding) {
        self.stops.extend(other.stops);
    }
}

/// Drive one grid option from a signal.
pub fn bind_setting(
    host: &GridHost,
    name: impl Into<SettingName>,
    source: Signal<SettingValue>,
) -> SettingBinding {
    let name: SettingName = name.into();
    let core = Rc::downgrade(&host.core);
    let scheduler = Rc::downgrade(&host.scheduler);

    // effect() returns an opaque impl FnOnce() stop function
    let stop = effect(move || {
        let value = source.get();
        let Some(core) = core.upgrade() else {
            return;
        };
        core.borrow_mut().desired.insert(name.clone(), value);
        if let Some(scheduler) = scheduler.upgrade() {
            scheduler.notify_changed(name.clone());
        }
    });

    SettingBinding {
        stops: vec![Box::new(stop)],
    }
}

/// Drive several grid options from signals with one combined binding.
pub fn bind_settings(
    host: &GridHost,
    sources: impl IntoIterator<Item = (SettingName, Signal<SettingValue>)>,
) -> SettingBinding {
    let mut combined = SettingBinding { stops: Vec::new() };
    for (name, source) in sources {
        combined.merge(bind_setting(host, name, source));
    }
    combined
}
