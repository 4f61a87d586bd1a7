//! Core types - configuration snapshots, diff results, cache keys.
//!
//! Everything the diff engine, scheduler, and component bridge exchange is
//! defined here: the option-value union, the row-data collection with its
//! shape fingerprint, and the typed cache keys.

use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use thiserror::Error;

use crate::bridge::{EditorHandle, RendererHandle};

/// Name of a configuration option.
pub type SettingName = String;

// =============================================================================
// Cell Values
// =============================================================================

/// Scalar payload of a single grid cell.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

// =============================================================================
// Row Data
// =============================================================================

/// A keyed record row. Only the set of property names participates in
/// change detection; the values are the grid engine's business.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    fields: AHashMap<String, CellValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<CellValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&CellValue> {
        self.fields.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<CellValue> {
        self.fields.remove(name)
    }

    /// Number of property names on this record.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

impl<K: Into<String>, V: Into<CellValue>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.set(k, v);
        }
        record
    }
}

/// The row-data collection in one of its two supported shapes.
#[derive(Clone, Debug, PartialEq)]
pub enum Rows {
    /// Ordered list of uniform flat arrays (row-major matrix).
    Matrix(Vec<Vec<CellValue>>),
    /// Ordered list of keyed records (row objects).
    Records(Vec<Record>),
}

/// Shared, in-place-mutable row storage. Reference identity (`Rc::ptr_eq`)
/// is what "same collection" means to the diff engine.
pub type SharedRows = Rc<RefCell<Rows>>;

/// Wrap a collection in shared storage.
pub fn shared_rows(rows: Rows) -> SharedRows {
    Rc::new(RefCell::new(rows))
}

/// Shape fingerprint of a row collection, captured when a snapshot is
/// applied. Desired rows are compared against the *tracked* shape instead of
/// re-reading the previously applied `Rc` - which usually aliases the same
/// storage - so in-place mutations can be detected at all.
#[derive(Clone, Debug, PartialEq)]
pub enum RowShape {
    Matrix,
    Records { field_counts: Vec<usize> },
}

impl RowShape {
    /// Capture the shape of a collection.
    pub fn of(rows: &Rows) -> Self {
        match rows {
            Rows::Matrix(_) => RowShape::Matrix,
            Rows::Records(records) => RowShape::Records {
                field_counts: records.iter().map(Record::field_count).collect(),
            },
        }
    }
}

// =============================================================================
// Setting Values
// =============================================================================

/// Value of a single configuration option.
///
/// Scalars, lists, and nested maps compare by value. `Rows`, adapter
/// handles, and `Opaque` values compare by reference identity - the safe
/// default for anything the diff engine does not understand.
///
/// `Null` is an explicit clearing of an option and is distinct from the
/// option being absent from the snapshot.
#[derive(Clone)]
pub enum SettingValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<SettingValue>),
    Map(SettingsMap),
    Rows(SharedRows),
    Renderer(RendererHandle),
    Editor(EditorHandle),
    Opaque(Rc<dyn Any>),
}

impl PartialEq for SettingValue {
    fn eq(&self, other: &Self) -> bool {
        use SettingValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Text(a), Text(b)) => a == b,
            (List(a), List(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (Rows(a), Rows(b)) => Rc::ptr_eq(a, b),
            (Renderer(a), Renderer(b)) => a.ptr_eq(b),
            (Editor(a), Editor(b)) => a.ptr_eq(b),
            (Opaque(a), Opaque(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Null => write!(f, "Null"),
            SettingValue::Bool(v) => write!(f, "Bool({v})"),
            SettingValue::Int(v) => write!(f, "Int({v})"),
            SettingValue::Float(v) => write!(f, "Float({v})"),
            SettingValue::Text(v) => write!(f, "Text({v:?})"),
            SettingValue::List(v) => f.debug_tuple("List").field(v).finish(),
            SettingValue::Map(v) => f.debug_tuple("Map").field(v).finish(),
            SettingValue::Rows(v) => write!(f, "Rows(@{:p})", Rc::as_ptr(v)),
            SettingValue::Renderer(_) => write!(f, "Renderer(..)"),
            SettingValue::Editor(_) => write!(f, "Editor(..)"),
            SettingValue::Opaque(v) => write!(f, "Opaque(@{:p})", Rc::as_ptr(v)),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        SettingValue::Int(value)
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        SettingValue::Float(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::Text(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        SettingValue::Text(value)
    }
}

impl From<SharedRows> for SettingValue {
    fn from(value: SharedRows) -> Self {
        SettingValue::Rows(value)
    }
}

// =============================================================================
// Configuration Snapshot
// =============================================================================

/// A point-in-time mapping from option name to value.
///
/// One snapshot is held as "previously applied" and one is derived from the
/// owning component's desired configuration at every reconciliation point.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SettingsMap {
    entries: AHashMap<SettingName, SettingValue>,
}

impl SettingsMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&SettingValue> {
        self.entries.get(name)
    }

    pub fn insert(
        &mut self,
        name: impl Into<SettingName>,
        value: impl Into<SettingValue>,
    ) -> Option<SettingValue> {
        self.entries.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<SettingValue> {
        self.entries.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &SettingName> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SettingName, &SettingValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted union of this snapshot's keys with another's. Sorting keeps
    /// the diff walk deterministic.
    pub fn union_keys(&self, other: &SettingsMap) -> BTreeSet<SettingName> {
        self.keys().chain(other.keys()).cloned().collect()
    }
}

impl<K: Into<SettingName>, V: Into<SettingValue>> FromIterator<(K, V)> for SettingsMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = SettingsMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// The previously applied snapshot plus the row shape tracked at the moment
/// it was applied.
#[derive(Clone, Debug, PartialEq)]
pub struct AppliedSnapshot {
    pub settings: SettingsMap,
    pub row_shape: Option<RowShape>,
}

impl AppliedSnapshot {
    /// Capture an applied snapshot, fingerprinting the row-data option named
    /// by `row_data_key` if it holds a collection.
    pub fn capture(settings: SettingsMap, row_data_key: Option<&str>) -> Self {
        let row_shape = row_data_key
            .and_then(|key| settings.get(key))
            .and_then(|value| match value {
                SettingValue::Rows(rows) => Some(RowShape::of(&rows.borrow())),
                _ => None,
            });
        Self { settings, row_shape }
    }
}

// =============================================================================
// Diff Result
// =============================================================================

/// Outcome of one reconciliation. Exactly one variant is produced per call.
///
/// This payload shape is a compatibility contract: settings-changed
/// listeners receive it verbatim - only the changed keys for
/// `PartialUpdate`, the complete map for `FullReplace`.
#[derive(Clone, Debug, PartialEq)]
pub enum DiffResult {
    /// Nothing moved; the engine is not called.
    NoChange,
    /// Only the listed keys changed. Keys that were removed appear in
    /// `changed_keys` but carry no entry in `values`.
    PartialUpdate {
        changed_keys: BTreeSet<SettingName>,
        values: SettingsMap,
    },
    /// The complete desired snapshot replaces the engine configuration.
    FullReplace { values: SettingsMap },
}

impl DiffResult {
    pub fn is_no_change(&self) -> bool {
        matches!(self, DiffResult::NoChange)
    }
}

// =============================================================================
// Cache Keys and Component Tags
// =============================================================================

/// Identity of a cached adapter handle.
///
/// A typed union instead of string concatenation, so renderer and editor
/// keyspaces cannot collide.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Cell address - renderers are cached per rendered cell.
    Cell { row: usize, col: usize },
    /// Component name plus optional disambiguator - editors are shared
    /// across the cells of a column/type.
    Named {
        component: String,
        disambiguator: Option<String>,
    },
}

/// Role of a declarative child, fixed at composition time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentTag {
    Renderer,
    Editor,
}

// =============================================================================
// Errors
// =============================================================================

/// Composition-time configuration errors. These are fatal: the bridge
/// refuses to guess which behavior was meant.
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("child component `{0}` is tagged as both renderer and editor")]
    AmbiguousTag(String),

    #[error("child component `{0}` carries neither a renderer nor an editor tag")]
    MissingTag(String),

    #[error("editor key `{key}` is already claimed by component `{existing}`, cannot reuse it for `{incoming}`")]
    DuplicateEditorKey {
        key: String,
        existing: String,
        incoming: String,
    },
}

/// Failure while destroying a cached component instance. Caught and logged
/// on the eviction/teardown path, never propagated into the redraw path.
#[derive(Debug, Error)]
#[error("component disposal failed: {reason}")]
pub struct DisposeError {
    pub reason: String,
}

impl DisposeError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
