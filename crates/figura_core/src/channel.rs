//! Channels and layered channel inputs.
//!
//! A channel is a named scalar (a morph weight or a pose parameter). Every
//! figure definition fixes its channel set at load time as a
//! [`ChannelSchema`]; per-frame values travel as [`ChannelInputs`], a sparse
//! overlay on top of the schema's defaults.
//!
//! # Merge Rule
//!
//! For a channel `c`, an override layer's value wins when it defines `c`,
//! otherwise the base layer's value is used, otherwise the schema default.
//! Merging never mutates either operand, so one base set can be reused under
//! many per-frame overlays.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::interner::{self, Symbol};

/// Value reported for a channel the schema does not know about.
pub const FALLBACK_DEFAULT: f64 = 0.0;

/// Declaration of one channel in a figure definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDef {
    pub name: String,
    #[serde(default)]
    pub default: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl ChannelDef {
    pub fn new(name: impl Into<String>, default: f64) -> Self {
        Self {
            name: name.into(),
            default,
            min: None,
            max: None,
        }
    }

    /// Restricts the channel to `[min, max]` when values are evaluated.
    #[must_use]
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        let value = self.min.map_or(value, |min| value.max(min));
        self.max.map_or(value, |max| value.min(max))
    }
}

/// The immutable channel set of one figure definition.
#[derive(Debug, Default)]
pub struct ChannelSchema {
    channels: Vec<ChannelDef>,
    lookup: FxHashMap<Symbol, usize>,
}

static EMPTY_SCHEMA: LazyLock<Arc<ChannelSchema>> =
    LazyLock::new(|| Arc::new(ChannelSchema::default()));

impl ChannelSchema {
    /// Builds a schema. When a name is declared twice the first declaration is kept.
    #[must_use]
    pub fn new(channels: Vec<ChannelDef>) -> Self {
        let mut kept = Vec::with_capacity(channels.len());
        let mut lookup = FxHashMap::default();

        for def in channels {
            let sym = interner::intern(&def.name);
            if lookup.contains_key(&sym) {
                log::warn!("Duplicate channel '{}' ignored", def.name);
                continue;
            }
            lookup.insert(sym, kept.len());
            kept.push(def);
        }

        Self {
            channels: kept,
            lookup,
        }
    }

    /// Shared schema with no channels.
    #[must_use]
    pub fn empty() -> Arc<Self> {
        Arc::clone(&EMPTY_SCHEMA)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelDef> {
        self.channels.iter()
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        let sym = interner::get(name)?;
        self.lookup.get(&sym).copied()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ChannelDef> {
        self.index_of(name).map(|i| &self.channels[i])
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    fn contains_symbol(&self, sym: Symbol) -> bool {
        self.lookup.contains_key(&sym)
    }

    /// Default value of `name`, or [`FALLBACK_DEFAULT`] when the channel is unknown.
    #[must_use]
    pub fn default_of(&self, name: &str) -> f64 {
        self.get(name).map_or(FALLBACK_DEFAULT, |def| def.default)
    }

    /// Clamps `value` to the channel's declared range; unknown channels pass through.
    #[must_use]
    pub fn clamp(&self, name: &str, value: f64) -> f64 {
        self.get(name).map_or(value, |def| def.clamp(value))
    }
}

/// Sparse channel values layered over a schema's defaults.
///
/// No validation happens here: setting or reading a name outside the schema is
/// allowed, and reading an unknown name yields the fallback default. Callers
/// that need authoritative validation check against [`ChannelSchema`].
#[derive(Debug, Clone)]
pub struct ChannelInputs {
    schema: Arc<ChannelSchema>,
    values: FxHashMap<Symbol, f64>,
}

impl ChannelInputs {
    /// Inputs with nothing defined: every read returns the schema default.
    #[must_use]
    pub fn new(schema: Arc<ChannelSchema>) -> Self {
        Self {
            schema,
            values: FxHashMap::default(),
        }
    }

    pub fn from_values<I, K>(schema: Arc<ChannelSchema>, values: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        let mut inputs = Self::new(schema);
        for (name, value) in values {
            inputs.set(name.as_ref(), value);
        }
        inputs
    }

    #[inline]
    #[must_use]
    pub fn schema(&self) -> &Arc<ChannelSchema> {
        &self.schema
    }

    /// Value of `name`: the defined value, else the schema default, else the fallback.
    #[must_use]
    pub fn get(&self, name: &str) -> f64 {
        self.get_defined(name)
            .unwrap_or_else(|| self.schema.default_of(name))
    }

    /// Value of `name` only when this layer defines it.
    #[must_use]
    pub fn get_defined(&self, name: &str) -> Option<f64> {
        let sym = interner::get(name)?;
        self.values.get(&sym).copied()
    }

    #[must_use]
    pub fn defines(&self, name: &str) -> bool {
        self.get_defined(name).is_some()
    }

    pub fn set(&mut self, name: &str, value: f64) {
        self.values.insert(interner::intern(name), value);
    }

    #[must_use]
    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.set(name, value);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<f64> {
        let sym = interner::get(name)?;
        self.values.remove(&sym)
    }

    /// Number of defined channels.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Defined `(name, value)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.values
            .iter()
            .map(|(&sym, &value)| (interner::resolve(sym), value))
    }

    /// Combines two layers into a new set; neither operand is modified.
    ///
    /// With `overrides_win`, every value `other` defines replaces this set's.
    /// Otherwise `other` only fills channels this set leaves undefined. The
    /// result keeps this set's schema.
    #[must_use]
    pub fn merge(&self, other: &ChannelInputs, overrides_win: bool) -> ChannelInputs {
        let mut values = self.values.clone();
        for (&sym, &value) in &other.values {
            if overrides_win {
                values.insert(sym, value);
            } else {
                values.entry(sym).or_insert(value);
            }
        }
        ChannelInputs {
            schema: Arc::clone(&self.schema),
            values,
        }
    }

    /// Copy of the values whose names exist in `schema`, re-homed onto it.
    #[must_use]
    pub fn restricted_to(&self, schema: &Arc<ChannelSchema>) -> ChannelInputs {
        let values = self
            .values
            .iter()
            .filter(|(sym, _)| schema.contains_symbol(**sym))
            .map(|(&sym, &value)| (sym, value))
            .collect();
        ChannelInputs {
            schema: Arc::clone(schema),
            values,
        }
    }

    /// Defined values keyed by name, sorted for stable serialization.
    #[must_use]
    pub fn to_value_map(&self) -> BTreeMap<String, f64> {
        self.iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }
}

impl PartialEq for ChannelInputs {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Arc<ChannelSchema> {
        Arc::new(ChannelSchema::new(vec![
            ChannelDef::new("smile", 0.25),
            ChannelDef::new("blink", 0.0).with_range(0.0, 1.0),
        ]))
    }

    #[test]
    fn undefined_channel_reads_schema_default() {
        let inputs = ChannelInputs::new(schema());
        assert_eq!(inputs.get("smile"), 0.25);
        assert!(!inputs.defines("smile"));
    }

    #[test]
    fn duplicate_declarations_keep_first() {
        let schema = ChannelSchema::new(vec![
            ChannelDef::new("dup", 1.0),
            ChannelDef::new("dup", 2.0),
        ]);
        assert_eq!(schema.len(), 1);
        assert_eq!(schema.default_of("dup"), 1.0);
    }

    #[test]
    fn clamp_respects_declared_range() {
        let schema = schema();
        assert_eq!(schema.clamp("blink", 3.0), 1.0);
        assert_eq!(schema.clamp("blink", -1.0), 0.0);
        assert_eq!(schema.clamp("smile", 3.0), 3.0);
        assert_eq!(schema.clamp("unknown", 3.0), 3.0);
    }

    #[test]
    fn merge_without_override_only_fills_gaps() {
        let base = ChannelInputs::new(schema()).with("smile", 0.5);
        let other = ChannelInputs::new(schema())
            .with("smile", 0.9)
            .with("blink", 1.0);

        let merged = base.merge(&other, false);
        assert_eq!(merged.get("smile"), 0.5);
        assert_eq!(merged.get("blink"), 1.0);
    }

    #[test]
    fn restricted_to_drops_foreign_channels() {
        let wide = ChannelInputs::new(schema())
            .with("smile", 0.5)
            .with("not-in-narrow", 2.0);
        let narrow = Arc::new(ChannelSchema::new(vec![ChannelDef::new("smile", 0.0)]));

        let restricted = wide.restricted_to(&narrow);
        assert_eq!(restricted.len(), 1);
        assert_eq!(restricted.get("smile"), 0.5);
        assert!(Arc::ptr_eq(restricted.schema(), &narrow));
    }
}
