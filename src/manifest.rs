// Copyright 2025 Cowboy AI, LLC.

//! Declarative chains
//!
//! A chain can be described as JSON: each entry is either the name of a unit
//! or transformer held in a [`MixinRegistry`], or an inline [`UnitManifest`]
//! describing a data-only unit.
//!
//! ```json
//! [
//!   "Walker",
//!   { "name": "Tagged", "fields": { "tag": "duck" }, "statics": { "version": 2 } },
//!   "Loud"
//! ]
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::composer::{BehaviorUnit, ComposerConfig, MixinBuilder, Transformer};
use crate::errors::{MixinError, MixinResult};
use crate::member::Value;
use crate::unit::Unit;

/// Data-only description of a class-like unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitManifest {
    /// Unit name
    pub name: String,
    /// Name of a registered unit to extend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    /// Instance fields and their initial values
    #[serde(default)]
    pub fields: IndexMap<String, Value>,
    /// Static data members
    #[serde(default)]
    pub statics: IndexMap<String, Value>,
}

impl UnitManifest {
    /// Build the unit, resolving `extends` through the registry
    pub fn build(&self, registry: &MixinRegistry) -> MixinResult<Unit> {
        let mut builder = Unit::builder(self.name.clone());
        if let Some(parent) = &self.extends {
            builder = builder.extends(registry.unit(parent)?);
        }
        for (name, value) in &self.fields {
            builder = builder.field(name.clone(), value.clone());
        }
        for (name, value) in &self.statics {
            builder = builder.static_value(name.clone(), value.clone());
        }
        Ok(builder.build())
    }
}

/// Named units and transformers that declarative chains can refer to
#[derive(Debug, Clone, Default)]
pub struct MixinRegistry {
    units: IndexMap<String, Unit>,
    transformers: IndexMap<String, Transformer>,
}

impl MixinRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit under its own name
    pub fn register_unit(&mut self, unit: Unit) -> MixinResult<()> {
        let name = unit.name().to_string();
        self.ensure_free(&name)?;
        self.units.insert(name, unit);
        Ok(())
    }

    /// Register a transformer under its own name
    pub fn register_transformer(&mut self, transformer: Transformer) -> MixinResult<()> {
        let name = transformer.name().to_string();
        self.ensure_free(&name)?;
        self.transformers.insert(name, transformer);
        Ok(())
    }

    fn ensure_free(&self, name: &str) -> MixinResult<()> {
        if self.contains(name) {
            return Err(MixinError::AlreadyRegistered(name.to_string()));
        }
        Ok(())
    }

    /// Whether a unit or transformer is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name) || self.transformers.contains_key(name)
    }

    /// Look up a registered unit
    pub fn unit(&self, name: &str) -> MixinResult<&Unit> {
        self.units
            .get(name)
            .ok_or_else(|| MixinError::UnknownUnit(name.to_string()))
    }

    /// Look up a registered unit or transformer as a chain entry
    pub fn resolve(&self, name: &str) -> MixinResult<BehaviorUnit> {
        if let Some(unit) = self.units.get(name) {
            return Ok(BehaviorUnit::Class(unit.clone()));
        }
        self.transformers
            .get(name)
            .map(|t| BehaviorUnit::Transformer(t.clone()))
            .ok_or_else(|| MixinError::UnknownUnit(name.to_string()))
    }

    /// Turn one JSON chain entry into a behavior unit
    pub fn resolve_entry(&self, index: usize, entry: &Value) -> MixinResult<BehaviorUnit> {
        match entry {
            Value::String(name) => self.resolve(name),
            Value::Object(_) => {
                let manifest: UnitManifest = serde_json::from_value(entry.clone())
                    .map_err(|e| MixinError::invalid_shape(format!("chain[{index}]"), e.to_string()))?;
                manifest.build(self).map(BehaviorUnit::Class)
            }
            other => Err(MixinError::invalid_shape(
                format!("chain[{index}]"),
                format!("expected a unit name or manifest object, found {}", json_kind(other)),
            )),
        }
    }

    /// Turn a JSON array of entries into a chain
    pub fn resolve_chain(&self, chain: &Value) -> MixinResult<Vec<BehaviorUnit>> {
        let entries = chain.as_array().ok_or_else(|| {
            MixinError::invalid_shape(
                "chain",
                format!("expected an array, found {}", json_kind(chain)),
            )
        })?;

        entries
            .iter()
            .enumerate()
            .map(|(index, entry)| self.resolve_entry(index, entry))
            .collect()
    }

    /// Resolve and compose a JSON chain in one step
    ///
    /// `initial` names a registered unit to start from.
    pub fn compose_json(
        &self,
        initial: Option<&str>,
        chain: &Value,
        config: ComposerConfig,
    ) -> MixinResult<Unit> {
        let initial = initial.map(|name| self.unit(name).cloned()).transpose()?;
        let chain = self.resolve_chain(chain)?;
        debug!(entries = chain.len(), "resolved declarative chain");
        MixinBuilder::with_config(config).compose(initial, chain)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
