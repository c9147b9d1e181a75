// Copyright 2025 Cowboy AI, LLC.

//! Class-like behavior units
//!
//! A [`Unit`] is an immutable, cheaply cloneable description of a kind of
//! object: its name, its parent, the fields and constructor that set up each
//! instance, the methods on its behavior definition, and its static members.
//!
//! # Examples
//!
//! ```rust
//! use cim_mixin::Unit;
//! use serde_json::json;
//!
//! let walker = Unit::builder("Walker")
//!     .method("walk", |_, _| Ok(json!("walking")))
//!     .build();
//!
//! let mut instance = walker.instantiate(&[]).unwrap();
//! assert_eq!(instance.call("walk", &[]).unwrap(), json!("walking"));
//! ```

use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::errors::{MixinError, MixinResult};
use crate::instance::Instance;
use crate::member::{Method, StaticMember, Value};

/// Signature of a construction procedure
pub type ConstructorFn =
    dyn Fn(&ConstructContext<'_>, &mut Instance, &[Value]) -> MixinResult<()> + Send + Sync;

/// Name reserved for the construction procedure on a behavior definition
pub const CONSTRUCTOR_NAME: &str = "constructor";

/// What produced a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// Declared directly through [`UnitBuilder`]
    Plain,
    /// Synthesized by the composer from an accumulator and a mixin
    Composed,
    /// Abstract contract guard
    AbstractGuard,
}

/// Context handed to each construction procedure in the chain
pub struct ConstructContext<'a> {
    target: &'a Unit,
    current: &'a Unit,
}

impl<'a> ConstructContext<'a> {
    /// The most-derived unit being instantiated
    pub fn target(&self) -> &'a Unit {
        self.target
    }

    /// The unit whose construction procedure is running
    pub fn current(&self) -> &'a Unit {
        self.current
    }
}

struct UnitInner {
    name: String,
    kind: UnitKind,
    parent: Option<Unit>,
    mixin: Option<Unit>,
    fallback: bool,
    fields: IndexMap<String, Value>,
    constructor: Option<Arc<ConstructorFn>>,
    prototype: IndexMap<String, Method>,
    statics: IndexMap<String, StaticMember>,
}

/// Shared handle to an immutable class-like unit
#[derive(Clone)]
pub struct Unit {
    inner: Arc<UnitInner>,
}

impl Unit {
    /// Start declaring a unit
    pub fn builder(name: impl Into<String>) -> UnitBuilder {
        UnitBuilder::new(name)
    }

    /// The unit's own name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// What produced this unit
    pub fn kind(&self) -> UnitKind {
        self.inner.kind
    }

    /// Whether this unit is an abstract contract guard
    pub fn is_abstract_guard(&self) -> bool {
        self.inner.kind == UnitKind::AbstractGuard
    }

    /// The unit this one extends
    pub fn parent(&self) -> Option<&Unit> {
        self.inner.parent.as_ref()
    }

    /// The mixin a composed unit was synthesized from
    pub fn mixin(&self) -> Option<&Unit> {
        self.inner.mixin.as_ref()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Unit) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Parent, grandparent, and so on up to the root
    pub fn ancestors(&self) -> impl Iterator<Item = &Unit> {
        std::iter::successors(self.parent(), |&unit| unit.parent())
    }

    /// Whether `other` appears anywhere above this unit
    pub fn is_derived_from(&self, other: &Unit) -> bool {
        self.ancestors().any(|unit| unit.ptr_eq(other))
    }

    /// Default instance fields declared on this unit
    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.inner.fields
    }

    /// Methods declared directly on this unit's behavior definition
    pub fn prototype(&self) -> &IndexMap<String, Method> {
        &self.inner.prototype
    }

    /// Names of methods this unit declares itself
    ///
    /// A composed unit declares what its mixin declares.
    pub fn declared_methods(&self) -> IndexSet<String> {
        let mut names: IndexSet<String> = self.inner.prototype.keys().cloned().collect();
        if let Some(mixin) = &self.inner.mixin {
            names.extend(mixin.declared_methods());
        }
        names
    }

    /// Whether composed instances delegate to this unit's mixin
    pub fn has_fallback(&self) -> bool {
        self.inner.fallback && self.inner.mixin.is_some()
    }

    /// Find a method declared on this unit or its parent chain
    ///
    /// Mixin definitions are not included: they only run bound to the mixin's
    /// own instance, which exists per composed instance (see [`Instance::get`]).
    pub fn resolve_method(&self, name: &str) -> Option<Method> {
        self.inner
            .prototype
            .get(name)
            .cloned()
            .or_else(|| self.inner.parent.as_ref().and_then(|p| p.resolve_method(name)))
    }

    /// Whether instances of this unit can reach a method of this name
    ///
    /// Order: own definition, then the mixin's definitions when fallback
    /// lookup is enabled, then the parent chain.
    pub fn defines(&self, name: &str) -> bool {
        self.inner.prototype.contains_key(name)
            || (self.has_fallback() && self.inner.mixin.as_ref().is_some_and(|m| m.defines(name)))
            || self.inner.parent.as_ref().is_some_and(|p| p.defines(name))
    }

    /// Every method declared on this unit or its parent chain, nearest first wins
    pub fn method_table(&self) -> IndexMap<String, Method> {
        let mut table = self
            .inner
            .parent
            .as_ref()
            .map(Unit::method_table)
            .unwrap_or_default();
        table.extend(
            self.inner
                .prototype
                .iter()
                .map(|(name, method)| (name.clone(), method.clone())),
        );
        table
    }

    /// Static members declared on this unit itself
    pub fn own_statics(&self) -> &IndexMap<String, StaticMember> {
        &self.inner.statics
    }

    /// Find a static member on this unit or its ancestors
    pub fn static_member(&self, name: &str) -> Option<&StaticMember> {
        self.inner
            .statics
            .get(name)
            .or_else(|| self.inner.parent.as_ref().and_then(|p| p.static_member(name)))
    }

    /// Invoke a static function through this unit
    pub fn call_static(&self, name: &str, args: &[Value]) -> MixinResult<Value> {
        match self.static_member(name) {
            Some(StaticMember::Function(func)) => func(self, args),
            Some(StaticMember::Value(_)) => Err(MixinError::NotCallable {
                unit: self.name().to_string(),
                member: name.to_string(),
            }),
            None => Err(MixinError::MemberNotFound {
                unit: self.name().to_string(),
                member: name.to_string(),
            }),
        }
    }

    /// Construct an instance, running every construction procedure from the
    /// root of the parent chain down to this unit
    pub fn instantiate(&self, args: &[Value]) -> MixinResult<Instance> {
        let mut instance = Instance::new(self.clone());
        self.construct(self, &mut instance, args)?;
        Ok(instance)
    }

    fn construct(&self, target: &Unit, instance: &mut Instance, args: &[Value]) -> MixinResult<()> {
        if let Some(parent) = &self.inner.parent {
            parent.construct(target, instance, args)?;
        }

        for (name, value) in &self.inner.fields {
            instance.set_field(name.clone(), value.clone());
        }

        if let Some(constructor) = &self.inner.constructor {
            let ctx = ConstructContext {
                target,
                current: self,
            };
            constructor(&ctx, instance, args)?;
        }
        Ok(())
    }

    /// Reject units the composer cannot use as class-like mixins
    pub fn validate_shape(&self) -> MixinResult<()> {
        if self.inner.name.trim().is_empty() {
            return Err(MixinError::invalid_shape(
                "<unnamed>",
                "class-like units must have a name",
            ));
        }
        if self.inner.prototype.contains_key(CONSTRUCTOR_NAME) {
            return Err(MixinError::invalid_shape(
                self.name(),
                "the construction procedure cannot be declared as a method",
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("name", &self.inner.name)
            .field("kind", &self.inner.kind)
            .field("parent", &self.inner.parent.as_ref().map(Unit::name))
            .field("mixin", &self.inner.mixin.as_ref().map(Unit::name))
            .field("prototype", &self.inner.prototype.keys().collect::<Vec<_>>())
            .field("statics", &self.inner.statics.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`Unit`]
pub struct UnitBuilder {
    name: String,
    kind: UnitKind,
    parent: Option<Unit>,
    mixin: Option<Unit>,
    fallback: bool,
    fields: IndexMap<String, Value>,
    constructor: Option<Arc<ConstructorFn>>,
    prototype: IndexMap<String, Method>,
    statics: IndexMap<String, StaticMember>,
}

impl UnitBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: UnitKind::Plain,
            parent: None,
            mixin: None,
            fallback: false,
            fields: IndexMap::new(),
            constructor: None,
            prototype: IndexMap::new(),
            statics: IndexMap::new(),
        }
    }

    /// Extend another unit
    pub fn extends(mut self, parent: &Unit) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Declare an instance field initialized before the constructor runs
    pub fn field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Set the construction procedure
    pub fn constructor<F>(mut self, constructor: F) -> Self
    where
        F: Fn(&ConstructContext<'_>, &mut Instance, &[Value]) -> MixinResult<()>
            + Send
            + Sync
            + 'static,
    {
        self.constructor = Some(Arc::new(constructor));
        self
    }

    /// Declare a method on the behavior definition
    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&mut Instance, &[Value]) -> MixinResult<Value> + Send + Sync + 'static,
    {
        self.prototype.insert(name.into(), Method::new(method));
        self
    }

    /// Declare a static data member
    pub fn static_value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.statics.insert(name.into(), StaticMember::Value(value));
        self
    }

    /// Declare a static function
    pub fn static_fn<F>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Unit, &[Value]) -> MixinResult<Value> + Send + Sync + 'static,
    {
        self.statics.insert(name.into(), StaticMember::function(func));
        self
    }

    pub(crate) fn static_member(mut self, name: impl Into<String>, member: StaticMember) -> Self {
        self.statics.insert(name.into(), member);
        self
    }

    pub(crate) fn kind(mut self, kind: UnitKind) -> Self {
        self.kind = kind;
        self
    }

    pub(crate) fn mixin(mut self, mixin: &Unit, fallback: bool) -> Self {
        self.mixin = Some(mixin.clone());
        self.fallback = fallback;
        self
    }

    /// Finish the unit
    pub fn build(self) -> Unit {
        Unit {
            inner: Arc::new(UnitInner {
                name: self.name,
                kind: self.kind,
                parent: self.parent,
                mixin: self.mixin,
                fallback: self.fallback,
                fields: self.fields,
                constructor: self.constructor,
                prototype: self.prototype,
                statics: self.statics,
            }),
        }
    }
}
