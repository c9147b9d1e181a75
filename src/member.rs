// Copyright 2025 Cowboy AI, LLC.

//! Members carried by units and instances
//!
//! A member is either a plain data field, a method that runs against the
//! instance it is called on, or a method bound to a fixed receiver (the
//! standalone mixin instance it was copied from).

use std::fmt;
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;

use crate::errors::{MixinError, MixinResult};
use crate::instance::Instance;
use crate::unit::Unit;

/// Data values held by fields, passed as arguments and returned by methods
pub type Value = serde_json::Value;

/// Signature of an instance method: receiver, then positional arguments
pub type MethodFn = dyn Fn(&mut Instance, &[Value]) -> MixinResult<Value> + Send + Sync;

/// Signature of a static function: the unit it was called through, then arguments
pub type StaticFn = dyn Fn(&Unit, &[Value]) -> MixinResult<Value> + Send + Sync;

/// Ordered table of instance members, keyed by name
pub type MemberTable = IndexMap<String, Member>;

/// A method that runs against whichever instance invokes it
#[derive(Clone)]
pub struct Method {
    func: Arc<MethodFn>,
}

impl Method {
    /// Wrap a closure as a method
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&mut Instance, &[Value]) -> MixinResult<Value> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }

    /// Run the method with `receiver` as its instance context
    pub fn invoke(&self, receiver: &mut Instance, args: &[Value]) -> MixinResult<Value> {
        (self.func)(receiver, args)
    }

    /// Bind this method to a shared receiver
    pub fn bind(&self, receiver: Arc<Mutex<Instance>>) -> BoundMethod {
        BoundMethod {
            method: self.clone(),
            receiver,
        }
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Method(..)")
    }
}

/// A method that always runs against the instance it was bound to
///
/// Mixin methods copied onto a composed instance are bound to the standalone
/// mixin instance, so they read and write the mixin's own state.
#[derive(Clone)]
pub struct BoundMethod {
    method: Method,
    receiver: Arc<Mutex<Instance>>,
}

impl BoundMethod {
    /// Invoke the method against its bound receiver
    pub fn invoke(&self, args: &[Value]) -> MixinResult<Value> {
        let mut receiver = self
            .receiver
            .lock()
            .map_err(|e| MixinError::ReceiverPoisoned(e.to_string()))?;
        self.method.invoke(&mut receiver, args)
    }

    /// Shared handle to the bound receiver
    pub fn receiver(&self) -> &Arc<Mutex<Instance>> {
        &self.receiver
    }
}

impl fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = self
            .receiver
            .try_lock()
            .map(|r| r.unit_name().to_string())
            .unwrap_or_else(|_| "<locked>".to_string());
        f.debug_struct("BoundMethod").field("receiver", &unit).finish()
    }
}

/// A named instance member
#[derive(Debug, Clone)]
pub enum Member {
    /// Plain data field
    Field(Value),
    /// Method resolved against the calling instance
    Method(Method),
    /// Method bound to a fixed receiver
    Bound(BoundMethod),
}

impl Member {
    /// Wrap a closure as a method member
    pub fn method<F>(func: F) -> Self
    where
        F: Fn(&mut Instance, &[Value]) -> MixinResult<Value> + Send + Sync + 'static,
    {
        Member::Method(Method::new(func))
    }

    /// The field value, if this member is a data field
    pub fn as_field(&self) -> Option<&Value> {
        match self {
            Member::Field(value) => Some(value),
            _ => None,
        }
    }

    /// Whether this member can be invoked
    pub fn is_callable(&self) -> bool {
        !matches!(self, Member::Field(_))
    }
}

impl From<Value> for Member {
    fn from(value: Value) -> Self {
        Member::Field(value)
    }
}

/// A class-level member
#[derive(Clone)]
pub enum StaticMember {
    /// Static data value
    Value(Value),
    /// Static function, invoked with the unit it was reached through
    Function(Arc<StaticFn>),
}

impl StaticMember {
    /// Wrap a closure as a static function
    pub fn function<F>(func: F) -> Self
    where
        F: Fn(&Unit, &[Value]) -> MixinResult<Value> + Send + Sync + 'static,
    {
        StaticMember::Function(Arc::new(func))
    }

    /// The static value, if this member is data
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            StaticMember::Value(value) => Some(value),
            StaticMember::Function(_) => None,
        }
    }
}

impl fmt::Debug for StaticMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaticMember::Value(value) => f.debug_tuple("Value").field(value).finish(),
            StaticMember::Function(_) => f.write_str("Function(..)"),
        }
    }
}
