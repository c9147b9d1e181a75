// Copyright 2025 Cowboy AI, LLC.

//! Instances of units

use std::fmt;
use std::iter;
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use serde_json::Map;

use crate::errors::{MixinError, MixinResult};
use crate::member::{Member, MemberTable, Value};
use crate::unit::Unit;

/// Standalone mixin instances backing one composed instance
type PeerSet = Arc<RwLock<Vec<Weak<Mutex<Instance>>>>>;

/// An object built by running a unit's construction chain
///
/// Lookup order for [`Instance::get`]:
///
/// 1. the instance's own members
/// 2. for the concrete unit and then each ancestor: its declared methods,
///    then (for composed units with fallback lookup) the members of the
///    mixin instance constructed for that layer, bound to that instance
/// 3. for a mixin instance inside a composition: the other mixin
///    instances of the same composed instance, latest layer first
///
/// Methods found in step 2 on the instance's own unit chain run against the
/// instance itself, so a unit derived from a composed unit overrides mixin
/// behavior simply by declaring the method.
pub struct Instance {
    unit: Unit,
    members: MemberTable,
    layers: Vec<(Unit, Arc<Mutex<Instance>>)>,
    hosted_peers: Option<PeerSet>,
    peers: Option<PeerSet>,
}

impl Instance {
    pub(crate) fn new(unit: Unit) -> Self {
        Self {
            unit,
            members: MemberTable::new(),
            layers: Vec::new(),
            hosted_peers: None,
            peers: None,
        }
    }

    /// The concrete unit this instance was constructed from
    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    /// Name of the concrete unit
    pub fn unit_name(&self) -> &str {
        self.unit.name()
    }

    /// Record the standalone mixin instance constructed for a composed layer
    ///
    /// With `share_peers` the receiver can reach the other mixin instances of
    /// this composed instance by name.
    pub(crate) fn attach_layer(
        &mut self,
        layer: &Unit,
        mut receiver: Instance,
        share_peers: bool,
    ) -> Arc<Mutex<Instance>> {
        if share_peers {
            let peers = self.hosted_peers.get_or_insert_with(PeerSet::default).clone();
            receiver.peers = Some(peers);
        }

        let receiver = Arc::new(Mutex::new(receiver));
        if let Some(peers) = &self.hosted_peers {
            peers
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Arc::downgrade(&receiver));
        }
        self.layers.push((layer.clone(), receiver.clone()));
        receiver
    }

    /// The mixin instance constructed for `layer`, if any
    pub fn layer_receiver(&self, layer: &Unit) -> Option<&Arc<Mutex<Instance>>> {
        self.layers
            .iter()
            .find(|(unit, _)| unit.ptr_eq(layer))
            .map(|(_, receiver)| receiver)
    }

    /// Look up a member, falling back to behavior definitions and mixin layers
    pub fn get(&self, name: &str) -> Option<Member> {
        self.lookup_local(name).or_else(|| self.lookup_peers(name))
    }

    fn lookup_local(&self, name: &str) -> Option<Member> {
        if let Some(member) = self.members.get(name) {
            return Some(member.clone());
        }

        for unit in iter::once(&self.unit).chain(self.unit.ancestors()) {
            if let Some(method) = unit.prototype().get(name) {
                return Some(Member::Method(method.clone()));
            }
            if unit.has_fallback() {
                let found = self
                    .layer_receiver(unit)
                    .and_then(|receiver| lookup_in_receiver(receiver, name));
                if found.is_some() {
                    return found;
                }
            }
        }
        None
    }

    fn lookup_peers(&self, name: &str) -> Option<Member> {
        let peers = self.peers.as_ref()?;
        let receivers: Vec<_> = peers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .filter_map(Weak::upgrade)
            .collect();
        receivers
            .iter()
            .find_map(|receiver| lookup_in_receiver(receiver, name))
    }

    /// Value of an own data field
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.members.get(name).and_then(Member::as_field)
    }

    /// Set (or replace) an own data field
    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.members.insert(name.into(), Member::Field(value));
    }

    /// Define (or replace) an own member
    pub fn define(&mut self, name: impl Into<String>, member: Member) {
        self.members.insert(name.into(), member);
    }

    /// Whether the instance owns a member of this name
    pub fn has_own(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    /// Names of own members in definition order
    pub fn own_names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    /// The own member table
    pub fn own_members(&self) -> &MemberTable {
        &self.members
    }

    /// Whether a callable member of this name is reachable
    pub fn responds_to(&self, name: &str) -> bool {
        self.get(name).is_some_and(|m| m.is_callable())
    }

    /// Invoke a method by name
    pub fn call(&mut self, name: &str, args: &[Value]) -> MixinResult<Value> {
        let member = self.get(name).ok_or_else(|| MixinError::MemberNotFound {
            unit: self.unit_name().to_string(),
            member: name.to_string(),
        })?;

        match member {
            Member::Field(_) => Err(MixinError::NotCallable {
                unit: self.unit_name().to_string(),
                member: name.to_string(),
            }),
            Member::Method(method) => method.invoke(self, args),
            Member::Bound(bound) => bound.invoke(args),
        }
    }

    /// Snapshot of the own data fields as a JSON object
    pub fn to_json(&self) -> Value {
        let fields: Map<String, Value> = self
            .members
            .iter()
            .filter_map(|(name, member)| member.as_field().map(|v| (name.clone(), v.clone())))
            .collect();
        Value::Object(fields)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("unit", &self.unit.name())
            .field("members", &self.members.keys().collect::<Vec<_>>())
            .field("layers", &self.layers.len())
            .finish()
    }
}

/// Resolve `name` inside a mixin receiver, binding methods to it
///
/// A receiver that is already locked is skipped; it is the one currently
/// running a method, so resolving through it again would deadlock.
fn lookup_in_receiver(receiver: &Arc<Mutex<Instance>>, name: &str) -> Option<Member> {
    let guard = receiver.try_lock().ok()?;
    let member = guard.lookup_local(name);
    drop(guard);
    member.map(|member| match member {
        Member::Method(method) => Member::Bound(method.bind(receiver.clone())),
        other => other,
    })
}
