// Copyright 2025 Cowboy AI, LLC.

//! # CIM Mixin
//!
//! Runtime composition of behavior units for the Composable Information Machine.
//!
//! This crate provides two building blocks:
//! - **Composer**: folds an ordered chain of class-like units and transformers
//!   into a single composed [`Unit`] whose instances carry every mixin's members
//! - **Abstract contracts**: guard units that refuse direct instantiation and
//!   verify concrete units declare every method their contract declares
//!
//! ## Design Principles
//!
//! 1. **Immutability**: units are never mutated; composition produces new units
//! 2. **Explicit delegation**: composed units record their parent and mixin and
//!    resolve members in a fixed, documented order
//! 3. **Later wins**: instance and static members from later mixins take
//!    precedence on name collisions
//! 4. **Fail fast**: malformed chains are rejected at composition time, contract
//!    violations at construction time
//!
//! ## Example
//!
//! ```rust
//! use cim_mixin::{compose, make_abstract_base, MixinError, Unit};
//! use serde_json::json;
//!
//! let walker = Unit::builder("Walker")
//!     .method("walk", |_, _| Ok(json!("walking")))
//!     .build();
//!
//! let guard = make_abstract_base();
//! let mover = Unit::builder("Mover")
//!     .extends(&guard)
//!     .method("walk", |_, _| Ok(json!("unimplemented")))
//!     .build();
//!
//! // The contract layer cannot be instantiated on its own.
//! assert!(matches!(
//!     mover.instantiate(&[]),
//!     Err(MixinError::AbstractInstantiationDenied { .. })
//! ));
//!
//! // Mixing Walker on top of the contract satisfies it.
//! let robot = compose(Some(mover), [walker]).unwrap();
//! let mut instance = robot.instantiate(&[]).unwrap();
//! assert_eq!(instance.call("walk", &[]).unwrap(), json!("walking"));
//! ```

#![warn(missing_docs)]

mod composer;
mod contract;
mod errors;
mod instance;
mod manifest;
mod member;
mod unit;

pub use composer::{
    compose, BehaviorUnit, ComposerConfig, CopyPolicy, MixinBuilder, TransformFn, Transformer,
    RESERVED_STATIC_NAMES,
};
pub use contract::{check_contract, make_abstract_base, AbstractContractGuard, ABSTRACT_BASE_NAME};
pub use errors::{MixinError, MixinResult};
pub use instance::Instance;
pub use manifest::{MixinRegistry, UnitManifest};
pub use member::{BoundMethod, Member, MemberTable, Method, MethodFn, StaticFn, StaticMember, Value};
pub use unit::{ConstructContext, ConstructorFn, Unit, UnitBuilder, UnitKind, CONSTRUCTOR_NAME};
