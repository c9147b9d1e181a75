// Copyright 2025 Cowboy AI, LLC.

//! Abstract contract guards
//!
//! A guard is a base unit whose construction procedure checks the unit being
//! instantiated. The layer directly below the guard is the contract: it
//! declares the methods every concrete unit one level further down must
//! declare itself. Neither the guard nor the contract layer can be
//! instantiated.
//!
//! ```text
//! AbstractBase (guard)
//!   └── Shape (contract: declares `area`)
//!         └── Square (concrete: must declare `area`)
//! ```
//!
//! The check runs on every instantiation against the most-derived unit, so a
//! single guard can sit above any number of contracts.

use tracing::{debug, warn};

use crate::errors::{MixinError, MixinResult};
use crate::unit::{Unit, UnitKind};

/// Default name of a guard unit
pub const ABSTRACT_BASE_NAME: &str = "AbstractBase";

/// Builder for abstract guard units
#[derive(Debug, Clone)]
pub struct AbstractContractGuard {
    name: String,
}

impl Default for AbstractContractGuard {
    fn default() -> Self {
        Self {
            name: ABSTRACT_BASE_NAME.to_string(),
        }
    }
}

impl AbstractContractGuard {
    /// Guard with the default name
    pub fn new() -> Self {
        Self::default()
    }

    /// Guard with a custom name
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Produce the guard unit
    pub fn build(self) -> Unit {
        Unit::builder(self.name)
            .kind(UnitKind::AbstractGuard)
            .constructor(|ctx, _, _| check_contract(ctx.current(), ctx.target()))
            .build()
    }
}

/// Produce a guard unit with the default name
pub fn make_abstract_base() -> Unit {
    AbstractContractGuard::new().build()
}

/// Check that `target` may be instantiated below `guard`
///
/// Reports only the first missing method, in the contract's declaration order.
pub fn check_contract(guard: &Unit, target: &Unit) -> MixinResult<()> {
    let contract = match target.parent() {
        Some(parent) if !target.ptr_eq(guard) && !parent.ptr_eq(guard) => parent,
        _ => {
            warn!(guard = guard.name(), unit = target.name(), "abstract unit instantiated");
            return Err(MixinError::AbstractInstantiationDenied {
                unit: target.name().to_string(),
            });
        }
    };

    let provided = target.declared_methods();
    if let Some(missing) = contract
        .declared_methods()
        .into_iter()
        .find(|name| !provided.contains(name))
    {
        warn!(
            contract = contract.name(),
            unit = target.name(),
            method = missing.as_str(),
            "abstract method not implemented"
        );
        return Err(MixinError::AbstractMethodMissing {
            method: missing,
            unit: target.name().to_string(),
        });
    }

    debug!(contract = contract.name(), unit = target.name(), "contract satisfied");
    Ok(())
}
