// Copyright 2025 Cowboy AI, LLC.

//! Folding chains of behavior units into one composed unit
//!
//! Each class-like entry produces a new unit that extends the accumulator.
//! Its construction procedure builds the accumulator's state, constructs a
//! standalone instance of the mixin, and copies that instance's members on top.
//! Copied methods are bound to the standalone mixin instance. The mixin's
//! behavior-definition methods stay on the mixin and are reached through the
//! composed unit during lookup, so units derived from a composed unit can
//! override them. Transformer entries replace the accumulator wholesale.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::errors::MixinResult;
use crate::instance::Instance;
use crate::member::Member;
use crate::unit::{Unit, UnitKind};

/// Static member names never copied from a mixin onto a composed unit
pub const RESERVED_STATIC_NAMES: [&str; 3] = ["prototype", "length", "name"];

/// Signature of a transformer
pub type TransformFn = dyn Fn(Unit) -> MixinResult<Unit> + Send + Sync;

/// A free-form composition step: takes the accumulator, returns the next one
#[derive(Clone)]
pub struct Transformer {
    name: String,
    func: Arc<TransformFn>,
}

impl Transformer {
    /// Wrap a closure as a named transformer
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Unit) -> MixinResult<Unit> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Name used in logs and errors
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the transformer against a base unit
    pub fn apply(&self, base: Unit) -> MixinResult<Unit> {
        (self.func)(base)
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformer").field("name", &self.name).finish()
    }
}

/// One entry of a composition chain
#[derive(Debug, Clone)]
pub enum BehaviorUnit {
    /// Class-like unit mixed in by synthesizing a derived unit
    Class(Unit),
    /// Transformer that receives the accumulator and returns the next one
    Transformer(Transformer),
}

impl BehaviorUnit {
    /// Shorthand for a transformer entry
    pub fn transformer<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Unit) -> MixinResult<Unit> + Send + Sync + 'static,
    {
        BehaviorUnit::Transformer(Transformer::new(name, func))
    }

    /// Name of the unit or transformer
    pub fn name(&self) -> &str {
        match self {
            BehaviorUnit::Class(unit) => unit.name(),
            BehaviorUnit::Transformer(transformer) => transformer.name(),
        }
    }
}

impl From<Unit> for BehaviorUnit {
    fn from(unit: Unit) -> Self {
        BehaviorUnit::Class(unit)
    }
}

impl From<&Unit> for BehaviorUnit {
    fn from(unit: &Unit) -> Self {
        BehaviorUnit::Class(unit.clone())
    }
}

impl From<Transformer> for BehaviorUnit {
    fn from(transformer: Transformer) -> Self {
        BehaviorUnit::Transformer(transformer)
    }
}

/// How mixin instance members land on the composed instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyPolicy {
    /// Always copy; later mixins win, even over base construction
    #[default]
    Overwrite,
    /// Copy only names the composed instance does not already own
    NonDestructive,
}

/// Composer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Instance member copy policy
    pub copy_policy: CopyPolicy,
    /// Whether composed instances reach their mixins' behavior-definition
    /// methods, and whether mixin instances reach each other by name
    pub fallback_lookup: bool,
    /// Name of the empty base unit used when no initial unit is given
    pub base_name: String,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            copy_policy: CopyPolicy::Overwrite,
            fallback_lookup: true,
            base_name: "Base".to_string(),
        }
    }
}

impl ComposerConfig {
    /// Parse a configuration from JSON; missing keys take their defaults
    pub fn from_json(json: &str) -> MixinResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Entry point for composing behavior units
///
/// # Examples
///
/// ```rust
/// use cim_mixin::{MixinBuilder, Unit};
/// use serde_json::json;
///
/// let walker = Unit::builder("Walker")
///     .method("walk", |_, _| Ok(json!("walking")))
///     .build();
/// let swimmer = Unit::builder("Swimmer")
///     .method("swim", |_, _| Ok(json!("swimming")))
///     .build();
///
/// let duck = MixinBuilder::new().with([walker, swimmer]).unwrap();
/// let mut instance = duck.instantiate(&[]).unwrap();
/// assert_eq!(instance.call("walk", &[]).unwrap(), json!("walking"));
/// assert_eq!(instance.call("swim", &[]).unwrap(), json!("swimming"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MixinBuilder {
    config: ComposerConfig,
}

impl MixinBuilder {
    /// Builder with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder with an explicit configuration
    pub fn with_config(config: ComposerConfig) -> Self {
        Self { config }
    }

    /// The active configuration
    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Compose a chain on top of an empty base unit
    pub fn with<I, B>(&self, chain: I) -> MixinResult<Unit>
    where
        I: IntoIterator<Item = B>,
        B: Into<BehaviorUnit>,
    {
        self.compose(None, chain)
    }

    /// Compose a chain on top of `initial`, or an empty base unit
    pub fn compose<I, B>(&self, initial: Option<Unit>, chain: I) -> MixinResult<Unit>
    where
        I: IntoIterator<Item = B>,
        B: Into<BehaviorUnit>,
    {
        let chain: Vec<BehaviorUnit> = chain.into_iter().map(Into::into).collect();

        // Shape problems surface before any transformer runs.
        for entry in &chain {
            if let BehaviorUnit::Class(unit) = entry {
                unit.validate_shape()?;
            }
        }

        let base = initial.unwrap_or_else(|| Unit::builder(self.config.base_name.clone()).build());
        debug!(base = base.name(), entries = chain.len(), "composing mixin chain");

        chain.into_iter().try_fold(base, |accumulator, entry| match entry {
            BehaviorUnit::Transformer(transformer) => {
                trace!(transformer = transformer.name(), base = accumulator.name(), "applying transformer");
                transformer.apply(accumulator)
            }
            BehaviorUnit::Class(mixin) => Ok(self.mix(&accumulator, &mixin)),
        })
    }

    fn mix(&self, base: &Unit, mixin: &Unit) -> Unit {
        trace!(base = base.name(), mixin = mixin.name(), "mixing class-like unit");

        let policy = self.config.copy_policy;
        let fallback = self.config.fallback_lookup;
        let source = mixin.clone();
        let mut builder = Unit::builder(format!("{}+{}", base.name(), mixin.name()))
            .kind(UnitKind::Composed)
            .extends(base)
            .mixin(mixin, fallback)
            .constructor(move |ctx, instance, args| {
                let mixin_instance = source.instantiate(args)?;
                merge_instance(instance, ctx.current(), mixin_instance, policy, fallback);
                Ok(())
            });

        for (name, member) in mixin.own_statics() {
            if RESERVED_STATIC_NAMES.contains(&name.as_str()) {
                trace!(mixin = mixin.name(), member = name.as_str(), "skipping reserved static");
                continue;
            }
            builder = builder.static_member(name.clone(), member.clone());
        }

        builder.build()
    }
}

/// Attach a standalone mixin instance to `layer` and copy its own members
///
/// Own methods are copied bound to the mixin instance. Methods on the mixin's
/// behavior definitions are not copied; lookup reaches them through `layer`.
fn merge_instance(
    target: &mut Instance,
    layer: &Unit,
    mixin_instance: Instance,
    policy: CopyPolicy,
    fallback: bool,
) {
    let own = mixin_instance.own_members().clone();
    let receiver = target.attach_layer(layer, mixin_instance, fallback);

    for (name, member) in own {
        if policy == CopyPolicy::NonDestructive && target.has_own(&name) {
            continue;
        }
        let member = match member {
            Member::Method(method) => Member::Bound(method.bind(receiver.clone())),
            other => other,
        };
        target.define(name, member);
    }
}

/// Compose a chain with the default configuration
///
/// `initial` is the starting accumulator; `None` starts from an empty base.
pub fn compose<I, B>(initial: Option<Unit>, chain: I) -> MixinResult<Unit>
where
    I: IntoIterator<Item = B>,
    B: Into<BehaviorUnit>,
{
    MixinBuilder::new().compose(initial, chain)
}
