//! Component registry.
//!
//! Maps `(kind, name)` to a constructor for each of the three capability
//! kinds. Registration takes `&mut self`, so a registry is populated during
//! startup and becomes read-only once it is shared.
//!
//! # Example
//!
//! ```rust,ignore
//! use octopus::{ComponentKind, Registry};
//!
//! let registry = Registry::with_builtins();
//! assert!(registry.available(ComponentKind::Subnet).contains(&"lexical_v1".to_string()));
//! ```

use crate::adapters::{Adapter, ChineseAdapter, EnglishAdapter};
use crate::coordinators::{AttentionFuser, FixedWeightFuser, Fuser, FuserContext};
use crate::models::ComponentKind;
use crate::subnets::{
    ContextSpecialist, DomainSpecialist, LexicalSpecialist, MemoryBackedSubnet, Specialist,
    Subnet, SubnetDeps, SyntaxSpecialist,
};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

/// Constructor for adapters.
pub type AdapterConstructor =
    Arc<dyn Fn(&serde_json::Value) -> Result<Arc<dyn Adapter>> + Send + Sync>;

/// Constructor for subnets; receives the injected dependencies.
pub type SubnetConstructor =
    Arc<dyn Fn(SubnetDeps, &serde_json::Value) -> Result<Arc<dyn Subnet>> + Send + Sync>;

/// Constructor for fusers; receives the subnet count and embedding width.
pub type CoordinatorConstructor =
    Arc<dyn Fn(FuserContext, &serde_json::Value) -> Result<Box<dyn Fuser>> + Send + Sync>;

/// What registration does when a name is already bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// The new binding replaces the old one.
    #[default]
    Replace,
    /// Registration fails with [`Error::DuplicateComponent`].
    Reject,
}

/// Name-to-constructor mapping for adapters, subnets and fusers.
#[derive(Clone, Default)]
pub struct Registry {
    policy: DuplicatePolicy,
    adapters: BTreeMap<String, AdapterConstructor>,
    subnets: BTreeMap<String, SubnetConstructor>,
    coordinators: BTreeMap<String, CoordinatorConstructor>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("policy", &self.policy)
            .field("adapters", &self.adapters.keys().collect::<Vec<_>>())
            .field("subnets", &self.subnets.keys().collect::<Vec<_>>())
            .field("coordinators", &self.coordinators.keys().collect::<Vec<_>>())
            .finish()
    }
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Inserts a binding according to `policy`.
fn bind<C>(
    map: &mut BTreeMap<String, C>,
    policy: DuplicatePolicy,
    kind: ComponentKind,
    name: &str,
    constructor: C,
) -> Result<()> {
    if map.contains_key(name) {
        match policy {
            DuplicatePolicy::Reject => {
                return Err(Error::DuplicateComponent {
                    kind,
                    name: name.to_string(),
                });
            },
            DuplicatePolicy::Replace => {
                tracing::debug!(kind = %kind, name, "Replacing registered component");
            },
        }
    }
    map.insert(name.to_string(), constructor);
    Ok(())
}

impl Registry {
    /// Creates an empty registry that replaces duplicate names.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the duplicate-name policy for subsequent registrations.
    #[must_use]
    pub const fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the duplicate-name policy.
    #[must_use]
    pub const fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Creates a registry holding every built-in component.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_builtins();
        registry
    }

    /// Returns the process-wide registry of built-in components.
    ///
    /// Built on first use and read-only afterwards.
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(Self::with_builtins)
    }

    /// Registers every built-in component, in resolution order.
    ///
    /// Built-in bindings always replace existing ones, whatever the policy.
    pub fn register_builtins(&mut self) {
        fn adapter<A: Adapter + 'static>(
            build: fn(&serde_json::Value) -> Result<A>,
        ) -> AdapterConstructor {
            Arc::new(move |params: &serde_json::Value| {
                Ok(Arc::new(build(params)?) as Arc<dyn Adapter>)
            })
        }

        fn subnet<S: Specialist + 'static>() -> SubnetConstructor {
            Arc::new(|deps: SubnetDeps, params: &serde_json::Value| {
                let subnet = MemoryBackedSubnet::<S>::from_params(deps, params)?;
                Ok(Arc::new(subnet) as Arc<dyn Subnet>)
            })
        }

        fn coordinator<F: Fuser + 'static>(
            build: fn(FuserContext, &serde_json::Value) -> Result<F>,
        ) -> CoordinatorConstructor {
            Arc::new(move |context: FuserContext, params: &serde_json::Value| {
                Ok(Box::new(build(context, params)?) as Box<dyn Fuser>)
            })
        }

        self.adapters
            .insert("english_v1".to_string(), adapter(EnglishAdapter::from_params));
        self.adapters
            .insert("chinese_v1".to_string(), adapter(ChineseAdapter::from_params));

        for (name, constructor) in [
            (LexicalSpecialist::NAME, subnet::<LexicalSpecialist>()),
            (SyntaxSpecialist::NAME, subnet::<SyntaxSpecialist>()),
            (ContextSpecialist::NAME, subnet::<ContextSpecialist>()),
            (DomainSpecialist::NAME, subnet::<DomainSpecialist>()),
        ] {
            self.subnets.insert(name.to_string(), constructor);
        }

        self.coordinators.insert(
            AttentionFuser::NAME.to_string(),
            coordinator(AttentionFuser::from_params),
        );
        self.coordinators.insert(
            FixedWeightFuser::NAME.to_string(),
            coordinator(FixedWeightFuser::from_params),
        );
    }

    /// Binds an adapter constructor to `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateComponent`] if `name` is taken and the
    /// policy is [`DuplicatePolicy::Reject`].
    pub fn register_adapter<F>(&mut self, name: &str, constructor: F) -> Result<()>
    where
        F: Fn(&serde_json::Value) -> Result<Arc<dyn Adapter>> + Send + Sync + 'static,
    {
        bind(
            &mut self.adapters,
            self.policy,
            ComponentKind::Adapter,
            name,
            Arc::new(constructor),
        )
    }

    /// Binds a subnet constructor to `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateComponent`] if `name` is taken and the
    /// policy is [`DuplicatePolicy::Reject`].
    pub fn register_subnet<F>(&mut self, name: &str, constructor: F) -> Result<()>
    where
        F: Fn(SubnetDeps, &serde_json::Value) -> Result<Arc<dyn Subnet>> + Send + Sync + 'static,
    {
        bind(
            &mut self.subnets,
            self.policy,
            ComponentKind::Subnet,
            name,
            Arc::new(constructor),
        )
    }

    /// Binds a fuser constructor to `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateComponent`] if `name` is taken and the
    /// policy is [`DuplicatePolicy::Reject`].
    pub fn register_coordinator<F>(&mut self, name: &str, constructor: F) -> Result<()>
    where
        F: Fn(FuserContext, &serde_json::Value) -> Result<Box<dyn Fuser>> + Send + Sync + 'static,
    {
        bind(
            &mut self.coordinators,
            self.policy,
            ComponentKind::Coordinator,
            name,
            Arc::new(constructor),
        )
    }

    /// Returns the names registered for `kind`, sorted.
    #[must_use]
    pub fn available(&self, kind: ComponentKind) -> Vec<String> {
        match kind {
            ComponentKind::Adapter => self.adapters.keys().cloned().collect(),
            ComponentKind::Subnet => self.subnets.keys().cloned().collect(),
            ComponentKind::Coordinator => self.coordinators.keys().cloned().collect(),
        }
    }

    /// Returns true if `name` is registered for `kind`.
    #[must_use]
    pub fn contains(&self, kind: ComponentKind, name: &str) -> bool {
        match kind {
            ComponentKind::Adapter => self.adapters.contains_key(name),
            ComponentKind::Subnet => self.subnets.contains_key(name),
            ComponentKind::Coordinator => self.coordinators.contains_key(name),
        }
    }

    fn unknown(&self, kind: ComponentKind, name: &str) -> Error {
        Error::UnknownComponent {
            kind,
            name: name.to_string(),
            available: self.available(kind),
        }
    }

    /// Constructs the adapter registered as `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownComponent`] if `name` is not registered, or
    /// the constructor's error.
    pub fn resolve_adapter(
        &self,
        name: &str,
        params: &serde_json::Value,
    ) -> Result<Arc<dyn Adapter>> {
        let constructor = self
            .adapters
            .get(name)
            .ok_or_else(|| self.unknown(ComponentKind::Adapter, name))?;
        tracing::debug!(kind = "adapter", name, "Resolving component");
        constructor(params)
    }

    /// Constructs the subnet registered as `name` with injected dependencies.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownComponent`] if `name` is not registered, or
    /// the constructor's error.
    pub fn resolve_subnet(
        &self,
        name: &str,
        deps: SubnetDeps,
        params: &serde_json::Value,
    ) -> Result<Arc<dyn Subnet>> {
        let constructor = self
            .subnets
            .get(name)
            .ok_or_else(|| self.unknown(ComponentKind::Subnet, name))?;
        tracing::debug!(kind = "subnet", name, "Resolving component");
        constructor(deps, params)
    }

    /// Constructs the fuser registered as `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownComponent`] if `name` is not registered, or
    /// the constructor's error.
    pub fn resolve_coordinator(
        &self,
        name: &str,
        context: FuserContext,
        params: &serde_json::Value,
    ) -> Result<Box<dyn Fuser>> {
        let constructor = self
            .coordinators
            .get(name)
            .ok_or_else(|| self.unknown(ComponentKind::Coordinator, name))?;
        tracing::debug!(kind = "coordinator", name, "Resolving component");
        constructor(context, params)
    }
}
