//! Dependency injection container.
//!
//! Services are registered once while the application is built and are
//! handed to handlers through [`Inject<T>`] parameters. Lookup is keyed by
//! [`TypeId`], so a handler can only ask for types that exist.
//!
//! # Example
//!
//! ```rust
//! use daedalus_core::di::{Container, Inject};
//! use std::sync::Arc;
//!
//! struct Mailer {
//!     sender: String,
//! }
//!
//! let mut container = Container::new();
//! container.register(Arc::new(Mailer { sender: "noreply@example.com".into() }));
//!
//! let mailer = Inject::<Mailer>::from_container(&container).unwrap();
//! assert_eq!(mailer.sender, "noreply@example.com");
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Error when a dependency cannot be resolved.
#[derive(Debug, Clone)]
pub struct InjectionError {
    /// The type name that could not be resolved.
    pub type_name: &'static str,
}

impl fmt::Display for InjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dependency [{}] does not exist", self.type_name)
    }
}

impl std::error::Error for InjectionError {}

impl InjectionError {
    /// Creates a new injection error for a missing service.
    pub fn not_registered<T: ?Sized>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
        }
    }
}

/// A typed dependency registry.
///
/// The container stores Arc-wrapped services keyed by their type. It is
/// filled during application build and then shared read-only between
/// requests.
#[derive(Default, Clone)]
pub struct Container {
    services: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Container {
    /// Creates a new empty container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Registers a service, replacing any previous one of the same type.
    pub fn register<T: Send + Sync + 'static>(&mut self, service: Arc<T>) {
        self.services.insert(TypeId::of::<T>(), service);
    }

    /// Resolves a service from the container.
    ///
    /// Returns `None` if the service is not registered.
    #[must_use]
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.services
            .get(&TypeId::of::<T>())
            .and_then(|s| s.clone().downcast::<T>().ok())
    }

    /// Resolves a service or returns an error.
    pub fn resolve_required<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, InjectionError> {
        self.resolve().ok_or_else(InjectionError::not_registered::<T>)
    }

    /// Checks if a service is registered.
    #[must_use]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if no services are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("service_count", &self.services.len())
            .finish()
    }
}

/// Types that can be built from the container when a handler is invoked.
pub trait FromContainer: Sized {
    /// Resolves `Self` from `container`.
    fn from_container(container: &Container) -> Result<Self, InjectionError>;
}

/// A wrapper for injected dependencies.
///
/// `Inject<T>` is resolved from the [`Container`] right before the handler
/// runs. A missing registration ends the request with a 500 response.
#[derive(Clone)]
pub struct Inject<T>(pub Arc<T>);

impl<T> Inject<T> {
    /// Creates a new `Inject` wrapper.
    pub fn new(inner: Arc<T>) -> Self {
        Self(inner)
    }

    /// Converts into the inner `Arc`.
    pub fn into_inner(self) -> Arc<T> {
        self.0
    }
}

impl<T> std::ops::Deref for Inject<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: fmt::Debug> fmt::Debug for Inject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Inject").field(&self.0).finish()
    }
}

impl<T: Send + Sync + 'static> Inject<T> {
    /// Extracts the service from a container.
    pub fn from_container(container: &Container) -> Result<Self, InjectionError> {
        container.resolve_required::<T>().map(Inject)
    }
}

impl<T: Send + Sync + 'static> FromContainer for Inject<T> {
    fn from_container(container: &Container) -> Result<Self, InjectionError> {
        Self::from_container(container)
    }
}

impl<T: FromContainer> FromContainer for Option<T> {
    fn from_container(container: &Container) -> Result<Self, InjectionError> {
        Ok(T::from_container(container).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Repository {
        table: String,
    }

    #[test]
    fn test_container_register_and_resolve() {
        let mut container = Container::new();
        container.register(Arc::new(Repository {
            table: "articles".into(),
        }));

        let repo: Option<Arc<Repository>> = container.resolve();
        assert_eq!(repo.unwrap().table, "articles");
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn test_container_resolve_missing() {
        let container = Container::new();
        assert!(container.is_empty());
        assert!(container.resolve::<Repository>().is_none());
        assert!(!container.contains::<Repository>());
    }

    #[test]
    fn test_injection_error_display() {
        let err = InjectionError::not_registered::<Repository>();
        let msg = err.to_string();
        assert!(msg.starts_with("dependency ["));
        assert!(msg.contains("Repository"));
        assert!(msg.ends_with("does not exist"));
    }

    #[test]
    fn test_inject_from_container() {
        let mut container = Container::new();
        container.register(Arc::new(Repository {
            table: "users".into(),
        }));

        let inject = <Inject<Repository> as FromContainer>::from_container(&container).unwrap();
        assert_eq!(inject.table, "users");
    }

    #[test]
    fn test_optional_inject_tolerates_missing() {
        let container = Container::new();
        let inject = <Option<Inject<Repository>>>::from_container(&container).unwrap();
        assert!(inject.is_none());
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut container = Container::new();
        container.register(Arc::new(Repository { table: "a".into() }));
        container.register(Arc::new(Repository { table: "b".into() }));

        assert_eq!(container.len(), 1);
        assert_eq!(container.resolve::<Repository>().unwrap().table, "b");
    }

    #[test]
    fn test_container_debug() {
        let container = Container::new();
        let debug = format!("{:?}", container);
        assert!(debug.contains("service_count"));
    }
}
