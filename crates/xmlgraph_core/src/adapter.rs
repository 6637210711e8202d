//! Custom converters between values and elements.
//!
//! An adapter takes over the whole element of a value: the engine creates
//! the element, then hands it to the adapter on save, and hands the found
//! element to the adapter on load. Adapters are either registered globally
//! per type or attached to a single member.

use crate::dynamic::Dynamic;
use crate::error::{PersistError, PersistResult};
use parking_lot::RwLock;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use url::Url;
use xmlgraph_tree::Element;

/// Converts values of `T` to and from elements.
pub trait Adapter<T>: Send + Sync + 'static {
    /// Write `value` into `element`, which the engine has already created
    /// and named.
    ///
    /// # Errors
    ///
    /// Any error aborts the save.
    fn to_xml(&self, value: &T, element: &mut Element, context: Option<&Url>)
        -> PersistResult<()>;

    /// Rebuild a value from `element`.
    ///
    /// # Errors
    ///
    /// Any error aborts the load.
    fn from_xml(&self, element: &Element, context: Option<&Url>) -> PersistResult<T>;
}

/// Type-erased [`Adapter`].
pub trait PersistentAdapter: Send + Sync {
    /// Write a value into `element`.
    ///
    /// # Errors
    ///
    /// Fails with [`PersistError::TypeMismatch`] if `value` is not of the
    /// adapted type, or with whatever the adapter reports.
    fn to_xml(&self, value: &dyn Any, element: &mut Element, context: Option<&Url>)
        -> PersistResult<()>;

    /// Rebuild a value from `element`.
    ///
    /// # Errors
    ///
    /// Whatever the adapter reports.
    fn from_xml(&self, element: &Element, context: Option<&Url>) -> PersistResult<Dynamic>;
}

struct TypedAdapter<T, A> {
    adapter: A,
    _marker: PhantomData<fn() -> T>,
}

impl<T, A> PersistentAdapter for TypedAdapter<T, A>
where
    T: Any + Send + Sync,
    A: Adapter<T>,
{
    fn to_xml(
        &self,
        value: &dyn Any,
        element: &mut Element,
        context: Option<&Url>,
    ) -> PersistResult<()> {
        let value = value.downcast_ref::<T>().ok_or_else(|| {
            PersistError::type_mismatch(type_name::<T>(), "a value of another type")
        })?;
        self.adapter.to_xml(value, element, context)
    }

    fn from_xml(&self, element: &Element, context: Option<&Url>) -> PersistResult<Dynamic> {
        let value = self.adapter.from_xml(element, context)?;
        Ok(Box::new(value))
    }
}

/// Erase a typed adapter.
pub fn erase<T, A>(adapter: A) -> Arc<dyn PersistentAdapter>
where
    T: Any + Send + Sync,
    A: Adapter<T>,
{
    Arc::new(TypedAdapter {
        adapter,
        _marker: PhantomData::<fn() -> T>,
    })
}

/// Creates a fresh adapter instance for each use of a member adapter.
pub type AdapterFactory = Arc<dyn Fn() -> Arc<dyn PersistentAdapter> + Send + Sync>;

/// Factory for a default-constructible adapter.
pub fn factory<T, A>() -> AdapterFactory
where
    T: Any + Send + Sync,
    A: Adapter<T> + Default,
{
    Arc::new(|| erase::<T, A>(A::default()))
}

/// Global adapters, one per type.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: RwLock<HashMap<TypeId, Arc<dyn PersistentAdapter>>>,
}

impl AdapterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the adapter for a type.
    pub fn register(&self, id: TypeId, adapter: Arc<dyn PersistentAdapter>) {
        self.adapters.write().insert(id, adapter);
    }

    /// Remove the adapter for a type. Returns whether one was registered.
    pub fn unregister(&self, id: TypeId) -> bool {
        self.adapters.write().remove(&id).is_some()
    }

    /// The global adapter for a type.
    pub fn get(&self, id: TypeId) -> Option<Arc<dyn PersistentAdapter>> {
        self.adapters.read().get(&id).cloned()
    }

    /// Whether a global adapter is registered for a type.
    pub fn contains(&self, id: TypeId) -> bool {
        self.adapters.read().contains_key(&id)
    }

    /// The adapter to use for a value: the member's own adapter if it has
    /// one, otherwise the global adapter for its type.
    pub fn resolve(
        &self,
        id: Option<TypeId>,
        member: Option<&AdapterFactory>,
    ) -> Option<Arc<dyn PersistentAdapter>> {
        match member {
            Some(factory) => Some(factory()),
            None => id.and_then(|id| self.get(id)),
        }
    }
}
