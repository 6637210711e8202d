//! The persister façade: configuration, registration and the public
//! save/load entry points.

use crate::adapter::{erase, Adapter, AdapterRegistry};
use crate::collection::DynCollection;
use crate::config::PersisterConfig;
use crate::descriptor::Persistable;
use crate::dynamic::{AsAny, Dynamic, TypeKey};
use crate::error::{PersistError, PersistResult};
use crate::naming;
use crate::persist::Saver;
use crate::registry::{TypeInfo, TypeLoader, TypeRegistry};
use crate::scalar::ScalarCodec;
use crate::unpersist::Loader;
use parking_lot::RwLock;
use std::any::{type_name, Any, TypeId};
use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;
use url::Url;
use xmlgraph_tree::Element;

/// Attribute marking an element whose value is null.
pub const NULL_ATTRIBUTE: &str = "null";

/// Attribute naming the runtime type of a value.
pub const TYPE_ATTRIBUTE: &str = "type";

/// Saves object graphs into XML elements and loads them back.
///
/// A persister holds all type knowledge (object descriptors, scalars,
/// arrays, collections, explicit names, adapters, auxiliary loaders) and a
/// configuration. All methods take `&self`; registries and configuration
/// are internally synchronized, so a persister can be shared between
/// threads. Each save or load uses the configuration as it was when the
/// call started.
///
/// Object graphs must be acyclic: a cycle recurses without bound.
pub struct Persister {
    types: TypeRegistry,
    adapters: AdapterRegistry,
    config: RwLock<PersisterConfig>,
}

impl Default for Persister {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Persister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Persister")
            .field("config", &*self.config.read())
            .finish_non_exhaustive()
    }
}

impl Persister {
    /// Creates a persister with the default configuration.
    pub fn new() -> Self {
        Self::with_config(PersisterConfig::default())
    }

    /// Creates a persister with the given configuration.
    pub fn with_config(config: PersisterConfig) -> Self {
        Self {
            types: TypeRegistry::new(),
            adapters: AdapterRegistry::new(),
            config: RwLock::new(config),
        }
    }

    // ---- configuration ----

    /// A snapshot of the configuration.
    pub fn config(&self) -> PersisterConfig {
        self.config.read().clone()
    }

    /// Replaces the configuration.
    pub fn set_config(&self, config: PersisterConfig) {
        *self.config.write() = config;
    }

    /// Whether missing members are skipped on load.
    pub fn is_ignore_missing(&self) -> bool {
        self.config.read().ignore_missing
    }

    /// Sets whether missing members are skipped on load.
    pub fn set_ignore_missing(&self, value: bool) {
        self.config.write().ignore_missing = value;
    }

    /// Whether null members are omitted on save.
    pub fn is_ignore_nulls(&self) -> bool {
        self.config.read().ignore_nulls
    }

    /// Sets whether null members are omitted on save.
    pub fn set_ignore_nulls(&self, value: bool) {
        self.config.write().ignore_nulls = value;
    }

    // ---- type registration ----

    /// Register a persistable object type under its canonical name.
    pub fn register<T: Persistable>(&self) {
        debug!(type_name = type_name::<T>(), "registering persistable type");
        self.types.catalog().insert_object::<T>();
    }

    /// Register a `Display + FromStr` type as a string-instantiable leaf.
    pub fn register_scalar<T>(&self)
    where
        T: FromStr + Display + Any + Send + Sync,
        T::Err: Display,
    {
        self.register_scalar_codec(ScalarCodec::of::<T>());
    }

    /// Register a leaf type with a custom codec.
    pub fn register_scalar_codec(&self, codec: ScalarCodec) {
        self.types.catalog().insert_scalar(codec);
    }

    /// Register the array type `Vec<T>`, named `<component>[]`.
    pub fn register_array<T: Any + Send + Sync>(&self) {
        self.types.catalog().insert_array::<T>();
    }

    /// Register the array type `Vec<Box<B>>` of a polymorphic slot type.
    pub fn register_boxed_array<B: ?Sized + AsAny>(&self) {
        self.types.catalog().insert_boxed_array::<B>();
    }

    /// Register a collection type under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::InvalidArgument`] if `name` is not a valid
    /// type name.
    pub fn register_collection<C: DynCollection + Default>(&self, name: &str) -> PersistResult<()> {
        validate_name(name)?;
        self.types.catalog().insert_collection::<C>(name);
        Ok(())
    }

    /// Register the polymorphic slot type `Box<B>` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::InvalidArgument`] if `name` is not a valid
    /// type name.
    pub fn register_abstract<B: ?Sized + Send + Sync + 'static>(&self, name: &str) -> PersistResult<()> {
        validate_name(name)?;
        self.types.catalog().insert_abstract::<B>(name);
        Ok(())
    }

    /// Declare that `S` fills `Box<B>` slots, converting with `upcast`.
    pub fn register_subtype<S, B>(&self, upcast: fn(S) -> Box<B>)
    where
        S: Any + Send + Sync,
        B: ?Sized + Send + Sync + 'static,
    {
        self.types.catalog().insert_upcast::<S, B>(upcast);
    }

    /// Register a fully built type entry.
    pub fn register_type(&self, info: TypeInfo) {
        self.types.catalog().insert(info);
    }

    // ---- explicit names ----

    /// Give `T` an explicit document name, replacing any earlier pairing of
    /// the name or the type.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::InvalidArgument`] if the name is not made of
    /// ASCII letters, digits and underscores, or if `T` is neither
    /// persistable nor adapter-covered.
    pub fn register_named_type<T: ?Sized + 'static>(&self, name: &str) -> PersistResult<()> {
        self.register_named_key(TypeKey::of::<T>(), name)
    }

    /// [`Persister::register_named_type`] for a runtime type key.
    ///
    /// # Errors
    ///
    /// As for [`Persister::register_named_type`].
    pub fn register_named_key(&self, key: TypeKey, name: &str) -> PersistResult<()> {
        validate_name(name)?;
        if !self.is_persistable(key.id()) {
            return Err(PersistError::invalid_argument(format!(
                "{} is not persistable and has no adapter",
                key.rust_name()
            )));
        }
        debug!(name, type_name = key.rust_name(), "registering type name");
        self.types.set_name(key.id(), name);
        Ok(())
    }

    /// Remove the explicit name of `T`. Returns the removed name.
    pub fn unregister_named_type<T: ?Sized + 'static>(&self) -> Option<String> {
        self.types.remove_type_name(TypeId::of::<T>())
    }

    /// Remove an explicit name. Returns whether it was registered.
    pub fn unregister_name(&self, name: &str) -> bool {
        self.types.remove_name(name).is_some()
    }

    // ---- adapters and loaders ----

    /// Use `adapter` for every value of type `T` that has no member adapter.
    pub fn register_adapter<T, A>(&self, adapter: A)
    where
        T: Any + Send + Sync,
        A: Adapter<T>,
    {
        debug!(type_name = type_name::<T>(), "registering adapter");
        self.adapters.register(TypeId::of::<T>(), erase::<T, A>(adapter));
        self.types.catalog().insert_opaque(TypeKey::of::<T>());
    }

    /// Remove the global adapter of `T`. Returns whether one was registered.
    pub fn unregister_adapter<T: Any>(&self) -> bool {
        self.adapters.unregister(TypeId::of::<T>())
    }

    /// Append an auxiliary type loader, consulted after the default catalog.
    pub fn register_loader(&self, loader: Arc<dyn TypeLoader>) {
        self.types.add_loader(loader);
    }

    /// Remove an auxiliary loader. Returns whether it was registered.
    pub fn unregister_loader(&self, loader: &Arc<dyn TypeLoader>) -> bool {
        self.types.remove_loader(loader)
    }

    // ---- resolution ----

    /// Resolve a document name to a type.
    ///
    /// # Errors
    ///
    /// With `fail_hard`, an unresolvable name is a
    /// [`PersistError::TypeResolution`]; otherwise it yields `Ok(None)`.
    pub fn resolve_type_from_name(&self, name: &str, fail_hard: bool) -> PersistResult<Option<TypeKey>> {
        Ok(self
            .types
            .resolve_type_from_name(name, fail_hard)?
            .map(|info| info.key()))
    }

    /// The document name of a type.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::UnsupportedType`] if the type is unknown or
    /// has no deterministic name.
    pub fn resolve_name_from_type(&self, key: TypeKey) -> PersistResult<String> {
        self.types.resolve_name_from_type(key)
    }

    /// The registered entry of a type.
    pub fn type_info(&self, key: TypeKey) -> Option<Arc<TypeInfo>> {
        self.types.info(key.id())
    }

    pub(crate) fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub(crate) fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    /// Whether a type can be the root of a saved subtree: it has a global
    /// adapter or is an object or abstract slot type.
    pub(crate) fn is_persistable(&self, id: TypeId) -> bool {
        self.adapters.contains(id) || self.types.info(id).is_some_and(|i| i.is_persistable())
    }

    // ---- save and load ----

    /// Append an element for `object` to `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::NotPersistable`] if `T` is neither
    /// persistable nor adapter-covered, or any error raised while
    /// persisting its members.
    pub fn save<T: Any>(&self, object: &T, parent: &mut Element, context: Option<&Url>) -> PersistResult<()> {
        let object: &dyn Any = object;
        self.save_dynamic(Some(object), parent, context)
    }

    /// [`Persister::save`] for a runtime-typed value.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::NullArgument`] if `object` is `None`, and
    /// otherwise as for [`Persister::save`].
    pub fn save_dynamic(
        &self,
        object: Option<&dyn Any>,
        parent: &mut Element,
        context: Option<&Url>,
    ) -> PersistResult<()> {
        let object = object.ok_or_else(|| PersistError::null_argument("object"))?;
        Saver::new(self, context).save_object(object, parent)
    }

    /// Rebuild the value `element` describes.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::TypeResolution`] if the element name does not
    /// resolve, [`PersistError::NotPersistable`] if the type is neither
    /// persistable nor adapter-covered, or any error raised while loading
    /// its members.
    pub fn load(&self, element: &Element, context: Option<&Url>) -> PersistResult<Dynamic> {
        Loader::new(self, context).load_object(element)
    }

    /// [`Persister::load`] for an optional element.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::NullArgument`] if `element` is `None`, and
    /// otherwise as for [`Persister::load`].
    pub fn load_dynamic(&self, element: Option<&Element>, context: Option<&Url>) -> PersistResult<Dynamic> {
        let element = element.ok_or_else(|| PersistError::null_argument("element"))?;
        self.load(element, context)
    }

    /// Load and take the result as a `T`, converting through a registered
    /// subtype relation when `T` is a slot type such as `Box<dyn Shape>`.
    ///
    /// # Errors
    ///
    /// As for [`Persister::load`], plus [`PersistError::TypeMismatch`] if
    /// the loaded value is not a `T`.
    pub fn load_as<T: Any>(&self, element: &Element, context: Option<&Url>) -> PersistResult<T> {
        let value = self.load(element, context)?;
        let loader = Loader::new(self, context);
        let value = loader.coerce(Some(value), Some(TypeKey::of::<T>()));
        match value {
            Some(value) => value
                .downcast::<T>()
                .map(|v| *v)
                .map_err(|_| PersistError::type_mismatch(type_name::<T>(), element.name())),
            None => Err(PersistError::type_mismatch(type_name::<T>(), "null")),
        }
    }
}

fn validate_name(name: &str) -> PersistResult<()> {
    if naming::is_valid_type_name(name) {
        Ok(())
    } else {
        Err(PersistError::invalid_argument(format!(
            "invalid type name {name:?}: only ASCII letters, digits and '_' are allowed"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ObjectDescriptor;

    #[derive(Default)]
    struct Widget;

    impl Persistable for Widget {
        fn descriptor() -> ObjectDescriptor {
            ObjectDescriptor::builder::<Widget>()
                .default_constructible()
                .build()
        }
    }

    #[test]
    fn config_accessors() {
        let persister = Persister::new();
        assert!(!persister.is_ignore_missing());
        persister.set_ignore_missing(true);
        persister.set_ignore_nulls(true);
        assert!(persister.is_ignore_missing());
        assert!(persister.is_ignore_nulls());

        persister.set_config(PersisterConfig::new().default_element_name("item"));
        assert!(!persister.is_ignore_nulls());
        assert_eq!(persister.config().default_element_name, "item");
    }

    #[test]
    fn named_type_validation() {
        let persister = Persister::new();
        persister.register::<Widget>();

        assert!(matches!(
            persister.register_named_type::<Widget>("bad-name"),
            Err(PersistError::InvalidArgument { .. })
        ));
        assert!(matches!(
            persister.register_named_type::<Widget>(""),
            Err(PersistError::InvalidArgument { .. })
        ));
        assert!(matches!(
            persister.register_named_type::<i32>("number"),
            Err(PersistError::InvalidArgument { .. })
        ));
        persister.register_named_type::<Widget>("widget").unwrap();
        assert_eq!(
            persister.resolve_name_from_type(TypeKey::of::<Widget>()).unwrap(),
            "widget"
        );
        assert_eq!(
            persister.unregister_named_type::<Widget>().as_deref(),
            Some("widget")
        );
        assert!(!persister.unregister_name("widget"));
    }

    #[test]
    fn null_arguments() {
        let persister = Persister::new();
        let mut parent = Element::new("root");
        assert!(matches!(
            persister.save_dynamic(None, &mut parent, None),
            Err(PersistError::NullArgument { what: "object" })
        ));
        assert!(matches!(
            persister.load_dynamic(None, None),
            Err(PersistError::NullArgument { what: "element" })
        ));
    }

    #[test]
    fn collection_and_abstract_names_are_validated() {
        let persister = Persister::new();
        assert!(persister.register_collection::<Vec<Dynamic>>("List").is_ok());
        assert!(persister.register_collection::<Vec<Dynamic>>("a list").is_err());
        assert!(persister.register_abstract::<dyn DynCollection>("Any-Collection").is_err());
    }

    #[test]
    fn persister_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Persister>();
    }
}
