//! Type resolution.
//!
//! Names in documents map to types through, in order:
//!
//! 1. the explicit name table (`register_named_type`),
//! 2. the primitive synonyms (`i32`, `bool`, `string`, ...),
//! 3. the default catalog (canonical names and registered names),
//! 4. auxiliary loaders, in registration order.
//!
//! A trailing `[]` on a name denotes the array of the named component.
//! Types map back to names through the name table, then the synonyms,
//! then the type's own name.

mod catalog;

pub use catalog::{canonical_name, Coercion, TypeCatalog, TypeInfo, TypeKind};

use crate::dynamic::TypeKey;
use crate::error::{PersistError, PersistResult};
use crate::scalar;
use parking_lot::{RwLock, RwLockWriteGuard};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Suffix marking an array type name.
pub const ARRAY_SUFFIX: &str = "[]";

/// A source of types consulted after the default catalog.
pub trait TypeLoader: Send + Sync {
    /// Type by document name.
    fn type_by_name(&self, name: &str) -> Option<Arc<TypeInfo>>;

    /// Type by id.
    fn type_by_id(&self, id: TypeId) -> Option<Arc<TypeInfo>>;

    /// Array type with the given component.
    fn array_of(&self, _component: TypeId) -> Option<Arc<TypeInfo>> {
        None
    }

    /// Conversion from runtime type `from` to slot type `to`.
    fn coercion(&self, _from: TypeId, _to: TypeId) -> Option<Coercion> {
        None
    }
}

impl TypeLoader for TypeCatalog {
    fn type_by_name(&self, name: &str) -> Option<Arc<TypeInfo>> {
        self.find(name)
    }

    fn type_by_id(&self, id: TypeId) -> Option<Arc<TypeInfo>> {
        self.get(id)
    }

    fn array_of(&self, component: TypeId) -> Option<Arc<TypeInfo>> {
        TypeCatalog::array_of(self, component)
    }

    fn coercion(&self, from: TypeId, to: TypeId) -> Option<Coercion> {
        TypeCatalog::coercion(self, from, to)
    }
}

/// Bidirectional map between explicit names and types.
///
/// Each name maps to one type and each type to one name; registering
/// either side again replaces the old pairing in both directions.
#[derive(Debug, Default)]
struct NameTable {
    by_name: HashMap<String, TypeId>,
    by_type: HashMap<TypeId, String>,
}

impl NameTable {
    fn insert(&mut self, id: TypeId, name: String) {
        if let Some(old_name) = self.by_type.insert(id, name.clone()) {
            self.by_name.remove(&old_name);
        }
        if let Some(old_id) = self.by_name.insert(name, id) {
            if old_id != id {
                self.by_type.remove(&old_id);
            }
        }
    }

    fn remove_type(&mut self, id: TypeId) -> Option<String> {
        let name = self.by_type.remove(&id)?;
        self.by_name.remove(&name);
        Some(name)
    }

    fn remove_name(&mut self, name: &str) -> Option<TypeId> {
        let id = self.by_name.remove(name)?;
        self.by_type.remove(&id);
        Some(id)
    }
}

/// All type knowledge of a persister.
pub struct TypeRegistry {
    catalog: RwLock<TypeCatalog>,
    names: RwLock<NameTable>,
    loaders: RwLock<Vec<Arc<dyn TypeLoader>>>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Creates a registry whose default catalog holds the built-in types.
    pub fn new() -> Self {
        Self {
            catalog: RwLock::new(TypeCatalog::with_builtins()),
            names: RwLock::new(NameTable::default()),
            loaders: RwLock::new(Vec::new()),
        }
    }

    /// Write access to the default catalog.
    pub fn catalog(&self) -> RwLockWriteGuard<'_, TypeCatalog> {
        self.catalog.write()
    }

    fn loaders(&self) -> Vec<Arc<dyn TypeLoader>> {
        self.loaders.read().clone()
    }

    /// Append an auxiliary loader.
    pub fn add_loader(&self, loader: Arc<dyn TypeLoader>) {
        self.loaders.write().push(loader);
    }

    /// Remove an auxiliary loader (by identity). Returns whether it was
    /// registered.
    pub fn remove_loader(&self, loader: &Arc<dyn TypeLoader>) -> bool {
        let mut loaders = self.loaders.write();
        let before = loaders.len();
        loaders.retain(|l| !Arc::ptr_eq(l, loader));
        loaders.len() != before
    }

    /// Type by id, from the default catalog or an auxiliary loader.
    pub fn info(&self, id: TypeId) -> Option<Arc<TypeInfo>> {
        if let Some(info) = self.catalog.read().get(id) {
            return Some(info);
        }
        self.loaders().iter().find_map(|l| l.type_by_id(id))
    }

    /// Array type for a component.
    pub fn array_of(&self, component: TypeId) -> Option<Arc<TypeInfo>> {
        if let Some(info) = self.catalog.read().array_of(component) {
            return Some(info);
        }
        self.loaders().iter().find_map(|l| l.array_of(component))
    }

    /// Conversion from runtime type `from` to slot type `to`.
    pub fn coercion(&self, from: TypeId, to: TypeId) -> Option<Coercion> {
        if let Some(coercion) = self.catalog.read().coercion(from, to) {
            return Some(coercion);
        }
        self.loaders().iter().find_map(|l| l.coercion(from, to))
    }

    /// Pair an explicit name with a type, replacing earlier pairings of
    /// either.
    pub fn set_name(&self, id: TypeId, name: &str) {
        self.names.write().insert(id, name.to_string());
    }

    /// Remove the explicit name of a type.
    pub fn remove_type_name(&self, id: TypeId) -> Option<String> {
        self.names.write().remove_type(id)
    }

    /// Remove an explicit name.
    pub fn remove_name(&self, name: &str) -> Option<TypeId> {
        self.names.write().remove_name(name)
    }

    /// Resolve a document name to a type.
    ///
    /// # Errors
    ///
    /// With `fail_hard`, an unresolvable name is a
    /// [`PersistError::TypeResolution`]; otherwise it yields `Ok(None)`.
    /// An array name whose component resolves but has no registered array
    /// type fails with [`PersistError::TypeResolution`] either way.
    pub fn resolve_type_from_name(
        &self,
        name: &str,
        fail_hard: bool,
    ) -> PersistResult<Option<Arc<TypeInfo>>> {
        if let Some(component) = name.strip_suffix(ARRAY_SUFFIX) {
            return match self.resolve_type_from_name(component, fail_hard)? {
                Some(component) => self
                    .array_of(component.key().id())
                    .map(Some)
                    .ok_or_else(|| PersistError::type_resolution(name)),
                None => Ok(None),
            };
        }

        if let Some(info) = self.lookup_name(name) {
            return Ok(Some(info));
        }

        if fail_hard {
            Err(PersistError::type_resolution(name))
        } else {
            debug!(name, "type name did not resolve");
            Ok(None)
        }
    }

    fn lookup_name(&self, name: &str) -> Option<Arc<TypeInfo>> {
        let aliased = self.names.read().by_name.get(name).copied();
        if let Some(id) = aliased {
            if let Some(info) = self.info(id) {
                return Some(info);
            }
        }
        if let Some(key) = scalar::synonym_type(name) {
            if let Some(info) = self.info(key.id()) {
                return Some(info);
            }
        }
        if let Some(info) = self.catalog.read().find(name) {
            return Some(info);
        }
        self.loaders().iter().find_map(|l| l.type_by_name(name))
    }

    /// The document name of a type.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::UnsupportedType`] for unknown types and for
    /// types without a deterministic name that were never given one.
    pub fn resolve_name_from_type(&self, key: TypeKey) -> PersistResult<String> {
        let id = key.id();
        if let Some(name) = self.names.read().by_type.get(&id) {
            return Ok(name.clone());
        }
        if let Some(name) = scalar::synonym_name(id) {
            return Ok(name.to_string());
        }
        let info = self.info(id).ok_or_else(|| {
            PersistError::unsupported_type(key.rust_name(), "type is not registered")
        })?;
        if let TypeKind::Array(codec) = info.kind() {
            let component = self.resolve_name_from_type(codec.component())?;
            return Ok(format!("{component}{ARRAY_SUFFIX}"));
        }
        info.name().map(str::to_string).ok_or_else(|| {
            PersistError::unsupported_type(
                key.rust_name(),
                "type has no deterministic name; register an explicit one",
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ObjectDescriptor, Persistable};

    #[derive(Default)]
    struct Widget;

    impl Persistable for Widget {
        fn descriptor() -> ObjectDescriptor {
            ObjectDescriptor::builder::<Widget>()
                .default_constructible()
                .build()
        }
    }

    #[derive(Default)]
    struct Gadget;

    impl Persistable for Gadget {
        fn descriptor() -> ObjectDescriptor {
            ObjectDescriptor::builder::<Gadget>()
                .default_constructible()
                .build()
        }
    }

    struct Generic<T>(T);

    fn registry_with_widget() -> TypeRegistry {
        let registry = TypeRegistry::new();
        registry.catalog().insert_object::<Widget>();
        registry
    }

    #[test]
    fn primitive_names_resolve_both_ways() {
        let registry = TypeRegistry::new();
        let info = registry.resolve_type_from_name("i32", true).unwrap().unwrap();
        assert_eq!(info.key(), TypeKey::of::<i32>());
        assert_eq!(
            registry.resolve_name_from_type(TypeKey::of::<String>()).unwrap(),
            "string"
        );
    }

    #[test]
    fn array_names() {
        let registry = TypeRegistry::new();
        assert_eq!(
            registry.resolve_name_from_type(TypeKey::of::<Vec<i32>>()).unwrap(),
            "i32[]"
        );
        let info = registry.resolve_type_from_name("string[]", true).unwrap().unwrap();
        assert_eq!(info.key(), TypeKey::of::<Vec<String>>());
    }

    #[test]
    fn array_of_unregistered_array_type_fails() {
        let registry = registry_with_widget();
        assert!(matches!(
            registry.resolve_type_from_name("widget[]", false),
            Ok(None)
        ));
        registry.set_name(TypeId::of::<Widget>(), "widget");
        assert!(matches!(
            registry.resolve_type_from_name("widget[]", false),
            Err(PersistError::TypeResolution { .. })
        ));
    }

    #[test]
    fn unknown_names() {
        let registry = TypeRegistry::new();
        assert!(registry.resolve_type_from_name("nope", false).unwrap().is_none());
        assert!(matches!(
            registry.resolve_type_from_name("nope", true),
            Err(PersistError::TypeResolution { .. })
        ));
    }

    #[test]
    fn explicit_names_take_precedence() {
        let registry = registry_with_widget();
        let canonical = registry
            .resolve_name_from_type(TypeKey::of::<Widget>())
            .unwrap();
        assert!(canonical.ends_with("-Widget"));

        registry.set_name(TypeId::of::<Widget>(), "widget");
        assert_eq!(
            registry.resolve_name_from_type(TypeKey::of::<Widget>()).unwrap(),
            "widget"
        );
        let info = registry.resolve_type_from_name("widget", true).unwrap().unwrap();
        assert_eq!(info.key(), TypeKey::of::<Widget>());

        // The canonical name still resolves.
        assert!(registry.resolve_type_from_name(&canonical, true).is_ok());

        registry.remove_type_name(TypeId::of::<Widget>());
        assert!(matches!(
            registry.resolve_type_from_name("widget", true),
            Err(PersistError::TypeResolution { .. })
        ));
    }

    #[test]
    fn renaming_evicts_stale_pairings() {
        let registry = registry_with_widget();
        registry.catalog().insert_object::<Gadget>();

        registry.set_name(TypeId::of::<Widget>(), "thing");
        registry.set_name(TypeId::of::<Widget>(), "widget");
        assert!(registry.resolve_type_from_name("thing", false).unwrap().is_none());

        // Taking over a name unpairs its previous type.
        registry.set_name(TypeId::of::<Gadget>(), "widget");
        let info = registry.resolve_type_from_name("widget", true).unwrap().unwrap();
        assert_eq!(info.key(), TypeKey::of::<Gadget>());
        assert!(registry
            .resolve_name_from_type(TypeKey::of::<Widget>())
            .unwrap()
            .ends_with("-Widget"));

        assert_eq!(registry.remove_name("widget"), Some(TypeId::of::<Gadget>()));
        assert_eq!(registry.remove_name("widget"), None);
    }

    #[test]
    fn unnameable_types_need_a_name() {
        let registry = TypeRegistry::new();
        registry.catalog().insert(TypeInfo::new(
            TypeKey::of::<Generic<u8>>(),
            TypeKind::Opaque,
        ));
        assert!(matches!(
            registry.resolve_name_from_type(TypeKey::of::<Generic<u8>>()),
            Err(PersistError::UnsupportedType { .. })
        ));
        registry.set_name(TypeId::of::<Generic<u8>>(), "GenericByte");
        assert_eq!(
            registry
                .resolve_name_from_type(TypeKey::of::<Generic<u8>>())
                .unwrap(),
            "GenericByte"
        );
        let _ = Generic(0_u8).0;
    }

    #[test]
    fn unregistered_types_are_unsupported() {
        let registry = TypeRegistry::new();
        assert!(matches!(
            registry.resolve_name_from_type(TypeKey::of::<Widget>()),
            Err(PersistError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn loaders_are_consulted_in_order() {
        let registry = TypeRegistry::new();

        let mut first = TypeCatalog::new();
        first.insert(TypeInfo::object::<Widget>().with_name("shared"));
        let mut second = TypeCatalog::new();
        second.insert(TypeInfo::object::<Gadget>().with_name("shared"));

        let first: Arc<dyn TypeLoader> = Arc::new(first);
        let second: Arc<dyn TypeLoader> = Arc::new(second);
        registry.add_loader(first.clone());
        registry.add_loader(second.clone());

        let info = registry.resolve_type_from_name("shared", true).unwrap().unwrap();
        assert_eq!(info.key(), TypeKey::of::<Widget>());
        assert!(registry.info(TypeId::of::<Gadget>()).is_some());

        assert!(registry.remove_loader(&first));
        assert!(!registry.remove_loader(&first));
        let info = registry.resolve_type_from_name("shared", true).unwrap().unwrap();
        assert_eq!(info.key(), TypeKey::of::<Gadget>());
    }

    #[test]
    fn default_catalog_beats_loaders() {
        let registry = registry_with_widget();
        let mut shadow = TypeCatalog::new();
        shadow.insert(TypeInfo::object::<Gadget>().with_name("i32"));
        registry.add_loader(Arc::new(shadow));

        let info = registry.resolve_type_from_name("i32", true).unwrap().unwrap();
        assert_eq!(info.key(), TypeKey::of::<i32>());
    }
}
