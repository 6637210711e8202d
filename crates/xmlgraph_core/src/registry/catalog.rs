//! Type catalog: the set of types a loader knows about.

use crate::collection::{ArrayCodec, CollectionCodec, DynCollection};
use crate::descriptor::{ObjectDescriptor, Persistable};
use crate::dynamic::{AsAny, Dynamic, TypeKey};
use crate::naming;
use crate::scalar::{self, ScalarCodec};
use std::any::{Any, TypeId};
use std::collections::{HashMap, LinkedList, VecDeque};
use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::Arc;
use tracing::trace;
use url::Url;
use uuid::Uuid;

/// Converts a loaded value to the declared type of its slot, handing the
/// value back unchanged if it is not of the expected runtime type.
pub type Coercion = Arc<dyn Fn(Dynamic) -> Result<Dynamic, Dynamic> + Send + Sync>;

/// What the engine can do with values of a type.
#[derive(Clone, Debug)]
pub enum TypeKind {
    /// String-instantiable leaf.
    Scalar(ScalarCodec),
    /// Persisted member by member.
    Object(Arc<ObjectDescriptor>),
    /// A polymorphic slot type (`Box<dyn Trait>`). Persistable, never
    /// constructed.
    Abstract,
    /// `Vec<T>` of a fixed component type.
    Array(ArrayCodec),
    /// Heterogeneous container.
    Collection(CollectionCodec),
    /// Known only so that it can be named; values go through an adapter.
    Opaque,
}

/// A registered type.
#[derive(Clone, Debug)]
pub struct TypeInfo {
    key: TypeKey,
    name: Option<String>,
    kind: TypeKind,
}

impl TypeInfo {
    /// Creates a type entry with the canonical name of `key`.
    pub fn new(key: TypeKey, kind: TypeKind) -> Self {
        Self {
            key,
            name: canonical_name(key),
            kind,
        }
    }

    /// Overrides the type name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Entry for a persistable object type.
    pub fn object<T: Persistable>() -> Self {
        Self::new(
            TypeKey::of::<T>(),
            TypeKind::Object(Arc::new(T::descriptor())),
        )
    }

    /// Entry for a scalar.
    pub fn scalar(codec: ScalarCodec) -> Self {
        Self::new(codec.key(), TypeKind::Scalar(codec))
    }

    /// Entry for an array type. Arrays are named after their component.
    pub fn array(key: TypeKey, codec: ArrayCodec) -> Self {
        Self {
            key,
            name: None,
            kind: TypeKind::Array(codec),
        }
    }

    /// The type.
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// The name written to documents, if the type has one of its own.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// What the engine can do with the type.
    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// Object or abstract slot type.
    pub fn is_persistable(&self) -> bool {
        matches!(self.kind, TypeKind::Object(_) | TypeKind::Abstract)
    }

    /// The object descriptor, for object types.
    pub fn descriptor(&self) -> Option<&ObjectDescriptor> {
        match &self.kind {
            TypeKind::Object(descriptor) => Some(&**descriptor),
            _ => None,
        }
    }

    /// The scalar codec, for scalar types.
    pub fn scalar_codec(&self) -> Option<&ScalarCodec> {
        match &self.kind {
            TypeKind::Scalar(codec) => Some(codec),
            _ => None,
        }
    }

    /// A readable name for diagnostics.
    pub fn display_name(&self) -> &str {
        self.name().unwrap_or(self.key.rust_name())
    }
}

/// The name a type gets without explicit registration: the primitive
/// synonym, or the Rust path with `::` written as `-`.
///
/// `None` for types whose Rust name is not a plain path (generic
/// instantiations, references, tuples, trait objects, closures).
pub fn canonical_name(key: TypeKey) -> Option<String> {
    scalar::synonym_name(key.id())
        .map(str::to_string)
        .or_else(|| naming::escape_type_path(key.rust_name()))
}

/// A set of types indexed by id and by name, with the array and
/// coercion tables that go with them.
#[derive(Default)]
pub struct TypeCatalog {
    types: HashMap<TypeId, Arc<TypeInfo>>,
    names: HashMap<String, TypeId>,
    arrays: HashMap<TypeId, TypeId>,
    coercions: HashMap<(TypeId, TypeId), Coercion>,
}

impl TypeCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog holding the built-in scalars, their arrays and the
    /// standard collections.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        for codec in scalar::builtin_codecs() {
            catalog.insert_scalar(codec);
        }

        catalog.insert_array::<bool>();
        catalog.insert_array::<char>();
        catalog.insert_array::<i8>();
        catalog.insert_array::<i16>();
        catalog.insert_array::<i32>();
        catalog.insert_array::<i64>();
        catalog.insert_array::<u8>();
        catalog.insert_array::<u16>();
        catalog.insert_array::<u32>();
        catalog.insert_array::<u64>();
        catalog.insert_array::<f32>();
        catalog.insert_array::<f64>();
        catalog.insert_array::<String>();
        catalog.insert_array::<Uuid>();
        catalog.insert_array::<Url>();

        catalog.insert(
            TypeInfo::new(
                TypeKey::of::<Box<dyn DynCollection>>(),
                TypeKind::Collection(CollectionCodec::abstract_slot()),
            )
            .with_name("Collection"),
        );
        catalog.insert_collection::<Vec<Dynamic>>("Vec");
        catalog.insert_collection::<VecDeque<Dynamic>>("VecDeque");
        catalog.insert_collection::<LinkedList<Dynamic>>("LinkedList");
        catalog.insert_collection::<Vec<Option<Dynamic>>>("NullableVec");
        catalog
    }

    /// Add or replace a type.
    pub fn insert(&mut self, info: TypeInfo) {
        let id = info.key().id();
        if let Some(previous) = self.remove(id) {
            trace!(type_name = previous.display_name(), "replacing type");
        }
        if let Some(name) = info.name() {
            self.names.insert(name.to_string(), id);
        }
        self.names.insert(info.key().rust_name().to_string(), id);
        if let TypeKind::Array(codec) = info.kind() {
            self.arrays.insert(codec.component().id(), id);
        }
        self.types.insert(id, Arc::new(info));
    }

    /// Remove a type. Coercions involving it are kept.
    pub fn remove(&mut self, id: TypeId) -> Option<Arc<TypeInfo>> {
        let info = self.types.remove(&id)?;
        self.names.retain(|_, v| *v != id);
        if let TypeKind::Array(codec) = info.kind() {
            self.arrays.remove(&codec.component().id());
        }
        Some(info)
    }

    /// Add a persistable object type.
    pub fn insert_object<T: Persistable>(&mut self) {
        self.insert(TypeInfo::object::<T>());
    }

    /// Add a scalar type.
    pub fn insert_scalar(&mut self, codec: ScalarCodec) {
        self.insert(TypeInfo::scalar(codec));
    }

    /// Add a `Display + FromStr` type as a scalar.
    pub fn insert_display_scalar<T>(&mut self)
    where
        T: FromStr + Display + Any + Send + Sync,
        T::Err: Display,
    {
        self.insert_scalar(ScalarCodec::of::<T>());
    }

    /// Add the array type `Vec<T>`.
    pub fn insert_array<T: Any + Send + Sync>(&mut self) {
        self.insert(TypeInfo::array(
            TypeKey::of::<Vec<T>>(),
            ArrayCodec::of::<T>(),
        ));
    }

    /// Add the array type `Vec<Box<B>>`.
    pub fn insert_boxed_array<B: ?Sized + AsAny>(&mut self) {
        self.insert(TypeInfo::array(
            TypeKey::of::<Vec<Box<B>>>(),
            ArrayCodec::of_boxed::<B>(),
        ));
    }

    /// Add a collection type under `name`, coercible to
    /// `Box<dyn DynCollection>`.
    pub fn insert_collection<C: DynCollection + Default>(&mut self, name: &str) {
        self.insert(
            TypeInfo::new(TypeKey::of::<C>(), TypeKind::Collection(CollectionCodec::of::<C>()))
                .with_name(name),
        );
        self.insert_upcast::<C, dyn DynCollection>(box_collection::<C>);
    }

    /// Add the polymorphic slot type `Box<B>` under `name`.
    pub fn insert_abstract<B: ?Sized + Send + Sync + 'static>(&mut self, name: &str) {
        self.insert(TypeInfo::new(TypeKey::of::<Box<B>>(), TypeKind::Abstract).with_name(name));
    }

    /// Add a type that is only ever handled by an adapter.
    pub fn insert_opaque(&mut self, key: TypeKey) {
        if !self.types.contains_key(&key.id()) {
            self.insert(TypeInfo::new(key, TypeKind::Opaque));
        }
    }

    /// Make values of `S` loadable into `Box<B>` slots.
    pub fn insert_upcast<S, B>(&mut self, upcast: fn(S) -> Box<B>)
    where
        S: Any + Send + Sync,
        B: ?Sized + Send + Sync + 'static,
    {
        let coercion: Coercion = Arc::new(move |value: Dynamic| match value.downcast::<S>() {
            Ok(value) => Ok(Box::new(upcast(*value)) as Dynamic),
            Err(value) => Err(value),
        });
        self.coercions
            .insert((TypeId::of::<S>(), TypeId::of::<Box<B>>()), coercion);
    }

    /// Type by id.
    pub fn get(&self, id: TypeId) -> Option<Arc<TypeInfo>> {
        self.types.get(&id).cloned()
    }

    /// Type by name: the registered/canonical name, or the Rust path.
    pub fn find(&self, name: &str) -> Option<Arc<TypeInfo>> {
        let id = match self.names.get(name) {
            Some(id) => *id,
            None => *self.names.get(&naming::unescape_type_name(name))?,
        };
        self.get(id)
    }

    /// The array type with the given component.
    pub fn array_of(&self, component: TypeId) -> Option<Arc<TypeInfo>> {
        self.arrays.get(&component).and_then(|id| self.get(*id))
    }

    /// Conversion from runtime type `from` to slot type `to`.
    pub fn coercion(&self, from: TypeId, to: TypeId) -> Option<Coercion> {
        self.coercions.get(&(from, to)).cloned()
    }

    /// Number of types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the catalog holds no types.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl fmt::Debug for TypeCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCatalog")
            .field("types", &self.types.len())
            .field("coercions", &self.coercions.len())
            .finish()
    }
}

fn box_collection<C: DynCollection>(collection: C) -> Box<dyn DynCollection> {
    Box::new(collection)
}
