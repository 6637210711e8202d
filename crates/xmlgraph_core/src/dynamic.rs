//! Runtime-typed values.
//!
//! The engine moves values around without knowing their static types.
//! An owned value is a [`Dynamic`]; a declared slot type is a [`TypeKey`].
//! Polymorphic slots are written as `Box<dyn Base>` where `trait Base: AsAny`,
//! which lets the engine reach the concrete value behind the trait object.

use crate::error::{PersistError, PersistResult};
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// An owned value of any runtime type.
pub type Dynamic = Box<dyn Any + Send + Sync>;

/// Identity of a Rust type, as used for declared slot types.
///
/// Equality and hashing use only the [`TypeId`]; the Rust type name is kept
/// for diagnostics.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    rust_name: &'static str,
}

impl TypeKey {
    /// The key for `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            rust_name: type_name::<T>(),
        }
    }

    /// The underlying type id.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The Rust type name (as reported by [`std::any::type_name`]).
    pub fn rust_name(&self) -> &'static str {
        self.rust_name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.rust_name)
    }
}

/// Access to the concrete value behind a trait object.
///
/// Implemented for every `Any + Send + Sync` type. Make it a supertrait of
/// any trait used as a polymorphic slot (`trait Shape: AsAny { .. }`).
///
/// Call it through the trait object itself (`(**boxed).as_any()`), not
/// through the `Box`, which would yield the box.
pub trait AsAny: Any + Send + Sync {
    /// Borrow the concrete value.
    fn as_any(&self) -> &dyn Any;

    /// Convert into an owned dynamic value of the concrete type.
    fn into_any(self: Box<Self>) -> Dynamic;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Dynamic {
        self
    }
}

/// The value produced by a member getter.
pub enum MemberValue<'a> {
    /// The member is null.
    Null,
    /// A value borrowed from the owner (fields).
    Borrowed(&'a dyn Any),
    /// A value computed by an accessor.
    Owned(Dynamic),
}

impl MemberValue<'_> {
    /// The value, or `None` for null.
    pub fn get(&self) -> Option<&dyn Any> {
        match self {
            MemberValue::Null => None,
            MemberValue::Borrowed(v) => Some(*v),
            MemberValue::Owned(v) => Some(&**v),
        }
    }

    /// Whether the member is null.
    pub fn is_null(&self) -> bool {
        matches!(self, MemberValue::Null)
    }
}

/// Runtime type id of a borrowed value.
pub(crate) fn runtime_id(value: &dyn Any) -> TypeId {
    value.type_id()
}

/// Runtime type id of an owned value.
pub(crate) fn dynamic_id(value: &Dynamic) -> TypeId {
    let inner: &dyn Any = &**value;
    inner.type_id()
}

/// Take a non-null value of type `V` out of a loaded slot value.
pub(crate) fn take<V: Any>(value: Option<Dynamic>) -> PersistResult<V> {
    match value {
        Some(v) => downcast(v),
        None => Err(PersistError::type_mismatch(type_name::<V>(), "null")),
    }
}

/// Take an optional value of type `V` out of a loaded slot value.
pub(crate) fn take_optional<V: Any>(value: Option<Dynamic>) -> PersistResult<Option<V>> {
    value.map(downcast).transpose()
}

pub(crate) fn downcast<V: Any>(value: Dynamic) -> PersistResult<V> {
    value
        .downcast::<V>()
        .map(|v| *v)
        .map_err(|_| PersistError::type_mismatch(type_name::<V>(), "a value of another type"))
}
