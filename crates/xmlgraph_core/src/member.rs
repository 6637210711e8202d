//! Persistent members and their configuration.

use crate::adapter::{self, Adapter, AdapterFactory};
use crate::dynamic::{Dynamic, MemberValue, TypeKey};
use crate::error::{PersistError, PersistResult};
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

/// Reads a member from an owner value.
pub(crate) type Getter =
    Arc<dyn for<'a> Fn(&'a dyn Any) -> PersistResult<MemberValue<'a>> + Send + Sync>;

/// Writes a loaded value into an owner value.
pub(crate) type Setter = Arc<dyn Fn(&mut dyn Any, Option<Dynamic>) -> PersistResult<()> + Send + Sync>;

pub(crate) fn make_getter<F>(f: F) -> Getter
where
    F: for<'a> Fn(&'a dyn Any) -> PersistResult<MemberValue<'a>> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn make_setter<F>(f: F) -> Setter
where
    F: Fn(&mut dyn Any, Option<Dynamic>) -> PersistResult<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn owner_ref<T: Any>(object: &dyn Any) -> PersistResult<&T> {
    object
        .downcast_ref::<T>()
        .ok_or_else(|| PersistError::type_mismatch(type_name::<T>(), "an owner of another type"))
}

pub(crate) fn owner_mut<T: Any>(object: &mut dyn Any) -> PersistResult<&mut T> {
    object
        .downcast_mut::<T>()
        .ok_or_else(|| PersistError::type_mismatch(type_name::<T>(), "an owner of another type"))
}

/// Persistence settings for one member.
///
/// Created from the Rust member name (`"radius".into()` or
/// [`Persistent::member`]) and refined with the builder methods.
#[derive(Clone, Default)]
pub struct Persistent {
    /// Name of the field or accessor in Rust.
    pub member: String,

    /// XML name override. Defaults to the field name, or to the accessor
    /// name with its `get`/`is` prefix removed.
    pub name: Option<String>,

    /// Element name for array/collection entries of this member.
    pub element_name: Option<String>,

    /// Write a scalar value as an attribute of the owner instead of a child
    /// element.
    pub attribute: bool,

    /// Explicit setter name for an accessor member.
    pub setter: Option<String>,

    /// Adapter used for this member only.
    pub adapter: Option<AdapterFactory>,
}

impl Persistent {
    /// Settings for the Rust member `member`.
    #[must_use]
    pub fn member(member: impl Into<String>) -> Self {
        Self {
            member: member.into(),
            ..Self::default()
        }
    }

    /// Sets the XML name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the element name for array/collection entries.
    #[must_use]
    pub fn element_name(mut self, name: impl Into<String>) -> Self {
        self.element_name = Some(name.into());
        self
    }

    /// Sets attribute-style persistence.
    #[must_use]
    pub fn attribute(mut self, value: bool) -> Self {
        self.attribute = value;
        self
    }

    /// Sets the setter name searched for an accessor member.
    #[must_use]
    pub fn setter(mut self, name: impl Into<String>) -> Self {
        self.setter = Some(name.into());
        self
    }

    /// Uses a fresh `A` for this member's values.
    #[must_use]
    pub fn adapter<T, A>(mut self) -> Self
    where
        T: Any + Send + Sync,
        A: Adapter<T> + Default,
    {
        self.adapter = Some(adapter::factory::<T, A>());
        self
    }
}

impl From<&str> for Persistent {
    fn from(member: &str) -> Self {
        Self::member(member)
    }
}

impl From<String> for Persistent {
    fn from(member: String) -> Self {
        Self::member(member)
    }
}

impl fmt::Debug for Persistent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Persistent")
            .field("member", &self.member)
            .field("name", &self.name)
            .field("element_name", &self.element_name)
            .field("attribute", &self.attribute)
            .field("setter", &self.setter)
            .field("adapter", &self.adapter.is_some())
            .finish()
    }
}

/// How a member is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// Read through an accessor, written through a separately declared setter.
    Accessor,
    /// Read and written directly.
    Field,
}

/// A named setter declared on an object type.
#[derive(Clone)]
pub(crate) struct NamedSetter {
    pub(crate) name: String,
    pub(crate) param: TypeKey,
    pub(crate) set: Setter,
}

impl NamedSetter {
    pub(crate) fn project<T: Any, B: Any>(self, upcast_mut: fn(&mut T) -> &mut B) -> Self {
        let base = self.set;
        Self {
            name: self.name,
            param: self.param,
            set: make_setter(move |object: &mut dyn Any, value: Option<Dynamic>| {
                let owner = owner_mut::<T>(object)?;
                base(upcast_mut(owner) as &mut dyn Any, value)
            }),
        }
    }
}

/// One persistent member of an object type.
#[derive(Clone)]
pub struct Member {
    pub(crate) kind: MemberKind,
    pub(crate) name: String,
    pub(crate) declared: Option<TypeKey>,
    pub(crate) config: Persistent,
    pub(crate) owner: &'static str,
    pub(crate) getter: Getter,
    pub(crate) setter: Option<Setter>,
    /// Setter names searched for an accessor, in order.
    pub(crate) setter_candidates: Vec<String>,
}

impl Member {
    /// Field or accessor.
    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    /// The XML name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared type; `None` for dynamic slots.
    pub fn declared(&self) -> Option<TypeKey> {
        self.declared
    }

    /// Persistence settings.
    pub fn config(&self) -> &Persistent {
        &self.config
    }

    /// Whether the member can be written on load.
    pub fn has_setter(&self) -> bool {
        self.setter.is_some()
    }

    /// Read the member from `object`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::TypeMismatch`] if `object` is not the owner type.
    pub fn get<'a>(&self, object: &'a dyn Any) -> PersistResult<MemberValue<'a>> {
        (self.getter)(object)
    }

    /// Fails with [`PersistError::SetterNotFound`] if the member cannot be
    /// written.
    pub fn check_setter(&self) -> PersistResult<()> {
        if self.has_setter() {
            Ok(())
        } else {
            Err(self.missing_setter())
        }
    }

    fn missing_setter(&self) -> PersistError {
        PersistError::setter_not_found(self.setter_candidates.join(" / "), self.owner)
    }

    /// Write a loaded value into `object`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::SetterNotFound`] if the member has no setter
    /// and [`PersistError::TypeMismatch`] if the value does not fit.
    pub fn set(&self, object: &mut dyn Any, value: Option<Dynamic>) -> PersistResult<()> {
        let setter = self.setter.as_ref().ok_or_else(|| self.missing_setter())?;
        setter(object, value)
    }

    /// Pick the first candidate setter whose name matches and whose
    /// parameter type is exactly the member's declared type.
    pub(crate) fn resolve_setter(&mut self, setters: &[NamedSetter]) {
        if self.kind != MemberKind::Accessor {
            return;
        }
        let declared = self.declared;
        self.setter = self.setter_candidates.iter().find_map(|candidate| {
            setters
                .iter()
                .find(|s| &s.name == candidate && Some(s.param) == declared)
                .map(|s| s.set.clone())
        });
    }

    /// Re-target a base type's member onto a type that embeds the base.
    pub(crate) fn project<T: Any, B: Any>(
        self,
        upcast: fn(&T) -> &B,
        upcast_mut: fn(&mut T) -> &mut B,
    ) -> Self {
        let base_getter = self.getter;
        let getter = make_getter(move |object: &dyn Any| {
            let owner = owner_ref::<T>(object)?;
            base_getter(upcast(owner) as &dyn Any)
        });
        let setter = self.setter.map(|base_setter| {
            make_setter(move |object: &mut dyn Any, value: Option<Dynamic>| {
                let owner = owner_mut::<T>(object)?;
                base_setter(upcast_mut(owner) as &mut dyn Any, value)
            })
        });
        Self {
            getter,
            setter,
            owner: type_name::<T>(),
            ..self
        }
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("declared", &self.declared)
            .field("has_setter", &self.has_setter())
            .finish()
    }
}
