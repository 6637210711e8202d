//! Object descriptors.
//!
//! A persistable type describes itself once through [`Persistable::descriptor`]:
//! how to construct an empty instance, which fields and accessors are
//! persistent, and which setters write accessor values back. The engine
//! only ever works through the descriptor.
//!
//! ```
//! use xmlgraph_core::{ObjectDescriptor, Persistable, Persistent};
//!
//! #[derive(Default)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! impl Persistable for Point {
//!     fn descriptor() -> ObjectDescriptor {
//!         ObjectDescriptor::builder::<Point>()
//!             .default_constructible()
//!             .field(Persistent::member("x").attribute(true), |p| &p.x, |p, v| p.x = v)
//!             .field(Persistent::member("y").attribute(true), |p| &p.y, |p, v| p.y = v)
//!             .build()
//!     }
//! }
//!
//! let descriptor = Point::descriptor();
//! let names: Vec<_> = descriptor.members().iter().map(|m| m.name()).collect();
//! assert_eq!(names, ["x", "y"]);
//! ```

use crate::dynamic::{take, take_optional, AsAny, Dynamic, MemberValue, TypeKey};
use crate::member::{
    make_getter, make_setter, owner_mut, owner_ref, Getter, Member, MemberKind, NamedSetter,
    Persistent, Setter,
};
use crate::naming;
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A type whose instances the engine can save and load member by member.
pub trait Persistable: Any + Send + Sync + Sized {
    /// Describe the persistent members of the type.
    fn descriptor() -> ObjectDescriptor;
}

type Constructor = Arc<dyn Fn() -> Dynamic + Send + Sync>;

/// The persistent shape of one object type.
#[derive(Clone)]
pub struct ObjectDescriptor {
    key: TypeKey,
    constructor: Option<Constructor>,
    members: Vec<Member>,
    setters: Vec<NamedSetter>,
}

impl ObjectDescriptor {
    /// Start describing `T`.
    pub fn builder<T: Any + Send + Sync>() -> ObjectBuilder<T> {
        ObjectBuilder::new()
    }

    /// The described type.
    pub fn type_key(&self) -> TypeKey {
        self.key
    }

    /// Persistent members in persistence order: accessors, then fields; a
    /// type's own members before those of the types it extends.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Member by XML name.
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name() == name)
    }

    /// Whether an empty instance can be created.
    pub fn is_constructible(&self) -> bool {
        self.constructor.is_some()
    }

    /// A new empty instance, if the type has a constructor.
    pub fn construct(&self) -> Option<Dynamic> {
        self.constructor.as_ref().map(|construct| construct())
    }
}

impl fmt::Debug for ObjectDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectDescriptor")
            .field("type", &self.key)
            .field("constructible", &self.is_constructible())
            .field("members", &self.members)
            .finish()
    }
}

/// Builder for an [`ObjectDescriptor`].
///
/// Getters and setters are plain functions or non-capturing closures.
pub struct ObjectBuilder<T> {
    constructor: Option<Constructor>,
    accessors: Vec<Member>,
    fields: Vec<Member>,
    setters: Vec<NamedSetter>,
    inherited_accessors: Vec<Member>,
    inherited_fields: Vec<Member>,
    inherited_setters: Vec<NamedSetter>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> ObjectBuilder<T> {
    fn new() -> Self {
        Self {
            constructor: None,
            accessors: Vec::new(),
            fields: Vec::new(),
            setters: Vec::new(),
            inherited_accessors: Vec::new(),
            inherited_fields: Vec::new(),
            inherited_setters: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Sets the no-argument constructor used when loading.
    #[must_use]
    pub fn constructor(mut self, construct: fn() -> T) -> Self {
        self.constructor = Some(Arc::new(move || Box::new(construct()) as Dynamic));
        self
    }

    /// Uses `T::default` as the constructor.
    #[must_use]
    pub fn default_constructible(self) -> Self
    where
        T: Default,
    {
        self.constructor(T::default)
    }

    fn push_field(
        &mut self,
        config: Persistent,
        declared: Option<TypeKey>,
        getter: Getter,
        setter: Setter,
    ) {
        let name = config.name.clone().unwrap_or_else(|| config.member.clone());
        self.fields.push(Member {
            kind: MemberKind::Field,
            name,
            declared,
            config,
            owner: type_name::<T>(),
            getter,
            setter: Some(setter),
            setter_candidates: Vec::new(),
        });
    }

    fn push_accessor(
        &mut self,
        config: Persistent,
        declared: TypeKey,
        getter: Getter,
    ) {
        let returns_bool = declared.id() == TypeId::of::<bool>();
        let derived = naming::member_name_from_accessor(&config.member, returns_bool);
        let setter_candidates = match &config.setter {
            Some(explicit) => vec![explicit.clone()],
            None => naming::setter_candidates(&derived),
        };
        let name = config.name.clone().unwrap_or(derived);
        self.accessors.push(Member {
            kind: MemberKind::Accessor,
            name,
            declared: Some(declared),
            config,
            owner: type_name::<T>(),
            getter,
            setter: None,
            setter_candidates,
        });
    }

    /// A field of a fixed type that is never null.
    #[must_use]
    pub fn field<V: Any + Send + Sync>(
        mut self,
        config: impl Into<Persistent>,
        get: fn(&T) -> &V,
        set: fn(&mut T, V),
    ) -> Self {
        let getter = make_getter(move |object: &dyn Any| {
            let owner = owner_ref::<T>(object)?;
            Ok(MemberValue::Borrowed(get(owner) as &dyn Any))
        });
        let setter = make_setter(move |object: &mut dyn Any, value: Option<Dynamic>| {
            let owner = owner_mut::<T>(object)?;
            set(owner, take::<V>(value)?);
            Ok(())
        });
        self.push_field(config.into(), Some(TypeKey::of::<V>()), getter, setter);
        self
    }

    /// A field of a fixed type that may be null.
    #[must_use]
    pub fn optional_field<V: Any + Send + Sync>(
        mut self,
        config: impl Into<Persistent>,
        get: fn(&T) -> Option<&V>,
        set: fn(&mut T, Option<V>),
    ) -> Self {
        let getter = make_getter(move |object: &dyn Any| {
            let owner = owner_ref::<T>(object)?;
            Ok(get(owner).map_or(MemberValue::Null, |v| MemberValue::Borrowed(v as &dyn Any)))
        });
        let setter = make_setter(move |object: &mut dyn Any, value: Option<Dynamic>| {
            let owner = owner_mut::<T>(object)?;
            set(owner, take_optional::<V>(value)?);
            Ok(())
        });
        self.push_field(config.into(), Some(TypeKey::of::<V>()), getter, setter);
        self
    }

    /// A polymorphic field `Box<B>`, for a trait `B: AsAny`.
    ///
    /// The declared type is `Box<B>`; register it with
    /// [`crate::Persister::register_abstract`] and register each
    /// implementation with [`crate::Persister::register_subtype`].
    #[must_use]
    pub fn boxed_field<B: ?Sized + AsAny>(
        mut self,
        config: impl Into<Persistent>,
        get: fn(&T) -> &B,
        set: fn(&mut T, Box<B>),
    ) -> Self {
        let getter = make_getter(move |object: &dyn Any| {
            let owner = owner_ref::<T>(object)?;
            Ok(MemberValue::Borrowed(AsAny::as_any(get(owner))))
        });
        let setter = make_setter(move |object: &mut dyn Any, value: Option<Dynamic>| {
            let owner = owner_mut::<T>(object)?;
            set(owner, take::<Box<B>>(value)?);
            Ok(())
        });
        self.push_field(config.into(), Some(TypeKey::of::<Box<B>>()), getter, setter);
        self
    }

    /// A polymorphic field `Option<Box<B>>`.
    #[must_use]
    pub fn optional_boxed_field<B: ?Sized + AsAny>(
        mut self,
        config: impl Into<Persistent>,
        get: fn(&T) -> Option<&B>,
        set: fn(&mut T, Option<Box<B>>),
    ) -> Self {
        let getter = make_getter(move |object: &dyn Any| {
            let owner = owner_ref::<T>(object)?;
            Ok(get(owner).map_or(MemberValue::Null, |v| {
                MemberValue::Borrowed(AsAny::as_any(v))
            }))
        });
        let setter = make_setter(move |object: &mut dyn Any, value: Option<Dynamic>| {
            let owner = owner_mut::<T>(object)?;
            set(owner, take_optional::<Box<B>>(value)?);
            Ok(())
        });
        self.push_field(config.into(), Some(TypeKey::of::<Box<B>>()), getter, setter);
        self
    }

    /// A field with no declared type. Every value carries its own type
    /// attribute.
    #[must_use]
    pub fn dynamic_field(
        mut self,
        config: impl Into<Persistent>,
        get: fn(&T) -> Option<&dyn Any>,
        set: fn(&mut T, Option<Dynamic>),
    ) -> Self {
        let getter = make_getter(move |object: &dyn Any| {
            let owner = owner_ref::<T>(object)?;
            Ok(get(owner).map_or(MemberValue::Null, MemberValue::Borrowed))
        });
        let setter = make_setter(move |object: &mut dyn Any, value: Option<Dynamic>| {
            let owner = owner_mut::<T>(object)?;
            set(owner, value);
            Ok(())
        });
        self.push_field(config.into(), None, getter, setter);
        self
    }

    /// A computed member read through an accessor. It is written back
    /// through the setter found by name (see [`ObjectBuilder::setter`]).
    #[must_use]
    pub fn accessor<V: Any + Send + Sync>(
        mut self,
        config: impl Into<Persistent>,
        get: fn(&T) -> V,
    ) -> Self {
        let getter = make_getter(move |object: &dyn Any| {
            let owner = owner_ref::<T>(object)?;
            Ok(MemberValue::Owned(Box::new(get(owner))))
        });
        self.push_accessor(config.into(), TypeKey::of::<V>(), getter);
        self
    }

    /// A computed member that may be null.
    #[must_use]
    pub fn optional_accessor<V: Any + Send + Sync>(
        mut self,
        config: impl Into<Persistent>,
        get: fn(&T) -> Option<V>,
    ) -> Self {
        let getter = make_getter(move |object: &dyn Any| {
            let owner = owner_ref::<T>(object)?;
            Ok(match get(owner) {
                Some(v) => MemberValue::Owned(Box::new(v)),
                None => MemberValue::Null,
            })
        });
        self.push_accessor(config.into(), TypeKey::of::<V>(), getter);
        self
    }

    /// A named single-argument setter. Accessors find it by name and by
    /// exact parameter type.
    #[must_use]
    pub fn setter<V: Any + Send + Sync>(mut self, name: &str, set: fn(&mut T, V)) -> Self {
        self.setters.push(NamedSetter {
            name: name.to_string(),
            param: TypeKey::of::<V>(),
            set: make_setter(move |object: &mut dyn Any, value: Option<Dynamic>| {
                let owner = owner_mut::<T>(object)?;
                set(owner, take::<V>(value)?);
                Ok(())
            }),
        });
        self
    }

    /// A named setter that accepts null.
    #[must_use]
    pub fn optional_setter<V: Any + Send + Sync>(
        mut self,
        name: &str,
        set: fn(&mut T, Option<V>),
    ) -> Self {
        self.setters.push(NamedSetter {
            name: name.to_string(),
            param: TypeKey::of::<V>(),
            set: make_setter(move |object: &mut dyn Any, value: Option<Dynamic>| {
                let owner = owner_mut::<T>(object)?;
                set(owner, take_optional::<V>(value)?);
                Ok(())
            }),
        });
        self
    }

    /// Inherit the persistent members and setters of `B`, which `T` embeds.
    ///
    /// Inherited members come after `T`'s own. Inherited accessors look for
    /// their setter among `T`'s setters first.
    #[must_use]
    pub fn extends<B: Persistable>(
        mut self,
        upcast: fn(&T) -> &B,
        upcast_mut: fn(&mut T) -> &mut B,
    ) -> Self {
        let base = B::descriptor();
        for member in base.members {
            let member = member.project(upcast, upcast_mut);
            match member.kind() {
                MemberKind::Accessor => self.inherited_accessors.push(member),
                MemberKind::Field => self.inherited_fields.push(member),
            }
        }
        self.inherited_setters
            .extend(base.setters.into_iter().map(|s| s.project(upcast_mut)));
        self
    }

    /// Finish the descriptor, resolving accessor setters.
    pub fn build(self) -> ObjectDescriptor {
        let setters: Vec<NamedSetter> = self
            .setters
            .into_iter()
            .chain(self.inherited_setters)
            .collect();

        let mut members: Vec<Member> = self
            .accessors
            .into_iter()
            .chain(self.inherited_accessors)
            .map(|mut accessor| {
                accessor.resolve_setter(&setters);
                accessor
            })
            .collect();
        members.extend(self.fields);
        members.extend(self.inherited_fields);

        ObjectDescriptor {
            key: TypeKey::of::<T>(),
            constructor: self.constructor,
            members,
            setters,
        }
    }
}
