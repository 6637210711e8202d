//! Arrays and collections.
//!
//! An *array* is a `Vec<T>` of one statically known component type. Its
//! entries are persisted with that component as their declared type.
//!
//! A *collection* is a heterogeneous container of dynamic values that
//! implements [`DynCollection`]. Its entries have no declared type, so each
//! entry carries its own `type` attribute.

use crate::dynamic::{AsAny, Dynamic, TypeKey};
use crate::error::{PersistError, PersistResult};
use std::any::{type_name, Any};
use std::collections::{LinkedList, VecDeque};
use std::fmt;

/// A container of dynamically typed entries that the engine can iterate and
/// append to.
pub trait DynCollection: AsAny {
    /// Entries in iteration order; `None` for null entries.
    fn items(&self) -> Vec<Option<&dyn Any>>;

    /// Append an entry.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::InvalidConfiguration`] if the collection
    /// cannot hold the entry (for example a null in a non-nullable list).
    fn push_item(&mut self, item: Option<Dynamic>) -> PersistResult<()>;

    /// Number of entries.
    fn len(&self) -> usize {
        self.items().len()
    }

    /// Whether the collection has no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn require_entry(item: Option<Dynamic>, collection: &str) -> PersistResult<Dynamic> {
    item.ok_or_else(|| {
        PersistError::invalid_configuration(format!("{collection} cannot hold null entries"))
    })
}

fn borrow_entry(entry: &Dynamic) -> Option<&dyn Any> {
    let value: &dyn Any = &**entry;
    Some(value)
}

impl DynCollection for Vec<Dynamic> {
    fn items(&self) -> Vec<Option<&dyn Any>> {
        self.iter().map(borrow_entry).collect()
    }

    fn push_item(&mut self, item: Option<Dynamic>) -> PersistResult<()> {
        self.push(require_entry(item, "Vec")?);
        Ok(())
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }
}

impl DynCollection for VecDeque<Dynamic> {
    fn items(&self) -> Vec<Option<&dyn Any>> {
        self.iter().map(borrow_entry).collect()
    }

    fn push_item(&mut self, item: Option<Dynamic>) -> PersistResult<()> {
        self.push_back(require_entry(item, "VecDeque")?);
        Ok(())
    }

    fn len(&self) -> usize {
        VecDeque::len(self)
    }
}

impl DynCollection for LinkedList<Dynamic> {
    fn items(&self) -> Vec<Option<&dyn Any>> {
        self.iter().map(borrow_entry).collect()
    }

    fn push_item(&mut self, item: Option<Dynamic>) -> PersistResult<()> {
        self.push_back(require_entry(item, "LinkedList")?);
        Ok(())
    }

    fn len(&self) -> usize {
        LinkedList::len(self)
    }
}

impl DynCollection for Vec<Option<Dynamic>> {
    fn items(&self) -> Vec<Option<&dyn Any>> {
        self.iter()
            .map(|entry| entry.as_ref().and_then(borrow_entry))
            .collect()
    }

    fn push_item(&mut self, item: Option<Dynamic>) -> PersistResult<()> {
        self.push(item);
        Ok(())
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }
}

/// Type-erased operations on one collection type.
#[derive(Clone, Copy)]
pub struct CollectionCodec {
    construct: Option<fn() -> Box<dyn DynCollection>>,
    view: for<'a> fn(&'a dyn Any) -> Option<&'a dyn DynCollection>,
}

impl CollectionCodec {
    /// Codec for a concrete, default-constructible collection.
    pub fn of<C: DynCollection + Default>() -> Self {
        Self {
            construct: Some(new_collection::<C>),
            view: view_collection::<C>,
        }
    }

    /// Codec for the abstract collection slot `Box<dyn DynCollection>`.
    ///
    /// It cannot be constructed; documents must name a concrete collection.
    pub fn abstract_slot() -> Self {
        Self {
            construct: None,
            view: view_boxed_collection,
        }
    }

    /// Whether the collection has no constructor.
    pub fn is_abstract(&self) -> bool {
        self.construct.is_none()
    }

    /// A new empty collection, if constructible.
    pub fn construct(&self) -> Option<Box<dyn DynCollection>> {
        self.construct.map(|construct| construct())
    }

    /// View a value of the collection type.
    pub fn view<'a>(&self, value: &'a dyn Any) -> Option<&'a dyn DynCollection> {
        (self.view)(value)
    }
}

impl fmt::Debug for CollectionCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionCodec")
            .field("abstract", &self.is_abstract())
            .finish()
    }
}

fn new_collection<C: DynCollection + Default>() -> Box<dyn DynCollection> {
    Box::new(C::default())
}

fn view_collection<C: DynCollection>(value: &dyn Any) -> Option<&dyn DynCollection> {
    value
        .downcast_ref::<C>()
        .map(|collection| collection as &dyn DynCollection)
}

fn view_boxed_collection(value: &dyn Any) -> Option<&dyn DynCollection> {
    value
        .downcast_ref::<Box<dyn DynCollection>>()
        .map(|collection| &**collection)
}

/// Type-erased operations on one array type `Vec<T>`.
#[derive(Clone, Copy)]
pub struct ArrayCodec {
    component: TypeKey,
    items: for<'a> fn(&'a dyn Any) -> Option<Vec<&'a dyn Any>>,
    build: fn(Vec<Option<Dynamic>>) -> PersistResult<Dynamic>,
}

impl ArrayCodec {
    /// Codec for `Vec<T>`.
    pub fn of<T: Any + Send + Sync>() -> Self {
        Self {
            component: TypeKey::of::<T>(),
            items: array_items::<T>,
            build: build_array::<T>,
        }
    }

    /// Codec for `Vec<Box<B>>`, an array of a polymorphic slot type.
    pub fn of_boxed<B: ?Sized + AsAny>() -> Self {
        Self {
            component: TypeKey::of::<Box<B>>(),
            items: boxed_array_items::<B>,
            build: build_array::<Box<B>>,
        }
    }

    /// Declared type of the entries.
    pub fn component(&self) -> TypeKey {
        self.component
    }

    /// Borrow the entries of an array value.
    pub fn items<'a>(&self, value: &'a dyn Any) -> Option<Vec<&'a dyn Any>> {
        (self.items)(value)
    }

    /// Build an array value from loaded entries.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::TypeMismatch`] if an entry is null or not of
    /// the component type.
    pub fn build(&self, entries: Vec<Option<Dynamic>>) -> PersistResult<Dynamic> {
        (self.build)(entries)
    }
}

impl fmt::Debug for ArrayCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayCodec")
            .field("component", &self.component)
            .finish()
    }
}

fn array_items<T: Any>(value: &dyn Any) -> Option<Vec<&dyn Any>> {
    value
        .downcast_ref::<Vec<T>>()
        .map(|array| array.iter().map(|item| item as &dyn Any).collect())
}

fn boxed_array_items<B: ?Sized + AsAny>(value: &dyn Any) -> Option<Vec<&dyn Any>> {
    value
        .downcast_ref::<Vec<Box<B>>>()
        .map(|array| array.iter().map(|item| AsAny::as_any(&**item)).collect())
}

fn build_array<T: Any + Send + Sync>(entries: Vec<Option<Dynamic>>) -> PersistResult<Dynamic> {
    let array = entries
        .into_iter()
        .map(|entry| {
            let entry =
                entry.ok_or_else(|| PersistError::type_mismatch(type_name::<T>(), "null"))?;
            entry
                .downcast::<T>()
                .map(|value| *value)
                .map_err(|_| PersistError::type_mismatch(type_name::<T>(), "array entry of another type"))
        })
        .collect::<PersistResult<Vec<T>>>()?;
    Ok(Box::new(array))
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Animal: AsAny {}

    struct Dog;
    impl Animal for Dog {}

    #[test]
    fn vec_rejects_null_entries() {
        let mut list: Vec<Dynamic> = Vec::new();
        list.push_item(Some(Box::new(1_i32))).unwrap();
        assert!(matches!(
            list.push_item(None),
            Err(PersistError::InvalidConfiguration { .. })
        ));
        assert_eq!(DynCollection::len(&list), 1);
    }

    #[test]
    fn nullable_vec_keeps_nulls() {
        let mut list: Vec<Option<Dynamic>> = Vec::new();
        list.push_item(Some(Box::new("a".to_string()))).unwrap();
        list.push_item(None).unwrap();

        let items = list.items();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_some_and(|v| v.is::<String>()));
        assert!(items[1].is_none());
    }

    #[test]
    fn deque_and_linked_list_preserve_order() {
        let mut deque: VecDeque<Dynamic> = VecDeque::new();
        let mut linked: LinkedList<Dynamic> = LinkedList::new();
        for i in 0..3_i32 {
            deque.push_item(Some(Box::new(i))).unwrap();
            linked.push_item(Some(Box::new(i))).unwrap();
        }
        let read = |items: Vec<Option<&dyn Any>>| -> Vec<i32> {
            items
                .into_iter()
                .filter_map(|v| v.and_then(|v| v.downcast_ref::<i32>()).copied())
                .collect()
        };
        assert_eq!(read(deque.items()), vec![0, 1, 2]);
        assert_eq!(read(linked.items()), vec![0, 1, 2]);
    }

    #[test]
    fn collection_codec_constructs_and_views() {
        let codec = CollectionCodec::of::<VecDeque<Dynamic>>();
        assert!(!codec.is_abstract());

        let mut collection = codec.construct().unwrap();
        collection.push_item(Some(Box::new(5_u8))).unwrap();
        let value = AsAny::into_any(collection);
        assert_eq!(codec.view(&*value).map(|c| c.len()), Some(1));
        assert!(codec.view(&5_u8).is_none());
    }

    #[test]
    fn abstract_collection_has_no_constructor() {
        let codec = CollectionCodec::abstract_slot();
        assert!(codec.is_abstract());
        assert!(codec.construct().is_none());

        let boxed: Box<dyn DynCollection> = Box::new(Vec::<Dynamic>::new());
        assert!(codec.view(&boxed).is_some());
    }

    #[test]
    fn array_codec_items_and_build() {
        let codec = ArrayCodec::of::<i32>();
        assert_eq!(codec.component(), TypeKey::of::<i32>());

        let value = vec![1_i32, 2, 3];
        let items = codec.items(&value).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[2].downcast_ref::<i32>(), Some(&3));

        let built = codec
            .build(vec![Some(Box::new(4_i32) as Dynamic), Some(Box::new(5_i32) as Dynamic)])
            .unwrap();
        assert_eq!(built.downcast_ref::<Vec<i32>>(), Some(&vec![4, 5]));
    }

    #[test]
    fn array_build_rejects_null_and_foreign_entries() {
        let codec = ArrayCodec::of::<i32>();
        assert!(matches!(
            codec.build(vec![None]),
            Err(PersistError::TypeMismatch { .. })
        ));
        assert!(matches!(
            codec.build(vec![Some(Box::new("x".to_string()) as Dynamic)]),
            Err(PersistError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn boxed_array_exposes_concrete_entries() {
        let codec = ArrayCodec::of_boxed::<dyn Animal>();
        assert_eq!(codec.component(), TypeKey::of::<Box<dyn Animal>>());

        let value: Vec<Box<dyn Animal>> = vec![Box::new(Dog)];
        let items = codec.items(&value).unwrap();
        assert!(items[0].is::<Dog>());

        let entry: Box<dyn Animal> = Box::new(Dog);
        let built = codec.build(vec![Some(Box::new(entry) as Dynamic)]).unwrap();
        assert_eq!(
            built.downcast_ref::<Vec<Box<dyn Animal>>>().map(Vec::len),
            Some(1)
        );
    }
}
