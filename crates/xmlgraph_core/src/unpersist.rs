//! Loading: elements to object graph.

use crate::adapter::{AdapterRegistry, PersistentAdapter};
use crate::config::PersisterConfig;
use crate::dynamic::{dynamic_id, AsAny, Dynamic, TypeKey};
use crate::error::{PersistError, PersistResult};
use crate::member::Persistent;
use crate::persister::{Persister, NULL_ATTRIBUTE, TYPE_ATTRIBUTE};
use crate::registry::{TypeInfo, TypeKind, TypeRegistry, ARRAY_SUFFIX};
use std::any::TypeId;
use std::sync::Arc;
use tracing::{debug, trace};
use url::Url;
use xmlgraph_tree::Element;

/// State of one load call.
pub(crate) struct Loader<'a> {
    types: &'a TypeRegistry,
    adapters: &'a AdapterRegistry,
    config: PersisterConfig,
    context: Option<&'a Url>,
    persister: &'a Persister,
}

impl<'a> Loader<'a> {
    pub(crate) fn new(persister: &'a Persister, context: Option<&'a Url>) -> Self {
        Self {
            types: persister.types(),
            adapters: persister.adapters(),
            config: persister.config(),
            context,
            persister,
        }
    }

    /// Rebuild the object an element describes; the element name is the
    /// type name.
    pub(crate) fn load_object(&self, element: &Element) -> PersistResult<Dynamic> {
        let info = self
            .types
            .resolve_type_from_name(element.name(), true)?
            .ok_or_else(|| PersistError::type_resolution(element.name()))?;
        let id = info.key().id();
        if !self.persister.is_persistable(id) {
            return Err(PersistError::not_persistable(info.display_name()));
        }
        debug!(element = element.name(), "loading object");

        if let Some(adapter) = self.adapters.get(id) {
            return adapter.from_xml(element, self.context);
        }

        let descriptor = info.descriptor().ok_or_else(|| {
            PersistError::construction(info.display_name(), "abstract types cannot be instantiated")
        })?;
        let mut object = descriptor.construct().ok_or_else(|| {
            PersistError::construction(info.display_name(), "type has no constructor")
        })?;

        for member in descriptor.members() {
            member.check_setter()?;
            match self.unpersist_value(0, element, member.name(), member.declared(), member.config()) {
                Ok(value) => {
                    let value = self.coerce(value, member.declared());
                    member.set(&mut *object, value)?;
                }
                Err(e) if e.is_missing() && self.config.ignore_missing => {
                    debug!(member = member.name(), "member missing, keeping default");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(object)
    }

    /// Convert a loaded value to the declared slot type when a conversion
    /// is registered; otherwise return it unchanged.
    pub(crate) fn coerce(&self, value: Option<Dynamic>, declared: Option<TypeKey>) -> Option<Dynamic> {
        let (value, declared) = match (value, declared) {
            (Some(value), Some(declared)) => (value, declared),
            (value, _) => return value,
        };
        let runtime = dynamic_id(&value);
        if runtime == declared.id() {
            return Some(value);
        }
        match self.types.coercion(runtime, declared.id()) {
            Some(coercion) => Some(coercion(value).unwrap_or_else(|unchanged| unchanged)),
            None => Some(value),
        }
    }

    /// Read the `index`-th value named `name` from `parent`.
    ///
    /// `Ok(None)` is a null value.
    pub(crate) fn unpersist_value(
        &self,
        index: usize,
        parent: &Element,
        name: &str,
        declared: Option<TypeKey>,
        config: &Persistent,
    ) -> PersistResult<Option<Dynamic>> {
        trace!(name, index, "loading value");
        let element = parent.child_element_named(index, name);
        let attribute = parent.attribute(name);
        if element.is_none() && attribute.is_none() {
            return Err(PersistError::missing(name));
        }

        let mut info = declared.and_then(|d| self.types.info(d.id()));
        if let Some(element) = element {
            if element
                .attribute(NULL_ATTRIBUTE)
                .is_some_and(|v| v.eq_ignore_ascii_case("true"))
            {
                return Ok(None);
            }
            if let Some(type_name) = element.attribute(TYPE_ATTRIBUTE).filter(|t| !t.is_empty()) {
                info = self.resolve_type_attribute(type_name, element.name())?;
            }
        }

        let mut adapter = self.member_adapter(info.as_deref(), config);
        if info.is_none() && adapter.is_none() {
            let first = element.and_then(Element::first_child_element).ok_or_else(|| {
                PersistError::persistence(format!("cannot determine the type of {name}"))
            })?;
            let nested = self
                .types
                .resolve_type_from_name(first.name(), true)?
                .ok_or_else(|| PersistError::type_resolution(first.name()))?;
            if !self.persister.is_persistable(nested.key().id()) {
                return Err(PersistError::not_persistable(nested.display_name()));
            }
            adapter = self.member_adapter(Some(&*nested), config);
            info = Some(nested);
        }

        if let Some(info) = info.as_deref() {
            match info.kind() {
                TypeKind::Array(codec) => {
                    let element = element.ok_or_else(|| PersistError::missing(name))?;
                    let entry_name = self.entry_name(config);
                    let component = codec.component();
                    let count = element.count_child_elements_named(&entry_name);
                    let mut entries = Vec::with_capacity(count);
                    for i in 0..count {
                        let entry = self.unpersist_value(i, element, &entry_name, Some(component), config)?;
                        entries.push(self.coerce(entry, Some(component)));
                    }
                    return codec.build(entries).map(Some);
                }
                TypeKind::Collection(codec) => {
                    let element = element.ok_or_else(|| PersistError::missing(name))?;
                    let mut collection = codec.construct().ok_or_else(|| {
                        PersistError::invalid_configuration(format!(
                            "collection type of {name} not specified"
                        ))
                    })?;
                    let entry_name = self.entry_name(config);
                    let count = element.count_child_elements_named(&entry_name);
                    for i in 0..count {
                        let entry = self.unpersist_value(i, element, &entry_name, None, config)?;
                        collection.push_item(entry)?;
                    }
                    return Ok(Some(AsAny::into_any(collection)));
                }
                _ => {}
            }
        }

        if let Some(element) = element {
            if let Some(adapter) = adapter {
                return adapter.from_xml(element, self.context).map(Some);
            }
            if let Some(child) = element.first_child_element() {
                return self.load_object(child).map(Some);
            }
        }

        let text = match element {
            Some(element) => element.text().unwrap_or_default(),
            None => attribute.unwrap_or_default().to_string(),
        };
        let info = info.ok_or_else(|| {
            PersistError::unsupported_type(name, "value has no type")
        })?;
        let codec = info.scalar_codec().ok_or_else(|| {
            PersistError::unsupported_type(info.display_name(), "type is not string-instantiable")
        })?;
        codec
            .parse_in_context(&text, self.context)
            .map(Some)
            .map_err(|message| PersistError::format(text.as_str(), info.display_name(), message))
    }

    /// Resolve a `type` attribute, falling back to the element name; a
    /// trailing `[]` on the attribute applies to the fallback as well.
    fn resolve_type_attribute(
        &self,
        type_name: &str,
        element_name: &str,
    ) -> PersistResult<Option<Arc<TypeInfo>>> {
        let mut base = type_name;
        let mut depth = 0;
        while let Some(stripped) = base.strip_suffix(ARRAY_SUFFIX) {
            base = stripped;
            depth += 1;
        }

        let resolved = match self.types.resolve_type_from_name(base, false)? {
            Some(info) => Some(info),
            None => self.types.resolve_type_from_name(element_name, false)?,
        };
        let Some(mut info) = resolved else {
            debug!(type_name, "type attribute did not resolve");
            return Ok(None);
        };
        for _ in 0..depth {
            info = self
                .types
                .array_of(info.key().id())
                .ok_or_else(|| PersistError::type_resolution(type_name))?;
        }
        Ok(Some(info))
    }

    fn member_adapter(
        &self,
        info: Option<&TypeInfo>,
        config: &Persistent,
    ) -> Option<Arc<dyn PersistentAdapter>> {
        let id: Option<TypeId> = info.map(|i| i.key().id());
        self.adapters.resolve(id, config.adapter.as_ref())
    }

    fn entry_name(&self, config: &Persistent) -> String {
        config
            .element_name
            .clone()
            .unwrap_or_else(|| self.config.default_element_name.clone())
    }
}
