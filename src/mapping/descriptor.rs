//! Explicit entity descriptions.
//!
//! An entity registers its scalar fields, keys and navigation fields once through an
//! [`EntityBuilder`]. The builder captures plain accessor functions, so mapping never
//! needs runtime reflection:
//!
//! ```rust
//! use sql_mapper::prelude::*;
//!
//! #[derive(Debug, Default, Clone, PartialEq)]
//! struct Role {
//!     id: i64,
//!     name: String,
//! }
//!
//! impl Entity for Role {
//!     fn describe(builder: EntityBuilder<Self>) -> EntityBuilder<Self> {
//!         builder
//!             .field("Id", |r| &r.id, |r| &mut r.id)
//!             .field("Name", |r| &r.name, |r| &mut r.name)
//!             .primary_key("Id")
//!     }
//! }
//! ```

use std::any::{Any, TypeId};

use crate::conversion::{ConversionError, FromRowValue, ToRowValue};
use crate::error::SqlMapperError;
use crate::types::RowValues;

use super::registry;

/// A record type that rows can be mapped into.
pub trait Entity: Default + Clone + Send + Sync + 'static {
    /// Register the fields and relationships of this type.
    fn describe(builder: EntityBuilder<Self>) -> EntityBuilder<Self>;

    /// Name used in diagnostics and errors.
    #[must_use]
    fn entity_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

/// Relationship category of a navigation field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    OneToMany,
    ManyToOne,
    ManyToMany,
    OneToOne,
}

impl RelationKind {
    /// Whether the field holds a list rather than a single related entity.
    #[must_use]
    pub fn is_collection(self) -> bool {
        matches!(self, RelationKind::OneToMany | RelationKind::ManyToMany)
    }
}

type Assign<T> = Box<dyn Fn(&mut T, &RowValues) -> Result<(), ConversionError> + Send + Sync>;
type Read<T> = Box<dyn Fn(&T) -> RowValues + Send + Sync>;
type AssignRelated<T> = Box<dyn Fn(&mut T, Box<dyn Any>) -> bool + Send + Sync>;

/// A scalar field backed by one column.
pub struct FieldDescriptor<T> {
    name: String,
    column: String,
    type_name: &'static str,
    required: bool,
    nullable: bool,
    assign: Assign<T>,
    read: Read<T>,
}

impl<T> FieldDescriptor<T> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column this field is populated from.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Rust type of the field, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Whether the field type can hold SQL NULL.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub(crate) fn assign(&self, entity: &mut T, value: &RowValues) -> Result<(), ConversionError> {
        (self.assign)(entity, value)
    }

    /// Current value of the field as a column value.
    pub fn read(&self, entity: &T) -> RowValues {
        (self.read)(entity)
    }
}

impl<T> std::fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("column", &self.column)
            .field("type_name", &self.type_name)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

/// A field holding a related entity or a list of them.
pub struct NavigationField<T> {
    name: String,
    kind: RelationKind,
    target: TypeId,
    target_name: &'static str,
    join: Option<(TypeId, &'static str)>,
    assign: AssignRelated<T>,
}

impl<T> NavigationField<T> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    #[must_use]
    pub fn target_name(&self) -> &'static str {
        self.target_name
    }

    /// Join entity of a many-to-many field.
    #[must_use]
    pub fn join_name(&self) -> Option<&'static str> {
        self.join.map(|(_, name)| name)
    }

    pub(crate) fn target(&self) -> TypeId {
        self.target
    }

    pub(crate) fn join_type(&self) -> Option<TypeId> {
        self.join.map(|(id, _)| id)
    }

    pub(crate) fn holds_list_of<C: 'static>(&self) -> bool {
        self.kind.is_collection() && self.target == TypeId::of::<C>()
    }

    pub(crate) fn holds_one_of<C: 'static>(&self) -> bool {
        !self.kind.is_collection() && self.target == TypeId::of::<C>()
    }

    /// Store a `Vec<C>` (collection kinds) or an `Option<C>` (single kinds).
    ///
    /// Returns `false` when the payload does not match the field's declared type.
    pub(crate) fn assign<V: Any>(&self, entity: &mut T, value: V) -> bool {
        (self.assign)(entity, Box::new(value))
    }
}

impl<T> std::fmt::Debug for NavigationField<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationField")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("target", &self.target_name)
            .field("join", &self.join_name())
            .finish_non_exhaustive()
    }
}

/// Foreign key declaration: a scalar field referencing another entity type.
#[derive(Debug)]
pub(crate) struct ForeignKeyDecl {
    pub(crate) field: String,
    pub(crate) target: TypeId,
    pub(crate) target_name: &'static str,
    pub(crate) resolve: fn() -> Result<(), SqlMapperError>,
}

/// Collects the declarations of one entity type.
///
/// Declarations are validated when the registry builds metadata from them, so the
/// builder itself never fails.
pub struct EntityBuilder<T> {
    pub(crate) fields: Vec<FieldDescriptor<T>>,
    pub(crate) navigations: Vec<NavigationField<T>>,
    pub(crate) primary_keys: Vec<String>,
    pub(crate) foreign_keys: Vec<ForeignKeyDecl>,
    pub(crate) problems: Vec<String>,
}

impl<T: Entity> EntityBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            fields: Vec::new(),
            navigations: Vec::new(),
            primary_keys: Vec::new(),
            foreign_keys: Vec::new(),
            problems: Vec::new(),
        }
    }

    /// Register a scalar field populated from the column of the same name.
    #[must_use]
    pub fn field<F>(self, name: &str, get: fn(&T) -> &F, get_mut: fn(&mut T) -> &mut F) -> Self
    where
        F: FromRowValue + ToRowValue + 'static,
    {
        self.field_as(name, name, get, get_mut)
    }

    /// Register a scalar field populated from a differently named column.
    #[must_use]
    pub fn field_as<F>(
        mut self,
        name: &str,
        column: &str,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> Self
    where
        F: FromRowValue + ToRowValue + 'static,
    {
        self.fields.push(FieldDescriptor {
            name: name.to_string(),
            column: column.to_string(),
            type_name: std::any::type_name::<F>(),
            required: false,
            nullable: F::from_null().is_some(),
            assign: Box::new(move |entity, value| {
                *get_mut(entity) = F::from_row_value(value)?;
                Ok(())
            }),
            read: Box::new(move |entity| get(entity).to_row_value()),
        });
        self
    }

    /// Mark the most recently registered field as required: a NULL (or missing)
    /// column fails the row unless the field type can hold NULL.
    #[must_use]
    pub fn required(mut self) -> Self {
        match self.fields.last_mut() {
            Some(field) => field.required = true,
            None => self
                .problems
                .push("`required()` called before any field was registered".to_string()),
        }
        self
    }

    /// Declare the primary key field.
    #[must_use]
    pub fn primary_key(mut self, field: &str) -> Self {
        self.primary_keys.push(field.to_string());
        self
    }

    /// Declare `field` as a foreign key referencing `R`.
    #[must_use]
    pub fn foreign_key<R: Entity>(mut self, field: &str) -> Self {
        self.foreign_keys.push(ForeignKeyDecl {
            field: field.to_string(),
            target: TypeId::of::<R>(),
            target_name: R::entity_name(),
            resolve: registry::resolve_reference::<R>,
        });
        self
    }

    /// Declare a list of children `C` that reference this entity.
    #[must_use]
    pub fn one_to_many<C: Entity>(self, name: &str, get_mut: fn(&mut T) -> &mut Vec<C>) -> Self {
        self.navigation::<C, Vec<C>>(name, RelationKind::OneToMany, None, get_mut)
    }

    /// Declare the single parent `P` this entity references.
    #[must_use]
    pub fn many_to_one<P: Entity>(
        self,
        name: &str,
        get_mut: fn(&mut T) -> &mut Option<P>,
    ) -> Self {
        self.navigation::<P, Option<P>>(name, RelationKind::ManyToOne, None, get_mut)
    }

    /// Declare a list of `R` related through join entity `J`.
    #[must_use]
    pub fn many_to_many<R: Entity, J: Entity>(
        self,
        name: &str,
        get_mut: fn(&mut T) -> &mut Vec<R>,
    ) -> Self {
        let join = Some((TypeId::of::<J>(), J::entity_name()));
        self.navigation::<R, Vec<R>>(name, RelationKind::ManyToMany, join, get_mut)
    }

    /// Declare a single related `C`.
    #[must_use]
    pub fn one_to_one<C: Entity>(self, name: &str, get_mut: fn(&mut T) -> &mut Option<C>) -> Self {
        self.navigation::<C, Option<C>>(name, RelationKind::OneToOne, None, get_mut)
    }

    fn navigation<C: Entity, V: Any>(
        mut self,
        name: &str,
        kind: RelationKind,
        join: Option<(TypeId, &'static str)>,
        get_mut: fn(&mut T) -> &mut V,
    ) -> Self {
        self.navigations.push(NavigationField {
            name: name.to_string(),
            kind,
            target: TypeId::of::<C>(),
            target_name: C::entity_name(),
            join,
            assign: Box::new(move |entity, payload| match payload.downcast::<V>() {
                Ok(value) => {
                    *get_mut(entity) = *value;
                    true
                }
                Err(_) => false,
            }),
        });
        self
    }
}
