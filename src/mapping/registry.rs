//! Process-wide cache of validated entity metadata.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock, RwLock};

use tracing::debug;

use super::descriptor::{Entity, EntityBuilder, FieldDescriptor, NavigationField, RelationKind};
use crate::error::SqlMapperError;

type MetadataCache = RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>;

static METADATA_CACHE: LazyLock<MetadataCache> = LazyLock::new(|| RwLock::new(HashMap::new()));

struct ForeignKey {
    field: usize,
    target_name: &'static str,
    resolve: fn() -> Result<(), SqlMapperError>,
}

/// Validated description of one entity type.
///
/// Built once per type and shared read-only afterwards.
pub struct EntityMetadata<T> {
    entity_name: &'static str,
    fields: Vec<FieldDescriptor<T>>,
    field_index: HashMap<String, usize>,
    navigations: Vec<NavigationField<T>>,
    navigation_index: HashMap<String, usize>,
    primary_key: Option<usize>,
    foreign_keys: HashMap<TypeId, ForeignKey>,
    relations: HashMap<(RelationKind, TypeId), usize>,
}

impl<T: Entity> EntityMetadata<T> {
    #[must_use]
    pub fn entity_name(&self) -> &'static str {
        self.entity_name
    }

    /// Scalar fields in registration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor<T>] {
        &self.fields
    }

    /// Look up a scalar field by name, ignoring case.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor<T>> {
        self.field_index
            .get(&name.to_lowercase())
            .map(|&i| &self.fields[i])
    }

    #[must_use]
    pub fn navigations(&self) -> &[NavigationField<T>] {
        &self.navigations
    }

    /// Look up a navigation field by name, ignoring case.
    #[must_use]
    pub fn navigation(&self, name: &str) -> Option<&NavigationField<T>> {
        self.navigation_index
            .get(&name.to_lowercase())
            .map(|&i| &self.navigations[i])
    }

    /// The primary key field.
    ///
    /// # Errors
    /// Returns `MetadataError` if no primary key was declared.
    pub fn primary_key(&self) -> Result<&FieldDescriptor<T>, SqlMapperError> {
        self.primary_key.map(|i| &self.fields[i]).ok_or_else(|| {
            SqlMapperError::metadata(format!(
                "no primary key declared on {}",
                self.entity_name
            ))
        })
    }

    /// The field declared as foreign key to `R`.
    ///
    /// # Errors
    /// Returns `MetadataError` if no such key was declared, or if `R` itself has no
    /// usable metadata.
    pub fn foreign_key_to<R: Entity>(&self) -> Result<&FieldDescriptor<T>, SqlMapperError> {
        let fk = self.foreign_keys.get(&TypeId::of::<R>()).ok_or_else(|| {
            SqlMapperError::metadata(format!(
                "no foreign key to {} declared on {}",
                R::entity_name(),
                self.entity_name
            ))
        })?;
        (fk.resolve)().map_err(|e| {
            SqlMapperError::metadata(format!(
                "foreign key {}.{} references {}, which cannot be resolved: {e}",
                self.entity_name, self.fields[fk.field].name(), fk.target_name
            ))
        })?;
        Ok(&self.fields[fk.field])
    }

    /// The navigation field of `kind` whose target is `R`.
    ///
    /// # Errors
    /// Returns `MetadataError` if no such relationship was declared.
    pub fn relation_to<R: Entity>(
        &self,
        kind: RelationKind,
    ) -> Result<&NavigationField<T>, SqlMapperError> {
        self.relations
            .get(&(kind, TypeId::of::<R>()))
            .map(|&i| &self.navigations[i])
            .ok_or_else(|| {
                SqlMapperError::metadata(format!(
                    "no {kind:?} relationship to {} declared on {}",
                    R::entity_name(),
                    self.entity_name
                ))
            })
    }
}

impl<T> std::fmt::Debug for EntityMetadata<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityMetadata")
            .field("entity_name", &self.entity_name)
            .field("fields", &self.fields)
            .field("navigations", &self.navigations)
            .finish_non_exhaustive()
    }
}

/// Metadata for `T`, built and validated on first use.
///
/// Concurrent first calls may each build the metadata; the first one stored wins and
/// every caller receives that instance. A failed build is not cached.
///
/// # Errors
/// Returns `MetadataError` if the declarations of `T` are inconsistent.
pub fn metadata<T: Entity>() -> Result<Arc<EntityMetadata<T>>, SqlMapperError> {
    let key = TypeId::of::<T>();
    let cached = {
        let cache = match METADATA_CACHE.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache.get(&key).cloned()
    };
    if let Some(found) = cached {
        return downcast::<T>(found);
    }

    let built: Arc<dyn Any + Send + Sync> = Arc::new(build::<T>()?);
    let stored = {
        let mut cache = match METADATA_CACHE.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(cache.entry(key).or_insert_with(|| Arc::clone(&built)))
    };
    if !Arc::ptr_eq(&stored, &built) {
        debug!(entity = T::entity_name(), "metadata already built by another caller");
    }
    downcast::<T>(stored)
}

/// Confirms that `R` has metadata and a primary key. Stored on foreign key
/// declarations and run lazily, so mutually referencing types never recurse.
pub(crate) fn resolve_reference<R: Entity>() -> Result<(), SqlMapperError> {
    metadata::<R>()?.primary_key().map(|_| ())
}

fn downcast<T: Entity>(
    found: Arc<dyn Any + Send + Sync>,
) -> Result<Arc<EntityMetadata<T>>, SqlMapperError> {
    found.downcast::<EntityMetadata<T>>().map_err(|_| {
        SqlMapperError::metadata(format!(
            "cached metadata for {} has an unexpected type",
            T::entity_name()
        ))
    })
}

fn build<T: Entity>() -> Result<EntityMetadata<T>, SqlMapperError> {
    let name = T::entity_name();
    let builder = T::describe(EntityBuilder::new());
    let EntityBuilder {
        fields,
        navigations,
        primary_keys,
        foreign_keys: fk_decls,
        problems,
    } = builder;

    if let Some(problem) = problems.first() {
        return Err(SqlMapperError::metadata(format!("{name}: {problem}")));
    }

    let mut field_index = HashMap::with_capacity(fields.len());
    for (i, field) in fields.iter().enumerate() {
        if field_index.insert(field.name().to_lowercase(), i).is_some() {
            return Err(SqlMapperError::metadata(format!(
                "{name}: field `{}` registered twice",
                field.name()
            )));
        }
    }

    let mut navigation_index = HashMap::with_capacity(navigations.len());
    let mut relations = HashMap::new();
    for (i, nav) in navigations.iter().enumerate() {
        let folded = nav.name().to_lowercase();
        if field_index.contains_key(&folded) {
            return Err(SqlMapperError::metadata(format!(
                "{name}: `{}` registered both as a field and as a navigation",
                nav.name()
            )));
        }
        if navigation_index.insert(folded, i).is_some() {
            return Err(SqlMapperError::metadata(format!(
                "{name}: navigation `{}` registered twice",
                nav.name()
            )));
        }
        if relations.insert((nav.kind(), nav.target()), i).is_some() {
            return Err(SqlMapperError::metadata(format!(
                "{name}: more than one {:?} relationship to {}",
                nav.kind(),
                nav.target_name()
            )));
        }
    }

    let primary_key = match primary_keys.as_slice() {
        [] => None,
        [pk] => Some(*field_index.get(&pk.to_lowercase()).ok_or_else(|| {
            SqlMapperError::metadata(format!("{name}: primary key `{pk}` is not a field"))
        })?),
        _ => {
            return Err(SqlMapperError::metadata(format!(
                "{name}: more than one primary key declared"
            )));
        }
    };

    let mut foreign_keys = HashMap::with_capacity(fk_decls.len());
    let mut fk_fields = HashSet::with_capacity(fk_decls.len());
    for decl in fk_decls {
        let Some(&field) = field_index.get(&decl.field.to_lowercase()) else {
            return Err(SqlMapperError::metadata(format!(
                "{name}: foreign key `{}` is not a field",
                decl.field
            )));
        };
        if !fk_fields.insert(field) {
            return Err(SqlMapperError::metadata(format!(
                "{name}: field `{}` is a foreign key to more than one type",
                decl.field
            )));
        }
        if foreign_keys.contains_key(&decl.target) {
            return Err(SqlMapperError::metadata(format!(
                "{name}: more than one foreign key to {}",
                decl.target_name
            )));
        }
        foreign_keys.insert(
            decl.target,
            ForeignKey {
                field,
                target_name: decl.target_name,
                resolve: decl.resolve,
            },
        );
    }

    debug!(
        entity = name,
        fields = fields.len(),
        navigations = navigations.len(),
        "built entity metadata"
    );

    Ok(EntityMetadata {
        entity_name: name,
        fields,
        field_index,
        navigations,
        navigation_index,
        primary_key,
        foreign_keys,
        relations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone)]
    struct Author {
        id: i64,
        name: String,
        books: Vec<Book>,
    }

    #[derive(Debug, Default, Clone)]
    struct Book {
        id: i64,
        author_id: i64,
        author: Option<Author>,
    }

    impl Entity for Author {
        fn describe(builder: EntityBuilder<Self>) -> EntityBuilder<Self> {
            builder
                .field("Id", |a| &a.id, |a| &mut a.id)
                .field("Name", |a| &a.name, |a| &mut a.name)
                .primary_key("Id")
                .one_to_many::<Book>("Books", |a| &mut a.books)
        }
    }

    impl Entity for Book {
        fn describe(builder: EntityBuilder<Self>) -> EntityBuilder<Self> {
            builder
                .field("Id", |b| &b.id, |b| &mut b.id)
                .field("AuthorId", |b| &b.author_id, |b| &mut b.author_id)
                .primary_key("Id")
                .foreign_key::<Author>("AuthorId")
                .many_to_one::<Author>("Author", |b| &mut b.author)
        }
    }

    #[derive(Debug, Default, Clone)]
    struct Keyless {
        value: i64,
    }

    impl Entity for Keyless {
        fn describe(builder: EntityBuilder<Self>) -> EntityBuilder<Self> {
            builder.field("Value", |k| &k.value, |k| &mut k.value)
        }
    }

    #[derive(Debug, Default, Clone)]
    struct DoubleField {
        a: i64,
    }

    impl Entity for DoubleField {
        fn describe(builder: EntityBuilder<Self>) -> EntityBuilder<Self> {
            builder
                .field("A", |d| &d.a, |d| &mut d.a)
                .field("a", |d| &d.a, |d| &mut d.a)
        }
    }

    #[derive(Debug, Default, Clone)]
    struct BadKey {
        a: i64,
    }

    impl Entity for BadKey {
        fn describe(builder: EntityBuilder<Self>) -> EntityBuilder<Self> {
            builder.field("A", |d| &d.a, |d| &mut d.a).primary_key("B")
        }
    }

    #[test]
    fn metadata_is_cached_per_type() {
        let first = metadata::<Author>().unwrap();
        let second = metadata::<Author>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.entity_name(), "Author");
        assert_eq!(first.fields().len(), 2);
        assert_eq!(first.field("name").map(FieldDescriptor::column), Some("Name"));
    }

    #[test]
    fn concurrent_first_use_yields_one_instance() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| metadata::<Book>().unwrap()))
            .collect();
        let all: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(all.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn relationships_are_found_by_target_type() {
        let book = metadata::<Book>().unwrap();
        assert_eq!(book.foreign_key_to::<Author>().unwrap().name(), "AuthorId");
        assert_eq!(
            book.relation_to::<Author>(RelationKind::ManyToOne).unwrap().name(),
            "Author"
        );
        let author = metadata::<Author>().unwrap();
        assert!(author.relation_to::<Book>(RelationKind::OneToMany).is_ok());
        assert!(matches!(
            author.relation_to::<Book>(RelationKind::OneToOne),
            Err(SqlMapperError::MetadataError(_))
        ));
    }

    #[test]
    fn missing_primary_key_fails_lazily() {
        let meta = metadata::<Keyless>().unwrap();
        assert!(matches!(meta.primary_key(), Err(SqlMapperError::MetadataError(_))));
    }

    #[test]
    fn inconsistent_declarations_are_rejected() {
        assert!(matches!(metadata::<DoubleField>(), Err(SqlMapperError::MetadataError(_))));
        assert!(matches!(metadata::<BadKey>(), Err(SqlMapperError::MetadataError(_))));
    }
}
