// Relational mapping - from result tables to typed object graphs
//
// - descriptor: the `Entity` trait and its builder
// - registry: per-type metadata cache
// - row_mapper: row -> entity
// - assembler: tables -> object graphs
// - keys: hashable key values used for correlation

pub mod assembler;
pub mod descriptor;
mod keys;
pub mod registry;
pub mod row_mapper;

pub use assembler::{
    JoinKeys, ParentKeys, many_to_many, many_to_many_related, many_to_one, many_to_one_related,
    one_to_many, one_to_many_grouped, one_to_many_grouped_related, one_to_many_related,
    one_to_one, one_to_one_related,
};
pub use descriptor::{Entity, EntityBuilder, FieldDescriptor, NavigationField, RelationKind};
pub use registry::{EntityMetadata, metadata};
pub use row_mapper::{entities_to_table, entity_to_row, map_row, map_rows};
