pub mod catalog;
pub mod descriptor;
pub mod relationship;

pub use catalog::{SchemaCatalog, SchemaCatalogBuilder};
pub use descriptor::{
    ActiveStatePolicy, AttributeDescriptor, AttributeKind, ChoiceList, EntityDescriptor,
    NamePartsSpec,
};
pub use relationship::{RelationshipDef, RelationshipSide};
