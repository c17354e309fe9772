use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{Result, ServiceError};
use crate::schema::descriptor::{
    AttributeDescriptor, AttributeKind, ChoiceList, EntityDescriptor,
};
use crate::schema::relationship::RelationshipDef;

/// Registered metadata: record types, relationships and choice lists.
///
/// Immutable after build and cheap to clone; the maps sit behind `Arc` so a
/// catalog can be shared across services without locks. Registration is
/// explicit, there is no scanning.
#[derive(Clone)]
pub struct SchemaCatalog {
    entities: Arc<HashMap<String, EntityDescriptor>>,
    relationships: Arc<HashMap<String, RelationshipDef>>,
    choices: Arc<HashMap<String, ChoiceList>>,
}

impl SchemaCatalog {
    pub fn builder() -> SchemaCatalogBuilder {
        SchemaCatalogBuilder {
            entities: HashMap::new(),
            relationships: HashMap::new(),
            choices: HashMap::new(),
        }
    }

    pub fn entity(&self, name: &str) -> Result<&EntityDescriptor> {
        self.entities
            .get(name)
            .ok_or_else(|| ServiceError::EntityNotRegistered(name.to_string()))
    }

    pub fn attribute(&self, entity: &str, name: &str) -> Result<&AttributeDescriptor> {
        self.entity(entity)?
            .get_attribute(name)
            .ok_or_else(|| ServiceError::AttributeNotFound {
                entity: entity.to_string(),
                attribute: name.to_string(),
            })
    }

    pub fn relationship(&self, name: &str) -> Result<&RelationshipDef> {
        self.relationships
            .get(name)
            .ok_or_else(|| ServiceError::RelationshipNotFound(name.to_string()))
    }

    pub fn choices(&self, name: &str) -> Result<&ChoiceList> {
        self.choices
            .get(name)
            .ok_or_else(|| ServiceError::ChoicesNotFound(name.to_string()))
    }

    /// Many-to-many definition whose intersect type is `entity`, if any.
    pub fn intersect_relationship(&self, entity: &str) -> Option<&RelationshipDef> {
        self.relationships.values().find(|def| {
            matches!(def, RelationshipDef::ManyToMany { intersect, .. } if intersect == entity)
        })
    }

    pub fn has_entity(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    pub fn entity_names(&self) -> Vec<&str> {
        self.entities.keys().map(|s| s.as_str()).collect()
    }
}

pub struct SchemaCatalogBuilder {
    entities: HashMap<String, EntityDescriptor>,
    relationships: HashMap<String, RelationshipDef>,
    choices: HashMap<String, ChoiceList>,
}

impl SchemaCatalogBuilder {
    pub fn entity(mut self, descriptor: EntityDescriptor) -> Result<Self> {
        let name = descriptor.logical_name.clone();
        if self.entities.contains_key(&name) {
            return Err(ServiceError::malformed(name, "record type already registered"));
        }
        self.entities.insert(name, descriptor);
        Ok(self)
    }

    /// Registers a relationship. Participating types must already be
    /// registered; a many-to-many intersect type that is not gets a derived
    /// descriptor with the two side reference attributes.
    pub fn relationship(mut self, def: RelationshipDef) -> Result<Self> {
        if self.relationships.contains_key(def.name()) {
            return Err(ServiceError::malformed(
                def.name().to_string(),
                "relationship already registered",
            ));
        }
        match &def {
            RelationshipDef::OneToMany {
                one_entity,
                many_entity,
                ..
            } => {
                self.require_entity(one_entity)?;
                self.require_entity(many_entity)?;
            }
            RelationshipDef::ManyToMany {
                intersect,
                side_a,
                side_b,
                ..
            } => {
                self.require_entity(&side_a.entity)?;
                self.require_entity(&side_b.entity)?;
                if !self.entities.contains_key(intersect) {
                    let derived = EntityDescriptor::new(intersect.clone())
                        .attribute(AttributeDescriptor::new(
                            side_a.field.clone(),
                            AttributeKind::reference(side_a.entity.clone()),
                        ))
                        .attribute(AttributeDescriptor::new(
                            side_b.field.clone(),
                            AttributeKind::reference(side_b.entity.clone()),
                        ));
                    self.entities.insert(intersect.clone(), derived);
                }
            }
        }
        self.relationships.insert(def.name().to_string(), def);
        Ok(self)
    }

    pub fn choices(mut self, list: ChoiceList) -> Result<Self> {
        if self.choices.contains_key(&list.name) {
            return Err(ServiceError::malformed(
                list.name.clone(),
                "choice list already registered",
            ));
        }
        self.choices.insert(list.name.clone(), list);
        Ok(self)
    }

    pub fn build(self) -> SchemaCatalog {
        SchemaCatalog {
            entities: Arc::new(self.entities),
            relationships: Arc::new(self.relationships),
            choices: Arc::new(self.choices),
        }
    }

    fn require_entity(&self, name: &str) -> Result<()> {
        if self.entities.contains_key(name) {
            Ok(())
        } else {
            Err(ServiceError::EntityNotRegistered(name.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::relationship::RelationshipSide;

    fn widget() -> EntityDescriptor {
        EntityDescriptor::new("widget")
            .attribute(AttributeDescriptor::new("name", AttributeKind::Text))
    }

    #[test]
    fn test_lookup_and_misses() {
        let catalog = SchemaCatalog::builder()
            .entity(widget())
            .unwrap()
            .build();

        assert!(catalog.entity("widget").is_ok());
        assert!(catalog.attribute("widget", "name").is_ok());
        assert!(matches!(
            catalog.entity("gadget"),
            Err(ServiceError::EntityNotRegistered(_))
        ));
        assert!(matches!(
            catalog.attribute("widget", "price"),
            Err(ServiceError::AttributeNotFound { .. })
        ));
    }

    #[test]
    fn test_duplicate_entity_rejected() {
        let err = SchemaCatalog::builder()
            .entity(widget())
            .unwrap()
            .entity(widget());
        assert!(err.is_err());
    }

    #[test]
    fn test_many_to_many_derives_intersect_descriptor() {
        let catalog = SchemaCatalog::builder()
            .entity(widget())
            .unwrap()
            .entity(EntityDescriptor::new("tag"))
            .unwrap()
            .relationship(RelationshipDef::many_to_many(
                "widget_tags",
                "widget_tag",
                RelationshipSide::new("widget", "widget_id"),
                RelationshipSide::new("tag", "tag_id"),
            ))
            .unwrap()
            .build();

        let intersect = catalog.entity("widget_tag").unwrap();
        assert!(intersect.get_attribute("widget_id").is_some());
        assert!(intersect.get_attribute("tag_id").is_some());
        assert!(catalog.relationship("widget_tags").is_ok());
    }

    #[test]
    fn test_relationship_requires_registered_sides() {
        let err = SchemaCatalog::builder()
            .entity(widget())
            .unwrap()
            .relationship(RelationshipDef::one_to_many(
                "widget_orders",
                "widget",
                "order",
                "widget_id",
            ));
        assert!(matches!(err, Err(ServiceError::EntityNotRegistered(_))));
    }
}
