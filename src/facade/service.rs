use std::sync::Arc;

use uuid::Uuid;

use crate::bulk::{CreationPlan, CreationPlanner};
use crate::command::{
    BatchRequest, BatchResult, CallerIdentity, QueryInput, Request, Response, UpsertResult,
};
use crate::core::{Record, RecordRef, Result};
use crate::executor::{self, ExecutionContext};
use crate::fetch;
use crate::query::{ColumnSet, QueryTree, RecordSet};
use crate::schema::{AttributeDescriptor, ChoiceList, EntityDescriptor, SchemaCatalog};
use crate::store::{RecordStore, ServiceOptions};

/// The service facade: a complete in-process stand-in for the remote
/// record-management endpoint.
///
/// Every typed method builds a [`Request`] and runs it through the same
/// dispatcher as [`RecordService::execute`], so the two surfaces cannot
/// drift apart.
///
/// # Examples
///
/// ```
/// use memcrm::schema::{AttributeDescriptor, AttributeKind, EntityDescriptor, SchemaCatalog};
/// use memcrm::{ColumnSet, Record, RecordService};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let catalog = SchemaCatalog::builder()
///     .entity(
///         EntityDescriptor::new("contact")
///             .attribute(AttributeDescriptor::new("first_name", AttributeKind::Text)),
///     )?
///     .build();
///
/// let service = RecordService::new(catalog);
/// let id = service.create(Record::new("contact").with("first_name", "Ada"))?;
///
/// let fetched = service.retrieve("contact", id, &ColumnSet::All)?;
/// assert_eq!(fetched.attribute("first_name").as_str(), Some("Ada"));
/// # Ok(())
/// # }
/// ```
pub struct RecordService {
    store: Arc<RecordStore>,
    options: ServiceOptions,
}

impl RecordService {
    pub fn new(catalog: SchemaCatalog) -> Self {
        Self::with_options(catalog, ServiceOptions::new())
    }

    pub fn with_options(catalog: SchemaCatalog, options: ServiceOptions) -> Self {
        Self {
            store: Arc::new(RecordStore::new(catalog)),
            options,
        }
    }

    /// Wraps an existing store, typically one opened through a
    /// [`StoreRegistry`](crate::store::StoreRegistry). Services sharing a
    /// store see each other's records.
    pub fn from_store(store: Arc<RecordStore>, options: ServiceOptions) -> Self {
        Self { store, options }
    }

    /// A second handle onto the same store acting as a different caller.
    pub fn impersonate(&self, caller: Uuid) -> Self {
        Self {
            store: Arc::clone(&self.store),
            options: self.options.clone().caller(caller),
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        self.store.catalog()
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    // ==================== Dispatch ====================

    /// Runs one request through the dispatcher.
    pub fn execute(&self, request: Request) -> Result<Response> {
        let ctx = ExecutionContext::new(&self.store, &self.options);
        executor::execute(&ctx, request)
    }

    // ==================== Typed surface ====================

    pub fn create(&self, record: Record) -> Result<Uuid> {
        let Response::Created(id) = self.execute(Request::Create(record))? else {
            unreachable!("create yields a created response");
        };
        Ok(id)
    }

    pub fn update(&self, record: Record) -> Result<()> {
        self.execute(Request::Update(record))?;
        Ok(())
    }

    pub fn delete(&self, entity: &str, id: Uuid) -> Result<()> {
        self.execute(Request::Delete {
            entity: entity.to_string(),
            id,
        })?;
        Ok(())
    }

    pub fn retrieve(&self, entity: &str, id: Uuid, columns: &ColumnSet) -> Result<Record> {
        let request = Request::Retrieve {
            entity: entity.to_string(),
            id,
            columns: columns.clone(),
        };
        let Response::Retrieved(record) = self.execute(request)? else {
            unreachable!("retrieve yields a record");
        };
        Ok(record)
    }

    /// Evaluates a query tree or a declarative XML document.
    pub fn retrieve_multiple(&self, query: impl Into<QueryInput>) -> Result<RecordSet> {
        let Response::RetrievedMultiple(set) =
            self.execute(Request::RetrieveMultiple(query.into()))?
        else {
            unreachable!("retrieve-multiple yields a record set");
        };
        Ok(set)
    }

    pub fn associate(
        &self,
        entity: &str,
        id: Uuid,
        relationship: &str,
        related: Vec<RecordRef>,
    ) -> Result<()> {
        self.execute(Request::Associate {
            entity: entity.to_string(),
            id,
            relationship: relationship.to_string(),
            related,
        })?;
        Ok(())
    }

    pub fn disassociate(
        &self,
        entity: &str,
        id: Uuid,
        relationship: &str,
        related: Vec<RecordRef>,
    ) -> Result<()> {
        self.execute(Request::Disassociate {
            entity: entity.to_string(),
            id,
            relationship: relationship.to_string(),
            related,
        })?;
        Ok(())
    }

    pub fn set_state(&self, entity: &str, id: Uuid, state: i64, status: i64) -> Result<()> {
        self.execute(Request::SetState {
            entity: entity.to_string(),
            id,
            state,
            status,
        })?;
        Ok(())
    }

    pub fn assign(&self, entity: &str, id: Uuid, owner: Uuid) -> Result<()> {
        self.execute(Request::Assign {
            entity: entity.to_string(),
            id,
            owner,
        })?;
        Ok(())
    }

    pub fn upsert(&self, record: Record) -> Result<UpsertResult> {
        let Response::Upserted(result) = self.execute(Request::Upsert(record))? else {
            unreachable!("upsert yields an upsert result");
        };
        Ok(result)
    }

    pub fn execute_batch(&self, batch: BatchRequest) -> Result<BatchResult> {
        let Response::Batch(result) = self.execute(Request::ExecuteBatch(batch))? else {
            unreachable!("a batch yields a batch result");
        };
        Ok(result)
    }

    pub fn describe_entity(&self, name: &str) -> Result<EntityDescriptor> {
        let Response::Entity(descriptor) = self.execute(Request::DescribeEntity(name.to_string()))?
        else {
            unreachable!("describe-entity yields a descriptor");
        };
        Ok(descriptor)
    }

    pub fn describe_attribute(&self, entity: &str, attribute: &str) -> Result<AttributeDescriptor> {
        let request = Request::DescribeAttribute {
            entity: entity.to_string(),
            attribute: attribute.to_string(),
        };
        let Response::Attribute(descriptor) = self.execute(request)? else {
            unreachable!("describe-attribute yields a descriptor");
        };
        Ok(descriptor)
    }

    pub fn describe_choices(&self, name: &str) -> Result<ChoiceList> {
        let Response::Choices(list) = self.execute(Request::DescribeChoices(name.to_string()))?
        else {
            unreachable!("describe-choices yields a choice list");
        };
        Ok(list)
    }

    pub fn who_am_i(&self) -> Result<CallerIdentity> {
        let Response::Identity(identity) = self.execute(Request::WhoAmI)? else {
            unreachable!("who-am-i yields an identity");
        };
        Ok(identity)
    }

    // ==================== Bulk creation ====================

    /// Orders the records so references land after the records they point
    /// at, without touching the store.
    pub fn plan_creation(&self, records: Vec<Record>) -> Result<CreationPlan> {
        CreationPlanner::new(self.store.catalog(), self.store.cyclic_fields()).plan(records)
    }

    /// Creates an arbitrarily ordered batch. Records are created in
    /// dependency order; cyclic reference fields are withheld from the
    /// initial writes and patched in afterwards, so the batch lands fully
    /// wired no matter how tangled its references are. In-batch references
    /// require the referenced records to carry explicit identities.
    ///
    /// Returns the created identities in creation order.
    pub fn create_all(&self, records: Vec<Record>) -> Result<Vec<Uuid>> {
        let plan = self.plan_creation(records)?;
        let CreationPlan { groups, deferred } = plan;

        let mut created = Vec::new();
        let mut patches = Vec::new();
        for group in groups {
            let withheld: Vec<&str> = deferred
                .iter()
                .filter(|field| field.entity == group.entity)
                .map(|field| field.field.as_str())
                .collect();
            for mut record in group.records {
                let mut withheld_values = Vec::new();
                for field in &withheld {
                    if let Some(value) = record.attributes.remove(*field) {
                        if !value.is_null() {
                            withheld_values.push(((*field).to_string(), value));
                        }
                    }
                }
                let id = self.create(record)?;
                created.push(id);
                if !withheld_values.is_empty() {
                    let mut patch = Record::with_id(&group.entity, id);
                    for (field, value) in withheld_values {
                        patch.set(field, value);
                    }
                    patches.push(patch);
                }
            }
        }
        for patch in patches {
            self.update(patch)?;
        }
        Ok(created)
    }

    // ==================== Declarative bridge ====================

    /// Parses a declarative XML document into a query tree.
    pub fn parse_query(&self, document: &str) -> Result<QueryTree> {
        fetch::parse_document(document)
    }

    /// Renders a query tree back into its canonical XML document.
    pub fn render_query(&self, tree: &QueryTree) -> Result<String> {
        fetch::render_document(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{fields, Value};
    use crate::schema::AttributeKind;
    use crate::store::StoreRegistry;

    #[test]
    fn typed_surface_and_dispatcher_agree() {
        let catalog = SchemaCatalog::builder()
            .entity(
                EntityDescriptor::new("contact")
                    .attribute(AttributeDescriptor::new("first_name", AttributeKind::Text)),
            )
            .unwrap()
            .build();
        let service = RecordService::new(catalog);

        let id = service
            .create(Record::new("contact").with("first_name", "Ada"))
            .unwrap();
        let via_request = service
            .execute(Request::Retrieve {
                entity: "contact".to_string(),
                id,
                columns: ColumnSet::All,
            })
            .unwrap();
        let via_method = service.retrieve("contact", id, &ColumnSet::All).unwrap();
        assert_eq!(via_request, Response::Retrieved(via_method));
    }

    #[test]
    fn impersonation_changes_the_stamped_caller() {
        let catalog = SchemaCatalog::builder()
            .entity(EntityDescriptor::new("contact"))
            .unwrap()
            .build();
        let service = RecordService::new(catalog);
        let other = Uuid::new_v4();
        let acting = service.impersonate(other);

        let id = acting.create(Record::new("contact")).unwrap();
        let record = service.retrieve("contact", id, &ColumnSet::All).unwrap();
        assert_eq!(record.attribute(fields::CREATED_BY), &Value::Id(other));
        assert_eq!(acting.who_am_i().unwrap().caller, other);
    }

    #[test]
    fn services_sharing_a_registry_store_see_each_other() {
        let catalog = SchemaCatalog::builder()
            .entity(EntityDescriptor::new("contact"))
            .unwrap()
            .build();
        let registry = StoreRegistry::new();
        let a = RecordService::from_store(registry.open("suite", &catalog), ServiceOptions::new());
        let b = RecordService::from_store(registry.open("suite", &catalog), ServiceOptions::new());

        let id = a.create(Record::new("contact")).unwrap();
        assert!(b.retrieve("contact", id, &ColumnSet::All).is_ok());
    }

    #[test]
    fn create_all_patches_cyclic_references() {
        let catalog = SchemaCatalog::builder()
            .entity(
                EntityDescriptor::new("contact").attribute(AttributeDescriptor::new(
                    "manager_id",
                    AttributeKind::reference("contact"),
                )),
            )
            .unwrap()
            .build();
        let service = RecordService::new(catalog);

        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let records = vec![
            Record::with_id("contact", a).with("manager_id", RecordRef::new("contact", b)),
            Record::with_id("contact", b).with("manager_id", RecordRef::new("contact", a)),
        ];

        let created = service.create_all(records).unwrap();
        assert_eq!(created.len(), 2);

        let stored_a = service.retrieve("contact", a, &ColumnSet::All).unwrap();
        let stored_b = service.retrieve("contact", b, &ColumnSet::All).unwrap();
        assert_eq!(stored_a.get_reference("manager_id").unwrap().id, b);
        assert_eq!(stored_b.get_reference("manager_id").unwrap().id, a);
    }
}
