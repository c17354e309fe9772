use memcrm::prelude::*;
use uuid::Uuid;

fn catalog() -> SchemaCatalog {
    SchemaCatalog::builder()
        .entity(
            EntityDescriptor::new("person")
                .attribute(AttributeDescriptor::new("first_name", AttributeKind::Text))
                .attribute(AttributeDescriptor::new("last_name", AttributeKind::Text))
                .name_parts(NamePartsSpec::default())
                .active_state(ActiveStatePolicy::DisabledFlag),
        )
        .unwrap()
        .entity(
            EntityDescriptor::new("ticket")
                .attribute(AttributeDescriptor::new("subject", AttributeKind::Text))
                .active_state(ActiveStatePolicy::StateStatus),
        )
        .unwrap()
        .build()
}

#[test]
fn test_create_stamps_audit_ownership_and_identity() {
    let caller = Uuid::new_v4();
    let unit = Uuid::new_v4();
    let service = RecordService::with_options(
        catalog(),
        ServiceOptions::new().caller(caller).owning_unit(unit),
    );

    let id = service
        .create(Record::new("ticket").with("subject", "printer on fire"))
        .unwrap();
    let record = service.retrieve("ticket", id, &ColumnSet::All).unwrap();

    assert_eq!(record.attribute("ticket_id"), &Value::Id(id));
    assert_eq!(record.attribute(fields::CREATED_BY), &Value::Id(caller));
    assert_eq!(record.attribute(fields::MODIFIED_BY), &Value::Id(caller));
    assert_eq!(record.attribute(fields::OWNER_ID), &Value::Id(caller));
    assert_eq!(record.attribute(fields::OWNING_UNIT), &Value::Id(unit));
    assert_eq!(
        record.attribute(fields::CREATED_AT),
        record.attribute(fields::MODIFIED_AT)
    );
    // StateStatus entities start active.
    assert_eq!(record.attribute(fields::STATE), &Value::Integer(0));
    assert_eq!(record.attribute(fields::STATUS), &Value::Integer(1));
}

#[test]
fn test_update_merges_and_strictly_advances_modified_at() {
    let service = RecordService::new(catalog());
    let id = service
        .create(Record::new("ticket").with("subject", "slow network"))
        .unwrap();

    let mut stamps = Vec::new();
    for i in 0..4 {
        service
            .update(Record::with_id("ticket", id).with("subject", format!("pass {i}")))
            .unwrap();
        let record = service.retrieve("ticket", id, &ColumnSet::All).unwrap();
        stamps.push(
            record
                .attribute(fields::MODIFIED_AT)
                .as_timestamp()
                .unwrap(),
        );
    }
    for pair in stamps.windows(2) {
        assert!(pair[1] > pair[0]);
    }

    let record = service.retrieve("ticket", id, &ColumnSet::All).unwrap();
    assert_eq!(record.attribute("subject").as_str(), Some("pass 3"));
}

#[test]
fn test_delete_then_retrieve_is_not_found() {
    let service = RecordService::new(catalog());
    let id = service.create(Record::new("ticket")).unwrap();

    service.delete("ticket", id).unwrap();
    let err = service.retrieve("ticket", id, &ColumnSet::All).unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { entity, id: missing }
        if entity == "ticket" && missing == id));

    let err = service.delete("ticket", id).unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
}

#[test]
fn test_explicit_identity_conflicts_are_typed() {
    let service = RecordService::new(catalog());
    let id = Uuid::new_v4();
    service.create(Record::with_id("ticket", id)).unwrap();

    let err = service.create(Record::with_id("ticket", id)).unwrap_err();
    assert!(matches!(err, ServiceError::DuplicateIdentity { .. }));
}

#[test]
fn test_composite_name_follows_the_template() {
    let service = RecordService::with_options(
        catalog(),
        ServiceOptions::new().name_template("{last}, {first}"),
    );
    let id = service
        .create(
            Record::new("person")
                .with("first_name", "Ada")
                .with("last_name", "Lovelace"),
        )
        .unwrap();
    let record = service.retrieve("person", id, &ColumnSet::All).unwrap();
    assert_eq!(record.attribute("full_name").as_str(), Some("Lovelace, Ada"));
}

#[test]
fn test_set_state_respects_the_entity_policy() {
    let service = RecordService::new(catalog());
    let ticket = service.create(Record::new("ticket")).unwrap();
    let person = service.create(Record::new("person")).unwrap();

    service.set_state("ticket", ticket, 1, 2).unwrap();
    let record = service.retrieve("ticket", ticket, &ColumnSet::All).unwrap();
    assert_eq!(record.attribute(fields::STATE), &Value::Integer(1));
    assert_eq!(record.attribute(fields::STATUS), &Value::Integer(2));

    service.set_state("person", person, 1, 0).unwrap();
    let record = service.retrieve("person", person, &ColumnSet::All).unwrap();
    assert_eq!(record.attribute(fields::DISABLED), &Value::Boolean(true));
}

#[test]
fn test_assign_changes_owner_and_stamps_modification() {
    let service = RecordService::new(catalog());
    let id = service.create(Record::new("ticket")).unwrap();
    let before = service.retrieve("ticket", id, &ColumnSet::All).unwrap();

    let owner = Uuid::new_v4();
    service.assign("ticket", id, owner).unwrap();

    let after = service.retrieve("ticket", id, &ColumnSet::All).unwrap();
    assert_eq!(after.attribute(fields::OWNER_ID), &Value::Id(owner));
    assert!(
        after.attribute(fields::MODIFIED_AT).as_timestamp().unwrap()
            > before.attribute(fields::MODIFIED_AT).as_timestamp().unwrap()
    );
}

#[test]
fn test_who_am_i_and_impersonation() {
    let caller = Uuid::new_v4();
    let service = RecordService::with_options(catalog(), ServiceOptions::new().caller(caller));
    assert_eq!(service.who_am_i().unwrap().caller, caller);

    let other = Uuid::new_v4();
    let acting = service.impersonate(other);
    assert_eq!(acting.who_am_i().unwrap().caller, other);

    let id = acting.create(Record::new("ticket")).unwrap();
    let record = service.retrieve("ticket", id, &ColumnSet::All).unwrap();
    assert_eq!(record.attribute(fields::CREATED_BY), &Value::Id(other));
}

#[test]
fn test_custom_commands_are_rejected() {
    let service = RecordService::new(catalog());
    let err = service
        .execute(Request::Custom {
            name: "reticulate-splines".to_string(),
            parameters: Default::default(),
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::UnsupportedCommand(name)
        if name == "reticulate-splines"));
}
