use super::common::*;
use crate::workflows::registry::service::DELETE_FAILED;
use crate::workflows::registry::{
    EntityFilter, EntityId, EntityKind, RegistryError, VerificationFilter,
};
use serde_json::json;

fn ids(entities: &[crate::workflows::registry::VerifiableEntity]) -> Vec<String> {
    entities.iter().map(|entity| entity.id.0.clone()).collect()
}

#[tokio::test]
async fn refresh_keeps_only_the_requested_role() {
    let (registry, _backend) = loaded_registry(EntityKind::Artist).await;
    assert_eq!(ids(&registry.entities(EntityKind::Artist)), vec!["7", "a8"]);

    registry
        .refresh(EntityKind::Vendor)
        .await
        .expect("vendor refresh");
    assert_eq!(
        ids(&registry.entities(EntityKind::Vendor)),
        vec!["v1", "v2", "v3"]
    );
}

#[tokio::test]
async fn verifying_artist_seven_flips_the_cached_flag() {
    let (registry, backend) = loaded_registry(EntityKind::Artist).await;
    let id = EntityId::from(7);
    assert!(!registry.entity(EntityKind::Artist, &id).expect("cached").is_verified());

    registry
        .set_verified(&id, EntityKind::Artist, true)
        .await
        .expect("verify succeeds");

    let artist = registry.entity(EntityKind::Artist, &id).expect("cached");
    assert!(artist.is_verified());
    assert_eq!(artist.to_wire()["isVerified"], json!(1));
    assert!(backend.calls().contains(&"verify artist 7".to_string()));
}

#[tokio::test]
async fn failed_verification_restores_the_previous_value() {
    let (registry, backend) = loaded_registry(EntityKind::Artist).await;
    let id = EntityId::from(7);
    registry
        .open_detail(EntityKind::Artist, &id)
        .expect("detail opens");
    let before = registry.entity(EntityKind::Artist, &id).expect("cached");
    backend.fail_for("7");

    let error = registry
        .set_verified(&id, EntityKind::Artist, true)
        .await
        .expect_err("backend refuses");

    assert!(matches!(error, RegistryError::Backend(_)));
    let after = registry.entity(EntityKind::Artist, &id).expect("cached");
    assert!(!after.is_verified());
    assert_eq!(after, before);
    assert_eq!(registry.detail(), Some(before));
}

#[tokio::test]
async fn unverifying_keeps_the_status_code_encoding() {
    let (registry, _backend) = loaded_registry(EntityKind::Vendor).await;
    let id = EntityId::from("v1");

    registry
        .set_verified(&id, EntityKind::Vendor, false)
        .await
        .expect("unverify succeeds");

    let vendor = registry.entity(EntityKind::Vendor, &id).expect("cached");
    assert!(!vendor.is_verified());
    assert_eq!(vendor.to_wire()["status"], json!(0));
}

#[tokio::test]
async fn unknown_entities_are_refused_without_a_call() {
    let (registry, backend) = loaded_registry(EntityKind::Artist).await;

    let error = registry
        .set_verified(&EntityId::from("ghost"), EntityKind::Artist, true)
        .await
        .expect_err("not loaded");

    assert!(matches!(error, RegistryError::UnknownEntity { .. }));
    assert_eq!(backend.calls(), vec!["list".to_string()]);
}

#[tokio::test]
async fn bulk_delete_with_one_failure_reports_a_partial_result() {
    let (registry, backend) = loaded_registry(EntityKind::Vendor).await;
    backend.fail_for("v2");

    let error = registry
        .bulk_delete(
            EntityKind::Vendor,
            &[EntityId::from("v1"), EntityId::from("v2"), EntityId::from("v3")],
        )
        .await
        .expect_err("one deletion fails");

    let RegistryError::PartialFailure(report) = &error else {
        panic!("expected partial failure, got {error:?}");
    };
    assert_eq!(report.requested, 3);
    assert_eq!(report.deleted.len(), 2);
    assert_eq!(report.failed[0].id, EntityId::from("v2"));
    assert_eq!(report.failed[0].message, "v2 is locked");
    assert!(report.resynchronized);

    assert_eq!(ids(&registry.entities(EntityKind::Vendor)), vec!["v2"]);

    let message = error.operator_message(DELETE_FAILED);
    assert!(message.starts_with("Deleted 2 of 3 vendors."));
    assert!(message.contains("v2 (v2 is locked)"));
}

#[tokio::test]
async fn bulk_delete_needs_a_selection() {
    let (registry, backend) = loaded_registry(EntityKind::Vendor).await;

    let error = registry
        .bulk_delete(EntityKind::Vendor, &[])
        .await
        .expect_err("nothing selected");

    assert_eq!(
        error,
        RegistryError::NothingSelected {
            kind: EntityKind::Vendor
        }
    );
    assert_eq!(backend.calls(), vec!["list".to_string()]);
}

#[tokio::test]
async fn confirmed_deletions_are_dropped_when_the_resync_fails() {
    let (registry, backend) = loaded_registry(EntityKind::Vendor).await;
    backend.fail_listing();

    let report = registry
        .bulk_delete(EntityKind::Vendor, &[EntityId::from("v3")])
        .await
        .expect("deletion succeeds");

    assert!(!report.resynchronized);
    assert_eq!(ids(&registry.entities(EntityKind::Vendor)), vec!["v1", "v2"]);
    assert!(report.summary().contains("could not be reloaded"));
}

#[tokio::test]
async fn directory_applies_verification_and_text_filters() {
    let (registry, _backend) = loaded_registry(EntityKind::Vendor).await;

    let unverified = registry.directory(
        EntityKind::Vendor,
        &EntityFilter {
            query: None,
            verification: VerificationFilter::Unverified,
        },
    );
    assert_eq!(ids(&unverified), vec!["v2", "v3"]);

    let by_name = registry.directory(
        EntityKind::Vendor,
        &EntityFilter {
            query: Some("lens".to_string()),
            verification: VerificationFilter::All,
        },
    );
    assert_eq!(ids(&by_name), vec!["v1"]);
}
