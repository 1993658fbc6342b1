//! End-to-end scenarios for the operator console: review transitions, verification toggles
//! and bulk removal, driven through the public console facade and its HTTP router.

mod common {
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};

    use noc_console::workflows::console::Console;
    use noc_console::workflows::noc::{
        Application, ApplicationId, ApplicationStatus, BackendError, Filmmaker, ForwardPayload,
        NocBackend, RecipientCatalog,
    };
    use noc_console::workflows::registry::{EntityId, EntityKind, RegistryBackend};

    pub(super) fn application(id: &str, number: &str, status: ApplicationStatus) -> Application {
        Application {
            id: ApplicationId::from(id),
            application_number: number.to_string(),
            status,
            filmmaker: Filmmaker {
                name: "Meera Iyer".to_string(),
                email: "meera@docu.org".to_string(),
            },
            created_at: Utc
                .with_ymd_and_hms(2024, 3, 3, 11, 0, 0)
                .single()
                .expect("valid timestamp"),
            remarks: None,
        }
    }

    /// Authority backend double covering both the review and registry surfaces.
    #[derive(Default)]
    pub(super) struct AuthorityBackend {
        applications: Mutex<Vec<Application>>,
        users: Mutex<Vec<Value>>,
        failing: Mutex<HashSet<String>>,
        calls: Mutex<Vec<String>>,
    }

    impl AuthorityBackend {
        pub(super) fn seeded() -> Self {
            Self {
                applications: Mutex::new(vec![
                    application("a1", "NOC-2024-0101", ApplicationStatus::Submitted),
                    application("a2", "NOC-2024-0102", ApplicationStatus::Approved),
                ]),
                users: Mutex::new(vec![
                    json!({ "id": 7, "role": "artist", "name": "Ravi Kumar", "isVerified": false }),
                    json!({ "_id": "v1", "role": "vendor", "businessName": "Lens & Light" }),
                    json!({ "_id": "v2", "role": "vendor", "businessName": "Patliputra Grips" }),
                    json!({ "_id": "v3", "role": "vendor", "businessName": "Gaya Catering" }),
                ]),
                ..Self::default()
            }
        }

        pub(super) fn fail_for(&self, id: &str) {
            self.failing.lock().expect("mutex").insert(id.to_string());
        }

        pub(super) fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("mutex").clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().expect("mutex").push(call);
        }

        fn refuse(&self, id: &str) -> Result<(), BackendError> {
            if self.failing.lock().expect("mutex").contains(id) {
                return Err(BackendError::rejected(409, format!("{id} is locked")));
            }
            Ok(())
        }

        fn user_id(user: &Value) -> String {
            match user.get("_id").or_else(|| user.get("id")) {
                Some(Value::String(raw)) => raw.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            }
        }

        fn move_to(
            &self,
            id: &ApplicationId,
            status: ApplicationStatus,
        ) -> Result<Option<Application>, BackendError> {
            let mut applications = self.applications.lock().expect("mutex");
            let application = applications
                .iter_mut()
                .find(|application| &application.id == id)
                .ok_or_else(|| BackendError::rejected(404, "Application not found"))?;
            application.status = status;
            Ok(Some(application.clone()))
        }
    }

    #[async_trait]
    impl NocBackend for AuthorityBackend {
        async fn list_applications(&self) -> Result<Vec<Application>, BackendError> {
            self.record("GET /applications".to_string());
            Ok(self.applications.lock().expect("mutex").clone())
        }

        async fn application_details(
            &self,
            id: &ApplicationId,
        ) -> Result<Application, BackendError> {
            self.record(format!("GET /applications/{id}/details"));
            self.applications
                .lock()
                .expect("mutex")
                .iter()
                .find(|application| &application.id == id)
                .cloned()
                .ok_or_else(|| BackendError::rejected(404, "Application not found"))
        }

        async fn forward(
            &self,
            id: &ApplicationId,
            _payload: &ForwardPayload,
        ) -> Result<Option<Application>, BackendError> {
            self.record(format!("POST /applications/{id}/forward"));
            self.refuse(&id.0)?;
            self.move_to(id, ApplicationStatus::Forwarded)
        }

        async fn reject(
            &self,
            id: &ApplicationId,
            _remarks: &str,
        ) -> Result<Option<Application>, BackendError> {
            self.record(format!("PUT /reject/{id}"));
            self.refuse(&id.0)?;
            self.move_to(id, ApplicationStatus::Rejected)
        }
    }

    #[async_trait]
    impl RegistryBackend for AuthorityBackend {
        async fn list_users(&self) -> Result<Vec<Value>, BackendError> {
            self.record("GET /users".to_string());
            Ok(self.users.lock().expect("mutex").clone())
        }

        async fn verify(&self, kind: EntityKind, id: &EntityId) -> Result<(), BackendError> {
            self.record(format!("PUT /{}/{id}/verify", kind.collection()));
            self.refuse(&id.0)
        }

        async fn unverify(&self, kind: EntityKind, id: &EntityId) -> Result<(), BackendError> {
            self.record(format!("PUT /{}/{id}/unverify", kind.collection()));
            self.refuse(&id.0)
        }

        async fn delete(&self, kind: EntityKind, id: &EntityId) -> Result<(), BackendError> {
            self.record(format!("DELETE /{}/{id}", kind.collection()));
            self.refuse(&id.0)?;
            self.users
                .lock()
                .expect("mutex")
                .retain(|user| Self::user_id(user) != id.0);
            Ok(())
        }
    }

    pub(super) fn console() -> (Arc<Console<AuthorityBackend>>, Arc<AuthorityBackend>) {
        let backend = Arc::new(AuthorityBackend::seeded());
        let console = Console::new(backend.clone(), Arc::new(RecipientCatalog::standard()));
        (Arc::new(console), backend)
    }
}

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::*;
use noc_console::workflows::console::console_router;
use noc_console::workflows::noc::{ApplicationId, ApplicationStatus};
use noc_console::workflows::notice::{ConsoleCommand, NoticeLevel};
use noc_console::workflows::registry::{EntityId, EntityKind};
use serde_json::{json, Value};
use tower::ServiceExt;

#[tokio::test]
async fn confirmed_forward_reaches_the_backend_once() {
    let (console, backend) = console();
    console.reviews().refresh().await.expect("refresh");

    let mut notice = console.confirmation(ConsoleCommand::ForwardApplication {
        application_id: ApplicationId::from("a1"),
        departments: vec![101],
        districts: vec![20, 4],
    });
    assert_eq!(notice.level(), Some(NoticeLevel::Confirm));
    assert_eq!(
        notice.message(),
        Some("Forward application NOC-2024-0101 to 3 recipient(s)?")
    );

    let command = notice.accept().expect("queued command");
    let outcome = console.dispatch(command).await;

    assert_eq!(outcome.level(), Some(NoticeLevel::Success));
    let forwarded = console
        .reviews()
        .application(&ApplicationId::from("a1"))
        .expect("cached");
    assert_eq!(forwarded.status, ApplicationStatus::Forwarded);
    let forwards = backend
        .calls()
        .into_iter()
        .filter(|call| call.starts_with("POST"))
        .count();
    assert_eq!(forwards, 1);
}

#[tokio::test]
async fn dismissed_confirmation_sends_nothing() {
    let (console, backend) = console();

    let mut notice = console.confirmation(ConsoleCommand::DeleteEntities {
        kind: EntityKind::Vendor,
        ids: vec![EntityId::from("v1")],
    });
    notice.dismiss();

    assert_eq!(notice.accept(), None);
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn rejecting_without_remarks_is_a_warning_and_stays_local() {
    let (console, backend) = console();

    let notice = console
        .dispatch(ConsoleCommand::RejectApplication {
            application_id: ApplicationId::from("a1"),
            remarks: String::new(),
        })
        .await;

    assert_eq!(notice.level(), Some(NoticeLevel::Warning));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn verification_failure_is_rolled_back_and_reported() {
    let (console, backend) = console();
    console
        .registry()
        .refresh(EntityKind::Artist)
        .await
        .expect("refresh");
    backend.fail_for("7");

    let notice = console
        .dispatch(ConsoleCommand::SetVerified {
            kind: EntityKind::Artist,
            entity_id: EntityId::from(7),
            verified: true,
        })
        .await;

    assert_eq!(notice.level(), Some(NoticeLevel::Error));
    assert_eq!(notice.message(), Some("7 is locked"));
    let artist = console
        .registry()
        .entity(EntityKind::Artist, &EntityId::from(7))
        .expect("cached");
    assert!(!artist.is_verified());
}

#[tokio::test]
async fn partial_bulk_delete_warns_and_resynchronizes() {
    let (console, backend) = console();
    console
        .registry()
        .refresh(EntityKind::Vendor)
        .await
        .expect("refresh");
    backend.fail_for("v3");

    let notice = console
        .dispatch(ConsoleCommand::DeleteEntities {
            kind: EntityKind::Vendor,
            ids: vec![EntityId::from("v1"), EntityId::from("v2"), EntityId::from("v3")],
        })
        .await;

    assert_eq!(notice.level(), Some(NoticeLevel::Warning));
    let message = notice.message().expect("message");
    assert!(message.starts_with("Deleted 2 of 3 vendors."));
    assert!(message.contains("v3 (v3 is locked)"));

    let remaining: Vec<EntityId> = console
        .registry()
        .entities(EntityKind::Vendor)
        .into_iter()
        .map(|vendor| vendor.id)
        .collect();
    assert_eq!(remaining, vec![EntityId::from("v3")]);
}

#[tokio::test]
async fn console_router_dispatches_commands_and_serves_the_feed() {
    let (console, _backend) = console();
    let router = console_router(console);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/console/commands")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "command": "reject_application",
                        "application_id": "a1",
                        "remarks": "Location permit from the forest department is missing"
                    })
                    .to_string(),
                ))
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(
        &axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("body"),
    )
    .expect("json");
    assert_eq!(body["state"], "open");
    assert_eq!(body["level"], "success");

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/noc/history")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    let body: Value = serde_json::from_slice(
        &axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("body"),
    )
    .expect("json");
    assert_eq!(body[0]["transition"], "reject");
    assert_eq!(body[0]["to"], "Rejected");
}
