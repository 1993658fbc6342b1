use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::workflows::noc::BackendError;
use crate::workflows::registry::{EntityId, EntityKind, RegistryBackend, VerificationRegistry};

pub(super) fn directory() -> Vec<Value> {
    vec![
        json!({ "id": 7, "role": "artist", "name": "Ravi Kumar", "email": "ravi@example.in", "isVerified": 0 }),
        json!({ "_id": "a8", "role": "Artist", "firstName": "Nila", "lastName": "Soren", "verified": true }),
        json!({ "_id": "v1", "role": "vendor", "businessName": "Lens & Light Rentals", "status": 1 }),
        json!({ "_id": "v2", "role": "vendor", "businessName": "Patliputra Grips", "isVerified": false }),
        json!({ "_id": "v3", "role": "vendor", "companyName": "Gaya Catering" }),
        json!({ "_id": "admin", "role": "admin", "name": "Console Admin" }),
    ]
}

pub(super) async fn loaded_registry(
    kind: EntityKind,
) -> (VerificationRegistry<MemoryDirectory>, Arc<MemoryDirectory>) {
    let backend = Arc::new(MemoryDirectory::new(directory()));
    let registry = VerificationRegistry::new(backend.clone());
    registry.refresh(kind).await.expect("initial refresh");
    (registry, backend)
}

/// In-memory user directory with per-id failure injection.
#[derive(Default)]
pub(super) struct MemoryDirectory {
    users: Mutex<Vec<Value>>,
    failing: Mutex<HashSet<String>>,
    listing_fails: Mutex<bool>,
    calls: Mutex<Vec<String>>,
}

impl MemoryDirectory {
    pub(super) fn new(users: Vec<Value>) -> Self {
        Self {
            users: Mutex::new(users),
            ..Self::default()
        }
    }

    /// Every mutation on `id` fails with a backend rejection.
    pub(super) fn fail_for(&self, id: &str) {
        self.failing
            .lock()
            .expect("failure mutex poisoned")
            .insert(id.to_string());
    }

    pub(super) fn fail_listing(&self) {
        *self.listing_fails.lock().expect("failure mutex poisoned") = true;
    }

    pub(super) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("call mutex poisoned").clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("call mutex poisoned").push(call);
    }

    fn check(&self, id: &EntityId) -> Result<(), BackendError> {
        if self
            .failing
            .lock()
            .expect("failure mutex poisoned")
            .contains(&id.0)
        {
            return Err(BackendError::rejected(409, format!("{id} is locked")));
        }
        Ok(())
    }

    fn matches(user: &Value, id: &EntityId) -> bool {
        ["_id", "id"].iter().any(|key| match user.get(*key) {
            Some(Value::String(raw)) => raw == &id.0,
            Some(Value::Number(number)) => number.to_string() == id.0,
            _ => false,
        })
    }

    fn set_flag(&self, id: &EntityId, verified: bool) {
        let mut users = self.users.lock().expect("directory mutex poisoned");
        if let Some(user) = users.iter_mut().find(|user| Self::matches(user, id)) {
            user["isVerified"] = json!(verified);
        }
    }
}

#[async_trait]
impl RegistryBackend for MemoryDirectory {
    async fn list_users(&self) -> Result<Vec<Value>, BackendError> {
        self.record("list".to_string());
        if *self.listing_fails.lock().expect("failure mutex poisoned") {
            return Err(BackendError::Transport("connection reset".to_string()));
        }
        Ok(self.users.lock().expect("directory mutex poisoned").clone())
    }

    async fn verify(&self, kind: EntityKind, id: &EntityId) -> Result<(), BackendError> {
        self.record(format!("verify {kind} {id}"));
        self.check(id)?;
        self.set_flag(id, true);
        Ok(())
    }

    async fn unverify(&self, kind: EntityKind, id: &EntityId) -> Result<(), BackendError> {
        self.record(format!("unverify {kind} {id}"));
        self.check(id)?;
        self.set_flag(id, false);
        Ok(())
    }

    async fn delete(&self, kind: EntityKind, id: &EntityId) -> Result<(), BackendError> {
        self.record(format!("delete {kind} {id}"));
        self.check(id)?;
        self.users
            .lock()
            .expect("directory mutex poisoned")
            .retain(|user| !Self::matches(user, id));
        Ok(())
    }
}
