use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use noc_console::workflows::noc::{
    Application, ApplicationId, ApplicationStatus, BackendError, Filmmaker, ForwardPayload,
    NocBackend,
};
use noc_console::workflows::registry::{EntityId, EntityKind, RegistryBackend};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn submitted_on(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, 10, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Seeded stand-in for the authority backend used by the demo.
#[derive(Default)]
pub(crate) struct DemoBackend {
    applications: Mutex<Vec<Application>>,
    users: Mutex<Vec<Value>>,
    failing: Mutex<HashSet<String>>,
}

impl DemoBackend {
    pub(crate) fn seeded() -> Self {
        let application = |id: &str, number: &str, status, name: &str, email: &str, day| {
            Application {
                id: ApplicationId::from(id),
                application_number: number.to_string(),
                status,
                filmmaker: Filmmaker {
                    name: name.to_string(),
                    email: email.to_string(),
                },
                created_at: submitted_on(day),
                remarks: None,
            }
        };

        Self {
            applications: Mutex::new(vec![
                application(
                    "65f1c0",
                    "NOC-2024-0042",
                    ApplicationStatus::Submitted,
                    "Asha Verma",
                    "asha@studio.in",
                    1,
                ),
                application(
                    "65f1c1",
                    "NOC-2024-0043",
                    ApplicationStatus::Approved,
                    "Rohit Sen",
                    "rohit@films.in",
                    2,
                ),
                application(
                    "65f1c2",
                    "NOC-2024-0044",
                    ApplicationStatus::Forwarded,
                    "Meera Iyer",
                    "meera@docu.org",
                    3,
                ),
            ]),
            users: Mutex::new(vec![
                json!({ "id": 7, "role": "artist", "name": "Ravi Kumar", "isVerified": 0 }),
                json!({ "_id": "a8", "role": "artist", "firstName": "Nila", "lastName": "Soren", "verified": true }),
                json!({ "_id": "v1", "role": "vendor", "businessName": "Lens & Light Rentals", "status": 1 }),
                json!({ "_id": "v2", "role": "vendor", "businessName": "Patliputra Grips" }),
                json!({ "_id": "v3", "role": "vendor", "companyName": "Gaya Catering" }),
            ]),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Make every mutation of `id` fail.
    pub(crate) fn fail_for(&self, id: &str) {
        lock(&self.failing).insert(id.to_string());
    }

    fn refuse(&self, id: &str) -> Result<(), BackendError> {
        if lock(&self.failing).contains(id) {
            return Err(BackendError::rejected(
                409,
                format!("Record {id} is locked by another reviewer"),
            ));
        }
        Ok(())
    }

    fn user_id(user: &Value) -> Option<String> {
        match user.get("_id").or_else(|| user.get("id"))? {
            Value::String(raw) => Some(raw.clone()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    }

    fn set_verified(&self, id: &EntityId, verified: bool) {
        let mut users = lock(&self.users);
        if let Some(user) = users
            .iter_mut()
            .find(|user| Self::user_id(user).as_deref() == Some(id.0.as_str()))
        {
            write_flags(user, verified);
        }
    }

    fn transition(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
        remarks: Option<&str>,
    ) -> Result<Option<Application>, BackendError> {
        self.refuse(&id.0)?;
        let mut applications = lock(&self.applications);
        let application = applications
            .iter_mut()
            .find(|application| &application.id == id)
            .ok_or_else(|| BackendError::rejected(404, "Application not found"))?;
        application.status = status;
        if let Some(remarks) = remarks {
            application.remarks = Some(remarks.to_string());
        }
        Ok(Some(application.clone()))
    }
}

/// Update every verification field the record already carries, keeping its JSON type.
fn write_flags(user: &mut Value, verified: bool) {
    let Some(record) = user.as_object_mut() else {
        return;
    };

    let mut written = false;
    for key in ["isVerified", "verified", "status"] {
        if let Some(flag) = record.get_mut(key) {
            *flag = if flag.is_number() {
                json!(u8::from(verified))
            } else {
                json!(verified)
            };
            written = true;
        }
    }
    if !written {
        record.insert("isVerified".to_string(), json!(verified));
    }
}

#[async_trait]
impl NocBackend for DemoBackend {
    async fn list_applications(&self) -> Result<Vec<Application>, BackendError> {
        Ok(lock(&self.applications).clone())
    }

    async fn application_details(&self, id: &ApplicationId) -> Result<Application, BackendError> {
        lock(&self.applications)
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
        self.transition(id, ApplicationStatus::Forwarded, None)
    }

    async fn reject(
        &self,
        id: &ApplicationId,
        remarks: &str,
    ) -> Result<Option<Application>, BackendError> {
        self.transition(id, ApplicationStatus::Rejected, Some(remarks))
    }
}

#[async_trait]
impl RegistryBackend for DemoBackend {
    async fn list_users(&self) -> Result<Vec<Value>, BackendError> {
        Ok(lock(&self.users).clone())
    }

    async fn verify(&self, _kind: EntityKind, id: &EntityId) -> Result<(), BackendError> {
        self.refuse(&id.0)?;
        self.set_verified(id, true);
        Ok(())
    }

    async fn unverify(&self, _kind: EntityKind, id: &EntityId) -> Result<(), BackendError> {
        self.refuse(&id.0)?;
        self.set_verified(id, false);
        Ok(())
    }

    async fn delete(&self, _kind: EntityKind, id: &EntityId) -> Result<(), BackendError> {
        self.refuse(&id.0)?;
        lock(&self.users).retain(|user| Self::user_id(user).as_deref() != Some(id.0.as_str()));
        Ok(())
    }
}
