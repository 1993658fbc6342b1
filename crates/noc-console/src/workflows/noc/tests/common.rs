use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::workflows::noc::{
    Application, ApplicationId, ApplicationStatus, BackendError, Filmmaker, ForwardPayload,
    NocBackend, NocReviewService, RecipientCatalog,
};

pub(super) fn application(id: &str, number: &str, status: ApplicationStatus) -> Application {
    Application {
        id: ApplicationId::from(id),
        application_number: number.to_string(),
        status,
        filmmaker: Filmmaker {
            name: "Asha Verma".to_string(),
            email: "asha@studio.in".to_string(),
        },
        created_at: Utc
            .with_ymd_and_hms(2024, 3, 1, 9, 30, 0)
            .single()
            .expect("valid timestamp"),
        remarks: None,
    }
}

pub(super) fn submitted() -> Application {
    application("a1", "NOC-2024-0042", ApplicationStatus::Submitted)
}

pub(super) fn catalog() -> Arc<RecipientCatalog> {
    Arc::new(RecipientCatalog::standard())
}

pub(super) fn build_service(
    applications: Vec<Application>,
) -> (NocReviewService<MemoryBackend>, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::with_applications(applications));
    let service = NocReviewService::new(backend.clone(), catalog());
    (service, backend)
}

/// In-memory authority backend with call recording and failure injection.
#[derive(Default)]
pub(super) struct MemoryBackend {
    applications: Mutex<Vec<Application>>,
    calls: Mutex<Vec<String>>,
    forwarded: Mutex<Vec<(ApplicationId, ForwardPayload)>>,
    forward_failure: Mutex<Option<BackendError>>,
    reject_failure: Mutex<Option<BackendError>>,
    echo: bool,
}

impl MemoryBackend {
    pub(super) fn with_applications(applications: Vec<Application>) -> Self {
        Self {
            applications: Mutex::new(applications),
            echo: true,
            ..Self::default()
        }
    }

    /// Confirm transitions without returning the application.
    pub(super) fn silent(applications: Vec<Application>) -> Self {
        Self {
            echo: false,
            ..Self::with_applications(applications)
        }
    }

    pub(super) fn fail_forward(&self, error: BackendError) {
        *self.forward_failure.lock().expect("failure mutex poisoned") = Some(error);
    }

    pub(super) fn fail_reject(&self, error: BackendError) {
        *self.reject_failure.lock().expect("failure mutex poisoned") = Some(error);
    }

    pub(super) fn set_status(&self, id: &str, status: ApplicationStatus) {
        let mut guard = self.applications.lock().expect("backend mutex poisoned");
        if let Some(application) = guard.iter_mut().find(|app| app.id.0 == id) {
            application.status = status;
        }
    }

    pub(super) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("call mutex poisoned").clone()
    }

    pub(super) fn forwarded(&self) -> Vec<(ApplicationId, ForwardPayload)> {
        self.forwarded.lock().expect("forward mutex poisoned").clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("call mutex poisoned").push(call);
    }

    fn transition(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
        remarks: Option<&str>,
    ) -> Result<Option<Application>, BackendError> {
        let mut guard = self.applications.lock().expect("backend mutex poisoned");
        let application = guard
            .iter_mut()
            .find(|application| &application.id == id)
            .ok_or_else(|| BackendError::rejected(404, "Application not found"))?;
        application.status = status;
        if let Some(remarks) = remarks {
            application.remarks = Some(remarks.to_string());
        }
        Ok(self.echo.then(|| application.clone()))
    }
}

#[async_trait]
impl NocBackend for MemoryBackend {
    async fn list_applications(&self) -> Result<Vec<Application>, BackendError> {
        self.record("list".to_string());
        Ok(self
            .applications
            .lock()
            .expect("backend mutex poisoned")
            .clone())
    }

    async fn application_details(&self, id: &ApplicationId) -> Result<Application, BackendError> {
        self.record(format!("details {id}"));
        self.applications
            .lock()
            .expect("backend mutex poisoned")
            .iter()
            .find(|application| &application.id == id)
            .cloned()
            .ok_or_else(|| BackendError::rejected(404, "Application not found"))
    }

    async fn forward(
        &self,
        id: &ApplicationId,
        payload: &ForwardPayload,
    ) -> Result<Option<Application>, BackendError> {
        self.record(format!("forward {id}"));
        if let Some(error) = self.forward_failure.lock().expect("failure mutex poisoned").clone() {
            return Err(error);
        }
        self.forwarded
            .lock()
            .expect("forward mutex poisoned")
            .push((id.clone(), payload.clone()));
        self.transition(id, ApplicationStatus::Forwarded, None)
    }

    async fn reject(
        &self,
        id: &ApplicationId,
        remarks: &str,
    ) -> Result<Option<Application>, BackendError> {
        self.record(format!("reject {id}"));
        if let Some(error) = self.reject_failure.lock().expect("failure mutex poisoned").clone() {
            return Err(error);
        }
        self.transition(id, ApplicationStatus::Rejected, Some(remarks))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
