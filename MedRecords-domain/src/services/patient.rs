use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use med_records_data::database::DatabasePool;
use med_records_data::repository::{PatientRepository, PatientRepositoryTrait};

use crate::auth::logging::log_access_denied;
use crate::auth::AuthenticatedUser;
use crate::entities::conversions;
use crate::entities::{CreatePatientRequest, Patient};
use crate::services::bulk::{create_with_hook, FieldErrors, Payload};
use crate::services::{ResourceScope, ServiceError};

/// Trait for patient service operations
#[async_trait]
pub trait PatientServiceTrait: Send + Sync {
    /// Create one or many patients owned by the caller
    async fn create_patients(
        &self,
        caller: &AuthenticatedUser,
        payload: Payload<CreatePatientRequest>,
    ) -> Result<Payload<Patient>, ServiceError>;

    /// List the patients visible to the caller
    async fn list_patients(&self, caller: &AuthenticatedUser) -> Result<Vec<Patient>, ServiceError>;

    /// Get one patient visible to the caller
    async fn get_patient(&self, caller: &AuthenticatedUser, id: i64) -> Result<Patient, ServiceError>;
}

/// Patient service for domain logic
pub struct PatientService {
    repository: Arc<dyn PatientRepositoryTrait>,
    scope: ResourceScope,
}

impl PatientService {
    /// Create a new patient service
    pub fn new(repository: Arc<dyn PatientRepositoryTrait>, scope: ResourceScope) -> Self {
        Self { repository, scope }
    }
}

#[async_trait]
impl PatientServiceTrait for PatientService {
    async fn create_patients(
        &self,
        caller: &AuthenticatedUser,
        payload: Payload<CreatePatientRequest>,
    ) -> Result<Payload<Patient>, ServiceError> {
        if !caller.is_doctor {
            log_access_denied(&caller.user_id.to_string(), "/patients/", "Only doctors can create patients");
            return Err(ServiceError::permission_denied());
        }

        let doctor_id = caller.user_id;
        let count = payload.len();
        let repository = Arc::clone(&self.repository);

        let created = create_with_hook(
            payload,
            |_| FieldErrors::new(),
            |request| conversions::convert_to_data_new_patient(request, doctor_id),
            |records| async move {
                let rows = repository.create_many(records).await?;
                Ok::<Vec<Patient>, ServiceError>(
                    rows.into_iter().map(conversions::convert_to_domain_patient).collect(),
                )
            },
        )
        .await?;

        info!("Doctor {} created {} patient(s)", doctor_id, count);
        Ok(created)
    }

    async fn list_patients(&self, caller: &AuthenticatedUser) -> Result<Vec<Patient>, ServiceError> {
        let owner = self.scope.owner_filter(caller);
        debug!("Listing patients with owner filter {:?}", owner);

        let rows = self.repository.list(owner).await?;
        Ok(rows.into_iter().map(conversions::convert_to_domain_patient).collect())
    }

    async fn get_patient(&self, caller: &AuthenticatedUser, id: i64) -> Result<Patient, ServiceError> {
        let owner = self.scope.owner_filter(caller);

        self.repository
            .get_by_id(id, owner)
            .await?
            .map(conversions::convert_to_domain_patient)
            .ok_or_else(|| ServiceError::NotFound(format!("Patient with ID {} not found", id)))
    }
}

/// Create a patient service backed by the SQLite repository
pub fn create_patient_service(pool: DatabasePool, scope: ResourceScope) -> PatientService {
    PatientService::new(Arc::new(PatientRepository::new(pool)), scope)
}
