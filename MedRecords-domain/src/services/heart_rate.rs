use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use med_records_data::database::DatabasePool;
use med_records_data::repository::{
    HeartRateRepository, HeartRateRepositoryTrait, PatientRepository, PatientRepositoryTrait,
    RepositoryError,
};

use crate::auth::AuthenticatedUser;
use crate::entities::conversions;
use crate::entities::{CreateHeartRateRequest, HeartRate};
use crate::services::bulk::{create_with_hook, FieldErrors, Payload};
use crate::services::{ResourceScope, ServiceError, ValidationFailure};

/// Trait for heart rate service operations
#[async_trait]
pub trait HeartRateServiceTrait: Send + Sync {
    /// Record one or many readings for patients visible to the caller
    async fn create_heart_rates(
        &self,
        caller: &AuthenticatedUser,
        payload: Payload<CreateHeartRateRequest>,
    ) -> Result<Payload<HeartRate>, ServiceError>;

    /// List the readings visible to the caller
    async fn list_heart_rates(&self, caller: &AuthenticatedUser) -> Result<Vec<HeartRate>, ServiceError>;

    /// Get one reading visible to the caller
    async fn get_heart_rate(&self, caller: &AuthenticatedUser, id: i64) -> Result<HeartRate, ServiceError>;
}

/// Heart rate service for domain logic
///
/// Readings are scoped through their patient, so the patient repository is consulted
/// to decide which patient references a caller may use.
pub struct HeartRateService {
    heart_rates: Arc<dyn HeartRateRepositoryTrait>,
    patients: Arc<dyn PatientRepositoryTrait>,
    scope: ResourceScope,
}

impl HeartRateService {
    /// Create a new heart rate service
    pub fn new(
        heart_rates: Arc<dyn HeartRateRepositoryTrait>,
        patients: Arc<dyn PatientRepositoryTrait>,
        scope: ResourceScope,
    ) -> Self {
        Self {
            heart_rates,
            patients,
            scope,
        }
    }
}

fn unknown_patient(patient: i64) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.insert(
        "patient".to_string(),
        vec![format!("Invalid pk \"{}\" - object does not exist.", patient)],
    );
    errors
}

/// `{"patient": [...]}` when the referenced patient is unknown to the caller
fn patient_must_exist(request: &CreateHeartRateRequest, visible: &HashSet<i64>) -> FieldErrors {
    match request.patient {
        Some(patient) if !visible.contains(&patient) => unknown_patient(patient),
        _ => FieldErrors::new(),
    }
}

/// Patient errors for an insert that lost a referenced patient after the prefetch
///
/// `referenced` holds one patient id per record in request order. Items whose patient
/// is still visible stay clean unless none can be singled out.
async fn vanished_patients(
    patients: &dyn PatientRepositoryTrait,
    referenced: &[i64],
    owner: Option<i64>,
    is_batch: bool,
) -> ServiceError {
    let mut unique = referenced.to_vec();
    unique.sort_unstable();
    unique.dedup();

    let visible: HashSet<i64> = match patients.existing_ids(&unique, owner).await {
        Ok(ids) => ids.into_iter().collect(),
        Err(e) => return e.into(),
    };
    let flag_all = referenced.iter().all(|id| visible.contains(id));

    let mut errors: Vec<FieldErrors> = referenced
        .iter()
        .map(|&id| {
            if flag_all || !visible.contains(&id) {
                unknown_patient(id)
            } else {
                FieldErrors::new()
            }
        })
        .collect();

    let failure = if is_batch {
        ValidationFailure::Batch(errors)
    } else {
        ValidationFailure::Single(errors.pop().unwrap_or_default())
    };
    ServiceError::Validation(failure)
}

#[async_trait]
impl HeartRateServiceTrait for HeartRateService {
    async fn create_heart_rates(
        &self,
        caller: &AuthenticatedUser,
        payload: Payload<CreateHeartRateRequest>,
    ) -> Result<Payload<HeartRate>, ServiceError> {
        let owner = self.scope.owner_filter(caller);

        let mut requested: Vec<i64> = payload.iter().filter_map(|r| r.patient).collect();
        requested.sort_unstable();
        requested.dedup();

        let visible: HashSet<i64> = self
            .patients
            .existing_ids(&requested, owner)
            .await?
            .into_iter()
            .collect();
        debug!(
            "{} of {} referenced patient(s) visible to user {}",
            visible.len(),
            requested.len(),
            caller.user_id
        );

        let count = payload.len();
        let is_batch = payload.is_batch();
        let repository = Arc::clone(&self.heart_rates);
        let patients = Arc::clone(&self.patients);

        let created = create_with_hook(
            payload,
            |request| patient_must_exist(request, &visible),
            conversions::convert_to_data_new_heart_rate,
            |records| async move {
                let referenced: Vec<i64> = records.iter().map(|r| r.patient_id).collect();
                match repository.create_many(records).await {
                    Ok(rows) => Ok::<Vec<HeartRate>, ServiceError>(
                        rows.into_iter().map(conversions::convert_to_domain_heart_rate).collect(),
                    ),
                    Err(RepositoryError::ForeignKeyViolation(message)) => {
                        warn!("Patient removed while readings were being stored: {}", message);
                        Err(vanished_patients(patients.as_ref(), &referenced, owner, is_batch).await)
                    }
                    Err(e) => Err(e.into()),
                }
            },
        )
        .await?;

        info!("User {} recorded {} heart rate reading(s)", caller.user_id, count);
        Ok(created)
    }

    async fn list_heart_rates(&self, caller: &AuthenticatedUser) -> Result<Vec<HeartRate>, ServiceError> {
        let owner = self.scope.owner_filter(caller);
        debug!("Listing heart rates with owner filter {:?}", owner);

        let rows = self.heart_rates.list(owner).await?;
        Ok(rows.into_iter().map(conversions::convert_to_domain_heart_rate).collect())
    }

    async fn get_heart_rate(&self, caller: &AuthenticatedUser, id: i64) -> Result<HeartRate, ServiceError> {
        let owner = self.scope.owner_filter(caller);

        self.heart_rates
            .get_by_id(id, owner)
            .await?
            .map(conversions::convert_to_domain_heart_rate)
            .ok_or_else(|| ServiceError::NotFound(format!("Heart rate with ID {} not found", id)))
    }
}

/// Create a heart rate service backed by the SQLite repositories
pub fn create_heart_rate_service(pool: DatabasePool, scope: ResourceScope) -> HeartRateService {
    HeartRateService::new(
        Arc::new(HeartRateRepository::new(pool.clone())),
        Arc::new(PatientRepository::new(pool)),
        scope,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use med_records_data::models::{HeartRate as HeartRateRow, NewHeartRate};

    use crate::entities::CreatePatientRequest;
    use crate::services::PatientServiceTrait;
    use crate::testing::TestContext;

    /// Deletes the last referenced patient just before the insert runs
    struct PatientRemovedMidway {
        patients: PatientRepository,
        inner: HeartRateRepository,
    }

    #[async_trait]
    impl HeartRateRepositoryTrait for PatientRemovedMidway {
        async fn create_many(&self, readings: Vec<NewHeartRate>) -> Result<Vec<HeartRateRow>, RepositoryError> {
            if let Some(last) = readings.last() {
                self.patients.delete(last.patient_id).await?;
            }
            self.inner.create_many(readings).await
        }

        async fn list(&self, doctor_id: Option<i64>) -> Result<Vec<HeartRateRow>, RepositoryError> {
            self.inner.list(doctor_id).await
        }

        async fn get_by_id(&self, id: i64, doctor_id: Option<i64>) -> Result<Option<HeartRateRow>, RepositoryError> {
            self.inner.get_by_id(id, doctor_id).await
        }
    }

    fn reading(patient: i64, rate: i32) -> CreateHeartRateRequest {
        CreateHeartRateRequest {
            patient: Some(patient),
            rate: Some(rate),
        }
    }

    async fn add_patient(ctx: &TestContext, doctor: &AuthenticatedUser) -> i64 {
        let created = ctx
            .patient_service(ResourceScope::Caller)
            .create_patients(
                doctor,
                Payload::Single(CreatePatientRequest {
                    name: Some("Ann".to_string()),
                    age: Some(30),
                    gender: Some("Female".to_string()),
                }),
            )
            .await
            .unwrap();
        match created {
            Payload::Single(patient) => patient.id,
            Payload::Batch(_) => panic!("expected a single patient"),
        }
    }

    #[tokio::test]
    async fn test_create_and_list_reading() {
        let ctx = TestContext::new();
        let doctor = ctx.create_user("doctor", true).await;
        let patient = add_patient(&ctx, &doctor).await;
        let service = ctx.heart_rate_service(ResourceScope::Caller);

        let created = service
            .create_heart_rates(&doctor, Payload::Single(reading(patient, 72)))
            .await
            .unwrap();
        let Payload::Single(created) = created else {
            panic!("expected a single reading");
        };

        let listed = service.list_heart_rates(&doctor).await.unwrap();
        assert_eq!(listed, vec![created.clone()]);
        assert_eq!(listed[0].rate, 72);
        assert_eq!(service.get_heart_rate(&doctor, created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_unknown_patient_is_a_field_error() {
        let ctx = TestContext::new();
        let doctor = ctx.create_user("doctor", true).await;
        let service = ctx.heart_rate_service(ResourceScope::Caller);

        let result = service
            .create_heart_rates(&doctor, Payload::Single(reading(99, 72)))
            .await;

        match result {
            Err(ServiceError::Validation(ValidationFailure::Single(errors))) => {
                assert_eq!(
                    errors["patient"],
                    vec!["Invalid pk \"99\" - object does not exist."]
                );
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_other_doctors_patient_depends_on_scope() {
        let ctx = TestContext::new();
        let alice = ctx.create_user("alice", true).await;
        let bob = ctx.create_user("bob", true).await;
        let patient = add_patient(&ctx, &alice).await;

        let scoped = ctx.heart_rate_service(ResourceScope::Caller);
        let batch = Payload::Batch(vec![reading(patient, 60), reading(patient, 61)]);
        match scoped.create_heart_rates(&bob, batch).await {
            Err(ServiceError::Validation(ValidationFailure::Batch(errors))) => {
                assert!(errors.iter().all(|e| e.contains_key("patient")));
            }
            other => panic!("expected batch validation failure, got {:?}", other),
        }

        let global = ctx.heart_rate_service(ResourceScope::Global);
        let created = global
            .create_heart_rates(&bob, Payload::Batch(vec![reading(patient, 60)]))
            .await
            .unwrap();
        assert_eq!(created.len(), 1);

        assert!(scoped.list_heart_rates(&bob).await.unwrap().is_empty());
        assert_eq!(scoped.list_heart_rates(&alice).await.unwrap().len(), 1);
        assert_eq!(global.list_heart_rates(&bob).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_rate_and_patient_are_required() {
        let ctx = TestContext::new();
        let doctor = ctx.create_user("doctor", true).await;
        let service = ctx.heart_rate_service(ResourceScope::Caller);

        let result = service
            .create_heart_rates(&doctor, Payload::Single(CreateHeartRateRequest::default()))
            .await;

        match result {
            Err(ServiceError::Validation(ValidationFailure::Single(errors))) => {
                assert_eq!(errors["patient"], vec!["This field is required."]);
                assert_eq!(errors["rate"], vec!["This field is required."]);
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_patient_deleted_during_insert_is_a_field_error() {
        let ctx = TestContext::new();
        let doctor = ctx.create_user("doctor", true).await;
        let kept = add_patient(&ctx, &doctor).await;
        let removed = add_patient(&ctx, &doctor).await;

        let service = HeartRateService::new(
            Arc::new(PatientRemovedMidway {
                patients: PatientRepository::new(ctx.pool.clone()),
                inner: HeartRateRepository::new(ctx.pool.clone()),
            }),
            Arc::new(PatientRepository::new(ctx.pool.clone())),
            ResourceScope::Caller,
        );

        let batch = Payload::Batch(vec![reading(kept, 60), reading(removed, 61)]);
        match service.create_heart_rates(&doctor, batch).await {
            Err(ServiceError::Validation(ValidationFailure::Batch(errors))) => {
                assert!(errors[0].is_empty());
                assert_eq!(errors[1], unknown_patient(removed));
            }
            other => panic!("expected batch validation failure, got {:?}", other),
        }
        assert!(service.list_heart_rates(&doctor).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_referencing_more_patients_than_sqlite_variables() {
        let ctx = TestContext::new();
        let doctor = ctx.create_user("doctor", true).await;
        let patient = add_patient(&ctx, &doctor).await;
        let service = ctx.heart_rate_service(ResourceScope::Caller);

        let mut readings: Vec<CreateHeartRateRequest> =
            (1..=40_000).map(|i| reading(patient + i, 70)).collect();
        readings.push(reading(patient, 70));

        match service.create_heart_rates(&doctor, Payload::Batch(readings)).await {
            Err(ServiceError::Validation(ValidationFailure::Batch(errors))) => {
                assert_eq!(errors.len(), 40_001);
                assert_eq!(errors[0], unknown_patient(patient + 1));
                assert!(errors[40_000].is_empty());
            }
            other => panic!("expected batch validation failure, got {:?}", other),
        }
    }
}
