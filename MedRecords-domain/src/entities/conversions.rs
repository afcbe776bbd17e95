use med_records_data::models as data;

use crate::entities::{CreateHeartRateRequest, CreatePatientRequest, HeartRate, Patient, PublicUser};

// Conversion functions between domain entities and data models
// These functions follow the pattern convert_to_[target_layer]_[model_name]

fn required<T>(value: Option<T>, field: &str) -> Result<T, String> {
    value.ok_or_else(|| format!("Missing validated field: {}", field))
}

fn non_negative(value: i32, field: &str) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("Out of range value for {}: {}", field, value))
}

/// Convert from data model to domain entity for patient
pub fn convert_to_domain_patient(patient: data::Patient) -> Patient {
    Patient {
        id: patient.id,
        name: patient.name,
        age: patient.age,
        gender: patient.gender,
        doctor: patient.doctor_id,
    }
}

/// Convert a validated create request into a data model owned by `doctor_id`
///
/// Text fields are stored trimmed.
pub fn convert_to_data_new_patient(
    request: CreatePatientRequest,
    doctor_id: i64,
) -> Result<data::NewPatient, String> {
    Ok(data::NewPatient {
        name: required(request.name, "name")?.trim().to_string(),
        age: non_negative(required(request.age, "age")?, "age")?,
        gender: required(request.gender, "gender")?.trim().to_string(),
        doctor_id,
    })
}

/// Convert from data model to domain entity for heart rate
pub fn convert_to_domain_heart_rate(reading: data::HeartRate) -> HeartRate {
    HeartRate {
        id: reading.id,
        patient: reading.patient_id,
        rate: reading.rate,
        recorded_at: reading.recorded_at,
    }
}

/// Convert a validated create request into a data model
pub fn convert_to_data_new_heart_rate(request: CreateHeartRateRequest) -> Result<data::NewHeartRate, String> {
    Ok(data::NewHeartRate {
        patient_id: required(request.patient, "patient")?,
        rate: non_negative(required(request.rate, "rate")?, "rate")?,
    })
}

/// Convert from data model to the public view of an account
pub fn convert_to_public_user(user: data::User) -> PublicUser {
    PublicUser {
        id: user.id,
        username: user.username,
        email: user.email,
        is_doctor: user.is_doctor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_patient_is_trimmed_and_owned() {
        let request = CreatePatientRequest {
            name: Some("  John Doe ".to_string()),
            age: Some(45),
            gender: Some("Male ".to_string()),
        };

        let new_patient = convert_to_data_new_patient(request, 3).unwrap();
        assert_eq!(new_patient.name, "John Doe");
        assert_eq!(new_patient.gender, "Male");
        assert_eq!(new_patient.doctor_id, 3);
    }

    #[test]
    fn test_unvalidated_request_is_an_error() {
        assert!(convert_to_data_new_patient(CreatePatientRequest::default(), 1).is_err());
        assert!(convert_to_data_new_heart_rate(CreateHeartRateRequest {
            patient: Some(1),
            rate: Some(-1),
        })
        .is_err());
    }
}
