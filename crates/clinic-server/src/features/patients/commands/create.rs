//! Create patient command

use std::sync::Arc;

use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::db::{PatientStore, StoreError};
use crate::features::shared::validation::{
    validate_age, validate_contact, validate_person_name, AgeValidationError,
    ContactValidationError, PersonNameValidationError,
};
use crate::models::{Gender, NewPatient, PatientView};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatientCommand {
    #[serde(default)]
    pub name: String,
    pub age: i32,
    /// One of `Male`, `Female`, `NotSpecified`, `Other`
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub contact: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CreatePatientError {
    #[error(transparent)]
    Name(#[from] PersonNameValidationError),

    #[error(transparent)]
    Age(#[from] AgeValidationError),

    #[error("Gender must be one of Male, Female, NotSpecified, Other.")]
    Gender(String),

    #[error(transparent)]
    Contact(#[from] ContactValidationError),

    #[error("Database error: {0}")]
    Store(#[from] StoreError),
}

impl Request<Result<PatientView, CreatePatientError>> for CreatePatientCommand {}

impl CreatePatientCommand {
    /// Check every field and build the store input
    pub fn validate(&self) -> Result<NewPatient, CreatePatientError> {
        validate_person_name(&self.name, "Name")?;
        validate_age(self.age)?;
        let gender: Gender = self.gender.parse().map_err(CreatePatientError::Gender)?;
        validate_contact(&self.contact)?;

        Ok(NewPatient {
            name: self.name.clone(),
            age: self.age,
            gender,
            contact: self.contact.clone(),
        })
    }
}

#[tracing::instrument(skip(store, command), fields(name = %command.name))]
pub async fn handle(
    store: Arc<dyn PatientStore>,
    command: CreatePatientCommand,
) -> Result<PatientView, CreatePatientError> {
    let patient = command.validate()?;
    let record = store.create(&patient).await?;

    tracing::info!(patient_id = record.id, "Patient created");

    Ok(PatientView::from(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::InMemoryPatientStore;

    fn command() -> CreatePatientCommand {
        CreatePatientCommand {
            name: "Ada Lovelace".to_string(),
            age: 36,
            gender: "Female".to_string(),
            contact: "+44(20)7946-0000".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_ids() {
        let store = Arc::new(InMemoryPatientStore::new());

        let first = handle(store.clone(), command()).await.unwrap();
        let second = handle(store, command()).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.gender, "Female");
    }

    #[test]
    fn test_name_with_digits_is_rejected() {
        let cmd = CreatePatientCommand {
            name: "R2D2".to_string(),
            ..command()
        };
        assert!(matches!(
            cmd.validate(),
            Err(CreatePatientError::Name(PersonNameValidationError::ContainsDigits))
        ));
    }

    #[test]
    fn test_age_bounds() {
        let too_old = CreatePatientCommand {
            age: 121,
            ..command()
        };
        assert_eq!(
            too_old.validate().unwrap_err().to_string(),
            "Age cannot be greater than 120."
        );

        let edge = CreatePatientCommand {
            age: 120,
            ..command()
        };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_unknown_gender_is_rejected() {
        let cmd = CreatePatientCommand {
            gender: "female".to_string(),
            ..command()
        };
        assert!(matches!(cmd.validate(), Err(CreatePatientError::Gender(_))));
    }

    #[test]
    fn test_contact_with_letters_is_rejected() {
        let cmd = CreatePatientCommand {
            contact: "call me".to_string(),
            ..command()
        };
        assert!(matches!(cmd.validate(), Err(CreatePatientError::Contact(_))));
    }
}
