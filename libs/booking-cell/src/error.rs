use thiserror::Error;

use crate::models::ValidationFailure;

/// Every failure the booking engine can surface. All variants are
/// recoverable: validation is corrected by the user, fetch and submission
/// failures by retrying the triggering operation.
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Validation failed: {}", format_failures(.0))]
    Validation(Vec<ValidationFailure>),

    #[error("Failed to load availability: {0}")]
    AvailabilityFetch(String),

    #[error("Appointment submission rejected: {0}")]
    Submission(String),
}

impl BookingError {
    pub fn single(failure: ValidationFailure) -> Self {
        BookingError::Validation(vec![failure])
    }
}

fn format_failures(failures: &[ValidationFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
