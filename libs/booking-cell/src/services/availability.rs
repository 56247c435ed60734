use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use shared_backend::BackendClient;

use crate::error::BookingError;
use crate::models::{
    parse_slot_time, AvailabilityResponse, AvailabilitySnapshot, SlotDto, SlotInterval,
};

/// Fetches per-date availability for a doctor and normalizes the wire
/// payload into an [`AvailabilitySnapshot`].
pub struct AvailabilityService {
    backend: Arc<BackendClient>,
}

impl AvailabilityService {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        Self { backend }
    }

    /// Fetch the snapshot for one (doctor, date) pair. When rescheduling,
    /// `exclude_appointment` keeps the appointment being moved out of the
    /// occupied list.
    pub async fn fetch_snapshot(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        exclude_appointment: Option<Uuid>,
    ) -> Result<AvailabilitySnapshot, BookingError> {
        debug!(
            "Fetching availability for doctor {} on {}",
            doctor_id, date
        );

        let date_str = date.format("%Y-%m-%d").to_string();
        let mut path = format!(
            "/api/doctors/{}/availability?date={}",
            doctor_id,
            urlencoding::encode(&date_str)
        );
        if let Some(appointment_id) = exclude_appointment {
            path.push_str(&format!("&excludeAppointmentId={}", appointment_id));
        }

        let response: AvailabilityResponse = self
            .backend
            .get_json(&path)
            .await
            .map_err(|e| BookingError::AvailabilityFetch(e.to_string()))?;

        let snapshot = AvailabilitySnapshot {
            occupied: parse_intervals(&response.occupied_slots)?,
            available: parse_intervals(&response.available_slots)?,
        };

        debug!(
            "Availability loaded: {} occupied, {} available",
            snapshot.occupied.len(),
            snapshot.available.len()
        );

        Ok(snapshot)
    }
}

fn parse_intervals(slots: &[SlotDto]) -> Result<Vec<SlotInterval>, BookingError> {
    slots
        .iter()
        .map(|slot| {
            let start = parse_slot_time(&slot.start_time).ok_or_else(|| {
                BookingError::AvailabilityFetch(format!(
                    "Malformed slot start time: {:?}",
                    slot.start_time
                ))
            })?;
            let end = parse_slot_time(&slot.end_time).ok_or_else(|| {
                BookingError::AvailabilityFetch(format!(
                    "Malformed slot end time: {:?}",
                    slot.end_time
                ))
            })?;
            Ok(SlotInterval { start, end })
        })
        .collect()
}
