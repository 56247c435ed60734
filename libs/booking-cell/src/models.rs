use std::fmt;

use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

/// Session-immutable booking rules. Hours are whole clock hours; the lunch
/// break applies regardless of what the backend reports as available.
#[derive(Debug, Clone)]
pub struct BookingConfig {
    pub working_hours_start: u32,
    pub working_hours_end: u32,
    pub lunch_break_start: u32,
    pub lunch_break_end: u32,
    pub slot_interval_minutes: u32,
    pub min_date: NaiveDate,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            working_hours_start: 9,
            working_hours_end: 17,
            lunch_break_start: 13,
            lunch_break_end: 14,
            slot_interval_minutes: 30,
            min_date: Utc::now().date_naive(),
        }
    }
}

impl BookingConfig {
    pub fn lunch_interval(&self) -> SlotInterval {
        SlotInterval {
            start: NaiveTime::from_hms_opt(self.lunch_break_start, 0, 0)
                .unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(self.lunch_break_end, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Whether this session creates a new appointment or moves an existing one.
/// Rescheduling excludes the appointment being moved from availability
/// fetches so its own slot shows up as free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingMode {
    New,
    Reschedule { appointment_id: Uuid },
}

impl BookingMode {
    pub fn excluded_appointment(&self) -> Option<Uuid> {
        match self {
            BookingMode::New => None,
            BookingMode::Reschedule { appointment_id } => Some(*appointment_id),
        }
    }
}

/// Lifecycle of one booking session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingPhase {
    Idle,
    AwaitingAvailability,
    AvailabilityLoaded,
    SlotSelected,
    Submitting,
    Submitted,
}

/// Per-session selection state. Mutated only through engine operations.
#[derive(Debug, Clone, Default)]
pub struct BookingState {
    pub doctor_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub location: Option<String>,
    pub reason: Option<String>,
    pub snapshot: Option<AvailabilitySnapshot>,
    pub phase: BookingPhase,
}

impl Default for BookingPhase {
    fn default() -> Self {
        BookingPhase::Idle
    }
}

/// One half-open bookable interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotInterval {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Occupied and available intervals for one (doctor, date) pair, as of the
/// last successful fetch. Replaced wholesale on every fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilitySnapshot {
    pub occupied: Vec<SlotInterval>,
    pub available: Vec<SlotInterval>,
}

impl AvailabilitySnapshot {
    pub fn has_available_start(&self, start: NaiveTime) -> bool {
        self.available.iter().any(|slot| slot.start == start)
    }
}

/// What the UI should render after an availability-affecting operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotView {
    Hidden,
    Visible {
        occupied: Vec<SlotInterval>,
        available: Vec<SlotInterval>,
    },
}

/// Fields a validation failure can point at, for per-field error styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingField {
    Doctor,
    Date,
    Time,
    Location,
    Reason,
}

impl fmt::Display for BookingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BookingField::Doctor => "doctor",
            BookingField::Date => "date",
            BookingField::Time => "time",
            BookingField::Location => "location",
            BookingField::Reason => "reason",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub field: BookingField,
    pub message: String,
}

impl ValidationFailure {
    pub fn new(field: BookingField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Successful submission result. Rescheduling lands on a redirect target the
/// caller should navigate to; booking may instead answer with a JSON
/// confirmation message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Confirmed(String),
    Redirect(String),
}

// ==============================================================================
// Wire format
// ==============================================================================

/// Availability payload as served by
/// `GET /api/doctors/{doctorId}/availability`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    #[serde(default)]
    pub occupied_slots: Vec<SlotDto>,
    #[serde(default)]
    pub available_slots: Vec<SlotDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDto {
    pub start_time: String,
    pub end_time: String,
}

/// JSON acknowledgement some booking deployments answer with instead of a
/// redirect.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAck {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// Parse a wire clock time, tolerating a trailing seconds component
/// (`HH:MM` or `HH:MM:SS`).
pub fn parse_slot_time(raw: &str) -> Option<NaiveTime> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .ok()
}
