use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveTime, Timelike};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_backend::BackendClient;

use crate::error::BookingError;
use crate::models::{
    BookingConfig, BookingField, BookingMode, BookingPhase, BookingState, SlotView, SubmitAck,
    SubmitOutcome, ValidationFailure,
};
use crate::services::availability::AvailabilityService;

const BOOK_PATH: &str = "/patient/dashboard/appointment/book";

/// Client-side booking state engine. Owns the per-session selection state,
/// mediates between caller intents and the availability/booking endpoints,
/// and enforces the booking invariants before anything is submitted.
///
/// One instance per booking session. Callers communicate intents through the
/// operations below and never touch state fields directly. Overlapping
/// availability refreshes are legal; only the most recently issued request
/// may replace the snapshot (sequence numbered, stale completions are
/// discarded regardless of arrival order).
pub struct BookingEngine {
    availability: AvailabilityService,
    backend: Arc<BackendClient>,
    config: BookingConfig,
    mode: BookingMode,
    state: Mutex<BookingState>,
    fetch_seq: AtomicU64,
}

impl BookingEngine {
    pub fn new(backend: Arc<BackendClient>, config: BookingConfig, mode: BookingMode) -> Self {
        Self {
            availability: AvailabilityService::new(Arc::clone(&backend)),
            backend,
            config,
            mode,
            state: Mutex::new(BookingState::default()),
            fetch_seq: AtomicU64::new(0),
        }
    }

    /// Select a doctor and refresh availability. Idempotent when the doctor
    /// is unchanged; otherwise any slot selection is cleared.
    pub async fn set_doctor(&self, doctor_id: Uuid) -> Result<SlotView, BookingError> {
        {
            let mut state = self.lock_state();
            if state.doctor_id == Some(doctor_id) {
                debug!("Doctor {} already selected, nothing to do", doctor_id);
                return Ok(self.view_of(&state));
            }

            debug!("Doctor selected: {}", doctor_id);
            state.doctor_id = Some(doctor_id);
            state.time = None;
            state.phase = BookingPhase::AwaitingAvailability;
        }

        self.refresh_availability().await
    }

    /// Select a date and refresh availability. Dates before the configured
    /// minimum are rejected without touching state.
    pub async fn set_date(&self, date: NaiveDate) -> Result<SlotView, BookingError> {
        if date < self.config.min_date {
            debug!(
                "Rejected date {} before minimum {}",
                date, self.config.min_date
            );
            return Err(BookingError::single(ValidationFailure::new(
                BookingField::Date,
                format!("Date cannot be before {}", self.config.min_date),
            )));
        }

        {
            let mut state = self.lock_state();
            debug!("Date selected: {}", date);
            state.date = Some(date);
            state.time = None;
            state.phase = BookingPhase::AwaitingAvailability;
        }

        self.refresh_availability().await
    }

    pub fn set_location(&self, location: impl Into<String>) {
        let mut state = self.lock_state();
        state.location = Some(location.into());
    }

    pub fn set_reason(&self, reason: impl Into<String>) {
        let mut state = self.lock_state();
        state.reason = Some(reason.into());
    }

    /// Re-fetch the availability snapshot for the current selection.
    ///
    /// Without a doctor this is a guard, not an error: the snapshot is
    /// cleared and the UI told to hide availability. A failed fetch keeps the
    /// prior snapshot so a retry loses nothing, but availability is reported
    /// hidden until a fetch succeeds again.
    pub async fn refresh_availability(&self) -> Result<SlotView, BookingError> {
        let (doctor_id, date, exclude) = {
            let mut state = self.lock_state();
            let Some(doctor_id) = state.doctor_id else {
                debug!("No doctor selected, hiding availability");
                state.snapshot = None;
                state.phase = BookingPhase::Idle;
                return Ok(SlotView::Hidden);
            };
            state.phase = BookingPhase::AwaitingAvailability;
            (
                doctor_id,
                state.date.unwrap_or(self.config.min_date),
                self.mode.excluded_appointment(),
            )
        };

        let seq = self.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Issuing availability fetch {}", seq);

        let result = self
            .availability
            .fetch_snapshot(doctor_id, date, exclude)
            .await;

        let mut state = self.lock_state();
        if seq != self.fetch_seq.load(Ordering::SeqCst) {
            // A newer fetch was issued while this one was in flight.
            debug!("Discarding stale availability result {}", seq);
            return Ok(self.view_of(&state));
        }

        match result {
            Ok(snapshot) => {
                state.snapshot = Some(snapshot);
                state.phase = BookingPhase::AvailabilityLoaded;
                Ok(self.view_of(&state))
            }
            Err(e) => {
                warn!("Availability fetch {} failed: {}", seq, e);
                Err(e)
            }
        }
    }

    /// Pick a time slot. Accepted only when `start` begins an interval in
    /// the current snapshot's available list; anything else leaves the
    /// selection untouched.
    pub fn select_slot(&self, start: NaiveTime) -> Result<(), BookingError> {
        let mut state = self.lock_state();

        let offered = state
            .snapshot
            .as_ref()
            .map(|snapshot| snapshot.has_available_start(start))
            .unwrap_or(false);

        if !offered {
            debug!("Rejected slot {} not offered in current snapshot", start);
            return Err(BookingError::single(ValidationFailure::new(
                BookingField::Time,
                "Please select an available time slot",
            )));
        }

        debug!("Slot selected: {}", start);
        state.time = Some(start);
        state.phase = BookingPhase::SlotSelected;
        Ok(())
    }

    /// Ordered validation failures for the current state. Pure: no side
    /// effects, no network.
    pub fn validate(&self) -> Vec<ValidationFailure> {
        let state = self.lock_state();
        self.validate_state(&state)
    }

    /// Submit the booking or reschedule request. Fails closed: any
    /// validation failure short-circuits before a request is made. A server
    /// rejection leaves the engine retryable without manual cleanup.
    pub async fn submit(&self) -> Result<SubmitOutcome, BookingError> {
        let (path, fields) = {
            let mut state = self.lock_state();

            let failures = self.validate_state(&state);
            if !failures.is_empty() {
                debug!("Submission blocked by {} validation failure(s)", failures.len());
                return Err(BookingError::Validation(failures));
            }

            let (Some(doctor_id), Some(date), Some(time)) =
                (state.doctor_id, state.date, state.time)
            else {
                // validate_state guarantees these are set.
                return Err(BookingError::single(ValidationFailure::new(
                    BookingField::Time,
                    "Please select an available time slot",
                )));
            };

            state.phase = BookingPhase::Submitting;

            // Seconds are always :00; slots carry minute precision only.
            let date_time = format!("{}T{}:00", date.format("%Y-%m-%d"), time.format("%H:%M"));

            match &self.mode {
                BookingMode::New => (
                    BOOK_PATH.to_string(),
                    vec![
                        ("doctorId", doctor_id.to_string()),
                        ("dateTime", date_time),
                        ("location", state.location.clone().unwrap_or_default()),
                        ("reason", state.reason.clone().unwrap_or_default()),
                    ],
                ),
                BookingMode::Reschedule { appointment_id } => (
                    format!("/patient/dashboard/appointment/reschedule/{}", appointment_id),
                    vec![("startTime", date_time)],
                ),
            }
        };

        debug!("Submitting appointment to {}", path);
        let result = self.backend.post_form(&path, &fields).await;

        let mut state = self.lock_state();
        match result {
            Ok(response) => {
                if let Ok(ack) = serde_json::from_str::<SubmitAck>(&response.body) {
                    if !ack.success {
                        warn!("Server declined submission: {}", ack.message);
                        state.phase = BookingPhase::AvailabilityLoaded;
                        return Err(BookingError::Submission(ack.message));
                    }
                    info!("Appointment submitted: {}", ack.message);
                    state.phase = BookingPhase::Submitted;
                    Ok(SubmitOutcome::Confirmed(ack.message))
                } else {
                    info!("Appointment submitted, redirected to {}", response.final_url);
                    state.phase = BookingPhase::Submitted;
                    Ok(SubmitOutcome::Redirect(response.final_url))
                }
            }
            Err(e) => {
                warn!("Submission failed: {}", e);
                state.phase = BookingPhase::AvailabilityLoaded;
                Err(BookingError::Submission(e.to_string()))
            }
        }
    }

    pub fn phase(&self) -> BookingPhase {
        self.lock_state().phase
    }

    pub fn selected_doctor(&self) -> Option<Uuid> {
        self.lock_state().doctor_id
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.lock_state().date
    }

    pub fn selected_time(&self) -> Option<NaiveTime> {
        self.lock_state().time
    }

    /// Current availability view, as last reported to the UI.
    pub fn view(&self) -> SlotView {
        let state = self.lock_state();
        self.view_of(&state)
    }

    // ==============================================================================
    // PRIVATE HELPERS
    // ==============================================================================

    fn lock_state(&self) -> std::sync::MutexGuard<'_, BookingState> {
        // Lock is never held across an await; poisoning would require a
        // panic inside a short critical section.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn validate_state(&self, state: &BookingState) -> Vec<ValidationFailure> {
        let mut failures = Vec::new();

        if state.doctor_id.is_none() {
            failures.push(ValidationFailure::new(
                BookingField::Doctor,
                "Please select a doctor",
            ));
        }

        if state.date.is_none() {
            failures.push(ValidationFailure::new(
                BookingField::Date,
                "Please select a date",
            ));
        }

        match state.time {
            None => failures.push(ValidationFailure::new(
                BookingField::Time,
                "Please select an available time slot",
            )),
            Some(time) => {
                let hour = time.hour();
                if hour >= self.config.lunch_break_start && hour < self.config.lunch_break_end {
                    failures.push(ValidationFailure::new(
                        BookingField::Time,
                        format!(
                            "Cannot book during lunch break ({}:00 - {}:00)",
                            self.config.lunch_break_start, self.config.lunch_break_end
                        ),
                    ));
                } else if let Some(snapshot) = &state.snapshot {
                    if !snapshot.has_available_start(time) {
                        failures.push(ValidationFailure::new(
                            BookingField::Time,
                            "Selected time is no longer available",
                        ));
                    }
                }
            }
        }

        if self.mode == BookingMode::New {
            if state.location.as_deref().map(str::trim).unwrap_or("").is_empty() {
                failures.push(ValidationFailure::new(
                    BookingField::Location,
                    "Please select appointment type",
                ));
            }
            if state.reason.as_deref().map(str::trim).unwrap_or("").is_empty() {
                failures.push(ValidationFailure::new(
                    BookingField::Reason,
                    "Please enter a reason for your visit",
                ));
            }
        }

        failures
    }

    fn view_of(&self, state: &BookingState) -> SlotView {
        let visible = matches!(
            state.phase,
            BookingPhase::AvailabilityLoaded
                | BookingPhase::SlotSelected
                | BookingPhase::Submitting
                | BookingPhase::Submitted
        );

        let Some(snapshot) = state.snapshot.as_ref().filter(|_| visible) else {
            return SlotView::Hidden;
        };

        let lunch = self.config.lunch_interval();

        // The lunch break is always shown as occupied exactly once,
        // whatever the backend reported.
        let mut occupied: Vec<_> = snapshot
            .occupied
            .iter()
            .copied()
            .filter(|slot| *slot != lunch)
            .collect();
        occupied.push(lunch);

        SlotView::Visible {
            occupied,
            available: snapshot.available.clone(),
        }
    }
}
