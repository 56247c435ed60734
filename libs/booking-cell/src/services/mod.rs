pub mod availability;
pub mod engine;

pub use availability::AvailabilityService;
pub use engine::BookingEngine;
