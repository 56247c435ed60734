pub mod client;

pub use client::{BackendClient, FormResponse};
