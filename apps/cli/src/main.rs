use std::sync::Arc;

use anyhow::bail;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use booking_cell::{
    parse_slot_time, BookingConfig, BookingEngine, BookingError, BookingMode, SlotView,
    SubmitOutcome,
};
use shared_backend::BackendClient;
use shared_config::AppConfig;

#[derive(Parser)]
#[command(name = "clinic-booker", about = "Book or reschedule clinic appointments")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show a doctor's occupied and available slots for a date
    Availability {
        doctor: Uuid,
        date: NaiveDate,
    },
    /// Book a new appointment
    Book {
        doctor: Uuid,
        date: NaiveDate,
        /// Slot start time, HH:MM
        time: String,
        /// Appointment location/type (e.g. ONLINE, IN_PERSON)
        location: String,
        /// Reason for the visit
        reason: String,
    },
    /// Move an existing appointment to a new slot
    Reschedule {
        appointment: Uuid,
        doctor: Uuid,
        date: NaiveDate,
        /// Slot start time, HH:MM
        time: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = AppConfig::from_env();
    if !config.is_configured() {
        bail!("CLINIC_BASE_URL and CLINIC_CSRF_TOKEN must be set");
    }
    let backend = Arc::new(BackendClient::new(&config));

    match cli.command {
        Command::Availability { doctor, date } => {
            let engine = BookingEngine::new(backend, BookingConfig::default(), BookingMode::New);
            engine.set_doctor(doctor).await?;
            let view = engine.set_date(date).await?;
            print_view(&view);
        }
        Command::Book {
            doctor,
            date,
            time,
            location,
            reason,
        } => {
            let engine = BookingEngine::new(backend, BookingConfig::default(), BookingMode::New);
            engine.set_doctor(doctor).await?;
            engine.set_date(date).await?;
            engine.set_location(location);
            engine.set_reason(reason);
            select_and_submit(&engine, &time).await?;
        }
        Command::Reschedule {
            appointment,
            doctor,
            date,
            time,
        } => {
            let engine = BookingEngine::new(
                backend,
                BookingConfig::default(),
                BookingMode::Reschedule {
                    appointment_id: appointment,
                },
            );
            engine.set_doctor(doctor).await?;
            engine.set_date(date).await?;
            select_and_submit(&engine, &time).await?;
        }
    }

    Ok(())
}

async fn select_and_submit(engine: &BookingEngine, time: &str) -> anyhow::Result<()> {
    let Some(start) = parse_slot_time(time) else {
        bail!("Invalid time {:?}, expected HH:MM", time);
    };

    if let Err(e) = engine.select_slot(start) {
        print_view(&engine.view());
        report_error(&e);
        bail!("Slot {} is not available", time);
    }

    match engine.submit().await {
        Ok(SubmitOutcome::Confirmed(message)) => {
            info!("Booking confirmed");
            println!("{}", message);
        }
        Ok(SubmitOutcome::Redirect(url)) => {
            info!("Booking accepted");
            println!("Appointment updated, see {}", url);
        }
        Err(e) => {
            report_error(&e);
            bail!("Submission failed");
        }
    }

    Ok(())
}

fn print_view(view: &SlotView) {
    match view {
        SlotView::Hidden => println!("No availability to show."),
        SlotView::Visible {
            occupied,
            available,
        } => {
            println!("Occupied:");
            for slot in occupied {
                println!("  {} - {}", slot.start.format("%H:%M"), slot.end.format("%H:%M"));
            }
            println!("Available:");
            for slot in available {
                println!("  {} - {}", slot.start.format("%H:%M"), slot.end.format("%H:%M"));
            }
        }
    }
}

fn report_error(error: &BookingError) {
    match error {
        BookingError::Validation(failures) => {
            eprintln!("Please fix the following:");
            for failure in failures {
                eprintln!("  {}", failure);
            }
        }
        other => eprintln!("{}", other),
    }
}
