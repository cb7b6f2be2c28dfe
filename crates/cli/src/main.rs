use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use careslot_core::{
    config::prepare_data_dir, constants::DEFAULT_SEED_DAYS, Appointment, AppointmentId,
    BookingService, CoreConfig, DoctorId, PatientId, SlotDate, DEFAULT_DATA_DIR,
};

#[derive(Parser)]
#[command(name = "careslot")]
#[command(about = "careslot appointment booking CLI")]
struct Cli {
    /// Directory holding the booking snapshot
    #[arg(long, env = "CARESLOT_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a fresh id for a doctor, patient or appointment
    NewId,
    /// Set a doctor's specialization, creating the doctor if needed
    SetSpecialization {
        /// Doctor id
        doctor_id: String,
        /// Specialization, e.g. "Cardiology"
        specialization: String,
    },
    /// Publish a slot
    AddSlot {
        /// Doctor id
        doctor_id: String,
        /// Date (YYYY-MM-DD)
        date: String,
        /// Time (HH:MM)
        time: String,
    },
    /// Withdraw a slot
    RemoveSlot {
        /// Doctor id
        doctor_id: String,
        /// Date (YYYY-MM-DD)
        date: String,
        /// Time (HH:MM)
        time: String,
    },
    /// Publish the evening clinic (17:00 to 22:00, Fridays off) for the coming days
    SeedSlots {
        /// Doctor id
        doctor_id: String,
        /// Start after this date (YYYY-MM-DD, default today)
        #[arg(long)]
        from: Option<String>,
        /// Number of days to seed
        #[arg(long, default_value_t = DEFAULT_SEED_DAYS)]
        days: u32,
    },
    /// List bookable slots
    Slots {
        /// Doctor id
        doctor_id: String,
        /// Only this date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "within_days")]
        date: Option<String>,
        /// Days ahead of today to include
        #[arg(long)]
        within_days: Option<u32>,
    },
    /// Book a place on a slot
    Book {
        /// Patient id
        patient_id: String,
        /// Doctor id
        doctor_id: String,
        /// Date (YYYY-MM-DD)
        date: String,
        /// Time (HH:MM)
        time: String,
    },
    /// Cancel an appointment
    Cancel {
        /// Patient id
        patient_id: String,
        /// Appointment id
        appointment_id: String,
    },
    /// List a patient's appointments
    Appointments {
        /// Patient id
        patient_id: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'careslot --help' for commands");
        return Ok(());
    };
    if let Commands::NewId = command {
        println!("{}", PatientId::generate());
        return Ok(());
    }

    prepare_data_dir(&cli.data_dir)?;
    let cfg = CoreConfig::new(
        Some(cli.data_dir),
        careslot_core::constants::DEFAULT_BOOKING_WINDOW_DAYS,
    )?;
    let service = BookingService::open(Arc::new(cfg))?;

    match command {
        Commands::NewId => {}
        Commands::SetSpecialization {
            doctor_id,
            specialization,
        } => {
            let doctor_id = DoctorId::parse(&doctor_id)?;
            match service.set_specialization(doctor_id, &specialization) {
                Ok(profile) => println!(
                    "Doctor {} specialization: {}",
                    profile.id, profile.specialization
                ),
                Err(e) => eprintln!("Error setting specialization: {}", e),
            }
        }
        Commands::AddSlot {
            doctor_id,
            date,
            time,
        } => {
            let doctor_id = DoctorId::parse(&doctor_id)?;
            match service.add_slot(doctor_id, &date, &time) {
                Ok(slots) => println!("Added slot {date} {time}; doctor now has {} slots", slots.len()),
                Err(e) => eprintln!("Error adding slot: {}", e),
            }
        }
        Commands::RemoveSlot {
            doctor_id,
            date,
            time,
        } => {
            let doctor_id = DoctorId::parse(&doctor_id)?;
            match service.remove_slot(doctor_id, &date, &time) {
                Ok(slots) => println!(
                    "Removed slot {date} {time}; doctor now has {} slots",
                    slots.len()
                ),
                Err(e) => eprintln!("Error removing slot: {}", e),
            }
        }
        Commands::SeedSlots {
            doctor_id,
            from,
            days,
        } => {
            let doctor_id = DoctorId::parse(&doctor_id)?;
            let from = match from {
                Some(date) => SlotDate::parse(&date)?,
                None => careslot_core::today(),
            };
            match service.seed_slots(doctor_id, from, days) {
                Ok(added) => println!("Seeded {added} slots over {days} days after {from}"),
                Err(e) => eprintln!("Error seeding slots: {}", e),
            }
        }
        Commands::Slots {
            doctor_id,
            date,
            within_days,
        } => {
            let doctor_id = DoctorId::parse(&doctor_id)?;
            let slots = match date {
                Some(date) => service.available_slots_on(doctor_id, &date),
                None => service.available_slots(doctor_id, careslot_core::today(), within_days),
            };
            match slots {
                Ok(slots) if slots.is_empty() => println!("No bookable slots."),
                Ok(slots) => {
                    for slot in slots {
                        println!(
                            "{} {} ({} places left)",
                            slot.date, slot.time, slot.available_spots
                        );
                    }
                }
                Err(e) => eprintln!("Error listing slots: {}", e),
            }
        }
        Commands::Book {
            patient_id,
            doctor_id,
            date,
            time,
        } => {
            let patient_id = PatientId::parse(&patient_id)?;
            let doctor_id = DoctorId::parse(&doctor_id)?;
            match service.book(patient_id, doctor_id, &date, &time) {
                Ok(appointment) => println!("Booked appointment {}", appointment.id),
                Err(e) => eprintln!("Error booking appointment: {}", e),
            }
        }
        Commands::Cancel {
            patient_id,
            appointment_id,
        } => {
            let patient_id = PatientId::parse(&patient_id)?;
            let appointment_id = AppointmentId::parse(&appointment_id)?;
            match service.cancel(appointment_id, patient_id) {
                Ok(appointment) => println!("Cancelled appointment {}", appointment.id),
                Err(e) => eprintln!("Error cancelling appointment: {}", e),
            }
        }
        Commands::Appointments { patient_id } => {
            let patient_id = PatientId::parse(&patient_id)?;
            let appointments = service.appointments_for_patient(patient_id);
            if appointments.is_empty() {
                println!("No appointments found.");
            } else {
                for appointment in appointments {
                    println!("{}", describe(&appointment));
                }
            }
        }
    }

    Ok(())
}

fn describe(appointment: &Appointment) -> String {
    format!(
        "ID: {}, Doctor: {}, When: {} {}, Status: {}",
        appointment.id, appointment.doctor_id, appointment.date, appointment.time, appointment.status
    )
}
