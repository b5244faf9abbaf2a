use clap::{Parser, Subcommand};
use curasphere_core::{
    constants::SCHEDULE_FORMAT, AppointmentService, CoreConfig, CredentialService, Database,
    NotificationBroadcaster, SystemClock, UserDirectory,
};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "curasphere")]
#[command(about = "Curasphere hospital backend CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database (if missing) and apply migrations
    InitDb,
    /// Create an administrator account
    CreateAdmin {
        /// Login email
        email: String,
        /// Initial password
        password: String,
        /// Username shown in listings
        username: String,
    },
    /// List today's appointments plus the unfinished backlog
    Due,
    /// List all doctors
    Doctors,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("No command given. Use --help for usage.");
        return Ok(());
    };

    let cfg = Arc::new(CoreConfig::from_lookup(|key| std::env::var(key).ok())?);
    let db = Database::open(cfg.database_url())?;

    match command {
        Commands::InitDb => {
            println!("Database ready at {}", cfg.database_url());
        }
        Commands::CreateAdmin {
            email,
            password,
            username,
        } => {
            let credentials = CredentialService::new(db, cfg, Arc::new(SystemClock));
            match credentials.create_admin(&email, &password, &username) {
                Ok(user) => println!("Created admin {} with ID: {}", user.username, user.id),
                Err(e) => eprintln!("Error creating admin: {}", e),
            }
        }
        Commands::Due => {
            let appointments =
                AppointmentService::new(db, NotificationBroadcaster::new(), Arc::new(SystemClock));
            let due = appointments.list_due_for_nurse()?;
            if due.is_empty() {
                println!("No appointments due.");
            } else {
                for appt in due {
                    println!(
                        "ID: {}, Patient: {}, Time: {}, Type: {}, Status: {}, Urgency: {}",
                        appt.id,
                        appt.patient_id,
                        appt.scheduled_time.format(SCHEDULE_FORMAT),
                        appt.appointment_type,
                        appt.status,
                        appt.urgency_level
                    );
                }
            }
        }
        Commands::Doctors => {
            let doctors = UserDirectory::new(db).list_doctors()?;
            if doctors.is_empty() {
                println!("No doctors found.");
            } else {
                for doctor in doctors {
                    println!(
                        "ID: {}, Name: {}, Status: {}",
                        doctor.id, doctor.full_name, doctor.status
                    );
                }
            }
        }
    }

    Ok(())
}
