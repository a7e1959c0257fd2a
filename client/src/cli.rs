use clap::{Parser, Subcommand};
use shared::{EegStatus, Role};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "neuroscreen")]
#[command(about = "NeuroScreen EEG screening client", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Print records as JSON instead of a summary
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the session token
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },

    /// End the session and forget the stored token
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Manage dashboard accounts (administrators only)
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },

    Patients {
        #[command(subcommand)]
        command: PatientCommands,
    },

    Records {
        #[command(subcommand)]
        command: RecordCommands,
    },

    Predictions {
        #[command(subcommand)]
        command: PredictionCommands,
    },

    /// Upload an EEG file for classification
    Upload {
        #[arg(required = true)]
        file: PathBuf,

        #[arg(short, long)]
        patient: String,

        /// Follow processing until the record settles
        #[arg(short, long)]
        watch: bool,
    },

    /// Follow processing of an existing record
    Watch {
        #[arg(required = true)]
        record: String,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    List,
    Get {
        id: String,
    },
    Create {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(short, long, default_value = "user")]
        role: Role,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand)]
pub enum PatientCommands {
    List {
        #[arg(long)]
        identification_number: Option<String>,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        /// Only patients with at least one EEG record
        #[arg(long)]
        with_records: bool,

        /// Only patients with an EEG record still being processed
        #[arg(long)]
        pending: bool,
    },
    Get {
        id: String,
    },
    Create {
        #[arg(long)]
        identification_number: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        /// ISO date, e.g. 1984-03-21
        #[arg(long)]
        birth_date: Option<String>,
    },
    Delete {
        id: String,
    },
    /// EEG records uploaded for a patient
    Records {
        id: String,
    },
    /// Predictions produced for a patient
    Predictions {
        id: String,
    },
}

#[derive(Subcommand)]
pub enum RecordCommands {
    List {
        #[arg(short, long)]
        patient: Option<String>,

        #[arg(short, long)]
        status: Option<EegStatus>,
    },
    Get {
        id: String,
    },
    Status {
        id: String,
    },
    Prediction {
        id: String,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand)]
pub enum PredictionCommands {
    List,
    Get { id: String },
}
