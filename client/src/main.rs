mod cli;

use clap::Parser;
use cli::{Cli, Commands, PatientCommands, PredictionCommands, RecordCommands, UserCommands};
use client::api::EegUpload;
use client::session::FileCredentialStore;
use client::tracker::TrackedUpload;
use client::{Api, ClientConfig, NotificationRegistry, PollError, ProcessingTracker, Session, SessionEvent};
use serde::Serialize;
use shared::{
    CreatePatientRequest, CreateUserRequest, EegRecord, EegRecordFilter, EegStatus, Patient,
    PatientFilter, PredictionResult,
};
use std::error::Error;

type CliResult = Result<(), Box<dyn Error>>;

#[tokio::main]
async fn main() {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(2);
        }
    };
    log::debug!("Using API at {}", config.api_base_url);

    let session = Session::new(FileCredentialStore::new(config.credential_path()));
    let mut session_events = session.subscribe();

    let outcome = match Api::from_config(&config, session) {
        Ok(api) => run(cli, &api, &config).await,
        Err(e) => Err(e.into()),
    };

    while let Ok(SessionEvent::Unauthorized { reason }) = session_events.try_recv() {
        eprintln!("Your session expired ({}). Run `neuroscreen login` to sign in again.", reason);
    }

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, api: &Api, config: &ClientConfig) -> CliResult {
    let json = cli.json;

    match cli.command {
        Commands::Login { email, password } => {
            let response = api.auth().login(&email, &password).await?;
            match response.user {
                Some(user) => println!("Signed in as {} ({})", user.email, user.role),
                None => println!("Signed in as {}", email),
            }
        }
        Commands::Logout => {
            api.auth().logout().await?;
            println!("Signed out");
        }
        Commands::Whoami => {
            let me = api.auth().me().await?;
            if json {
                print_json(&me)?;
            } else {
                println!("{} <{}> [{}]", me.name, me.email, me.role);
            }
        }
        Commands::Users { command } => users(api, command, json).await?,
        Commands::Patients { command } => patients(api, command, json).await?,
        Commands::Records { command } => records(api, command, json).await?,
        Commands::Predictions { command } => match command {
            PredictionCommands::List => {
                let predictions = api.predictions().list().await?;
                print_list(&predictions, json, prediction_line)?;
            }
            PredictionCommands::Get { id } => {
                let prediction = api.predictions().get(&id).await?;
                print_one(&prediction, json, prediction_line)?;
            }
        },
        Commands::Upload { file, patient, watch } => {
            let me = api.auth().me().await?;
            let patient = api.patients().get(&patient).await?;
            let upload = EegUpload::from_path(&file, &patient.id, &me.id).await?;

            let tracker = ProcessingTracker::new(api.eeg_records(), config.poll);
            let tracked = tracker.track_upload(upload, patient.full_name()).await?;
            println!("Uploaded {} as record {}", tracked.record.file_name, tracked.record.id);

            if watch {
                follow(api, &tracker, tracked).await?;
            }
        }
        Commands::Watch { record } => {
            let record = api.eeg_records().get(&record).await?;
            let patient_name = match api.patients().get(&record.patient_id).await {
                Ok(patient) => patient.full_name(),
                Err(e) => {
                    log::warn!("Could not load patient {}: {}", record.patient_id, e);
                    record.patient_id.clone()
                }
            };

            let tracker = ProcessingTracker::new(api.eeg_records(), config.poll);
            let tracked = tracker.track_existing(record, patient_name);
            follow(api, &tracker, tracked).await?;
        }
    }

    Ok(())
}

async fn users(api: &Api, command: UserCommands, json: bool) -> CliResult {
    let me = api.auth().me().await?;
    if !me.is_admin() {
        return Err(format!("{} is not an administrator", me.email).into());
    }

    let users = api.users();
    match command {
        UserCommands::List => {
            let all = users.list().await?;
            print_list(&all, json, |u| format!("{:>6}  {:<30} {} {} [{}]", u.id, u.email, u.first_name, u.last_name, u.role))?;
        }
        UserCommands::Get { id } => {
            let user = users.get(&id).await?;
            print_json(&user)?;
        }
        UserCommands::Create {
            email,
            password,
            first_name,
            last_name,
            role,
        } => {
            let request = CreateUserRequest {
                email,
                password,
                first_name,
                last_name,
                role,
            };
            let created = users.create(&request).await?;
            println!("Created user {} ({})", created.id, created.email);
        }
        UserCommands::Delete { id } => {
            users.delete(&id).await?;
            println!("Deleted user {}", id);
        }
    }
    Ok(())
}

async fn patients(api: &Api, command: PatientCommands, json: bool) -> CliResult {
    let patients = api.patients();
    match command {
        PatientCommands::List {
            identification_number,
            first_name,
            last_name,
            with_records,
            pending,
        } => {
            let filter = PatientFilter {
                identification_number,
                first_name,
                last_name,
                has_eeg_records: with_records.then_some(true),
                has_pending_eeg: pending.then_some(true),
            };
            let found = patients.list(&filter).await?;
            print_list(&found, json, patient_line)?;
        }
        PatientCommands::Get { id } => {
            let patient = patients.get(&id).await?;
            print_one(&patient, json, patient_line)?;
        }
        PatientCommands::Create {
            identification_number,
            first_name,
            last_name,
            birth_date,
        } => {
            let request = CreatePatientRequest {
                identification_number,
                first_name,
                last_name,
                birth_date,
            };
            let created = patients.create(&request).await?;
            println!("Created patient {} ({})", created.id, created.full_name());
        }
        PatientCommands::Delete { id } => {
            patients.delete(&id).await?;
            println!("Deleted patient {}", id);
        }
        PatientCommands::Records { id } => {
            let records = patients.eeg_records(&id).await?;
            print_list(&records, json, record_line)?;
        }
        PatientCommands::Predictions { id } => {
            let predictions = patients.predictions(&id).await?;
            print_list(&predictions, json, prediction_line)?;
        }
    }
    Ok(())
}

async fn records(api: &Api, command: RecordCommands, json: bool) -> CliResult {
    let records = api.eeg_records();
    match command {
        RecordCommands::List { patient, status } => {
            let filter = EegRecordFilter {
                patient_id: patient,
                status,
            };
            let found = records.list(&filter).await?;
            print_list(&found, json, record_line)?;
        }
        RecordCommands::Get { id } => {
            let record = records.get(&id).await?;
            print_one(&record, json, record_line)?;
        }
        RecordCommands::Status { id } => {
            let summary = records.status(&id).await?;
            if json {
                print_json(&summary)?;
            } else {
                match summary.progress {
                    Some(progress) => println!("{}: {} ({:.0}%)", summary.id, summary.status, progress),
                    None => println!("{}: {}", summary.id, summary.status),
                }
                if let Some(error) = summary.error_message {
                    println!("  error: {}", error);
                }
            }
        }
        RecordCommands::Prediction { id } => {
            let prediction = records.prediction(&id).await?;
            print_one(&prediction, json, prediction_line)?;
        }
        RecordCommands::Delete { id } => {
            records.delete(&id).await?;
            println!("Deleted record {}", id);
        }
    }
    Ok(())
}

/// Re-renders the notifications until the tracked record settles.
async fn follow(api: &Api, tracker: &ProcessingTracker, tracked: TrackedUpload) -> CliResult {
    let id = tracked.record.id.clone();
    let mut updates = tracker.subscribe();
    render(&updates.borrow_and_update());

    let finished = tracked.finished();
    tokio::pin!(finished);

    let outcome = loop {
        tokio::select! {
            outcome = &mut finished => break outcome,
            changed = updates.changed() => {
                if changed.is_err() {
                    break Err(PollError::Cancelled);
                }
                render(&updates.borrow_and_update());
            }
        }
    };
    render(&tracker.snapshot());

    match outcome {
        Ok(record) if record.status == EegStatus::Processed => {
            match api.eeg_records().prediction(&id).await {
                Ok(prediction) => println!("{}", prediction_line(&prediction)),
                Err(e) => log::warn!("Record {} processed but prediction unavailable: {}", id, e),
            }
            Ok(())
        }
        Ok(_) => Err(format!("processing of record {} failed", id).into()),
        Err(e) => Err(e.into()),
    }
}

fn render(registry: &NotificationRegistry) {
    if !registry.is_empty() {
        println!("{}\n", registry);
    }
}

fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_one<T: Serialize>(value: &T, json: bool, line: impl Fn(&T) -> String) -> CliResult {
    if json {
        print_json(value)
    } else {
        println!("{}", line(value));
        Ok(())
    }
}

fn print_list<T: Serialize>(values: &[T], json: bool, line: impl Fn(&T) -> String) -> CliResult {
    if json {
        return print_json(&values);
    }
    if values.is_empty() {
        println!("(none)");
    }
    for value in values {
        println!("{}", line(value));
    }
    Ok(())
}

fn patient_line(patient: &Patient) -> String {
    format!(
        "{:>6}  {:<14} {}",
        patient.id,
        patient.identification_number,
        patient.full_name()
    )
}

fn record_line(record: &EegRecord) -> String {
    format!(
        "{:>6}  {:<32} {:<8} {:>10} B  {}",
        record.id, record.file_name, record.file_type, record.file_size_bytes, record.status
    )
}

fn prediction_line(prediction: &PredictionResult) -> String {
    format!(
        "{:>6}  record {:<6} {} ({:.1}% confidence, model {})",
        prediction.id,
        prediction.eeg_record_id,
        prediction.result.label(),
        prediction.confidence_percent(),
        prediction.model_version
    )
}
