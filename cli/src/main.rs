use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tripbook::app::{App, AppError};
use tripbook::config::{ClientConfig, ConfigError};
use tripbook::error::ApiError;
use tripbook::guard::{self, Access};
use tripbook::net::api::TripsBackend;
use tripbook::net::types::{Accommodation, Activity, Address, ImageUpload, Registration, Transportation, TripDraft};
use tripbook::state::ui::Outcome;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    App(#[from] AppError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("request failed: {0}")]
    Api(#[from] ApiError),
    #[error("failed to read {path}: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("invalid {field} {value:?}: expected {expected}")]
    InvalidField { field: &'static str, value: String, expected: &'static str },
    #[error("not authorized for this command")]
    Unauthorized,
    #[error("{0}")]
    Rejected(String),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "tripbook", about = "Travel booking client: sessions, trips and live favorites")]
struct Cli {
    #[arg(long, env = "TRIPBOOK_API_URL")]
    api_url: Option<String>,

    #[arg(long, env = "TRIPBOOK_PUSH_URL")]
    push_url: Option<String>,

    #[arg(long, env = "TRIPBOOK_STATE_FILE", help = "File holding the persisted session")]
    state_file: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "TRIPBOOK_PASSWORD")]
        password: String,
    },
    Register(RegisterArgs),
    Logout,
    Refresh,
    /// Print the current session.
    Whoami,
    Trips(TripsCommand),
    /// Toggle the favorite state of a trip.
    Favorite {
        trip_id: String,
    },
    /// Print live favorite counts for a trip until interrupted.
    Watch {
        trip_id: String,
    },
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    email: String,
    #[arg(long, env = "TRIPBOOK_PASSWORD")]
    password: String,
    #[arg(long)]
    confirm_password: String,
    #[arg(long, default_value = "")]
    country: String,
    #[arg(long, default_value = "")]
    city: String,
    #[arg(long, default_value = "")]
    street: String,
    #[arg(long, default_value = "")]
    zip: String,
}

#[derive(Args, Debug)]
struct TripsCommand {
    #[command(subcommand)]
    command: TripsSubcommand,
}

#[derive(Subcommand, Debug)]
enum TripsSubcommand {
    List,
    Show {
        trip_id: String,
    },
    /// Create a trip (admin only).
    Create(CreateTripArgs),
}

#[derive(Args, Debug)]
struct CreateTripArgs {
    #[arg(long)]
    title: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long, default_value = "")]
    location: String,
    #[arg(long, default_value = "")]
    start_date: String,
    #[arg(long, default_value = "")]
    end_date: String,
    #[arg(long, default_value_t = 0.0)]
    budget: f64,
    #[arg(long = "image", help = "Image file to upload; repeatable")]
    images: Vec<PathBuf>,
    #[arg(long = "tag")]
    tags: Vec<String>,
    #[arg(long = "accommodation", help = "name|address|checkIn|checkOut; repeatable")]
    accommodation: Vec<String>,
    #[arg(long = "activity", help = "name|description|location; repeatable")]
    activities: Vec<String>,
    #[arg(long = "transport", help = "name|description; repeatable")]
    transportation: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = ClientConfig::from_lookup(|key| match key {
        "TRIPBOOK_API_URL" => cli.api_url.clone(),
        "TRIPBOOK_PUSH_URL" => cli.push_url.clone(),
        "TRIPBOOK_STATE_FILE" => cli.state_file.clone(),
        _ => std::env::var(key).ok(),
    })?;
    let app = App::from_config(config)?;

    let command = cli.command.name();
    tracing::info!(command, api = %app.config.api_url, "dispatching");
    let result = run(&app, cli.command).await;
    match &result {
        Ok(()) => tracing::debug!(command, "command finished"),
        Err(error) => tracing::error!(command, %error, "command failed"),
    }
    result
}

async fn run(app: &App, command: Command) -> Result<(), CliError> {
    match command {
        Command::Login { email, password } => report(&app.auth().login(&email, &password).await),
        Command::Register(args) => report(&app.auth().register(args.into_registration()).await),
        Command::Logout => {
            app.auth().logout().await;
            println!("logged out");
            Ok(())
        }
        Command::Refresh => {
            let response = app.auth().refresh().await?;
            println!("{}", response.message);
            Ok(())
        }
        Command::Whoami => run_whoami(app),
        Command::Trips(trips) => run_trips(app, trips).await,
        Command::Favorite { trip_id } => run_favorite(app, &trip_id).await,
        Command::Watch { trip_id } => run_watch(app, &trip_id).await,
    }
}

impl Command {
    /// Name for logs. Arguments are left out so passwords never reach them.
    fn name(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::Register(_) => "register",
            Self::Logout => "logout",
            Self::Refresh => "refresh",
            Self::Whoami => "whoami",
            Self::Trips(TripsCommand { command: TripsSubcommand::List }) => "trips list",
            Self::Trips(TripsCommand { command: TripsSubcommand::Show { .. } }) => "trips show",
            Self::Trips(TripsCommand { command: TripsSubcommand::Create(_) }) => "trips create",
            Self::Favorite { .. } => "favorite",
            Self::Watch { .. } => "watch",
        }
    }
}

fn run_whoami(app: &App) -> Result<(), CliError> {
    let session = app.session.snapshot();
    if !session.is_authenticated() {
        println!("not logged in");
        return Ok(());
    }
    let user = &session.user;
    println!("{} <{}> id={} role={}", user.display_name(), user.email, user.id, user.role);
    Ok(())
}

async fn run_trips(app: &App, trips: TripsCommand) -> Result<(), CliError> {
    match trips.command {
        TripsSubcommand::List => {
            for trip in app.api.list_trips().await? {
                println!("{}\t{}\t{}\t{}", trip.id, trip.title, trip.location, trip.budget);
            }
            Ok(())
        }
        TripsSubcommand::Show { trip_id } => {
            let trip = app.api.get_trip(&trip_id).await?;
            print_json(&serde_json::to_value(&trip)?)
        }
        TripsSubcommand::Create(args) => {
            // Check before reading image files from disk.
            let access = guard::admin_only(&app.session.snapshot());
            if access != Access::Granted {
                tracing::warn!(?access, "trip creation refused before upload");
                return Err(CliError::Unauthorized);
            }
            let draft = args.into_draft()?;
            report(&app.add_trip(&draft).await)
        }
    }
}

async fn run_favorite(app: &App, trip_id: &str) -> Result<(), CliError> {
    let mut view = app.open_trip(trip_id).await?;
    let outcome = view.toggle().await;
    view.unmount().await;
    report(&outcome)
}

async fn run_watch(app: &App, trip_id: &str) -> Result<(), CliError> {
    let mut view = app.open_trip(trip_id).await?;
    println!("watching {trip_id} (favorite: {}); ctrl-c to stop", view.is_favorite());
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            count = view.count_changed() => match count {
                Some(count) => println!("{trip_id}\t{count}"),
                None => {
                    tracing::warn!(%trip_id, "push channel closed");
                    eprintln!("push channel closed");
                    break;
                }
            },
        }
    }
    view.unmount().await;
    Ok(())
}

/// Print an outcome the way a toast would show it. Error notices fail the
/// command.
fn report(outcome: &Outcome) -> Result<(), CliError> {
    if let Some(notice) = &outcome.notice {
        if notice.is_error() {
            if let Some(route) = &outcome.redirect {
                eprintln!("next: {route}");
            }
            return Err(CliError::Rejected(notice.to_string()));
        }
        println!("{notice}");
    }
    if let Some(route) = &outcome.redirect {
        println!("next: {route}");
    }
    Ok(())
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

impl RegisterArgs {
    fn into_registration(self) -> Registration {
        Registration {
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            password: self.password,
            confirm_password: self.confirm_password,
            address: Address { country: self.country, city: self.city, street: self.street, zip: self.zip },
        }
    }
}

impl CreateTripArgs {
    fn into_draft(self) -> Result<TripDraft, CliError> {
        let images = self.images.iter().map(|path| read_image(path)).collect::<Result<Vec<_>, _>>()?;
        let accommodation = self
            .accommodation
            .iter()
            .map(|raw| {
                let [name, address, check_in, check_out] = split_fields::<4>("accommodation", raw)?;
                Ok(Accommodation { name, address, check_in, check_out })
            })
            .collect::<Result<Vec<_>, CliError>>()?;
        let activities = self
            .activities
            .iter()
            .map(|raw| {
                let [name, description, location] = split_fields::<3>("activity", raw)?;
                Ok(Activity { name, description, location })
            })
            .collect::<Result<Vec<_>, CliError>>()?;
        let transportation = self
            .transportation
            .iter()
            .map(|raw| {
                let [name, description] = split_fields::<2>("transport", raw)?;
                Ok(Transportation { name, description })
            })
            .collect::<Result<Vec<_>, CliError>>()?;

        Ok(TripDraft {
            title: self.title,
            description: self.description,
            location: self.location,
            start_date: self.start_date,
            end_date: self.end_date,
            budget: self.budget,
            images,
            tags: self.tags,
            accommodation,
            activities,
            transportation,
        })
    }
}

fn read_image(path: &Path) -> Result<ImageUpload, CliError> {
    let bytes = std::fs::read(path).map_err(|source| CliError::ReadFile { path: path.to_owned(), source })?;
    let file_name = path.file_name().map_or_else(|| "image".to_owned(), |n| n.to_string_lossy().into_owned());
    Ok(ImageUpload { file_name, bytes })
}

/// Split a `a|b|c` argument into exactly `N` trimmed fields.
fn split_fields<const N: usize>(field: &'static str, raw: &str) -> Result<[String; N], CliError> {
    let parts = raw.split('|').map(|p| p.trim().to_owned()).collect::<Vec<_>>();
    <[String; N]>::try_from(parts).map_err(|_| CliError::InvalidField {
        field,
        value: raw.to_owned(),
        expected: match N {
            2 => "2 fields separated by '|'",
            3 => "3 fields separated by '|'",
            _ => "4 fields separated by '|'",
        },
    })
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
