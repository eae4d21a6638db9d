use std::{error::Error, io, path::Path, process, sync::Arc};

use clap::{command, Parser, ValueHint};
use log::{debug, error, info, LevelFilter};

use vidcat::{
    config::{Config, Settings},
    credentials::Credentials,
    gateway::Gateway,
    provider::{Provider, Response},
    router::Request,
    session::Session,
};

/// Profile to display when not built in release mode.
#[cfg(debug_assertions)]
const BUILD_PROFILE: &str = "debug";
/// Profile to display when not built release mode.
#[cfg(not(debug_assertions))]
const BUILD_PROFILE: &str = "release";

/// Group name for mutually exclusive logging options.
const ARGS_GROUP_LOGGING: &str = "logging";

/// Command line arguments as parsed by `clap`.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Request to handle, for example `/search/?q=cats`
    #[arg(value_name = "REQUEST")]
    request: String,

    /// Secrets file
    ///
    /// Holds the username and password of the account. Ensure that this file
    /// is kept secure and not shared publicly. Without it, requests are made
    /// anonymously.
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath, default_value_t = String::from("secrets.toml"))]
    secrets_file: String,

    /// Settings file
    ///
    /// [default: built-in settings]
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath, env = "VIDCAT_SETTINGS")]
    settings_file: Option<String>,

    /// Suppresses all output except warnings and errors.
    #[arg(short, long, default_value_t = false, group = ARGS_GROUP_LOGGING)]
    quiet: bool,

    /// Enable verbose logging
    ///
    /// Specify twice for trace logging.
    #[arg(short, long, action = clap::ArgAction::Count, group = ARGS_GROUP_LOGGING)]
    verbose: u8,
}

/// Initializes the logger facade.
///
/// The logging level is determined as follows, in order of precedence from
/// highest to lowest:
/// 1. Command line arguments
/// 2. `RUST_LOG` environment variable
/// 3. Hard coded default
///
/// # Panics
///
/// Panics when a logger facade is already initialized.
fn init_logger(config: &Args) {
    let mut logger = env_logger::Builder::from_env(
        // Note: if you change the default logging level here, then you should
        // probably also change the verbosity levels below.
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    if config.quiet || config.verbose > 0 {
        let level = match config.verbose {
            0 => {
                // Quiet and verbose are mutually exclusive, and `verbose` is 0
                // by default. So this arm means: quiet mode.
                LevelFilter::Warn
            }
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        // Filter log messages of external crates.
        logger.filter_module("vidcat", level);
    }

    logger.init();
}

/// Loads the credentials, if there is a secrets file.
///
/// # Errors
///
/// Returns an error if the secrets file exists but cannot be read or is
/// invalid.
fn load_credentials(secrets_file: &str) -> vidcat::error::Result<Option<Credentials>> {
    match Credentials::from_file(secrets_file) {
        Ok(credentials) => Ok(Some(credentials)),
        Err(e) if e.kind == vidcat::error::ErrorKind::NotFound => {
            info!("no secrets in {secrets_file}, continuing anonymously");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn load_settings(settings_file: Option<&str>) -> vidcat::error::Result<Settings> {
    match settings_file {
        Some(path) if Path::new(path).exists() => Settings::from_file(path),
        Some(path) => Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("settings file {path} not found"),
        )
        .into()),
        None => Ok(Settings::default()),
    }
}

/// Prints the outcome of a request to standard output.
async fn print(response: Response) {
    match response {
        Response::Menu(entries) => {
            for entry in entries {
                println!("{}\t{}", entry.path, entry.label);
            }
        }
        Response::Listing {
            items,
            next_page_token,
        } => {
            for item in items {
                println!("{}\t{}\t{}", item.kind(), item.reference(), item.title());
            }
            if !next_page_token.is_empty() {
                println!("next page: {next_page_token}");
            }
        }
        Response::Queue { items, start } => {
            for (index, item) in items.iter().enumerate().skip(start) {
                println!("{index}\t{}\t{}", item.id(), item.title());
            }
        }
        Response::Play(playback) => {
            println!("{}\t{}p\t{}", playback.video_id, playback.stream.height, playback.stream.url);
            if let Some(task) = playback.auto_remove {
                if let Err(e) = task.await {
                    error!("{e}");
                }
            }
        }
        Response::Done => {}
        Response::Refresh => info!("listing changed"),
        Response::Notification { message, .. } => eprintln!("{message}"),
        Response::LoginRequired { message } => {
            eprintln!("{message}");
            info!("check the credentials in the secrets file");
        }
    }
}

/// Handles one request.
///
/// # Errors
///
/// Returns an error when the configuration is invalid or the user
/// interrupts the request. Errors of the request itself are printed as
/// notifications.
async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let credentials = load_credentials(&args.secrets_file)?;
    let settings = load_settings(args.settings_file.as_deref())?;
    let config = Config::new(settings)?;

    let gateway = Gateway::new(&config)?;
    let session = Session::new(Arc::new(gateway), credentials);
    let mut provider = Provider::new(session, config.settings)?;

    let request = Request::parse(&args.request);
    let handle = provider.handle_with_progress(&request, |count, total| {
        debug!("resolved {count}/{total} items");
    });

    tokio::select! {
        // Prioritize shutdown signals.
        biased;

        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
            Err("interrupted".into())
        }

        response = handle => {
            print(response).await;
            Ok(())
        }
    }
}

/// Main entry point of the application.
///
/// This function initializes the logger facade, parses the command line
/// arguments, and handles the request.
#[tokio::main]
async fn main() {
    // `clap` handles our command line arguments and help text.
    let args = Args::parse();
    init_logger(&args);

    // Dump command line arguments before we do anything more.
    // This aids in debugging of whatever comes next.
    debug!("Command {:#?}", args);

    let cmd = command!();
    let name = cmd.get_name().to_string();
    let version = cmd.get_version().unwrap_or("UNKNOWN").to_string();
    let lang = String::from("en");

    info!("starting {name}/{version}; {BUILD_PROFILE}; {lang}");

    if let Err(e) = run(args).await {
        error!("{e}");
        process::exit(1);
    }
}
