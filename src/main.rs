use std::{
    error::Error,
    fs::File,
    io::{self, Write},
    process,
    time::Duration,
};

use clap::{command, Parser, Subcommand, ValueHint};
use log::{debug, error, info, LevelFilter};
use veil::Redact;

use tinyspot::{
    client::Client,
    config::Config,
    credentials::Credentials,
    error::ErrorKind,
    playback::{Device, RepeatMode},
    transport::TcpTransport,
};

/// Profile to display when not built in release mode.
#[cfg(debug_assertions)]
const BUILD_PROFILE: &str = "debug";
/// Profile to display when built in release mode.
#[cfg(not(debug_assertions))]
const BUILD_PROFILE: &str = "release";

/// Group name for mutually exclusive logging options.
const ARGS_GROUP_LOGGING: &str = "logging";

/// Scopes needed for everything tinyspot does.
const DEFAULT_SCOPES: &[&str] = &[
    "user-read-playback-state",
    "user-modify-playback-state",
    "user-read-currently-playing",
];

/// Command line arguments as parsed by `clap`.
#[derive(Clone, Parser, Redact)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Secrets file
    ///
    /// TOML with `client_id`, `client_secret` and `refresh_token`. Ensure
    /// that this file is kept secure and not shared publicly, as it
    /// contains credentials that grant control over your Spotify account.
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath, default_value_t = String::from("secrets.toml"), env = "TINYSPOT_SECRETS_FILE")]
    secrets_file: String,

    /// Access token to use instead of refreshing one
    #[arg(long, env = "TINYSPOT_ACCESS_TOKEN", hide_env_values = true)]
    #[redact]
    access_token: Option<String>,

    /// Target device id
    ///
    /// [default: the active device]
    #[arg(short, long, env = "TINYSPOT_DEVICE")]
    device: Option<String>,

    /// Market (two letter country code) for playback queries
    #[arg(short, long, env = "TINYSPOT_MARKET")]
    market: Option<String>,

    /// Network read timeout in seconds
    #[arg(long, default_value_t = 2)]
    timeout: u64,

    /// Do not refresh stale access tokens automatically
    #[arg(long, default_value_t = false)]
    no_auto_refresh: bool,

    /// Skip stray bytes in front of JSON bodies
    #[arg(long, default_value_t = false)]
    toss_until_json: bool,

    /// Suppresses all output except warnings and errors.
    #[arg(short, long, default_value_t = false, group = ARGS_GROUP_LOGGING)]
    quiet: bool,

    /// Enable verbose logging
    ///
    /// Specify twice for trace logging.
    #[arg(short, long, action = clap::ArgAction::Count, group = ARGS_GROUP_LOGGING)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    /// Print the URL to visit to authorize tinyspot
    AuthorizeUrl {
        /// Redirect URI registered for the application
        #[arg(long, default_value = "http://localhost:8888/callback")]
        redirect_uri: String,

        /// Scopes to request
        #[arg(long, value_delimiter = ',')]
        scopes: Vec<String>,
    },

    /// Exchange an authorization code and print the refresh token
    Exchange {
        /// The `code` query parameter of the redirect
        code: String,

        /// Redirect URI used for the authorization
        #[arg(long, default_value = "http://localhost:8888/callback")]
        redirect_uri: String,
    },

    /// Refresh the access token and print it
    Refresh,

    /// Show the item currently playing
    NowPlaying,

    /// Show the player state
    Player,

    /// List available devices
    Devices {
        /// Only show the first device
        #[arg(long, default_value_t = false)]
        first: bool,
    },

    /// Resume playback, or start playing a context
    Play {
        /// Album, artist or playlist URI to play
        #[arg(long, conflicts_with = "body")]
        context_uri: Option<String>,

        /// Raw JSON body of the play request
        #[arg(long)]
        body: Option<String>,
    },

    /// Pause playback
    Pause,

    /// Skip to the next track
    Next,

    /// Skip to the previous track
    Previous,

    /// Seek to a position in the current track
    Seek {
        /// Position in milliseconds
        position_ms: u64,
    },

    /// Set the volume
    Volume {
        /// Volume in percent
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        percent: u8,
    },

    /// Turn shuffle on or off
    Shuffle {
        #[arg(value_parser = clap::builder::BoolishValueParser::new())]
        state: bool,
    },

    /// Set the repeat mode: track, context or off
    Repeat { mode: RepeatMode },

    /// Download an image, such as the album art of the current item
    Image {
        /// HTTPS URL of the image
        #[arg(value_hint = ValueHint::Url)]
        url: String,

        /// Output file; `-` for standard output
        #[arg(short, long, value_hint = ValueHint::FilePath, default_value = "-")]
        output: String,
    },
}

impl Command {
    /// Whether the command can do without a secrets file.
    fn needs_no_secrets(&self, args: &Args) -> bool {
        match self {
            Self::Image { .. } => true,
            Self::AuthorizeUrl { .. } | Self::Exchange { .. } | Self::Refresh => false,
            _ => args.access_token.is_some(),
        }
    }
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
        logger.filter_module(module_path!(), level);
    }

    logger.init();
}

/// Loads the credentials from the secrets file.
///
/// Commands that work without credentials get empty ones when the file
/// does not exist.
fn load_credentials(args: &Args) -> tinyspot::error::Result<Credentials> {
    match Credentials::from_file(&args.secrets_file) {
        Ok(credentials) => Ok(credentials),
        Err(e) if e.kind == ErrorKind::NotFound && args.command.needs_no_secrets(args) => {
            debug!("{}: {e}", args.secrets_file);
            Ok(Credentials::default())
        }
        Err(e) => {
            if e.kind == ErrorKind::NotFound {
                info!(
                    "read the documentation on how to set up {}",
                    args.secrets_file
                );
            }
            Err(e)
        }
    }
}

fn print_device(device: &Device) {
    println!(
        "{}{} ({}) id={} volume={}%{}{}",
        if device.is_active { "* " } else { "  " },
        device.name,
        device.kind,
        device.id,
        device.volume_percent,
        if device.is_private_session { " private" } else { "" },
        if device.is_restricted { " restricted" } else { "" },
    );
}

fn format_ms(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Runs the selected command.
///
/// # Errors
///
/// Returns an error when loading the secrets fails or the command fails.
fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let credentials = load_credentials(&args)?;

    let mut config = Config {
        timeout: Duration::from_secs(args.timeout),
        auto_refresh: !args.no_auto_refresh,
        toss_until_json: args.toss_until_json,
        ..Config::default()
    };
    config.set_market(args.market.as_deref())?;

    let mut client = Client::new(TcpTransport::new()?, credentials, config);
    if let Some(access_token) = &args.access_token {
        client.session_mut().set_bearer_token(access_token, None)?;
    }

    let device = args.device.as_deref();

    match args.command {
        Command::AuthorizeUrl {
            redirect_uri,
            scopes,
        } => {
            let scopes: Vec<&str> = if scopes.is_empty() {
                DEFAULT_SCOPES.to_vec()
            } else {
                scopes.iter().map(String::as_str).collect()
            };
            let url = client.authorize_url(&redirect_uri, &scopes)?;
            println!("{url}");
        }

        Command::Exchange { code, redirect_uri } => {
            let refresh_token = client.request_access_tokens(&code, &redirect_uri)?;
            println!("{refresh_token}");
            info!("store the refresh token in {}", args.secrets_file);
        }

        Command::Refresh => {
            client.refresh_access_token()?;
            println!("{}", client.access_token().unwrap_or_default());
        }

        Command::NowPlaying => {
            let playing = client.get_currently_playing(None)?;
            println!(
                "{} {} - {} ({}) {}/{}",
                if playing.is_playing { ">" } else { "||" },
                playing.first_artist_name,
                playing.track_name,
                playing.album_name,
                format_ms(playing.progress_ms),
                format_ms(playing.duration_ms),
            );
            println!("{}", playing.track_uri);
            if !playing.image_url.is_empty() {
                println!("{}", playing.image_url);
            }
        }

        Command::Player => {
            let details = client.get_player_details(None)?;
            print_device(&details.device);
            println!(
                "{} at {}, shuffle {}, repeat {}",
                if details.is_playing {
                    "playing"
                } else {
                    "paused"
                },
                format_ms(details.progress_ms),
                if details.shuffle_state { "on" } else { "off" },
                details.repeat_state,
            );
        }

        Command::Devices { first } => {
            if first {
                print_device(&client.first_device()?);
            } else {
                for device in &client.devices()? {
                    print_device(device);
                }
            }
        }

        Command::Play { context_uri, body } => {
            let body = match (context_uri, body) {
                (Some(uri), _) => Some(serde_json::json!({ "context_uri": uri }).to_string()),
                (None, body) => body,
            };
            match body {
                Some(body) => client.play_with_body(&body, device)?,
                None => client.play(device)?,
            }
        }

        Command::Pause => client.pause(device)?,
        Command::Next => client.next_track(device)?,
        Command::Previous => client.previous_track(device)?,
        Command::Seek { position_ms } => client.seek(position_ms, device)?,
        Command::Volume { percent } => client.set_volume(percent, device)?,
        Command::Shuffle { state } => client.set_shuffle(state, device)?,
        Command::Repeat { mode } => client.set_repeat_mode(mode, device)?,

        Command::Image { url, output } => {
            let written = if output == "-" {
                let stdout = io::stdout();
                let mut sink = stdout.lock();
                client.get_image(&url, &mut sink)?
            } else {
                let mut sink = File::create(&output)?;
                let written = client.get_image(&url, &mut sink)?;
                sink.flush()?;
                written
            };
            info!("wrote {written} bytes");
        }
    }

    Ok(())
}

/// Main entry point of the application.
///
/// This function initializes the logger facade, parses the command line
/// arguments, and runs the selected command.
fn main() {
    // `clap` handles our command line arguments and help text.
    let args = Args::parse();
    init_logger(&args);

    // Dump command line arguments before we do anything more.
    // This aids in debugging of whatever comes next.
    debug!("Command {:#?}", args);

    let cmd = command!();
    let name = cmd.get_name().to_string();
    let version = cmd.get_version().unwrap_or("UNKNOWN").to_string();

    debug!("starting {name}/{version}; {BUILD_PROFILE}");

    if let Err(e) = run(args) {
        error!("{e}");
        process::exit(1);
    }
}
