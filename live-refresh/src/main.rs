use clap::Parser;
use live_refresh::{
    RefreshController,
    control::{Command, UnknownCommand},
    indicator::{AlwaysConfirm, Prompt},
    page::{self, Document, SharedPage},
};
use log::*;
#[cfg(debug_assertions)]
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::{
    append::rolling_file::{
        RollingFileAppender,
        policy::compound::{
            CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
        },
    },
    config::{Appender, Config as LogConfig, Logger, Root},
    encode::pattern::PatternEncoder,
};
use score_common::{
    config::{Config, TickAction},
    scores_api::ScoresApiClient,
};
use std::{
    error::Error,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

const APP_NAME: &str = "live-refresh";

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// JSON file describing the page to keep fresh, read again on every reload
    page: PathBuf,

    #[clap(long)]
    /// Update live match cards on each tick instead of reloading the page
    sweep: bool,

    #[clap(long)]
    /// Base URL of the score tracker, overrides the config file
    url: Option<String>,

    #[clap(long)]
    /// Don't require HTTPS to connect to the score tracker
    allow_http: bool,

    #[clap(long)]
    /// Clicking the indicator turns auto-refresh off without asking
    no_confirm: bool,

    #[clap(long)]
    /// Config file to use instead of the one in the default location
    config: Option<PathBuf>,

    #[clap(long, short, action(clap::ArgAction::Count))]
    /// Increase the log verbosity
    verbose: u8,

    #[clap(long)]
    /// Directory within which log files will be placed, default is platform dependent
    log_location: Option<PathBuf>,

    #[clap(long, default_value = "5000000")]
    /// Max size in bytes that a log file is allowed to reach before being rolled over
    log_max_file_size: u64,

    #[clap(long, default_value = "3")]
    /// Number of archived logs to keep
    num_old_logs: u32,
}

/// A line typed at the terminal
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Command(Command),
    Status,
    Help,
    Quit,
}

fn parse_input(line: &str) -> Result<Input, UnknownCommand> {
    match line.trim().to_ascii_lowercase().as_str() {
        "status" | "" => Ok(Input::Status),
        "help" | "?" => Ok(Input::Help),
        "quit" | "exit" => Ok(Input::Quit),
        other => other.parse().map(Input::Command),
    }
}

/// Asks the operator on the terminal
struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn confirm(&self, message: &str) -> bool {
        print!("{message} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match io::stdin().read_line(&mut answer) {
            Ok(_) => matches!(
                answer.trim().to_ascii_lowercase().as_str(),
                "y" | "yes" | "o" | "oui"
            ),
            Err(e) => {
                error!("Failed to read confirmation: {e}");
                false
            }
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();

    init_logging(&args)?;

    let mut config = load_config(args.config.as_deref());
    if args.sweep {
        config.refresh.tick_action = TickAction::Sweep;
    }
    if let Some(url) = &args.url {
        config.scores_api.url = url.clone();
    }
    if args.allow_http {
        config.scores_api.require_https = false;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    info!("Loading page from {}", args.page.display());
    let page = page::share(Document::load(&args.page)?);

    let client = ScoresApiClient::new(
        &config.scores_api.url,
        config.scores_api.require_https,
        config.scores_api.connect_timeout,
    )?;
    info!("Using score tracker at {}", client.base_url());

    let prompt: Box<dyn Prompt> = if args.no_confirm {
        Box::new(AlwaysConfirm)
    } else {
        Box::new(StdinPrompt)
    };
    let controller = RefreshController::new(
        page.clone(),
        Arc::new(client),
        prompt,
        &config,
        runtime.handle().clone(),
    );
    controller.decide_initial_activation();

    print_page(&page);
    print_help();

    // Reads a line at a time so the confirmation prompt can read stdin too
    let mut line = String::new();
    loop {
        line.clear();
        if io::stdin().read_line(&mut line)? == 0 {
            info!("Input closed, exiting");
            break;
        }
        match parse_input(&line) {
            Ok(Input::Command(command)) => {
                controller.execute(command);
                print_page(&page);
            }
            Ok(Input::Status) => print_page(&page),
            Ok(Input::Help) => print_help(),
            Ok(Input::Quit) => break,
            Err(e) => println!("{e}, type `help` for a list of commands"),
        }
    }

    controller.disable();
    runtime.shutdown_background();
    Ok(())
}

fn print_page(page: &SharedPage<Document>) {
    print!("{}", page::lock(page));
}

fn print_help() {
    println!("Commands:");
    for command in Command::ALL {
        println!("  {:10} {}", command.name(), command.description());
    }
    println!("  {:10} show the page", "status");
    println!("  {:10} exit", "quit");
}

fn load_config(path: Option<&Path>) -> Config {
    if let Some(path) = path {
        info!("Reading config file from {path:?}");
        return Config::new_from_file(path).unwrap_or_else(|e| {
            warn!("Failed to read config file {path:?}, using defaults. Error: {e}");
            Config::default()
        });
    }

    match confy::get_configuration_file_path(APP_NAME, None) {
        Ok(path) => info!("Reading config file from {path:?}"),
        Err(e) => warn!("Could not find the config file location: {e}"),
    }

    match confy::load(APP_NAME, None) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file, overwriting with default. Error: {e}");
            let config = Config::default();
            if let Err(e) = confy::store(APP_NAME, None, &config) {
                error!("Failed to write default config file: {e}");
            }
            config
        }
    }
}

fn init_logging(args: &Cli) -> Result<(), Box<dyn Error>> {
    let log_level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let log_base_path = match &args.log_location {
        Some(path) => path.clone(),
        None => {
            let mut path = directories::BaseDirs::new()
                .ok_or("Could not find a directory to store logs")?
                .data_local_dir()
                .to_path_buf();
            path.push("live-refresh-logs");
            path
        }
    };
    let mut log_path = log_base_path.clone();
    let mut archived_log_path = log_base_path;
    log_path.push(format!("{APP_NAME}-log.txt"));
    archived_log_path.push(format!("{APP_NAME}-log-{{}}.txt.gz"));

    #[cfg(debug_assertions)]
    println!("Log path: {}", log_path.display());

    // Only log to the console in debug mode
    #[cfg(all(debug_assertions, not(target_os = "windows")))]
    let console_target = Target::Stderr;
    #[cfg(all(debug_assertions, target_os = "windows"))]
    let console_target = Target::Stdout; // Windows apps don't get a stderr handle
    #[cfg(debug_assertions)]
    let console = ConsoleAppender::builder()
        .target(console_target)
        .encoder(Box::new(PatternEncoder::new("[{d} {h({l:5})} {M}] {m}{n}")))
        .build();

    // Setup the file log roller
    let roller = FixedWindowRoller::builder().build(
        archived_log_path
            .as_os_str()
            .to_str()
            .ok_or("Log path is not valid UTF-8")?,
        args.num_old_logs,
    )?;
    let file_policy = CompoundPolicy::new(
        Box::new(SizeTrigger::new(args.log_max_file_size)),
        Box::new(roller),
    );
    let file_appender = RollingFileAppender::builder()
        .append(true)
        .encoder(Box::new(PatternEncoder::new("[{d} {l:5} {M}] {m}{n}")))
        .build(log_path, Box::new(file_policy))?;

    // Setup the logging from all locations to use `LevelFilter::Error`
    let root = Root::builder().appender("file_appender");
    #[cfg(debug_assertions)]
    let root = root.appender("console");
    let root = root.build(LevelFilter::Error);

    // Setup the top level logging config
    let log_config = LogConfig::builder()
        .appender(Appender::builder().build("file_appender", Box::new(file_appender)));

    #[cfg(debug_assertions)]
    let log_config = log_config.appender(Appender::builder().build("console", Box::new(console)));

    // Our own crates log at `log_level`
    let log_config = log_config
        .logger(Logger::builder().build("live_refresh", log_level))
        .logger(Logger::builder().build("score_common", log_level))
        .build(root)?;

    log4rs::init_config(log_config)?;
    log_panics::init();

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("enable\n"), Ok(Input::Command(Command::Enable)));
        assert_eq!(parse_input("CLICK"), Ok(Input::Command(Command::Click)));
        assert_eq!(parse_input(""), Ok(Input::Status));
        assert_eq!(parse_input("status"), Ok(Input::Status));
        assert_eq!(parse_input("?"), Ok(Input::Help));
        assert_eq!(parse_input("exit"), Ok(Input::Quit));
        assert!(parse_input("reboot").is_err());
    }

    #[test]
    fn test_cli() {
        let args = Cli::parse_from(["live-refresh", "page.json", "--sweep", "-vv"]);
        assert_eq!(args.page, PathBuf::from("page.json"));
        assert!(args.sweep);
        assert_eq!(args.verbose, 2);
        assert_eq!(args.log_max_file_size, 5_000_000);
        assert_eq!(args.url, None);
        assert!(!args.no_confirm);
    }
}
