mod config;
mod convert;
mod help;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use session::Session;

use crate::convert::{parse_json_arg, print_value};

#[derive(Parser)]
#[command(name = "cradle")]
#[command(about = "Client for the cradle computation service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// ISS objects
    #[command(display_order = 1)]
    Object {
        #[command(subcommand)]
        action: ObjectAction,
    },
    /// Calculations
    #[command(display_order = 2)]
    Calc {
        #[command(subcommand)]
        action: CalcAction,
    },
    /// Diffs between objects or calculations
    #[command(display_order = 3)]
    Diff {
        #[command(subcommand)]
        action: DiffAction,
    },
    /// Enable introspection and show the server's tasklets
    #[command(display_order = 10)]
    Introspect {
        /// Include finished tasklets
        #[arg(short = 'a', long)]
        include_finished: bool,

        /// Clear the tasklet administration instead of showing it
        #[arg(short, long)]
        clear: bool,

        /// Turn introspection off
        #[arg(long)]
        off: bool,

        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Round-trip a message through the server
    #[command(display_order = 11)]
    Echo { message: String },
    /// Configuration management
    #[command(display_order = 20)]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ObjectAction {
    /// Print an object's value
    Get {
        object_id: String,
        #[arg(long)]
        ignore_upgrades: bool,
    },
    /// Print an object's metadata headers
    Metadata { object_id: String },
    /// Print the immutable ID an object ID refers to
    Resolve {
        object_id: String,
        #[arg(long)]
        ignore_upgrades: bool,
    },
    /// Store a JSON value under a schema and print its ID
    Post {
        schema: String,
        /// JSON value, or `-` to read stdin
        object: String,
    },
    /// Copy an object into another context
    Copy {
        object_id: String,
        #[arg(long = "to")]
        destination_context_id: String,
    },
}

#[derive(Subcommand)]
enum CalcAction {
    /// Submit a calculation and print its ID
    Post {
        /// JSON calculation, or `-` to read stdin
        calculation: String,
    },
    /// Evaluate a calculation on the server and print the result
    Local {
        /// JSON calculation, or `-` to read stdin
        calculation: String,

        /// Pipeline this many identical requests
        #[arg(short = 'n', long, default_value = "1")]
        repeat: usize,
    },
    /// Print the request behind a calculation ID
    Request { calculation_id: String },
    /// List subcalculations calling a matching function
    Search {
        calculation_id: String,
        search_string: String,
    },
    /// Resolve a meta generator to a calculation ID
    Meta {
        /// JSON generator, or `-` to read stdin
        generator: String,
    },
    /// Copy a calculation into another context
    Copy {
        calculation_id: String,
        #[arg(long = "to")]
        destination_context_id: String,
    },
}

#[derive(Subcommand)]
enum DiffAction {
    /// Diff two ISS objects
    Objects { id_a: String, id_b: String },
    /// Diff two calculations
    Calcs { id_a: String, id_b: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// Show configuration file path
    Path,
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() == 1 || (args.len() == 2 && (args[1] == "-h" || args[1] == "--help")) {
        print!("{}", help::generate_help());
        return Ok(());
    }

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        print!("{}", help::generate_help());
        return Ok(());
    };

    if let Commands::Config { action } = command {
        return handle_config(action);
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async_main(command))
}

async fn async_main(command: Commands) -> Result<()> {
    // Default to WARN level for quiet CLI output
    // Use RUST_LOG=info or RUST_LOG=debug for verbose output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cfg = config::load_config()?;
    let mut session = Session::connect(cfg.session)
        .await
        .context("Failed to open session")?;

    match command {
        Commands::Object { action } => handle_object(&mut session, action).await,
        Commands::Calc { action } => handle_calc(&mut session, action).await,
        Commands::Diff { action } => handle_diff(&mut session, action).await,
        Commands::Introspect {
            include_finished,
            clear,
            off,
            json,
        } => handle_introspect(&mut session, include_finished, clear, off, json).await,
        Commands::Echo { message } => {
            let echo = session.echo(&message).await?;
            println!("{}: {}", echo.name, echo.message);
            Ok(())
        }
        Commands::Config { .. } => unreachable!("Handled in main()"),
    }
}

async fn handle_object(session: &mut Session, action: ObjectAction) -> Result<()> {
    match action {
        ObjectAction::Get {
            object_id,
            ignore_upgrades,
        } => {
            let object = session.get_iss_object(&object_id, ignore_upgrades).await?;
            print_value(&object)
        }
        ObjectAction::Metadata { object_id } => {
            let metadata = session.get_iss_object_metadata(&object_id).await?;
            for (name, value) in metadata {
                println!("{}: {}", name, value);
            }
            Ok(())
        }
        ObjectAction::Resolve {
            object_id,
            ignore_upgrades,
        } => {
            let immutable_id = session.resolve_iss_object(&object_id, ignore_upgrades).await?;
            println!("{}", immutable_id);
            Ok(())
        }
        ObjectAction::Post { schema, object } => {
            let object = parse_json_arg(&object)?;
            let object_id = session.post_iss_object(&schema, object).await?;
            println!("{}", object_id);
            Ok(())
        }
        ObjectAction::Copy {
            object_id,
            destination_context_id,
        } => {
            session.copy_iss_object(&destination_context_id, &object_id).await?;
            println!("Copied {} to {}", object_id, destination_context_id);
            Ok(())
        }
    }
}

async fn handle_calc(session: &mut Session, action: CalcAction) -> Result<()> {
    match action {
        CalcAction::Post { calculation } => {
            let calculation = parse_json_arg(&calculation)?;
            println!("{}", session.post_calculation(calculation).await?);
            Ok(())
        }
        CalcAction::Local { calculation, repeat } => {
            let calculation = parse_json_arg(&calculation)?;
            if repeat <= 1 {
                return print_value(&session.perform_local_calc(calculation).await?);
            }
            let results = session.perform_local_calc_repeated(calculation, repeat).await?;
            match results.last() {
                Some(result) => print_value(result),
                None => Ok(()),
            }
        }
        CalcAction::Request { calculation_id } => {
            print_value(&session.calculation_request(&calculation_id).await?)
        }
        CalcAction::Search {
            calculation_id,
            search_string,
        } => {
            let matches = session.calculation_search(&calculation_id, &search_string).await?;
            if matches.is_empty() {
                println!("No matches for: {}", search_string);
            }
            for id in matches {
                println!("{}", id);
            }
            Ok(())
        }
        CalcAction::Meta { generator } => {
            let generator = parse_json_arg(&generator)?;
            println!("{}", session.resolve_meta_chain(generator).await?);
            Ok(())
        }
        CalcAction::Copy {
            calculation_id,
            destination_context_id,
        } => {
            session.copy_calculation(&destination_context_id, &calculation_id).await?;
            println!("Copied {} to {}", calculation_id, destination_context_id);
            Ok(())
        }
    }
}

async fn handle_diff(session: &mut Session, action: DiffAction) -> Result<()> {
    let diff = match action {
        DiffAction::Objects { id_a, id_b } => session.iss_diff(&id_a, &id_b).await?,
        DiffAction::Calcs { id_a, id_b } => session.calculation_diff(&id_a, &id_b).await?,
    };
    print_value(&diff)
}

async fn handle_introspect(
    session: &mut Session,
    include_finished: bool,
    clear: bool,
    off: bool,
    json: bool,
) -> Result<()> {
    session.introspection_set_enabled(!off).await?;
    if clear {
        session.introspection_clear_admin().await?;
        return Ok(());
    }

    let snapshot = session.query_introspection_status(include_finished).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else if snapshot.tasklets().is_empty() {
        println!("No tasklets");
    } else {
        println!("{}", snapshot.render(true));
    }
    Ok(())
}

fn handle_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let cfg = config::load_config()?;
            println!("{}", toml::to_string_pretty(&cfg.masked())?);
            Ok(())
        }
        ConfigAction::Get { key } => {
            let cfg = config::load_config()?;
            match config::get_config_value(&cfg, &key) {
                Some(value) => println!("{}", value),
                None if config::KEYS.contains(&key.as_str()) => println!("(not set)"),
                None => anyhow::bail!("Unknown config key: {}", key),
            }
            Ok(())
        }
        ConfigAction::Set { key, value } => {
            let mut cfg = config::load_config()?;
            config::set_config_value(&mut cfg, &key, &value)?;
            config::save_config(&cfg)?;
            if key == "session.api_token" {
                println!("Set {}", key);
            } else {
                println!("Set {} = {}", key, value);
            }
            Ok(())
        }
        ConfigAction::Path => {
            let path = config::get_config_file()?;
            println!("{}", path.display());
            Ok(())
        }
    }
}
