use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use gesture_classifier::{ClassifierCascade, DenseNetwork, GestureClassifier, ModelState};
use gesture_service::{telemetry, CliOverrides, GestureService, ServiceConfig};
use gesture_transport::BackendKind;
use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;

fn cli() -> Command {
    Command::new("gesture-gateway")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Real-time hand-gesture classification gateway")
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .global(true)
                .value_parser(value_parser!(u16))
                .help("Streaming endpoint port"),
        )
        .arg(
            Arg::new("http-port")
                .long("http-port")
                .global(true)
                .value_parser(value_parser!(u16))
                .help("Health/stats port"),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .global(true)
                .value_parser(value_parser!(IpAddr))
                .help("Address to bind"),
        )
        .arg(
            Arg::new("backend")
                .long("backend")
                .global(true)
                .value_parser(["warp", "tungstenite"])
                .help("Transport backend"),
        )
        .arg(
            Arg::new("heartbeat-ms")
                .long("heartbeat-ms")
                .global(true)
                .value_parser(value_parser!(u64))
                .help("Heartbeat interval in milliseconds"),
        )
        .arg(
            Arg::new("model")
                .long("model")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Primary model artifact"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit JSON log lines"),
        )
        .subcommand(Command::new("serve").about("Run the gateway (default)"))
        .subcommand(
            Command::new("check-model")
                .about("Load a model artifact and report the tier that would be selected"),
        )
        .subcommand(Command::new("print-config").about("Print the resolved configuration as TOML"))
}

fn overrides(args: &ArgMatches) -> anyhow::Result<CliOverrides> {
    let backend = args
        .get_one::<String>("backend")
        .map(|name| name.parse::<BackendKind>())
        .transpose()?;
    Ok(CliOverrides {
        port: args.get_one::<u16>("port").copied(),
        http_port: args.get_one::<u16>("http-port").copied(),
        host: args.get_one::<IpAddr>("host").copied(),
        backend,
        heartbeat_ms: args.get_one::<u64>("heartbeat-ms").copied(),
        model: args.get_one::<PathBuf>("model").cloned(),
        log_json: args.get_flag("log-json"),
    })
}

fn resolve(args: &ArgMatches) -> anyhow::Result<ServiceConfig> {
    let file = args.get_one::<PathBuf>("config");
    ServiceConfig::resolve(file.map(PathBuf::as_path), &overrides(args)?)
        .context("failed to resolve configuration")
}

async fn serve(config: ServiceConfig) -> anyhow::Result<ExitCode> {
    if let Err(e) = telemetry::init(config.log_format) {
        eprintln!("{e}");
    }
    tracing::info!("gesture-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    let service = GestureService::new(config).context("failed to assemble service")?;
    service
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
            }
        })
        .await
        .context("gateway stopped with an error")?;
    Ok(ExitCode::SUCCESS)
}

fn check_model(config: &ServiceConfig) -> ExitCode {
    let path = &config.model_path;
    if let Err(e) = DenseNetwork::load(path) {
        println!("{}: {}", path.display(), e);
    }
    let cascade = ClassifierCascade::initialize(&config.cascade_config());
    let state = cascade.model_state();
    println!("Selected tier: {} ({})", cascade.active_tier(), state);
    println!("Supported gestures: {:?}", cascade.supported_gestures());
    if state == ModelState::PrimaryLoaded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let matches = cli().get_matches();
    let args = matches.subcommand().map_or(&matches, |(_, sub)| sub);
    let config = resolve(args)?;

    match matches.subcommand_name() {
        Some("check-model") => Ok(check_model(&config)),
        Some("print-config") => {
            print!("{}", config.to_toml()?);
            Ok(ExitCode::SUCCESS)
        }
        _ => serve(config).await,
    }
}
