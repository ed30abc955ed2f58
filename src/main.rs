#![allow(clippy::multiple_crate_versions)]

use clap::{Arg, ArgAction, Command};

mod commands;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .value_name("FILE")
        .help("TOML configuration file")
}

fn host_arg(default: &'static str) -> Arg {
    Arg::new("host")
        .long("host")
        .value_name("HOST")
        .help("Server host address")
        .default_value(default)
}

fn port_arg() -> Arg {
    Arg::new("port")
        .short('p')
        .long("port")
        .value_name("PORT")
        .help("Server port")
        .value_parser(clap::value_parser!(u16))
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let matches = Command::new("selfgrade")
        .version(VERSION)
        .about("Answer a question with an LLM, then grade the answer's completeness, accuracy and reasoning")
        .subcommand_required(false)
        .subcommand(
            Command::new("serve")
                .about("Run the HTTP service")
                .arg(config_arg())
                .arg(
                    Arg::new("host")
                        .long("host")
                        .value_name("HOST")
                        .help("Host address to bind to (overrides config)"),
                )
                .arg(port_arg().help("Port to bind to (overrides config)")),
        )
        .subcommand(
            Command::new("ask")
                .about("Answer and grade a single question in-process")
                .arg(
                    Arg::new("query")
                        .value_name("QUERY")
                        .help("The question to answer")
                        .required(true),
                )
                .arg(
                    Arg::new("reasoning")
                        .short('r')
                        .long("reasoning")
                        .help("Have the model write its own reasons for each grade")
                        .action(ArgAction::SetTrue),
                )
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("demo")
                .about("Run canned queries against a running server")
                .arg(host_arg("localhost"))
                .arg(port_arg().default_value("8087")),
        )
        .get_matches();

    let result = match matches.subcommand() {
        Some(("serve", sub)) => commands::serve::run(sub).await,
        Some(("ask", sub)) => commands::ask::run(sub).await,
        Some(("demo", sub)) => commands::demo::run(sub).await,
        _ => {
            println!("selfgrade v{}", VERSION);
            println!("Use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}
