use std::sync::Arc;

use anyhow::Context;
use clap::ArgMatches;
use selfgrade_runtime::api::{HttpApiConfig, HttpApiServer};
use selfgrade_runtime::ReflectionWorkflow;

use super::{init_tracing, load_config};

pub async fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    let mut config = load_config(matches)?;

    if let Some(host) = matches.get_one::<String>("host") {
        config.api.host = host.clone();
    }
    if let Some(port) = matches.get_one::<u16>("port") {
        config.api.port = *port;
    }
    config.validate().context("invalid configuration")?;

    init_tracing(&config.logging);

    println!("✓ Starting selfgrade...");
    let workflow = ReflectionWorkflow::from_config(&config)
        .context("failed to initialize the reflection workflow")?;
    println!("✓ Prompt catalog loaded from {}", config.prompts.path.display());
    println!(
        "✓ Model: {} ({} attempts per stage)",
        config.llm.model,
        workflow.policy().max_attempts()
    );
    println!(
        "✓ Listening on http://{}:{}",
        config.api.host, config.api.port
    );

    let server = HttpApiServer::new(HttpApiConfig::from(&config.api), Arc::new(workflow));
    server.start().await?;

    println!("✓ Shut down cleanly");
    Ok(())
}
