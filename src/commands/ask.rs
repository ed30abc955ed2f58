use anyhow::Context;
use clap::ArgMatches;
use selfgrade_runtime::{Query, ReflectionMode, ReflectionWorkflow};

use super::{init_tracing, load_config};

pub async fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    let config = load_config(matches)?;
    init_tracing(&config.logging);

    let text = matches
        .get_one::<String>("query")
        .context("a query is required")?;
    let query = Query::new(text.as_str())?;

    let mode = if matches.get_flag("reasoning") {
        ReflectionMode::Reasoning
    } else {
        ReflectionMode::Concise
    };

    let workflow = ReflectionWorkflow::from_config(&config)
        .context("failed to initialize the reflection workflow")?;
    let reflected = workflow.run(&query, mode).await?;

    println!("{}", serde_json::to_string_pretty(&reflected)?);
    Ok(())
}
