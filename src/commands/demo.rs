//! `selfgrade demo`: canned queries against a running server.

use std::time::Duration;

use anyhow::Context;
use clap::ArgMatches;
use serde_json::Value;

const DEMO_QUERIES: [(&str, &str); 3] = [
    ("Simple mathematical question", "What is 1 + 1?"),
    (
        "Alphabetical ordering question",
        "what is the third month in alphabetical order",
    ),
    (
        "Syllable counting task",
        "How many syllables are in the following phrase: \"How much wood could a woodchuck chuck if a woodchuck could chuck wood\"? Answer with a single number only.",
    ),
];

const ENDPOINTS: [(&str, &str, &str); 2] = [
    (
        "/api/chat/chat_with_score",
        "Basic Reflection",
        "Reasons come from the prompt catalog",
    ),
    (
        "/api/chat/chat_with_score_reflect_and_reason",
        "Advanced Reflection",
        "The model writes its own reasons, higher latency",
    ),
];

const DIMENSIONS: [&str; 3] = ["completeness", "accuracy", "reasoning"];

pub async fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    let host = matches
        .get_one::<String>("host")
        .context("host has a default value")?;
    let port = matches
        .get_one::<u16>("port")
        .context("port has a default value")?;
    let base_url = format!("http://{}:{}", host, port);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .context("failed to build HTTP client")?;

    println!("selfgrade demo");
    println!("Generates answers and grades them on completeness, accuracy and reasoning.\n");

    println!("Checking server status...");
    let reachable = matches!(
        client.get(&base_url).timeout(Duration::from_secs(5)).send().await,
        Ok(resp) if resp.status().is_success()
    );
    if !reachable {
        eprintln!("\x1b[31m✗\x1b[0m Server not accessible at {}", base_url);
        eprintln!("  Start it with: selfgrade serve --port {}", port);
        anyhow::bail!("server not reachable");
    }
    println!("\x1b[32m✓\x1b[0m Server is running at {}", base_url);

    for (path, name, description) in ENDPOINTS {
        println!("\n{}", "=".repeat(80));
        println!("{} ({})", name, description);

        for (i, (label, query)) in DEMO_QUERIES.iter().enumerate() {
            println!("\nDemo {}: {}", i + 1, label);
            println!("Query: {}", query);

            match post_query(&client, &format!("{}{}", base_url, path), query).await {
                Ok(response) => display_response(&response),
                Err(e) => eprintln!("\x1b[31m✗\x1b[0m {:#}", e),
            }

            if i + 1 < DEMO_QUERIES.len() {
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }

    println!("\n{}", "=".repeat(80));
    println!("\x1b[32m✓\x1b[0m Demo completed");
    Ok(())
}

async fn post_query(client: &reqwest::Client, url: &str, query: &str) -> anyhow::Result<Value> {
    let response = client
        .post(url)
        .json(&serde_json::json!({ "query": query }))
        .send()
        .await
        .context("request failed")?;

    let status = response.status();
    let body: Value = response.json().await.context("response was not JSON")?;
    if !status.is_success() {
        anyhow::bail!("API error {}: {}", status, body);
    }
    Ok(body)
}

fn display_response(response: &Value) {
    let base = &response["base_response"];
    let content = base["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or("No content");
    println!("\nAnswer:\n  {}", content);

    let reflection = &response["reflection_response"];
    println!("\nSelf-reflection:");
    println!("  {:<14} {:<7} Reason", "Dimension", "Rating");
    for dimension in DIMENSIONS {
        let entry = &reflection[dimension];
        let rating = entry["rating"].as_str().unwrap_or("N/A");
        let reason = entry["reason"].as_str().unwrap_or("No reason provided");
        println!("  {:<14} {} {}", dimension, colored_rating(rating), reason);
    }

    let score = reflection["numerical_score"].as_f64().unwrap_or(0.0);
    let score_color = if score >= 0.8 {
        "32"
    } else if score >= 0.5 {
        "33"
    } else {
        "31"
    };
    println!("\n  Numerical score: \x1b[{}m{:.2}\x1b[0m", score_color, score);
    println!("  Model:           {}", base["model"].as_str().unwrap_or("Unknown"));
    println!(
        "  Total tokens:    {}",
        base["usage"]["total_tokens"]
            .as_u64()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "N/A".to_string())
    );
}

fn colored_rating(rating: &str) -> String {
    let color = match rating {
        "A" => "32",
        "C" => "33",
        _ => "31",
    };
    format!("\x1b[{}m{:<7}\x1b[0m", color, rating)
}
