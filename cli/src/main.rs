//! CLI entrypoint for inference-gateway
//!
//! This is the main binary that wires together all layers using
//! dependency injection: config loading, provider gateways with their
//! resilience stack, sandbox detection, the semantic cache, and the
//! run-inference use case.

use anyhow::{Context, Result, bail};
use clap::Parser;
use gateway_application::{
    ExecutionLimits, RunInferenceConfig, RunInferenceUseCase, SandboxExecutor, SemanticCache,
};
use gateway_domain::InferenceRequest;
use gateway_infrastructure::{
    ActiveSandbox, ConfigLoader, HashingEmbedder, build_gateways, retry_policy,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "inference-gateway",
    about = "Dispatch one prompt to several LLM providers, execute the generated code in a sandbox, and pick the most trustworthy answer",
    version
)]
struct Cli {
    /// The prompt to send to every provider
    prompt: Option<String>,

    /// Path to a TOML config file (overrides discovered files)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ignore all config files and use built-in defaults
    #[arg(long)]
    no_config: bool,

    /// Sampling temperature (0.0..=2.0)
    #[arg(short, long)]
    temperature: Option<f64>,

    /// Skip sandbox execution of extracted code
    #[arg(long)]
    no_execute: bool,

    /// Skip judging and synthesis
    #[arg(long)]
    no_verify: bool,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,

    /// Probe provider reachability and exit
    #[arg(long)]
    health: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).context("failed to load configuration")?
    };
    config.validate().context("invalid configuration")?;

    // === Dependency injection ===
    let gateways = build_gateways(&config)?;

    if cli.health {
        for gateway in &gateways {
            let healthy = gateway.health_check().await;
            println!(
                "{:<8} {:<28} {}",
                gateway.provider(),
                gateway.model_name(),
                if healthy { "ok" } else { "unreachable" }
            );
        }
        return Ok(());
    }

    let Some(prompt) = cli.prompt else {
        bail!("A prompt is required (or use --health to probe providers).");
    };

    let sandbox = Arc::new(
        ActiveSandbox::detect(&config.sandbox)
            .await
            .context("failed to set up the sandbox")?,
    );
    info!(strategy = %sandbox.strategy(), "sandbox ready");

    let cache = Arc::new(if config.cache.enabled {
        SemanticCache::new(
            config.cache.capacity,
            config.cache.similarity_threshold,
            Duration::from_secs(config.cache.ttl_secs),
        )
    } else {
        // A zero TTL expires every entry immediately
        SemanticCache::new(1, config.cache.similarity_threshold, Duration::ZERO)
    });

    let limits = ExecutionLimits {
        timeout: Duration::from_secs(config.sandbox.timeout_secs),
        memory_bytes: config.sandbox.memory_mb * 1024 * 1024,
        cpu_limit: config.sandbox.cpu_limit,
        max_output_bytes: config.sandbox.max_output_kb * 1024,
    };

    // The scatter deadline must cover a full retry cycle (every attempt
    // plus backoff), or the resilience wrapper could never finish.
    let provider_timeout = retry_policy(&config.resilience)
        .budget(Duration::from_secs(config.providers.request_timeout_secs));

    let use_case = RunInferenceUseCase::new(
        gateways,
        sandbox,
        Arc::new(HashingEmbedder::default()),
        cache,
    )
    .with_config(RunInferenceConfig {
        provider_timeout,
        default_language: config.inference.default_language.clone(),
        limits,
        self_heal: config.inference.self_heal,
        heal_temperature: config.inference.heal_temperature,
    });

    let mut request = InferenceRequest::new(prompt)?
        .with_temperature(cli.temperature.unwrap_or(config.inference.temperature))?;
    if cli.no_execute || !config.inference.execute_code {
        request = request.without_execution();
    }
    if cli.no_verify || !config.inference.verify {
        request = request.without_verification();
    }

    let result = use_case.execute(&request).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if result.cached {
        println!("(served from semantic cache)\n");
    }

    match (&result.selected_response, &result.verification) {
        (Some(selected), Some(report)) => {
            println!("{}", selected.text);
            println!();
            println!(
                "--- {} via {} ({}) ---",
                selected.provider,
                selected.model_name,
                report.synthesis_strategy
            );
            println!("{}", report.summary(result.model_responses.len()));
        }
        _ => {
            // Verification disabled: print every successful response
            for response in result.successful_responses() {
                println!("=== {} ({}) ===", response.provider, response.model_name);
                println!("{}\n", response.text);
            }
        }
    }

    info!(
        total_latency = format!("{:.2}s", result.total_latency),
        "request complete"
    );
    Ok(())
}
