use anyhow::Context;
use std::process::ExitCode;
use strata::{
    a2a::AgentCard,
    api::routes::create_router,
    cli::{output::Output, Cli, Commands},
    types::AnalysisRequest,
    utils::toml_config::{ConfigError, LogFormat, StrataConfig},
    workflows::{AbortController, WorkflowStatus},
    AppState,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match run(cli, &output).await {
        Ok(code) => code,
        Err(e) => {
            output.error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, output: &Output) -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let config = load_config(&cli, output)?;
    init_tracing(&config, cli.verbose);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            serve(config, output).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Analyze {
            company,
            ticker,
            focus,
            json,
        } => analyze(config, output, company, ticker, focus, json).await,
        Commands::Card => {
            let url = format!("http://{}:{}", config.server.host, config.server.port);
            let card = AgentCard::research_executor(url);
            println!("{}", serde_json::to_string_pretty(&card)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(cli: &Cli, output: &Output) -> anyhow::Result<StrataConfig> {
    match StrataConfig::load(&cli.config) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(path)) => {
            output.warning(&format!(
                "{} not found, using built-in defaults",
                path.display()
            ));
            let config = StrataConfig::default();
            config.validate()?;
            Ok(config)
        }
        Err(e) => Err(e).with_context(|| format!("failed to load {}", cli.config.display())),
    }
}

/// `RUST_LOG` wins over the configured level; `--verbose` raises the
/// configured level to debug.
fn init_tracing(config: &StrataConfig, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        config.server.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("strata={level},tower_http={level}")));

    // stdout belongs to command output (`analyze --json`, `card`)
    let registry = tracing_subscriber::registry().with(filter);
    match config.server.log_format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_writer(std::io::stderr)).init(),
    }
}

async fn serve(config: StrataConfig, output: &Output) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::from_config(config).context("failed to build application state")?;

    output.banner();
    output.kv("Listening", &addr);
    output.kv("Research mode", &state.config.research.mode.to_string());
    let providers: Vec<String> = state
        .router
        .provider_names()
        .iter()
        .map(|p| p.to_string())
        .collect();
    output.kv("Providers", &providers.join(" > "));
    if state.task_manager.is_some() {
        output.kv("A2A", "serving research executor");
    }
    output.hint("POST /api/analyze with {\"company\": \"...\"} to start a workflow");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn analyze(
    config: StrataConfig,
    output: &Output,
    company: String,
    ticker: Option<String>,
    focus: Option<String>,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let state = AppState::from_config(config).context("failed to build application state")?;

    let mut request = AnalysisRequest::new(company);
    if let Some(ticker) = ticker {
        request = request.with_ticker(ticker);
    }
    if let Some(focus) = focus {
        request = request.with_focus(focus);
    }

    if !json {
        output.banner();
        output.info(&format!("Analyzing {}", request.company));
    }

    let (controller, signal) = AbortController::channel();
    let run = state.workflows.run_with_abort(request, signal);
    tokio::pin!(run);
    let done = tokio::select! {
        done = &mut run => done?,
        _ = shutdown_signal() => {
            if !json {
                output.warning("Interrupted, aborting workflow");
            }
            controller.abort();
            run.await?
        }
    };

    if json {
        match &done.report {
            Some(report) => println!("{}", serde_json::to_string_pretty(report)?),
            None => println!("{}", serde_json::to_string_pretty(&done.status_document())?),
        }
    } else {
        output.workflow(&done);
    }

    Ok(if done.status() == WorkflowStatus::Completed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}
