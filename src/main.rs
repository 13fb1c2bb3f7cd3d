//! Pargolo CLI - reconcile configuration parameters with a parameter store.

use clap::Parser;
use pargolo::cli::{Cli, Commands, ConfigCommands, StoreArgs};
use pargolo::commands::{self, CommandResult, UploadOptions};
use pargolo::config::{self, ConfigOverrides, OutputFormat, ResolvedConfig};
use pargolo::context::CallContext;
use pargolo::loader;
use pargolo::logging;
use pargolo::models::paths::ProjectPath;
use pargolo::storage::{self, BackendType};
use std::process;
use std::time::Duration;

/// Exit code when a command completed but reported failures or, with
/// `--strict`, destructive changes.
const EXIT_FINDINGS: i32 = 2;

/// Exit code after Ctrl-C or an expired deadline.
const EXIT_INTERRUPTED: i32 = 130;

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let ctx = match cli.deadline_secs {
        Some(secs) => CallContext::new().with_timeout(Duration::from_secs(secs)),
        None => CallContext::new(),
    };
    let handler_ctx = ctx.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_ctx.cancel()) {
        tracing::warn!(error = %e, "Could not install Ctrl-C handler");
    }

    let mut human = cli.human_readable;
    let result = resolve_settings(&cli.store, human).and_then(|settings| {
        human = human || *settings.output_format() == OutputFormat::Human;
        run_command(cli.command, &settings, &ctx, human)
    });

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            if human {
                eprintln!("Error: {}", e);
            } else {
                eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
            }
            process::exit(if e.is_interrupted() { EXIT_INTERRUPTED } else { 1 });
        }
    }
}

/// Merge CLI flags, environment and config.kdl into the effective settings.
fn resolve_settings(args: &StoreArgs, human: bool) -> pargolo::Result<ResolvedConfig> {
    let env = |key: &str| std::env::var(key).ok();

    let mut overrides = ConfigOverrides::new();
    if let Some(raw) = &args.backend {
        let backend = BackendType::parse(raw)
            .ok_or_else(|| pargolo::Error::Config(format!("unknown backend '{}'", raw)))?;
        overrides = overrides.with_backend(backend);
    }
    if let Some(region) = &args.region {
        overrides = overrides.with_region(region.clone());
    }
    if let Some(endpoint) = &args.endpoint {
        overrides = overrides.with_endpoint(endpoint.clone());
    }
    if let Some(path) = &args.store_file {
        overrides = overrides.with_store_file(path.clone());
    }
    if let Some(size) = args.page_size {
        overrides = overrides.with_page_size(size);
    }
    if human {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }

    let path = args.config.clone().or_else(|| config::config_path(env));
    let file_config = match &path {
        Some(p) => config::load_config_file(p)?,
        None => Default::default(),
    };

    let mut resolved = config::resolve_config(&file_config, &overrides, env)?;
    resolved.config_path = path.filter(|p| p.exists());
    Ok(resolved)
}

fn run_command(
    command: Commands,
    settings: &ResolvedConfig,
    ctx: &CallContext,
    human: bool,
) -> pargolo::Result<i32> {
    let list_options = settings.list_options();

    match command {
        Commands::SearchByPath {
            path,
            recursive,
            output,
        } => {
            let store = storage::open_store(settings)?;
            let output = output.map(|o| loader::resolve_input_path(&o, "csv"));
            let result = commands::search_by_path(
                store.as_ref(),
                ctx,
                &path,
                recursive,
                &list_options,
                output.as_deref(),
            )?;
            emit(&result, human);
        }
        Commands::SearchByValue {
            value,
            filter,
            output,
        } => {
            let store = storage::open_store(settings)?;
            let output = output.map(|o| loader::resolve_input_path(&o, "csv"));
            let result = commands::search_by_value(
                store.as_ref(),
                ctx,
                &value,
                filter.as_deref(),
                &list_options,
                output.as_deref(),
            )?;
            emit(&result, human);
        }
        Commands::Export {
            project,
            output_dir,
        } => {
            let store = storage::open_store(settings)?;
            let project = ProjectPath::new(project.env, project.domain, project.project);
            let result = commands::export(
                store.as_ref(),
                ctx,
                &project,
                &list_options,
                &output_dir,
                chrono::Utc::now(),
            )?;
            emit(&result, human);
        }
        Commands::Validate { input, env, strict } => {
            let desired =
                loader::load_desired_state_from_path(&loader::resolve_input_path(&input, "csv"))?;
            let store = storage::open_store(settings)?;
            let result = commands::validate(store.as_ref(), ctx, &desired, &env, &list_options)?;
            emit(&result, human);
            if strict && result.has_destructive() {
                return Ok(EXIT_FINDINGS);
            }
        }
        Commands::Upload {
            input,
            overwrite,
            env,
            force,
        } => {
            let desired =
                loader::load_desired_state_from_path(&loader::resolve_input_path(&input, "csv"))?;
            let mut store = storage::open_store(settings)?;
            let options = UploadOptions {
                overwrite,
                env,
                force,
            };
            let result =
                commands::upload(store.as_mut(), ctx, &desired, &options, &list_options)?;
            emit(&result, human);
            if result.failed > 0 {
                return Ok(EXIT_FINDINGS);
            }
        }
        Commands::Initialize {
            input,
            project,
            output,
            include_values,
        } => {
            let project = ProjectPath::new(project.env, project.domain, project.project);
            let result = commands::initialize(
                &loader::resolve_input_path(&input, "json"),
                &project,
                include_values,
                &output,
            )?;
            emit(&result, human);
        }
        Commands::Delete { name } => {
            let mut store = storage::open_store(settings)?;
            let result = commands::delete(store.as_mut(), ctx, &name)?;
            emit(&result, human);
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => emit(&commands::config_show(settings), human),
        },
    }

    Ok(0)
}

fn emit<T: CommandResult>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
