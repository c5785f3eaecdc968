use anyhow::{bail, Context, Result};
use clap::Parser;
use memscan::cli::{Cli, Commands, ReadArgs, RunArgs, ScanArgs, ScriptArgs, TargetArgs, WriteArgs};
use memscan::config::{validate_config, Config, ConfigLoader, DEFAULT_CONFIG_FILE};
use memscan::core::{Value, VERSION};
use memscan::memory::regions::{self, enumerate};
use memscan::session::{Controller, LogObserver, ScanProgress};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(cli.log_level.as_deref().unwrap_or(&config.logging.level));

    info!("memscan v{}", VERSION);

    match cli.command {
        Commands::Regions(args) => list_regions(&config, args),
        Commands::Scan(args) => scan(config, args).await,
        Commands::Read(args) => read(config, args),
        Commands::Write(args) => write(config, args),
        Commands::Run(args) => run(config, args).await,
        Commands::Script(args) => script(config, args),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let config = match &cli.config {
        Some(path) => ConfigLoader::new(path)
            .load()
            .with_context(|| format!("loading {}", path.display()))?,
        None => ConfigLoader::new(DEFAULT_CONFIG_FILE).load_or_default()?,
    };
    validate_config(&config)?;
    Ok(config)
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn attach(config: Config, target: &TargetArgs) -> Result<Controller> {
    let mut controller = Controller::new(config);
    controller.add_observer(Arc::new(LogObserver));
    controller
        .attach(target.pid)
        .with_context(|| format!("attaching to process {}", target.pid))?;
    Ok(controller)
}

fn list_regions(config: &Config, args: TargetArgs) -> Result<()> {
    let capability = memscan::process::open(args.pid)?;
    let found = enumerate(capability.as_ref(), config.memory.address_ceiling);
    for region in &found {
        println!("{}", region);
    }
    println!(
        "{} regions, {:.2} MB readable",
        found.len(),
        regions::total_size(&found) as f64 / (1024.0 * 1024.0)
    );
    Ok(())
}

async fn scan(config: Config, args: ScanArgs) -> Result<()> {
    let controller = attach(config, &args.target)?;

    let progress: ScanProgress =
        Arc::new(|fraction: f64| debug!(percent = (fraction * 100.0) as u32, "scanning"));
    let found = controller
        .scan(Value::Text(args.value.clone()), args.data_type, Some(progress))
        .await?;
    println!("{} matches for {} {}", found.len(), args.data_type, args.value);

    let mut results = found;
    if let Some(filter) = &args.filter {
        tokio::time::sleep(Duration::from_millis(args.delay_ms)).await;
        let operand = args.filter_value.clone().map(Value::Text);
        results = controller.filter(filter, operand, args.data_type)?;
        println!("{} matches after '{}'", results.len(), filter);
    }

    for result in results.iter().take(args.limit) {
        println!("{}", result);
    }
    if results.len() > args.limit {
        println!("... {} more", results.len() - args.limit);
    }
    Ok(())
}

fn read(config: Config, args: ReadArgs) -> Result<()> {
    let controller = attach(config, &args.target)?;
    let value = controller.read(args.address, args.data_type)?;
    println!("{} = {}", args.address, value);
    Ok(())
}

fn write(config: Config, args: WriteArgs) -> Result<()> {
    let controller = attach(config, &args.target)?;
    let bytes = controller.write(args.address, &Value::Text(args.value), args.data_type)?;
    println!("wrote {} bytes at {}: {}", bytes.len(), args.address, hex::encode(&bytes));
    Ok(())
}

async fn run(config: Config, args: RunArgs) -> Result<()> {
    let mut controller = Controller::new(config);
    controller.add_observer(Arc::new(LogObserver));
    controller
        .load_table(&args.table)
        .with_context(|| format!("loading table {}", args.table.display()))?;
    controller
        .attach(args.target.pid)
        .with_context(|| format!("attaching to process {}", args.target.pid))?;

    for (name, outcome) in controller.run_auto_scripts() {
        println!("[{}]", name);
        print!("{}", outcome);
    }

    let stats = controller.stats();
    println!(
        "tracking {} addresses ({} frozen), press Ctrl+C to stop",
        stats.tracked, stats.frozen
    );
    tokio::signal::ctrl_c().await?;

    controller.detach();
    println!("{}", controller.stats());
    Ok(())
}

fn script(config: Config, args: ScriptArgs) -> Result<()> {
    let code = std::fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let mut controller = attach(config, &args.target)?;

    let outcome = controller.run_script(&code);
    print!("{}", outcome);
    if !outcome.success {
        bail!("script {} failed", args.file.display());
    }
    Ok(())
}
