use clap::{Parser, Subcommand};
use shapeshift::command::{CommandRunner, MagickRunner, NativeRunner};
use shapeshift::config::{self, Backend, ShapeshiftConfig};
use shapeshift::error::ProcessError;
use shapeshift::processor::{CallOptions, Processor, Registry};
use shapeshift::{batch, output};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Where a call's output goes and what runs first.
#[derive(clap::Args, Clone)]
struct CallArgs {
    /// Write the result as this format (e.g. png, webp) next to the source
    #[arg(long)]
    format: Option<String>,

    /// Transform applied before the processor: MODE:ARG,ARG (e.g. fit:2000,2000)
    /// or raw tool arguments (e.g. --pre='-rotate 90 -strip', magick backend only)
    #[arg(long, value_name = "MODE:ARGS", allow_hyphen_values = true)]
    pre: Option<String>,
}

impl CallArgs {
    fn call_options(&self) -> Result<CallOptions, ProcessError> {
        CallOptions::parse(self.format.clone(), self.pre.as_deref())
    }
}

#[derive(Parser)]
#[command(name = "shapeshift")]
#[command(about = "Declarative resize/crop/pad/convert pipelines for images")]
#[command(long_about = "\
Declarative resize/crop/pad/convert pipelines for images

Processors:

  limit <w> <h>                       shrink to fit inside WxH, never enlarge
  fit   <w> <h>                       scale to fit inside WxH, enlarging if needed
  fill  <w> <h> [gravity]             cover WxH, then crop to exactly WxH
  pad   <w> <h> [background] [gravity] fit inside WxH, then pad to exactly WxH
  convert <format>                    re-encode next to the source

Dimensions may be pixels (400), percentages (50%) or empty (\"\") for auto.
Gravity: NorthWest North NorthEast West Center East SouthWest South SouthEast.
Results overwrite the source unless --format changes the extension.

Run 'shapeshift gen-config' to generate a documented shapeshift.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Override the configured backend
    #[arg(long, value_enum, global = true)]
    backend: Option<Backend>,

    /// Log pipeline decisions (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a processor over files or directories
    Process {
        /// Processor name (limit, fit, fill, pad, convert)
        processor: String,
        /// Processor arguments
        args: Vec<String>,
        /// Input images or directories
        #[arg(short, long = "input", required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
        #[command(flatten)]
        call: CallArgs,
    },
    /// Show the operation chain and command line without running anything
    Plan {
        processor: String,
        args: Vec<String>,
        #[arg(short, long)]
        input: PathBuf,
        #[command(flatten)]
        call: CallArgs,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a preset from the config file
    Preset {
        name: String,
        #[arg(short, long = "input", required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
    },
    /// List processors and configured presets
    List,
    /// Print a stock shapeshift.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut settings = config::load_config(&cli.config)?;
    if let Some(backend) = cli.backend {
        settings.backend = backend;
    }
    let registry = Registry::builtin();

    match cli.command {
        Command::Process {
            processor,
            args,
            inputs,
            call,
        } => {
            let processor = registry.require(&processor)?;
            let options = call.call_options()?;
            run(&settings, processor, &args, &inputs, &options)?;
        }
        Command::Plan {
            processor,
            args,
            input,
            call,
            json,
        } => {
            let processor = registry.require(&processor)?;
            let chain = processor.plan(&input, &args, &call.call_options()?)?;
            let argv = magick_runner(&settings).command_line(&chain);
            if json {
                let report = output::PlanReport {
                    chain: &chain,
                    argv: &argv,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_plan(&chain, &argv);
            }
        }
        Command::Preset { name, inputs } => {
            let preset = settings.preset(&name)?;
            let processor = Processor::named(&preset.processor)?;
            let options = preset.call_options()?;
            run(&settings, &processor, &preset.args, &inputs, &options)?;
        }
        Command::List => {
            println!("Processors");
            for (name, processor) in registry.iter() {
                println!("    {} {}", name, processor.mode().usage());
            }
            if !settings.presets.is_empty() {
                println!();
                println!("Presets");
                for (name, preset) in &settings.presets {
                    println!("    {} = {} {}", name, preset.processor, preset.args.join(" "));
                }
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the fmt subscriber; `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Size the global rayon pool that `batch::run_batch` fans files out on.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let workers = config::effective_threads(processing);
    tracing::debug!(workers, "batch pool");
    if let Err(err) = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build_global()
    {
        tracing::debug!(error = %err, "batch pool already initialised");
    }
}

fn magick_runner(settings: &ShapeshiftConfig) -> MagickRunner {
    MagickRunner::new(settings.magick.program.clone()).with_quality(settings.output.quality)
}

fn build_runner(settings: &ShapeshiftConfig) -> Box<dyn CommandRunner> {
    match settings.backend {
        Backend::Magick => Box::new(magick_runner(settings)),
        Backend::Native => Box::new(NativeRunner::new().with_quality(settings.output.quality)),
    }
}

/// Expand inputs, run the batch, print results. Fails if any file failed.
fn run(
    settings: &ShapeshiftConfig,
    processor: &Processor,
    args: &[String],
    inputs: &[PathBuf],
    options: &CallOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let inputs = batch::collect_inputs(inputs)?;
    if inputs.is_empty() {
        return Err("no input images found".into());
    }

    init_thread_pool(&settings.processing);
    let runner = build_runner(settings);
    let results = batch::run_batch(processor, runner.as_ref(), &inputs, args, options);
    output::print_results(&results);

    let failed = results.iter().filter(|(_, r)| r.is_err()).count();
    if failed > 0 {
        return Err(format!("{failed} of {} file(s) failed", results.len()).into());
    }
    Ok(())
}
