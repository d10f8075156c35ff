use clap::{Parser, Subcommand};
use sticker_scale::config::{self, ConfigOverrides, OutputLayout};
use sticker_scale::imaging::RustBackend;
use sticker_scale::{output, run};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn version_string() -> &'static str {
    let on_tag = env!("STICKER_SCALE_ON_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("STICKER_SCALE_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "sticker-scale")]
#[command(about = "Scale PNG stickers onto a uniform transparent canvas")]
#[command(long_about = "\
Scale PNG stickers onto a uniform transparent canvas

Every *.png under the input directory (recursively, any letter case) is
scaled to fit the canvas with its aspect ratio preserved, centered, and
padded with fully transparent pixels. Files that are not valid PNGs are
skipped and reported; they never stop the run.

  stickers/                 scaled/            (512x512, flat layout)
  ├── cat.png      200x50   ├── cat.png        512x128 centered, padded
  ├── dog.png      64x64    ├── dog.png        512x512
  └── pack-2/               └── fox.png
      └── fox.png

Settings are layered, later wins:
  stock defaults → --config FILE → command-line flags

Logging goes to stderr; filter with RUST_LOG (e.g. RUST_LOG=debug).

Run 'sticker-scale gen-config' to generate a documented config file.")]
#[command(version = version_string())]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Input directory, scanned recursively
    #[arg(long, global = true)]
    input: Option<PathBuf>,

    /// Output directory, created if missing
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Canvas width in pixels
    #[arg(long, global = true)]
    width: Option<u32>,

    /// Canvas height in pixels
    #[arg(long, global = true)]
    height: Option<u32>,

    /// Maximum files in flight at once
    #[arg(long, global = true)]
    parallelism: Option<usize>,

    /// Worker threads (clamped to CPU cores)
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Output naming scheme
    #[arg(long, value_enum, global = true)]
    layout: Option<OutputLayout>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            input: self.input.clone(),
            output: self.output.clone(),
            width: self.width,
            height: self.height,
            parallelism: self.parallelism,
            threads: self.threads,
            layout: self.layout,
        }
    }
}

#[derive(clap::Args)]
struct RunArgs {
    /// Write a JSON report of the run to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Scale every input image into the output directory
    Run(RunArgs),
    /// Validate settings and list the input files without writing anything
    Check,
    /// Print a stock config file with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins over --log-level
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .init();

    let overrides = cli.overrides();
    let config_file = cli.config.clone();

    match cli.command {
        Command::Run(args) => {
            let config = config::load_config(config_file.as_deref(), &overrides)?;
            println!(
                "==> Scaling {} → {} ({}x{})",
                config.input.display(),
                config.output.display(),
                config.width,
                config.height
            );

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_process_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = run::run(&config, &RustBackend::new(), Some(tx));
            printer.join().map_err(|_| "progress printer panicked")?;
            let report = result?;

            println!();
            output::print_summary(&report.stats);

            if let Some(path) = args.report {
                let json = serde_json::to_string_pretty(&report)?;
                std::fs::write(&path, json)?;
                println!("==> Report written to {}", path.display());
            }
        }
        Command::Check => {
            let config = config::load_config(config_file.as_deref(), &overrides)?;
            println!("==> Checking {}", config.input.display());
            let plan = run::plan(&config)?;
            output::print_scan_output(&plan.files);
            println!("==> Input is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
