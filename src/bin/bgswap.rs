use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, ValueEnum};

use bgswap::background::PRESETS;
use bgswap::export::default_output_path;
use bgswap::{BackgroundSpec, ComposeOptions, CompositeEngine, ProcessOptions, ProcessResult, Resample};

#[derive(Clone, Copy, ValueEnum)]
enum Filter {
    Bilinear,
    Nearest,
}

impl From<Filter> for Resample {
    fn from(f: Filter) -> Self {
        match f {
            Filter::Bilinear => Resample::Bilinear,
            Filter::Nearest => Resample::Nearest,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "bgswap",
    about = "Composite background-removed images over a new background",
    version,
    after_help = "Backgrounds: transparent, #rrggbb, a color name, a preset name,\n\
                  linear-gradient(to right, #f12711, #f5af19), or url(path/to/image.jpg).\n\n\
                  Without --mask the input's own alpha channel is the cutout."
)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Input image file or directory
    #[arg(required_unless_present = "list_presets")]
    input: Option<String>,

    /// Output file or directory (default: <name>-bgremoval.png next to the input)
    #[arg(short, long)]
    output: Option<String>,

    /// Background to composite over
    #[arg(short, long, default_value = "transparent")]
    background: String,

    /// Grayscale mask image supplying the cutout alpha
    #[arg(short, long)]
    mask: Option<PathBuf>,

    /// Resampling filter for image backgrounds
    #[arg(long, value_enum, default_value = "bilinear")]
    filter: Filter,

    /// Process images even if they have no transparency
    #[arg(short, long)]
    force: bool,

    /// List preset backgrounds and exit
    #[arg(long)]
    list_presets: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else if cli.quiet {
        tracing::Level::ERROR
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if cli.list_presets {
        for p in PRESETS {
            println!("{:<16} {}", p.name, p.value);
        }
        return;
    }

    let background: BackgroundSpec = match cli.background.parse() {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    if let Some(mask) = &cli.mask {
        if !mask.is_file() {
            eprintln!("Error: Mask file does not exist: {}", mask.display());
            process::exit(1);
        }
    }

    let opts = ProcessOptions {
        background,
        mask: cli.mask.clone(),
        force: cli.force,
        verbose: cli.verbose,
        quiet: cli.quiet,
        ..ProcessOptions::default()
    };

    let engine = CompositeEngine::new(ComposeOptions {
        resample: cli.filter.into(),
    });

    let Some(input) = cli.input.as_deref() else {
        eprintln!("Error: Input path is required");
        process::exit(1);
    };
    let input_path = Path::new(input);
    if !input_path.exists() {
        eprintln!("Error: Input path does not exist: {input}");
        process::exit(1);
    }

    tracing::info!("Background: {}", opts.background);

    let results = if input_path.is_dir() {
        let output_dir = if let Some(o) = &cli.output {
            PathBuf::from(o)
        } else {
            eprintln!("Error: Output directory is required for batch processing");
            eprintln!("Usage: bgswap <input_dir> -o <output_dir>");
            process::exit(1);
        };
        engine.process_directory(input_path, &output_dir, &opts)
    } else {
        let output_path = match &cli.output {
            Some(o) => PathBuf::from(o),
            None => default_output_path(input_path),
        };
        vec![engine.process_file(input_path, &output_path, &opts)]
    };

    let mut success_count = 0u32;
    let mut skip_count = 0u32;
    let mut fail_count = 0u32;

    for r in &results {
        print_result(r, &opts);
        if r.skipped {
            skip_count += 1;
        } else if r.success {
            success_count += 1;
        } else {
            fail_count += 1;
        }
    }

    if results.len() > 1 && !opts.quiet {
        eprintln!();
        eprint!("[Summary] Processed: {success_count}");
        if skip_count > 0 {
            eprint!(", Skipped: {skip_count}");
        }
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

fn print_result(result: &ProcessResult, opts: &ProcessOptions) {
    if opts.quiet && result.success {
        return;
    }

    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if result.skipped {
        eprintln!("[SKIP] {filename}: {}", result.message);
    } else if result.success {
        match &result.output {
            Some(out) => eprintln!("[OK] {filename} -> {}", out.display()),
            None => eprintln!("[OK] {filename}"),
        }
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }

    if opts.verbose && !result.message.is_empty() {
        eprintln!("  -> {}", result.message);
    }
}
