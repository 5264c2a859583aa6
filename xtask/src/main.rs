use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{exit, Command};

use clap::{Parser, Subcommand, ValueEnum};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const FUNCTION_PACKAGE: &str = "mig_scheduler_function";
const FUNCTION_BINARY: &str = "mig_scheduler";

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the MIG scheduler workspace",
    long_about = "A unified CLI for running the scheduler locally, CI checks,\n\
                  and packaging the release binary for deployment."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler locally with human-readable logs
    Run {
        /// Port for the CloudEvent endpoint
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Run CI checks (fmt, clippy, tests)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
    /// Build the scheduler binary and zip it for the container build context
    Package {
        /// Target triple to cross-compile for; the host triple when omitted
        #[arg(long)]
        target: Option<String>,
        /// Build profile used for the binary
        #[arg(value_enum, long, default_value_t = BuildProfile::Release)]
        profile: BuildProfile,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting and clippy
    Lint,
    /// Workspace tests
    Test,
    /// Lint + test
    Check,
}

#[derive(Clone, Copy, ValueEnum)]
enum BuildProfile {
    Debug,
    Release,
}

impl BuildProfile {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }

    fn as_cargo_flag(self) -> Option<&'static str> {
        match self {
            Self::Debug => None,
            Self::Release => Some("--release"),
        }
    }
}

// ── helpers ────────────────────────────────────────────────────────

/// Runs cargo and exits with its status code when it fails.
fn run_cargo(args: &[&str]) {
    eprintln!("\n$ cargo {}", args.join(" "));
    match Command::new("cargo").args(args).status() {
        Ok(status) if status.success() => {}
        Ok(status) => exit(status.code().unwrap_or(1)),
        Err(error) => {
            eprintln!("could not start cargo: {error}");
            exit(1);
        }
    }
}

fn package_scheduler(target: Option<&str>, profile: BuildProfile) -> io::Result<PathBuf> {
    let mut cargo_args = vec!["build", "-p", FUNCTION_PACKAGE, "--bin", FUNCTION_BINARY];
    if let Some(target) = target {
        cargo_args.extend(["--target", target]);
    }
    if let Some(flag) = profile.as_cargo_flag() {
        cargo_args.push(flag);
    }
    run_cargo(&cargo_args);

    let mut binary_path = PathBuf::from("target");
    if let Some(target) = target {
        binary_path.push(target);
    }
    binary_path.push(profile.dir_name());
    binary_path.push(FUNCTION_BINARY);

    fs::create_dir_all("dist")?;
    let zip_path = Path::new("dist").join(format!("{FUNCTION_BINARY}.zip"));
    write_binary_zip(&binary_path, &zip_path)?;
    Ok(zip_path)
}

/// Zips the binary as a single executable entry at the archive root.
fn write_binary_zip(binary_path: &Path, zip_path: &Path) -> io::Result<()> {
    let binary = fs::read(binary_path).map_err(|error| {
        io::Error::new(
            error.kind(),
            format!("reading {}: {error}", binary_path.display()),
        )
    })?;

    let mut zip = ZipWriter::new(fs::File::create(zip_path)?);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    zip.start_file(FUNCTION_BINARY, options)?;
    zip.write_all(&binary)?;
    zip.finish()?;
    Ok(())
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_lint() {
    run_cargo(&["fmt", "--all", "--", "--check"]);
    run_cargo(&[
        "clippy",
        "--workspace",
        "--all-targets",
        "--",
        "-D",
        "warnings",
    ]);
}

fn ci_test() {
    run_cargo(&["test", "-p", "mig_scheduler_core"]);
    run_cargo(&["test", "-p", FUNCTION_PACKAGE]);
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { port } => {
            let port = port.to_string();
            run_cargo(&[
                "run",
                "-p",
                FUNCTION_PACKAGE,
                "--bin",
                FUNCTION_BINARY,
                "--",
                "--port",
                &port,
                "--log-format",
                "text",
            ]);
        }
        Commands::Ci { job } => {
            match job {
                CiJob::Lint => ci_lint(),
                CiJob::Test => ci_test(),
                CiJob::Check => {
                    ci_lint();
                    ci_test();
                }
            }
            eprintln!("\nCI job passed.");
        }
        Commands::Package { target, profile } => {
            match package_scheduler(target.as_deref(), profile) {
                Ok(zip_path) => eprintln!("\nPackaged {}", zip_path.display()),
                Err(error) => {
                    eprintln!("packaging failed: {error}");
                    exit(1);
                }
            }
        }
    }
}
