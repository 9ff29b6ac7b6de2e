//! maven-bundle CLI
//!
//! Entry point for the `maven-bundle` command-line tool.

use clap::{Args, Parser, Subcommand};
use maven_bundle::archive::list_entries;
use maven_bundle::checksum::write_checksums;
use maven_bundle::config::{ConfigError, DEFAULT_CONFIG_FILE};
use maven_bundle::{ArchiveFormat, EffectiveConfig, ExitCode, ReleaseError, ReleasePipeline};
use maven_digest::{digest_file, parse_algorithms, DEFAULT_ALGORITHMS};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "maven-bundle")]
#[command(about = "Checksum, sign and package release artifacts as a Maven repository bundle", version)]
struct Cli {
    /// Log debug output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Checksum, sign and archive the staging root
    Bundle {
        #[command(flatten)]
        release: ReleaseArgs,

        /// Print the bundle report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write checksum and signature sidecars without archiving
    Collect {
        #[command(flatten)]
        release: ReleaseArgs,

        /// Print the collection report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Archive the staging root as it is
    Assemble {
        #[command(flatten)]
        release: ReleaseArgs,

        /// Print the archive summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print or write digests of individual files
    Checksum {
        /// Files to digest
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Digest algorithm (repeatable; default: SHA-1 and MD5)
        #[arg(long, short = 'a')]
        algorithm: Vec<String>,

        /// Write `<file>.<ext>` sidecars instead of printing
        #[arg(long)]
        write: bool,
    },

    /// List the entries of a bundle archive
    List {
        /// Archive path (.zip or .tar.gz)
        archive: PathBuf,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration with provenance
    Config {
        #[command(flatten)]
        release: ReleaseArgs,
    },
}

/// Flags shared by every command that reads the release configuration
#[derive(Args)]
struct ReleaseArgs {
    /// Release config file (default: ./release.toml when present)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Staging root
    #[arg(long)]
    staging: Option<PathBuf>,

    /// Archive output directory
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Maven groupId
    #[arg(long)]
    group_id: Option<String>,

    /// Project name (artifactId defaults to its lowercased form)
    #[arg(long)]
    name: Option<String>,

    /// Maven artifactId
    #[arg(long)]
    artifact_id: Option<String>,

    /// Release version
    #[arg(long = "version", value_name = "VERSION")]
    release_version: Option<String>,

    /// Archive format (zip, tar.gz, tgz)
    #[arg(long, value_parser = clap::value_parser!(ArchiveFormat))]
    format: Option<ArchiveFormat>,

    /// Digest algorithm (repeatable, replaces the configured list)
    #[arg(long, short = 'a')]
    algorithm: Vec<String>,

    /// Signing key passed as --local-user
    #[arg(long)]
    key_id: Option<String>,

    /// Skip signing
    #[arg(long)]
    no_sign: bool,

    /// Copy maven-metadata-local.xml from the local repository first
    #[arg(long)]
    import_metadata: bool,
}

impl ReleaseArgs {
    /// CLI layer of the configuration; only flags that were given
    fn overrides(&self) -> Value {
        let mut root = Map::new();
        let mut section = |name: &str, key: &str, value: Value| {
            let entry = root
                .entry(name.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(map) = entry {
                map.insert(key.to_string(), value);
            }
        };

        if let Some(group_id) = &self.group_id {
            section("project", "group_id", json!(group_id));
        }
        if let Some(name) = &self.name {
            section("project", "name", json!(name));
        }
        if let Some(artifact_id) = &self.artifact_id {
            section("project", "artifact_id", json!(artifact_id));
        }
        if let Some(version) = &self.release_version {
            section("project", "version", json!(version));
        }
        if let Some(staging) = &self.staging {
            section("staging", "root", json!(staging));
        }
        if let Some(output_dir) = &self.output_dir {
            section("archive", "output_dir", json!(output_dir));
        }
        if let Some(format) = &self.format {
            section("archive", "format", json!(format));
        }
        if !self.algorithm.is_empty() {
            section("checksums", "algorithms", json!(self.algorithm));
        }
        if let Some(key_id) = &self.key_id {
            section("signing", "key_id", json!(key_id));
        }
        if self.no_sign {
            section("signing", "enabled", json!(false));
        }
        if self.import_metadata {
            section("metadata", "import_local", json!(true));
        }

        Value::Object(root)
    }

    fn load(&self) -> Result<EffectiveConfig, ConfigError> {
        let config_path = match &self.config {
            Some(path) => Some(path.clone()),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.is_file().then_some(default)
            }
        };
        EffectiveConfig::build(config_path.as_deref(), Some(self.overrides()))
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match cli.command {
        Commands::Bundle { release, json } => run_bundle(&release, json),
        Commands::Collect { release, json } => run_collect(&release, json),
        Commands::Assemble { release, json } => run_assemble(&release, json),
        Commands::Checksum {
            files,
            algorithm,
            write,
        } => run_checksum(&files, &algorithm, write),
        Commands::List { archive, json } => run_list(&archive, json),
        Commands::Config { release } => run_config(&release),
    };

    process::exit(code.as_i32());
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn pipeline(release: &ReleaseArgs) -> Result<ReleasePipeline, ReleaseError> {
    let effective = release.load()?;
    Ok(ReleasePipeline::new(effective.release()?))
}

fn run_bundle(release: &ReleaseArgs, json_output: bool) -> ExitCode {
    let result = pipeline(release).and_then(|mut p| p.run());
    match result {
        Ok(report) => {
            if json_output {
                print_json(&report)
            } else {
                eprintln!(
                    "Bundled {} ({} files, {} signed, {} signatures reused)",
                    report.coordinate,
                    report.collected.files.len(),
                    report.collected.signed(),
                    report.collected.reused_signatures()
                );
                if report.archive.duplicates > 0 {
                    eprintln!(
                        "Warning: {} duplicate archive paths were overwritten",
                        report.archive.duplicates
                    );
                }
                println!("{}", report.archive.path.display());
                ExitCode::Success
            }
        }
        Err(e) => report_error(&e, json_output),
    }
}

fn run_collect(release: &ReleaseArgs, json_output: bool) -> ExitCode {
    let result = pipeline(release).and_then(|mut p| p.collect());
    match result {
        Ok(report) => {
            if json_output {
                print_json(&report)
            } else {
                for file in &report.files {
                    eprintln!(
                        "  {} [{}] {} checksums, signature {:?}",
                        file.file.relative_path.display(),
                        file.file.role,
                        file.checksums.len(),
                        file.signature
                    );
                }
                eprintln!(
                    "Collected {} files ({} checksums written, {} signed)",
                    report.files.len(),
                    report.checksums_written(),
                    report.signed()
                );
                ExitCode::Success
            }
        }
        Err(e) => report_error(&e, json_output),
    }
}

fn run_assemble(release: &ReleaseArgs, json_output: bool) -> ExitCode {
    let result = pipeline(release).and_then(|p| p.assemble());
    match result {
        Ok(summary) => {
            if json_output {
                print_json(&summary)
            } else {
                for entry in &summary.entries {
                    eprintln!("  {}", entry);
                }
                eprintln!("Wrote {} entries, sha256 {}", summary.entries.len(), summary.sha256);
                println!("{}", summary.path.display());
                ExitCode::Success
            }
        }
        Err(e) => report_error(&e, json_output),
    }
}

fn run_checksum(files: &[PathBuf], names: &[String], write: bool) -> ExitCode {
    let algorithms = if names.is_empty() {
        DEFAULT_ALGORITHMS.to_vec()
    } else {
        match parse_algorithms(names) {
            Ok(algorithms) => algorithms,
            Err(e) => return report_error(&ReleaseError::from(e), false),
        }
    };

    for file in files {
        if write {
            match write_checksums(file, &algorithms) {
                Ok(records) => {
                    for record in records {
                        eprintln!("Wrote {}", record.sidecar_path().display());
                    }
                }
                Err(source) => return io_failure(file, source),
            }
        } else {
            for algorithm in &algorithms {
                match digest_file(file, *algorithm) {
                    Ok(digest) => println!("{}  {}  {}", algorithm, digest, file.display()),
                    Err(source) => return io_failure(file, source),
                }
            }
        }
    }

    ExitCode::Success
}

fn run_list(archive: &Path, json_output: bool) -> ExitCode {
    match list_entries(archive) {
        Ok(entries) => {
            if json_output {
                print_json(&entries)
            } else {
                for entry in entries {
                    println!("{}", entry);
                }
                ExitCode::Success
            }
        }
        Err(e) => report_error(&ReleaseError::from(e), json_output),
    }
}

fn run_config(release: &ReleaseArgs) -> ExitCode {
    match release.load() {
        Ok(effective) => print_json(&effective),
        Err(e) => report_error(&ReleaseError::from(e), true),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            ExitCode::Io
        }
    }
}

fn io_failure(path: &Path, source: std::io::Error) -> ExitCode {
    report_error(
        &ReleaseError::Io {
            path: path.to_path_buf(),
            source,
        },
        false,
    )
}

fn report_error(error: &ReleaseError, json_output: bool) -> ExitCode {
    let code = error.exit_code();
    if json_output {
        let body = json!({
            "error": {
                "kind": error.kind(),
                "message": error.to_string(),
                "exit_code": code.as_i32(),
            }
        });
        println!("{}", body);
    }
    eprintln!("Error: {}", error);
    code
}
