//! # `cce-scan` command line
//!
//! Argument definitions and the subcommand drivers. `main` only installs the
//! log backends and maps the outcome to an exit code.

use crate::inventory::{Inventory, InventoryError};
use cce_parser::config::TransportPreferences;
use cce_parser::logging::codes;
use cce_parser::{log_info, log_success, log_warning, RawConfigurationDocument};
use cce_scanner_base::api::{
    BatchRunResult, ComplianceScanner, ConnectionDescriptor, HostKeyPolicy, KeyCredential,
    RegistryError, RunResult, ScannerError,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const EXIT_SUCCESS: i32 = 0;
/// At least one run ended in `fetch-failed` or `parse-failed`
pub const EXIT_RUN_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Invalid arguments: {0}")]
    Usage(String),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("Rule catalog error: {0}")]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Scanner(#[from] ScannerError),

    #[error("Cannot access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

// ============================================================================
// ARGUMENTS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "cce-scan")]
#[command(author, version, about = "Automated compliance checks for pfSense appliances")]
#[command(long_about = "Fetches a pfSense configuration over SSH/SFTP and evaluates it \
    against the benchmark rule catalog.\n\n\
    Exit codes:\n  \
    0 - Every run completed\n  \
    1 - At least one run failed to fetch or parse\n  \
    2 - Configuration or runtime error")]
pub struct Cli {
    /// Increase log verbosity (-v, -vv for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch and evaluate one device
    Scan(ScanArgs),

    /// Evaluate every device listed in an inventory file
    Batch(BatchArgs),

    /// Evaluate a local XML or JSON configuration file
    CheckFile(CheckFileArgs),

    /// List the rule catalog
    Rules(RulesArgs),
}

#[derive(Parser, Debug)]
pub struct ScanArgs {
    /// Appliance host name or address
    pub host: String,

    /// Device id used in results and logs (defaults to the host)
    #[arg(long)]
    pub device_id: Option<String>,

    #[arg(short, long, default_value_t = 22)]
    pub port: u16,

    /// SSH user
    #[arg(short, long)]
    pub user: String,

    /// Private key file
    #[arg(short, long, conflicts_with = "agent")]
    pub identity: Option<PathBuf>,

    /// Environment variable holding the key passphrase
    #[arg(long, requires = "identity")]
    pub passphrase_env: Option<String>,

    /// Authenticate with keys held by the SSH agent
    #[arg(long)]
    pub agent: bool,

    /// Seconds allowed for connect, authentication and transfer
    #[arg(long)]
    pub timeout: Option<u64>,

    /// known_hosts file used for host key verification
    #[arg(long)]
    pub known_hosts: Option<PathBuf>,

    /// Skip host key verification (reported as a warning on the result)
    #[arg(long)]
    pub insecure_skip_host_key: bool,

    /// Remote configuration path
    #[arg(long)]
    pub remote_path: Option<String>,

    /// Re-run up to N times when the run times out
    #[arg(long, default_value_t = 0)]
    pub retry_timeouts: u32,

    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Write the result to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct BatchArgs {
    /// TOML inventory file
    pub inventory: PathBuf,

    /// Parallel runs (defaults to the number of CPUs)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Directory receiving one `<device>.json` result per device
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct CheckFileArgs {
    /// Configuration file (.xml or .json)
    pub path: PathBuf,

    /// Device id used in the result (defaults to the file stem)
    #[arg(long)]
    pub device_id: Option<String>,

    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct RulesArgs {
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

// ============================================================================
// DRIVERS
// ============================================================================

/// Run the selected subcommand and return the process exit code
pub fn run(cli: &Cli) -> Result<i32, CliError> {
    match &cli.command {
        Commands::Scan(args) => run_scan(args),
        Commands::Batch(args) => run_batch(args),
        Commands::CheckFile(args) => run_check_file(args),
        Commands::Rules(args) => run_rules(args),
    }
}

fn benchmark_scanner() -> Result<ComplianceScanner, CliError> {
    let registry = crate::create_benchmark_registry()?;
    let stats = registry.get_statistics();
    log_info!(
        "Rule registry initialized",
        "rules" => stats.total_rules,
        "healthy" => stats.registry_health.is_healthy()
    );
    Ok(ComplianceScanner::new(registry)?)
}

pub fn run_scan(args: &ScanArgs) -> Result<i32, CliError> {
    let descriptor = scan_descriptor(args, &TransportPreferences::default())?;
    let scanner = benchmark_scanner()?;
    let remote_path = args
        .remote_path
        .clone()
        .unwrap_or_else(|| scanner.config().default_remote_path.clone());

    let mut result = scanner.run(&descriptor, &remote_path);
    let mut retries = 0;
    while retries < args.retry_timeouts && is_retryable(&result) {
        retries += 1;
        log_warning!(
            code = codes::transport::TIMEOUT,
            "Run timed out, retrying",
            "device" => &descriptor.device_id,
            "attempt" => retries + 1
        );
        result = scanner.run(&descriptor, &remote_path);
    }

    emit(&render_run(&result, args.format)?, args.output.as_deref())?;
    Ok(exit_code(result.is_completed()))
}

/// Only transient failures (timeouts) are worth another attempt
fn is_retryable(result: &RunResult) -> bool {
    result.failure.as_ref().map_or(false, |failure| failure.transient)
}

pub fn scan_descriptor(
    args: &ScanArgs,
    preferences: &TransportPreferences,
) -> Result<ConnectionDescriptor, CliError> {
    let credential = match (&args.identity, args.agent) {
        (Some(path), _) => KeyCredential::File {
            private_key: path.clone(),
            public_key: None,
            passphrase_env: args.passphrase_env.clone(),
        },
        (None, true) => KeyCredential::Agent,
        (None, false) => {
            return Err(CliError::Usage(
                "either --identity or --agent is required".to_string(),
            ))
        }
    };

    let device_id = args.device_id.as_deref().unwrap_or(&args.host);
    let policy = if args.insecure_skip_host_key || !preferences.host_key_check {
        HostKeyPolicy::Disabled
    } else {
        HostKeyPolicy::Strict
    };

    let mut descriptor = ConnectionDescriptor::new(device_id, &args.host, &args.user, credential)
        .with_port(args.port)
        .with_host_key_policy(policy)
        .with_timeout(
            args.timeout
                .map(Duration::from_secs)
                .unwrap_or_else(|| preferences.timeout()),
        );
    if let Some(path) = args
        .known_hosts
        .as_ref()
        .or(preferences.known_hosts_path.as_ref())
    {
        descriptor = descriptor.with_known_hosts(path);
    }
    Ok(descriptor)
}

pub fn run_batch(args: &BatchArgs) -> Result<i32, CliError> {
    let jobs = Inventory::from_file(&args.inventory)?.jobs()?;
    let workers = args.jobs.unwrap_or_else(num_cpus::get);
    if workers == 0 {
        return Err(CliError::Usage("--jobs must be at least 1".to_string()));
    }

    log_info!(
        "Starting batch run",
        "devices" => jobs.len(),
        "workers" => workers,
        "inventory" => args.inventory.display()
    );
    let batch = benchmark_scanner()?.run_batch(&jobs, workers)?;

    if let Some(dir) = &args.output_dir {
        write_device_results(&batch, dir)?;
    }
    emit(&render_batch(&batch, args.format)?, None)?;

    if batch.all_completed() {
        log_success!(
            codes::success::RUN_COMPLETE,
            "Batch run completed",
            "devices" => batch.statistics.total_devices,
            "with_findings" => batch.statistics.devices_with_findings
        );
    } else {
        log_warning!(
            "Batch run had failed devices",
            "fetch_failures" => batch.statistics.fetch_failures,
            "parse_failures" => batch.statistics.parse_failures
        );
    }
    Ok(exit_code(batch.all_completed()))
}

fn write_device_results(batch: &BatchRunResult, dir: &Path) -> Result<(), CliError> {
    std::fs::create_dir_all(dir).map_err(|e| CliError::io(dir, e))?;
    let ids: Vec<&str> = batch.results.iter().map(|r| r.device_id.as_str()).collect();
    for (result, name) in batch.results.iter().zip(device_file_names(&ids)) {
        let path = dir.join(name);
        std::fs::write(&path, result.to_json()?).map_err(|e| CliError::io(&path, e))?;
    }
    Ok(())
}

/// One distinct `<stem>.json` per device. Ids that sanitize to a name already
/// taken get a `-2`, `-3`, ... suffix. Names are compared case-insensitively.
fn device_file_names(device_ids: &[&str]) -> Vec<String> {
    let mut taken = HashSet::new();
    device_ids
        .iter()
        .map(|id| {
            let stem = file_stem_for(id);
            let mut name = format!("{}.json", stem);
            let mut suffix = 2;
            while !taken.insert(name.to_ascii_lowercase()) {
                name = format!("{}-{}.json", stem, suffix);
                suffix += 1;
            }
            if suffix > 2 {
                log_warning!(
                    "Device result file name collided, added suffix",
                    "device" => id,
                    "file" => &name
                );
            }
            name
        })
        .collect()
}

/// Device ids come from the inventory; keep them from escaping `dir`
fn file_stem_for(device_id: &str) -> String {
    device_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}

pub fn run_check_file(args: &CheckFileArgs) -> Result<i32, CliError> {
    let scanner = benchmark_scanner()?;
    let document =
        RawConfigurationDocument::from_file(&args.path, scanner.config().parse_options.max_bytes)
            .map_err(|e| CliError::io(&args.path, e))?;
    let device_id = args.device_id.clone().unwrap_or_else(|| {
        args.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "local".to_string())
    });

    let result = scanner.evaluate_document(&device_id, document);
    emit(&render_run(&result, args.format)?, args.output.as_deref())?;
    Ok(exit_code(result.is_completed()))
}

pub fn run_rules(args: &RulesArgs) -> Result<i32, CliError> {
    let registry = crate::create_benchmark_registry()?;
    let catalog = registry.catalog();
    let rendered = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&catalog)?,
        OutputFormat::Text => catalog
            .iter()
            .map(|entry| format!("{:<7} {:<9} {}", entry.id, entry.category, entry.title))
            .collect::<Vec<_>>()
            .join("\n"),
    };
    emit(&rendered, None)?;
    Ok(EXIT_SUCCESS)
}

// ============================================================================
// OUTPUT
// ============================================================================

pub fn render_run(result: &RunResult, format: OutputFormat) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Text => result.summary_report(),
        OutputFormat::Json => result.to_json()?,
    })
}

pub fn render_batch(batch: &BatchRunResult, format: OutputFormat) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Json => batch.to_json()?,
        OutputFormat::Text => {
            let mut report = String::new();
            for result in &batch.results {
                report.push_str(&result.summary_report());
                report.push_str("\n\n");
            }
            report.push_str(&batch.summary());
            report
        }
    })
}

fn emit(rendered: &str, output: Option<&Path>) -> Result<(), CliError> {
    match output {
        Some(path) => {
            std::fs::write(path, rendered).map_err(|e| CliError::io(path, e))?;
            println!("[OK] Results saved to: {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

fn exit_code(completed: bool) -> i32 {
    if completed {
        EXIT_SUCCESS
    } else {
        EXIT_RUN_FAILED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    fn preferences() -> TransportPreferences {
        TransportPreferences {
            timeout_secs: 30,
            host_key_check: true,
            known_hosts_path: None,
            remote_config_path: "/conf/config.xml".to_string(),
        }
    }

    fn scan_args(cli: Cli) -> ScanArgs {
        match cli.command {
            Commands::Scan(args) => args,
            other => panic!("expected scan, got {:?}", other),
        }
    }

    #[test]
    fn test_scan_descriptor_from_flags() {
        let args = scan_args(parse(&[
            "cce-scan", "scan", "192.0.2.1", "-u", "audit", "-i", "/keys/id_ed25519",
            "--port", "2222", "--timeout", "15", "--device-id", "edge",
        ]));
        let descriptor = scan_descriptor(&args, &preferences()).unwrap();
        assert_eq!(descriptor.device_id, "edge");
        assert_eq!(descriptor.port, 2222);
        assert_eq!(descriptor.timeout, Duration::from_secs(15));
        assert_eq!(descriptor.host_key_policy, HostKeyPolicy::Strict);
        assert_eq!(descriptor.credential, KeyCredential::key_file("/keys/id_ed25519"));
    }

    #[test]
    fn test_insecure_flag_and_agent() {
        let args = scan_args(parse(&[
            "cce-scan", "scan", "fw", "-u", "audit", "--agent", "--insecure-skip-host-key",
        ]));
        let descriptor = scan_descriptor(&args, &preferences()).unwrap();
        assert_eq!(descriptor.device_id, "fw");
        assert_eq!(descriptor.credential, KeyCredential::Agent);
        assert_eq!(descriptor.host_key_policy, HostKeyPolicy::Disabled);
    }

    #[test]
    fn test_scan_requires_a_credential() {
        let args = scan_args(parse(&["cce-scan", "scan", "fw", "-u", "audit"]));
        assert_matches!(
            scan_descriptor(&args, &preferences()),
            Err(CliError::Usage(_))
        );
        assert!(Cli::try_parse_from([
            "cce-scan", "scan", "fw", "-u", "audit", "--agent", "-i", "/keys/id"
        ])
        .is_err());
    }

    #[test]
    fn test_check_file_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("edge.xml");
        std::fs::File::create(&config)
            .unwrap()
            .write_all(
                b"<pfsense><system><hostname>edge</hostname>\
                  <webgui><protocol>https</protocol><session_timeout>5</session_timeout></webgui>\
                  </system></pfsense>",
            )
            .unwrap();
        let output = dir.path().join("edge.json");

        let args = CheckFileArgs {
            path: config,
            device_id: None,
            format: OutputFormat::Json,
            output: Some(output.clone()),
        };
        assert_eq!(run_check_file(&args).unwrap(), EXIT_SUCCESS);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(output).unwrap()).unwrap();
        assert_eq!(written["device_id"], "edge");
        assert_eq!(written["status"], "completed");
        assert_eq!(written["verdicts"].as_array().unwrap().len(), 25);
    }

    #[test]
    fn test_check_file_parse_failure_exit_code() {
        let mut file = tempfile::Builder::new().suffix(".xml").tempfile().unwrap();
        file.write_all(b"<!DOCTYPE x [<!ENTITY a 'b'>]><pfsense/>").unwrap();
        let args = CheckFileArgs {
            path: file.path().to_path_buf(),
            device_id: Some("dtd".to_string()),
            format: OutputFormat::Text,
            output: Some(file.path().with_extension("txt")),
        };
        assert_eq!(run_check_file(&args).unwrap(), EXIT_RUN_FAILED);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let args = CheckFileArgs {
            path: PathBuf::from("/nonexistent/config.xml"),
            device_id: None,
            format: OutputFormat::Text,
            output: None,
        };
        assert_matches!(run_check_file(&args), Err(CliError::Io { .. }));
    }

    #[test]
    fn test_device_file_names_stay_in_directory() {
        assert_eq!(file_stem_for("edge-fw.01"), "edge-fw.01");
        assert_eq!(file_stem_for("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(file_stem_for("site a/fw"), "site_a_fw");
    }

    #[test]
    fn test_colliding_device_ids_get_distinct_files() {
        let names = device_file_names(&["fw/01", "fw_01", "FW_01", "fw_01-2", "edge"]);
        assert_eq!(
            names,
            vec!["fw_01.json", "fw_01-2.json", "FW_01-3.json", "fw_01-2-2.json", "edge.json"]
        );
    }

    #[test]
    fn test_batch_rejects_zero_jobs() {
        let mut inventory = tempfile::NamedTempFile::new().unwrap();
        inventory
            .write_all(b"[[device]]\nid = \"fw\"\nhost = \"192.0.2.1\"\nusername = \"a\"\ncredential = { type = \"agent\" }\n")
            .unwrap();
        let args = BatchArgs {
            inventory: inventory.path().to_path_buf(),
            jobs: Some(0),
            output_dir: None,
            format: OutputFormat::Text,
        };
        assert_matches!(run_batch(&args), Err(CliError::Usage(_)));
    }

    #[test]
    fn test_rules_subcommand_parses() {
        let cli = parse(&["cce-scan", "rules", "--format", "json"]);
        assert_matches!(
            cli.command,
            Commands::Rules(RulesArgs { format: OutputFormat::Json })
        );
        assert_eq!(run_rules(&RulesArgs { format: OutputFormat::Json }).unwrap(), EXIT_SUCCESS);
    }
}
