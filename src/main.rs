use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod aws;
mod commands;
mod policy;

use aws::AwsSession;

#[derive(Parser)]
#[command(name = "aws-exposure")]
#[command(about = "Audit cross-account, cross-organization, and public exposure of AWS resources", long_about = None)]
#[command(version)]
struct Cli {
    /// AWS profile to use instead of the ambient default
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Verbose diagnostics on stderr (same as RUST_LOG=debug)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find AMIs shared with other accounts or public (AWS Backup images excluded)
    Ami,

    /// Find recovery points copied in from other accounts, per vault
    Backups,

    /// Find event buses granting cross-account or cross-organization access
    EventBridge,

    /// Find roles assumable from foreign accounts or organizations
    Iam,

    /// Find KMS key policies with cross-account or cross-organization grants
    Kms,

    /// Find Lambda function policies with cross-account grants
    Lambda,

    /// AWS Organizations inventory reports
    Org {
        #[command(subcommand)]
        report: OrgCommands,
    },

    /// List resources shared out through AWS RAM
    Ram,

    /// Rank regions and services by last month's unblended cost
    RegionUsage,

    /// Check S3 bucket policies, bucket ACLs, and sampled object ACLs
    S3,

    /// Report Config/SecurityHub/GuardDuty/CloudTrail status per region
    SecurityServices,

    /// Export an Identity Center assignment inventory as CSV
    SsoReport {
        /// Output CSV file path
        #[arg(
            short,
            long,
            default_value = "aws_sso_report_all_regions_with_idp.csv"
        )]
        output: String,
    },

    /// Generate shell completion scripts
    GenerateCompletion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum OrgCommands {
    /// Delegated administrator accounts and their services
    DelegatedAdmins,
    /// Policy types enabled at the organization root
    PolicyTypes,
    /// Services with organization-wide trusted access enabled
    TrustedAccess,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Commands::GenerateCompletion { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "aws-exposure", &mut std::io::stdout());
        return Ok(());
    }

    let aws = AwsSession::connect(cli.profile.as_deref()).await;

    match cli.command {
        Commands::Ami => commands::ami::run(&aws).await,
        Commands::Backups => commands::backups::run(&aws).await,
        Commands::EventBridge => commands::event_bridge::run(&aws).await,
        Commands::Iam => commands::iam::run(&aws).await,
        Commands::Kms => commands::kms::run(&aws).await,
        Commands::Lambda => commands::lambda::run(&aws).await,
        Commands::Org { report } => match report {
            OrgCommands::DelegatedAdmins => commands::org::delegated_admins(&aws).await,
            OrgCommands::PolicyTypes => commands::org::policy_types(&aws).await,
            OrgCommands::TrustedAccess => commands::org::trusted_access(&aws).await,
        },
        Commands::Ram => commands::ram::run(&aws).await,
        Commands::RegionUsage => commands::region_usage::run(&aws).await,
        Commands::S3 => commands::s3::run(&aws).await,
        Commands::SecurityServices => commands::security_services::run(&aws).await,
        Commands::SsoReport { output } => commands::sso_report::run(&aws, &output).await,
        Commands::GenerateCompletion { .. } => unreachable!("handled above"),
    }
}
