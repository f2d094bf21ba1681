//! Jobs command implementation
//!
//! `mera jobs list` shows ledger rows; `mera jobs retry` re-sends failed
//! ones, either a single job or a sweep of everything still under the cap.

use super::{build_client, build_ledger, build_registry};
use crate::config::{load_config, MeraConfig};
use crate::core::{JobListing, RetryEngine, RetryOutcome, RetryReport, RetryStatus};
use crate::domain::{JobFilter, JobId, JobStatus};
use chrono::NaiveDate;
use clap::{Args, Subcommand};

/// Arguments for the jobs command
#[derive(Args, Debug)]
pub struct JobsArgs {
    #[command(subcommand)]
    pub command: JobsCommand,
}

#[derive(Subcommand, Debug)]
pub enum JobsCommand {
    /// List jobs, newest first
    List(ListArgs),

    /// Re-send failed jobs
    Retry(RetryArgs),
}

/// Arguments for `jobs list`
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only jobs in this status (pending, success, failed)
    #[arg(long)]
    pub status: Option<JobStatus>,

    /// Only jobs with this resource tag, e.g. Observation_Lab
    #[arg(long)]
    pub resource_type: Option<String>,

    /// First creation date (YYYY-MM-DD); needs --to
    #[arg(long, requires = "to")]
    pub from: Option<NaiveDate>,

    /// Last creation date (YYYY-MM-DD); needs --from
    #[arg(long, requires = "from")]
    pub to: Option<NaiveDate>,

    /// Maximum number of rows
    #[arg(long)]
    pub limit: Option<usize>,

    /// Print the listing as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `jobs retry`
#[derive(Args, Debug)]
#[command(group(clap::ArgGroup::new("target").required(true).args(["id", "failed"])))]
pub struct RetryArgs {
    /// Retry this job
    #[arg(long)]
    pub id: Option<JobId>,

    /// Retry failed jobs still under the retry cap, oldest first
    #[arg(long)]
    pub failed: bool,

    /// Maximum number of jobs for --failed
    #[arg(long, requires = "failed")]
    pub limit: Option<usize>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

impl JobsArgs {
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        match &self.command {
            JobsCommand::List(args) => args.execute(&config).await,
            JobsCommand::Retry(args) => args.execute(&config).await,
        }
    }
}

impl ListArgs {
    fn filter(&self, default_limit: usize) -> JobFilter {
        let mut filter = JobFilter::default().with_limit(self.limit.unwrap_or(default_limit));
        if let Some(status) = self.status {
            filter = filter.with_status(status);
        }
        if let Some(ref resource_type) = self.resource_type {
            filter = filter.with_resource_type(resource_type.trim());
        }
        if let (Some(from), Some(to)) = (self.from, self.to) {
            filter = filter.created_between(from, to);
        }
        filter
    }

    async fn execute(&self, config: &MeraConfig) -> anyhow::Result<i32> {
        let ledger = match build_ledger(config) {
            Ok(l) => l,
            Err(e) => {
                println!("❌ Failed to set up job ledger");
                println!("   Error: {e}");
                return Ok(4);
            }
        };

        let listing = match ledger.list_jobs(&self.filter(config.jobs.list_limit)).await {
            Ok(l) => l,
            Err(e) => {
                println!("❌ Failed to list jobs");
                println!("   Error: {e}");
                return Ok(4);
            }
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&listing)?);
        } else {
            print_listing(&listing);
        }
        Ok(0)
    }
}

impl RetryArgs {
    async fn execute(&self, config: &MeraConfig) -> anyhow::Result<i32> {
        let (ledger, client) = match (build_ledger(config), build_client(config)) {
            (Ok(l), Ok(c)) => (l, c),
            (Err(e), _) | (_, Err(e)) => {
                println!("❌ Failed to set up retry engine");
                println!("   Error: {e}");
                return Ok(4);
            }
        };
        let engine = RetryEngine::new(ledger, build_registry(client));

        if let Some(id) = self.id {
            let outcome = engine.retry_one(id).await;
            if self.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_outcome(&outcome);
            }
            return Ok(outcome_exit_code(&outcome));
        }

        let limit = self.limit.unwrap_or(config.jobs.retry_batch_limit);
        let report = match engine.retry_failed(limit).await {
            Ok(r) => r,
            Err(e) => {
                println!("❌ Failed to load failed jobs");
                println!("   Error: {e}");
                return Ok(4);
            }
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }
        Ok(report_exit_code(&report))
    }
}

fn outcome_exit_code(outcome: &RetryOutcome) -> i32 {
    match outcome.status {
        RetryStatus::Success | RetryStatus::Skipped => 0,
        RetryStatus::Failed | RetryStatus::Error => 1,
    }
}

fn report_exit_code(report: &RetryReport) -> i32 {
    let errored = report
        .details
        .iter()
        .any(|o| o.status == RetryStatus::Error);
    if report.still_failed > 0 || errored {
        1
    } else {
        0
    }
}

fn print_listing(listing: &JobListing) {
    println!(
        "📋 {} job(s): {} pending, {} failed, {} success",
        listing.total, listing.pending, listing.failed, listing.success
    );
    if listing.jobs.is_empty() {
        return;
    }
    println!();
    println!(
        "{:<8} {:<22} {:<30} {:<8} {:<6} {:<20} {:<36}",
        "ID", "Resource", "Key", "Status", "Tries", "Created", "FHIR ID / Error"
    );
    println!("{}", "-".repeat(134));

    for job in &listing.jobs {
        let detail = match (&job.external_id, &job.error_message) {
            (Some(id), _) => id.to_string(),
            (None, Some(message)) => truncate(message, 36),
            (None, None) => String::new(),
        };
        println!(
            "{:<8} {:<22} {:<30} {:<8} {:<6} {:<20} {:<36}",
            job.id,
            job.resource_type.tag(),
            truncate(job.idempotency_key.as_str(), 30),
            job.status,
            job.retry_count,
            job.created_at.format("%Y-%m-%d %H:%M:%S"),
            detail
        );
    }
    println!();
}

fn print_outcome(outcome: &RetryOutcome) {
    let icon = match outcome.status {
        RetryStatus::Success => "✅",
        RetryStatus::Failed => "❌",
        RetryStatus::Skipped => "⏭️ ",
        RetryStatus::Error => "⚠️ ",
    };
    let resource = outcome.resource_type.as_deref().unwrap_or("-");
    let hint = match outcome.transient {
        Some(true) => " (transient, retry later)",
        Some(false) => " (needs a data or configuration fix)",
        None => "",
    };
    match &outcome.external_id {
        Some(id) => println!(
            "{icon} job {} ({resource}): {} - {}{hint} [{id}]",
            outcome.job_id, outcome.status, outcome.message
        ),
        None => println!(
            "{icon} job {} ({resource}): {} - {}{hint}",
            outcome.job_id, outcome.status, outcome.message
        ),
    }
}

fn print_report(report: &RetryReport) {
    println!(
        "🔁 Retried {} job(s): {} succeeded, {} still failed, {} not attempted",
        report.retried,
        report.succeeded,
        report.still_failed,
        report.not_attempted()
    );
    for outcome in &report.details {
        print_outcome(outcome);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut cut: String = s.chars().take(max.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}
