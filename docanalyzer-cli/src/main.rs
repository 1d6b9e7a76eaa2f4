//! fda: terminal front end for the financial document analysis service.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use docanalyzer::api::{AnalyzerApi, DocumentFile, HttpAnalyzerClient, JobListQuery, ProcessingMode};
use docanalyzer::config::DashboardConfig;
use docanalyzer::core::JobStatus;
use docanalyzer::dashboard::Dashboard;
use docanalyzer::events::{EventSink, LoggingEventSink};
use docanalyzer::observability::{init_logging, LogFormat};
use docanalyzer::polling::{probe_health, JobListState, JobPollState, JobPoller};
use docanalyzer::upload::{FileSource, UploadForm, UploadLimits};
use docanalyzer::views;

#[derive(Parser)]
#[command(
    name = "fda",
    about = "Financial document analyzer: submit PDFs and follow their analysis",
    version
)]
struct Cli {
    /// Base URL of the analysis service
    #[arg(long, global = true, env = "FDA_API_URL")]
    api_url: Option<String>,
    /// Default log filter, e.g. `info` or `docanalyzer=debug`
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Log line format
    #[arg(long, global = true, value_parser = ["pretty", "compact", "json"])]
    log_format: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a PDF for analysis
    Submit {
        /// Path to the PDF
        file: PathBuf,
        /// Question to answer; a generic investment question when omitted
        #[arg(long, short, default_value = "")]
        query: String,
        /// Processing mode
        #[arg(long, short, default_value = "async", value_parser = ["async", "sync"])]
        mode: String,
        /// Follow the job until it finishes
        #[arg(long, short)]
        follow: bool,
    },
    /// List recent analyses
    Jobs {
        /// Number of jobs to show
        #[arg(long, short)]
        limit: Option<u32>,
        /// Jobs to skip
        #[arg(long, default_value_t = 0)]
        offset: u32,
        /// Only jobs in this status
        #[arg(long, short, value_parser = ["pending", "processing", "completed", "failed"])]
        status: Option<String>,
    },
    /// Show one analysis with its stages
    Status {
        /// Job identifier
        job_id: String,
        /// Keep polling until the job finishes
        #[arg(long, short)]
        follow: bool,
    },
    /// Live dashboard: roster, health and the selected job
    Watch {
        /// Job to select on start
        job_id: Option<String>,
    },
    /// Check service health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = DashboardConfig::from_env().context("invalid FDA_* configuration")?;
    if let Some(url) = cli.api_url {
        config = config.with_api_url(url);
    }
    if let Some(level) = cli.log_level {
        config.log = config.log.with_level(level);
    }
    if let Some(format) = cli.log_format {
        config.log = config.log.with_format(format.parse::<LogFormat>()?);
    }
    init_logging(&config.log)?;

    let api = Arc::new(
        HttpAnalyzerClient::from_config(&config)
            .with_context(|| format!("cannot use API URL '{}'", config.api_url))?,
    );
    debug!(api_url = %api.base_url(), "client ready");

    match cli.command {
        Commands::Submit {
            file,
            query,
            mode,
            follow,
        } => cmd_submit(api, &config, &file, query, &mode, follow).await,
        Commands::Jobs {
            limit,
            offset,
            status,
        } => cmd_jobs(api.as_ref(), &config, limit, offset, status).await,
        Commands::Status { job_id, follow } => cmd_status(api, &config, job_id, follow).await,
        Commands::Watch { job_id } => cmd_watch(api, &config, job_id).await,
        Commands::Health => cmd_health(api.as_ref()).await,
    }
}

// ─── Command implementations ──────────────────────────────────────────────────

fn read_document(path: &Path) -> Result<DocumentFile> {
    let bytes = std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    let content_type = mime_guess::from_path(path).first_or_octet_stream();
    Ok(DocumentFile::new(name, content_type.essence_str(), bytes))
}

fn events() -> Arc<dyn EventSink> {
    Arc::new(LoggingEventSink::default())
}

async fn cmd_submit(
    api: Arc<HttpAnalyzerClient>,
    config: &DashboardConfig,
    path: &Path,
    query: String,
    mode: &str,
    follow: bool,
) -> Result<()> {
    let mut form = UploadForm::new(UploadLimits::from_config(config)).with_events(events());
    form.select_file(read_document(path)?, FileSource::Picker)?;
    form.set_query(query);
    form.set_mode(mode.parse::<ProcessingMode>()?);

    let submitted = form.submit(api.as_ref()).await?;
    println!("Submitted {} as job {}", path.display(), submitted.job_id);
    if let Some(message) = &submitted.message {
        println!("{message}");
    }
    if let Some(analysis) = &submitted.analysis {
        println!();
        println!("{analysis}");
    }

    if follow {
        follow_job(api, config, submitted.job_id).await?;
    }
    Ok(())
}

async fn cmd_jobs(
    api: &dyn AnalyzerApi,
    config: &DashboardConfig,
    limit: Option<u32>,
    offset: u32,
    status: Option<String>,
) -> Result<()> {
    let query = JobListQuery {
        limit: limit.unwrap_or(config.list_limit),
        offset,
        status: status
            .as_deref()
            .map(|s| serde_json::from_value::<JobStatus>(serde_json::json!(s)))
            .transpose()?,
    };
    let page = api.list_jobs(&query).await?;

    let state = JobListState {
        total: page.total,
        jobs: page.jobs,
        loading: false,
        ..Default::default()
    };
    println!("{}", views::render_job_list(&state, None, chrono::Utc::now()));
    println!("{} of {} shown", state.jobs.len(), state.total);
    Ok(())
}

async fn cmd_status(
    api: Arc<HttpAnalyzerClient>,
    config: &DashboardConfig,
    job_id: String,
    follow: bool,
) -> Result<()> {
    if follow {
        return follow_job(api, config, job_id).await;
    }

    let job = api.get_job(&job_id).await?;
    let result = if job.status == JobStatus::Completed {
        api.get_result(&job_id).await?
    } else {
        None
    };
    let mut state = JobPollState::default();
    state.job_id = Some(job_id);
    state.job = Some(job);
    state.result = result;
    println!("{}", views::render_job_detail(&state, chrono::Utc::now()));
    Ok(())
}

async fn follow_job(
    api: Arc<HttpAnalyzerClient>,
    config: &DashboardConfig,
    job_id: String,
) -> Result<()> {
    let mut poller = JobPoller::new(api, config).with_events(events());
    let mut rx = poller.subscribe();
    poller.set_job(Some(job_id));

    let mut last_status = None;
    loop {
        let state = rx.borrow_and_update().clone();
        if let Some(job) = &state.job {
            if last_status != Some(job.status) {
                println!("status: {}", job.status.badge_label());
                last_status = Some(job.status);
            }
        }
        if !state.is_polling {
            println!();
            println!("{}", views::render_job_detail(&state, chrono::Utc::now()));
            if let Some(error) = state.error {
                anyhow::bail!(error);
            }
            return Ok(());
        }

        tokio::select! {
            changed = rx.changed() => changed.context("job poller stopped")?,
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}

async fn cmd_watch(
    api: Arc<HttpAnalyzerClient>,
    config: &DashboardConfig,
    job_id: Option<String>,
) -> Result<()> {
    let mut dashboard = Dashboard::new(api, config).with_events(events());
    dashboard.start();
    if let Some(job_id) = job_id {
        dashboard.select_job(job_id);
    }

    loop {
        // Clear the screen and home the cursor before each frame.
        print!("\x1b[2J\x1b[H");
        println!("{}", dashboard.render());
        tokio::select! {
            () = dashboard.changed() => {}
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    dashboard.stop();
    Ok(())
}

async fn cmd_health(api: &dyn AnalyzerApi) -> Result<()> {
    let health = probe_health(api).await;
    println!("{}", views::render_header(health));
    Ok(())
}
