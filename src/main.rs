use asa_cli::config::{self, Config, ProfileSettings, DEFAULT_PROFILE};
use asa_cli::output::{render_json, render_list, render_report, render_table, OutputFormat};
use asa_cli::search_ads::selector::{OrderByItem, Pagination, SortOrder, DEFAULT_PAGE_LIMIT};
use asa_cli::{
    resolve_org_id, AclService, ApiClient, AsaError, AuthTransport, CampaignService, ReportLevel,
    ReportRequest, ReportingService, Selector, TokenProvider,
};
use clap::{Args, Parser, Subcommand};
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const EXIT_FAILURE: i32 = 1;

#[derive(Parser, Debug)]
#[command(name = "asa-cli")]
#[command(about = "Apple Search Ads CLI")]
#[command(long_about = "A command-line interface for the Apple Search Ads Campaign Management API v5.")]
struct Cli {
    /// Config profile name
    #[arg(short, long, global = true)]
    profile: Option<String>,

    /// Organization ID (overrides config)
    #[arg(long, global = true)]
    org_id: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    /// Print redacted HTTP traces and debug logs to stderr
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Configure Apple Search Ads credentials
    ///
    /// Without flags, prompts for each value. Org ID is optional: single-org
    /// accounts are detected automatically.
    Configure(ConfigureArgs),

    /// Display the organizations the API user can access (GET /acls)
    Whoami,

    /// Manage campaigns
    Campaigns {
        #[command(subcommand)]
        cmd: CampaignCmd,
    },

    /// Pull campaign reports
    Reports {
        #[command(subcommand)]
        cmd: ReportCmd,
    },
}

#[derive(Args, Debug)]
struct ConfigureArgs {
    /// Apple Search Ads Client ID
    #[arg(long)]
    client_id: Option<String>,

    /// Apple Developer Team ID
    #[arg(long)]
    team_id: Option<String>,

    /// API Key ID
    #[arg(long)]
    key_id: Option<String>,

    /// Path to private key (.pem or .p8 file)
    #[arg(long)]
    private_key_path: Option<String>,
}

impl ConfigureArgs {
    fn is_empty(&self) -> bool {
        self.client_id.is_none()
            && self.team_id.is_none()
            && self.key_id.is_none()
            && self.private_key_path.is_none()
    }
}

#[derive(Subcommand, Debug)]
enum CampaignCmd {
    /// List campaigns one page at a time
    List {
        #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },

    /// Show one campaign
    Get { id: i64 },

    /// Find campaigns with filters and sorting
    ///
    /// Filters: field=value, field~value (contains), field!~value,
    /// field@a,b (in), field>value, field<value, field>=value, field<=value.
    /// Sorts: field or field:asc|desc.
    Find {
        /// Filter condition (repeatable)
        #[arg(short, long = "filter")]
        filters: Vec<String>,

        /// Sort order (repeatable)
        #[arg(short, long = "sort")]
        sorts: Vec<String>,

        /// Page size
        #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
        limit: u32,

        /// Follow pagination and return every match
        #[arg(long, default_value_t = false)]
        all: bool,
    },

    /// Delete a campaign
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum ReportCmd {
    /// Campaign-level report
    Campaigns(ReportArgs),

    /// Ad group-level report
    #[command(name = "adgroups")]
    AdGroups(CampaignReportArgs),

    /// Keyword-level report
    Keywords(CampaignReportArgs),

    /// Search terms report
    SearchTerms(CampaignReportArgs),
}

#[derive(Args, Debug, Clone)]
struct ReportArgs {
    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    start_date: String,

    /// End date (YYYY-MM-DD)
    #[arg(long)]
    end_date: String,

    /// Granularity: HOURLY, DAILY, WEEKLY, MONTHLY
    #[arg(long)]
    granularity: Option<String>,

    /// Comma-separated group by fields (e.g. countryOrRegion,deviceClass)
    #[arg(long)]
    group_by: Option<String>,

    /// Result limit
    #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
    limit: u32,

    /// Include grand totals
    #[arg(long, default_value_t = false)]
    grand_totals: bool,
}

#[derive(Args, Debug, Clone)]
struct CampaignReportArgs {
    /// Campaign ID
    #[arg(long)]
    campaign_id: i64,

    #[command(flatten)]
    report: ReportArgs,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(EXIT_FAILURE);
    }
}

/// Log to stderr; `RUST_LOG` wins over the `--verbose` default
fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,asa_cli=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), AsaError> {
    match &cli.command {
        Command::Configure(args) => configure(&cli, args).await,
        Command::Whoami => whoami(&cli).await,
        Command::Campaigns { cmd } => campaigns(&cli, cmd).await,
        Command::Reports { cmd } => reports(&cli, cmd).await,
    }
}

// ============================================================================
// Client construction
// ============================================================================

/// Authenticated pieces shared by every API command of one run
struct Session {
    config: Config,
    provider: Arc<TokenProvider>,
    verbose: bool,
}

impl Session {
    async fn open(cli: &Cli) -> Result<Self, AsaError> {
        let config = Config::load(cli.profile.as_deref())
            .await
            .map_err(|e| e.context("loading config"))?;
        let credentials = config.credentials();
        credentials.validate()?;

        let provider = TokenProvider::new(credentials, Some(config.token_cache_path()))?;
        Ok(Self {
            config,
            provider: Arc::new(provider),
            verbose: cli.verbose,
        })
    }

    fn client(&self, org_id: Option<&str>) -> Result<ApiClient, AsaError> {
        let mut transport = AuthTransport::new(self.provider.clone())?.with_verbose(self.verbose);
        if let Some(org_id) = org_id {
            transport = transport.with_org_id(org_id);
        }
        Ok(ApiClient::new(transport))
    }

    /// Client scoped to the flag, configured or auto-detected organization
    async fn org_client(&self, explicit: Option<&str>) -> Result<ApiClient, AsaError> {
        let configured = self.provider.credentials().org_id.clone();
        let lookup = self.client(None)?;
        let org_id = resolve_org_id(explicit, configured.as_deref(), &lookup).await?;
        tracing::debug!("Profile {:?} scoped to an organization", self.config.profile);
        self.client(Some(&org_id))
    }
}

fn print_text(text: &str) {
    print!("{}", text);
    if !text.ends_with('\n') {
        println!();
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn configure(cli: &Cli, args: &ConfigureArgs) -> Result<(), AsaError> {
    // --org-id is global; when given it is stored with the profile
    let settings = if args.is_empty() && cli.org_id.is_none() {
        prompt_settings()?
    } else {
        match (&args.client_id, &args.team_id, &args.key_id, &args.private_key_path) {
            (Some(client_id), Some(team_id), Some(key_id), Some(private_key_path)) => {
                ProfileSettings {
                    client_id: client_id.clone(),
                    team_id: team_id.clone(),
                    key_id: key_id.clone(),
                    org_id: cli.org_id.clone().unwrap_or_default(),
                    private_key_path: private_key_path.clone(),
                }
            }
            _ => {
                return Err(AsaError::Config(
                    "required flags: --client-id, --team-id, --key-id, --private-key-path\n\
                     Optional: --org-id (auto-detected for single-org accounts)"
                        .to_string(),
                ))
            }
        }
    };

    let key_path = config::expand_path(&settings.private_key_path);
    if !key_path.exists() {
        return Err(AsaError::Config(format!(
            "private key file not found: {}",
            key_path.display()
        )));
    }

    let profile = cli.profile.clone().unwrap_or_else(|| DEFAULT_PROFILE.to_string());
    let dir = config::config_dir()?;
    config::save_profile(&dir, &profile, settings)
        .await
        .map_err(|e| e.context("saving config"))?;

    println!("Configuration saved for profile '{}'.", profile);
    println!("Verify with: asa-cli whoami");
    Ok(())
}

fn prompt_settings() -> Result<ProfileSettings, AsaError> {
    println!("Apple Search Ads CLI Configuration");
    println!("===================================");
    println!();
    println!("You'll need your API credentials from https://ads.apple.com (Settings > API tab).");
    println!();

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    Ok(ProfileSettings {
        client_id: prompt(&mut input, "Client ID", true)?,
        team_id: prompt(&mut input, "Team ID", true)?,
        key_id: prompt(&mut input, "Key ID", true)?,
        org_id: prompt(
            &mut input,
            "Org ID (press Enter to skip, auto-detected for single-org accounts)",
            false,
        )?,
        private_key_path: prompt(&mut input, "Private Key Path (.pem or .p8 file)", true)?,
    })
}

fn prompt(input: &mut impl BufRead, label: &str, required: bool) -> Result<String, AsaError> {
    loop {
        print!("{}: ", label);
        std::io::stdout()
            .flush()
            .map_err(|e| AsaError::Config(format!("writing prompt: {}", e)))?;

        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .map_err(|e| AsaError::Config(format!("reading input: {}", e)))?;
        let value = line.trim().to_string();

        if !required || !value.is_empty() {
            return Ok(value);
        }
        if read == 0 {
            return Err(AsaError::Config(format!("{} is required", label)));
        }
        println!("  Value cannot be empty. Please try again.");
    }
}

async fn whoami(cli: &Cli) -> Result<(), AsaError> {
    let session = Session::open(cli).await?;
    let client = session.client(None)?;
    let acls = AclService::new(&client)
        .get_acls()
        .await
        .map_err(|e| e.context("fetching ACLs"))?;

    if acls.is_empty() {
        println!("No organizations found.");
        return Ok(());
    }

    print_text(&render_list(cli.output, &acls)?);
    if cli.output == OutputFormat::Table {
        println!();
        println!("Authenticated. {} organization(s) accessible.", acls.len());
    }
    Ok(())
}

async fn campaigns(cli: &Cli, cmd: &CampaignCmd) -> Result<(), AsaError> {
    let session = Session::open(cli).await?;
    let client = session.org_client(cli.org_id.as_deref()).await?;
    let service = CampaignService::new(&client);

    match cmd {
        CampaignCmd::List { limit, offset } => {
            let (campaigns, page) = service
                .list(*limit, *offset)
                .await
                .map_err(|e| e.context("listing campaigns"))?;
            print_text(&render_list(cli.output, &campaigns)?);
            if let (OutputFormat::Table, Some(page)) = (cli.output, page) {
                println!(
                    "Showing {} of {} campaign(s) from offset {}.",
                    campaigns.len(),
                    page.total_results,
                    offset
                );
            }
        }
        CampaignCmd::Get { id } => {
            let campaign = service
                .get(*id)
                .await
                .map_err(|e| e.context("getting campaign"))?;
            let text = match cli.output {
                OutputFormat::Json => render_json(&campaign)?,
                OutputFormat::Table => render_table(std::slice::from_ref(&campaign)),
            };
            print_text(&text);
        }
        CampaignCmd::Find {
            filters,
            sorts,
            limit,
            all,
        } => {
            let selector = Selector::from_tokens(filters, sorts, *limit);
            let campaigns = if *all {
                service.find_all(&selector).await
            } else {
                service.find(&selector).await.map(|(campaigns, _)| campaigns)
            }
            .map_err(|e| e.context("finding campaigns"))?;
            print_text(&render_list(cli.output, &campaigns)?);
        }
        CampaignCmd::Delete { id } => {
            service
                .delete(*id)
                .await
                .map_err(|e| e.context("deleting campaign"))?;
            println!("Campaign {} deleted.", id);
        }
    }
    Ok(())
}

async fn reports(cli: &Cli, cmd: &ReportCmd) -> Result<(), AsaError> {
    let (level, args) = match cmd {
        ReportCmd::Campaigns(args) => (ReportLevel::Campaigns, args),
        ReportCmd::AdGroups(a) => (
            ReportLevel::AdGroups {
                campaign_id: a.campaign_id,
            },
            &a.report,
        ),
        ReportCmd::Keywords(a) => (
            ReportLevel::Keywords {
                campaign_id: a.campaign_id,
            },
            &a.report,
        ),
        ReportCmd::SearchTerms(a) => (
            ReportLevel::SearchTerms {
                campaign_id: a.campaign_id,
            },
            &a.report,
        ),
    };

    let session = Session::open(cli).await?;
    let client = session.org_client(cli.org_id.as_deref()).await?;
    let report = ReportingService::new(&client)
        .report(level, &build_report_request(args))
        .await
        .map_err(|e| e.context("getting report"))?;

    let text = match cli.output {
        OutputFormat::Json => render_json(&report)?,
        OutputFormat::Table => render_report(&report),
    };
    print_text(&text);
    Ok(())
}

/// Report body: rows ordered by spend, row totals always on
fn build_report_request(args: &ReportArgs) -> ReportRequest {
    let group_by = args
        .group_by
        .as_deref()
        .map(|g| {
            g.split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    ReportRequest {
        start_time: args.start_date.clone(),
        end_time: args.end_date.clone(),
        granularity: args
            .granularity
            .as_deref()
            .filter(|g| !g.is_empty())
            .map(str::to_uppercase),
        group_by,
        selector: Some(Selector {
            conditions: Vec::new(),
            order_by: vec![OrderByItem {
                field: "localSpend".to_string(),
                sort_order: SortOrder::Descending,
            }],
            pagination: Pagination {
                offset: 0,
                limit: args.limit,
            },
        }),
        return_grand_totals: args.grand_totals,
        return_row_totals: true,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_report_request_defaults() {
        let cli = Cli::try_parse_from([
            "asa-cli",
            "reports",
            "keywords",
            "--campaign-id",
            "42",
            "--start-date",
            "2025-01-01",
            "--end-date",
            "2025-01-31",
            "--granularity",
            "daily",
            "--group-by",
            "countryOrRegion,deviceClass",
        ])
        .unwrap();

        let args = match cli.command {
            Command::Reports {
                cmd: ReportCmd::Keywords(a),
            } => {
                assert_eq!(a.campaign_id, 42);
                a.report
            }
            other => panic!("unexpected command {:?}", other),
        };

        let request = build_report_request(&args);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "startTime": "2025-01-01",
                "endTime": "2025-01-31",
                "granularity": "DAILY",
                "groupBy": ["countryOrRegion", "deviceClass"],
                "selector": {
                    "orderBy": [{"field": "localSpend", "sortOrder": "DESCENDING"}],
                    "pagination": {"offset": 0, "limit": 1000}
                },
                "returnRowTotals": true
            })
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "asa-cli", "campaigns", "find", "-f", "status=ENABLED", "--sort", "name:desc", "--all",
            "-o", "json", "--org-id", "123", "-v",
        ])
        .unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.org_id.as_deref(), Some("123"));
        assert!(cli.verbose);
        match cli.command {
            Command::Campaigns {
                cmd: CampaignCmd::Find { filters, sorts, limit, all },
            } => {
                assert_eq!(filters, vec!["status=ENABLED"]);
                assert_eq!(sorts, vec!["name:desc"]);
                assert_eq!(limit, DEFAULT_PAGE_LIMIT);
                assert!(all);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_search_terms_requires_campaign_id() {
        let err = Cli::try_parse_from([
            "asa-cli",
            "reports",
            "search-terms",
            "--start-date",
            "2025-01-01",
            "--end-date",
            "2025-01-31",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_prompt_retries_empty_required_values() {
        let mut input = std::io::Cursor::new("\n  \nvalue\n");
        assert_eq!(prompt(&mut input, "Client ID", true).unwrap(), "value");

        let mut input = std::io::Cursor::new("\n");
        assert_eq!(prompt(&mut input, "Org ID", false).unwrap(), "");

        let mut input = std::io::Cursor::new("");
        assert!(prompt(&mut input, "Key ID", true).is_err());
    }
}
