use clap::{Args, Parser, Subcommand};
use ngac_core::{
    AccessDecisionPoint, FileRecords, NgacConfig, NgacError, PolicyAdministrationPoint,
    PolicyStoreAdapter, StaticIdentity,
};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ngac-cli", version = "0.1.0")]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the policy records
    #[arg(long, global = true, default_value = "./ngac-data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct Caller {
    /// Common name of the caller
    #[arg(long)]
    name: String,

    /// Organization (MSP id) of the caller
    #[arg(long)]
    org: String,

    /// Role attribute carried by the caller's credential
    #[arg(long)]
    role: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the catalog policy; the caller becomes its first administrator
    Init {
        #[command(flatten)]
        caller: Caller,
    },
    /// Approve an account and add it to the catalog policy
    ApproveAccount {
        #[command(flatten)]
        caller: Caller,
        /// Name of the account (organization) to approve
        #[arg(long)]
        account: String,
    },
    /// Decide whether the caller holds a permission on a target
    Check {
        #[command(flatten)]
        caller: Caller,
        #[arg(long)]
        target: String,
        #[arg(long)]
        permission: String,
    },
    /// Print a namespace's policy store as JSON
    Show {
        /// Namespace to print; the catalog namespace when omitted
        #[arg(long)]
        namespace: Option<String>,
    },
}

impl Caller {
    fn identity(&self, config: &NgacConfig) -> StaticIdentity {
        let identity = StaticIdentity::new(&self.name, &self.org);
        match &self.role {
            Some(role) => identity.with_attribute(&config.role_attribute, role),
            None => identity,
        }
    }
}

fn run(cli: Cli) -> ngac_core::Result<()> {
    let config = match &cli.config {
        Some(path) => NgacConfig::from_file(path)?,
        None => NgacConfig::default(),
    };
    let records = FileRecords::new(&cli.data_dir);

    match cli.command {
        Commands::Init { caller } => {
            let pap = PolicyAdministrationPoint::new(records, config.clone());
            pap.initialize_catalog(&caller.identity(&config))?;
            println!("Initialized catalog policy in {}", config.catalog_namespace);
        }
        Commands::ApproveAccount { caller, account } => {
            let pap = PolicyAdministrationPoint::new(records, config.clone());
            pap.approve_account(&caller.identity(&config), &account)?;
            println!("Approved account {}", account);
        }
        Commands::Check {
            caller,
            target,
            permission,
        } => {
            let pdp = AccessDecisionPoint::new(records, config.clone());
            pdp.check(&caller.identity(&config), &target, &permission)?;
            println!("allow");
        }
        Commands::Show { namespace } => {
            let namespace = namespace.unwrap_or_else(|| config.catalog_namespace.clone());
            let store = PolicyStoreAdapter::new(records).load(&namespace)?;
            let document = serde_json::json!({
                "graph": store.graph(),
                "prohibitions": store.prohibitions(),
                "obligations": store.obligations(),
            });
            match serde_json::to_string_pretty(&document) {
                Ok(json) => println!("{}", json),
                Err(source) => {
                    return Err(NgacError::MarshalError {
                        namespace,
                        record: "store".to_string(),
                        source,
                    })
                }
            }
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    info!("Using data directory {:?}", cli.data_dir);

    if let Err(e) = run(cli) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
