use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cid_ledger::core::{FILE_CID_KEY, USER_FILE_CID_KEY};
use cid_ledger::{
    write_programs, Address, AppClient, AppId, AppIdFile, DeployConfig, Ledger, LedgerClient,
    LedgerConfig, StateMap, StateValue,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "cid-ledger", version, about = "Deploy and drive the CID storage application")]
struct Cli {
    /// Rounds to wait for each confirmation (overrides CID_LEDGER_WAIT_ROUNDS)
    #[arg(long, global = true)]
    wait_rounds: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy the application and write its programs and id
    Deploy {
        /// Directory for approval.teal, clear_state.teal and app_id.json
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Opt the signer in to an application
    OptIn {
        #[arg(long)]
        app_id: u64,
    },
    /// Upload a CID as the signer
    Upload {
        #[arg(long)]
        app_id: u64,

        /// Content identifier, at most 46 bytes
        #[arg(long)]
        cid: String,
    },
    /// Print an application's stored CIDs
    Show {
        #[arg(long)]
        app_id: u64,

        /// Account address (hex); defaults to the signer
        #[arg(long)]
        account: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = DeployConfig::from_env().context("reading configuration from environment")?;
    if let Some(wait_rounds) = cli.wait_rounds {
        config.wait_rounds = wait_rounds;
    }

    let store = config
        .ledger
        .open()
        .with_context(|| format!("opening ledger at {:?}", config.ledger))?;
    let ledger = Arc::new(Ledger::new(store, LedgerConfig::default()));
    let signer = config.keypair();
    info!(signer = ?signer.address(), "loaded signer");

    match cli.command {
        Commands::Deploy { out_dir } => {
            let (approval, clear) =
                write_programs(&out_dir).context("writing program sources")?;
            println!("wrote {}", approval.display());
            println!("wrote {}", clear.display());

            let app = AppClient::deploy(ledger.clone(), &signer, config.wait_rounds)
                .await
                .context("deploying application")?;
            let round = ledger.status().await?;

            let path = AppIdFile::new(app.app_id(), &signer.address(), round)
                .save(&out_dir)
                .context("writing app id")?;
            println!("deployed application {}", app.app_id());
            println!("wrote {}", path.display());
        }
        Commands::OptIn { app_id } => {
            let app = AppClient::new(ledger, AppId(app_id), config.wait_rounds);
            let confirmation = app.opt_in(&signer).await.context("opting in")?;
            println!(
                "opted in to application {} in round {}",
                app_id, confirmation.round
            );
        }
        Commands::Upload { app_id, cid } => {
            let app = AppClient::new(ledger, AppId(app_id), config.wait_rounds);
            let confirmation = app
                .upload_file(&signer, &cid)
                .await
                .context("uploading CID")?;
            println!("stored {} in round {}", cid, confirmation.round);
        }
        Commands::Show { app_id, account } => {
            let account = match account {
                Some(hex) => Address::from_hex(&hex).context("parsing account address")?,
                None => signer.address(),
            };

            let application = ledger
                .application_info(AppId(app_id))
                .await
                .context("reading application")?;
            println!("application {}", application.id);
            println!("  creator  {}", application.creator.to_hex());
            println!("  file_cid {}", render(application.global.get(FILE_CID_KEY)));

            match ledger.account_application_info(&account, AppId(app_id)).await? {
                Some(local) => print_local(&account, &local),
                None => println!("account {} is not opted in", account.to_hex()),
            }
        }
    }

    Ok(())
}

fn print_local(account: &Address, local: &StateMap) {
    println!("account {}", account.to_hex());
    println!("  user_file_cid {}", render(local.get(USER_FILE_CID_KEY)));
}

fn render(value: Option<&StateValue>) -> String {
    match value {
        None => "(unset)".to_string(),
        Some(StateValue::Uint(n)) => n.to_string(),
        Some(StateValue::Bytes(bytes)) if bytes.is_empty() => "\"\"".to_string(),
        Some(StateValue::Bytes(bytes)) => match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => format!("0x{}", hex::encode(bytes)),
        },
    }
}
