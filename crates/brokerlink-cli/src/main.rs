use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use brokerlink_models::Credentials;
use brokerlink_sdk::{
    HttpAuthorizationManager, NatsSessionBuilder, SdkConfig, ServiceConnector, VcapCredentialSource,
};
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "brokerlink")]
#[command(author, version, about = "Inspect discovered broker services and open sessions", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the broker services found in VCAP_SERVICES
    Services,
    /// Print the resolved connection properties (secrets omitted)
    Resolve {
        /// Service id; defaults to the first discovered service
        #[arg(long)]
        service: Option<String>,
        /// Print the JNDI lookup environment instead
        #[arg(long)]
        jndi: bool,
    },
    /// Open a session and keep it alive until Ctrl-C
    Connect {
        /// Service id; defaults to the first discovered service
        #[arg(long)]
        service: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = SdkConfig::from_env().context("invalid BROKERLINK_* configuration")?;

    let manager = HttpAuthorizationManager::new(config.registrations.into_values());
    let connector = ServiceConnector::new(
        config.local,
        Arc::new(VcapCredentialSource::from_env()),
        Arc::new(NatsSessionBuilder),
    )
    .with_authorization_manager(Arc::new(manager));

    match cli.command {
        Commands::Services => {
            let services = connector.credentials();
            if services.is_empty() {
                println!("no broker services discovered");
            }
            for creds in &services {
                println!("{}", summary(creds));
            }
        }
        Commands::Resolve { service, jndi } => {
            let creds = lookup(&connector, service.as_deref())?;
            let json = if jndi {
                serde_json::to_string_pretty(&connector.jndi_properties_with(creds.as_ref()))?
            } else {
                serde_json::to_string_pretty(&connector.properties_with(creds.as_ref()))?
            };
            println!("{json}");
        }
        Commands::Connect { service } => {
            let creds = lookup(&connector, service.as_deref())?;
            let factory = connector.factory_with(creds.as_ref())?;
            let session = factory.create_session(None).await?;
            session.connect().await?;
            info!(
                host = %factory.properties().host,
                vpn = %factory.properties().vpn,
                "session up, press Ctrl-C to exit"
            );
            tokio::signal::ctrl_c().await?;
            info!("shutting down");
        }
    }

    Ok(())
}

/// Pick the requested service, or the first one. `None` means local defaults.
fn lookup(connector: &ServiceConnector, id: Option<&str>) -> Result<Option<Credentials>> {
    match id {
        Some(id) => connector
            .find_by_id(id)
            .map(Some)
            .ok_or_else(|| anyhow!("no broker service with id `{id}`")),
        None => Ok(connector.find_first()),
    }
}

fn summary(creds: &Credentials) -> String {
    format!(
        "{}\tvpn={}\thost={}",
        creds.id,
        creds.msg_vpn_name.as_deref().unwrap_or("-"),
        creds.smf_host().as_deref().unwrap_or("-"),
    )
}
