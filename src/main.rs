use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use proxy_manager::{
    address::IntoAddress,
    ip_info::{IpInfoApi, IpInfoClient},
    protocol::{self, ProtocolConfigurable},
    storage::{FileStorage, MemoryCache, Storage},
    ApiServer, Connector, ProxyManager,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[clap(version, about)]
struct Args {
    /// Folder holding the saved proxies
    #[clap(long, env = "PROXY_MANAGER_DATA", parse(from_os_str))]
    data_dir: Option<PathBuf>,

    /// Keep everything in memory, nothing is saved
    #[clap(long, conflicts_with = "data_dir")]
    ephemeral: bool,

    /// Write logs as JSON lines
    #[clap(long)]
    log_json: bool,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP control API
    Serve {
        #[clap(short, long, env = "PROXY_MANAGER_BIND", default_value = "127.0.0.1:9494")]
        bind: String,

        /// Require this token on every API request
        #[clap(long, env = "PROXY_MANAGER_ACCESS_TOKEN")]
        access_token: Option<String>,
    },
    /// Print saved proxies and the current selection
    List,
    /// Save a new SOCKS5 proxy
    Add {
        host: String,
        port: u16,
        #[clap(short, long, default_value = "")]
        username: String,
        #[clap(short, long, default_value = "")]
        password: String,
    },
    /// Remove a saved proxy by index
    Remove { index: usize },
    /// Use the saved proxy at index for new connections
    Select { index: usize },
    /// Connect directly from now on
    Unset,
    /// Connect to a target through the current proxy
    Check {
        #[clap(default_value = "ipinfo.io:80")]
        target: String,
    },
}

fn init_tracing(json: bool) {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "proxy_manager=debug")
    }
    let registry = tracing_subscriber::registry().with(EnvFilter::from_default_env());
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn storage(args: &Args) -> Result<Arc<dyn Storage>> {
    if args.ephemeral {
        return Ok(Arc::new(MemoryCache::new()));
    }
    let storage = match &args.data_dir {
        Some(dir) => FileStorage::new_in(dir, "").await?,
        None => FileStorage::new("").await?,
    };
    Ok(Arc::new(storage))
}

async fn real_main(args: Args) -> Result<()> {
    init_tracing(args.log_json);

    let ip_info: Arc<dyn IpInfoApi> = Arc::new(IpInfoClient::default());
    let manager = ProxyManager::load(storage(&args).await?, ip_info.clone())
        .await
        .context("Failed to load saved proxies")?;

    match args.cmd {
        Command::Serve { bind, access_token } => {
            let server = ApiServer {
                proxy_manager: manager.clone(),
                ip_info: ip_info.clone(),
                access_token,
            };
            let addr = server.run(&bind).await?;
            tracing::info!("Api server is listening on {}", addr);

            ip_info
                .refresh_local_ip_info(manager.current_proxy())
                .await
                .unwrap_or_else(|e| tracing::warn!("Failed to refresh local ip info: {:?}", e));

            tokio::signal::ctrl_c().await?;
        }
        Command::List => {
            println!("{}", protocol::to_string(&ProtocolConfigurable(&manager))?);
        }
        Command::Add {
            host,
            port,
            username,
            password,
        } => {
            manager.add_proxy(host, port, &username, &password).await?;
        }
        Command::Remove { index } => manager.remove_proxy(index).await?,
        Command::Select { index } => manager.set_proxy(index).await?,
        Command::Unset => manager.unset_proxy().await?,
        Command::Check { target } => {
            let target = target.as_str().into_address()?;
            let connector = Connector::new().with_handler(Arc::new(manager.clone()));
            let stream = connector
                .connect(&target)
                .await
                .with_context(|| format!("Failed to connect to {}", target))?;
            println!("connected to {} from {}", target, stream.local_addr()?);

            ip_info.refresh_local_ip_info(manager.current_proxy()).await?;
            println!("{}", protocol::to_string(&ip_info.local_ip_info())?);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match real_main(args).await {
        Ok(()) => {}
        Err(e) => tracing::error!("Process exit: {:?}", e),
    }
    Ok(())
}
