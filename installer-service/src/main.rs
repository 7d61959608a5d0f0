// SPDX-License-Identifier: GPL-3.0-only

//! OS installer D-Bus services.
//!
//! One process serves one module (or, by default, the Boss plus every
//! module for single-process deployments). Modules publish their state as
//! properties, accept kickstart input once, and stream property and task
//! changes until asked to quit.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tokio::sync::Notify;
use tracing_subscriber::{EnvFilter, fmt};
use zbus::connection::Builder as ConnectionBuilder;

mod bridge;
mod handlers;
mod modules;
mod tasks;

use bridge::spawn_properties_forwarder;
use handlers::{
    BossHandler, DeviceTreeHandler, LocalizationHandler, NetworkHandler, PayloadHandler,
    RuntimeHandler, SecurityHandler, ServicesHandler, StorageHandler, UsersHandler,
};
use installer_sys::SystemRunner;
use installer_sys::sysroot::SYSTEM_ROOT_PATH;
use modules::{boss, localization, network, payload, runtime, security, services, storage, users};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModuleSelection {
    Boss,
    Users,
    Storage,
    Payload,
    Network,
    Localization,
    Security,
    Services,
    Runtime,
    /// Serve the Boss and every module from one process.
    All,
}

#[derive(Debug, Parser)]
#[command(name = "os-installer-service")]
struct Options {
    /// Which service this process provides.
    #[arg(long, value_enum, default_value = "all")]
    module: ModuleSelection,

    /// Mount point of the target filesystem.
    #[arg(long, default_value = SYSTEM_ROOT_PATH)]
    sysroot: PathBuf,

    /// Connect to the system bus instead of the session bus.
    #[arg(long)]
    system_bus: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging to journald/stderr
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("installer_service=info,warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = Options::parse();

    tracing::info!(
        "Starting OS installer service v{} ({:?})",
        env!("CARGO_PKG_VERSION"),
        options.module
    );

    if unsafe { libc::geteuid() } != 0 {
        tracing::warn!("not running as root; installation tasks will fail");
    }

    let connection = if options.system_bus {
        ConnectionBuilder::system()?.build().await?
    } else {
        ConnectionBuilder::session()?.build().await?
    };

    let shutdown = Arc::new(Notify::new());
    let runner: Arc<dyn installer_sys::ToolRunner> = Arc::new(SystemRunner);

    let serve_all = options.module == ModuleSelection::All;
    let serves = |selection: ModuleSelection| serve_all || options.module == selection;

    if serves(ModuleSelection::Users) {
        let (handler, receiver) =
            UsersHandler::new(runner.clone(), options.sysroot.clone(), shutdown.clone())?;
        connection
            .object_server()
            .at(users::USERS_PATH, handler)
            .await?;
        connection
            .request_name("org.fedoraproject.Anaconda.Modules.Users")
            .await?;
        spawn_properties_forwarder(connection.clone(), users::USERS_PATH, receiver);
        tracing::info!("  - Users module at {}", users::USERS_PATH);
    }

    if serves(ModuleSelection::Storage) {
        // The block-device provider attaches at runtime; until then the
        // device tree reports itself unavailable.
        let provider = None;
        let (handler, receiver) = StorageHandler::new(
            provider.clone(),
            runner.clone(),
            options.sysroot.clone(),
            shutdown.clone(),
        )?;
        connection
            .object_server()
            .at(storage::STORAGE_PATH, handler)
            .await?;
        connection
            .object_server()
            .at(
                "/org/fedoraproject/Anaconda/Modules/Storage/DeviceTree",
                DeviceTreeHandler::new(provider),
            )
            .await?;
        connection
            .request_name("org.fedoraproject.Anaconda.Modules.Storage")
            .await?;
        spawn_properties_forwarder(connection.clone(), storage::STORAGE_PATH, receiver);
        tracing::info!("  - Storage module at {}", storage::STORAGE_PATH);
    }

    if serves(ModuleSelection::Payload) {
        let (handler, receiver) = PayloadHandler::new(shutdown.clone())?;
        connection
            .object_server()
            .at(payload::PAYLOAD_PATH, handler)
            .await?;
        connection
            .request_name("org.fedoraproject.Anaconda.Modules.Payload")
            .await?;
        spawn_properties_forwarder(connection.clone(), payload::PAYLOAD_PATH, receiver);
        tracing::info!("  - Payload module at {}", payload::PAYLOAD_PATH);
    }

    if serves(ModuleSelection::Network) {
        let (handler, receiver) = NetworkHandler::new(shutdown.clone())?;
        connection
            .object_server()
            .at(network::NETWORK_PATH, handler)
            .await?;
        connection
            .request_name("org.fedoraproject.Anaconda.Modules.Network")
            .await?;
        spawn_properties_forwarder(connection.clone(), network::NETWORK_PATH, receiver);
        tracing::info!("  - Network module at {}", network::NETWORK_PATH);
    }

    if serves(ModuleSelection::Localization) {
        let (handler, receiver) = LocalizationHandler::new(shutdown.clone())?;
        connection
            .object_server()
            .at(localization::LOCALIZATION_PATH, handler)
            .await?;
        connection
            .request_name("org.fedoraproject.Anaconda.Modules.Localization")
            .await?;
        spawn_properties_forwarder(
            connection.clone(),
            localization::LOCALIZATION_PATH,
            receiver,
        );
        tracing::info!("  - Localization module at {}", localization::LOCALIZATION_PATH);
    }

    if serves(ModuleSelection::Security) {
        let (handler, receiver) = SecurityHandler::new(shutdown.clone())?;
        connection
            .object_server()
            .at(security::SECURITY_PATH, handler)
            .await?;
        connection
            .request_name("org.fedoraproject.Anaconda.Modules.Security")
            .await?;
        spawn_properties_forwarder(connection.clone(), security::SECURITY_PATH, receiver);
        tracing::info!("  - Security module at {}", security::SECURITY_PATH);
    }

    if serves(ModuleSelection::Services) {
        let (handler, receiver) = ServicesHandler::new(shutdown.clone())?;
        connection
            .object_server()
            .at(services::SERVICES_PATH, handler)
            .await?;
        connection
            .request_name("org.fedoraproject.Anaconda.Modules.Services")
            .await?;
        spawn_properties_forwarder(connection.clone(), services::SERVICES_PATH, receiver);
        tracing::info!("  - Services module at {}", services::SERVICES_PATH);
    }

    if serves(ModuleSelection::Runtime) {
        let state = runtime::RuntimeState {
            product: runtime::derive_product_data(
                std::env::var_os("PRODBUILDPATH")
                    .map(PathBuf::from)
                    .as_deref(),
                std::path::Path::new("/.buildstamp"),
                std::path::Path::new("/etc/os-release"),
            ),
            ..Default::default()
        };
        let (handler, receiver) = RuntimeHandler::new(state, shutdown.clone())?;
        connection
            .object_server()
            .at(runtime::RUNTIME_PATH, handler)
            .await?;
        connection
            .request_name("org.fedoraproject.Anaconda.Modules.Runtime")
            .await?;
        spawn_properties_forwarder(connection.clone(), runtime::RUNTIME_PATH, receiver);
        tracing::info!("  - Runtime module at {}", runtime::RUNTIME_PATH);
    }

    if serves(ModuleSelection::Boss) {
        let (handler, receiver) = BossHandler::new(connection.clone(), shutdown.clone())?;
        connection
            .object_server()
            .at(boss::BOSS_PATH, handler)
            .await?;
        connection
            .request_name("org.fedoraproject.Anaconda.Boss")
            .await?;
        spawn_properties_forwarder(connection.clone(), boss::BOSS_PATH, receiver);
        tracing::info!("  - Boss at {}", boss::BOSS_PATH);
    }

    tracing::info!("Service ready, waiting for requests...");
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Received shutdown signal");
        }
        _ = shutdown.notified() => {
            tracing::info!("Quit requested over the bus");
        }
    }

    tracing::info!("OS installer service shutting down");
    Ok(())
}
