//! Command line surface of the client host.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use dg_app::usecases::connect_location::{spawn_mfa_prompt_listener, ConnectOutcome};
use dg_core::ports::NativeBackendPort;
use dg_core::{InstanceId, LocationId, ReconcileOutcome, Route};

use crate::bootstrap::{wire, ClientApp, ResolvedConfig, UiPorts};
use crate::terminal::{
    Console, TerminalMfaPrompt, TerminalNavigator, TracingEnrollmentEvents, WizardDriver,
    WizardOutcome,
};

#[derive(Debug, Parser)]
#[command(name = "defguard-client", version, about = "defguard desktop client")]
pub struct Cli {
    /// Config file (defaults to config.toml in the platform config dir)
    #[arg(long, global = true, env = "DEFGUARD_CLIENT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Continue the enrollment stored under this session id
    #[arg(long, global = true, env = "DEFGUARD_CLIENT_SESSION")]
    pub session: Option<String>,

    /// Print logs on the terminal
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add an instance from a proxy URL and an enrollment token
    Enroll {
        #[arg(long)]
        url: String,
        #[arg(long)]
        token: String,
    },
    /// Handle a defguard://addinstance link
    Link { link: String },
    /// Enroll from the provisioning file
    Provision {
        /// Keep checking until an enrollment starts
        #[arg(long)]
        watch: bool,
        #[arg(long, default_value_t = 10)]
        interval_secs: u64,
    },
    /// Continue the enrollment stored under --session
    Resume,
    /// List configured instances and their locations
    Instances,
    /// Connect a location, authenticating first when it requires MFA
    Connect { instance: String, location: i64 },
}

/// Run one command against a wired client talking through `console`.
pub async fn run(cli: Cli, config: ResolvedConfig, console: Arc<Console>) -> anyhow::Result<()> {
    let (navigator, mut routes) = TerminalNavigator::new(console.clone());
    let ui = UiPorts::with_system_browser(
        Arc::new(navigator),
        Arc::new(TracingEnrollmentEvents),
        Arc::new(TerminalMfaPrompt::new(console.clone())),
    );
    let fresh_session = cli.session.is_none();
    let app = wire(&config, cli.session, ui).await?;

    match cli.command {
        Command::Enroll { url, token } => {
            prune_stale_sessions(&app, fresh_session).await;
            let outcome = app.manual.submit(&url, &token).await?;
            after_reconcile(&app, &console, outcome).await
        }
        Command::Link { link } => {
            let Some(result) = app.deep_link.handle(&link).await else {
                bail!("not a defguard enrollment link");
            };
            prune_stale_sessions(&app, fresh_session).await;
            after_reconcile(&app, &console, result?).await
        }
        Command::Provision {
            watch,
            interval_secs,
        } => {
            prune_stale_sessions(&app, fresh_session).await;
            if watch {
                watch_provisioning(&app, &console, &mut routes, interval_secs).await
            } else {
                match app.provisioning.check_once().await {
                    Some(result) => after_reconcile(&app, &console, result?).await,
                    None => {
                        console.say("No provisioning request to act on.").await;
                        Ok(())
                    }
                }
            }
        }
        Command::Resume => {
            if app.enrollment.resume().await?.is_none() {
                bail!("no stored enrollment for session {}", app.session_store.scope());
            }
            run_wizard(&app, &console).await
        }
        Command::Instances => list_instances(&app, &console).await,
        Command::Connect { instance, location } => {
            let listener = spawn_mfa_prompt_listener(app.native.clone(), app.connect.clone());
            let outcome = app
                .connect
                .execute(&InstanceId::from(instance), LocationId(location))
                .await;
            listener.abort();
            match outcome? {
                ConnectOutcome::Connected => console.say("Connected.").await,
                ConnectOutcome::Cancelled => console.say("Cancelled.").await,
            }
            Ok(())
        }
    }
}

async fn prune_stale_sessions(app: &ClientApp, fresh_session: bool) {
    if !fresh_session {
        return;
    }
    if let Err(err) = app.session_store.prune_other_scopes().await {
        warn!(error = %err, "failed to prune stale enrollment sessions");
    }
}

async fn after_reconcile(
    app: &ClientApp,
    console: &Arc<Console>,
    outcome: ReconcileOutcome,
) -> anyhow::Result<()> {
    match outcome {
        ReconcileOutcome::EnrollmentStarted => run_wizard(app, console).await,
        ReconcileOutcome::InstanceUpdated { instance_id } => {
            console
                .say(format!("Instance {instance_id} was already configured; its settings were refreshed."))
                .await;
            Ok(())
        }
        ReconcileOutcome::DeviceRegistered { instance_id } => {
            console
                .say(format!("This device was added to instance {instance_id}."))
                .await;
            Ok(())
        }
    }
}

async fn run_wizard(app: &ClientApp, console: &Arc<Console>) -> anyhow::Result<()> {
    let driver = WizardDriver::new(
        app.enrollment.clone(),
        app.queue.clone(),
        console.clone(),
        app.device_name.clone(),
    );
    match driver.run().await? {
        WizardOutcome::Completed => Ok(()),
        WizardOutcome::Expired => bail!("enrollment session expired"),
        WizardOutcome::Interrupted => {
            console
                .say(format!(
                    "Enrollment paused. Continue with: defguard-client --session {} resume",
                    app.session_store.scope()
                ))
                .await;
            Ok(())
        }
    }
}

async fn watch_provisioning(
    app: &ClientApp,
    console: &Arc<Console>,
    routes: &mut tokio::sync::mpsc::UnboundedReceiver<Route>,
    interval_secs: u64,
) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let watcher = app.provisioning.clone();
    let interval = Duration::from_secs(interval_secs.max(1));
    let task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { watcher.watch(interval, cancel).await })
    };
    info!(interval_secs, "watching for provisioning requests");

    let mut enrollment_started = false;
    loop {
        tokio::select! {
            route = routes.recv() => match route {
                Some(Route::Enrollment) => {
                    enrollment_started = true;
                    break;
                }
                Some(Route::ClientHome { selected_instance: Some(_) }) | None => break,
                Some(_) => {}
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    cancel.cancel();
    if let Err(err) = task.await {
        warn!(error = %err, "provisioning watcher task failed");
    }

    if enrollment_started {
        run_wizard(app, console).await
    } else {
        Ok(())
    }
}

async fn list_instances(app: &ClientApp, console: &Arc<Console>) -> anyhow::Result<()> {
    let instances = app.native.list_instances().await?;
    if instances.is_empty() {
        console.say("No instances configured.").await;
    }
    for instance in instances {
        console
            .say(format!("{} ({}) {}", instance.name, instance.id, instance.proxy_url))
            .await;
        for location in instance.locations {
            let mfa = location
                .mfa_method
                .map(|method| format!(", MFA: {method}"))
                .unwrap_or_default();
            console
                .say(format!("  [{}] {}{mfa}", location.id, location.name))
                .await;
        }
    }
    Ok(())
}
