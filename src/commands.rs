//! CLI commands for managed-config
//!
//! Provides command-line interface functionality for inspecting how a
//! restriction schema resolves against administrator overrides.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use managed_config_core::{
    AppConfig, Event, EventBus, EventFeedback, EventSubscription, Orchestrator,
};
use managed_config_provisioning::{ProvisioningValues, ProvisioningValuesLoader, SystemValues};
use managed_config_restrictions::{
    project, resolve_with_report, LoggingFeedback, Schema, StaticOverrides, UiFacts,
};

use crate::sample;

/// Where configuration, schema and overrides come from
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    /// Config file; the per-user config file when absent
    pub config: Option<PathBuf>,
    /// app_restrictions.xml, overriding `[sources].schema`
    pub schema: Option<PathBuf>,
    /// Values resource file, overriding `[sources].resources`
    pub resources: Option<PathBuf>,
    /// Overrides JSON file, overriding `[sources].overrides`
    pub overrides: Option<PathBuf>,
}

impl Inputs {
    /// Load the application config with command-line paths applied
    pub async fn load_config(&self) -> Result<AppConfig> {
        let mut config = match self.config {
            Some(ref path) => AppConfig::load_from(path)
                .await
                .with_context(|| format!("Failed to load config from {:?}", path))?,
            None => AppConfig::load().await?,
        };

        if self.schema.is_some() {
            config.sources.schema = self.schema.clone();
        }
        if self.resources.is_some() {
            config.sources.resources = self.resources.clone();
        }
        if self.overrides.is_some() {
            config.sources.overrides = self.overrides.clone();
        }
        Ok(config)
    }

    /// Load the configured schema, or the bundled sample
    pub async fn load_schema(config: &AppConfig) -> Result<Schema> {
        if config.sources.schema.is_none() {
            debug!("No schema configured, using the bundled sample");
            return Ok(sample::schema()?);
        }
        Ok(config.sources.load_schema().await?)
    }
}

/// Resolve command options
pub struct ResolveCommand {
    pub inputs: Inputs,
    /// Print resolved values and facts as JSON
    pub json: bool,
}

impl ResolveCommand {
    /// Execute the resolve command
    pub async fn execute(&self) -> Result<UiFacts> {
        let config = self.inputs.load_config().await?;
        let schema = Inputs::load_schema(&config).await?;
        let overrides = config.sources.load_overrides().await?;

        let format = config.display.projection_format();
        let (resolved, report) = resolve_with_report(&schema, overrides.as_ref());
        let facts = project(&resolved, &format);

        if self.json {
            let output = serde_json::json!({
                "resolved": resolved,
                "sources": report,
                "facts": facts,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(facts);
        }

        println!("Resolved restrictions:");
        for (key, value) in resolved.iter() {
            let source = report
                .source(key)
                .map(|s| format!("{:?}", s).to_lowercase())
                .unwrap_or_default();
            println!("  {} = {} ({})", key, format.render_value(value), source);
        }

        println!();
        println!("Display:");
        for (key, fact) in facts.iter() {
            let marker = if fact.enabled { "on" } else { "off" };
            println!("  [{:>3}] {}: {}", marker, key, fact.display_text);
        }

        for key in report.mistyped() {
            warn!("Override for '{}' has the wrong type, default used", key);
        }
        for key in schema.keys() {
            let skipped = report.skipped_items(key);
            if skipped > 0 {
                warn!("Dropped {} incomplete element(s) of '{}'", skipped, key);
            }
        }

        Ok(facts)
    }
}

/// Say-hello command options
pub struct SayHelloCommand {
    pub inputs: Inputs,
}

impl SayHelloCommand {
    /// Execute the say-hello command
    pub async fn execute(&self) -> Result<Option<String>> {
        let config = self.inputs.load_config().await?;
        let schema = Inputs::load_schema(&config).await?;
        let overrides = config.sources.load_overrides().await?;

        let mut session = config.session(schema, Box::new(LoggingFeedback));
        session.on_restrictions_changed(overrides.as_ref());

        let hello = session.say_hello();
        match hello {
            Some(ref message) => println!("{}", message),
            None => println!("Saying hello is restricted"),
        }
        Ok(hello)
    }
}

/// Watch command options
pub struct WatchCommand {
    pub inputs: Inputs,
    /// How often the overrides file is checked
    pub interval: Duration,
    /// Stop after this many checks
    pub max_polls: Option<u64>,
}

impl WatchCommand {
    /// Execute the watch command; returns how many notifications were handled
    pub async fn execute(&self) -> Result<usize> {
        let config = self.inputs.load_config().await?;
        let schema = Inputs::load_schema(&config).await?;
        let overrides_path = config
            .sources
            .overrides
            .clone()
            .context("No overrides file to watch; pass --overrides or set [sources].overrides")?;

        let bus = Arc::new(EventBus::new());
        let supplier = Arc::new(StaticOverrides::new(None));
        let session = config.session(schema, Box::new(EventFeedback::new(bus.clone())));
        let orchestrator = Arc::new(Orchestrator::with_event_bus(
            session,
            supplier.clone(),
            bus.clone(),
        ));

        let printer = bus.subscribe();
        let worker = {
            let orchestrator = orchestrator.clone();
            let subscription = bus.subscribe();
            tokio::task::spawn_blocking(move || orchestrator.run(subscription))
        };

        info!("Watching {:?}", overrides_path);
        let outcome = self
            .poll(&config, &overrides_path, &supplier, &orchestrator, &printer)
            .await;

        orchestrator.shutdown();
        let handled = worker.await?;
        print_events(&printer.drain());
        outcome.map(|_| handled)
    }

    async fn poll(
        &self,
        config: &AppConfig,
        overrides_path: &std::path::Path,
        supplier: &StaticOverrides,
        orchestrator: &Orchestrator,
        printer: &EventSubscription,
    ) -> Result<()> {
        // Modification time and length; None until the first check
        let mut last_stamp: Option<Option<(Option<SystemTime>, u64)>> = None;
        let mut interval = tokio::time::interval(self.interval);
        let mut polls = 0u64;

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                    return Ok(());
                }
            }

            let stamp = tokio::fs::metadata(overrides_path)
                .await
                .ok()
                .map(|m| (m.modified().ok(), m.len()));
            if last_stamp != Some(stamp) {
                last_stamp = Some(stamp);
                match config.sources.load_overrides().await {
                    Ok(overrides) => {
                        supplier.replace(overrides);
                        orchestrator.notify_restrictions_changed();
                    }
                    Err(e) if e.is_recoverable() => warn!("{}", e.user_message()),
                    Err(e) => return Err(e.into()),
                }
            }

            print_events(&printer.drain());

            polls += 1;
            if self.max_polls.is_some_and(|max| polls >= max) {
                return Ok(());
            }
        }
    }
}

fn print_events(events: &[Event]) {
    for event in events {
        match event {
            Event::FactsUpdated { key, fact } => {
                let marker = if fact.enabled { "on" } else { "off" };
                println!("[{:>3}] {}: {}", marker, key, fact.display_text);
            }
            Event::Feedback(state) => {
                println!(
                    "feedback {} ({:?}): {}",
                    state.key,
                    state.severity,
                    state.message.as_deref().unwrap_or("")
                );
            }
            Event::RestrictionsChanged | Event::Shutdown => {}
        }
    }
}

/// Provision command options
pub struct ProvisionCommand {
    /// Directory holding nfcprovisioning.json or nfcprovisioning.txt
    pub directory: PathBuf,
    pub system: SystemValues,
    /// Print values as JSON
    pub json: bool,
}

impl ProvisionCommand {
    /// Execute the provision command
    pub async fn execute(&self) -> Result<ProvisioningValues> {
        let loader = ProvisioningValuesLoader::new(&self.directory, self.system.clone());
        let values = loader.load().await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&values)?);
        } else {
            for (key, value) in values.iter() {
                println!("{}={}", key, value);
            }
        }
        Ok(values)
    }
}

/// Init-config command options
pub struct InitConfigCommand {
    /// Destination; the per-user config file when absent
    pub path: Option<PathBuf>,
    /// Overwrite an existing file
    pub force: bool,
}

impl InitConfigCommand {
    /// Write the default configuration
    pub async fn execute(&self) -> Result<PathBuf> {
        let path = match self.path {
            Some(ref path) => path.clone(),
            None => AppConfig::config_file().context("Cannot determine config path")?,
        };

        if path.exists() && !self.force {
            anyhow::bail!("{:?} already exists; use --force to overwrite", path);
        }

        AppConfig::default().save_to(&path).await?;
        println!("Wrote default configuration to {:?}", path);
        Ok(path)
    }
}
