//! Agent wiring and the pipeline coordinator loop.

use crate::error::AgentError;
use crate::render::OutputWriter;
use crate::tracker::CommandTracker;
use secubeat_config::SecubeatConfig;
use secubeat_correlate::SessionCorrelator;
use secubeat_deliver::{
    DeliveryPipeline, DeliveryPolicy, HttpSink, HttpSinkConfig, SyslogSink, WebhookSink,
};
use secubeat_filter::{FieldRules, FilterEngine, MatchMode};
use secubeat_source::{AuditSource, SourceConfig};
use secubeat_types::WireEvent;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// How often delivery statistics are logged.
const STATS_INTERVAL: Duration = Duration::from_secs(60);

/// The running agent.
pub struct Agent {
    config: SecubeatConfig,
}

impl Agent {
    /// Check prerequisites and construct the agent.
    pub fn new(config: SecubeatConfig) -> Result<Self, AgentError> {
        if config.monitor.require_root && !nix::unistd::geteuid().is_root() {
            return Err(AgentError::PrivilegeRequired);
        }
        Ok(Self { config })
    }

    /// Run until a shutdown signal arrives or the source ends.
    pub async fn run(self) -> Result<(), AgentError> {
        let filter = build_filter(&self.config);
        let pipeline = build_pipeline(&self.config).await?;
        let mut writer = OutputWriter::from_settings(&self.config.output)?;
        let mut tracker = CommandTracker::new(self.config.monitor.max_events_memory);

        let correlator = Arc::new(SessionCorrelator::new());
        let source_config = SourceConfig {
            audit_key: self.config.monitor.audit_key.clone(),
            enable_audit_rules: self.config.monitor.enable_audit_rules,
            ..SourceConfig::default()
        };
        let (mut stream, handle) = AuditSource::start(source_config, correlator);

        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        let mut stats_ticker = tokio::time::interval(STATS_INTERVAL);
        stats_ticker.tick().await; // the first tick fires immediately

        info!("SecuBeat started");

        loop {
            tokio::select! {
                received = stream.recv() => match received {
                    Some(mut event) => {
                        if !filter.accepts(&event) {
                            continue;
                        }
                        tracker.track(&mut event);
                        let wire = WireEvent::from_event(&event);
                        if let Err(e) = writer.write(&wire) {
                            warn!(error = %e, "failed to write event locally");
                        }
                        pipeline.enqueue(wire);
                    }
                    None => {
                        warn!("event source ended");
                        break;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupt received, shutting down gracefully");
                    break;
                }
                _ = sigterm.recv() => {
                    info!("termination signal received, shutting down gracefully");
                    break;
                }
                _ = stats_ticker.tick() => {
                    for (sink, stats) in pipeline.stats() {
                        info!(
                            sink = %sink,
                            sent = stats.sent_events,
                            failed = stats.failed_events,
                            dropped = stats.dropped_events,
                            "delivery stats"
                        );
                    }
                }
            }
        }

        handle.stop();
        pipeline.flush().await;
        info!("SecuBeat stopped");
        Ok(())
    }
}

fn build_filter(config: &SecubeatConfig) -> FilterEngine {
    let filters = &config.filters;
    FilterEngine::new(
        FieldRules::new(
            filters.included_users.clone(),
            filters.excluded_users.clone(),
            MatchMode::Exact,
        ),
        FieldRules::new(
            filters.included_commands.clone(),
            filters.excluded_commands.clone(),
            MatchMode::Substring,
        ),
        FieldRules::new(
            filters.included_ips.clone(),
            filters.excluded_ips.clone(),
            MatchMode::Exact,
        ),
    )
}

async fn build_pipeline(config: &SecubeatConfig) -> Result<DeliveryPipeline, AgentError> {
    let mut builder =
        DeliveryPipeline::builder().queue_capacity(config.monitor.max_queued_events);

    if let Some(url) = &config.server.server_url {
        let sink = HttpSink::new(HttpSinkConfig {
            url: url.clone(),
            token: config.server.server_token.clone(),
            verify_tls: config.server.verify_ssl,
            timeout: Duration::from_secs(config.server.timeout),
        })?;
        let policy = DeliveryPolicy {
            batch_size: config.server.batch_size,
            retry_attempts: config.server.retry_attempts,
            retry_delay: Duration::from_secs(config.server.retry_delay),
            ..DeliveryPolicy::default()
        };
        builder = builder.sink(Box::new(sink), policy);
        info!(url = %url, "server sink configured");
    }

    if let Some(url) = &config.webhook.webhook_url {
        let sink = WebhookSink::new(url.clone(), config.webhook.webhook_secret.clone())?;
        builder = builder.sink(Box::new(sink), DeliveryPolicy::single_shot());
        info!(url = %url, "webhook sink configured");
    }

    if let Some(server) = &config.syslog.syslog_server {
        let sink = SyslogSink::new(server.clone(), config.syslog.syslog_port).await?;
        builder = builder.sink(Box::new(sink), DeliveryPolicy::single_shot());
        info!(server = %server, "syslog sink configured");
    }

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secubeat_types::{CommandEvent, EventKind};

    #[test]
    fn test_filter_built_from_config_rules() {
        let mut config = SecubeatConfig::default();
        config.filters.excluded_users = vec!["root".to_string()];
        config.filters.excluded_commands = vec!["pwd".to_string()];

        let filter = build_filter(&config);

        let root_event = CommandEvent::builder(EventKind::CommandExecution)
            .user("root")
            .command("ls")
            .build();
        assert!(!filter.accepts(&root_event));

        let noisy = CommandEvent::builder(EventKind::CommandExecution)
            .user("alice")
            .command("pwd")
            .build();
        assert!(!filter.accepts(&noisy));

        let fine = CommandEvent::builder(EventKind::CommandExecution)
            .user("alice")
            .command("git log")
            .build();
        assert!(filter.accepts(&fine));
    }

    #[tokio::test]
    async fn test_pipeline_built_from_config_sinks() {
        let mut config = SecubeatConfig::default();
        config.server.server_url = Some("https://logs.example/api".to_string());
        config.webhook.webhook_url = Some("https://hooks.example/secu".to_string());
        config.syslog.syslog_server = Some("127.0.0.1".to_string());

        let pipeline = build_pipeline(&config).await.unwrap();
        assert_eq!(pipeline.sink_count(), 3);
        pipeline.flush().await;
    }

    #[test]
    fn test_privilege_check() {
        let mut config = SecubeatConfig::default();
        config.monitor.require_root = false;
        assert!(Agent::new(config).is_ok());
    }
}
