//! Conversion from CLI arguments to library configuration

use crate::cli::main_impl::{Cli, CliCaptureFormat, CliLogFormat, RemoveArgs, ServeArgs};
use crate::{
    config::{ClientConfig, GatewayConfig, ProviderConfig, ServerConfig},
    services::CaptureFormat,
    tracing_config::{TracingConfig, TracingFormat, TracingOutput},
};
use anyhow::{bail, Result};
use std::time::Duration;

/// Convert CLI arguments to library configuration
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the logging configuration from the global flags
    pub(crate) fn tracing_config(cli: &Cli) -> Result<TracingConfig> {
        let format = match cli.log_format {
            CliLogFormat::Console => TracingFormat::Console,
            CliLogFormat::Compact => TracingFormat::Compact,
            #[cfg(feature = "tracing-json")]
            CliLogFormat::Json => TracingFormat::Json,
            #[cfg(not(feature = "tracing-json"))]
            CliLogFormat::Json => bail!("--log-format json requires the tracing-json feature"),
        };

        let mut config = TracingConfig::new().with_verbosity(cli.verbose).with_format(format);
        if let Some(path) = &cli.log_file {
            #[cfg(feature = "tracing-files")]
            {
                config = config.with_output(TracingOutput::File(path.clone()));
            }
            #[cfg(not(feature = "tracing-files"))]
            bail!("--log-file {} requires the tracing-files feature", path.display());
        }
        Ok(config)
    }

    /// Build the server configuration. The credential is read here, once.
    pub(crate) fn server_config(args: &ServeArgs) -> Result<ServerConfig> {
        if args.max_payload_mb == 0 {
            bail!("--max-payload-mb must be at least 1");
        }
        let Some(max_payload_bytes) = args.max_payload_mb.checked_mul(1024 * 1024) else {
            bail!("--max-payload-mb {} is too large", args.max_payload_mb);
        };

        let provider = ProviderConfig {
            model_id: args.model.clone(),
            queue_url: args.queue_url.clone(),
            poll_interval: Duration::from_millis(args.poll_interval_ms),
        };
        let mut gateway = GatewayConfig::default().with_provider(provider);
        if let Some(key) = &args.fal_key {
            gateway = gateway.with_credential(key.as_str());
        }

        let config = ServerConfig {
            host: args.host.clone(),
            port: args.port,
            max_payload_bytes,
            gateway,
        };
        config.validate()?;
        Ok(config)
    }

    /// Build the client configuration
    pub(crate) fn client_config(args: &RemoveArgs) -> Result<ClientConfig> {
        if args.jpeg_quality > 100 {
            bail!("--jpeg-quality must be between 0 and 100, got {}", args.jpeg_quality);
        }

        let format = match args.format {
            CliCaptureFormat::Jpeg => CaptureFormat::Jpeg,
            CliCaptureFormat::Png => CaptureFormat::Png,
            CliCaptureFormat::Webp => CaptureFormat::WebP,
        };

        let mut builder = ClientConfig::builder()
            .server_url(args.server.as_str())
            .capture_format(format)
            .jpeg_quality(args.jpeg_quality);
        if let Some(dir) = &args.scratch_dir {
            builder = builder.scratch_dir(dir);
        }
        Ok(builder.build()?)
    }
}
