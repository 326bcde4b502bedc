//! Command-line configuration for the console dashboard.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::capture::FfmpegConfig;
use crate::endpoint::{
    Channel, ConfigError, Credentials, StreamEndpoint, StreamProfile, VendorPreset,
    DEFAULT_RTSP_PORT,
};
use crate::latency::SamplerConfig;
use crate::streaming::SupervisorConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProfileArg {
    /// Recorder channels, `/ch{main}/{sub}`
    Gen2,
    /// Single stream, `/stream1`
    Gen3,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "camwatch")]
#[command(about = "Ping monitor and self-healing RTSP camera preview")]
pub struct Cli {
    /// Camera or recorder address, also the ping target
    #[arg(long, default_value = "192.168.0.83")]
    pub host: String,

    /// RTSP port
    #[arg(long, default_value_t = DEFAULT_RTSP_PORT)]
    pub port: u16,

    /// RTSP username
    #[arg(long, default_value = "")]
    pub username: String,

    /// RTSP password
    #[arg(long, default_value = "")]
    pub password: String,

    /// URL layout spoken by the camera
    #[arg(long, value_enum, default_value_t = ProfileArg::Gen2)]
    pub profile: ProfileArg,

    /// Vendor preset supplying default channels (generic, hikvision, dahua, axis)
    #[arg(long, default_value = "generic")]
    pub vendor: String,

    /// Main stream channel (1-20), overrides the vendor preset
    #[arg(long)]
    pub channel_main: Option<u8>,

    /// Sub stream (0 or 1), overrides the vendor preset
    #[arg(long)]
    pub channel_sub: Option<u8>,

    /// Disable the latency sampler
    #[arg(long)]
    pub no_ping: bool,

    /// Disable the video preview
    #[arg(long)]
    pub no_stream: bool,

    /// Write the latest preview frame to this PNG every few seconds
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Print samples and status changes as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Decoder program used for the preview
    #[arg(long, default_value = "ffmpeg")]
    pub ffmpeg: String,

    /// Seconds between latency probes
    #[arg(long, default_value_t = 1)]
    pub ping_interval_secs: u64,

    /// Seconds to wait before reconnecting the stream
    #[arg(long, default_value_t = 2)]
    pub reconnect_delay_secs: u64,
}

impl Cli {
    /// Channel from explicit flags, falling back to the vendor preset.
    pub fn channel(&self) -> Result<Channel, ConfigError> {
        let preset: VendorPreset = self.vendor.parse()?;
        let defaults = preset.channel();
        Channel::new(
            self.channel_main.unwrap_or(defaults.main()),
            self.channel_sub.unwrap_or(defaults.sub()),
        )
    }

    pub fn stream_profile(&self) -> Result<StreamProfile, ConfigError> {
        match self.profile {
            ProfileArg::Gen2 => Ok(StreamProfile::Gen2(self.channel()?)),
            ProfileArg::Gen3 => Ok(StreamProfile::Gen3),
        }
    }

    pub fn endpoint(&self) -> Result<StreamEndpoint, ConfigError> {
        Ok(StreamEndpoint::new(&self.host, self.port)?
            .with_credentials(Credentials::new(&self.username, &self.password)))
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            interval: Duration::from_secs(self.ping_interval_secs.max(1)),
            ..SamplerConfig::default()
        }
    }

    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            backoff: Duration::from_secs(self.reconnect_delay_secs.max(1)),
            ..SupervisorConfig::default()
        }
    }

    /// Decoder settings producing frames already at the display size.
    pub fn ffmpeg_config(&self) -> FfmpegConfig {
        let display = self.supervisor_config();
        FfmpegConfig {
            program: self.ffmpeg.clone(),
            decode_width: display.display_width,
            decode_height: display.display_height,
            ..FfmpegConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("camwatch").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_build_generic_gen2_url() {
        let cli = parse(&[]);
        let url = cli.endpoint().unwrap().url(&cli.stream_profile().unwrap());
        assert_eq!(url, "rtsp://192.168.0.83:554/ch1/0");
        assert_eq!(cli.sampler_config().interval, Duration::from_secs(1));
        assert_eq!(cli.supervisor_config().backoff, Duration::from_secs(2));
    }

    #[test]
    fn vendor_preset_and_overrides() {
        let cli = parse(&["--vendor", "dahua"]);
        assert_eq!(cli.channel().unwrap(), Channel::new(2, 0).unwrap());

        let cli = parse(&["--vendor", "hikvision", "--channel-main", "5"]);
        assert_eq!(cli.channel().unwrap(), Channel::new(5, 1).unwrap());
    }

    #[test]
    fn invalid_channels_rejected_before_url() {
        let cli = parse(&["--channel-main", "21"]);
        assert_eq!(cli.stream_profile(), Err(ConfigError::ChannelOutOfRange(21)));

        let cli = parse(&["--channel-sub", "2"]);
        assert_eq!(cli.stream_profile(), Err(ConfigError::SubStreamOutOfRange(2)));
    }

    #[test]
    fn gen3_ignores_channels() {
        let cli = parse(&[
            "--profile", "gen3", "--username", "admin", "--password", "pw", "--port", "8554",
        ]);
        let url = cli.endpoint().unwrap().url(&cli.stream_profile().unwrap());
        assert_eq!(url, "rtsp://admin:pw@192.168.0.83:8554/stream1");
    }

    #[test]
    fn decoder_output_matches_display_size() {
        let cli = parse(&["--ffmpeg", "/opt/ffmpeg/bin/ffmpeg"]);
        let ffmpeg = cli.ffmpeg_config();
        let display = cli.supervisor_config();
        assert_eq!(ffmpeg.program, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(
            (ffmpeg.decode_width, ffmpeg.decode_height),
            (display.display_width, display.display_height)
        );
    }

    #[test]
    fn unknown_vendor_is_a_config_error() {
        let cli = parse(&["--vendor", "acme"]);
        assert!(matches!(cli.channel(), Err(ConfigError::UnknownVendor(_))));
    }
}
