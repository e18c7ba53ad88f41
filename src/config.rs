use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, Map};
use serde::{Deserialize, Serialize};

use crate::channel::{Channel, ChannelSet};
use crate::error::Result;
use crate::resource::ResourceAddress;
use crate::wait::{FixedDelay, PollUntilStopped, ThreadSleeper, WaitStrategy};

#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
	pub instrument: InstrumentConfig,
	pub discovery: DiscoveryConfig,
	pub acquisition: AcquisitionConfig,
	pub output: OutputConfig,
	pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct InstrumentConfig {
	// Skips the interactive selection when set
	pub resource: Option<ResourceAddress>,
	pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct DiscoveryConfig {
	pub resources: Vec<ResourceAddress>,
	pub broadcast: bool,
	pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WaitMode { Fixed, Poll }

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AcquisitionConfig {
	// Empty means ask at the prompt
	pub channels: Vec<u8>,
	pub duration_s: f64,
	pub wait: WaitMode,
	pub poll_interval_ms: u64,
	pub poll_slack_s: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
	// .json or .csv
	pub path: Option<PathBuf>,
	pub png: Option<PathBuf>,
	pub terminal_plot: bool,
	pub width: u32,
	pub height: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
	pub level: String,
}

impl Default for InstrumentConfig {
	fn default() -> Self { Self{ resource: None, timeout_ms: 10_000 } }
}

impl Default for DiscoveryConfig {
	fn default() -> Self { Self{ resources: vec![], broadcast: true, timeout_ms: 1_000 } }
}

impl Default for AcquisitionConfig {
	fn default() -> Self {
		Self{ channels: vec![], duration_s: 10.0, wait: WaitMode::Fixed, poll_interval_ms: 100, poll_slack_s: 5.0 }
	}
}

impl Default for OutputConfig {
	fn default() -> Self { Self{ path: None, png: None, terminal_plot: true, width: 140, height: 60 } }
}

impl Default for LoggingConfig {
	fn default() -> Self { Self{ level: "info".to_owned() } }
}

impl InstrumentConfig {
	pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_ms) }
}

impl DiscoveryConfig {
	pub fn broadcast_window(&self) -> Option<Duration> {
		if self.broadcast { Some(Duration::from_millis(self.timeout_ms)) } else { None }
	}
}

impl AcquisitionConfig {

	pub fn channel_set(&self) -> Result<Option<ChannelSet>> {
		if self.channels.is_empty() { return Ok(None); }
		let channels = self.channels.iter().map(|&n| Channel::try_from(n)).collect::<Result<Vec<Channel>>>()?;
		ChannelSet::new(channels).map(Some)
	}

	pub fn wait_strategy(&self) -> Box<dyn WaitStrategy> {
		match self.wait {
			WaitMode::Fixed => Box::new(FixedDelay{ sleeper: ThreadSleeper }),
			WaitMode::Poll  => Box::new(PollUntilStopped {
				interval: Duration::from_millis(self.poll_interval_ms),
				slack: Duration::from_secs_f64(self.poll_slack_s.max(0.0)),
				sleeper: ThreadSleeper,
			}),
		}
	}

}

// `SCOPE_ACQUISITION__DURATION_S=2.5`, `SCOPE_ACQUISITION__CHANNELS=1,3`
fn environment(vars:Option<Map<String, String>>) -> Environment {
	Environment::with_prefix("SCOPE")
		.prefix_separator("_")
		.separator("__")
		.list_separator(",")
		.with_list_parse_key("acquisition.channels")
		.with_list_parse_key("discovery.resources")
		.try_parsing(true)
		.source(vars)
}

/// Defaults, then the TOML file at `path` if given, then `SCOPE_*` environment variables
/// (`SCOPE_ACQUISITION__DURATION_S=2.5`).  List fields take comma separated values.
pub fn load_config(path:Option<&Path>) -> std::result::Result<AppConfig, ConfigError> {
	load_config_from(path, None)
}

// `vars` replaces the process environment when given
fn load_config_from(path:Option<&Path>, vars:Option<Map<String, String>>) -> std::result::Result<AppConfig, ConfigError> {
	let mut builder = Config::builder();

	if let Some(path) = path {
		if !path.exists() {
			return Err(ConfigError::Message(format!("Config file not found: {}", path.display())));
		}
		builder = builder.add_source(File::from(path));
	}

	builder = builder.add_source(environment(vars));

	builder.build()?.try_deserialize::<AppConfig>()
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;

	#[test]
	fn defaults() {
		let cfg = AppConfig::default();
		assert_eq!(cfg.acquisition.duration_s, 10.0);
		assert_eq!(cfg.acquisition.wait, WaitMode::Fixed);
		assert_eq!(cfg.acquisition.channel_set().unwrap(), None);
		assert_eq!(cfg.discovery.broadcast_window(), Some(Duration::from_secs(1)));
		assert_eq!(cfg.logging.level, "info");
	}

	#[test]
	fn missing_file_is_an_error() {
		assert!(load_config(Some(Path::new("/nonexistent/scope.toml"))).is_err());
	}

	#[test]
	fn toml_file_overrides_defaults() {
		let path = std::env::temp_dir().join(format!("scope-capture-config-{}.toml", std::process::id()));
		fs::write(&path, r#"
[instrument]
resource = "TCPIP0::10.0.0.5::inst0::INSTR"

[discovery]
resources = ["TCPIP0::10.0.0.6::5025::SOCKET"]
broadcast = false

[acquisition]
channels = [3, 1]
duration_s = 2.5
wait = "poll"
"#).unwrap();

		let cfg = load_config_from(Some(&path), vars(&[])).unwrap();
		fs::remove_file(&path).unwrap();

		assert_eq!(cfg.instrument.resource, Some(ResourceAddress::vxi11("10.0.0.5")));
		assert_eq!(cfg.instrument.timeout_ms, 10_000);
		assert_eq!(cfg.discovery.resources.len(), 1);
		assert_eq!(cfg.discovery.broadcast_window(), None);
		assert_eq!(cfg.acquisition.duration_s, 2.5);
		assert_eq!(cfg.acquisition.wait, WaitMode::Poll);
		let set = cfg.acquisition.channel_set().unwrap().unwrap();
		assert_eq!(set.iter().map(u8::from).collect::<Vec<u8>>(), vec![1, 3]);
	}

	fn vars(pairs:&[(&str, &str)]) -> Option<Map<String, String>> {
		Some(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
	}

	#[test]
	fn environment_overrides_scalars() {
		let cfg = load_config_from(None, vars(&[
			("SCOPE_ACQUISITION__DURATION_S", "2.5"),
			("SCOPE_ACQUISITION__WAIT", "poll"),
			("SCOPE_INSTRUMENT__RESOURCE", "TCPIP0::10.0.0.7::5025::SOCKET"),
			("SCOPE_OUTPUT__TERMINAL_PLOT", "false"),
			("OTHER_ACQUISITION__DURATION_S", "99"),
		])).unwrap();
		assert_eq!(cfg.acquisition.duration_s, 2.5);
		assert_eq!(cfg.acquisition.wait, WaitMode::Poll);
		assert_eq!(cfg.instrument.resource, Some("TCPIP0::10.0.0.7::5025::SOCKET".parse().unwrap()));
		assert!(!cfg.output.terminal_plot);
	}

	#[test]
	fn environment_sets_lists() {
		let cfg = load_config_from(None, vars(&[
			("SCOPE_ACQUISITION__CHANNELS", "1,3"),
			("SCOPE_DISCOVERY__RESOURCES", "TCPIP0::10.0.0.5::inst0::INSTR,TCPIP0::10.0.0.6::5025::SOCKET"),
		])).unwrap();
		assert_eq!(cfg.acquisition.channels, vec![1, 3]);
		assert_eq!(cfg.discovery.resources, vec![
			ResourceAddress::vxi11("10.0.0.5"),
			"TCPIP0::10.0.0.6::5025::SOCKET".parse().unwrap(),
		]);

		let single = load_config_from(None, vars(&[("SCOPE_ACQUISITION__CHANNELS", "2")])).unwrap();
		assert_eq!(single.acquisition.channels, vec![2]);
	}

	#[test]
	fn bad_channel_in_config() {
		let acq = AcquisitionConfig{ channels: vec![5], ..AcquisitionConfig::default() };
		assert!(acq.channel_set().is_err());
	}
}
