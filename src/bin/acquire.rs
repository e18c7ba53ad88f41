
use std::io;
use std::path::PathBuf;

use clap::Parser;
use env_logger::Env;
use log::{error, info};

use scope_capture::config::{load_config, AppConfig, WaitMode};
use scope_capture::devices::infiniivision::{validate_duration, InfiniiVision};
use scope_capture::resource::{list_resources, ResourceAddress};
use scope_capture::{output, plot, prompt, ChannelSet};

/// Capture waveforms from an InfiniiVision oscilloscope
#[derive(Parser, Debug)]
#[command(name = "acquire")]
#[command(about = "Single-shot waveform capture over VXI-11 or a raw SCPI socket", long_about = None)]
struct Args {
	/// TOML configuration file
	#[arg(short, long, value_name = "FILE")]
	config: Option<PathBuf>,

	/// Resource address, e.g. TCPIP0::192.168.1.5::inst0::INSTR; skips the selection prompt
	#[arg(short, long, value_name = "ADDRESS")]
	resource: Option<String>,

	/// Channels to capture, e.g. "1" or "1,3"; skips the channel prompt
	#[arg(long, value_name = "LIST")]
	channels: Option<String>,

	/// Acquisition window in seconds (at most 500)
	#[arg(short, long, value_name = "SECONDS")]
	duration: Option<f64>,

	/// How to wait for the acquisition to finish
	#[arg(long, value_parser = ["fixed", "poll"])]
	wait: Option<String>,

	/// Write the waveforms to a .json or .csv file
	#[arg(short, long, value_name = "FILE")]
	output: Option<PathBuf>,

	/// Render the waveforms to a PNG (needs the `png` feature)
	#[arg(long, value_name = "FILE")]
	png: Option<PathBuf>,

	/// Don't draw the terminal chart
	#[arg(long)]
	no_plot: bool,

	/// Override log level (trace, debug, info, warn, error)
	#[arg(short, long, value_name = "LEVEL")]
	log_level: Option<String>,
}

// Command line flags win over the config file and environment.  Everything here is checked
// before an instrument is ever contacted.
fn apply_args(config:&mut AppConfig, args:&Args) -> scope_capture::Result<()> {
	if let Some(r) = &args.resource {
		config.instrument.resource = Some(r.parse::<ResourceAddress>()?);
	}
	if let Some(c) = &args.channels {
		let set:ChannelSet = c.parse()?;
		config.acquisition.channels = set.iter().map(u8::from).collect();
	}
	if let Some(d) = args.duration { config.acquisition.duration_s = d; }
	match args.wait.as_deref() {
		Some("poll")  => config.acquisition.wait = WaitMode::Poll,
		Some("fixed") => config.acquisition.wait = WaitMode::Fixed,
		_ => { },
	}
	if args.output.is_some() { config.output.path = args.output.clone(); }
	if args.png.is_some() { config.output.png = args.png.clone(); }
	if args.no_plot { config.output.terminal_plot = false; }
	if let Some(l) = &args.log_level { config.logging.level = l.clone(); }

	validate_duration(config.acquisition.duration_s)?;
	config.acquisition.channel_set()?;
	if config.output.terminal_plot {
		plot::check_terminal_size(config.output.width, config.output.height)?;
	}
	Ok(())
}

fn initialize_logging(level:&str) {
	env_logger::Builder::from_env(Env::default().default_filter_or(level))
		.format_timestamp_millis()
		.init();
}

fn select_resource(config:&AppConfig) -> scope_capture::Result<ResourceAddress> {
	let resources = list_resources(&config.discovery.resources, config.discovery.broadcast_window());
	let stdin = io::stdin();
	let idx = prompt::select_index(&mut stdin.lock(), &mut io::stdout(), "Instrument list:", &resources)?;
	Ok(resources[idx].clone())
}

fn run(config:&AppConfig) -> scope_capture::Result<()> {
	let resource = match &config.instrument.resource {
		Some(r) => r.clone(),
		None    => select_resource(config)?,
	};

	let waveforms = {
		let mut scope = InfiniiVision::new(resource.open(config.instrument.timeout())?)?;
		let id = scope.identity();
		println!("ID of connected instrument");
		println!("{},{},{},{}", id.manufacturer, id.model, id.serial_num, id.fw_version);

		let channels = match config.acquisition.channel_set()? {
			Some(set) => set,
			None      => prompt::select_channels(&mut io::stdin().lock(), &mut io::stdout())?,
		};

		let wait = config.acquisition.wait_strategy();
		scope.capture(&channels, config.acquisition.duration_s, &*wait)?

		// The session is released here, before any plotting
	};

	for wf in &waveforms {
		info!("{}: {} points, preamble {:?}", wf.channel(), wf.len(), wf.preamble());
	}

	match &config.output.path {
		Some(path) => output::save(&waveforms, path)?,
		None if !config.output.terminal_plot => output::save_to_stdout(&waveforms)?,
		None => { },
	}

	if let Some(path) = &config.output.png {
		render_png(&waveforms, path, (config.output.width * 8, config.output.height * 10))?;
	}

	if config.output.terminal_plot {
		plot::plot_terminal(&waveforms, config.output.width, config.output.height)?;
	}

	Ok(())
}

#[cfg(feature = "png")]
fn render_png(waveforms:&[scope_capture::Waveform], path:&std::path::Path, size:(u32, u32)) -> scope_capture::Result<()> {
	plot::render_png(waveforms, path, size)?;
	info!("Rendered {}", path.display());
	Ok(())
}

#[cfg(not(feature = "png"))]
fn render_png(_waveforms:&[scope_capture::Waveform], path:&std::path::Path, _size:(u32, u32)) -> scope_capture::Result<()> {
	Err(scope_capture::Error::Plot(format!("Can't write {}: built without the `png` feature", path.display())))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();
	let mut config = load_config(args.config.as_deref())?;

	let level = args.log_level.clone().unwrap_or_else(|| config.logging.level.clone());
	initialize_logging(&level);

	if let Err(e) = apply_args(&mut config, &args).and_then(|_| run(&config)) {
		error!("{}", e);
		return Err(e.into());
	}

	Ok(())
}
