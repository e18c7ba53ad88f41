use textplots::{Chart, Plot, Shape};

use crate::error::{Error, Result};
use crate::waveform::Waveform;

/// Pick an SI prefix so the largest magnitude lands in [1, 1000)
pub fn determine_scale(max_value:f64) -> (f64, &'static str) {
	let max_value = max_value.abs();
	if max_value >= 1.0 || max_value == 0.0 {
		(1.0, "")
	} else if max_value >= 1e-3 {
		(1e3, "m")
	} else if max_value >= 1e-6 {
		(1e6, "u")
	} else if max_value >= 1e-9 {
		(1e9, "n")
	} else {
		(1e12, "p")
	}
}

fn bounds<I: Iterator<Item = f64>>(values:I) -> Option<(f64, f64)> {
	values.fold(None, |acc, x| match acc {
		None           => Some((x, x)),
		Some((lo, hi)) => Some((lo.min(x), hi.max(x))),
	})
}

pub fn time_bounds(waveforms:&[Waveform]) -> Option<(f64, f64)> {
	bounds(waveforms.iter().flat_map(|wf| wf.time().iter().copied()))
}

pub fn voltage_bounds(waveforms:&[Waveform]) -> Option<(f64, f64)> {
	bounds(waveforms.iter().flat_map(|wf| wf.voltage().iter().copied()))
}

// textplots panics below these
pub const MIN_TERMINAL_WIDTH:u32 = 32;
pub const MIN_TERMINAL_HEIGHT:u32 = 3;

pub fn check_terminal_size(width:u32, height:u32) -> Result<()> {
	if width < MIN_TERMINAL_WIDTH || height < MIN_TERMINAL_HEIGHT {
		return Err(Error::Plot(format!("Terminal chart needs at least {}x{} characters, got {}x{}",
			MIN_TERMINAL_WIDTH, MIN_TERMINAL_HEIGHT, width, height)));
	}
	Ok(())
}

// Widen a degenerate range so the chart has something to span
fn padded(lo:f64, hi:f64) -> (f64, f64) {
	if hi > lo { (lo, hi) } else { (lo - 0.5, hi + 0.5) }
}

/// Draw every channel on one terminal chart, with a legend line per channel above it.
pub fn plot_terminal(waveforms:&[Waveform], width:u32, height:u32) -> Result<()> {
	check_terminal_size(width, height)?;
	let (t0, t1) = time_bounds(waveforms).ok_or_else(|| Error::Plot("Cannot plot empty data".to_owned()))?;
	let (t0, t1) = padded(t0, t1);
	let (t_scale, t_unit) = determine_scale(t0.abs().max(t1.abs()));

	let frames:Vec<Vec<(f32, f32)>> = waveforms.iter()
		.map(|wf| wf.samples().map(|(t, v)| ((t * t_scale) as f32, v as f32)).collect())
		.collect();
	let shapes:Vec<Shape> = frames.iter().map(|f| Shape::Lines(f)).collect();

	for wf in waveforms {
		match wf.voltage_range() {
			Some((lo, hi)) => println!("{}: {} points, {:.4} V to {:.4} V", wf.channel(), wf.len(), lo, hi),
			None           => println!("{}: no points", wf.channel()),
		}
	}
	println!("X-axis: Time [{}s] | Y-axis: Voltage [V]", t_unit);

	let mut base = Chart::new(width, height, (t0 * t_scale) as f32, (t1 * t_scale) as f32);
	let mut chart = &mut base;
	for shape in &shapes {
		chart = chart.lineplot(shape);
	}
	chart.nice();

	Ok(())
}

#[cfg(feature = "png")]
pub fn render_png(waveforms:&[Waveform], path:&std::path::Path, size:(u32, u32)) -> Result<()> {
	use plotters::prelude::*;

	fn plot_err<E: std::fmt::Display>(e:E) -> Error { Error::Plot(e.to_string()) }

	let (t0, t1) = time_bounds(waveforms).ok_or_else(|| Error::Plot("Cannot plot empty data".to_owned()))?;
	let (v0, v1) = voltage_bounds(waveforms).ok_or_else(|| Error::Plot("Cannot plot empty data".to_owned()))?;
	let (t0, t1) = padded(t0, t1);
	let (v0, v1) = padded(v0, v1);

	let root = BitMapBackend::new(path, size).into_drawing_area();
	root.fill(&WHITE).map_err(plot_err)?;

	let mut chart = ChartBuilder::on(&root)
		.caption("Waveform", ("sans-serif", 24))
		.margin(10)
		.x_label_area_size(40)
		.y_label_area_size(60)
		.build_cartesian_2d(t0..t1, v0..v1)
		.map_err(plot_err)?;

	chart.configure_mesh()
		.x_desc("Time [s]")
		.y_desc("Voltage [V]")
		.draw()
		.map_err(plot_err)?;

	for (i, wf) in waveforms.iter().enumerate() {
		let color = Palette99::pick(i).to_rgba();
		chart.draw_series(LineSeries::new(wf.samples(), color.stroke_width(1)))
			.map_err(plot_err)?
			.label(wf.channel().to_string())
			.legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
	}

	if waveforms.len() > 1 {
		chart.configure_series_labels()
			.background_style(WHITE.mix(0.8))
			.border_style(BLACK)
			.draw()
			.map_err(plot_err)?;
	}

	root.present().map_err(plot_err)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::channel::Channel;
	use crate::waveform::Preamble;

	#[test]
	fn test_determine_scale() {
		assert_eq!(determine_scale(5.0), (1.0, ""));
		assert_eq!(determine_scale(-0.005), (1e3, "m"));
		assert_eq!(determine_scale(5e-6), (1e6, "u"));
		assert_eq!(determine_scale(5e-9), (1e9, "n"));
		assert_eq!(determine_scale(5e-12), (1e12, "p"));
		assert_eq!(determine_scale(0.0), (1.0, ""));
	}

	#[test]
	fn bounds_span_all_channels() {
		let a = Waveform::decode(Channel::try_from(1).unwrap(), Preamble::parse("1,0,3,1,1e-3,0,0,1,0,0").unwrap(), &[0, 5, -2]).unwrap();
		let b = Waveform::decode(Channel::try_from(2).unwrap(), Preamble::parse("1,0,2,1,1e-3,-1e-3,0,1,0,0").unwrap(), &[9, 1]).unwrap();
		let wfs = [a, b];
		assert_eq!(time_bounds(&wfs), Some((-1e-3, 2e-3)));
		assert_eq!(voltage_bounds(&wfs), Some((-2.0, 9.0)));
	}

	#[test]
	fn empty_data_is_not_plotted() {
		assert!(plot_terminal(&[], 80, 20).is_err());
	}

	#[test]
	fn undersized_chart_is_an_error() {
		let wf = Waveform::decode(Channel::try_from(1).unwrap(), Preamble::parse("1,0,2,1,1e-6,0,0,1e-3,0,0").unwrap(), &[0, 1]).unwrap();
		assert!(matches!(plot_terminal(&[wf.clone()], 20, 10), Err(Error::Plot(_))));
		assert!(matches!(plot_terminal(&[wf], 80, 2), Err(Error::Plot(_))));
		assert!(check_terminal_size(MIN_TERMINAL_WIDTH, MIN_TERMINAL_HEIGHT).is_ok());
	}

	#[test]
	fn terminal_plot_of_two_channels() {
		let a = Waveform::decode(Channel::try_from(1).unwrap(), Preamble::parse("1,0,4,1,1e-6,0,0,1e-3,0,0").unwrap(), &[0, 100, 200, 100]).unwrap();
		let b = Waveform::decode(Channel::try_from(2).unwrap(), Preamble::parse("1,0,4,1,1e-6,0,0,1e-3,0,0").unwrap(), &[50, 50, 50, 50]).unwrap();
		assert!(plot_terminal(&[a, b], 80, 20).is_ok());
	}
}
