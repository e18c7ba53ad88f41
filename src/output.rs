// Saving captured waveforms: JSON keeps the preambles along with the data, CSV is just columns

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use log::info;

use crate::error::Result;
use crate::waveform::Waveform;

// Columns can only share one time column when every channel has an identical time axis
fn shared_time_axis(waveforms:&[Waveform]) -> bool {
	match waveforms.split_first() {
		Some((first, rest)) => rest.iter().all(|wf| wf.time() == first.time()),
		None => true,
	}
}

pub fn write_json<W: Write>(waveforms:&[Waveform], w:W) -> Result<()> {
	serde_json::to_writer_pretty(w, waveforms)?;
	Ok(())
}

// `time,CH1,CH2,...` when the time axes agree, otherwise one `channel,time,voltage` row per sample
pub fn write_csv<W: Write>(waveforms:&[Waveform], w:W) -> Result<()> {
	let mut wtr = csv::Writer::from_writer(w);

	if shared_time_axis(waveforms) {
		let mut header = vec!["time".to_owned()];
		header.extend(waveforms.iter().map(|wf| wf.channel().to_string()));
		wtr.write_record(&header)?;

		if let Some(first) = waveforms.first() {
			for (i, t) in first.time().iter().enumerate() {
				let mut row = vec![t.to_string()];
				row.extend(waveforms.iter().map(|wf| wf.voltage()[i].to_string()));
				wtr.write_record(&row)?;
			}
		}
	} else {
		wtr.write_record(&["channel", "time", "voltage"])?;
		for wf in waveforms {
			let ch = wf.channel().to_string();
			for (t, v) in wf.samples() {
				wtr.write_record(&[ch.clone(), t.to_string(), v.to_string()])?;
			}
		}
	}

	wtr.flush()?;
	Ok(())
}

pub fn save(waveforms:&[Waveform], path:&Path) -> Result<()> {
	let w = BufWriter::new(File::create(path)?);
	let is_csv = path.extension().map_or(false, |e| e.eq_ignore_ascii_case("csv"));
	if is_csv { write_csv(waveforms, w)?; } else { write_json(waveforms, w)?; }
	info!("Wrote {} waveform(s) to {}", waveforms.len(), path.display());
	Ok(())
}

pub fn save_to_stdout(waveforms:&[Waveform]) -> Result<()> {
	let stdout = io::stdout();
	let mut lock = stdout.lock();
	write_json(waveforms, &mut lock)?;
	writeln!(lock)?;
	Ok(())
}
