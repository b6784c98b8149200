use indicatif::{
    ProgressIterator,
    ProgressStyle,
};
use mzrecal::{
    DeltaUnit,
    MatchSet,
    PeakSet,
    ShiftConfig,
    deltas_from_matches,
    estimate_linear_shift,
    match_mutual_nearest,
};
use serde::Serialize;
use std::fs::File;
use std::io::{
    self,
    BufWriter,
    Write,
};
use std::path::Path;
use std::time::Instant;
use tracing::{
    info,
    instrument,
};

use crate::cli::{
    EstimateShiftArgs,
    MatchPeaksArgs,
    SerializationFormat,
    WriteTemplateArgs,
};
use crate::error::CliError;

/// One line of the 'estimate-shift' output.
#[derive(Debug, Serialize)]
pub struct ShiftRecord {
    pub spectrum: String,
    pub shift: f64,
    pub unit: DeltaUnit,
    pub n_matches: usize,
    pub n_spectrum_peaks: usize,
    pub n_reference_peaks: usize,
}

/// Output of the 'match-peaks' subcommand.
///
/// Deltas are aligned to the reference peaks, `null` where a reference
/// peak has no match.
#[derive(Debug, Serialize)]
pub struct MatchReport<'a> {
    pub matches: &'a MatchSet,
    pub deltas: Vec<Option<f64>>,
}

/// Reads a spectrum from a json file with `positions` (or `mz`) and
/// `intensities` (or `intensity`) arrays.
pub fn read_peak_set(path: &Path) -> Result<PeakSet, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|source| CliError::SpectrumReading {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads the shift settings, falling back to the defaults without a path.
pub fn read_shift_config(path: Option<&Path>) -> Result<ShiftConfig, CliError> {
    match path {
        Some(path) => Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?),
        None => Ok(ShiftConfig::default()),
    }
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>, CliError> {
    match path {
        Some(path) => Ok(Box::new(BufWriter::new(File::create(path)?))),
        None => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}

/// Main function for the 'estimate-shift' subcommand.
#[instrument]
pub fn main_estimate_shift(args: EstimateShiftArgs) -> Result<(), CliError> {
    let config = read_shift_config(args.config.as_deref())?;
    info!("Using shift settings: {:#?}", config);

    info!("Loading reference from {}", args.reference.display());
    let reference = read_peak_set(&args.reference)?;
    info!("Loaded {} reference peaks", reference.len());

    let start = Instant::now();
    let writer = open_output(args.output.as_deref())?;
    let mut records = RecordWriter::new(writer, args.format);

    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})",
    )?;
    for path in args.spectra.iter().progress_with_style(style) {
        let spectrum = read_peak_set(path)?;
        let estimate = estimate_linear_shift(&spectrum, &reference, &config)?;
        let record = ShiftRecord {
            spectrum: path.display().to_string(),
            shift: estimate.shift,
            unit: estimate.unit,
            n_matches: estimate.n_matches,
            n_spectrum_peaks: estimate.n_spectrum_peaks,
            n_reference_peaks: estimate.n_reference_peaks,
        };
        records.write(&record)?;
    }
    let n_written = records.finish()?;

    if let Some(output) = &args.output {
        println!("Wrote to {}", output.display());
    }
    info!(
        "Estimated shifts for {} spectra in {:#?}",
        n_written,
        start.elapsed()
    );
    Ok(())
}

/// Main function for the 'match-peaks' subcommand.
#[instrument]
pub fn main_match_peaks(args: MatchPeaksArgs) -> Result<(), CliError> {
    let target = read_peak_set(&args.target)?;
    let reference = read_peak_set(&args.reference)?;

    let matches = match_mutual_nearest(&target, &reference, args.metric);
    info!(
        "Matched {} pairs between {} target and {} reference peaks",
        matches.len(),
        target.len(),
        reference.len()
    );
    let deltas = deltas_from_matches(&target, &reference, &matches, args.unit)
        .into_iter()
        .map(|d| if d.is_nan() { None } else { Some(d) })
        .collect();
    let report = MatchReport {
        matches: &matches,
        deltas,
    };

    let mut writer = open_output(args.output.as_deref())?;
    serde_json::to_writer_pretty(&mut writer, &report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

const SHIFT_CONFIG_TEMPLATE: &str = r#"{
  "binning": { "width": 0.2 },
  "max_per_chunk": 1,
  "max_peaks": null,
  "metric": "position_intensity",
  "unit": "ppm",
  "plot": false
}"#;

const SPECTRUM_TEMPLATE: &str = r#"{
  "positions": [ 147.1128, 248.1604, 347.22889, 418.26601, 723.844601 ],
  "intensities": [ 1200.0, 5400.0, 830.5, 2210.0, 9800.0 ]
}"#;

/// Main function for the 'write-template' subcommand.
pub fn main_write_template(args: WriteTemplateArgs) -> Result<(), CliError> {
    let target_dir = args.output_path;
    std::fs::create_dir_all(&target_dir)?;

    let config_path = target_dir.join("shift_config_template.json");
    std::fs::write(&config_path, SHIFT_CONFIG_TEMPLATE)?;
    println!("Wrote shift config template to: {}", config_path.display());

    let spectrum_path = target_dir.join("spectrum_template.json");
    std::fs::write(&spectrum_path, SPECTRUM_TEMPLATE)?;
    println!("Wrote spectrum template to: {}", spectrum_path.display());
    Ok(())
}

/// Writes records one at a time as a json array or as ndjson.
pub struct RecordWriter<W: Write> {
    writer: W,
    format: SerializationFormat,
    written: usize,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(writer: W, format: SerializationFormat) -> Self {
        Self {
            writer,
            format,
            written: 0,
        }
    }

    pub fn write<T: Serialize>(&mut self, record: &T) -> Result<(), CliError> {
        let prefix: &[u8] = match (self.format, self.written) {
            (SerializationFormat::Ndjson, _) => b"",
            (_, 0) => b"[",
            _ => b",",
        };
        self.writer.write_all(prefix)?;
        if self.format == SerializationFormat::PrettyJson {
            serde_json::to_writer_pretty(&mut self.writer, record)?;
        } else {
            serde_json::to_writer(&mut self.writer, record)?;
        }
        if self.format == SerializationFormat::Ndjson {
            self.writer.write_all(b"\n")?;
        }
        self.written += 1;
        Ok(())
    }

    /// Closes the array for json output and flushes. Returns the record count.
    pub fn finish(mut self) -> Result<usize, CliError> {
        let suffix: &[u8] = match (self.format, self.written) {
            (SerializationFormat::Ndjson, _) => b"",
            (_, 0) => b"[]\n",
            _ => b"]\n",
        };
        self.writer.write_all(suffix)?;
        self.writer.flush()?;
        Ok(self.written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mzrecal::{
        Binning,
        DistanceMetric,
    };
    use std::path::PathBuf;

    fn write_json(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_templates_deserializable() {
        let config: ShiftConfig = serde_json::from_str(SHIFT_CONFIG_TEMPLATE).unwrap();
        assert_eq!(config, ShiftConfig::default());
        assert_eq!(config.binning, Binning::Width(0.2));

        let spectrum: PeakSet = serde_json::from_str(SPECTRUM_TEMPLATE).unwrap();
        assert_eq!(spectrum.len(), 5);
    }

    #[test]
    fn test_write_template_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        main_write_template(WriteTemplateArgs {
            output_path: dir.path().join("templates"),
        })
        .unwrap();
        let config_path = dir.path().join("templates/shift_config_template.json");
        let config = read_shift_config(Some(config_path.as_path())).unwrap();
        assert_eq!(config, ShiftConfig::default());
        let spectrum = read_peak_set(&dir.path().join("templates/spectrum_template.json")).unwrap();
        assert_eq!(spectrum.len(), 5);
    }

    #[test]
    fn test_read_peak_set_accepts_mz_aliases() {
        let tmp_file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp_file.path(),
            r#"{"mz": [100.0, 200.0], "intensity": [1.0, 2.0]}"#,
        )
        .unwrap();
        let spectrum = read_peak_set(tmp_file.path()).unwrap();
        assert_eq!(spectrum.positions(), &[100.0, 200.0]);
    }

    #[test]
    fn test_read_peak_set_rejects_mismatched_lengths() {
        let tmp_file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp_file.path(),
            r#"{"positions": [100.0, 200.0], "intensities": [1.0]}"#,
        )
        .unwrap();
        let err = read_peak_set(tmp_file.path()).unwrap_err();
        assert!(matches!(err, CliError::SpectrumReading { .. }));
    }

    #[test]
    fn test_record_writer_formats() {
        let items = [1, 2];

        let mut buf = Vec::new();
        let mut writer = RecordWriter::new(&mut buf, SerializationFormat::Json);
        for item in &items {
            writer.write(item).unwrap();
        }
        assert_eq!(writer.finish().unwrap(), 2);
        assert_eq!(String::from_utf8(buf).unwrap(), "[1,2]\n");

        let mut buf = Vec::new();
        let mut writer = RecordWriter::new(&mut buf, SerializationFormat::Ndjson);
        for item in &items {
            writer.write(item).unwrap();
        }
        writer.finish().unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "1\n2\n");

        let mut buf = Vec::new();
        let writer = RecordWriter::new(&mut buf, SerializationFormat::PrettyJson);
        assert_eq!(writer.finish().unwrap(), 0);
        assert_eq!(String::from_utf8(buf).unwrap(), "[]\n");
    }

    #[test]
    fn test_estimate_shift_writes_one_record_per_spectrum() {
        let dir = tempfile::tempdir().unwrap();
        let reference = write_json(
            dir.path(),
            "reference.json",
            r#"{"positions": [100.001, 200.002], "intensities": [10.0, 5.0]}"#,
        );
        let shifted = write_json(
            dir.path(),
            "shifted.json",
            r#"{"positions": [100.0, 200.0], "intensities": [10.0, 5.0]}"#,
        );
        let empty = write_json(
            dir.path(),
            "empty.json",
            r#"{"positions": [], "intensities": []}"#,
        );
        let output = dir.path().join("shifts.ndjson");

        main_estimate_shift(EstimateShiftArgs {
            reference,
            spectra: vec![shifted, empty],
            config: None,
            output: Some(output.clone()),
            format: SerializationFormat::Ndjson,
        })
        .unwrap();

        let contents = std::fs::read_to_string(&output).unwrap();
        let records: Vec<serde_json::Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert!((records[0]["shift"].as_f64().unwrap() + 10.0).abs() < 1e-6);
        assert_eq!(records[0]["unit"], "ppm");
        assert_eq!(records[0]["n_matches"], 2);
        assert_eq!(records[1]["shift"].as_f64().unwrap(), 0.0);
        assert_eq!(records[1]["n_matches"], 0);
        assert_eq!(records[1]["n_spectrum_peaks"], 0);
        assert_eq!(records[1]["n_reference_peaks"], 2);
    }

    #[test]
    fn test_estimate_shift_reports_bad_config() {
        let dir = tempfile::tempdir().unwrap();
        let reference = write_json(
            dir.path(),
            "reference.json",
            r#"{"positions": [100.0], "intensities": [1.0]}"#,
        );
        let config = write_json(dir.path(), "config.json", r#"{"binning": {"count": 0}}"#);
        let result = main_estimate_shift(EstimateShiftArgs {
            reference: reference.clone(),
            spectra: vec![reference],
            config: Some(config),
            output: Some(dir.path().join("out.json")),
            format: SerializationFormat::Json,
        });
        assert!(matches!(result, Err(CliError::Recal(_))));
    }

    #[test]
    fn test_match_peaks_writes_null_for_unmatched() {
        let dir = tempfile::tempdir().unwrap();
        let target = write_json(
            dir.path(),
            "target.json",
            r#"{"positions": [100.5], "intensities": [1.0]}"#,
        );
        let reference = write_json(
            dir.path(),
            "reference.json",
            r#"{"positions": [100.0, 300.0], "intensities": [1.0, 1.0]}"#,
        );
        let output = dir.path().join("matches.json");
        main_match_peaks(MatchPeaksArgs {
            target,
            reference,
            metric: DistanceMetric::Position,
            unit: DeltaUnit::Absolute,
            output: Some(output.clone()),
        })
        .unwrap();

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(
            report["matches"]["pairs"],
            serde_json::json!([{"target": 0, "reference": 0}])
        );
        assert_eq!(report["deltas"], serde_json::json!([0.5, null]));
    }
}
