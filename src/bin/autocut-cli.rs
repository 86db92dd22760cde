use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail, ensure};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing::level_filters::LevelFilter;

use autocut::backends::silero::SileroVad;
use autocut::backends::whisper::WhisperTranscriber;
use autocut::cut::{collect_chunks, write_wav};
use autocut::decoder::decode_to_mono;
use autocut::output_type::OutputType;
use autocut::vad::VadProcessor;
use autocut::{Autocut, Opts, VadMode, encode_entries};

/// Suffix marking audio that has already been cut down to speech.
const CUT_MARK: &str = "_cut";

fn main() -> Result<()> {
    let params = Params::parse();
    autocut::logging::init_with_default(if params.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    });

    let opts = params.opts()?;

    if params.cut {
        return run_cut(&params, &opts);
    }

    let Some(model_path) = params.model_path.as_deref() else {
        bail!("--model is required unless --cut is given");
    };

    let mut autocut = Autocut::new(
        SileroVad::new(&params.vad_model_path)?,
        WhisperTranscriber::new(model_path)?,
    );

    for input in &params.inputs {
        let output = with_suffix(input, opts.output_type.file_suffix());
        if skip_existing(&output, params.force) {
            continue;
        }

        info!(input = %input.display(), "transcribing");
        let samples = decode_input(input)?;

        let mut input_opts = opts.clone();
        input_opts.vad = params.vad.resolve(input);

        let entries = autocut
            .transcribe_samples(&samples, &input_opts)
            .with_context(|| format!("failed to transcribe '{}'", input.display()))?;

        let file = File::create(&output)
            .with_context(|| format!("failed to create '{}'", output.display()))?;
        encode_entries(&entries, file, opts.output_type)?;

        info!(input = %input.display(), output = %output.display(), entries = entries.len(), "transcribed");
    }

    Ok(())
}

fn run_cut(params: &Params, opts: &Opts) -> Result<()> {
    ensure!(
        params.vad != VadSwitch::Off,
        "--cut needs speech detection and cannot be combined with --vad off"
    );

    let pending: Vec<&PathBuf> = params
        .inputs
        .iter()
        .filter(|input| {
            let detect = params.vad.resolve(input) == VadMode::Detect;
            if !detect {
                info!(input = %input.display(), "input is already cut, skipping");
            }
            detect
        })
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let mut vad = VadProcessor::with_policy(SileroVad::new(&params.vad_model_path)?, opts.policy)?;

    for input in pending {
        let output = cut_output_path(input);
        if skip_existing(&output, params.force) {
            continue;
        }

        let samples = decode_input(input)?;
        let intervals = vad.detect(&samples)?;
        let speech = collect_chunks(&samples, &intervals)?;

        let file = File::create(&output)
            .with_context(|| format!("failed to create '{}'", output.display()))?;
        write_wav(BufWriter::new(file), &speech)?;

        info!(
            input = %input.display(),
            output = %output.display(),
            kept_samples = speech.len(),
            total_samples = samples.len(),
            "cut to speech"
        );
    }

    Ok(())
}

#[derive(Parser, Debug)]
#[command(name = "autocut")]
#[command(about = "Cut long recordings to speech and transcribe them into subtitles")]
struct Params {
    /// Audio or video files to process.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// whisper.cpp (ggml) model used for transcription.
    #[arg(short = 'm', long = "model")]
    model_path: Option<PathBuf>,

    /// Silero VAD ONNX model.
    #[arg(short = 'v', long = "vad-model")]
    vad_model_path: PathBuf,

    /// Whether to detect speech first. `auto` skips detection for inputs already named `*_cut`.
    #[arg(long = "vad", value_enum, default_value_t = VadSwitch::Auto)]
    vad: VadSwitch,

    /// Language hint, e.g. `en` or `zh`.
    #[arg(short = 'l', long = "lang")]
    language: Option<String>,

    /// Initial prompt passed to the transcriber for every interval.
    #[arg(long = "prompt")]
    prompt: Option<String>,

    #[arg(short = 'o', long = "output-type", value_enum)]
    output_type: Option<OutputType>,

    /// JSON file with `Opts` fields; command-line flags take precedence.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Overwrite existing outputs.
    #[arg(short = 'f', long = "force", default_value_t = false)]
    force: bool,

    /// Write speech-only audio to `<stem>_cut.wav` instead of subtitles.
    #[arg(long = "cut", default_value_t = false)]
    cut: bool,

    /// Log per-stage details. `AUTOCUT_LOG` takes precedence when set.
    #[arg(long = "verbose", default_value_t = false)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum VadSwitch {
    On,
    Off,
    Auto,
}

impl VadSwitch {
    fn resolve(self, input: &Path) -> VadMode {
        let already_cut = input
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|s| s.ends_with(CUT_MARK));

        match self {
            VadSwitch::On => VadMode::Detect,
            VadSwitch::Off => VadMode::WholeInput,
            VadSwitch::Auto if already_cut => VadMode::WholeInput,
            VadSwitch::Auto => VadMode::Detect,
        }
    }
}

impl Params {
    fn opts(&self) -> Result<Opts> {
        let mut opts = match &self.config {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("failed to open config '{}'", path.display()))?;
                serde_json::from_reader::<_, Opts>(file)
                    .with_context(|| format!("failed to parse config '{}'", path.display()))?
            }
            None => Opts::default(),
        };

        if self.language.is_some() {
            opts.language = self.language.clone();
        }
        if self.prompt.is_some() {
            opts.prompt = self.prompt.clone();
        }
        if let Some(output_type) = self.output_type {
            opts.output_type = output_type;
        }

        opts.validate()?;
        Ok(opts)
    }
}

fn decode_input(input: &Path) -> Result<Vec<f32>> {
    let file =
        File::open(input).with_context(|| format!("failed to open '{}'", input.display()))?;
    let hint = input.extension().and_then(|e| e.to_str());

    decode_to_mono(file, hint).with_context(|| format!("failed to decode '{}'", input.display()))
}

fn skip_existing(output: &Path, force: bool) -> bool {
    if !output.exists() {
        return false;
    }
    if force {
        info!(output = %output.display(), "output exists, overwriting");
        false
    } else {
        info!(output = %output.display(), "output exists, skipping (use --force to overwrite)");
        true
    }
}

/// `dir/name.ext` → `dir/name{suffix}`.
fn with_suffix(input: &Path, suffix: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    input.with_file_name(format!("{stem}{suffix}"))
}

/// `name.ext` → `name_cut.wav`; an input already named `*_cut` becomes `*__cut.wav`.
fn cut_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let base = match stem.strip_suffix(CUT_MARK) {
        Some(prefix) => format!("{prefix}_{CUT_MARK}"),
        None => format!("{stem}{CUT_MARK}"),
    };
    input.with_file_name(format!("{base}.wav"))
}
