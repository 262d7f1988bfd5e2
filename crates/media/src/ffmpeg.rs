//! ffmpeg-backed codec tool.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use narrator_core::{CancelToken, CodecTool, ToolError};

use crate::process::run_tool;

/// Scale filter rounding width and height down to even numbers (required by
/// libx264 with yuv420p).
pub const EVEN_SCALE_FILTER: &str = "scale=trunc(iw/2)*2:trunc(ih/2)*2";

/// Audio sample rate of every segment. Stream copy concatenation needs
/// identical audio parameters across segments, whatever the speech engine
/// or the silence generator produced.
pub const SEGMENT_SAMPLE_RATE: u32 = 24_000;

/// Codec tool that shells out to an ffmpeg binary.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    binary: String,
}

impl Ffmpeg {
    /// Use the given ffmpeg binary name or path.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Run ffmpeg and confirm that `output` was written.
    fn run(&self, args: Vec<OsString>, output: &Path, cancel: &CancelToken) -> Result<(), ToolError> {
        run_tool(&self.binary, &args, cancel)?;

        let written = std::fs::metadata(output)
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if !written {
            return Err(ToolError::MissingOutput {
                tool: self.binary.clone(),
                path: output.to_path_buf(),
            });
        }
        Ok(())
    }
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl CodecTool for Ffmpeg {
    fn mux_still(
        &self,
        image: &Path,
        audio: &Path,
        output: &Path,
        cancel: &CancelToken,
    ) -> Result<(), ToolError> {
        self.run(mux_still_args(image, audio, output), output, cancel)
    }

    fn remux_to_ts(&self, input: &Path, output: &Path, cancel: &CancelToken) -> Result<(), ToolError> {
        self.run(remux_ts_args(input, output), output, cancel)
    }

    fn concat_ts(
        &self,
        segments: &[PathBuf],
        output: &Path,
        cancel: &CancelToken,
    ) -> Result<(), ToolError> {
        self.run(concat_args(segments, output), output, cancel)
    }

    fn silent_audio(&self, seconds: f64, output: &Path, cancel: &CancelToken) -> Result<(), ToolError> {
        self.run(silent_audio_args(seconds, output), output, cancel)
    }
}

/// Common leading arguments: overwrite, quiet banner, errors only.
fn base_args() -> Vec<OsString> {
    ["-hide_banner", "-nostdin", "-loglevel", "error", "-y"]
        .into_iter()
        .map(OsString::from)
        .collect()
}

fn push_all(args: &mut Vec<OsString>, items: &[&str]) {
    args.extend(items.iter().map(OsString::from));
}

/// Loop the still image for as long as the audio plays (`-shortest`).
pub fn mux_still_args(image: &Path, audio: &Path, output: &Path) -> Vec<OsString> {
    let mut args = base_args();
    push_all(&mut args, &["-loop", "1", "-i"]);
    args.push(image.into());
    args.push("-i".into());
    args.push(audio.into());
    push_all(
        &mut args,
        &[
            "-vf",
            EVEN_SCALE_FILTER,
            "-c:v",
            "libx264",
            "-tune",
            "stillimage",
            "-c:a",
            "aac",
            "-b:a",
            "128k",
            "-ac",
            "1",
            "-ar",
        ],
    );
    args.push(SEGMENT_SAMPLE_RATE.to_string().into());
    push_all(&mut args, &["-pix_fmt", "yuv420p", "-shortest"]);
    args.push(output.into());
    args
}

/// Copy streams into MPEG-TS with Annex B H.264 so segments join bytewise.
pub fn remux_ts_args(input: &Path, output: &Path) -> Vec<OsString> {
    let mut args = base_args();
    args.push("-i".into());
    args.push(input.into());
    push_all(
        &mut args,
        &["-c", "copy", "-bsf:v", "h264_mp4toannexb", "-f", "mpegts"],
    );
    args.push(output.into());
    args
}

/// Join segments with the `concat:` protocol and fix the AAC bitstream for
/// the output container.
pub fn concat_args(segments: &[PathBuf], output: &Path) -> Vec<OsString> {
    let mut input = OsString::from("concat:");
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            input.push("|");
        }
        input.push(segment);
    }

    let mut args = base_args();
    push_all(&mut args, &["-f", "mpegts", "-i"]);
    args.push(input);
    push_all(&mut args, &["-c", "copy", "-bsf:a", "aac_adtstoasc"]);
    args.push(output.into());
    args
}

/// Generate `seconds` of mono silence; the codec follows the output
/// extension.
pub fn silent_audio_args(seconds: f64, output: &Path) -> Vec<OsString> {
    let mut args = base_args();
    push_all(&mut args, &["-f", "lavfi", "-i"]);
    args.push(format!("anullsrc=channel_layout=mono:sample_rate={}", SEGMENT_SAMPLE_RATE).into());
    args.push("-t".into());
    args.push(format!("{:.3}", seconds).into());
    args.push(output.into());
    args
}
