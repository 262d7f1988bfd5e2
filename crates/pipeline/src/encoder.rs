//! Two-stage segment encoding: mux still + audio, then repackage for
//! byte-stream concatenation.

use std::path::Path;

use narrator_core::{AudioArtifact, CancelToken, CodecTool, Error, Result, Segment, ToolError};

use crate::workspace::{discard, Workspace};

/// Produces one concatenation-ready segment per slide.
pub struct SegmentEncoder<'a> {
    codec: &'a dyn CodecTool,
}

impl<'a> SegmentEncoder<'a> {
    pub fn new(codec: &'a dyn CodecTool) -> Self {
        Self { codec }
    }

    /// Encode a slide image over its narration.
    ///
    /// Both stages must succeed. Whatever happens, the stage-one file is
    /// removed, and a failed stage two also removes its partial output.
    pub fn encode(
        &self,
        image: &Path,
        audio: &AudioArtifact,
        workspace: &Workspace,
        cancel: &CancelToken,
    ) -> Result<Segment> {
        let index = audio.slide_index;
        let muxed = workspace.mux_path(index);
        let segment = workspace.segment_path(index);

        let result = self
            .codec
            .mux_still(image, &audio.path, &muxed, cancel)
            .and_then(|()| self.codec.remux_to_ts(&muxed, &segment, cancel));

        discard(&muxed);

        match result {
            Ok(()) => {
                log::debug!("Slide {}: encoded {}", index + 1, segment.display());
                Ok(Segment {
                    slide_index: index,
                    path: segment,
                })
            }
            Err(e) => {
                discard(&segment);
                Err(encode_error(index, e))
            }
        }
    }

    /// Encode a slide without notes over a silent track of `seconds`.
    pub fn encode_silent(
        &self,
        slide_index: usize,
        image: &Path,
        seconds: f64,
        workspace: &Workspace,
        cancel: &CancelToken,
    ) -> Result<Segment> {
        let silence = AudioArtifact {
            slide_index,
            path: workspace.silence_path(slide_index),
        };

        if let Err(e) = self.codec.silent_audio(seconds, &silence.path, cancel) {
            discard(&silence.path);
            return Err(encode_error(slide_index, e));
        }

        let result = self.encode(image, &silence, workspace, cancel);
        discard(&silence.path);
        result
    }
}

fn encode_error(slide: usize, e: ToolError) -> Error {
    match e {
        ToolError::Cancelled => Error::Cancelled,
        source => Error::Encode { slide, source },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Codec writing marker files; stage two optionally fails after writing a
    /// partial output.
    struct MarkerCodec {
        fail_remux: bool,
    }

    impl CodecTool for MarkerCodec {
        fn mux_still(
            &self,
            _image: &Path,
            _audio: &Path,
            output: &Path,
            _cancel: &CancelToken,
        ) -> std::result::Result<(), ToolError> {
            std::fs::write(output, b"mp4")?;
            Ok(())
        }

        fn remux_to_ts(
            &self,
            _input: &Path,
            output: &Path,
            _cancel: &CancelToken,
        ) -> std::result::Result<(), ToolError> {
            std::fs::write(output, b"ts")?;
            if self.fail_remux {
                return Err(ToolError::Failed {
                    tool: "ffmpeg".into(),
                    code: Some(1),
                    stderr: "Invalid data found when processing input".into(),
                });
            }
            Ok(())
        }

        fn concat_ts(
            &self,
            _segments: &[PathBuf],
            _output: &Path,
            _cancel: &CancelToken,
        ) -> std::result::Result<(), ToolError> {
            unreachable!("not used by the encoder")
        }

        fn silent_audio(
            &self,
            _seconds: f64,
            output: &Path,
            _cancel: &CancelToken,
        ) -> std::result::Result<(), ToolError> {
            std::fs::write(output, b"wav")?;
            Ok(())
        }
    }

    fn setup() -> (tempfile::TempDir, Workspace, AudioArtifact) {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::create_in(root.path()).unwrap();
        let audio = AudioArtifact {
            slide_index: 4,
            path: ws.audio_path(4, "mp3"),
        };
        std::fs::write(&audio.path, b"mp3").unwrap();
        (root, ws, audio)
    }

    #[test]
    fn test_encode_keeps_only_segment() {
        let (_root, ws, audio) = setup();
        let codec = MarkerCodec { fail_remux: false };

        let segment = SegmentEncoder::new(&codec)
            .encode(Path::new("page-5.jpg"), &audio, &ws, &CancelToken::new())
            .unwrap();

        assert_eq!(segment.slide_index, 4);
        assert_eq!(segment.path, ws.segment_path(4));
        assert!(segment.path.exists());
        assert!(!ws.mux_path(4).exists());
    }

    #[test]
    fn test_stage_two_failure_invalidates_segment() {
        let (_root, ws, audio) = setup();
        let codec = MarkerCodec { fail_remux: true };

        let err = SegmentEncoder::new(&codec)
            .encode(Path::new("page-5.jpg"), &audio, &ws, &CancelToken::new())
            .unwrap_err();

        assert!(matches!(err, Error::Encode { slide: 4, .. }));
        assert!(!ws.mux_path(4).exists());
        assert!(!ws.segment_path(4).exists());
    }

    #[test]
    fn test_encode_silent_cleans_placeholder_audio() {
        let (_root, ws, _audio) = setup();
        let codec = MarkerCodec { fail_remux: false };

        let segment = SegmentEncoder::new(&codec)
            .encode_silent(1, Path::new("page-2.jpg"), 2.0, &ws, &CancelToken::new())
            .unwrap();

        assert_eq!(segment.slide_index, 1);
        assert!(segment.path.exists());
        assert!(!ws.silence_path(1).exists());
    }

    #[test]
    fn test_cancelled_tool_maps_to_cancelled() {
        assert!(encode_error(0, ToolError::Cancelled).is_cancelled());
        assert_eq!(
            encode_error(
                2,
                ToolError::MissingOutput {
                    tool: "ffmpeg".into(),
                    path: PathBuf::from("x.ts")
                }
            )
            .slide(),
            Some(2)
        );
    }
}
