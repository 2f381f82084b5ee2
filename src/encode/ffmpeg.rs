use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use crate::session::FrameSink;

/// Audio muxed under the video, starting `offset` seconds in.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioInput {
    pub path: PathBuf,
    pub offset: f64,
}

#[derive(Clone, Debug)]
pub struct EncoderSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub codec: String,
    pub pix_fmt: String,
    pub crf: u32,
    pub bitrate: Option<String>,
}

pub struct FfmpegEncoder {
    child: Child,
}

fn ffmpeg_args(output_path: &Path, audio: Option<&AudioInput>, settings: &EncoderSettings) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-f".into(), "rawvideo".into(),
        "-pixel_format".into(), "rgba".into(),
        "-video_size".into(), format!("{}x{}", settings.width, settings.height),
        "-framerate".into(), settings.fps.to_string(),
        "-i".into(), "pipe:0".into(),
    ];

    if let Some(audio) = audio {
        if audio.offset > 0.0 {
            args.extend(["-itsoffset".to_string(), format!("{:.3}", audio.offset)]);
        }
        args.extend(["-i".to_string(), audio.path.to_string_lossy().into_owned()]);
    }

    args.extend([
        "-c:v".to_string(), settings.codec.clone(),
        "-pix_fmt".into(), settings.pix_fmt.clone(),
    ]);

    if let Some(ref br) = settings.bitrate {
        args.extend(["-b:v".to_string(), br.clone()]);
    } else {
        args.extend(["-crf".to_string(), settings.crf.to_string()]);
        args.extend(["-preset".to_string(), "medium".to_string()]);
    }

    if audio.is_some() {
        args.extend([
            "-c:a".into(), "aac".into(),
            "-b:a".into(), "192k".into(),
            "-shortest".into(),
        ]);
    } else {
        args.push("-an".into());
    }

    args.push(output_path.to_string_lossy().into_owned());
    args
}

impl FfmpegEncoder {
    pub fn new(output_path: &Path, audio: Option<&AudioInput>, settings: &EncoderSettings) -> Result<Self> {
        let args = ffmpeg_args(output_path, audio, settings);

        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn ffmpeg. Is ffmpeg installed?")?;

        log::info!(
            "FFmpeg encoder started: {}x{} @ {}fps, codec={}, audio={}",
            settings.width,
            settings.height,
            settings.fps,
            settings.codec,
            audio.map_or("none".to_string(), |a| a.path.display().to_string())
        );

        Ok(Self { child })
    }

    pub fn finish(mut self) -> Result<()> {
        // Close stdin to signal EOF
        drop(self.child.stdin.take());

        let output = self.child.wait_with_output().context("Failed to wait for ffmpeg")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("FFmpeg exited with error:\n{}", stderr);
        }

        log::info!("FFmpeg encoding complete");
        Ok(())
    }
}

impl FrameSink for FfmpegEncoder {
    fn write_frame(&mut self, rgba_pixels: &[u8]) -> Result<()> {
        let stdin = self.child.stdin.as_mut().context("FFmpeg stdin not available")?;
        stdin.write_all(rgba_pixels).context("Failed to write frame to ffmpeg")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> EncoderSettings {
        EncoderSettings {
            width: 640,
            height: 360,
            fps: 30,
            codec: "libx264".into(),
            pix_fmt: "yuv420p".into(),
            crf: 18,
            bitrate: None,
        }
    }

    #[test]
    fn video_only_disables_audio() {
        let args = ffmpeg_args(Path::new("out.mp4"), None, &settings());
        assert!(args.contains(&"-an".to_string()));
        assert_eq!(args.iter().filter(|a| *a == "-i").count(), 1);
        assert_eq!(args.last().unwrap(), "out.mp4");
    }

    #[test]
    fn delayed_audio_gets_offset() {
        let audio = AudioInput {
            path: PathBuf::from("audio/a.mp3"),
            offset: 1.5,
        };
        let args = ffmpeg_args(Path::new("out.mp4"), Some(&audio), &settings());
        let pos = args.iter().position(|a| a == "-itsoffset").unwrap();
        assert_eq!(args[pos + 1], "1.500");
        assert_eq!(args[pos + 2], "-i");
        assert_eq!(args[pos + 3], "audio/a.mp3");
        assert!(args.contains(&"-shortest".to_string()));
    }

    #[test]
    fn bitrate_replaces_crf() {
        let mut s = settings();
        s.bitrate = Some("5M".into());
        let args = ffmpeg_args(Path::new("out.mp4"), None, &s);
        assert!(args.contains(&"5M".to_string()));
        assert!(!args.contains(&"-crf".to_string()));
    }
}
