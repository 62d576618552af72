//! 將音訊解碼為統一波形
//!
//! 不論容器或編碼，輸出一律為單聲道、範圍 [-1, 1] 的 f32，
//! 並重新取樣至設定的取樣率。預設交由外部 `ffmpeg` 行程解碼；
//! 原生後端則在行程內解碼。

use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use hound::WavReader;
use serde::{Deserialize, Serialize};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info, warn};

use crate::audio::{AudioError, SampleRate, Waveform};
use crate::AudioInfo;

/// tandem 所有模型預期的取樣率
pub const DEFAULT_SAMPLE_RATE: u32 = 16000;

/// 有號 16 位元 PCM 的縮放係數
const PCM16_SCALE: f32 = 32768.0;

/// 重新取樣的區塊大小（幀）
const RESAMPLE_CHUNK: usize = 1024;

/// 解碼方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecoderBackend {
    /// 外部 ffmpeg 子行程
    #[default]
    Ffmpeg,
    /// 行程內以 hound/symphonia 解碼，rubato 重新取樣
    Native,
}

/// 載入器設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// 目標取樣率（Hz）
    pub sample_rate: u32,
    /// 解碼後端
    pub backend: DecoderBackend,
    /// ffmpeg 執行檔
    pub ffmpeg_path: PathBuf,
    /// 解碼執行緒數（0 = 由解碼器決定）
    pub threads: u32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            backend: DecoderBackend::Ffmpeg,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            threads: 0,
        }
    }
}

/// 音訊載入器：將音訊檔案解碼為波形
#[derive(Debug, Clone, Default)]
pub struct AudioLoader {
    config: LoaderConfig,
}

impl AudioLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// 載入音訊檔案，輸出設定取樣率的單聲道波形
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Waveform, AudioError> {
        let path = path.as_ref();
        let sample_rate = SampleRate::try_from(self.config.sample_rate)?;
        debug!("Loading {} with {:?}", path.display(), self.config.backend);

        let samples = match self.config.backend {
            DecoderBackend::Ffmpeg => self.decode_ffmpeg(path)?,
            DecoderBackend::Native => self.decode_native(path)?,
        };

        let waveform = Waveform::new(samples, sample_rate.get())?;
        info!(
            "Loaded {} ({:.2}s at {} Hz)",
            path.display(),
            waveform.duration(),
            waveform.sample_rate()
        );
        Ok(waveform)
    }

    /// 取得音訊資訊（不解碼）
    pub fn probe<P: AsRef<Path>>(&self, path: P) -> Result<AudioInfo, AudioError> {
        let path = path.as_ref();

        if extension_of(path).as_deref() == Some("wav") {
            let reader = WavReader::open(path)?;
            let spec = reader.spec();
            return Ok(AudioInfo {
                path: path.display().to_string(),
                duration: reader.duration() as f64 / spec.sample_rate as f64,
                sample_rate: spec.sample_rate,
                channels: spec.channels,
                bits_per_sample: spec.bits_per_sample,
            });
        }

        let format = open_symphonia(path)?;
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
            .ok_or_else(|| AudioError::Decode(format!("no audio track in {}", path.display())))?;

        let params = &track.codec_params;
        let sample_rate = params
            .sample_rate
            .ok_or_else(|| AudioError::Decode(format!("unknown sample rate in {}", path.display())))?;

        let duration = params
            .n_frames
            .map(|frames| frames as f64 / sample_rate as f64)
            .unwrap_or(0.0);

        Ok(AudioInfo {
            path: path.display().to_string(),
            duration,
            sample_rate,
            channels: params.channels.map(|c| c.count() as u16).unwrap_or(2),
            bits_per_sample: params.bits_per_sample.unwrap_or(16) as u16,
        })
    }

    /// 執行 ffmpeg 並讀回 s16le 單聲道 PCM
    fn decode_ffmpeg(&self, path: &Path) -> Result<Vec<f32>, AudioError> {
        let output = Command::new(&self.config.ffmpeg_path)
            .arg("-nostdin")
            .args(["-threads", &self.config.threads.to_string()])
            .arg("-i")
            .arg(path)
            .args(["-f", "s16le", "-acodec", "pcm_s16le", "-ac", "1"])
            .args(["-ar", &self.config.sample_rate.to_string()])
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    AudioError::Decode(format!(
                        "decoder not found: {}",
                        self.config.ffmpeg_path.display()
                    ))
                } else {
                    AudioError::Decode(format!("failed to start decoder: {}", e))
                }
            })?;

        if !output.status.success() {
            return Err(AudioError::Decode(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(pcm16_to_f32(&output.stdout))
    }

    fn decode_native(&self, path: &Path) -> Result<Vec<f32>, AudioError> {
        let (samples, sample_rate) = match extension_of(path).as_deref() {
            Some("wav") => read_wav(path)?,
            Some("mp3") | Some("m4a") | Some("aac") | Some("flac") | Some("ogg") => {
                read_symphonia(path)?
            }
            Some(ext) => {
                return Err(AudioError::Decode(format!("unsupported format: {}", ext)));
            }
            None => {
                return Err(AudioError::Decode(format!(
                    "unsupported format: {}",
                    path.display()
                )));
            }
        };

        if sample_rate == self.config.sample_rate {
            Ok(samples)
        } else {
            debug!("Resampling {} Hz -> {} Hz", sample_rate, self.config.sample_rate);
            resample(&samples, sample_rate, self.config.sample_rate)
        }
    }
}

/// 將小端序 i16 位元組轉為正規化的 f32 樣本
pub fn pcm16_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / PCM16_SCALE)
        .collect()
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

fn downmix(samples: Vec<f32>, channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples;
    }
    samples
        .chunks(channels)
        .map(|chunk| chunk.iter().sum::<f32>() / chunk.len() as f32)
        .collect()
}

fn read_wav(path: &Path) -> Result<(Vec<f32>, u32), AudioError> {
    let mut reader = WavReader::open(path)
        .map_err(|e| AudioError::Decode(format!("{}: {}", path.display(), e)))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| AudioError::Decode(e.to_string()))?
        }
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AudioError::Decode(e.to_string()))?,
    };

    Ok((downmix(samples, spec.channels as usize), spec.sample_rate))
}

fn open_symphonia(path: &Path) -> Result<Box<dyn FormatReader>, AudioError> {
    let file = File::open(path).map_err(|e| AudioError::Decode(format!("{}: {}", path.display(), e)))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AudioError::Decode(format!("cannot probe format: {}", e)))?;

    Ok(probed.format)
}

fn read_symphonia(path: &Path) -> Result<(Vec<f32>, u32), AudioError> {
    let mut format = open_symphonia(path)?;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::Decode(format!("no audio track in {}", path.display())))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| AudioError::Decode(format!("unknown sample rate in {}", path.display())))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::Decode(format!("cannot create decoder: {}", e)))?;

    let mut mono: Vec<f32> = Vec::new();

    loop {
        let packet = match next_step(format.next_packet())? {
            PacketStep::Packet(p) => p,
            PacketStep::End => break,
            PacketStep::Reset => {
                debug!("Decoder reset requested for {}", path.display());
                decoder.reset();
                continue;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                warn!("Skipping corrupt packet: {}", e);
                continue;
            }
            Err(e) => return Err(AudioError::Decode(e.to_string())),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count();

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        mono.extend(downmix(sample_buf.samples().to_vec(), channels));
    }

    Ok((mono, sample_rate))
}

enum PacketStep {
    Packet(Packet),
    End,
    Reset,
}

/// 分類 `next_packet` 結果；只有正常的串流結尾會停止解碼
fn next_step(result: symphonia::core::errors::Result<Packet>) -> Result<PacketStep, AudioError> {
    use symphonia::core::errors::Error;

    match result {
        Ok(packet) => Ok(PacketStep::Packet(packet)),
        Err(Error::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => Ok(PacketStep::End),
        Err(Error::ResetRequired) => Ok(PacketStep::Reset),
        Err(e) => Err(AudioError::Decode(e.to_string())),
    }
}

fn resample_failed(e: impl std::fmt::Display) -> AudioError {
    AudioError::Decode(format!("resampling failed: {}", e))
}

/// 單聲道訊號的 FFT 重新取樣
///
/// 輸出長度為 `round(len * to / from)`；會去除重新取樣器的延遲，
/// 使輸出與輸入對齊。
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, AudioError> {
    use rubato::{FftFixedInOut, Resampler};

    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let mut resampler =
        FftFixedInOut::<f32>::new(from_rate as usize, to_rate as usize, RESAMPLE_CHUNK, 1)
            .map_err(resample_failed)?;

    let chunk_size = resampler.input_frames_next();
    let delay = resampler.output_delay();
    let expected = (samples.len() as f64 * to_rate as f64 / from_rate as f64).round() as usize;

    let mut output = Vec::with_capacity(expected + delay + resampler.output_frames_next());
    let mut position = 0;

    while output.len() < expected + delay {
        let mut frame = vec![0.0f32; chunk_size];
        if position < samples.len() {
            let n = chunk_size.min(samples.len() - position);
            frame[..n].copy_from_slice(&samples[position..position + n]);
        }
        position += chunk_size;

        let result = resampler
            .process(&[frame], None)
            .map_err(resample_failed)?;
        output.extend_from_slice(&result[0]);
    }

    output.drain(..delay);
    output.truncate(expected);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_sine(path: &Path, sample_rate: u32, channels: u16, seconds: f32) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let frames = (sample_rate as f32 * seconds) as usize;
        for i in 0..frames {
            let t = i as f32 / sample_rate as f32;
            let value = ((t * 440.0 * std::f32::consts::TAU).sin() * 16000.0) as i16;
            for _ in 0..channels {
                writer.write_sample(value).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    fn native_loader() -> AudioLoader {
        AudioLoader::new(LoaderConfig {
            backend: DecoderBackend::Native,
            ..LoaderConfig::default()
        })
    }

    fn ffmpeg_available() -> bool {
        Command::new("ffmpeg")
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    #[test]
    fn test_pcm16_scaling() {
        let bytes = [0x00, 0x80, 0x00, 0x00, 0xff, 0x7f, 0x00, 0x40];
        let samples = pcm16_to_f32(&bytes);
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0], -1.0);
        assert_eq!(samples[1], 0.0);
        assert!((samples[2] - 32767.0 / 32768.0).abs() < 1e-7);
        assert_eq!(samples[3], 0.5);
    }

    #[test]
    fn test_pcm16_ignores_trailing_byte() {
        assert_eq!(pcm16_to_f32(&[0x00, 0x40, 0x01]).len(), 1);
    }

    #[test]
    fn test_native_resamples_to_target_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_sine(&path, 44100, 1, 1.0);

        let waveform = native_loader().load(&path).unwrap();
        assert_eq!(waveform.sample_rate(), DEFAULT_SAMPLE_RATE);
        assert_eq!(waveform.len(), 16000);
        assert!(waveform.samples().iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn test_native_downmixes_stereo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_sine(&path, 16000, 2, 0.5);

        let waveform = native_loader().load(&path).unwrap();
        assert_eq!(waveform.len(), 8000);
    }

    #[test]
    fn test_native_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        let result = native_loader().load(&path);
        assert!(matches!(result, Err(AudioError::Decode(_))));
    }

    #[test]
    fn test_native_rejects_garbled_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.flac");
        std::fs::write(&path, b"fLaC\x00\x00\x00\x22not really a stream").unwrap();

        let result = native_loader().load(&path);
        assert!(matches!(result, Err(AudioError::Decode(_))));
    }

    #[test]
    fn test_read_failure_mid_stream_is_decode_error() {
        use symphonia::core::errors::Error;
        use std::io;

        let failure = Err(Error::IoError(io::Error::new(ErrorKind::Other, "disk gone")));
        assert!(matches!(next_step(failure), Err(AudioError::Decode(msg)) if msg.contains("disk gone")));

        let malformed = Err(Error::Unsupported("odd block"));
        assert!(matches!(next_step(malformed), Err(AudioError::Decode(_))));
    }

    #[test]
    fn test_end_and_reset_are_not_failures() {
        use symphonia::core::errors::Error;
        use std::io;

        let eof = Err(Error::IoError(io::Error::new(ErrorKind::UnexpectedEof, "end")));
        assert!(matches!(next_step(eof), Ok(PacketStep::End)));
        assert!(matches!(next_step(Err(Error::ResetRequired)), Ok(PacketStep::Reset)));

        let packet = Packet::new_from_slice(0, 0, 1, &[1, 2]);
        assert!(matches!(next_step(Ok(packet)), Ok(PacketStep::Packet(_))));
    }

    #[test]
    fn test_resampler_failure_is_decode_error() {
        let err = resample_failed("bad ratio");
        assert!(matches!(err, AudioError::Decode(msg) if msg == "resampling failed: bad ratio"));
    }

    #[test]
    fn test_probe_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_sine(&path, 22050, 2, 2.0);

        let info = AudioLoader::default().probe(&path).unwrap();
        assert_eq!(info.sample_rate, 22050);
        assert_eq!(info.channels, 2);
        assert!((info.duration - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_missing_decoder_is_decode_error() {
        let loader = AudioLoader::new(LoaderConfig {
            ffmpeg_path: PathBuf::from("/nonexistent/ffmpeg-binary"),
            ..LoaderConfig::default()
        });
        let result = loader.load("whatever.wav");
        assert!(matches!(result, Err(AudioError::Decode(msg)) if msg.contains("decoder not found")));
    }

    #[test]
    fn test_ffmpeg_resamples_to_target_rate() {
        if !ffmpeg_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_sine(&path, 22050, 1, 1.0);

        let waveform = AudioLoader::default().load(&path).unwrap();
        assert_eq!(waveform.sample_rate(), 16000);
        assert!((waveform.len() as i64 - 16000).abs() < 64);
    }

    #[test]
    fn test_ffmpeg_failure_carries_diagnostics() {
        if !ffmpeg_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.wav");

        let result = AudioLoader::default().load(&path);
        match result {
            Err(AudioError::Decode(msg)) => assert!(!msg.is_empty()),
            other => panic!("expected decode error, got {:?}", other.map(|w| w.len())),
        }
    }
}
