//! 波形容器與依時間切片

use std::fmt;
use std::path::Path;

use hound::{WavSpec, WavWriter};
use thiserror::Error;
use tracing::debug;

use crate::device::{Device, DevicePreference};
use crate::loader::{AudioLoader, LoaderConfig};

/// 音訊處理錯誤
#[derive(Error, Debug)]
pub enum AudioError {
    /// 解碼器失敗或無法讀取輸入
    #[error("Failed to load audio: {0}")]
    Decode(String),

    /// 取樣率不是單一正整數
    #[error("Sample rate should be a single positive integer, got {0}")]
    InvalidSampleRate(String),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 已驗證的取樣率：恰好一個正整數
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleRate(u32);

impl SampleRate {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for SampleRate {
    type Error = AudioError;

    fn try_from(rate: u32) -> Result<Self, Self::Error> {
        if rate == 0 {
            return Err(AudioError::InvalidSampleRate("0".to_string()));
        }
        Ok(Self(rate))
    }
}

impl TryFrom<&[u32]> for SampleRate {
    type Error = AudioError;

    fn try_from(rates: &[u32]) -> Result<Self, Self::Error> {
        match rates {
            [rate] => SampleRate::try_from(*rate),
            _ => Err(AudioError::InvalidSampleRate(format!(
                "{} values {:?}",
                rates.len(),
                rates
            ))),
        }
    }
}

impl TryFrom<Vec<u32>> for SampleRate {
    type Error = AudioError;

    fn try_from(rates: Vec<u32>) -> Result<Self, Self::Error> {
        SampleRate::try_from(rates.as_slice())
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz", self.0)
    }
}

/// 單一取樣率的單聲道 f32 樣本，範圍 [-1.0, 1.0]
///
/// 建立後不可變；切片會複製成新的波形。
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: SampleRate,
}

impl Waveform {
    pub fn new<R>(samples: Vec<f32>, sample_rate: R) -> Result<Self, AudioError>
    where
        R: TryInto<SampleRate, Error = AudioError>,
    {
        Ok(Self {
            samples,
            sample_rate: sample_rate.try_into()?,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.get()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// 取得時長（秒）
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate() as f64
    }

    /// 複製 `[start, end)` 秒內的樣本
    ///
    /// 起始索引為 `floor(start * sr)`，結束索引為 `ceil(end * sr)`。
    /// 兩者皆限制在波形範圍內，結束點略超過最後一個樣本時
    /// 會截斷而非失敗。
    pub fn cut(&self, start: f64, end: f64) -> Waveform {
        let rate = self.sample_rate() as f64;
        let start_idx = clamp_index((start * rate).floor(), self.samples.len());
        let end_idx = clamp_index((end * rate).ceil(), self.samples.len());

        let samples = if start_idx < end_idx {
            self.samples[start_idx..end_idx].to_vec()
        } else {
            Vec::new()
        };

        Waveform {
            samples,
            sample_rate: self.sample_rate,
        }
    }

    /// 寫入單聲道 WAV 檔案
    pub fn save_wav<P: AsRef<Path>>(&self, path: P, bits_per_sample: u16) -> Result<(), AudioError> {
        let path = path.as_ref();
        if !matches!(bits_per_sample, 16 | 24 | 32) {
            return Err(AudioError::Wav(hound::Error::Unsupported));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let spec = WavSpec {
            channels: 1,
            sample_rate: self.sample_rate(),
            bits_per_sample,
            sample_format: if bits_per_sample == 32 {
                hound::SampleFormat::Float
            } else {
                hound::SampleFormat::Int
            },
        };

        let mut writer = WavWriter::create(path, spec)?;

        match spec.sample_format {
            hound::SampleFormat::Float => {
                for &sample in &self.samples {
                    writer.write_sample(sample)?;
                }
            }
            hound::SampleFormat::Int => {
                let max_val = (1i64 << (bits_per_sample - 1)) as f32;
                for &sample in &self.samples {
                    let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
                    writer.write_sample(int_sample)?;
                }
            }
        }

        writer.finalize()?;
        Ok(())
    }
}

fn clamp_index(position: f64, len: usize) -> usize {
    if position.is_nan() || position <= 0.0 {
        0
    } else if position >= len as f64 {
        len
    } else {
        position as usize
    }
}

/// 音訊處理器：持有一段放在運算裝置上的波形
pub struct AudioProcessor {
    waveform: Waveform,
    device: Device,
}

impl AudioProcessor {
    /// 由原始樣本建立，並驗證取樣率
    ///
    /// `sample_rate` 可為 `u32` 或取樣率的 slice/vec；除恰好一個正取樣率外，
    /// 其餘皆回傳 [`AudioError::InvalidSampleRate`]。
    pub fn new<R>(samples: Vec<f32>, sample_rate: R, device: DevicePreference) -> Result<Self, AudioError>
    where
        R: TryInto<SampleRate, Error = AudioError>,
    {
        let waveform = Waveform::new(samples, sample_rate)?;
        Ok(Self::from_waveform(waveform, device))
    }

    /// 包裝已驗證的波形
    pub fn from_waveform(waveform: Waveform, device: DevicePreference) -> Self {
        let device = device.resolve();
        debug!("Placing {} samples on {}", waveform.len(), device);
        Self { waveform, device }
    }

    /// 解碼音訊檔案並包裝結果
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        config: &LoaderConfig,
        device: DevicePreference,
    ) -> Result<Self, AudioError> {
        let waveform = AudioLoader::new(config.clone()).load(path)?;
        Ok(Self::from_waveform(waveform, device))
    }

    pub fn waveform(&self) -> &Waveform {
        &self.waveform
    }

    pub fn sample_rate(&self) -> u32 {
        self.waveform.sample_rate()
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn duration(&self) -> f64 {
        self.waveform.duration()
    }

    pub fn len(&self) -> usize {
        self.waveform.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waveform.is_empty()
    }

    /// 切出 `[start, end)` 秒，參見 [`Waveform::cut`]
    pub fn cut(&self, start: f64, end: f64) -> Waveform {
        self.waveform.cut(start, end)
    }
}

impl fmt::Display for AudioProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioProcessor(waveform={}, sr={})",
            self.waveform.len(),
            self.sample_rate()
        )
    }
}
