//! tandem-core - 音訊載入、切片與共用類型
//!
//! 提供 tandem 所有模型使用的統一波形表示
//! （單聲道、f32、固定取樣率），以及跨 crate 共用的結果類型。

pub mod audio;
pub mod device;
pub mod exporter;
pub mod loader;
pub mod types;

pub use audio::{AudioError, AudioProcessor, SampleRate, Waveform};
pub use device::{Device, DevicePreference};
pub use exporter::{ExportError, ExportFormat, Exporter};
pub use loader::{pcm16_to_f32, AudioLoader, DecoderBackend, LoaderConfig, DEFAULT_SAMPLE_RATE};
pub use types::*;
