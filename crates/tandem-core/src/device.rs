//! 運算裝置選擇
//!
//! 裝置屬於設定：在建立處理器或模型時解析一次，
//! 之後一路傳遞，不再重新查詢。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 波形與模型所在的運算裝置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    /// 通用處理器
    Cpu,
    /// 依序號指定的 CUDA 加速器
    Cuda(usize),
    /// Apple Metal 加速器
    Metal,
}

impl Device {
    /// 此建置可用的加速器（若有）
    pub fn accelerator() -> Option<Device> {
        if cfg!(feature = "cuda") {
            Some(Device::Cuda(0))
        } else if cfg!(all(feature = "metal", target_os = "macos")) {
            Some(Device::Metal)
        } else {
            None
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(ordinal) => write!(f, "cuda:{}", ordinal),
            Device::Metal => write!(f, "metal"),
        }
    }
}

/// 設定提供的裝置偏好
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevicePreference {
    /// 有加速器則使用，否則用 CPU
    #[default]
    Auto,
    /// 明確指定
    Explicit(Device),
}

impl DevicePreference {
    /// 解析為實際裝置
    pub fn resolve(self) -> Device {
        match self {
            DevicePreference::Explicit(device) => device,
            DevicePreference::Auto => Device::accelerator().unwrap_or(Device::Cpu),
        }
    }
}

impl FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "auto" => Ok(DevicePreference::Auto),
            "cpu" => Ok(DevicePreference::Explicit(Device::Cpu)),
            "metal" | "mps" => Ok(DevicePreference::Explicit(Device::Metal)),
            "cuda" => Ok(DevicePreference::Explicit(Device::Cuda(0))),
            other => match other.strip_prefix("cuda:") {
                Some(ordinal) => ordinal
                    .parse()
                    .map(|n| DevicePreference::Explicit(Device::Cuda(n)))
                    .map_err(|_| format!("invalid CUDA ordinal: {}", ordinal)),
                None => Err(format!("unknown device: {}", other)),
            },
        }
    }
}
