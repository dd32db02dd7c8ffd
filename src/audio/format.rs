//! 链路格式信息模块
//!
//! 定义样本表示和配置完成时协商得到的链路属性。

use crate::error::{self, AudioResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 链路上的样本表示
///
/// SDR阶段只接受两种平面浮点表示，其余取值仅用于在协商阶段给出明确的拒绝原因。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// 32位浮点平面格式
    F32Planar,
    /// 64位浮点平面格式
    F64Planar,
    /// 16位整数交错格式
    S16,
    /// 32位整数交错格式
    S32,
    /// 32位浮点交错格式
    F32,
}

impl SampleFormat {
    /// 是否为平面格式
    pub fn is_planar(&self) -> bool {
        matches!(self, SampleFormat::F32Planar | SampleFormat::F64Planar)
    }

    /// SDR阶段是否支持该表示
    pub fn is_supported(&self) -> bool {
        self.is_planar()
    }

    /// 短名称（日志与报告使用）
    pub fn name(&self) -> &'static str {
        match self {
            SampleFormat::F32Planar => "fltp",
            SampleFormat::F64Planar => "dblp",
            SampleFormat::S16 => "s16",
            SampleFormat::S32 => "s32",
            SampleFormat::F32 => "flt",
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 输出链路配置完成时协商得到的属性
///
/// 一旦传给 `SdrStage::configure` 即不可再修改。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkProperties {
    pub channels: usize,
    pub sample_rate: u32,
    pub format: SampleFormat,
}

impl LinkProperties {
    pub fn new(channels: usize, sample_rate: u32, format: SampleFormat) -> Self {
        Self {
            channels,
            sample_rate,
            format,
        }
    }

    /// 验证属性是否可用于SDR测量
    pub fn validate(&self) -> AudioResult<()> {
        if self.channels == 0 {
            return Err(error::format_error("声道数不能为0", self.channels));
        }
        if !self.format.is_supported() {
            return Err(error::format_error(
                "不支持的样本格式",
                format!("{}（仅支持 fltp / dblp）", self.format),
            ));
        }
        Ok(())
    }
}
