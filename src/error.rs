//! 统一错误处理框架
//!
//! SDR测量阶段与CLI前端共用的错误类型定义。

use std::fmt;
use std::io;
use thiserror::Error;

/// 音频处理相关的统一错误类型
#[derive(Debug, Error)]
pub enum AudioError {
    /// 输入验证错误（参数、声道数等）
    #[error("输入验证失败: {0}")]
    InvalidInput(String),

    /// 文件I/O错误
    #[error("文件I/O错误: {0}")]
    IoError(#[from] io::Error),

    /// 音频格式错误（包括不支持的样本表示）
    #[error("音频格式错误: {0}")]
    FormatError(String),

    /// 解码错误
    #[error("音频解码失败: {0}")]
    DecodingError(String),

    /// 输入链路取样失败（单步致命，不重试）
    #[error("输入流错误: {0}")]
    StreamError(String),

    /// 计算异常
    #[error("计算异常: {0}")]
    CalculationError(String),

    /// 累加器分配失败
    #[error("内存不足")]
    OutOfMemory,

    /// 资源访问错误（线程池、通道等）
    #[error("资源访问错误: {0}")]
    ResourceError(String),
}

impl From<hound::Error> for AudioError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => AudioError::IoError(e),
            other => AudioError::DecodingError(format!("WAV解码错误: {other}")),
        }
    }
}

impl From<std::collections::TryReserveError> for AudioError {
    fn from(_: std::collections::TryReserveError) -> Self {
        AudioError::OutOfMemory
    }
}

/// 音频处理操作的标准Result类型
pub type AudioResult<T> = Result<T, AudioError>;

// ==================== 错误转换Helper函数 ====================

/// 创建格式错误的helper函数
#[inline]
pub fn format_error<E: fmt::Display>(context: &str, err: E) -> AudioError {
    AudioError::FormatError(format!("{context}: {err}"))
}

/// 创建输入流错误的helper函数
#[inline]
pub fn stream_error<E: fmt::Display>(context: &str, err: E) -> AudioError {
    AudioError::StreamError(format!("{context}: {err}"))
}

/// 创建计算错误的helper函数
#[inline]
pub fn calculation_error<E: fmt::Display>(context: &str, err: E) -> AudioError {
    AudioError::CalculationError(format!("{context}: {err}"))
}

// ==================== 错误分类系统 ====================

/// 错误类别枚举（CLI据此选择退出码和建议）
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum ErrorCategory {
    /// 格式相关错误（不支持的样本格式、声道不匹配等）
    Format,
    /// 解码相关错误
    Decoding,
    /// I/O相关错误
    Io,
    /// 计算相关错误（数值异常、内存不足等）
    Calculation,
    /// 链路/资源错误
    Stream,
    /// 其他未分类错误
    Other,
}

impl ErrorCategory {
    /// 从AudioError提取错误类别
    pub fn from_audio_error(e: &AudioError) -> Self {
        match e {
            AudioError::FormatError(_) => Self::Format,
            AudioError::DecodingError(_) => Self::Decoding,
            AudioError::IoError(_) => Self::Io,
            AudioError::CalculationError(_) | AudioError::OutOfMemory => Self::Calculation,
            AudioError::StreamError(_) | AudioError::ResourceError(_) => Self::Stream,
            AudioError::InvalidInput(_) => Self::Other,
        }
    }

    /// 获取错误类别的显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Format => "格式错误",
            Self::Decoding => "解码错误",
            Self::Io => "I/O错误",
            Self::Calculation => "计算错误",
            Self::Stream => "链路错误",
            Self::Other => "其他错误",
        }
    }
}
