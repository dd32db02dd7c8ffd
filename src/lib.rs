//! MacinMeter SDR Tool
//!
//! 音频信噪失真比（Signal-to-Distortion Ratio）测量阶段。
//! 同时接收参考信号和失真信号两路对齐的多声道流，在整个流生命周期内
//! 按声道累积 Σu² 与 Σ(u−v)²，拆除时报告 SDR = 20·log₁₀(Σu² / Σ(u−v)²)。
//!
//! ## 核心特性
//! - 双流同步：按两路排队样本数的最小值取出等长对齐块
//! - 终止状态传播：任一输入EOF/错误在其队列排空后立即向下游传播
//! - 声道切片并行归约：切片互不重叠，累加器无锁写入
//! - 支持 32位 / 64位 平面浮点样本，累积统一使用 f64
//! - 元数据阶段：参考块原样转发，从不修改样本

pub mod audio;
pub mod core;
pub mod error;
pub mod processing;
pub mod tools;

// 重新导出核心类型
pub use audio::{AudioFrame, FrameCollector, FrameQueue, LinkProperties, LinkStatus, SampleFormat};
pub use core::{SdrAccumulator, SdrResult};
pub use error::{AudioError, AudioResult};
pub use processing::{Activation, SdrReport, SdrStage, StageOptions};
