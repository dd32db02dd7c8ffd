//! 阶段处理模块
//!
//! 双流同步器、并行归约引擎和生命周期管理。
//!
//! ## 执行模型
//! - **同步器**：单线程协作式驱动，每次 `activate` 只推进一步
//! - **归约**：每步内按声道切片 fan-out 到执行器，全部完成后才转发
//! - **累加器**：各切片独占互不重叠的声道范围，无需加锁

pub mod diagnostics;
pub mod executor;
pub mod reduction;
pub mod stage;
pub mod synchronizer;

// 重新导出公共接口
pub use diagnostics::{CollectingSink, DiagnosticSink, LogSink};
pub use executor::{RayonExecutor, SerialExecutor, SliceExecutor, SliceJob};
pub use reduction::{ParallelReducer, ReductionKernel, channel_sums, reduce_slice};
pub use stage::{SdrReport, SdrStage, StageOptions};
pub use synchronizer::Activation;
