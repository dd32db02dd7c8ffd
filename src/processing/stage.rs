//! SDR阶段（生命周期管理）
//!
//! 负责配置完成时的格式校验与累加器分配、运行期状态持有，
//! 以及拆除时的最终SDR报告。逐步的同步/归约逻辑见 `synchronizer` 模块。

use super::diagnostics::DiagnosticSink;
use super::executor::SliceExecutor;
use super::reduction::{ParallelReducer, ReductionKernel};
use crate::audio::{ChunkSizeStats, LinkProperties, LinkStatus, SampleFormat};
use crate::core::{SdrAccumulator, SdrResult};
use crate::error::{AudioError, AudioResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 阶段选项（图配置参数）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageOptions {
    /// 管理性禁用：只透传参考块，不做累积
    #[serde(default)]
    pub disabled: bool,

    /// 切片数上限（为空时由执行器的工作单元数决定）
    #[serde(default)]
    pub max_slices: Option<usize>,
}

/// 最终报告
#[derive(Debug, Clone, Serialize)]
pub struct SdrReport {
    pub sample_format: SampleFormat,
    pub sample_rate: u32,
    /// 参与累积的样本数（每声道）
    pub processed_samples: u64,
    /// 禁用状态下直接透传的块数
    pub bypassed_chunks: usize,
    pub chunk_stats: ChunkSizeStats,
    pub channels: Vec<SdrResult>,
    /// 终止状态描述（未终止时为空）
    pub terminal_status: Option<String>,
}

/// 配置完成后才存在的运行期状态
pub(super) struct Configured {
    pub(super) properties: LinkProperties,
    pub(super) reducer: ParallelReducer,
    pub(super) accumulator: SdrAccumulator,
}

/// SDR测量阶段
///
/// 两个输入（参考、失真），一个输出（原样转发参考块）。
/// 由外部调度器反复调用 [`SdrStage::activate`] 驱动，调用之间不会重叠。
pub struct SdrStage {
    pub(super) options: StageOptions,
    pub(super) executor: Arc<dyn SliceExecutor>,
    pub(super) configured: Option<Configured>,
    pub(super) disabled: bool,
    pub(super) terminal: Option<(LinkStatus, i64)>,
    pub(super) chunk_stats: ChunkSizeStats,
    pub(super) accumulated_samples: u64,
    pub(super) bypassed_chunks: usize,
}

impl SdrStage {
    pub fn new(options: StageOptions, executor: Arc<dyn SliceExecutor>) -> Self {
        let disabled = options.disabled;
        Self {
            options,
            executor,
            configured: None,
            disabled,
            terminal: None,
            chunk_stats: ChunkSizeStats::new(),
            accumulated_samples: 0,
            bypassed_chunks: 0,
        }
    }

    /// 输出链路配置完成：校验样本表示并分配累加器
    ///
    /// # 错误
    ///
    /// * `AudioError::FormatError` - 样本表示不受支持或声道数无效
    /// * `AudioError::OutOfMemory` - 累加器分配失败
    /// * `AudioError::InvalidInput` - 重复配置
    pub fn configure(&mut self, properties: LinkProperties) -> AudioResult<()> {
        if self.configured.is_some() {
            return Err(AudioError::InvalidInput(
                "阶段配置只能完成一次".to_string(),
            ));
        }

        properties.validate()?;
        let kernel = ReductionKernel::for_format(properties.format)?;
        let accumulator = SdrAccumulator::try_new(properties.channels)?;
        let reducer = ParallelReducer::new(kernel, Arc::clone(&self.executor), self.options.max_slices);

        log::debug!(
            "SDR阶段配置完成: {}ch, {}Hz, {}, 切片数={}",
            properties.channels,
            properties.sample_rate,
            properties.format,
            reducer.nb_slices(properties.channels)
        );

        self.configured = Some(Configured {
            properties,
            reducer,
            accumulator,
        });
        Ok(())
    }

    #[inline]
    pub fn is_configured(&self) -> bool {
        self.configured.is_some()
    }

    pub fn properties(&self) -> Option<&LinkProperties> {
        self.configured.as_ref().map(|c| &c.properties)
    }

    /// 时间线开关：切换管理性禁用状态（下一步生效）
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    #[inline]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// 当前累加器（未配置或已拆除时为空）
    pub fn accumulator(&self) -> Option<&SdrAccumulator> {
        self.configured.as_ref().map(|c| &c.accumulator)
    }

    /// 参与累积的样本数（每声道）
    pub fn processed_samples(&self) -> u64 {
        self.accumulated_samples
    }

    /// 是否已向下游传播终止状态
    pub fn is_finished(&self) -> bool {
        self.terminal.is_some()
    }

    /// 当前的每声道SDR
    pub fn results(&self) -> Vec<SdrResult> {
        self.accumulator()
            .map(SdrAccumulator::results)
            .unwrap_or_default()
    }

    /// 当前状态的报告快照
    pub fn report(&self) -> Option<SdrReport> {
        let configured = self.configured.as_ref()?;
        Some(SdrReport {
            sample_format: configured.properties.format,
            sample_rate: configured.properties.sample_rate,
            processed_samples: self.accumulated_samples,
            bypassed_chunks: self.bypassed_chunks,
            chunk_stats: self.chunk_stats.snapshot(),
            channels: configured.accumulator.results(),
            terminal_status: self.terminal.as_ref().map(|(s, _)| s.to_string()),
        })
    }

    /// 拆除：输出每声道SDR并释放累加器
    ///
    /// 未配置的阶段不输出任何内容并返回 `None`。
    pub fn teardown(&mut self, sink: &mut dyn DiagnosticSink) -> Option<SdrReport> {
        let report = self.report();
        if let Some(report) = &report {
            for result in &report.channels {
                sink.emit(&result.diagnostic_line());
            }
        }

        self.configured = None;
        report
    }
}
