//! 图驱动器
//!
//! 把两个WAV帧源、两个输入队列、SDR阶段和输出收集器连成一个最小的处理图，
//! 并反复调度 `activate` 直到阶段终止。

use super::cli::AppConfig;
use super::constants::defaults;
use super::utils;
use crate::audio::{
    DecodedChunk, FrameCollector, FrameQueue, LinkProperties, LinkStatus, WavFrameSource, WavInfo,
};
use crate::error::{self, AudioError, AudioResult};
use crate::processing::{
    Activation, CollectingSink, DiagnosticSink, LogSink, RayonExecutor, SdrReport, SdrStage,
    StageOptions,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 一次完整测量的结果
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub reference: WavInfo,
    pub degraded: WavInfo,
    pub report: SdrReport,
    /// 拆除时输出的诊断行（每声道一行）
    pub diagnostics: Vec<String>,
    /// 转发到下游的样本数（每声道）
    pub forwarded_samples: u64,
    /// 调度步数
    pub steps: usize,
    pub elapsed: Duration,
}

/// 单图驱动器
pub struct GraphDriver {
    stage: SdrStage,
    queues: [FrameQueue; 2],
    sources: [WavFrameSource; 2],
    source_done: [bool; 2],
    delivered: [i64; 2],
    sink: FrameCollector,
    forwarded_samples: u64,
    steps: usize,
}

impl GraphDriver {
    /// 打开两个WAV文件并完成链路协商
    ///
    /// # 错误
    ///
    /// * `AudioError::FormatError` - 两个文件的声道数或采样率不一致
    /// * 其他打开/配置错误原样返回
    pub fn open(config: &AppConfig) -> AudioResult<Self> {
        let reference = WavFrameSource::spawn(
            &config.reference_path,
            config.precision,
            config.reference_chunk,
            defaults::SOURCE_CHANNEL_CAPACITY,
        )?;
        let degraded = WavFrameSource::spawn(
            &config.degraded_path,
            config.precision,
            config.degraded_chunk,
            defaults::SOURCE_CHANNEL_CAPACITY,
        )?;

        let (ref_info, deg_info) = (reference.info(), degraded.info());
        if ref_info.channels != deg_info.channels {
            return Err(error::format_error(
                "声道数不一致",
                format!("{}ch vs {}ch", ref_info.channels, deg_info.channels),
            ));
        }
        if ref_info.sample_rate != deg_info.sample_rate {
            return Err(error::format_error(
                "采样率不一致",
                format!("{}Hz vs {}Hz", ref_info.sample_rate, deg_info.sample_rate),
            ));
        }

        let executor = Arc::new(RayonExecutor::new(config.threads)?);
        let options = StageOptions {
            disabled: config.disabled,
            max_slices: None,
        };
        let mut stage = SdrStage::new(options, executor);
        stage.configure(LinkProperties::new(
            ref_info.channels,
            ref_info.sample_rate,
            config.precision,
        ))?;

        Ok(Self {
            stage,
            queues: [
                FrameQueue::new(utils::path::extract_filename_lossy(&ref_info.path)),
                FrameQueue::new(utils::path::extract_filename_lossy(&deg_info.path)),
            ],
            sources: [reference, degraded],
            source_done: [false; 2],
            delivered: [0; 2],
            sink: FrameCollector::new(),
            forwarded_samples: 0,
            steps: 0,
        })
    }

    pub fn stage(&self) -> &SdrStage {
        &self.stage
    }

    /// 时间线控制（禁用开关等）
    pub fn stage_mut(&mut self) -> &mut SdrStage {
        &mut self.stage
    }

    pub fn forwarded_samples(&self) -> u64 {
        self.forwarded_samples
    }

    /// 调度一步，并满足本步产生的输入请求
    pub fn step(&mut self) -> AudioResult<Activation> {
        let [input0, input1] = &mut self.queues;
        let activation = self.stage.activate([input0, input1], &mut self.sink)?;
        self.steps += 1;

        match &activation {
            Activation::Processed { .. } => {
                for frame in self.sink.take_frames() {
                    self.forwarded_samples += frame.nb_samples() as u64;
                }
            }
            Activation::InputRequested { input0, input1 } => {
                let mut progressed = false;
                for (index, requested) in [*input0, *input1].into_iter().enumerate() {
                    if requested {
                        progressed |= self.feed(index)?;
                    }
                }
                if !progressed {
                    return Err(AudioError::ResourceError(
                        "处理图停滞：请求的输入已无数据".to_string(),
                    ));
                }
            }
            Activation::NotReady => {
                return Err(AudioError::ResourceError(
                    "处理图停滞：下游没有需求".to_string(),
                ));
            }
            _ => {}
        }
        Ok(activation)
    }

    /// 从帧源取一块送入对应队列，返回是否有进展
    fn feed(&mut self, index: usize) -> AudioResult<bool> {
        if self.source_done[index] {
            return Ok(false);
        }

        match self.sources[index].next_chunk() {
            DecodedChunk::Samples(frame) => {
                self.delivered[index] += frame.nb_samples() as i64;
                self.queues[index].push_frame(frame)?;
            }
            DecodedChunk::EndOfStream { pts } => {
                log::debug!("input{index} EOF pts={pts}");
                self.queues[index].finish(LinkStatus::Eof, pts);
                self.source_done[index] = true;
            }
            DecodedChunk::Failed(e) => {
                log::warn!("input{index} 解码失败: {e}");
                self.queues[index].finish(LinkStatus::Error(e.to_string()), self.delivered[index]);
                self.source_done[index] = true;
            }
        }
        Ok(true)
    }

    /// 运行到阶段终止并拆除
    pub fn run(mut self) -> AudioResult<AnalysisOutput> {
        let started = Instant::now();

        loop {
            match self.step()? {
                Activation::StatusForwarded { .. }
                | Activation::OutputClosed { .. }
                | Activation::Finished => break,
                _ => {}
            }
        }

        let mut collected = CollectingSink::new();
        let report = self
            .stage
            .teardown(&mut collected)
            .ok_or_else(|| error::calculation_error("拆除", "阶段未配置，无报告"))?;

        let mut log_sink = LogSink;
        for line in collected.lines() {
            log_sink.emit(line);
        }

        log::debug!(
            "处理完成: {}步, 转发{}样本, 累积{}样本",
            self.steps,
            self.forwarded_samples,
            report.processed_samples
        );

        Ok(AnalysisOutput {
            reference: self.sources[0].info().clone(),
            degraded: self.sources[1].info().clone(),
            report,
            diagnostics: collected.lines().to_vec(),
            forwarded_samples: self.forwarded_samples,
            steps: self.steps,
            elapsed: started.elapsed(),
        })
    }
}

/// 打开、运行并拆除一个处理图
pub fn analyze_files(config: &AppConfig) -> AudioResult<AnalysisOutput> {
    GraphDriver::open(config)?.run()
}
