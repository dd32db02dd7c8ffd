//! 双流同步器
//!
//! 每次 `activate` 调用只做以下三件事之一：
//!
//! 1. **终止/反向关闭**：阶段已终止则直接返回；下游已关闭则关闭两个输入
//! 2. **处理**：`available = min(queued0, queued1) > 0` 时，以相同的上下界从两个输入
//!    各取出恰好 `available` 个样本，归约后释放失真块、转发参考块
//! 3. **排空或请求**：无可用样本时，按 input0、input1 顺序检查终止状态并传播第一个；
//!    否则在下游有需求时向空队列的输入请求数据
//!
//! 驱动循环属于外部调度器，本模块只实现单步状态机。

use super::stage::SdrStage;
use crate::audio::{AudioFrame, InputPort, LinkStatus, OutputPort};
use crate::error::{self, AudioError, AudioResult};

#[cfg(debug_assertions)]
macro_rules! debug_sync {
    ($($arg:tt)*) => {
        log::trace!(target: "asdr::sync", $($arg)*)
    };
}

#[cfg(not(debug_assertions))]
macro_rules! debug_sync {
    ($($arg:tt)*) => {{
        let _ = format_args!($($arg)*);
    }};
}

/// 单步执行结果
#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    /// 处理并转发了一个对齐块
    Processed { samples: usize },
    /// 向下游传播了输入的终止状态
    StatusForwarded { status: LinkStatus, pts: i64 },
    /// 下游已关闭，两个输入被反向关闭
    OutputClosed { status: LinkStatus, pts: i64 },
    /// 暂无进展，已向空队列的输入请求数据
    InputRequested { input0: bool, input1: bool },
    /// 无可用数据且下游没有需求
    NotReady,
    /// 阶段已终止
    Finished,
}

impl Activation {
    /// 本步是否推进了状态
    pub fn made_progress(&self) -> bool {
        matches!(
            self,
            Activation::Processed { .. }
                | Activation::StatusForwarded { .. }
                | Activation::OutputClosed { .. }
        )
    }
}

impl SdrStage {
    /// 执行一步同步/归约
    ///
    /// * `inputs` - `[参考, 失真]`
    /// * `output` - 参考块的转发目标
    ///
    /// # 错误
    ///
    /// * `AudioError::InvalidInput` - 阶段尚未配置
    /// * `AudioError::StreamError` - 任一输入取样失败（已取出的块被释放，不重试）
    /// * `AudioError::FormatError` - 取出的块与协商格式不一致
    /// * 转发失败时原样返回下游错误；此时该块已计入累加器和统计
    pub fn activate(
        &mut self,
        mut inputs: [&mut dyn InputPort; 2],
        output: &mut dyn OutputPort,
    ) -> AudioResult<Activation> {
        if self.configured.is_none() {
            return Err(AudioError::InvalidInput("SDR阶段尚未配置".to_string()));
        }

        // 1. 终止状态
        if self.terminal.is_some() {
            return Ok(Activation::Finished);
        }
        if let Some((status, pts)) = output.closed_status() {
            debug_sync!("下游已关闭({status})，反向关闭输入");
            for input in inputs.iter_mut() {
                input.close(status.clone(), pts);
            }
            self.terminal = Some((status.clone(), pts));
            return Ok(Activation::OutputClosed { status, pts });
        }

        // 2. 处理
        let available = inputs[0].queued_samples().min(inputs[1].queued_samples());
        if available > 0 {
            return self.process_available(available, inputs, output);
        }

        // 3. 排空或请求
        for (index, input) in inputs.iter_mut().enumerate() {
            if let Some((status, pts)) = input.acknowledge_status() {
                debug_sync!("input{index} 终止({status}) pts={pts}，向下游传播");
                output.set_status(status.clone(), pts);
                self.terminal = Some((status.clone(), pts));
                return Ok(Activation::StatusForwarded { status, pts });
            }
        }

        if output.frame_wanted() {
            let mut requested = [false; 2];
            for (flag, input) in requested.iter_mut().zip(inputs.iter_mut()) {
                if input.queued_samples() == 0 {
                    input.request_frame();
                    *flag = true;
                }
            }
            debug_sync!("请求数据: input0={} input1={}", requested[0], requested[1]);
            return Ok(Activation::InputRequested {
                input0: requested[0],
                input1: requested[1],
            });
        }

        Ok(Activation::NotReady)
    }

    fn process_available(
        &mut self,
        available: usize,
        inputs: [&mut dyn InputPort; 2],
        output: &mut dyn OutputPort,
    ) -> AudioResult<Activation> {
        let [input0, input1] = inputs;

        // 两个输入使用完全相同的上下界，保证取出的块等长；
        // 失败时已取出的块随作用域一起释放
        let reference = input0.consume_samples(available, available)?;
        let degraded = input1.consume_samples(available, available)?;

        self.check_chunk_pair(available, &reference, &degraded)?;

        if self.disabled {
            self.bypassed_chunks += 1;
            debug_sync!("禁用状态，透传 {available} 样本");
        } else if let Some(configured) = self.configured.as_mut() {
            let slices = configured
                .reducer
                .reduce(&reference, &degraded, &mut configured.accumulator)?;
            self.accumulated_samples += available as u64;
            debug_sync!("归约 {available} 样本，切片数={slices}");
        }

        drop(degraded);
        self.chunk_stats.add_chunk(available);
        output.forward(reference)?;

        Ok(Activation::Processed { samples: available })
    }

    fn check_chunk_pair(
        &self,
        available: usize,
        reference: &AudioFrame,
        degraded: &AudioFrame,
    ) -> AudioResult<()> {
        for (name, frame) in [("input0", reference), ("input1", degraded)] {
            if frame.nb_samples() != available {
                return Err(error::stream_error(
                    name,
                    format!("取出{}样本，期望{available}", frame.nb_samples()),
                ));
            }
        }

        let Some(props) = self.properties() else {
            return Err(AudioError::InvalidInput("SDR阶段尚未配置".to_string()));
        };
        for (name, frame) in [("input0", reference), ("input1", degraded)] {
            if frame.channels() != props.channels || frame.format() != props.format {
                return Err(error::format_error(
                    name,
                    format!(
                        "块布局{}ch/{}与协商的{}ch/{}不一致",
                        frame.channels(),
                        frame.format(),
                        props.channels,
                        props.format
                    ),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{FrameCollector, FrameQueue, LinkProperties, SampleFormat};
    use crate::processing::executor::SerialExecutor;
    use crate::processing::stage::StageOptions;
    use std::sync::Arc;

    fn configured_stage(channels: usize) -> SdrStage {
        let mut stage = SdrStage::new(StageOptions::default(), Arc::new(SerialExecutor));
        stage
            .configure(LinkProperties::new(channels, 48000, SampleFormat::F32Planar))
            .unwrap();
        stage
    }

    fn frame(pts: i64, planes: Vec<Vec<f32>>) -> AudioFrame {
        AudioFrame::from_planes(pts, planes).unwrap()
    }

    #[test]
    fn test_unconfigured_stage_errors() {
        let mut stage = SdrStage::new(StageOptions::default(), Arc::new(SerialExecutor));
        let (mut a, mut b, mut out) = (FrameQueue::new("a"), FrameQueue::new("b"), FrameCollector::new());
        assert!(stage.activate([&mut a, &mut b], &mut out).is_err());
    }

    #[test]
    fn test_requests_empty_inputs_when_wanted() {
        let mut stage = configured_stage(1);
        let mut a = FrameQueue::new("a");
        let mut b = FrameQueue::new("b");
        let mut out = FrameCollector::new();
        a.push_frame(frame(0, vec![vec![1.0; 4]])).unwrap();

        let step = stage.activate([&mut a, &mut b], &mut out).unwrap();
        assert_eq!(
            step,
            Activation::InputRequested {
                input0: false,
                input1: true
            }
        );
        assert!(!a.has_pending_request());
        assert!(b.has_pending_request());
    }

    #[test]
    fn test_not_ready_without_demand() {
        let mut stage = configured_stage(1);
        let (mut a, mut b) = (FrameQueue::new("a"), FrameQueue::new("b"));
        let mut out = FrameCollector::new();
        out.set_wanted(false);
        assert_eq!(
            stage.activate([&mut a, &mut b], &mut out).unwrap(),
            Activation::NotReady
        );
        assert!(!a.has_pending_request());
    }

    #[test]
    fn test_processes_minimum_available() {
        let mut stage = configured_stage(1);
        let (mut a, mut b) = (FrameQueue::new("a"), FrameQueue::new("b"));
        let mut out = FrameCollector::new();
        a.push_frame(frame(0, vec![vec![1.0; 5]])).unwrap();
        b.push_frame(frame(0, vec![vec![1.0; 3]])).unwrap();

        let step = stage.activate([&mut a, &mut b], &mut out).unwrap();
        assert_eq!(step, Activation::Processed { samples: 3 });
        assert_eq!(a.queued_samples(), 2);
        assert_eq!(b.queued_samples(), 0);
        assert_eq!(out.frames().len(), 1);
        assert_eq!(out.frames()[0].pts(), 0);
        assert_eq!(stage.processed_samples(), 3);
    }

    #[test]
    fn test_output_close_propagates_back() {
        let mut stage = configured_stage(1);
        let (mut a, mut b) = (FrameQueue::new("a"), FrameQueue::new("b"));
        let mut out = FrameCollector::new();
        a.push_frame(frame(0, vec![vec![1.0; 5]])).unwrap();
        out.close_downstream(LinkStatus::Eof, 7);

        let step = stage.activate([&mut a, &mut b], &mut out).unwrap();
        assert_eq!(
            step,
            Activation::OutputClosed {
                status: LinkStatus::Eof,
                pts: 7
            }
        );
        assert_eq!(a.queued_samples(), 0);
        assert!(a.closed_status().is_some());
        assert!(b.closed_status().is_some());
        assert_eq!(
            stage.activate([&mut a, &mut b], &mut out).unwrap(),
            Activation::Finished
        );
    }

    #[test]
    fn test_status_forwarded_once_then_finished() {
        let mut stage = configured_stage(1);
        let (mut a, mut b) = (FrameQueue::new("a"), FrameQueue::new("b"));
        let mut out = FrameCollector::new();
        b.finish(LinkStatus::Error("decoder".to_string()), 42);

        let step = stage.activate([&mut a, &mut b], &mut out).unwrap();
        assert_eq!(
            step,
            Activation::StatusForwarded {
                status: LinkStatus::Error("decoder".to_string()),
                pts: 42
            }
        );
        assert_eq!(
            out.status(),
            Some(&(LinkStatus::Error("decoder".to_string()), 42))
        );
        assert!(stage.is_finished());
        assert!(step.made_progress());
        assert_eq!(
            stage.activate([&mut a, &mut b], &mut out).unwrap(),
            Activation::Finished
        );
    }

    #[test]
    fn test_layout_mismatch_is_rejected() {
        let mut stage = configured_stage(2);
        let (mut a, mut b) = (FrameQueue::new("a"), FrameQueue::new("b"));
        let mut out = FrameCollector::new();
        a.push_frame(frame(0, vec![vec![1.0; 4]])).unwrap();
        b.push_frame(frame(0, vec![vec![1.0; 4]])).unwrap();

        let err = stage.activate([&mut a, &mut b], &mut out).unwrap_err();
        assert!(matches!(err, AudioError::FormatError(_)));
        assert!(out.frames().is_empty());
    }
}
