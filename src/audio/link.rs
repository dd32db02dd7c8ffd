//! 链路接口模块
//!
//! 定义SDR阶段与宿主图之间的输入/输出链路契约，
//! 并提供一套内存实现（`FrameQueue` / `FrameCollector`）供CLI驱动器和测试使用。
//!
//! # 契约约定
//!
//! - **非阻塞**：所有查询都立即返回，阶段从不在链路上等待
//! - **终止状态**：只有在队列排空后 `acknowledge_status` 才会报告EOF/错误
//! - **需求信号**：`request_frame` 只是建议，生产者可以晚些响应

use super::frame::AudioFrame;
use crate::error::{self, AudioResult};
use std::collections::VecDeque;
use std::fmt;

/// 链路终止状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    /// 正常结束
    Eof,
    /// 上游错误（附带描述）
    Error(String),
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStatus::Eof => f.write_str("EOF"),
            LinkStatus::Error(msg) => write!(f, "error({msg})"),
        }
    }
}

/// 输入链路（阶段视角）
pub trait InputPort {
    /// 当前排队的样本数（每声道）
    fn queued_samples(&self) -> usize;

    /// 取出至少 `min`、至多 `max` 个对齐样本
    fn consume_samples(&mut self, min: usize, max: usize) -> AudioResult<AudioFrame>;

    /// 队列排空后返回终止状态及其时间戳
    fn acknowledge_status(&mut self) -> Option<(LinkStatus, i64)>;

    /// 请求上游生产更多数据
    fn request_frame(&mut self);

    /// 下游关闭时由阶段反向关闭输入
    fn close(&mut self, status: LinkStatus, pts: i64);
}

/// 输出链路（阶段视角）
pub trait OutputPort {
    /// 下游是否需要数据
    fn frame_wanted(&self) -> bool;

    /// 向下游转发一个块
    fn forward(&mut self, frame: AudioFrame) -> AudioResult<()>;

    /// 设置输出终止状态
    fn set_status(&mut self, status: LinkStatus, pts: i64);

    /// 下游主动关闭链路时返回关闭状态
    fn closed_status(&self) -> Option<(LinkStatus, i64)>;
}

/// 内存输入队列
///
/// 宿主侧通过 `push_frame` / `finish` 填充，阶段侧通过 [`InputPort`] 消费。
/// 上游块大小任意，`consume_samples` 会按需切分/拼接以精确满足样本数请求。
#[derive(Debug)]
pub struct FrameQueue {
    name: String,
    frames: VecDeque<AudioFrame>,
    queued: usize,
    status: Option<(LinkStatus, i64)>,
    closed: Option<(LinkStatus, i64)>,
    pending_requests: usize,
}

impl FrameQueue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frames: VecDeque::new(),
            queued: 0,
            status: None,
            closed: None,
            pending_requests: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 宿主侧：压入一个块
    ///
    /// 链路被下游关闭后，新块被直接丢弃并返回 `false`。
    pub fn push_frame(&mut self, frame: AudioFrame) -> AudioResult<bool> {
        if self.closed.is_some() {
            return Ok(false);
        }
        if self.status.is_some() {
            return Err(error::stream_error(&self.name, "终止状态之后不能再压入数据"));
        }
        if let Some(front) = self.frames.front()
            && (front.channels() != frame.channels() || front.format() != frame.format())
        {
            return Err(error::format_error(
                &self.name,
                format!(
                    "块布局变化: {}ch/{} -> {}ch/{}",
                    front.channels(),
                    front.format(),
                    frame.channels(),
                    frame.format()
                ),
            ));
        }

        self.queued += frame.nb_samples();
        self.frames.push_back(frame);
        self.pending_requests = 0;
        Ok(true)
    }

    /// 宿主侧：标记上游终止
    pub fn finish(&mut self, status: LinkStatus, pts: i64) {
        if self.status.is_none() {
            self.status = Some((status, pts));
        }
    }

    /// 宿主侧：是否有未响应的数据请求
    pub fn has_pending_request(&self) -> bool {
        self.pending_requests > 0
    }

    /// 宿主侧：链路是否已被下游反向关闭
    pub fn closed_status(&self) -> Option<&(LinkStatus, i64)> {
        self.closed.as_ref()
    }

    /// 是否已收到终止状态
    pub fn is_finished(&self) -> bool {
        self.status.is_some()
    }
}

impl InputPort for FrameQueue {
    fn queued_samples(&self) -> usize {
        self.queued
    }

    fn consume_samples(&mut self, min: usize, max: usize) -> AudioResult<AudioFrame> {
        if min > max || min == 0 {
            return Err(error::stream_error(
                &self.name,
                format!("无效的样本请求范围 [{min}, {max}]"),
            ));
        }
        if self.queued < min {
            return Err(error::stream_error(
                &self.name,
                format!("排队样本不足: 需要{min}, 仅有{}", self.queued),
            ));
        }

        let target = max.min(self.queued);
        let Some(mut out) = self.frames.pop_front() else {
            return Err(error::stream_error(&self.name, "队列为空"));
        };

        while out.nb_samples() < target {
            let Some(next) = self.frames.pop_front() else {
                break;
            };
            out.append(next)?;
        }

        if out.nb_samples() > target {
            let rest = out.split_off(target);
            self.frames.push_front(rest);
        }

        self.queued -= out.nb_samples();
        Ok(out)
    }

    fn acknowledge_status(&mut self) -> Option<(LinkStatus, i64)> {
        if self.queued > 0 {
            return None;
        }
        self.status.clone()
    }

    fn request_frame(&mut self) {
        self.pending_requests += 1;
    }

    fn close(&mut self, status: LinkStatus, pts: i64) {
        self.frames.clear();
        self.queued = 0;
        if self.closed.is_none() {
            self.closed = Some((status, pts));
        }
    }
}

/// 内存输出收集器
#[derive(Debug, Default)]
pub struct FrameCollector {
    frames: Vec<AudioFrame>,
    status: Option<(LinkStatus, i64)>,
    closed: Option<(LinkStatus, i64)>,
    wanted: bool,
}

impl FrameCollector {
    /// 创建一个始终有需求的收集器
    pub fn new() -> Self {
        Self {
            wanted: true,
            ..Self::default()
        }
    }

    /// 下游侧：设置是否需要数据
    pub fn set_wanted(&mut self, wanted: bool) {
        self.wanted = wanted;
    }

    /// 下游侧：主动关闭链路
    pub fn close_downstream(&mut self, status: LinkStatus, pts: i64) {
        self.closed = Some((status, pts));
    }

    pub fn frames(&self) -> &[AudioFrame] {
        &self.frames
    }

    pub fn take_frames(&mut self) -> Vec<AudioFrame> {
        std::mem::take(&mut self.frames)
    }

    /// 阶段设置的输出终止状态
    pub fn status(&self) -> Option<&(LinkStatus, i64)> {
        self.status.as_ref()
    }

    /// 已转发的样本总数（每声道）
    pub fn forwarded_samples(&self) -> usize {
        self.frames.iter().map(AudioFrame::nb_samples).sum()
    }
}

impl OutputPort for FrameCollector {
    fn frame_wanted(&self) -> bool {
        self.wanted && self.status.is_none() && self.closed.is_none()
    }

    fn forward(&mut self, frame: AudioFrame) -> AudioResult<()> {
        if self.status.is_some() {
            return Err(error::stream_error("output", "终止状态之后不能再转发数据"));
        }
        if self.closed.is_none() {
            self.frames.push(frame);
        }
        Ok(())
    }

    fn set_status(&mut self, status: LinkStatus, pts: i64) {
        if self.status.is_none() {
            self.status = Some((status, pts));
        }
    }

    fn closed_status(&self) -> Option<(LinkStatus, i64)> {
        self.closed.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::format::SampleFormat;

    fn ramp(pts: i64, len: usize) -> AudioFrame {
        let plane: Vec<f32> = (0..len).map(|i| (pts as usize + i) as f32).collect();
        AudioFrame::from_planes(pts, vec![plane]).unwrap()
    }

    #[test]
    fn test_consume_merges_and_splits_frames() {
        let mut q = FrameQueue::new("input0");
        q.push_frame(ramp(0, 3)).unwrap();
        q.push_frame(ramp(3, 5)).unwrap();
        assert_eq!(q.queued_samples(), 8);

        let out = q.consume_samples(6, 6).unwrap();
        assert_eq!(out.nb_samples(), 6);
        assert_eq!(out.pts(), 0);
        assert_eq!(
            out.planes::<f32>().unwrap()[0],
            vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]
        );
        assert_eq!(q.queued_samples(), 2);

        let rest = q.consume_samples(1, 100).unwrap();
        assert_eq!(rest.pts(), 6);
        assert_eq!(rest.nb_samples(), 2);
    }

    #[test]
    fn test_consume_more_than_queued_fails() {
        let mut q = FrameQueue::new("input1");
        q.push_frame(ramp(0, 2)).unwrap();
        assert!(q.consume_samples(3, 3).is_err());
        assert_eq!(q.queued_samples(), 2);
    }

    #[test]
    fn test_status_hidden_until_drained() {
        let mut q = FrameQueue::new("input0");
        q.push_frame(ramp(0, 4)).unwrap();
        q.finish(LinkStatus::Eof, 4);

        assert!(q.acknowledge_status().is_none());
        q.consume_samples(4, 4).unwrap();
        assert_eq!(q.acknowledge_status(), Some((LinkStatus::Eof, 4)));
    }

    #[test]
    fn test_push_after_status_is_rejected() {
        let mut q = FrameQueue::new("input0");
        q.finish(LinkStatus::Eof, 0);
        assert!(q.push_frame(ramp(0, 1)).is_err());
    }

    #[test]
    fn test_layout_change_is_rejected() {
        let mut q = FrameQueue::new("input0");
        q.push_frame(AudioFrame::silence(SampleFormat::F32Planar, 2, 4, 0))
            .unwrap();
        let err = q
            .push_frame(AudioFrame::silence(SampleFormat::F32Planar, 1, 4, 4))
            .unwrap_err();
        assert!(err.to_string().contains("块布局变化"));
    }

    #[test]
    fn test_close_drops_queue_and_future_frames() {
        let mut q = FrameQueue::new("input0");
        q.push_frame(ramp(0, 4)).unwrap();
        q.close(LinkStatus::Eof, 0);
        assert_eq!(q.queued_samples(), 0);
        assert!(!q.push_frame(ramp(4, 4)).unwrap());
        assert!(q.closed_status().is_some());
    }

    #[test]
    fn test_request_cleared_by_push() {
        let mut q = FrameQueue::new("input0");
        q.request_frame();
        assert!(q.has_pending_request());
        q.push_frame(ramp(0, 1)).unwrap();
        assert!(!q.has_pending_request());
    }

    #[test]
    fn test_collector_demand() {
        let mut out = FrameCollector::new();
        assert!(out.frame_wanted());
        out.set_status(LinkStatus::Eof, 10);
        assert!(!out.frame_wanted());
        assert!(out.forward(ramp(0, 1)).is_err());
    }
}
