//! WAV帧源
//!
//! 基于hound读取WAV文件，按固定块大小转换为平面 f32/f64 音频块。
//! 解码在独立线程中进行，通过有界通道向驱动器交付数据（通道满时生产者阻塞，形成背压）。

use super::format::SampleFormat;
use super::frame::{AudioFrame, PlanarSample};
use crate::error::{self, AudioError, AudioResult};
use crossbeam_channel::{Receiver, Sender};
use hound::{WavReader, WavSpec};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

/// 解码数据块 - 显式EOF标记
#[derive(Debug)]
pub enum DecodedChunk {
    /// 平面音频块
    Samples(AudioFrame),
    /// 所有样本已交付，附带结束时间戳（样本数）
    EndOfStream { pts: i64 },
    /// 解码失败
    Failed(AudioError),
}

/// WAV文件基础信息
#[derive(Debug, Clone, PartialEq)]
pub struct WavInfo {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub channels: usize,
    pub bits_per_sample: u16,
    pub is_float: bool,
    /// 每声道样本数
    pub total_frames: u64,
}

impl WavInfo {
    fn from_spec(path: &Path, spec: WavSpec, total_frames: u64) -> Self {
        Self {
            path: path.to_path_buf(),
            sample_rate: spec.sample_rate,
            channels: spec.channels as usize,
            bits_per_sample: spec.bits_per_sample,
            is_float: spec.sample_format == hound::SampleFormat::Float,
            total_frames,
        }
    }

    /// 时长（秒）
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.total_frames as f64 / self.sample_rate as f64
        }
    }
}

/// 打开WAV文件并读取头信息
pub fn probe<P: AsRef<Path>>(path: P) -> AudioResult<WavInfo> {
    let (_, info) = open_reader(path.as_ref())?;
    Ok(info)
}

fn open_reader(path: &Path) -> AudioResult<(WavReader<BufReader<File>>, WavInfo)> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(error::format_error("WAV声道数不能为0", path.display()));
    }
    let total_frames = reader.duration() as u64;
    let info = WavInfo::from_spec(path, spec, total_frames);
    Ok((reader, info))
}

/// 归一化样本迭代器（交错，范围约[-1, 1]）
fn normalized_samples<'a, R: Read>(
    reader: &'a mut WavReader<R>,
) -> AudioResult<Box<dyn Iterator<Item = hound::Result<f64>> + 'a>> {
    let spec = reader.spec();
    match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Float, 32) => Ok(Box::new(
            reader.samples::<f32>().map(|s| s.map(|v| v as f64)),
        )),
        (hound::SampleFormat::Int, bits @ (8 | 16 | 24 | 32)) => {
            let scale = 1.0 / (1u64 << (bits - 1)) as f64;
            Ok(Box::new(
                reader.samples::<i32>().map(move |s| s.map(|v| v as f64 * scale)),
            ))
        }
        (fmt, bits) => Err(error::format_error(
            "不支持的WAV样本格式",
            format!("{fmt:?} {bits}位"),
        )),
    }
}

/// 将交错样本流切成平面块并发送
fn decode_into<T: PlanarSample, R: Read>(
    reader: &mut WavReader<R>,
    channels: usize,
    chunk_size: usize,
    sender: &Sender<DecodedChunk>,
) -> AudioResult<Option<i64>> {
    let mut samples = normalized_samples(reader)?;
    let mut pts: i64 = 0;

    loop {
        let mut planes: Vec<Vec<T>> = (0..channels)
            .map(|_| Vec::with_capacity(chunk_size))
            .collect();
        let mut frames_in_chunk = 0usize;

        'fill: while frames_in_chunk < chunk_size {
            for plane in planes.iter_mut() {
                match samples.next() {
                    Some(value) => plane.push(T::from_f64(value?)),
                    None => break 'fill,
                }
            }
            frames_in_chunk += 1;
        }

        // 尾部不完整的交错帧直接丢弃
        planes.iter_mut().for_each(|p| p.truncate(frames_in_chunk));

        if frames_in_chunk == 0 {
            return Ok(Some(pts));
        }

        let frame = AudioFrame::from_planes(pts, planes)?;
        pts += frames_in_chunk as i64;
        if sender.send(DecodedChunk::Samples(frame)).is_err() {
            // 接收端已放弃
            return Ok(None);
        }
        if frames_in_chunk < chunk_size {
            return Ok(Some(pts));
        }
    }
}

/// 线程化的WAV帧源
pub struct WavFrameSource {
    info: WavInfo,
    receiver: Receiver<DecodedChunk>,
    handle: Option<JoinHandle<()>>,
}

impl WavFrameSource {
    /// 打开文件并启动解码线程
    ///
    /// * `format` - 输出块的样本表示（fltp / dblp）
    /// * `chunk_size` - 每块样本数（每声道）
    /// * `capacity` - 通道容量（块数），满时解码线程阻塞
    pub fn spawn<P: AsRef<Path>>(
        path: P,
        format: SampleFormat,
        chunk_size: usize,
        capacity: usize,
    ) -> AudioResult<Self> {
        if chunk_size == 0 {
            return Err(AudioError::InvalidInput("块大小必须大于0".to_string()));
        }
        if !format.is_supported() {
            return Err(error::format_error("不支持的输出样本格式", format));
        }

        let (mut reader, info) = open_reader(path.as_ref())?;
        let channels = info.channels;
        let (sender, receiver) = crossbeam_channel::bounded(capacity.max(1));

        let thread_name = format!(
            "wav-decode-{}",
            info.path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        );

        let handle = std::thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                let result = match format {
                    SampleFormat::F64Planar => {
                        decode_into::<f64, _>(&mut reader, channels, chunk_size, &sender)
                    }
                    _ => decode_into::<f32, _>(&mut reader, channels, chunk_size, &sender),
                };
                let last = match result {
                    Ok(Some(pts)) => DecodedChunk::EndOfStream { pts },
                    Ok(None) => return,
                    Err(e) => DecodedChunk::Failed(e),
                };
                let _ = sender.send(last);
            })
            .map_err(|e| AudioError::ResourceError(format!("解码线程创建失败: {e}")))?;

        log::debug!(
            "WAV源启动: {} ({}Hz, {}ch, {}位, {}帧, 块={chunk_size})",
            info.path.display(),
            info.sample_rate,
            info.channels,
            info.bits_per_sample,
            info.total_frames
        );

        Ok(Self {
            info,
            receiver,
            handle: Some(handle),
        })
    }

    pub fn info(&self) -> &WavInfo {
        &self.info
    }

    /// 阻塞获取下一个解码块
    pub fn next_chunk(&self) -> DecodedChunk {
        match self.receiver.recv() {
            Ok(chunk) => chunk,
            Err(_) => DecodedChunk::Failed(AudioError::ResourceError(
                "解码线程意外退出".to_string(),
            )),
        }
    }
}

impl Drop for WavFrameSource {
    fn drop(&mut self) {
        // 先断开接收端，让阻塞在send上的解码线程退出
        drop(std::mem::replace(
            &mut self.receiver,
            crossbeam_channel::never(),
        ));
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
