//! 平面音频块（Stream Chunk）
//!
//! 每个声道一段连续样本缓冲，附带样本表示和时间戳。
//! 时间戳以样本为单位（时基 = 1/采样率）。

use super::format::SampleFormat;
use crate::error::{self, AudioResult};

/// 平面样本缓冲
#[derive(Debug, Clone, PartialEq)]
pub enum PlanarSamples {
    F32(Vec<Vec<f32>>),
    F64(Vec<Vec<f64>>),
}

impl PlanarSamples {
    fn format(&self) -> SampleFormat {
        match self {
            PlanarSamples::F32(_) => SampleFormat::F32Planar,
            PlanarSamples::F64(_) => SampleFormat::F64Planar,
        }
    }

    fn channels(&self) -> usize {
        match self {
            PlanarSamples::F32(p) => p.len(),
            PlanarSamples::F64(p) => p.len(),
        }
    }
}

/// 平面样本类型抽象
///
/// 为 f32 / f64 两种样本宽度提供统一访问，归约内核据此单态化。
pub trait PlanarSample: Copy + Send + Sync + PartialEq + 'static {
    const FORMAT: SampleFormat;

    fn to_f64(self) -> f64;

    fn from_f64(value: f64) -> Self;

    fn planes(samples: &PlanarSamples) -> Option<&[Vec<Self>]>;

    fn wrap(planes: Vec<Vec<Self>>) -> PlanarSamples;
}

impl PlanarSample for f32 {
    const FORMAT: SampleFormat = SampleFormat::F32Planar;

    #[inline(always)]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline(always)]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn planes(samples: &PlanarSamples) -> Option<&[Vec<Self>]> {
        match samples {
            PlanarSamples::F32(p) => Some(p),
            PlanarSamples::F64(_) => None,
        }
    }

    fn wrap(planes: Vec<Vec<Self>>) -> PlanarSamples {
        PlanarSamples::F32(planes)
    }
}

impl PlanarSample for f64 {
    const FORMAT: SampleFormat = SampleFormat::F64Planar;

    #[inline(always)]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline(always)]
    fn from_f64(value: f64) -> Self {
        value
    }

    fn planes(samples: &PlanarSamples) -> Option<&[Vec<Self>]> {
        match samples {
            PlanarSamples::F64(p) => Some(p),
            PlanarSamples::F32(_) => None,
        }
    }

    fn wrap(planes: Vec<Vec<Self>>) -> PlanarSamples {
        PlanarSamples::F64(planes)
    }
}

/// 对齐的多声道音频块
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    pts: i64,
    nb_samples: usize,
    samples: PlanarSamples,
}

impl AudioFrame {
    /// 从平面缓冲创建音频块
    ///
    /// 所有声道长度必须一致，且至少有一个声道。
    pub fn from_planes<T: PlanarSample>(pts: i64, planes: Vec<Vec<T>>) -> AudioResult<Self> {
        let Some(first) = planes.first() else {
            return Err(error::format_error("音频块声道数不能为0", 0));
        };
        let nb_samples = first.len();
        if let Some((ch, plane)) = planes
            .iter()
            .enumerate()
            .find(|(_, p)| p.len() != nb_samples)
        {
            return Err(error::format_error(
                "声道样本数不一致",
                format!("ch{ch}={} / ch0={nb_samples}", plane.len()),
            ));
        }

        Ok(Self {
            pts,
            nb_samples,
            samples: T::wrap(planes),
        })
    }

    /// 创建静音块
    pub fn silence(format: SampleFormat, channels: usize, nb_samples: usize, pts: i64) -> Self {
        let samples = match format {
            SampleFormat::F64Planar => PlanarSamples::F64(vec![vec![0.0; nb_samples]; channels]),
            _ => PlanarSamples::F32(vec![vec![0.0; nb_samples]; channels]),
        };
        Self {
            pts,
            nb_samples,
            samples,
        }
    }

    #[inline]
    pub fn pts(&self) -> i64 {
        self.pts
    }

    #[inline]
    pub fn nb_samples(&self) -> usize {
        self.nb_samples
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.samples.channels()
    }

    #[inline]
    pub fn format(&self) -> SampleFormat {
        self.samples.format()
    }

    #[inline]
    pub fn samples(&self) -> &PlanarSamples {
        &self.samples
    }

    /// 以指定样本类型访问各声道平面
    #[inline]
    pub fn planes<T: PlanarSample>(&self) -> Option<&[Vec<T>]> {
        T::planes(&self.samples)
    }

    /// 两个块是否可以参与同一次归约（样本数、声道数、表示均一致）
    pub fn is_aligned_with(&self, other: &AudioFrame) -> bool {
        self.nb_samples == other.nb_samples
            && self.channels() == other.channels()
            && self.format() == other.format()
    }

    /// 从 `at` 处切分：自身保留前 `at` 个样本，返回剩余部分
    ///
    /// 剩余部分的时间戳顺延 `at` 个样本。
    pub fn split_off(&mut self, at: usize) -> AudioFrame {
        let at = at.min(self.nb_samples);
        let samples = match &mut self.samples {
            PlanarSamples::F32(p) => {
                PlanarSamples::F32(p.iter_mut().map(|plane| plane.split_off(at)).collect())
            }
            PlanarSamples::F64(p) => {
                PlanarSamples::F64(p.iter_mut().map(|plane| plane.split_off(at)).collect())
            }
        };
        let rest = AudioFrame {
            pts: self.pts + at as i64,
            nb_samples: self.nb_samples - at,
            samples,
        };
        self.nb_samples = at;
        rest
    }

    /// 在尾部追加另一个块的样本（声道数与表示必须一致）
    pub fn append(&mut self, other: AudioFrame) -> AudioResult<()> {
        if self.channels() != other.channels() || self.format() != other.format() {
            return Err(error::format_error(
                "无法拼接不同布局的音频块",
                format!(
                    "{}ch/{} + {}ch/{}",
                    self.channels(),
                    self.format(),
                    other.channels(),
                    other.format()
                ),
            ));
        }

        match (&mut self.samples, other.samples) {
            (PlanarSamples::F32(dst), PlanarSamples::F32(src)) => {
                dst.iter_mut().zip(src).for_each(|(d, mut s)| d.append(&mut s));
            }
            (PlanarSamples::F64(dst), PlanarSamples::F64(src)) => {
                dst.iter_mut().zip(src).for_each(|(d, mut s)| d.append(&mut s));
            }
            _ => unreachable!("format checked above"),
        }
        self.nb_samples += other.nb_samples;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_planes_rejects_ragged_channels() {
        let result = AudioFrame::from_planes(0, vec![vec![0.0f32; 4], vec![0.0f32; 3]]);
        assert!(result.is_err());
        assert!(AudioFrame::from_planes::<f32>(0, Vec::new()).is_err());
    }

    #[test]
    fn test_split_and_append_keep_order() {
        let mut frame =
            AudioFrame::from_planes(100, vec![vec![1.0f64, 2.0, 3.0, 4.0, 5.0]]).unwrap();
        let rest = frame.split_off(2);

        assert_eq!(frame.nb_samples(), 2);
        assert_eq!(rest.nb_samples(), 3);
        assert_eq!(rest.pts(), 102);
        assert_eq!(frame.planes::<f64>().unwrap()[0], vec![1.0, 2.0]);

        frame.append(rest).unwrap();
        assert_eq!(frame.nb_samples(), 5);
        assert_eq!(frame.planes::<f64>().unwrap()[0], vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(frame.pts(), 100);
    }

    #[test]
    fn test_append_rejects_mismatched_format() {
        let mut a = AudioFrame::silence(SampleFormat::F32Planar, 2, 4, 0);
        let b = AudioFrame::silence(SampleFormat::F64Planar, 2, 4, 4);
        assert!(a.append(b).is_err());
    }

    #[test]
    fn test_typed_plane_access() {
        let frame = AudioFrame::silence(SampleFormat::F64Planar, 3, 8, 0);
        assert!(frame.planes::<f64>().is_some());
        assert!(frame.planes::<f32>().is_none());
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.format(), SampleFormat::F64Planar);
    }
}
