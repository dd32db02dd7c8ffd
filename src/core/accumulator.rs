//! 每声道累加器
//!
//! 保存整个流生命周期内的 Σu² 与 Σ(u−v)²（f64），
//! 并可按切片划分为互不重叠的可变视图，交给并行工作单元无锁写入。

use super::partition::slice_range;
use super::sdr_result::SdrResult;
use crate::error::AudioResult;
use std::ops::Range;

/// 每声道累加器对
///
/// 配置完成时按声道数分配并清零，之后只做加法，从不调整大小。
#[derive(Debug, Clone, PartialEq)]
pub struct SdrAccumulator {
    energy: Vec<f64>,
    error: Vec<f64>,
}

impl SdrAccumulator {
    /// 分配并清零累加器
    ///
    /// 使用可失败分配，分配失败返回 `AudioError::OutOfMemory`。
    pub fn try_new(channels: usize) -> AudioResult<Self> {
        let mut energy = Vec::new();
        energy.try_reserve_exact(channels)?;
        energy.resize(channels, 0.0);

        let mut error = Vec::new();
        error.try_reserve_exact(channels)?;
        error.resize(channels, 0.0);

        Ok(Self { energy, error })
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.energy.len()
    }

    /// Σu²（按声道）
    #[inline]
    pub fn energy(&self) -> &[f64] {
        &self.energy
    }

    /// Σ(u−v)²（按声道）
    #[inline]
    pub fn error(&self) -> &[f64] {
        &self.error
    }

    /// 累加单声道的一段部分和
    #[inline]
    pub fn add(&mut self, channel: usize, sum_u: f64, sum_uv: f64) {
        self.energy[channel] += sum_u;
        self.error[channel] += sum_uv;
    }

    /// 按 `nb_slices` 划分为互不重叠的切片视图
    ///
    /// 通过 `split_at_mut` 构造，借用检查器保证各切片不相交。
    pub fn split_slices(&mut self, nb_slices: usize) -> Vec<AccumulatorSlice<'_>> {
        let channels = self.channels();
        let nb_slices = nb_slices.clamp(1, channels.max(1));
        let mut slices = Vec::with_capacity(nb_slices);

        let mut energy_rest: &mut [f64] = &mut self.energy;
        let mut error_rest: &mut [f64] = &mut self.error;

        for j in 0..nb_slices {
            let range = slice_range(channels, j, nb_slices);
            let (energy, e_tail) = std::mem::take(&mut energy_rest).split_at_mut(range.len());
            let (error, r_tail) = std::mem::take(&mut error_rest).split_at_mut(range.len());
            energy_rest = e_tail;
            error_rest = r_tail;
            slices.push(AccumulatorSlice {
                range,
                energy,
                error,
            });
        }

        slices
    }

    /// 生成每声道SDR结果
    pub fn results(&self) -> Vec<SdrResult> {
        self.energy
            .iter()
            .zip(&self.error)
            .enumerate()
            .map(|(ch, (&energy, &error))| SdrResult::from_sums(ch, energy, error))
            .collect()
    }
}

/// 累加器的一个切片视图（声道范围独占）
#[derive(Debug)]
pub struct AccumulatorSlice<'a> {
    range: Range<usize>,
    energy: &'a mut [f64],
    error: &'a mut [f64],
}

impl AccumulatorSlice<'_> {
    /// 本切片覆盖的声道范围（全局索引）
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// 以全局声道索引累加
    #[inline]
    pub fn add(&mut self, channel: usize, sum_u: f64, sum_uv: f64) {
        let local = channel - self.range.start;
        self.energy[local] += sum_u;
        self.error[local] += sum_uv;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_initialised() {
        let acc = SdrAccumulator::try_new(4).unwrap();
        assert_eq!(acc.channels(), 4);
        assert!(acc.energy().iter().all(|&v| v == 0.0));
        assert!(acc.error().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_slices_write_their_own_channels() {
        let mut acc = SdrAccumulator::try_new(5).unwrap();
        {
            let mut slices = acc.split_slices(2);
            assert_eq!(slices.len(), 2);
            assert_eq!(slices[0].range(), 0..2);
            assert_eq!(slices[1].range(), 2..5);
            for slice in slices.iter_mut() {
                for ch in slice.range() {
                    slice.add(ch, ch as f64, 1.0);
                }
            }
        }
        assert_eq!(acc.energy(), &[0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(acc.error(), &[1.0; 5]);
    }

    #[test]
    fn test_slice_count_clamped_to_channels() {
        let mut acc = SdrAccumulator::try_new(3).unwrap();
        let slices = acc.split_slices(8);
        assert_eq!(slices.len(), 3);
        assert!(slices.iter().all(|s| s.range().len() == 1));
    }

    #[test]
    fn test_results_per_channel() {
        let mut acc = SdrAccumulator::try_new(2).unwrap();
        acc.add(0, 4.0, 1.0);
        acc.add(1, 16.0, 0.0);
        let results = acc.results();
        assert_eq!(results.len(), 2);
        assert!((results[0].sdr_db - 12.0412).abs() < 1e-4);
        assert!(results[1].is_perfect());
    }
}
