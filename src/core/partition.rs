//! 声道切片划分
//!
//! 第 `j` 个切片（共 `J` 个）覆盖 `[C*j/J, C*(j+1)/J)`。
//! 各切片互不重叠且并集恰为 `[0, C)`，这是累加器无锁写入的前提。

use std::ops::Range;

/// 第 `slice` 个切片的声道范围
#[inline]
pub fn slice_range(channels: usize, slice: usize, nb_slices: usize) -> Range<usize> {
    let start = channels * slice / nb_slices;
    let end = channels * (slice + 1) / nb_slices;
    start..end
}

/// 全部切片的声道范围（按切片序号排列）
pub fn slice_ranges(channels: usize, nb_slices: usize) -> Vec<Range<usize>> {
    (0..nb_slices)
        .map(|j| slice_range(channels, j, nb_slices))
        .collect()
}

/// 实际使用的切片数：`min(C, workers)`，至少为1
///
/// 切片数不超过声道数，因此不会出现空切片。
#[inline]
pub fn effective_slices(channels: usize, workers: usize) -> usize {
    channels.min(workers).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_channel_covered_once() {
        for channels in 1..=24 {
            for nb_slices in 1..=channels {
                let ranges = slice_ranges(channels, nb_slices);
                let mut hits = vec![0usize; channels];
                for range in &ranges {
                    assert!(!range.is_empty(), "C={channels} J={nb_slices} 出现空切片");
                    for ch in range.clone() {
                        hits[ch] += 1;
                    }
                }
                assert!(hits.iter().all(|&h| h == 1), "C={channels} J={nb_slices}");
                assert_eq!(ranges.first().unwrap().start, 0);
                assert_eq!(ranges.last().unwrap().end, channels);
            }
        }
    }

    #[test]
    fn test_uneven_split() {
        assert_eq!(slice_ranges(5, 2), vec![0..2, 2..5]);
        assert_eq!(slice_ranges(7, 3), vec![0..2, 2..4, 4..7]);
    }

    #[test]
    fn test_effective_slices_bounded_by_channels() {
        assert_eq!(effective_slices(2, 16), 2);
        assert_eq!(effective_slices(8, 4), 4);
        assert_eq!(effective_slices(6, 0), 1);
    }
}
