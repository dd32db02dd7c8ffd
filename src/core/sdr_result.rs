//! SDR计算结果
//!
//! SDR = 20 × log₁₀(energy / error)，energy = Σu²，error = Σ(u−v)²。

use serde::Serialize;

/// 单声道SDR结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SdrResult {
    /// 声道索引
    pub channel: usize,

    /// 参考信号能量 Σu²
    pub energy: f64,

    /// 误差能量 Σ(u−v)²
    pub error: f64,

    /// SDR（dB）
    ///
    /// 误差为0时为 +inf，参考与误差均为0时为 NaN，按原值报告。
    /// 注意：serde_json 将非有限值序列化为 null。
    pub sdr_db: f64,
}

impl SdrResult {
    pub fn from_sums(channel: usize, energy: f64, error: f64) -> Self {
        Self {
            channel,
            energy,
            error,
            sdr_db: sdr_db(energy, error),
        }
    }

    /// 是否为完美重建（无失真）
    pub fn is_perfect(&self) -> bool {
        self.sdr_db == f64::INFINITY
    }

    /// 诊断输出行
    pub fn diagnostic_line(&self) -> String {
        format!("SDR ch{}: {} dB", self.channel, format_db(self.sdr_db))
    }
}

/// 能量比转dB，除零不做特殊处理
#[inline]
pub fn sdr_db(energy: f64, error: f64) -> f64 {
    20.0 * (energy / error).log10()
}

/// 以6位有效数字格式化dB值，与C的 `%g` 一致（非有限值输出 inf / -inf / nan）
///
/// 指数取舍入之后的值：指数在 [-4, 6) 内用定点表示，否则用 `d.ddddde±XX`，
/// 两种形式都去掉尾随的0。
pub fn format_db(value: f64) -> String {
    const PRECISION: i32 = 6;

    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let scientific = format!("{value:.prec$e}", prec = (PRECISION - 1) as usize);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if (-4..PRECISION).contains(&exponent) {
        let decimals = (PRECISION - 1 - exponent) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{sign}{:02}",
            trim_fraction(mantissa),
            exponent.unsigned_abs()
        )
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}
