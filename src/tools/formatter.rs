//! 输出格式化模块
//!
//! 负责SDR测量结果的文本表格与JSON输出。

use super::cli::AppConfig;
use super::constants::app_info;
use super::processor::AnalysisOutput;
use super::utils;
use crate::core::format_db;
use crate::error::{self, AudioError, AudioResult};
use comfy_table::{Table, presets::UTF8_FULL};
use serde::Serialize;

/// 应用程序版本信息
const VERSION: &str = env!("CARGO_PKG_VERSION");

const SEPARATOR: &str =
    "--------------------------------------------------------------------------------\n";

/// 创建报告头部（标题、日期、两路文件信息）
pub fn create_output_header(output: &AnalysisOutput) -> String {
    let mut text = String::new();

    text.push_str(&app_info::format_output_header(VERSION));
    text.push('\n');
    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    text.push_str(&format!("log date: {now}\n\n"));
    text.push_str(SEPARATOR);

    for (label, info) in [("Reference", &output.reference), ("Degraded", &output.degraded)] {
        text.push_str(&format!(
            "{label}: {} ({}Hz, {}ch, {}bit{}, {})\n",
            utils::path::extract_filename(&info.path),
            info.sample_rate,
            info.channels,
            info.bits_per_sample,
            if info.is_float { " float" } else { "" },
            utils::time::format_duration(info.duration_seconds()),
        ));
    }
    text.push_str(&format!(
        "Link format: {}\n",
        output.report.sample_format
    ));
    text.push_str(SEPARATOR);
    text.push('\n');
    text
}

/// 每声道结果表格
pub fn format_channel_table(output: &AnalysisOutput) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Channel", "Σu²", "Σ(u−v)²", "SDR (dB)"]);
    for result in &output.report.channels {
        table.add_row(vec![
            format!("ch{}", result.channel),
            format!("{:.6e}", result.energy),
            format!("{:.6e}", result.error),
            format_db(result.sdr_db),
        ]);
    }
    table.to_string()
}

/// 完整文本报告
pub fn format_text_report(output: &AnalysisOutput, config: &AppConfig) -> String {
    let report = &output.report;
    let mut text = create_output_header(output);

    text.push_str(&format_channel_table(output));
    text.push_str("\n\n");

    text.push_str(&format!(
        "Processed samples: {} / forwarded: {}\n",
        report.processed_samples, output.forwarded_samples
    ));
    if report.bypassed_chunks > 0 {
        text.push_str(&format!(
            "Bypassed chunks (disabled): {}\n",
            report.bypassed_chunks
        ));
    }
    if let Some(status) = &report.terminal_status {
        text.push_str(&format!("Terminal status: {status}\n"));
    }

    if config.verbose {
        let stats = &report.chunk_stats;
        text.push_str(&format!(
            "Chunks: {} (min {}, max {}, mean {:.1})\n",
            stats.total_chunks, stats.min_size, stats.max_size, stats.mean_size
        ));
        text.push_str(&format!(
            "Steps: {}, elapsed: {:.3}s\n",
            output.steps,
            output.elapsed.as_secs_f64()
        ));
    }

    text.push_str(SEPARATOR);
    text
}

#[derive(Serialize)]
struct JsonChannel<'a> {
    channel: usize,
    energy: f64,
    error: f64,
    /// 非有限值为 null，见 `sdr_text`
    sdr_db: Option<f64>,
    sdr_text: &'a str,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    version: &'static str,
    reference: String,
    degraded: String,
    sample_format: String,
    sample_rate: u32,
    processed_samples: u64,
    forwarded_samples: u64,
    bypassed_chunks: usize,
    terminal_status: Option<&'a str>,
    chunk_stats: &'a crate::audio::ChunkSizeStats,
    channels: Vec<JsonChannel<'a>>,
}

/// JSON报告
pub fn format_json_report(output: &AnalysisOutput) -> AudioResult<String> {
    let report = &output.report;
    let sdr_texts: Vec<String> = report.channels.iter().map(|r| format_db(r.sdr_db)).collect();

    let json = JsonReport {
        version: VERSION,
        reference: output.reference.path.display().to_string(),
        degraded: output.degraded.path.display().to_string(),
        sample_format: report.sample_format.to_string(),
        sample_rate: report.sample_rate,
        processed_samples: report.processed_samples,
        forwarded_samples: output.forwarded_samples,
        bypassed_chunks: report.bypassed_chunks,
        terminal_status: report.terminal_status.as_deref(),
        chunk_stats: &report.chunk_stats,
        channels: report
            .channels
            .iter()
            .zip(&sdr_texts)
            .map(|(r, text)| JsonChannel {
                channel: r.channel,
                energy: r.energy,
                error: r.error,
                sdr_db: r.sdr_db.is_finite().then_some(r.sdr_db),
                sdr_text: text,
            })
            .collect(),
    };

    serde_json::to_string_pretty(&json).map_err(|e| error::format_error("JSON序列化失败", e))
}

/// 按配置选择报告格式
pub fn render_report(output: &AnalysisOutput, config: &AppConfig) -> AudioResult<String> {
    if config.json {
        let mut text = format_json_report(output)?;
        text.push('\n');
        Ok(text)
    } else {
        Ok(format_text_report(output, config))
    }
}

/// 输出到文件或控制台
pub fn write_output(output: &str, config: &AppConfig) -> AudioResult<()> {
    match &config.output_path {
        Some(output_path) => {
            std::fs::write(output_path, output).map_err(AudioError::IoError)?;
            if !config.json {
                println!("📄 结果已保存到: {}", output_path.display());
            }
        }
        None => print!("{output}"),
    }
    Ok(())
}
