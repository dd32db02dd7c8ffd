//! 诊断输出接收端
//!
//! 阶段只在拆除时输出每声道的最终SDR。

/// 人类可读的诊断输出接收端
pub trait DiagnosticSink {
    fn emit(&mut self, message: &str);
}

/// 通过 `log` 门面输出（info级别）
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(&mut self, message: &str) {
        log::info!(target: "asdr", "{message}");
    }
}

/// 收集所有诊断行（CLI报告与测试使用）
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    lines: Vec<String>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&mut self, message: &str) {
        self.lines.push(message.to_string());
    }
}
