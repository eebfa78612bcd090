//! 批量文档处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是命令行程序的入口，负责批量文档的渲染和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：创建快速渲染器、启动慢速渲染工作线程、创建共享缓存
//! 2. **并发控制**：使用 Semaphore 限制同时渲染的文档数量
//! 3. **结果输出**：每篇文档写到输出目录，没有输入文件时走 stdin → stdout
//! 4. **全局统计**：汇总成功 / 失败数量和缓存命中情况，可选写出 JSON 报告
//!
//! ## 设计特点
//!
//! - **资源所有者**：唯一创建 `RenderWorker` 的地方
//! - **缓存共享**：所有文档共用一个 `MathCache`，相同公式只渲染一次
//! - **向下委托**：单篇文档交给 `MathRenderer`

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::infrastructure::{LatexEngine, LatexRenderer, Renderers, RenderWorker};
use crate::orchestrator::document_renderer::MathRenderer;
use crate::services::{CacheStats, MathCache};
use crate::utils::logging::{log_startup, print_final_stats};

/// 单篇文档的处理结果
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub input: String,
    pub output: String,
    pub spans: usize,
    pub elapsed_ms: u128,
}

/// 一次运行的统计
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub success: usize,
    pub failed: usize,
    pub documents: Vec<DocumentReport>,
    pub inline_cache: CacheStats,
    pub display_cache: CacheStats,
}

/// 应用主结构
pub struct App {
    config: Config,
    renderer: MathRenderer,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Result<Self> {
        config.validate()?;

        let worker = RenderWorker::spawn(
            LatexEngine,
            config.worker_queue_size,
            config.center_display,
        )
        .context("启动慢速渲染工作线程失败")?;

        let renderers = Renderers::new(Arc::new(LatexRenderer::new()), Arc::new(worker));
        let cache = Arc::new(MathCache::new(config.cache_capacity));
        let renderer = MathRenderer::from_config(renderers, cache, &config);

        Ok(Self { config, renderer })
    }

    /// 使用已有的渲染器创建应用
    pub fn with_renderer(config: Config, renderer: MathRenderer) -> Self {
        Self { config, renderer }
    }

    pub fn renderer(&self) -> &MathRenderer {
        &self.renderer
    }

    /// 运行应用主逻辑
    ///
    /// 没有输入文件时从 stdin 读取文档，结果写到 stdout。
    pub async fn run(&self, inputs: Vec<PathBuf>) -> Result<RunReport> {
        if inputs.is_empty() {
            return self.render_stdin().await;
        }

        log_startup(inputs.len(), self.config.max_concurrent_documents);

        let output_dir = PathBuf::from(&self.config.output_dir);
        tokio::fs::create_dir_all(&output_dir)
            .await
            .with_context(|| format!("无法创建输出目录: {}", output_dir.display()))?;

        let mut report = self.process_all(inputs, &output_dir).await?;
        self.fill_cache_stats(&mut report);

        print_final_stats(
            report.success,
            report.failed,
            &report.inline_cache,
            &report.display_cache,
        );

        if let Some(path) = &self.config.report_file {
            write_report(Path::new(path), &report).await?;
            info!("\n统计报告已保存至: {}", path);
        }

        Ok(report)
    }

    /// stdin → stdout
    async fn render_stdin(&self) -> Result<RunReport> {
        let mut source = String::new();
        tokio::io::stdin()
            .read_to_string(&mut source)
            .await
            .context("无法读取标准输入")?;

        let started = Instant::now();
        let extraction = self.renderer.scan(&source);
        let spans = extraction.table().len();
        let rendered = self.renderer.render_extraction(extraction).await?;

        let mut stdout = tokio::io::stdout();
        stdout.write_all(rendered.as_bytes()).await?;
        stdout.flush().await?;

        let mut report = RunReport {
            success: 1,
            documents: vec![DocumentReport {
                input: "-".to_string(),
                output: "-".to_string(),
                spans,
                elapsed_ms: started.elapsed().as_millis(),
            }],
            ..Default::default()
        };
        self.fill_cache_stats(&mut report);
        Ok(report)
    }

    /// 处理所有文档
    async fn process_all(&self, inputs: Vec<PathBuf>, output_dir: &Path) -> Result<RunReport> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_documents));
        let mut handles = Vec::new();

        for (idx, input) in inputs.into_iter().enumerate() {
            let document_index = idx + 1;
            let permit = semaphore.clone().acquire_owned().await?;
            let renderer = self.renderer.clone();
            let output_dir = output_dir.to_path_buf();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                match process_document(&renderer, &input, &output_dir, document_index).await {
                    Ok(report) => Ok(report),
                    Err(e) => {
                        error!(
                            "[文档 {}] ❌ 处理失败 ({}): {:#}",
                            document_index,
                            input.display(),
                            e
                        );
                        Err(e)
                    }
                }
            });
            handles.push((document_index, handle));
        }

        // 等待所有任务完成
        let mut report = RunReport::default();
        for (document_index, handle) in handles {
            match handle.await {
                Ok(Ok(document)) => {
                    report.success += 1;
                    report.documents.push(document);
                }
                Ok(Err(_)) => report.failed += 1,
                Err(e) => {
                    error!("[文档 {}] 任务执行失败: {}", document_index, e);
                    report.failed += 1;
                }
            }
        }

        if report.failed > 0 {
            warn!("⚠️ {} 篇文档处理失败", report.failed);
        }

        Ok(report)
    }

    fn fill_cache_stats(&self, report: &mut RunReport) {
        let (inline, display) = self.renderer.cache().stats();
        report.inline_cache = inline;
        report.display_cache = display;
    }
}

/// 处理单篇文档：读取 → 渲染 → 写出
async fn process_document(
    renderer: &MathRenderer,
    input: &Path,
    output_dir: &Path,
    document_index: usize,
) -> Result<DocumentReport> {
    let source = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("无法读取文档: {}", input.display()))?;

    let started = Instant::now();
    let extraction = renderer.scan(&source);
    let spans = extraction.table().len();
    info!("[文档 {}] 开始渲染 {} ({} 个公式)", document_index, input.display(), spans);

    let rendered = renderer.render_extraction(extraction).await?;

    let file_name = input
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| format!("document-{}", document_index));
    let output = output_dir.join(format!("{}.html", file_name));

    tokio::fs::write(&output, rendered)
        .await
        .with_context(|| format!("无法写入结果: {}", output.display()))?;

    let elapsed_ms = started.elapsed().as_millis();
    info!("[文档 {}] ✓ 已输出 {} ({} ms)", document_index, output.display(), elapsed_ms);

    Ok(DocumentReport {
        input: input.display().to_string(),
        output: output.display().to_string(),
        spans,
        elapsed_ms,
    })
}

async fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("无法写入统计报告: {}", path.display()))?;
    Ok(())
}
