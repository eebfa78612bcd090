use anyhow::Result;
use std::path::PathBuf;

use math_render::utils::logging;
use math_render::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 参数为输入文件列表，为空时读取 stdin
    let inputs: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();

    // 初始化并运行应用
    let report = App::initialize(config)?.run(inputs).await?;

    if report.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
