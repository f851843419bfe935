use anyhow::{Context, Result};
use lms_autopilot::utils::logging;
use lms_autopilot::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load().context("加载配置失败")?;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    let app = App::initialize(config).await.context("初始化失败")?;
    let result = app.run().await;
    app.shutdown().await;

    result.context("课程处理失败")?;
    Ok(())
}
