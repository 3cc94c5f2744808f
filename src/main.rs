use motion_qc::app;
use motion_qc::config::PipelineConfig;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = PipelineConfig::default();
    if let Err(e) = app::run(&config) {
        log::error!("motion QC failed: {e:#}");
        return Err(e);
    }
    Ok(())
}
