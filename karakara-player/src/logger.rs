use log::LevelFilter;

/// Route the `log` facade to the terminal display, or to stderr when headless
pub fn setup_logging(headless: bool) -> anyhow::Result<()> {
    if headless {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .try_init()?;
        return Ok(());
    }

    tui_logger::init_logger(LevelFilter::Debug)
        .map_err(|e| anyhow::anyhow!("failed to init tui_logger: {:?}", e))?;
    tui_logger::set_default_level(LevelFilter::Debug);
    Ok(())
}
