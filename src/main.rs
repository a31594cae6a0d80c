use glowswarm::sandbox::SandboxConfig;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = SandboxConfig::new();
    if let Some(dir) = std::env::args().nth(1) {
        config = config.with_shader_dir(dir);
    }

    if let Err(e) = glowswarm::run(config) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
