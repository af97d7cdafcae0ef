use crate::config::AppConfig;
use crate::server;

pub fn run(port: u16) {
    let config = AppConfig::default();

    println!("🚀 Starting goldtrack server on port {}", port);
    println!("📁 Data directory: {}", config.data_dir.display());

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("❌ Failed to create runtime: {}", e);
            std::process::exit(1);
        }
    };

    runtime.block_on(async {
        if let Err(e) = server::serve(config, port).await {
            eprintln!("❌ Server error: {}", e);
            std::process::exit(1);
        }
    });
}
