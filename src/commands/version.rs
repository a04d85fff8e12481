use anyhow::Result;

use autoaccept::agent::script::HELPER_VERSION;

pub fn handle_version() -> Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const NAME: &str = env!("CARGO_PKG_NAME");
    const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

    println!("{} v{}", NAME, VERSION);
    println!("By: {}", AUTHORS);
    println!("Page helper: v{}", HELPER_VERSION);

    if std::env::var("HOMEBREW_PREFIX").is_ok() {
        println!("Installed via: Homebrew");
    } else if std::path::Path::new("/usr/share/doc/autoaccept").exists() {
        println!("Installed via: APT (.deb)");
    }
    Ok(())
}
