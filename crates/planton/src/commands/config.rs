use colored::Colorize;
use planton_config::{CliConfig, ConfigKey, get_config_file};

pub fn set(key: ConfigKey, value: &str) -> anyhow::Result<()> {
    let mut config = CliConfig::load()?;
    config.set(key, value)?;
    config.save()?;

    let stored = config.get(key).unwrap_or_default();
    println!("{} {} = {}", "✓".green().bold(), key, stored.cyan());
    Ok(())
}

pub fn get(key: ConfigKey) -> anyhow::Result<()> {
    let config = CliConfig::load()?;
    match config.get(key) {
        Some(value) => println!("{value}"),
        None => {
            eprintln!("{}", format!("✗ {key} is not set").red().bold());
            eprintln!(
                "  Set it with: {}",
                format!("project-planton config set {key} <value>").cyan()
            );
            std::process::exit(1);
        }
    }
    Ok(())
}

pub fn unset(key: ConfigKey) -> anyhow::Result<()> {
    let mut config = CliConfig::load()?;
    config.unset(key);
    config.save()?;
    println!("{} {} unset", "✓".green().bold(), key);
    Ok(())
}

pub fn list() -> anyhow::Result<()> {
    let config = CliConfig::load()?;
    println!(
        "{} {}",
        "Config file:".bold(),
        get_config_file()?.display().to_string().cyan()
    );
    for (key, value) in config.entries() {
        match value {
            Some(v) => println!("  {:<20} {}", key.as_str(), v),
            None => println!("  {:<20} {}", key.as_str(), "(not set)".dimmed()),
        }
    }
    Ok(())
}
