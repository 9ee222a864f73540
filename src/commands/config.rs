use colored::*;
use eyre::{Context, Result};
use std::fs;

use hookpost::config::{Config, LogLevel, RuleConfig};

use crate::cli::{ConfigAction, OutputFormat};

pub fn run(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show { format } => show(OutputFormat::resolve(format), config),
        ConfigAction::Get { key } => get(&key, config),
        ConfigAction::Set { key, value } => set(&key, &value, config),
    }
}

fn show(format: OutputFormat, config: &Config) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(config)?);
        }
        OutputFormat::Text => {
            println!("{}", "hookpost Configuration".bold());
            println!();

            println!("{}:", "notifications".cyan());
            println!("  enabled: {}", config.notifications.enabled);
            println!("  insecure_skip_verify: {}", config.notifications.insecure_skip_verify);
            println!("  timeout_secs: {}", config.notifications.timeout_secs);
            println!();

            println!("{}:", "rules".cyan());
            if config.rules.is_empty() {
                println!("  {}", "(none)".dimmed());
            }
            for rule in &config.rules {
                match &rule.endpoint {
                    Some(endpoint) if !endpoint.trim().is_empty() => println!("  {}: {}", rule.name, endpoint),
                    _ => println!("  {}: {}", rule.name, "no endpoint configured".red()),
                }
            }
            println!();

            println!("{}:", "audit".cyan());
            println!("  path: {}", config.audit.path.display());
            println!("  sinks: {:?}", config.audit.sinks);
        }
    }

    Ok(())
}

fn lookup(key: &str, config: &Config) -> Option<String> {
    if let Some(name) = key.strip_prefix("rules.").and_then(|k| k.strip_suffix(".endpoint")) {
        return config
            .find_rule(name)
            .map(|rule| rule.endpoint.clone().unwrap_or_default());
    }

    match key {
        "notifications.enabled" => Some(config.notifications.enabled.to_string()),
        "notifications.insecure_skip_verify" => Some(config.notifications.insecure_skip_verify.to_string()),
        "notifications.timeout_secs" => Some(config.notifications.timeout_secs.to_string()),
        "audit.path" => Some(config.audit.path.display().to_string()),
        "log_level" | "log-level" => Some(config.log_level.as_filter().to_string()),
        _ => None,
    }
}

fn get(key: &str, config: &Config) -> Result<()> {
    match lookup(key, config) {
        Some(v) => println!("{}", v),
        None => {
            eprintln!("{} Unknown config key: {}", "✗".red(), key);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn apply(key: &str, value: &str, config: &mut Config) -> Result<()> {
    if let Some(name) = key.strip_prefix("rules.").and_then(|k| k.strip_suffix(".endpoint")) {
        let endpoint = if value.trim().is_empty() { None } else { Some(value.to_string()) };
        match config.rules.iter_mut().find(|r| r.name == name) {
            Some(rule) => rule.endpoint = endpoint,
            None => config.rules.push(RuleConfig {
                name: name.to_string(),
                endpoint,
            }),
        }
        return Ok(());
    }

    match key {
        "notifications.enabled" => {
            config.notifications.enabled = value.parse().context("Invalid boolean value (use 'true' or 'false')")?;
        }
        "notifications.insecure_skip_verify" => {
            config.notifications.insecure_skip_verify =
                value.parse().context("Invalid boolean value (use 'true' or 'false')")?;
        }
        "notifications.timeout_secs" => {
            let secs: u64 = value.parse().context("Invalid timeout (use whole seconds)")?;
            if secs == 0 {
                eyre::bail!("Timeout must be at least one second");
            }
            config.notifications.timeout_secs = secs;
        }
        "audit.path" => config.audit.path = value.into(),
        "log_level" | "log-level" => {
            config.log_level = LogLevel::parse(value).ok_or_else(|| eyre::eyre!("Invalid log level: {}", value))?;
        }
        _ => {
            eyre::bail!("Unknown config key: {}", key);
        }
    }

    Ok(())
}

fn set(key: &str, value: &str, config: &Config) -> Result<()> {
    println!("{} Setting {} = {}", "→".blue(), key.cyan(), value.green());

    let mut new_config = config.clone();
    apply(key, value, &mut new_config)?;

    let config_path = Config::hookpost_dir().join("hookpost.yaml");
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let yaml_str = serde_yaml::to_string(&new_config).context("Failed to serialize config")?;
    fs::write(&config_path, yaml_str).context("Failed to write config file")?;

    println!("  {} Saved to {}", "✓".green(), config_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_keys() {
        let config = Config::default();
        assert_eq!(lookup("notifications.enabled", &config).as_deref(), Some("true"));
        assert_eq!(lookup("notifications.timeout_secs", &config).as_deref(), Some("15"));
        assert_eq!(lookup("log-level", &config).as_deref(), Some("info"));
        assert_eq!(lookup("bogus", &config), None);
    }

    #[test]
    fn test_apply_rule_endpoint_adds_and_updates() {
        let mut config = Config::default();
        apply("rules.billing.endpoint", "https://a", &mut config).unwrap();
        apply("rules.billing.endpoint", "https://b", &mut config).unwrap();

        assert_eq!(config.rules.len(), 1);
        assert_eq!(lookup("rules.billing.endpoint", &config).as_deref(), Some("https://b"));
    }

    #[test]
    fn test_apply_rule_endpoint_blank_clears() {
        let mut config = Config::default();
        apply("rules.ops.endpoint", "https://a", &mut config).unwrap();
        apply("rules.ops.endpoint", "", &mut config).unwrap();
        assert_eq!(config.rules[0].endpoint, None);
    }

    #[test]
    fn test_apply_rejects_bad_values() {
        let mut config = Config::default();
        assert!(apply("notifications.enabled", "maybe", &mut config).is_err());
        assert!(apply("notifications.timeout_secs", "0", &mut config).is_err());
        assert!(apply("log_level", "loud", &mut config).is_err());
        assert!(apply("nope", "1", &mut config).is_err());
    }

    #[test]
    fn test_apply_insecure_flag() {
        let mut config = Config::default();
        apply("notifications.insecure_skip_verify", "true", &mut config).unwrap();
        assert!(config.notifications.insecure_skip_verify);
    }
}
