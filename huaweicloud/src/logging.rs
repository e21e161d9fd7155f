use tracing::Level;

/// Level from Terraform's `TF_LOG_PROVIDER`, falling back to `TF_LOG`
pub fn level_from_env() -> Level {
    let raw = std::env::var("TF_LOG_PROVIDER")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| std::env::var("TF_LOG").ok());
    parse_level(raw.as_deref().unwrap_or(""))
}

pub fn parse_level(value: &str) -> Level {
    match value.trim().to_ascii_uppercase().as_str() {
        "TRACE" | "JSON" => Level::TRACE,
        "DEBUG" => Level::DEBUG,
        "WARN" => Level::WARN,
        "ERROR" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Installs the stderr subscriber. Later calls leave the first one in place.
pub fn init() {
    let level = level_from_env();
    let installed = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!("logging at {}", level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn parses_terraform_levels() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level(" WARN "), Level::WARN);
        assert_eq!(parse_level("TRACE"), Level::TRACE);
        assert_eq!(parse_level("verbose"), Level::INFO);
        assert_eq!(parse_level(""), Level::INFO);
    }

    #[test]
    #[serial]
    fn provider_level_wins_over_global() {
        std::env::set_var("TF_LOG", "ERROR");
        std::env::set_var("TF_LOG_PROVIDER", "DEBUG");
        assert_eq!(level_from_env(), Level::DEBUG);

        std::env::remove_var("TF_LOG_PROVIDER");
        assert_eq!(level_from_env(), Level::ERROR);

        std::env::remove_var("TF_LOG");
        assert_eq!(level_from_env(), Level::INFO);
    }

    #[test]
    fn init_twice_is_harmless() {
        init();
        init();
    }
}
