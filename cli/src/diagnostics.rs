//! `-d CHARS` diagnostic selector
//!
//! Each character turns on `trace` output for one area of the engine.

use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "warn,bank_simulator_core=info";

/// Tracing target enabled by a diagnostic character
pub fn target_for(flag: char) -> Option<&'static str> {
    match flag {
        't' => Some("bank_simulator_core::teller"),
        'w' => Some("bank_simulator_core::orchestrator::driver"),
        'b' => Some("bank_simulator_core::balance"),
        'r' => Some("bank_simulator_core::workload"),
        'x' => Some("bank_simulator_core::dispatch"),
        'p' => Some("bank_simulator_core::report"),
        _ => None,
    }
}

/// Filter directives for a `-d` argument, or the first unknown character
pub fn directives(flags: &str) -> Result<Vec<String>, char> {
    flags
        .chars()
        .map(|flag| {
            target_for(flag)
                .map(|target| format!("{}=trace", target))
                .ok_or(flag)
        })
        .collect()
}

/// `RUST_LOG` (or the default) plus one directive per diagnostic character
pub fn build_filter(flags: Option<&str>) -> Result<EnvFilter, String> {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let extra = directives(flags.unwrap_or_default())
        .map_err(|flag| format!("Unknown diagnostic category '{}' (expected any of twbrxp)", flag))?;
    for directive in extra {
        let parsed = directive
            .parse::<Directive>()
            .map_err(|e| format!("Bad filter directive {}: {}", directive, e))?;
        filter = filter.add_directive(parsed);
    }
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_flags() {
        assert_eq!(
            directives("tp").unwrap(),
            vec![
                "bank_simulator_core::teller=trace".to_string(),
                "bank_simulator_core::report=trace".to_string(),
            ]
        );
        assert!(directives("").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_flag() {
        assert_eq!(directives("tq"), Err('q'));
        assert!(build_filter(Some("z")).is_err());
    }

    #[test]
    fn test_every_flag_has_a_target() {
        for flag in "twbrxp".chars() {
            assert!(target_for(flag).is_some(), "{}", flag);
        }
    }
}
