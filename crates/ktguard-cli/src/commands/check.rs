//! `check` and `fix` command implementation.

use anyhow::{bail, Context, Result};
use ktguard_core::{Config, LoggingListener, Mode, Runner, RunnerError};
use ktguard_rules::{catalog, Preset};
use std::sync::Arc;

use crate::config_resolver;
use crate::RunArgs;

/// Runs one batch and returns the process exit status.
pub fn run(args: &RunArgs, mode: Mode, config_path: Option<&std::path::Path>) -> Result<i32> {
    let root = std::env::current_dir().context("Failed to read the current directory")?;
    let registry = Arc::new(catalog().context("Invalid warning catalog")?);

    let source = config_resolver::resolve(&root, config_path);
    let config = match source.load(&registry) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{:?}", miette::Report::new(err));
            bail!("Invalid configuration");
        }
    };
    let preset = resolve_preset(args.preset.as_deref(), &config)?;

    let mut builder = Runner::builder()
        .root(&root)
        .config(config)
        .registry(registry)
        .rules(&preset.rules())
        .mode(mode)
        .excludes(args.exclude.iter().cloned())
        .regenerate_baseline(args.regenerate_baseline)
        .listener(Arc::new(LoggingListener));
    if let Some(baseline) = &args.baseline {
        builder = builder.baseline(baseline);
    }
    if let Some(jobs) = args.jobs {
        builder = builder.parallelism(jobs);
    }

    let runner = match builder.build() {
        Ok(runner) => runner,
        Err(RunnerError::Config(err)) => {
            eprintln!("{:?}", miette::Report::new(err));
            bail!("Invalid configuration");
        }
        Err(err) => return Err(err).context("Failed to prepare the run"),
    };

    tracing::info!(
        "Running {} rule(s) of the {} preset in {:?} mode",
        runner.rule_set().names().len(),
        preset.name(),
        mode
    );

    let result = runner.run(&args.paths).context("Run failed")?;

    super::output::print(&result, args.format, args.group_by_file)?;

    if runner.generates_baseline() {
        if let Some(path) = &args.baseline {
            tracing::info!("Baseline written to {}", path.display());
        }
    }

    Ok(result.exit_code())
}

/// Resolves the effective preset from command line > config > default.
fn resolve_preset(flag: Option<&str>, config: &Config) -> Result<Preset> {
    let Some(name) = flag.or(config.analyzer.preset.as_deref()) else {
        return Ok(Preset::Standard);
    };
    Preset::from_name(name).with_context(|| {
        let valid: Vec<_> = Preset::ALL.iter().map(|p| p.name()).collect();
        format!("Unknown preset `{name}`. Valid presets: {}", valid.join(", "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_preset_defaults_to_standard() {
        assert_eq!(resolve_preset(None, &Config::default()).unwrap(), Preset::Standard);
    }

    #[test]
    fn resolve_preset_from_config() {
        let config = Config::parse("[analyzer]\npreset = \"metrics\"\n").unwrap();
        assert_eq!(resolve_preset(None, &config).unwrap(), Preset::Metrics);
    }

    #[test]
    fn resolve_preset_flag_takes_precedence() {
        let config = Config::parse("[analyzer]\npreset = \"metrics\"\n").unwrap();
        assert_eq!(resolve_preset(Some("formatting"), &config).unwrap(), Preset::Formatting);
    }

    #[test]
    fn resolve_preset_rejects_unknown_name() {
        let err = resolve_preset(Some("strict"), &Config::default()).unwrap_err();
        assert!(err.to_string().contains("Valid presets: standard, formatting, metrics"));
    }
}
