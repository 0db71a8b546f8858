//! Logging setup for the tincture tools
//!
//! Everything in the crate logs through the `log` facade; the builder and the
//! SPIR-V printer emit `tracing` events, which reach the same logger through
//! tracing's `log` feature. This module only decides where records go and at
//! which level.
//!
//! # Levels
//!
//! - `warn!` - the default; problems worth seeing even in quiet runs
//! - `info!` - one line per loaded or generated module
//! - `debug!` - one line per function and per structured region
//! - `trace!` - every lowered instruction and declared type
//!
//! `RUST_LOG` overrides any level chosen here:
//!
//! ```bash
//! RUST_LOG=compiler::codegen=trace tincture spirv shader.tirb
//! RUST_LOG=compiler::ir::builder=debug tincture demo -o out/
//! ```

use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Per-module levels for a `-v` count.
///
/// One `-v` shows module-level progress, two add regions and functions, and
/// three open up per-instruction output of the generator.
pub fn filters_for_verbosity(verbosity: u8) -> Vec<(&'static str, LevelFilter)> {
    let (ir, codegen) = match verbosity {
        0 => (LevelFilter::Warn, LevelFilter::Warn),
        1 => (LevelFilter::Info, LevelFilter::Info),
        2 => (LevelFilter::Debug, LevelFilter::Debug),
        _ => (LevelFilter::Debug, LevelFilter::Trace),
    };
    vec![("compiler::ir", ir), ("compiler::codegen", codegen)]
}

/// Drop the crate prefix so records read `[DEBUG codegen::spirv::printer]`.
fn short_target(target: &str) -> &str {
    target.strip_prefix("compiler::").unwrap_or(target)
}

fn builder_for(verbosity: u8) -> Builder {
    let mut builder = Builder::new();
    builder.filter_level(LevelFilter::Warn);
    for (module, level) in filters_for_verbosity(verbosity) {
        builder.filter_module(module, level);
    }
    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{:5} {}] {}",
            record.level(),
            short_target(record.target()),
            record.args()
        )
    });
    builder
}

/// Initialize logging for the command line. `RUST_LOG`, when set, wins over
/// the `-v` count. Later calls are no-ops.
pub fn init_for_cli(verbosity: u8) {
    INIT.call_once(|| {
        if std::env::var_os("RUST_LOG").is_some() {
            Builder::from_env(Env::default()).init();
        } else {
            builder_for(verbosity).init();
        }
    });
}

/// Quiet logging for tests; `RUST_LOG` still applies.
pub fn init_test() {
    let _ = Builder::from_env(Env::default().default_filter_or("warn"))
        .is_test(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_test_twice() {
        init_test();
        init_test();
        log::debug!("logging is set up");
    }

    #[test]
    fn test_verbosity_opens_generator_last() {
        let quiet = filters_for_verbosity(0);
        assert!(quiet.iter().all(|(_, level)| *level == LevelFilter::Warn));

        let loud = filters_for_verbosity(3);
        assert!(loud.contains(&("compiler::codegen", LevelFilter::Trace)));
        assert!(loud.contains(&("compiler::ir", LevelFilter::Debug)));
        assert_eq!(filters_for_verbosity(7), loud);
    }

    #[test]
    fn test_short_target() {
        assert_eq!(short_target("compiler::codegen::spirv"), "codegen::spirv");
        assert_eq!(short_target("tincture"), "tincture");
    }
}
