//! Tracy profiling support.
//!
//! With the `tracy` feature enabled, `tracing` spans (fog recompute, desync
//! scan, planner) are reported to Tracy and every turn transition emits a
//! frame marker. Without it every function here is a no-op.
//!
//! Build with `cargo build -p awbw-replay --features tracy`, call
//! [`init_tracy`] early in main, then connect the Tracy GUI.

/// Minimum span level reported to Tracy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TraceLevel {
    #[default]
    Info,
    Debug,
    Trace,
}

impl std::str::FromStr for TraceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(TraceLevel::Info),
            "debug" => Ok(TraceLevel::Debug),
            "trace" => Ok(TraceLevel::Trace),
            _ => Err(format!("Invalid trace level: {}. Use info, debug, or trace.", s)),
        }
    }
}

/// Install the Tracy subscriber.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
#[cfg(feature = "tracy")]
pub fn init_tracy(level: TraceLevel) {
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::prelude::*;

    let filter = match level {
        TraceLevel::Info => LevelFilter::INFO,
        TraceLevel::Debug => LevelFilter::DEBUG,
        TraceLevel::Trace => LevelFilter::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_tracy::TracyLayer::default())
        .with(filter)
        .init();
}

#[cfg(not(feature = "tracy"))]
pub fn init_tracy(_level: TraceLevel) {}

/// Frame boundary for each turn loaded by the replay engine.
#[cfg(feature = "tracy")]
#[inline]
pub fn frame_mark_turn() {
    tracy_client::secondary_frame_mark!("turn");
}

#[cfg(not(feature = "tracy"))]
#[inline]
pub fn frame_mark_turn() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trace_level() {
        assert_eq!("DEBUG".parse::<TraceLevel>(), Ok(TraceLevel::Debug));
        assert_eq!("trace".parse::<TraceLevel>(), Ok(TraceLevel::Trace));
        assert!("verbose".parse::<TraceLevel>().is_err());
    }
}
