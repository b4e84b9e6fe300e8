//! Selection of a minimum-cost sample panel, such that every target variant allele
//! is carried by at least one selected sample (weighted set cover).

pub mod ext;
pub mod matrix;
pub mod cost;
pub mod singleton;
pub mod solver;
pub mod solution;
pub mod params;
pub mod cover;

mod err;
pub use err::{Error, Result};
pub use matrix::{AlleleCountMatrix, CleanedMatrix, Variant, VariantKey, VariantClass, SampleId, Dosage};
pub use cost::{CostPolicy, CostVector};
pub use params::Params;
pub use solution::Solution;
pub use cover::{run, run_batch, CoverResult, IncompleteCoverage};

/// Installs stderr logger with colored levels and timestamps.
pub fn init_logger(level: log::LevelFilter) -> Result<()> {
    use fern::{
        Dispatch,
        colors::{Color, ColoredLevelConfig},
    };
    let colors = ColoredLevelConfig::default()
        .info(Color::Green)
        .debug(Color::Cyan);
    Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {:>5}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                colors.color(record.level()),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
        .map_err(|e| Error::RuntimeError(format!("Cannot initialize logger: {}", e)))
}
