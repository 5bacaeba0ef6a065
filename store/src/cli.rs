use clap::Parser;

/// Shared-memory store: one producer stocking items for several consumer processes
#[derive(Debug, Clone, Parser)]
pub struct Args {
    /// Number of consumer processes
    #[arg(short, long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..))]
    pub consumers: u32,

    /// Stop after producing this many items
    ///
    /// Runs until interrupted when omitted
    #[arg(short = 'n', long)]
    pub items: Option<u64>,

    /// Multiplier for every random pause, 0 disables pacing
    #[arg(long, default_value_t = 1.0)]
    pub time_scale: f64,

    /// Seed for catalog picks and pauses
    #[arg(long)]
    pub seed: Option<u64>,
}
