use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[clap(
    author,
    version,
    about,
    long_about = None,
    name = "epicontact",
)]
pub struct Args {
    /// Path to settings (yaml file).
    #[clap(long)]
    pub settings: String,

    /// Number of steps to simulate.
    #[clap(short, long, default_value_t = 10)]
    pub steps: usize,

    /// Directory for exposure output; nothing is written if omitted.
    #[clap(short, long)]
    pub outdir: Option<String>,

    /// Path to the log file.
    #[clap(long, default_value = "epicontact.log")]
    pub log_file: String,

    /// Increase logging verbosity (-v debug, -vv trace).
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Number of worker threads.
    #[clap(long)]
    pub threads: Option<usize>,

    /// Hide the progress bar.
    #[clap(long)]
    pub disable_progress_bar: bool,
}
