use indicatif::{ProgressBar, ProgressStyle};

use crate::args::Args;
use crate::config::{Phase, Settings};
use crate::core::{Disease, Domain, SpatialBinner, interact_tiles};
use crate::errors::{EpiError, Result};
use crate::init;
use crate::readwrite::{CsvExposureWriter, ExposureWriter};
use crate::stats::{ExposureStatistics, ExposureSummary};

/// Reference driver of the interaction core.
///
/// Every step resets the escape accumulators and runs two phases. During the day agents sit at
/// their work position, at night at home. Each phase runs its scheduled contexts over all tiles.
/// The accumulated infection probabilities are summarized and written out; sampling new
/// infections from them is left to the disease progression.
pub struct Runner {
    args: Args,
    settings: Settings,
    disease: Disease,
    domain: Domain,
    binner: SpatialBinner,
}

impl Runner {
    pub fn new(args: Args) -> Result<Runner> {
        Self::setup_logger(&args)?;
        #[cfg(feature = "parallel")]
        Self::setup_rayon(&args)?;

        let settings = Self::load_settings(&args.settings)?;
        Self::from_settings(args, settings)
    }

    /// Set up the simulation from already loaded settings.
    pub fn from_settings(args: Args, settings: Settings) -> Result<Runner> {
        settings.validate()?;
        let disease = Disease::initialize(settings.disease.clone())?;
        let domain = init::generate(&settings.population, disease.parameters())?;
        let binner = SpatialBinner::new(domain.origin());

        Ok(Self {
            args,
            settings,
            disease,
            domain,
            binner,
        })
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn disease(&self) -> &Disease {
        &self.disease
    }

    pub fn binner(&self) -> &SpatialBinner {
        &self.binner
    }

    /// Setup logging level and file
    fn setup_logger(args: &Args) -> Result<()> {
        let log_level = match args.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        simple_logging::log_to_file(args.log_file.as_str(), log_level)
            .map_err(|e| EpiError::IoError(format!("unable to open log file: {e}")))
    }

    /// Setup rayon thread pool
    #[cfg(feature = "parallel")]
    fn setup_rayon(args: &Args) -> Result<()> {
        if let Some(n_threads) = args.threads {
            println!("Setting number of threads to {}.", n_threads);
            rayon::ThreadPoolBuilder::new()
                .num_threads(n_threads)
                .build_global()
                .map_err(|e| {
                    EpiError::ConfigurationError(format!("unable to set number of threads: {e}"))
                })?;
        }
        Ok(())
    }

    /// Load settings from file
    fn load_settings(path: &str) -> Result<Settings> {
        let settings: Settings = Settings::read_from_file(path)?;
        log::info!("Loaded settings\n{}", settings);
        Ok(settings)
    }

    fn progress_bar(&self) -> Result<Option<ProgressBar>> {
        if self.args.disable_progress_bar {
            return Ok(None);
        }
        let bar = ProgressBar::new(self.args.steps as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40}] {pos:>7}/{len:7} [{elapsed_precise} / {duration_precise}] {msg}")
                .map_err(|e| EpiError::ConfigurationError(format!("invalid progress bar: {e}")))?
                .progress_chars("=> "),
        );
        Ok(Some(bar))
    }

    /// Run all steps, writing the exposures of every step if an output directory is set.
    pub fn start(&mut self) -> Result<()> {
        let writer = match &self.args.outdir {
            Some(outdir) => Some(CsvExposureWriter::new(outdir)?),
            None => None,
        };
        let bar = self.progress_bar()?;

        for step in 0..self.args.steps {
            let summary = self.step(step)?;
            log::info!("step={step} {summary}");

            if let Some(writer) = writer.as_ref() {
                writer.write(step, &self.domain)?;
            }
            if let Some(bar) = bar.as_ref() {
                bar.set_position(step as u64 + 1);
                bar.set_message(format!("{:.2}", summary.expected_infections));
            }
        }

        if let Some(bar) = bar {
            bar.finish_with_message("Done.");
        }
        log::info!("Finished simulation.");
        Ok(())
    }

    /// Accumulate the infection probabilities of one step.
    pub fn step(&mut self, step: usize) -> Result<ExposureSummary> {
        let school_open = self.settings.schedule.is_school_open(step);
        log::debug!("Step {step}, schools open: {school_open}");

        self.domain
            .tiles_mut()
            .iter_mut()
            .for_each(|tile| tile.reset_escape());

        for phase in Phase::ALL {
            self.move_agents(phase);
            for &context in self.settings.schedule.contexts(phase) {
                log::trace!("Running {context} during the {phase}");
                let model = self.settings.contexts.model(context);
                interact_tiles(
                    &model,
                    self.domain.tiles_mut(),
                    &self.binner,
                    &self.disease,
                    school_open,
                )?;
            }
        }

        Ok(self.domain.exposure_summary())
    }

    /// Move agents to their location for `phase` and drop the partitions built before.
    fn move_agents(&mut self, phase: Phase) {
        log::debug!("Moving agents for the {phase}...");
        for tile in self.domain.tiles_mut() {
            match phase {
                Phase::Day => tile.set_positions(|agent| agent.work.unwrap_or(agent.home)),
                Phase::Night => tile.set_positions(|agent| agent.home),
            }
            self.binner.invalidate_tile(tile.id());
        }
    }
}
