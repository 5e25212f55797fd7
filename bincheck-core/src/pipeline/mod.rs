//! Run orchestration.
//!
//! ## Overview
//!
//! [`Predictor::run`] drives every genome through the [`Stage`] sequence in
//! three fan-out/fan-in phases:
//!
//! 1. gene calling, one genome per worker
//! 2. homology search, batches of genomes with all threads per batch
//! 3. featurization and scoring, one genome per worker
//!
//! The report is written once all genomes are terminal. Genome-level
//! errors only fail their genome; fatal errors abort the run.
//!
//! ## Modules
//!
//! - [`state`]: per-genome state machine
//! - [`artifacts`]: output layout and resume probing
//! - [`inputs`]: input discovery
//!
//! ## Examples
//!
//! ```rust,no_run
//! use std::path::{Path, PathBuf};
//!
//! use bincheck_core::config::PipelineConfig;
//! use bincheck_core::pipeline::Predictor;
//! use bincheck_core::tools::{DiamondSearcher, ProdigalGeneCaller};
//!
//! let config = PipelineConfig {
//!     threads: 8,
//!     database: PathBuf::from("db/reference.dmnd"),
//!     data_dir: PathBuf::from("data"),
//!     ..Default::default()
//! };
//! let predictor = Predictor::new(
//!     config,
//!     Box::new(ProdigalGeneCaller::default()),
//!     Box::new(DiamondSearcher::default()),
//! )?;
//! let report = predictor.run(&[PathBuf::from("bins/bin.1.fna")], Path::new("out"))?;
//! println!("{} genomes, {} failed", report.rows().len(), report.failed_count());
//! # Ok::<(), bincheck_core::types::BinCheckError>(())
//! ```

pub mod artifacts;
pub mod inputs;
pub mod state;

use std::path::{Path, PathBuf};

use rayon::prelude::*;

pub use artifacts::ArtifactLayout;
pub use inputs::discover_units;
pub use state::{GenomeUnit, Stage, Step};

use crate::annotation::Annotation;
use crate::composition::AminoAcidComposition;
use crate::config::PipelineConfig;
use crate::constants::DEBUG_DIR;
use crate::context::PipelineContext;
use crate::diagnostics::Diagnostics;
use crate::features::{CosineSummary, FeatureInputs};
use crate::genes::{GeneCallRecord, call_genes};
use crate::homology::{BatchMember, HitTable, SearchSettings, discard_hits, search_batch};
use crate::report::QualityReport;
use crate::sequence::{read_genome_stats, read_protein_set};
use crate::tools::{GeneCaller, HomologySearcher};
use crate::types::BinCheckError;

/// Runs quality prediction over a set of genomes.
pub struct Predictor {
    config: PipelineConfig,
    context: PipelineContext,
    gene_caller: Box<dyn GeneCaller>,
    searcher: Box<dyn HomologySearcher>,
}

impl Predictor {
    /// Validates the configuration and loads the shared context.
    ///
    /// # Errors
    ///
    /// Fatal errors only: invalid settings, an unusable database, missing
    /// external tools, or data files that disagree with the models.
    pub fn new(
        config: PipelineConfig,
        gene_caller: Box<dyn GeneCaller>,
        searcher: Box<dyn HomologySearcher>,
    ) -> Result<Self, BinCheckError> {
        config.validate()?;
        let usable = std::fs::metadata(&config.database).is_ok_and(|m| m.is_file() && m.len() > 0);
        if !usable {
            return Err(BinCheckError::Database(format!(
                "{} does not exist or is empty",
                config.database.display()
            )));
        }
        if !config.genes_input {
            gene_caller.check_available()?;
        }
        searcher.check_available()?;
        let context = PipelineContext::load(&config)?;

        Ok(Self {
            config,
            context,
            gene_caller,
            searcher,
        })
    }

    /// Processes `inputs` and writes the report into `output_dir`.
    ///
    /// # Errors
    ///
    /// Fatal errors only; failed genomes are report rows.
    pub fn run(&self, inputs: &[PathBuf], output_dir: &Path) -> Result<QualityReport, BinCheckError> {
        let mut units = discover_units(inputs)?;
        let layout = ArtifactLayout::create(output_dir)?;
        let diagnostics = Diagnostics::new(self.config.debug, output_dir)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()
            .map_err(|e| BinCheckError::InvalidConfig(format!("Failed to configure thread pool: {e}")))?;

        log::info!(
            "Processing {} genomes with {} threads ({} model mode)",
            units.len(),
            self.config.threads,
            self.config.mode
        );

        if self.config.debug.any() {
            log::info!("Writing debug output to {}", output_dir.join(DEBUG_DIR).display());
        }

        if self.config.genes_input {
            log::info!("Inputs are protein files; skipping gene calling");
        } else {
            log::info!("Calling genes");
        }
        pool.install(|| {
            units
                .par_iter_mut()
                .for_each(|unit| self.gene_stage(unit, &layout));
        });

        self.search_stage(&mut units, &layout)?;

        log::info!("Building feature vectors and scoring");
        pool.install(|| {
            units
                .par_iter_mut()
                .try_for_each(|unit| self.feature_stage(unit, &layout, &diagnostics))
        })?;

        let report = QualityReport::new(
            self.config.mode,
            units.iter().map(GenomeUnit::to_report_row).collect(),
        );
        report.write(&layout.report())?;
        log::info!("Quality report written to {}", layout.report().display());

        if self.config.remove_intermediates {
            layout.remove_intermediates()?;
            log::info!("Removed intermediate files");
        }

        let failed = report.failed_count();
        if failed > 0 {
            log::warn!("{failed} of {} genomes failed; see Additional_Notes in the report", units.len());
        }
        Ok(report)
    }

    /// `Pending` → `GenesCalled`.
    fn gene_stage(&self, unit: &mut GenomeUnit, layout: &ArtifactLayout) {
        if self.config.genes_input {
            unit.proteins = Some(unit.input.clone());
            unit.advance(Stage::GenesCalled);
            return;
        }

        let stats = match read_genome_stats(&unit.input) {
            Ok(stats) => stats,
            Err(e) => return unit.fail(Step::GeneCalling, &e),
        };
        unit.genome_stats = Some(stats);

        let proteins = layout.proteins(&unit.id);
        if self.config.resume
            && let Some(table) = layout.probe_genes(&unit.id)
        {
            log::debug!("{}: reusing predicted proteins", unit.id);
            unit.translation_table = Some(table);
            unit.proteins = Some(proteins);
            unit.advance(Stage::GenesCalled);
            return;
        }

        let called = call_genes(
            self.gene_caller.as_ref(),
            &unit.input,
            stats.genome_size,
            self.config.translation_table,
            &proteins,
        )
        .and_then(|table| {
            GeneCallRecord {
                translation_table: table.get(),
            }
            .write(&layout.gene_record(&unit.id))?;
            layout.invalidate_hits(&unit.id)?;
            Ok(table)
        });

        match called {
            Ok(table) => {
                log::debug!("{}: genes called with translation table {table}", unit.id);
                unit.translation_table = Some(table);
                unit.proteins = Some(proteins);
                unit.advance(Stage::GenesCalled);
            }
            Err(e) => unit.fail(Step::GeneCalling, &e),
        }
    }

    /// `GenesCalled` → `Searched`, batched over genomes.
    fn search_stage(&self, units: &mut [GenomeUnit], layout: &ArtifactLayout) -> Result<(), BinCheckError> {
        let mut pending = Vec::new();
        for (index, unit) in units.iter_mut().enumerate() {
            if unit.stage != Stage::GenesCalled {
                continue;
            }
            if self.config.resume && layout.probe_hits(&unit.id) {
                log::debug!("{}: reusing hit table", unit.id);
                unit.advance(Stage::Searched);
            } else {
                pending.push(index);
            }
        }
        if pending.is_empty() {
            return Ok(());
        }

        let scratch = tempfile::Builder::new()
            .prefix(".search-")
            .tempdir_in(layout.root())?;
        let settings = SearchSettings {
            database: &self.config.database,
            threads: self.config.threads,
            params: self.config.search_params(),
            scratch: scratch.path(),
        };

        let batches: Vec<&[usize]> = pending.chunks(self.config.search_batch_size).collect();
        for (number, batch) in batches.iter().enumerate() {
            log::info!(
                "Searching batch {}/{} ({} genomes)",
                number + 1,
                batches.len(),
                batch.len()
            );
            let members: Vec<BatchMember> = batch
                .iter()
                .map(|&index| {
                    let unit = &units[index];
                    BatchMember {
                        genome_id: unit.id.clone(),
                        proteins: unit.proteins.clone().unwrap_or_else(|| layout.proteins(&unit.id)),
                        hits: layout.hits(&unit.id),
                    }
                })
                .collect();

            let results = search_batch(self.searcher.as_ref(), &members, &settings);
            for ((&index, member), result) in batch.iter().zip(&members).zip(results) {
                let unit = &mut units[index];
                match result {
                    Ok(()) => unit.advance(Stage::Searched),
                    Err(e) => {
                        discard_hits(member);
                        unit.fail(Step::HomologySearch, &e);
                    }
                }
            }
        }
        Ok(())
    }

    /// `Searched` → `Featurized` → `Scored`.
    ///
    /// Returns `Err` only for fatal errors raised while scoring.
    fn feature_stage(
        &self,
        unit: &mut GenomeUnit,
        layout: &ArtifactLayout,
        diagnostics: &Diagnostics,
    ) -> Result<(), BinCheckError> {
        if unit.stage != Stage::Searched {
            return Ok(());
        }
        let Some(proteins_path) = unit.proteins.clone() else {
            return Ok(());
        };

        let built = read_protein_set(&proteins_path).and_then(|proteins| {
            let hits = HitTable::read(&layout.hits(&unit.id))?;
            let ctx = &self.context;

            let annotation = Annotation::from_hits(&hits);
            let modules = ctx.modules.completeness(&annotation);
            let composition = AminoAcidComposition::from_proteins(&proteins);
            let cosine = CosineSummary::compute(&composition, &ctx.reference);
            let coding = proteins.coding_stats(unit.genome_stats.map(|g| g.genome_size));
            let vector = ctx.schema.build(&FeatureInputs {
                genome: unit.genome_stats.as_ref(),
                coding: &coding,
                composition: &composition,
                modules: &modules,
                annotation: &annotation,
                cosine: &cosine,
            });
            Ok((coding, cosine, vector))
        });

        let (coding, cosine, vector) = match built {
            Ok(parts) => parts,
            Err(e) => {
                unit.fail(Step::Featurization, &e);
                return Ok(());
            }
        };
        unit.coding_stats = Some(coding);
        unit.advance(Stage::Featurized);

        if let Err(e) = diagnostics
            .record_cosine(&unit.id, &cosine)
            .and_then(|()| diagnostics.record_vector(&unit.id, &self.context.schema, &vector))
        {
            log::warn!("{}: could not write debug output: {e}", unit.id);
        }

        let prediction = self.context.selector.predict(&vector, cosine.max)?;
        unit.prediction = Some(prediction);
        unit.advance(Stage::Scored);
        Ok(())
    }
}
