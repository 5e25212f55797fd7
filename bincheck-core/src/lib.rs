//! # bincheck - genome bin quality prediction
//!
//! Estimates the completeness and contamination of metagenome-assembled
//! genomes without lineage-specific marker sets. Each genome is described
//! by a fixed-length feature vector (module completeness, amino-acid
//! composition and its similarity to reference centroids, assembly
//! statistics) that is scored by a gradient-boosted "general" model or a
//! neural "specific" model.
//!
//! ## Workflow
//!
//! 1. **Gene calling**: an external Prodigal-compatible caller predicts
//!    proteins, with automatic choice between translation tables 11 and 4
//! 2. **Homology search**: a DIAMOND-compatible aligner maps proteins to a
//!    reference database, batched over many genomes
//! 3. **Annotation**: best hits become functional accessions and module
//!    completeness
//! 4. **Features**: the vector is assembled in the order of the feature schema
//! 5. **Scoring**: the general model, the specific model, or both
//!
//! Intermediates are kept in the output directory so an interrupted run can
//! be resumed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::{Path, PathBuf};
//!
//! use bincheck_core::config::{ModelMode, PipelineConfig};
//! use bincheck_core::pipeline::Predictor;
//! use bincheck_core::tools::{DiamondSearcher, ProdigalGeneCaller};
//!
//! let config = PipelineConfig {
//!     mode: ModelMode::Both,
//!     threads: 4,
//!     database: PathBuf::from("reference.dmnd"),
//!     data_dir: PathBuf::from("data"),
//!     ..Default::default()
//! };
//! let predictor = Predictor::new(
//!     config,
//!     Box::new(ProdigalGeneCaller::default()),
//!     Box::new(DiamondSearcher::default()),
//! )?;
//! let report = predictor.run(&[PathBuf::from("bin.1.fna")], Path::new("out"))?;
//! for row in report.rows() {
//!     println!("{}", row.name);
//! }
//! # Ok::<(), bincheck_core::types::BinCheckError>(())
//! ```
//!
//! ## Module Organization
//!
//! - [`config`]: run configuration
//! - [`types`]: error type and translation tables
//! - [`sequence`]: FASTA input and genome/gene statistics
//! - [`tools`]: external gene caller and aligner interfaces
//! - [`genes`]: gene calling with translation table detection
//! - [`homology`]: batched search and hit tables
//! - [`annotation`]: functional accessions and module completeness
//! - [`composition`]: amino-acid composition and cosine similarity
//! - [`features`]: feature schema and vectors
//! - [`models`]: general and specific models
//! - [`ensemble`]: model selection and output validation
//! - [`context`]: data shared by all genomes of a run
//! - [`pipeline`]: orchestration and resume
//! - [`diagnostics`]: debug artifacts
//! - [`report`]: quality report
//! - [`database`]: reference database location and validation
//! - [`testrun`]: bundled self-test genomes
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, BinCheckError>`](types::BinCheckError).
//! [`BinCheckError::is_fatal`](types::BinCheckError::is_fatal) separates
//! errors that abort a run from those that only fail one genome.

pub mod annotation;
pub mod composition;
pub mod config;
pub mod constants;
pub mod context;
pub mod database;
pub mod diagnostics;
pub mod ensemble;
pub mod features;
pub mod genes;
pub mod homology;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod sequence;
pub mod testrun;
pub mod tools;
pub mod types;

pub use pipeline::Predictor;
pub use report::QualityReport;
pub use types::BinCheckError;
