pub mod assemble;
pub mod config;
pub mod diversity;
pub mod error;
pub mod graph;
pub mod inference;
pub mod logging;
pub mod metadata;
pub mod shacl;
pub mod syntax_check;
pub mod utils;

pub use assemble::{AssemblyOutcome, assemble};
pub use config::{CliArgs, PipelineConfig};
pub use diversity::shannon_index;
pub use error::{ParseError, PipelineError, exit_code_of};
pub use graph::{Graph, Literal, RdfSyntax, Subject, Term, Triple};
pub use inference::Inference;
pub use logging::{LoggingConfig, init_logging};
pub use metadata::{DatasetDescriptor, MetadataOutcome};
pub use shacl::{ShapeValidator, ValidationOutcome, ValidationReport, ValidatorOptions, run_validation};
pub use syntax_check::{SyntaxReport, check_targets};
