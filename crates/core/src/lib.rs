pub mod builder;
pub mod command;
pub mod element;
pub mod error;
pub mod executor;
pub mod extract;
pub mod matcher;
pub mod parse;

pub use builder::CommandBuilder;
pub use command::{CollectorFn, Command, CommandGroup};
pub use element::{ElementSpec, ExtractorFn};
pub use error::{Result, SiftError};
pub use executor::{CommandExecutor, ExecutionStats, ExecutorConfig, ExecutorConfigBuilder};
pub use extract::{ExtractedValues, Extraction, ExtractorBuilder};
#[doc(hidden)]
pub use extract::{extract_html, extract_text, extract_values};
pub use matcher::{ElementPredicate, Matchable, MatchableBuilder, PatternMatcher, TagMatcher};
pub use parse::{Document, Node};
