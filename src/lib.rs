pub mod assistant;
pub mod catalog;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod extractor;
pub mod formatter;
pub mod fuzzy_matcher;
pub mod lookup;
pub mod params;
pub mod resolver;
pub mod routing;

pub use assistant::Assistant;
pub use catalog::{Catalog, Followup, ParameterDefinition, QuestionDefinition};
pub use config::{Environment, RouterConfig};
pub use error::{Result, RouterError};
pub use extractor::extract_parameters;
pub use fuzzy_matcher::QuestionMatcher;
pub use params::{Candidate, ExtractedParameters, Extraction, ParameterMap, ResolvedParameter};
pub use resolver::{RemoteResolver, Resolution};
pub use routing::{build_routing_error, Route};
