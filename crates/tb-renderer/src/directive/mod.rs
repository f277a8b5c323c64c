//! Block directives (`::: tag`, columns and tabs).

mod fence;
mod preprocessor;

pub use preprocessor::DirectivePreprocessor;
