mod preprocessor;
mod statements;
mod types;

pub use preprocessor::{
    annotate_blocks, indent_width, paren_delta, preprocess, split_source_lines,
    strip_literals, strip_source,
};
pub use statements::{
    classify, default_value, is_identifier, is_keyword, split_assignment, split_top_level,
};
pub use types::{Language, ParsedProgram, SourceLine, Statement};
