pub mod changes;
pub mod git;
pub mod runtime;
