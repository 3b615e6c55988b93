pub mod extractor;
pub mod grader;
