pub mod artifacts;
pub mod language;
pub mod llm;
pub mod stt;
pub mod translate;
