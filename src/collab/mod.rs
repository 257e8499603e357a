//! Downstream collaborators invoked by the intent pipeline.
//!
//! Each collaborator sits behind a trait so the orchestrator can be driven
//! by mocks in tests and by real engines in production.

pub mod classifier;
pub mod composer;
pub mod speech;
pub mod vocal;

pub use classifier::{GestureClassifier, TemplateClassifier};
pub use composer::{OllamaComposer, PhraseComposer, TemplateComposer};
pub use speech::{
    CommandExecutor, CommandSynthesizer, SilentSynthesizer, SpeechSynthesizer,
    SystemCommandExecutor,
};
pub use vocal::{HeartRateMapper, VocalMapper};
