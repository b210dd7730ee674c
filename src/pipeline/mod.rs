pub mod import;
pub mod extraction;
pub mod interpretation;
pub mod processor; // Lab report analysis orchestrator
