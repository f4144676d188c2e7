/// Persistence collaborator bridge.
pub mod persistence;
/// Question sources and placeholder banks.
pub mod questions;
/// Storage error types shared by the collaborators.
pub mod storage;
