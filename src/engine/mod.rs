pub mod directory;
pub mod documents;
pub mod location;
pub mod report;
pub mod tracking;
pub mod trips;
