pub mod customer;
pub mod document;
pub mod event;
pub mod location;
pub mod report;
pub mod tracking;
pub mod trip;
pub mod user;
