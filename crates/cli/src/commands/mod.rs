pub mod chat;
pub mod doctor;
pub mod listing;
pub mod onboard;
pub mod runtime;
pub mod sync;
