pub mod chat;
pub mod credit;
pub mod job;
