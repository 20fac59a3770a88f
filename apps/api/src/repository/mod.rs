// Storage backends for the credit ledger, job records and chat history.
// Each backend implements all three store traits so job admission can
// consume a credit and insert the job atomically.

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgRepository;
