// Post-processing of generated text. Pure functions, applied before results
// are stored (roadmap, cover letter, career chat) or when a CV analysis is
// read back.

pub mod chat;
pub mod cover_letter;
pub mod cv;
pub mod roadmap;
