//! Program files and listings.
//!
//! Programs reach the kernel already decoded. This module provides:
//! - [`ProgramFile`] - JSON program files with load/save
//! - [`listing`] - STL listings in German or English mnemonics

mod file;
mod listing;

pub use file::{load_program, save_program, ProgramError, ProgramFile};
pub use listing::listing;
