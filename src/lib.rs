//! A Sam/Vi-style modal text editor core: piece-table buffer, undo
//! history, marks, motions, multi-selection views, operators, the Sam
//! structural-regex command language, and the mode/dispatch/command-line
//! surface that drives them. Terminal rendering and key decoding are left
//! to whatever front end embeds this crate.

pub mod buffer;
pub mod cmdline;
pub mod diagnostics;
pub mod document;
pub mod editor;
pub mod error;
pub mod history;
pub mod iter;
pub mod key;
pub mod marks;
pub mod modes;
pub mod motion;
pub mod operators;
pub mod registers;
pub mod sam;
pub mod view;
