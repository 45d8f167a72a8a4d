//! Keeping the editor's init file in step with the plugin list.
//!
//! Only the `lazy.setup({ ... })` block is ever touched, and only by
//! appending reference lines for plugins it does not mention yet:
//!
//! ```text
//! lazy.setup({
//!   require('tokyonight.nvim'),
//!   require('nvim-treesitter'),   <- appended
//! })
//! ```

mod block;
mod error;
mod merger;

pub use block::{ManagedBlock, MergedDocument, merge_names, reference_line};
pub use error::MergeError;
pub use merger::{ConfigMerger, MergeOutcome};
