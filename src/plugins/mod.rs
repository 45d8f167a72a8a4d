//! Plugin references and their install locations.
//!
//! Every plugin is installed into its own directory directly under the
//! plugins root:
//!
//! ```text
//! ~/.local/share/nvim/lazy/
//! ├── tokyonight.nvim/
//! │   ├── lua/
//! │   └── README.md
//! └── nvim-treesitter/
//!     └── ...
//! ```

mod error;
mod reference;

pub use error::PluginError;
pub use reference::{InstallDirectory, PluginRef};

use std::collections::HashSet;

/// Names of `plugins` in order, without repeats.
pub fn unique_names(plugins: &[PluginRef]) -> Vec<String> {
    let mut seen = HashSet::new();
    plugins
        .iter()
        .filter(|p| seen.insert(p.name.as_str()))
        .map(|p| p.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_names_keeps_first_occurrence() {
        let plugins = vec![
            PluginRef::new("a", "o/a"),
            PluginRef::new("b", "o/b"),
            PluginRef::new("a", "other/a"),
        ];
        assert_eq!(unique_names(&plugins), vec!["a", "b"]);
    }
}
