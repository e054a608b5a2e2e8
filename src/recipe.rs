//! Recipe loaded for a cooking session.
//!
//! A session only needs the title and the ordered instruction list.  Files
//! may be TOML or JSON (picked by extension, TOML otherwise):
//!
//! ```toml
//! title = "Sugar Cookies"
//! instructions = [
//!     "Preheat oven to 350F",
//!     "Mix flour and sugar",
//!     "Bake for 20 minutes",
//! ]
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("cannot read recipe file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML recipe: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON recipe: {0}")]
    Json(#[from] serde_json::Error),

    #[error("recipe has no instructions")]
    NoInstructions,
}

#[derive(Debug, Deserialize)]
struct RecipeFile {
    title: String,
    instructions: Vec<String>,
}

/// A recipe's title and its instructions.
///
/// Instructions are fixed once constructed; the session controller shares
/// them behind an `Arc` and never mutates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    title: String,
    instructions: Arc<[String]>,
}

impl Recipe {
    /// Build a recipe, dropping blank instruction lines.
    ///
    /// ```
    /// use savora_cook::recipe::Recipe;
    ///
    /// let recipe = Recipe::new("Toast", ["Slice bread", "  ", "Toast it"]).unwrap();
    /// assert_eq!(recipe.len(), 2);
    /// assert_eq!(recipe.step(1), Some("Toast it"));
    /// ```
    pub fn new<I, S>(title: impl Into<String>, instructions: I) -> Result<Self, RecipeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let instructions: Vec<String> = instructions
            .into_iter()
            .map(|s| s.into().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if instructions.is_empty() {
            return Err(RecipeError::NoInstructions);
        }

        Ok(Self {
            title: title.into().trim().to_string(),
            instructions: instructions.into(),
        })
    }

    /// Load a recipe from a `.json` or `.toml` file.
    pub fn load(path: &Path) -> Result<Self, RecipeError> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let file: RecipeFile = if is_json {
            serde_json::from_str(&content)?
        } else {
            toml::from_str(&content)?
        };

        Self::new(file.title, file.instructions)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn instructions(&self) -> &[String] {
        &self.instructions
    }

    /// Instruction at `index`, if any.
    pub fn step(&self, index: usize) -> Option<&str> {
        self.instructions.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Always `false` for a constructed recipe; kept for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// `true` when `text` is exactly one of the instructions.
    pub fn is_instruction(&self, text: &str) -> bool {
        self.instructions.iter().any(|step| step == text)
    }
}
