//! Shader sources, compiled variations and linked programs.
//!
//! # Overview
//!
//! - [`Shader`] - one stage of GLSL source code plus its variation cache
//! - [`ShaderVariation`] - the source compiled with a specific set of defines
//! - [`ShaderProgram`] - a linked vertex and pixel variation pair
//!
//! Variations and programs attempt their native compile or link at most
//! once. A failure is remembered, so a broken shader costs one driver round
//! trip rather than one per frame. Releasing a variation resets it and allows
//! another attempt.
//!
//! # Defines
//!
//! Defines are given as a space-separated string of `NAME` or `NAME=value`
//! tokens. [`normalize_defines`] upper-cases and sorts them, so `"b a"` and
//! `"A B"` select the same variation.
//!
//! ```ignore
//! let shader = graphics.create_shader();
//! graphics.define_shader(shader, ShaderStage::Vertex, "Basic.vs", source)?;
//! let vs = graphics.create_variation(shader, "SKINNED NUM_LIGHTS=4")?;
//! graphics.compile_variation(vs)?;
//! ```

mod program;
mod variation;

pub use program::{LinkState, ShaderProgram, VertexAttribute, number_postfix};
pub use variation::{CompileState, ShaderVariation};

use std::collections::HashMap;

use crate::types::ShaderStage;

slotmap::new_key_type! {
    /// Handle to a [`Shader`].
    pub struct ShaderId;
    /// Handle to a [`ShaderVariation`].
    pub struct ShaderVariationId;
}

/// Shader source code for one stage.
#[derive(Debug, Default)]
pub struct Shader {
    stage: Option<ShaderStage>,
    name: String,
    source_code: String,
    variations: HashMap<String, ShaderVariationId>,
}

impl Shader {
    /// Create an empty shader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stage, name and source code.
    ///
    /// Returns the existing variations, which the caller must release so
    /// that they recompile from the new code.
    pub fn define(
        &mut self,
        stage: ShaderStage,
        name: impl Into<String>,
        source_code: impl Into<String>,
    ) -> Vec<ShaderVariationId> {
        self.stage = Some(stage);
        self.name = name.into();
        self.source_code = source_code.into();
        self.variation_ids()
    }

    /// Look up a variation by defines, trying the string as given before normalizing it.
    pub fn find_variation(&self, defines: &str) -> Option<ShaderVariationId> {
        self.variations
            .get(defines)
            .or_else(|| self.variations.get(&normalize_defines(defines)))
            .copied()
    }

    pub(crate) fn add_variation(&mut self, defines: String, id: ShaderVariationId) {
        self.variations.insert(defines, id);
    }

    pub(crate) fn remove_variation(&mut self, id: ShaderVariationId) {
        self.variations.retain(|_, v| *v != id);
    }

    /// Ids of all variations created from this shader.
    pub fn variation_ids(&self) -> Vec<ShaderVariationId> {
        self.variations.values().copied().collect()
    }

    /// Stage, once defined.
    pub fn stage(&self) -> Option<ShaderStage> {
        self.stage
    }

    /// Resource name used in log messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source code.
    pub fn source_code(&self) -> &str {
        &self.source_code
    }

    /// Number of cached variations.
    pub fn num_variations(&self) -> usize {
        self.variations.len()
    }
}

/// Normalize a defines string: upper-case, sorted, duplicates removed,
/// single spaces between tokens.
pub fn normalize_defines(defines: &str) -> String {
    let mut tokens: Vec<String> = defines
        .split_whitespace()
        .map(str::to_uppercase)
        .collect();
    tokens.sort();
    tokens.dedup();
    tokens.join(" ")
}
