/// Model identifier used when no preset has been selected.
pub const DEFAULT_MODEL: &str = "grok-code-fast-1";

/// Selectable Grok model preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelPreset {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

pub const MODEL_PRESETS: [ModelPreset; 4] = [
    ModelPreset {
        id: "grok-code-fast-1",
        label: "Grok Code Fast",
        description: "Optimized for fast coding tasks with balanced performance",
    },
    ModelPreset {
        id: "grok-2-latest",
        label: "Grok 2 Latest",
        description: "Latest Grok 2 model with enhanced reasoning capabilities",
    },
    ModelPreset {
        id: "grok-2-1212",
        label: "Grok 2 (Dec 2024)",
        description: "Grok 2 December 2024 snapshot with improved accuracy",
    },
    ModelPreset {
        id: "grok-beta",
        label: "Grok Beta",
        description: "Beta version with experimental features and capabilities",
    },
];

/// Preset following `current` in the table, wrapping at the end.
///
/// An id outside the table restarts the cycle at the first preset.
pub fn next_model(current: &str) -> &'static ModelPreset {
    let position = MODEL_PRESETS
        .iter()
        .position(|preset| preset.id == current);

    match position {
        Some(index) => &MODEL_PRESETS[(index + 1) % MODEL_PRESETS.len()],
        None => &MODEL_PRESETS[0],
    }
}

pub fn find_preset(id: &str) -> Option<&'static ModelPreset> {
    MODEL_PRESETS.iter().find(|preset| preset.id == id)
}
