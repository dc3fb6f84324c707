use std::str::FromStr;

use super::{kernels, FilterError, Kernel};

/// The named filters shipped with the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterPreset {
    /// 3x3 uniform box blur with zero bias.
    Box3,
    /// 5x5 uniform box blur with zero bias.
    Box5,
}

impl FilterPreset {
    /// All the presets, in key binding order.
    pub const ALL: [FilterPreset; 2] = [FilterPreset::Box3, FilterPreset::Box5];

    /// Map a control key to a preset: `q` selects the 3x3 blur, `t` the 5x5 blur.
    pub fn from_key(key: char) -> Option<Self> {
        match key {
            'q' => Some(FilterPreset::Box3),
            't' => Some(FilterPreset::Box5),
            _ => None,
        }
    }

    /// The kernel of the preset.
    pub fn kernel(&self) -> Result<Kernel, FilterError> {
        match self {
            FilterPreset::Box3 => kernels::box_blur_kernel_2d(3),
            FilterPreset::Box5 => kernels::box_blur_kernel_2d(5),
        }
    }

    /// The bias of the preset.
    pub fn bias(&self) -> f32 {
        0.0
    }
}

impl std::fmt::Display for FilterPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterPreset::Box3 => write!(f, "box3"),
            FilterPreset::Box5 => write!(f, "box5"),
        }
    }
}

impl FromStr for FilterPreset {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "box3" | "blur" | "q" => Ok(FilterPreset::Box3),
            "box5" | "blur5x" | "t" => Ok(FilterPreset::Box5),
            _ => Err(FilterError::UnknownPreset(s.to_string())),
        }
    }
}
