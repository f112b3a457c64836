//! Hardware description and the read-only system preset catalog.
//!
//! A [`HardwareSpec`] carries the four figures the estimator needs per
//! device: peak compute, memory bandwidth, memory capacity and interconnect
//! bandwidth. With `real_values` set they are in human units (TFLOPS, TB/s,
//! GB, GB/s); otherwise they are raw SI units (FLOP/s, B/s, bytes, B/s).

use serde::{Deserialize, Serialize};

const TERA: f64 = 1e12;
const GIGA: f64 = 1e9;
const MIB: f64 = 1024.0 * 1024.0;

// ============================================================================
// Hardware Description
// ============================================================================

/// Per-device hardware figures for one node of the serving system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HardwareSpec {
    /// Peak compute (TFLOPS, or FLOP/s when `real_values` is false).
    pub flops: f64,
    /// Memory bandwidth (TB/s, or B/s).
    pub memory_bw: f64,
    /// Memory capacity (GB, or bytes).
    pub memory_size: f64,
    /// Interconnect bandwidth (GB/s, or B/s).
    pub icn_bw: f64,
    /// Figures are in human units rather than raw SI units.
    #[serde(default = "default_real_values")]
    pub real_values: bool,
}

fn default_real_values() -> bool {
    true
}

impl HardwareSpec {
    /// Peak compute in FLOP/s.
    pub fn peak_flops(&self) -> f64 {
        if self.real_values {
            self.flops * TERA
        } else {
            self.flops
        }
    }

    /// Memory bandwidth in bytes/s.
    pub fn memory_bw_bytes(&self) -> f64 {
        if self.real_values {
            self.memory_bw * TERA
        } else {
            self.memory_bw
        }
    }

    /// Interconnect bandwidth in bytes/s.
    pub fn icn_bw_bytes(&self) -> f64 {
        if self.real_values {
            self.icn_bw * GIGA
        } else {
            self.icn_bw
        }
    }

    /// Per-device memory in MB: `memory_size x 1024` for GB figures.
    pub fn memory_mb(&self) -> f64 {
        if self.real_values {
            self.memory_size * 1024.0
        } else {
            self.memory_size / MIB
        }
    }

    /// Name of the first non-positive or non-finite figure, if any.
    pub fn invalid_field(&self) -> Option<&'static str> {
        let fields = [
            ("flops", self.flops),
            ("memory_bw", self.memory_bw),
            ("memory_size", self.memory_size),
            ("icn_bw", self.icn_bw),
        ];
        fields
            .iter()
            .find(|(_, v)| !v.is_finite() || *v <= 0.0)
            .map(|(name, _)| *name)
    }
}

// ============================================================================
// System Presets
// ============================================================================

/// Catalog of known serving systems.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemPreset {
    /// NVIDIA A100 40 GB
    A100_40GB,
    /// NVIDIA A100 80 GB
    A100_80GB,
    /// NVIDIA H100 SXM
    H100,
    /// NVIDIA GH200 Grace Hopper
    GH200,
    /// Google TPU v4
    TPUv4,
    /// Google TPU v5e
    TPUv5e,
    /// AMD Instinct MI300X
    MI300X,
    /// Intel Gaudi 3
    Gaudi3,
}

impl SystemPreset {
    pub const ALL: [SystemPreset; 8] = [
        Self::A100_40GB,
        Self::A100_80GB,
        Self::H100,
        Self::GH200,
        Self::TPUv4,
        Self::TPUv5e,
        Self::MI300X,
        Self::Gaudi3,
    ];

    /// Parse from catalog name, case-insensitive. Accepts the short forms too.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "a100_40gb_gpu" | "a100_40gb" | "a100" => Some(Self::A100_40GB),
            "a100_80gb_gpu" | "a100_80gb" => Some(Self::A100_80GB),
            "h100_gpu" | "h100" => Some(Self::H100),
            "gh200_gpu" | "gh200" => Some(Self::GH200),
            "tpuv4" | "tpu_v4" => Some(Self::TPUv4),
            "tpuv5e" | "tpu_v5e" => Some(Self::TPUv5e),
            "mi300x" => Some(Self::MI300X),
            "gaudi3" => Some(Self::Gaudi3),
            _ => None,
        }
    }

    /// Catalog key.
    pub fn name(&self) -> &'static str {
        match self {
            Self::A100_40GB => "A100_40GB_GPU",
            Self::A100_80GB => "A100_80GB_GPU",
            Self::H100 => "H100_GPU",
            Self::GH200 => "GH200_GPU",
            Self::TPUv4 => "TPUv4",
            Self::TPUv5e => "TPUv5e",
            Self::MI300X => "MI300X",
            Self::Gaudi3 => "Gaudi3",
        }
    }

    /// Per-device figures in human units.
    pub fn spec(&self) -> HardwareSpec {
        // (TFLOPS, TB/s, GB, GB/s)
        let (flops, memory_bw, memory_size, icn_bw) = match self {
            Self::A100_40GB => (312.0, 1.6, 40.0, 150.0),
            Self::A100_80GB => (312.0, 2.039, 80.0, 150.0),
            Self::H100 => (989.0, 3.35, 80.0, 450.0),
            Self::GH200 => (1979.0, 4.9, 144.0, 450.0),
            Self::TPUv4 => (275.0, 1.2, 32.0, 50.0),
            Self::TPUv5e => (197.0, 0.82, 16.0, 50.0),
            Self::MI300X => (1307.0, 5.3, 192.0, 400.0),
            Self::Gaudi3 => (1835.0, 3.675, 128.0, 300.0),
        };
        HardwareSpec {
            flops,
            memory_bw,
            memory_size,
            icn_bw,
            real_values: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_names_round_trip() {
        for preset in SystemPreset::ALL {
            assert_eq!(SystemPreset::from_name(preset.name()), Some(preset));
        }
        assert_eq!(SystemPreset::from_name("h100"), Some(SystemPreset::H100));
        assert_eq!(SystemPreset::from_name("Custom"), None);
    }

    #[test]
    fn test_memory_mb_uses_1024_factor() {
        let spec = SystemPreset::A100_80GB.spec();
        assert_eq!(spec.memory_mb(), 81_920.0);
    }

    #[test]
    fn test_raw_units() {
        let spec = HardwareSpec {
            flops: 312e12,
            memory_bw: 1.6e12,
            memory_size: 40.0 * 1024.0 * 1024.0 * 1024.0,
            icn_bw: 150e9,
            real_values: false,
        };
        let human = SystemPreset::A100_40GB.spec();
        assert_eq!(spec.peak_flops(), human.peak_flops());
        assert_eq!(spec.memory_bw_bytes(), human.memory_bw_bytes());
        assert_eq!(spec.icn_bw_bytes(), human.icn_bw_bytes());
        assert_eq!(spec.memory_mb(), human.memory_mb());
    }

    #[test]
    fn test_invalid_field_detection() {
        let mut spec = SystemPreset::H100.spec();
        assert_eq!(spec.invalid_field(), None);
        spec.memory_size = 0.0;
        assert_eq!(spec.invalid_field(), Some("memory_size"));
        spec.flops = f64::NAN;
        assert_eq!(spec.invalid_field(), Some("flops"));
    }

    #[test]
    fn test_bigger_parts_have_more_memory() {
        assert!(SystemPreset::A100_80GB.spec().memory_size > SystemPreset::A100_40GB.spec().memory_size);
        assert!(SystemPreset::MI300X.spec().memory_size > SystemPreset::H100.spec().memory_size);
    }
}
