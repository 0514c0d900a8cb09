use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One overwrite pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassSpec {
    /// The same byte repeated over the whole pass.
    Fixed(u8),
    /// Fresh random bytes for every chunk.
    Random,
}

impl PassSpec {
    /// Fill `buf` completely with this pass's pattern. Random passes draw new
    /// bytes on every call, so no randomness is shared between chunks.
    pub fn fill(&self, buf: &mut [u8], rng: &mut dyn RngCore) {
        match *self {
            PassSpec::Fixed(b) => buf.fill(b),
            PassSpec::Random => rng.fill_bytes(buf),
        }
    }

    /// Materialize exactly `len` bytes of this pattern.
    pub fn materialize(&self, len: usize, rng: &mut dyn RngCore) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        self.fill(&mut buf, rng);
        buf
    }

    pub fn is_random(&self) -> bool {
        matches!(self, PassSpec::Random)
    }
}

/// Named erasure policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Standard {
    #[default]
    #[serde(rename = "single")]
    SinglePass,
    #[serde(rename = "dod3")]
    DoD3Pass,
    #[serde(rename = "dod7-ece")]
    DoD7PassECE,
    #[serde(rename = "vsitr")]
    VSITR7Pass,
    #[serde(rename = "gutmann")]
    Gutmann35Pass,
}

// Gutmann passes 11..=25.
const GUTMANN_FIXED: [u8; 15] = [
    0x92, 0x49, 0x24, 0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB,
];

const ZERO: PassSpec = PassSpec::Fixed(0x00);
const ONES: PassSpec = PassSpec::Fixed(0xFF);

impl Standard {
    pub const ALL: [Standard; 5] = [
        Standard::SinglePass,
        Standard::DoD3Pass,
        Standard::DoD7PassECE,
        Standard::VSITR7Pass,
        Standard::Gutmann35Pass,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Standard::SinglePass => "single",
            Standard::DoD3Pass => "dod3",
            Standard::DoD7PassECE => "dod7-ece",
            Standard::VSITR7Pass => "vsitr",
            Standard::Gutmann35Pass => "gutmann",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Standard::SinglePass => "[1 pass] Zero fill",
            Standard::DoD3Pass => "[3 passes] DoD 5220.22-M",
            Standard::DoD7PassECE => "[7 passes] DoD 5220.22-M ECE",
            Standard::VSITR7Pass => "[7 passes] German VSITR",
            Standard::Gutmann35Pass => "[35 passes] Gutmann",
        }
    }

    pub fn pass_count(&self) -> usize {
        self.passes().len()
    }

    pub fn passes(&self) -> Vec<PassSpec> {
        passes_for(*self)
    }
}

/// Ordered pass sequence for `standard`.
///
/// `DoD3Pass` yields seven passes: 0x00/0x01 three times, then random.
pub fn passes_for(standard: Standard) -> Vec<PassSpec> {
    use PassSpec::{Fixed, Random};
    match standard {
        Standard::SinglePass => vec![ZERO],
        Standard::DoD3Pass => vec![
            Fixed(0x00),
            Fixed(0x01),
            Fixed(0x00),
            Fixed(0x01),
            Fixed(0x00),
            Fixed(0x01),
            Random,
        ],
        Standard::DoD7PassECE | Standard::VSITR7Pass => {
            vec![ZERO, ONES, Random, ZERO, ONES, Random, ZERO]
        }
        Standard::Gutmann35Pass => {
            let mut v = Vec::with_capacity(35);
            v.extend([ZERO; 4]);
            v.push(Fixed(0x55));
            v.push(Fixed(0xAA));
            v.extend([Random; 4]);
            v.extend(GUTMANN_FIXED.iter().map(|&b| Fixed(b)));
            v.extend([Random; 6]);
            v.extend([ZERO; 4]);
            v
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown erasure standard {0:?} (expected one of: single, dod3, dod7-ece, vsitr, gutmann)")]
pub struct ParseStandardError(String);

impl FromStr for Standard {
    type Err = ParseStandardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Standard::ALL
            .into_iter()
            .find(|st| st.id() == wanted)
            .ok_or_else(|| ParseStandardError(s.to_string()))
    }
}

impl fmt::Display for Standard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
