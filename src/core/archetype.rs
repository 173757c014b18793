use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors raised when resolving archetype codes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchetypeError {
    #[error("Unknown archetype code: {0}")]
    UnknownCode(String),
}

/// The 16 personality archetype codes.
///
/// Each letter is one axis: L/S (lone or social viewing), A/R (abstract or
/// representational taste), E/M (emotional or meaning-driven reading) and
/// F/C (free-flowing or constructive pacing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ArchetypeCode {
    Laef,
    Laec,
    Lamf,
    Lamc,
    Lref,
    Lrec,
    Lrmf,
    Lrmc,
    Saef,
    Saec,
    Samf,
    Samc,
    Sref,
    Srec,
    Srmf,
    Srmc,
}

impl ArchetypeCode {
    pub const ALL: [ArchetypeCode; 16] = [
        ArchetypeCode::Laef,
        ArchetypeCode::Laec,
        ArchetypeCode::Lamf,
        ArchetypeCode::Lamc,
        ArchetypeCode::Lref,
        ArchetypeCode::Lrec,
        ArchetypeCode::Lrmf,
        ArchetypeCode::Lrmc,
        ArchetypeCode::Saef,
        ArchetypeCode::Saec,
        ArchetypeCode::Samf,
        ArchetypeCode::Samc,
        ArchetypeCode::Sref,
        ArchetypeCode::Srec,
        ArchetypeCode::Srmf,
        ArchetypeCode::Srmc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArchetypeCode::Laef => "LAEF",
            ArchetypeCode::Laec => "LAEC",
            ArchetypeCode::Lamf => "LAMF",
            ArchetypeCode::Lamc => "LAMC",
            ArchetypeCode::Lref => "LREF",
            ArchetypeCode::Lrec => "LREC",
            ArchetypeCode::Lrmf => "LRMF",
            ArchetypeCode::Lrmc => "LRMC",
            ArchetypeCode::Saef => "SAEF",
            ArchetypeCode::Saec => "SAEC",
            ArchetypeCode::Samf => "SAMF",
            ArchetypeCode::Samc => "SAMC",
            ArchetypeCode::Sref => "SREF",
            ArchetypeCode::Srec => "SREC",
            ArchetypeCode::Srmf => "SRMF",
            ArchetypeCode::Srmc => "SRMC",
        }
    }
}

impl fmt::Display for ArchetypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArchetypeCode {
    type Err = ArchetypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        ArchetypeCode::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == normalized)
            .ok_or_else(|| ArchetypeError::UnknownCode(s.to_string()))
    }
}

/// Four-dimensional trait vector, each component in [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitVector {
    pub social: u8,
    pub abstractness: u8,
    pub emotionality: u8,
    pub structure: u8,
}

/// Immutable reference data for one archetype
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalityArchetype {
    pub code: ArchetypeCode,
    pub name: String,
    pub animal: String,
    pub trait_vector: TraitVector,
    pub keywords: BTreeSet<String>,
    pub color_palette: Vec<String>,
}

/// Static table of all 16 archetypes, read-only after load
#[derive(Debug)]
pub struct ArchetypeRegistry {
    // Sorted by code, so a code's discriminant is its index
    archetypes: Vec<PersonalityArchetype>,
}

static REGISTRY: OnceLock<ArchetypeRegistry> = OnceLock::new();

impl ArchetypeRegistry {
    /// Shared registry instance, built on first use
    pub fn global() -> &'static ArchetypeRegistry {
        REGISTRY.get_or_init(ArchetypeRegistry::load)
    }

    fn load() -> Self {
        let mut archetypes: Vec<PersonalityArchetype> = ARCHETYPE_TABLE
            .iter()
            .map(|row| PersonalityArchetype {
                code: row.code,
                name: row.name.to_string(),
                animal: row.animal.to_string(),
                trait_vector: TraitVector {
                    social: row.traits[0],
                    abstractness: row.traits[1],
                    emotionality: row.traits[2],
                    structure: row.traits[3],
                },
                keywords: row.keywords.iter().map(|k| k.to_string()).collect(),
                color_palette: row.palette.iter().map(|c| c.to_string()).collect(),
            })
            .collect();
        archetypes.sort_by_key(|a| a.code);

        Self { archetypes }
    }

    pub fn get(&self, code: ArchetypeCode) -> &PersonalityArchetype {
        &self.archetypes[code as usize]
    }

    /// Parse and resolve a free-form code at the boundary
    pub fn lookup(&self, code: &str) -> Result<&PersonalityArchetype, ArchetypeError> {
        let code = code.parse::<ArchetypeCode>()?;
        Ok(self.get(code))
    }

    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PersonalityArchetype> {
        self.archetypes.iter()
    }
}

struct ArchetypeRow {
    code: ArchetypeCode,
    name: &'static str,
    animal: &'static str,
    // social, abstractness, emotionality, structure
    traits: [u8; 4],
    keywords: &'static [&'static str],
    palette: &'static [&'static str],
}

const ARCHETYPE_TABLE: [ArchetypeRow; 16] = [
    ArchetypeRow {
        code: ArchetypeCode::Laef,
        name: "Dreamy Wanderer",
        animal: "Fox",
        traits: [20, 85, 80, 20],
        keywords: &["abstract expressionism", "surrealism", "minimalism", "impressionism", "introspection", "dreams"],
        palette: &["#C8B6E2", "#7A6FBF", "#F2D7B6"],
    },
    ArchetypeRow {
        code: ArchetypeCode::Laec,
        name: "Emotional Curator",
        animal: "Cat",
        traits: [25, 80, 75, 75],
        keywords: &["abstract expressionism", "color field", "lyrical abstraction", "minimalism", "emotion mapping", "archiving"],
        palette: &["#D9C5B2", "#8E7DBE", "#4A5568"],
    },
    ArchetypeRow {
        code: ArchetypeCode::Lamf,
        name: "Intuitive Explorer",
        animal: "Owl",
        traits: [20, 80, 35, 25],
        keywords: &["conceptual art", "abstract expressionism", "surrealism", "symbolism", "philosophy", "introspection"],
        palette: &["#1A202C", "#5A67D8", "#E2E8F0"],
    },
    ArchetypeRow {
        code: ArchetypeCode::Lamc,
        name: "Philosophical Collector",
        animal: "Turtle",
        traits: [15, 75, 30, 85],
        keywords: &["conceptual art", "minimalism", "structuralism", "postmodernism", "philosophy", "archiving"],
        palette: &["#2D3748", "#A0AEC0", "#EDF2F7"],
    },
    ArchetypeRow {
        code: ArchetypeCode::Lref,
        name: "Solitary Observer",
        animal: "Chameleon",
        traits: [25, 30, 75, 25],
        keywords: &["realism", "impressionism", "romanticism", "symbolism", "nature", "observation"],
        palette: &["#9AE6B4", "#68D391", "#F6E05E"],
    },
    ArchetypeRow {
        code: ArchetypeCode::Lrec,
        name: "Delicate Connoisseur",
        animal: "Hedgehog",
        traits: [20, 25, 80, 80],
        keywords: &["miniature", "portraiture", "still life", "genre painting", "detail", "observation"],
        palette: &["#FBD38D", "#ED8936", "#FEFCBF"],
    },
    ArchetypeRow {
        code: ArchetypeCode::Lrmf,
        name: "Digital Explorer",
        animal: "Octopus",
        traits: [25, 35, 30, 20],
        keywords: &["hyperrealism", "digital art", "contemporary figuration", "photorealism", "technique", "technology"],
        palette: &["#00F5D4", "#9B5DE5", "#F15BB5"],
    },
    ArchetypeRow {
        code: ArchetypeCode::Lrmc,
        name: "Academic Researcher",
        animal: "Beaver",
        traits: [15, 20, 30, 90],
        keywords: &["classicism", "renaissance", "baroque", "realism", "history painting", "art history"],
        palette: &["#744210", "#C05621", "#FAF089"],
    },
    ArchetypeRow {
        code: ArchetypeCode::Saef,
        name: "The Emotional Current",
        animal: "Butterfly",
        traits: [85, 80, 85, 20],
        keywords: &["abstract expressionism", "pop art", "color field", "installation", "sharing", "emotion mapping"],
        palette: &["#FF6B6B", "#FFD93D", "#6BCB77"],
    },
    ArchetypeRow {
        code: ArchetypeCode::Saec,
        name: "The Emotional Architect",
        animal: "Penguin",
        traits: [80, 75, 75, 75],
        keywords: &["color field", "abstract expressionism", "op art", "kinetic art", "networking", "sharing"],
        palette: &["#4ECDC4", "#1A535C", "#FFE66D"],
    },
    ArchetypeRow {
        code: ArchetypeCode::Samf,
        name: "The Meaning Weaver",
        animal: "Parrot",
        traits: [90, 85, 35, 20],
        keywords: &["action painting", "neo-expressionism", "graffiti", "experimental abstraction", "inspiration", "philosophy"],
        palette: &["#F72585", "#7209B7", "#4CC9F0"],
    },
    ArchetypeRow {
        code: ArchetypeCode::Samc,
        name: "The Wisdom Architect",
        animal: "Deer",
        traits: [80, 75, 30, 80],
        keywords: &["conceptual art", "installation", "media art", "public art", "curation", "networking"],
        palette: &["#264653", "#2A9D8F", "#E9C46A"],
    },
    ArchetypeRow {
        code: ArchetypeCode::Sref,
        name: "The Heart Wanderer",
        animal: "Dog",
        traits: [90, 30, 80, 20],
        keywords: &["impressionism", "pop art", "illustration", "street art", "sharing", "nature"],
        palette: &["#FFB703", "#FB8500", "#8ECAE6"],
    },
    ArchetypeRow {
        code: ArchetypeCode::Srec,
        name: "The Emotional Healer",
        animal: "Duck",
        traits: [80, 25, 80, 75],
        keywords: &["portraiture", "landscape", "genre painting", "lyrical realism", "guidance", "detail"],
        palette: &["#FFCDB2", "#E5989B", "#B5838D"],
    },
    ArchetypeRow {
        code: ArchetypeCode::Srmf,
        name: "The Cultural Time Traveler",
        animal: "Elephant",
        traits: [85, 25, 35, 25],
        keywords: &["classical painting", "history painting", "religious art", "mythology", "art history", "guidance"],
        palette: &["#6D597A", "#B56576", "#EAAC8B"],
    },
    ArchetypeRow {
        code: ArchetypeCode::Srmc,
        name: "The Master Docent",
        animal: "Eagle",
        traits: [80, 20, 30, 90],
        keywords: &["classicism", "impressionism", "post-impressionism", "modern art", "curation", "art history"],
        palette: &["#003049", "#D62828", "#F77F00"],
    },
];
