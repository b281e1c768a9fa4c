//! Static registry of every specialization.
//!
//! The catalog is built once from a literal table and shared by reference.
//! Lookups never fall back to a default: an absent id, shorthand or token
//! is a [`CatalogError`].

use std::collections::HashMap;
use std::sync::OnceLock;

use thiserror::Error;

use super::{Rgb, Role, SpecDescriptor};

/// Number of specializations in the catalog.
pub const SPEC_COUNT: usize = 36;

/// Position of a spec in catalog order. Also its slot in a spec vector.
pub type SpecIndex = usize;

/// Catalog lookup errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Spec id not found: {0}")]
    SpecIdNotFound(u32),

    #[error("Shorthand not found: '{0}'")]
    ShorthandNotFound(char),

    #[error("Spec token not found: {0}")]
    TokenNotFound(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Invalid catalog: {0}")]
    Invalid(String),
}

// (class, class id, spec, spec id, role, token, shorthand)
type SpecRow = (&'static str, u32, &'static str, u32, Role, &'static str, char);

#[rustfmt::skip]
const SPEC_TABLE: [SpecRow; SPEC_COUNT] = [
    ("death knight", 6, "blood", 250, Role::Tank, "death_knight_blood", 't'),
    ("death knight", 6, "frost", 251, Role::Mdps, "death_knight_frost", 'b'),
    ("death knight", 6, "unholy", 252, Role::Mdps, "death_knight_unholy", 'c'),
    ("demon hunter", 12, "havoc", 577, Role::Mdps, "demon_hunter_havoc", 'd'),
    ("demon hunter", 12, "vengeance", 581, Role::Tank, "demon_hunter_vengeance", 'e'),
    ("druid", 11, "balance", 102, Role::Rdps, "druid_balance", 'f'),
    ("druid", 11, "feral", 103, Role::Mdps, "druid_feral", 'g'),
    ("druid", 11, "guardian", 104, Role::Tank, "druid_guardian", 'h'),
    ("druid", 11, "restoration", 105, Role::Healer, "druid_restoration", 'i'),
    ("hunter", 3, "beast mastery", 253, Role::Rdps, "hunter_beast_mastery", 'j'),
    ("hunter", 3, "marksmanship", 254, Role::Rdps, "hunter_marksmanship", 'k'),
    ("hunter", 3, "survival", 255, Role::Mdps, "hunter_survival", 'l'),
    ("mage", 8, "arcane", 62, Role::Rdps, "mage_arcane", 'm'),
    ("mage", 8, "fire", 63, Role::Rdps, "mage_fire", 'n'),
    ("mage", 8, "frost", 64, Role::Rdps, "mage_frost", 'o'),
    ("monk", 10, "brewmaster", 268, Role::Tank, "monk_brewmaster", 'p'),
    ("monk", 10, "mistweaver", 270, Role::Healer, "monk_mistweaver", 'q'),
    ("monk", 10, "windwalker", 269, Role::Mdps, "monk_windwalker", 'r'),
    ("paladin", 2, "holy", 65, Role::Healer, "paladin_holy", 's'),
    ("paladin", 2, "protection", 66, Role::Tank, "paladin_protection", 'a'),
    ("paladin", 2, "retribution", 70, Role::Mdps, "paladin_retribution", 'u'),
    ("priest", 5, "discipline", 256, Role::Healer, "priest_discipline", 'v'),
    ("priest", 5, "holy", 257, Role::Healer, "priest_holy", 'w'),
    ("priest", 5, "shadow", 258, Role::Rdps, "priest_shadow", 'x'),
    ("rogue", 4, "assassination", 259, Role::Mdps, "rogue_assassination", 'y'),
    ("rogue", 4, "outlaw", 260, Role::Mdps, "rogue_outlaw", 'z'),
    ("rogue", 4, "subtlety", 261, Role::Mdps, "rogue_subtlety", 'A'),
    ("shaman", 7, "elemental", 262, Role::Rdps, "shaman_elemental", 'B'),
    ("shaman", 7, "enhancement", 263, Role::Mdps, "shaman_enhancement", 'C'),
    ("shaman", 7, "restoration", 264, Role::Healer, "shaman_restoration", 'D'),
    ("warlock", 9, "affliction", 265, Role::Rdps, "warlock_affliction", 'E'),
    ("warlock", 9, "demonology", 266, Role::Rdps, "warlock_demonology", 'F'),
    ("warlock", 9, "destruction", 267, Role::Rdps, "warlock_destruction", 'G'),
    ("warrior", 1, "arms", 71, Role::Mdps, "warrior_arms", 'H'),
    ("warrior", 1, "fury", 72, Role::Mdps, "warrior_fury", 'I'),
    ("warrior", 1, "protection", 73, Role::Tank, "warrior_protection", 'J'),
];

/// Class colour for a class name.
pub fn class_color(class_name: &str) -> Rgb {
    match class_name {
        "death knight" => Rgb(196, 31, 59),
        "demon hunter" => Rgb(163, 48, 201),
        "druid" => Rgb(255, 125, 10),
        "hunter" => Rgb(169, 210, 113),
        "mage" => Rgb(64, 199, 235),
        "monk" => Rgb(0, 255, 150),
        "paladin" => Rgb(245, 140, 186),
        "priest" => Rgb(255, 255, 255),
        "rogue" => Rgb(255, 245, 105),
        "shaman" => Rgb(0, 112, 222),
        "warlock" => Rgb(135, 135, 237),
        "warrior" => Rgb(199, 156, 110),
        _ => Rgb(128, 128, 128),
    }
}

/// The role/spec catalog.
#[derive(Debug)]
pub struct RoleCatalog {
    specs: Vec<SpecDescriptor>,
    by_id: HashMap<u32, SpecIndex>,
    by_shorthand: HashMap<char, SpecIndex>,
    by_token: HashMap<&'static str, SpecIndex>,
}

impl RoleCatalog {
    /// The process-wide catalog.
    pub fn global() -> &'static RoleCatalog {
        static CATALOG: OnceLock<RoleCatalog> = OnceLock::new();
        CATALOG.get_or_init(Self::standard)
    }

    /// Build the catalog from the built-in spec table.
    pub fn standard() -> Self {
        let specs: Vec<SpecDescriptor> = SPEC_TABLE
            .iter()
            .map(
                |&(class_name, class_id, spec_name, spec_id, role, token, shorthand)| {
                    SpecDescriptor {
                        class_name,
                        class_id,
                        spec_name,
                        spec_id,
                        role,
                        token,
                        shorthand,
                        color: class_color(class_name),
                    }
                },
            )
            .collect();

        let by_id = specs.iter().enumerate().map(|(i, s)| (s.spec_id, i)).collect();
        let by_shorthand = specs.iter().enumerate().map(|(i, s)| (s.shorthand, i)).collect();
        let by_token = specs.iter().enumerate().map(|(i, s)| (s.token, i)).collect();

        Self {
            specs,
            by_id,
            by_shorthand,
            by_token,
        }
    }

    /// Verify the bijections the codec relies on.
    pub fn check_invariants(&self) -> Result<(), CatalogError> {
        if self.specs.len() != SPEC_COUNT {
            return Err(CatalogError::Invalid(format!(
                "expected {} specs, found {}",
                SPEC_COUNT,
                self.specs.len()
            )));
        }
        if self.by_shorthand.len() != SPEC_COUNT {
            return Err(CatalogError::Invalid("duplicate shorthand".to_string()));
        }
        if self.by_token.len() != SPEC_COUNT {
            return Err(CatalogError::Invalid("duplicate token".to_string()));
        }
        if self.by_id.len() != SPEC_COUNT {
            return Err(CatalogError::Invalid("duplicate spec id".to_string()));
        }
        Ok(())
    }

    /// All specs in catalog order.
    pub fn specs(&self) -> &[SpecDescriptor] {
        &self.specs
    }

    /// Spec at a catalog index.
    pub fn get(&self, index: SpecIndex) -> Option<&SpecDescriptor> {
        self.specs.get(index)
    }

    /// Look up a spec by its Blizzard spec id.
    pub fn lookup(&self, spec_id: u32) -> Result<&SpecDescriptor, CatalogError> {
        self.by_id
            .get(&spec_id)
            .map(|&i| &self.specs[i])
            .ok_or(CatalogError::SpecIdNotFound(spec_id))
    }

    /// Look up a spec by its composition shorthand.
    pub fn lookup_by_shorthand(&self, shorthand: char) -> Result<&SpecDescriptor, CatalogError> {
        self.shorthand_index(shorthand).map(|i| &self.specs[i])
    }

    /// Look up a spec by its token.
    pub fn lookup_by_token(&self, token: &str) -> Result<&SpecDescriptor, CatalogError> {
        self.index_of(token).map(|i| &self.specs[i])
    }

    /// Catalog index for a shorthand.
    pub fn shorthand_index(&self, shorthand: char) -> Result<SpecIndex, CatalogError> {
        self.by_shorthand
            .get(&shorthand)
            .copied()
            .ok_or(CatalogError::ShorthandNotFound(shorthand))
    }

    /// Catalog index for a token.
    pub fn index_of(&self, token: &str) -> Result<SpecIndex, CatalogError> {
        self.by_token
            .get(token)
            .copied()
            .ok_or_else(|| CatalogError::TokenNotFound(token.to_string()))
    }

    /// Tokens of every spec with the given role, in catalog order.
    pub fn tokens_for_role(&self, role: Role) -> Vec<&'static str> {
        self.specs
            .iter()
            .filter(|s| s.role == role)
            .map(|s| s.token)
            .collect()
    }

    /// Spec ids of every spec with the given role, in catalog order.
    pub fn spec_ids_for_role(&self, role: Role) -> Vec<u32> {
        self.specs
            .iter()
            .filter(|s| s.role == role)
            .map(|s| s.spec_id)
            .collect()
    }

    /// Tokens of every melee and ranged damage spec.
    pub fn dps_tokens(&self) -> Vec<&'static str> {
        self.specs
            .iter()
            .filter(|s| s.role.is_dps())
            .map(|s| s.token)
            .collect()
    }
}
