//! Specialization descriptors and their role categories.

use serde::{Deserialize, Serialize};

use super::CatalogError;

/// Role category of a specialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Tank,
    Healer,
    Mdps,
    Rdps,
}

impl Role {
    /// All roles in display order.
    pub const ALL: [Role; 4] = [Role::Tank, Role::Healer, Role::Mdps, Role::Rdps];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Tank => "tank",
            Role::Healer => "healer",
            Role::Mdps => "mdps",
            Role::Rdps => "rdps",
        }
    }

    /// Melee and ranged damage dealers.
    pub fn is_dps(&self) -> bool {
        matches!(self, Role::Mdps | Role::Rdps)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tank" => Ok(Role::Tank),
            "healer" => Ok(Role::Healer),
            "mdps" => Ok(Role::Mdps),
            "rdps" => Ok(Role::Rdps),
            other => Err(CatalogError::UnknownRole(other.to_string())),
        }
    }
}

/// An RGB class colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// CSS notation, e.g. `rgb(196,31,59)`.
    pub fn css(&self) -> String {
        format!("rgb({},{},{})", self.0, self.1, self.2)
    }
}

impl Serialize for Rgb {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.css())
    }
}

/// Immutable description of one of the 36 specializations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecDescriptor {
    /// Class name, e.g. "death knight"
    pub class_name: &'static str,

    /// Blizzard class id
    pub class_id: u32,

    /// Spec name, e.g. "blood"
    pub spec_name: &'static str,

    /// Blizzard spec id
    pub spec_id: u32,

    /// Role category
    pub role: Role,

    /// Stable string id, e.g. "death_knight_blood"
    pub token: &'static str,

    /// Single character used inside composition strings
    pub shorthand: char,

    /// Class colour
    pub color: Rgb,
}

impl SpecDescriptor {
    /// Human-readable label, e.g. "Blood Death Knight".
    pub fn display_name(&self) -> String {
        format!("{} {}", title_case(self.spec_name), title_case(self.class_name))
    }

    /// Short class tag: initials for two-word classes ("DK"), else the first two letters ("Pa").
    pub fn class_tag(&self) -> String {
        let words: Vec<&str> = self.class_name.split_whitespace().collect();
        if words.len() > 1 {
            words
                .iter()
                .filter_map(|w| w.chars().next())
                .flat_map(char::to_uppercase)
                .collect()
        } else {
            title_case(self.class_name).chars().take(2).collect()
        }
    }

    /// Spec name cut to at most `width` characters, spaces dropped when shortened.
    pub fn abbreviation(&self, width: usize) -> String {
        if self.spec_name.chars().count() <= width {
            return self.spec_name.to_string();
        }
        self.spec_name
            .chars()
            .filter(|c| !c.is_whitespace())
            .take(width)
            .collect()
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holy_priest() -> SpecDescriptor {
        SpecDescriptor {
            class_name: "priest",
            class_id: 5,
            spec_name: "holy",
            spec_id: 257,
            role: Role::Healer,
            token: "priest_holy",
            shorthand: 'w',
            color: Rgb(255, 255, 255),
        }
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("tank".parse::<Role>().unwrap(), Role::Tank);
        assert_eq!(" MDPS ".parse::<Role>().unwrap(), Role::Mdps);
        assert!(matches!(
            "support".parse::<Role>(),
            Err(CatalogError::UnknownRole(_))
        ));
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Role::Rdps).unwrap();
        assert_eq!(json, "\"rdps\"");
    }

    #[test]
    fn test_role_is_dps() {
        assert!(Role::Mdps.is_dps());
        assert!(Role::Rdps.is_dps());
        assert!(!Role::Tank.is_dps());
        assert!(!Role::Healer.is_dps());
    }

    #[test]
    fn test_rgb_css() {
        assert_eq!(Rgb(196, 31, 59).css(), "rgb(196,31,59)");
        assert_eq!(serde_json::to_string(&Rgb(0, 0, 0)).unwrap(), "\"rgb(0,0,0)\"");
    }

    #[test]
    fn test_abbreviation() {
        let spec = holy_priest();
        assert_eq!(spec.abbreviation(10), "holy");
        assert_eq!(spec.abbreviation(3), "hol");
        assert_eq!(spec.abbreviation(2), "ho");
    }

    #[test]
    fn test_abbreviation_drops_spaces() {
        let spec = SpecDescriptor {
            spec_name: "beast mastery",
            ..holy_priest()
        };
        assert_eq!(spec.abbreviation(10), "beastmaste");
        assert_eq!(spec.abbreviation(13), "beast mastery");
        assert_eq!(spec.abbreviation(4), "beas");
    }

    #[test]
    fn test_display_name() {
        let spec = SpecDescriptor {
            class_name: "death knight",
            spec_name: "blood",
            ..holy_priest()
        };
        assert_eq!(spec.display_name(), "Blood Death Knight");
    }

    #[test]
    fn test_class_tag() {
        let dk = SpecDescriptor {
            class_name: "death knight",
            ..holy_priest()
        };
        assert_eq!(dk.class_tag(), "DK");
        assert_eq!(holy_priest().class_tag(), "Pr");
    }
}
