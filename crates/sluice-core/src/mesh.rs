use serde::{Deserialize, Serialize};

/// The filter installed in a station. Selects which inputs are accepted and
/// which recipe rows apply. A station without a mesh holds `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mesh {
    Cloth,
    Iron,
    Diamond,
    /// Only fits the empowered tier.
    Blazing,
}

impl Mesh {
    pub const ALL: [Mesh; 4] = [Mesh::Cloth, Mesh::Iron, Mesh::Diamond, Mesh::Blazing];

    pub fn name(self) -> &'static str {
        match self {
            Mesh::Cloth => "cloth",
            Mesh::Iron => "iron",
            Mesh::Diamond => "diamond",
            Mesh::Blazing => "blazing",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for mesh in Mesh::ALL {
            assert_eq!(Mesh::from_name(mesh.name()), Some(mesh));
        }
        assert_eq!(Mesh::from_name("none"), None);
    }
}
