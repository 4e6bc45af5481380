//! Type descriptors: the stat bundles entities are built from.
//!
//! Descriptors are plain data. How they are authored on disk is up to the
//! caller; [`TypeRegistry::from_ron_str`] accepts the RON layout used by the
//! test fixtures and the server launcher.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{fixed_decimal, Fixed};

/// Damage type dealt by an attacker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum DamageType {
    /// Blades, arrows, bullets.
    #[default]
    Pierce,
    /// Clubs, hammers, rams.
    Crush,
    /// Fire and explosives.
    Fire,
    /// Anything magical or otherwise exotic.
    Arcane,
}

/// Per-damage-type resistance, in percent.
///
/// Missing entries mean no resistance.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resistances(pub BTreeMap<DamageType, u8>);

impl Resistances {
    /// No resistance to anything.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Builder: set the resistance to one damage type.
    #[must_use]
    pub fn with(mut self, damage_type: DamageType, percent: u8) -> Self {
        self.0.insert(damage_type, percent.min(100));
        self
    }

    /// Resistance against `damage_type`, clamped to 100.
    #[must_use]
    pub fn against(&self, damage_type: DamageType) -> u8 {
        self.0.get(&damage_type).copied().unwrap_or(0).min(100)
    }

    /// Damage actually taken from a hit of `damage` points.
    ///
    /// `floor(damage * (100 - resistance) / 100)`.
    #[must_use]
    pub fn mitigate(&self, damage: u32, damage_type: DamageType) -> u32 {
        let resistance = u64::from(self.against(damage_type));
        let taken = u64::from(damage) * (100 - resistance) / 100;
        u32::try_from(taken).unwrap_or(damage)
    }
}

/// Resource cost, keyed by resource kind name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cost(pub BTreeMap<String, i64>);

impl Cost {
    /// Free.
    #[must_use]
    pub fn free() -> Self {
        Self::default()
    }

    /// Builder: add an amount of one resource.
    #[must_use]
    pub fn with(mut self, resource: impl Into<String>, amount: i64) -> Self {
        self.0.insert(resource.into(), amount);
        self
    }

    /// Iterate over `(resource, amount)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(name, amount)| (name.as_str(), *amount))
    }
}

/// Attack capability stats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackProfile {
    /// Damage per hit before resistances.
    pub damage: u32,
    /// Damage type.
    #[serde(default)]
    pub damage_type: DamageType,
    /// Range measured as the gap between footprints, in tiles.
    #[serde(with = "fixed_decimal")]
    pub range: Fixed,
    /// Ticks between hits (1 = every tick).
    #[serde(default = "default_interval")]
    pub interval: u32,
}

/// Gather capability stats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatherProfile {
    /// Amount removed per extraction.
    pub amount: i32,
    /// Ticks between extractions.
    #[serde(default = "default_interval")]
    pub interval: u32,
}

fn default_interval() -> u32 {
    1
}

/// Unit type descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitType {
    /// Unique name, no whitespace.
    pub name: String,
    /// Maximum hitpoints.
    pub hitpoints: i32,
    /// Footprint side in tiles.
    #[serde(default = "default_size")]
    pub size: u32,
    /// Tiles per second.
    #[serde(with = "fixed_decimal")]
    pub speed: Fixed,
    /// Attack stats, if the unit can fight.
    #[serde(default)]
    pub attack: Option<AttackProfile>,
    /// Resistances against incoming damage.
    #[serde(default)]
    pub resistances: Resistances,
    /// Construction speed, if the unit can build.
    #[serde(default)]
    pub build_speed: Option<u32>,
    /// Gathering stats, if the unit can gather.
    #[serde(default)]
    pub gather: Option<GatherProfile>,
    /// Training cost.
    #[serde(default)]
    pub cost: Cost,
    /// Ticks a trainer needs to produce one.
    #[serde(default = "default_train_ticks")]
    pub train_ticks: u32,
}

/// Building type descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingType {
    /// Unique name, no whitespace.
    pub name: String,
    /// Maximum hitpoints.
    pub hitpoints: i32,
    /// Footprint side in tiles.
    #[serde(default = "default_size")]
    pub size: u32,
    /// Divides a builder's speed to get hitpoints restored per tick.
    #[serde(default = "default_build_resistance")]
    pub build_resistance: u32,
    /// Attack stats for towers.
    #[serde(default)]
    pub attack: Option<AttackProfile>,
    /// Resistances against incoming damage.
    #[serde(default)]
    pub resistances: Resistances,
    /// Unit type names this building can train.
    #[serde(default)]
    pub trains: Vec<String>,
    /// Resource kind this building must stand on (mines, lumber camps).
    #[serde(default)]
    pub built_on: Option<String>,
    /// Placement cost.
    #[serde(default)]
    pub cost: Cost,
}

impl BuildingType {
    /// Whether this building can produce units of `unit_type`.
    #[must_use]
    pub fn can_train(&self, unit_type: &str) -> bool {
        self.trains.iter().any(|name| name == unit_type)
    }
}

/// Resource deposit type descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceType {
    /// Unique name, no whitespace. Doubles as the resource kind credited to
    /// players and matched against [`BuildingType::built_on`].
    pub name: String,
    /// Initial quantity.
    pub amount: i32,
    /// Footprint side in tiles.
    #[serde(default = "default_size")]
    pub size: u32,
}

/// Technology descriptor. Effects are interpreted elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnologyType {
    /// Unique name, no whitespace.
    pub name: String,
    /// Research cost.
    #[serde(default)]
    pub cost: Cost,
}

fn default_size() -> u32 {
    1
}

fn default_build_resistance() -> u32 {
    1
}

fn default_train_ticks() -> u32 {
    50
}

/// On-disk layout accepted by [`TypeRegistry::from_ron_str`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TypeTables {
    #[serde(default)]
    units: Vec<UnitType>,
    #[serde(default)]
    buildings: Vec<BuildingType>,
    #[serde(default)]
    resources: Vec<ResourceType>,
    #[serde(default)]
    technologies: Vec<TechnologyType>,
}

/// Lookup of every type descriptor by name.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    units: HashMap<String, Arc<UnitType>>,
    buildings: HashMap<String, Arc<BuildingType>>,
    resources: HashMap<String, Arc<ResourceType>>,
    technologies: HashMap<String, Arc<TechnologyType>>,
}

impl TypeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a registry from RON type tables.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParse`] on malformed input or a name containing
    /// whitespace.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let tables: TypeTables =
            ron::from_str(source).map_err(|e| GameError::DataParse(e.to_string()))?;

        let mut registry = Self::new();
        for unit in tables.units {
            registry.add_unit(unit)?;
        }
        for building in tables.buildings {
            registry.add_building(building)?;
        }
        for resource in tables.resources {
            registry.add_resource(resource)?;
        }
        for tech in tables.technologies {
            registry.add_technology(tech)?;
        }
        Ok(registry)
    }

    /// Register a unit type.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParse`] if the name is not a single token.
    pub fn add_unit(&mut self, unit: UnitType) -> Result<Arc<UnitType>> {
        check_name(&unit.name)?;
        let unit = Arc::new(unit);
        self.units.insert(unit.name.clone(), Arc::clone(&unit));
        Ok(unit)
    }

    /// Register a building type.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParse`] if the name is not a single token.
    pub fn add_building(&mut self, building: BuildingType) -> Result<Arc<BuildingType>> {
        check_name(&building.name)?;
        let building = Arc::new(building);
        self.buildings
            .insert(building.name.clone(), Arc::clone(&building));
        Ok(building)
    }

    /// Register a resource type.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParse`] if the name is not a single token.
    pub fn add_resource(&mut self, resource: ResourceType) -> Result<Arc<ResourceType>> {
        check_name(&resource.name)?;
        let resource = Arc::new(resource);
        self.resources
            .insert(resource.name.clone(), Arc::clone(&resource));
        Ok(resource)
    }

    /// Register a technology.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParse`] if the name is not a single token.
    pub fn add_technology(&mut self, tech: TechnologyType) -> Result<Arc<TechnologyType>> {
        check_name(&tech.name)?;
        let tech = Arc::new(tech);
        self.technologies.insert(tech.name.clone(), Arc::clone(&tech));
        Ok(tech)
    }

    /// Look up a unit type.
    #[must_use]
    pub fn unit(&self, name: &str) -> Option<&Arc<UnitType>> {
        self.units.get(name)
    }

    /// Look up a building type.
    #[must_use]
    pub fn building(&self, name: &str) -> Option<&Arc<BuildingType>> {
        self.buildings.get(name)
    }

    /// Look up a resource type.
    #[must_use]
    pub fn resource(&self, name: &str) -> Option<&Arc<ResourceType>> {
        self.resources.get(name)
    }

    /// Look up a technology.
    #[must_use]
    pub fn technology(&self, name: &str) -> Option<&Arc<TechnologyType>> {
        self.technologies.get(name)
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(GameError::DataParse(format!(
            "type name {name:?} must be a single non-empty token"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mitigate_applies_percentage() {
        let resist = Resistances::none().with(DamageType::Pierce, 25);
        assert_eq!(resist.mitigate(10, DamageType::Pierce), 7);
        assert_eq!(resist.mitigate(10, DamageType::Crush), 10);
    }

    #[test]
    fn test_resistance_clamped_to_full_immunity() {
        let resist = Resistances::none().with(DamageType::Fire, 250);
        assert_eq!(resist.against(DamageType::Fire), 100);
        assert_eq!(resist.mitigate(40, DamageType::Fire), 0);
    }

    #[test]
    fn test_mitigate_handles_huge_damage() {
        let resist = Resistances::none().with(DamageType::Crush, 50);
        assert_eq!(resist.mitigate(u32::MAX, DamageType::Crush), u32::MAX / 2);
        assert_eq!(resist.mitigate(u32::MAX, DamageType::Pierce), u32::MAX);
    }

    #[test]
    fn test_registry_from_ron() {
        let source = r#"(
            units: [(
                name: "peasant",
                hitpoints: 25,
                speed: 1.5,
                build_speed: Some(4),
                gather: Some((amount: 10, interval: 5)),
                cost: {"food": 50},
            )],
            buildings: [(name: "mine", hitpoints: 300, size: 2, built_on: Some("gold"))],
            resources: [(name: "gold", amount: 1000)],
            technologies: [(name: "masonry")],
        )"#;

        let registry = TypeRegistry::from_ron_str(source).unwrap();
        let peasant = registry.unit("peasant").unwrap();
        assert_eq!(peasant.speed, Fixed::from_num(1.5));
        assert_eq!(peasant.size, 1);
        assert_eq!(peasant.gather.as_ref().unwrap().interval, 5);
        assert_eq!(peasant.cost.0.get("food"), Some(&50));
        assert_eq!(
            registry.building("mine").unwrap().built_on.as_deref(),
            Some("gold")
        );
        assert!(registry.technology("masonry").is_some());
    }

    #[test]
    fn test_registry_rejects_whitespace_names() {
        let mut registry = TypeRegistry::new();
        let result = registry.add_resource(ResourceType {
            name: "gold ore".into(),
            amount: 10,
            size: 1,
        });
        assert!(matches!(result, Err(GameError::DataParse(_))));
    }
}
