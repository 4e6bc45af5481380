//! In-game line protocol.
//!
//! Server to client, one line per replicated change:
//!
//! ```text
//! add <type> <id> <name> <x> <y> <owner>
//! del <type> <id>
//! chg <type> <id> <prop> <value>
//! atk <aType> <aId> <dType> <dId> <0|1>
//! tech <player> <name>
//! stock <player> <resource> <delta>
//! tick
//! ```
//!
//! Client to server, one line per request:
//!
//! ```text
//! move <id> <x> <y>
//! attack <id> <target>
//! build <id> <site>
//! gather <id> <deposit>
//! place <building> <x> <y>
//! train <trainer> <unit>
//! research <tech>
//! delete <id>
//! ```
//!
//! Fixed-point values are written in decimal and parsed back exactly.

use std::fmt;
use std::str::{FromStr, SplitWhitespace};

use rts_core::delta::{Delta, EntityRef, Property, PropertyChange};
use rts_core::entity::{EntityCategory, EntityId};
use rts_core::math::{Fixed, Vec2Fixed};
use rts_core::request::Request;

use crate::error::ProtocolError;

/// Cursor over the words of one line.
pub(crate) struct Fields<'a> {
    verb: &'static str,
    words: SplitWhitespace<'a>,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(verb: &'static str, words: SplitWhitespace<'a>) -> Self {
        Self { verb, words }
    }

    pub(crate) fn word(&mut self, field: &'static str) -> Result<&'a str, ProtocolError> {
        self.words.next().ok_or(ProtocolError::MissingField {
            verb: self.verb,
            field,
        })
    }

    pub(crate) fn parse<T: FromStr>(&mut self, field: &'static str) -> Result<T, ProtocolError> {
        let word = self.word(field)?;
        word.parse().map_err(|_| ProtocolError::InvalidField {
            verb: self.verb,
            field,
            value: word.to_string(),
        })
    }

    fn flag(&mut self, field: &'static str) -> Result<bool, ProtocolError> {
        match self.word(field)? {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(ProtocolError::InvalidField {
                verb: self.verb,
                field,
                value: other.to_string(),
            }),
        }
    }

    fn entity(&mut self) -> Result<EntityRef, ProtocolError> {
        let code: u8 = self.parse("type")?;
        let category = EntityCategory::from_code(code).ok_or(ProtocolError::InvalidField {
            verb: self.verb,
            field: "type",
            value: code.to_string(),
        })?;
        Ok(EntityRef {
            category,
            id: self.parse("id")?,
        })
    }

    fn position(&mut self) -> Result<Vec2Fixed, ProtocolError> {
        let x: Fixed = self.parse("x")?;
        let y: Fixed = self.parse("y")?;
        Ok(Vec2Fixed::new(x, y))
    }

    fn actor_and_target(mut self) -> Result<(EntityId, EntityId), ProtocolError> {
        let actor = self.parse("id")?;
        let target = self.parse("target")?;
        self.finish((actor, target))
    }

    pub(crate) fn finish<T>(mut self, value: T) -> Result<T, ProtocolError> {
        match self.words.next() {
            None => Ok(value),
            Some(_) => Err(ProtocolError::TrailingFields(self.verb)),
        }
    }
}

/// A line from the server during a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// A replicated change.
    Delta(Delta),
    /// End of the current tick's changes.
    Tick,
}

impl From<Delta> for ServerMessage {
    fn from(delta: Delta) -> Self {
        Self::Delta(delta)
    }
}

struct EntityField(EntityRef);

impl fmt::Display for EntityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0.category.code(), self.0.id)
    }
}

fn change_value(change: &PropertyChange) -> String {
    match *change {
        PropertyChange::Hitpoints(n) | PropertyChange::ResourceAmount(n) => n.to_string(),
        PropertyChange::X(v) | PropertyChange::Y(v) => v.to_string(),
        PropertyChange::AttackAnimation(on)
        | PropertyChange::MoveAnimation(on)
        | PropertyChange::Built(on) => u8::from(on).to_string(),
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let delta = match self {
            Self::Tick => return f.write_str("tick"),
            Self::Delta(delta) => delta,
        };
        match delta {
            Delta::EntityAdded {
                entity,
                name,
                position,
                owner,
            } => write!(
                f,
                "add {} {name} {} {} {owner}",
                EntityField(*entity),
                position.x,
                position.y
            ),
            Delta::EntityRemoved { entity } => write!(f, "del {}", EntityField(*entity)),
            Delta::PropertyChanged { entity, change } => write!(
                f,
                "chg {} {} {}",
                EntityField(*entity),
                change.property().id(),
                change_value(change)
            ),
            Delta::AttackState {
                attacker,
                defender,
                active,
            } => write!(
                f,
                "atk {} {} {}",
                EntityField(*attacker),
                EntityField(*defender),
                u8::from(*active)
            ),
            Delta::TechnologyResearched { player, tech } => write!(f, "tech {player} {tech}"),
            Delta::StockChanged {
                player,
                resource,
                delta,
            } => write!(f, "stock {player} {resource} {delta}"),
        }
    }
}

fn parse_change(fields: &mut Fields<'_>) -> Result<PropertyChange, ProtocolError> {
    let id: u8 = fields.parse("prop")?;
    let property = Property::from_id(id).ok_or(ProtocolError::InvalidField {
        verb: "chg",
        field: "prop",
        value: id.to_string(),
    })?;
    Ok(match property {
        Property::Hitpoints => PropertyChange::Hitpoints(fields.parse("value")?),
        Property::X => PropertyChange::X(fields.parse("value")?),
        Property::Y => PropertyChange::Y(fields.parse("value")?),
        Property::AttackAnimation => PropertyChange::AttackAnimation(fields.flag("value")?),
        Property::MoveAnimation => PropertyChange::MoveAnimation(fields.flag("value")?),
        Property::Built => PropertyChange::Built(fields.flag("value")?),
        Property::ResourceAmount => PropertyChange::ResourceAmount(fields.parse("value")?),
    })
}

impl FromStr for ServerMessage {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or(ProtocolError::Empty)?;
        let message = match verb {
            "add" => {
                let mut fields = Fields::new("add", words);
                let delta = Delta::EntityAdded {
                    entity: fields.entity()?,
                    name: fields.word("name")?.to_string(),
                    position: fields.position()?,
                    owner: fields.parse("owner")?,
                };
                fields.finish(delta)?
            }
            "del" => {
                let mut fields = Fields::new("del", words);
                let delta = Delta::EntityRemoved {
                    entity: fields.entity()?,
                };
                fields.finish(delta)?
            }
            "chg" => {
                let mut fields = Fields::new("chg", words);
                let entity = fields.entity()?;
                let change = parse_change(&mut fields)?;
                fields.finish(Delta::PropertyChanged { entity, change })?
            }
            "atk" => {
                let mut fields = Fields::new("atk", words);
                let delta = Delta::AttackState {
                    attacker: fields.entity()?,
                    defender: fields.entity()?,
                    active: fields.flag("active")?,
                };
                fields.finish(delta)?
            }
            "tech" => {
                let mut fields = Fields::new("tech", words);
                let delta = Delta::TechnologyResearched {
                    player: fields.parse("player")?,
                    tech: fields.word("name")?.to_string(),
                };
                fields.finish(delta)?
            }
            "stock" => {
                let mut fields = Fields::new("stock", words);
                let delta = Delta::StockChanged {
                    player: fields.parse("player")?,
                    resource: fields.word("resource")?.to_string(),
                    delta: fields.parse("delta")?,
                };
                fields.finish(delta)?
            }
            "tick" => return Fields::new("tick", words).finish(Self::Tick),
            other => return Err(ProtocolError::UnknownVerb(other.to_string())),
        };
        Ok(Self::Delta(message))
    }
}

/// A request as written by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientMessage(pub Request);

impl fmt::Display for ClientMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Request::Move { entity, target } => write!(f, "move {entity} {} {}", target.x, target.y),
            Request::Attack { entity, target } => write!(f, "attack {entity} {target}"),
            Request::Build { entity, target } => write!(f, "build {entity} {target}"),
            Request::Gather { entity, target } => write!(f, "gather {entity} {target}"),
            Request::PlaceBuilding {
                building_type,
                position,
            } => write!(f, "place {building_type} {} {}", position.x, position.y),
            Request::Train {
                building,
                unit_type,
            } => write!(f, "train {building} {unit_type}"),
            Request::Research { tech } => write!(f, "research {tech}"),
            Request::Delete { entity } => write!(f, "delete {entity}"),
        }
    }
}

impl FromStr for ClientMessage {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or(ProtocolError::Empty)?;
        let request = match verb {
            "move" => {
                let mut fields = Fields::new("move", words);
                let request = Request::Move {
                    entity: fields.parse("id")?,
                    target: fields.position()?,
                };
                fields.finish(request)?
            }
            "attack" => {
                let (entity, target) = Fields::new("attack", words).actor_and_target()?;
                Request::Attack { entity, target }
            }
            "build" => {
                let (entity, target) = Fields::new("build", words).actor_and_target()?;
                Request::Build { entity, target }
            }
            "gather" => {
                let (entity, target) = Fields::new("gather", words).actor_and_target()?;
                Request::Gather { entity, target }
            }
            "place" => {
                let mut fields = Fields::new("place", words);
                let request = Request::PlaceBuilding {
                    building_type: fields.word("type")?.to_string(),
                    position: fields.position()?,
                };
                fields.finish(request)?
            }
            "train" => {
                let mut fields = Fields::new("train", words);
                let request = Request::Train {
                    building: fields.parse("building")?,
                    unit_type: fields.word("unit")?.to_string(),
                };
                fields.finish(request)?
            }
            "research" => {
                let mut fields = Fields::new("research", words);
                let request = Request::Research {
                    tech: fields.word("tech")?.to_string(),
                };
                fields.finish(request)?
            }
            "delete" => {
                let mut fields = Fields::new("delete", words);
                let request = Request::Delete {
                    entity: fields.parse("id")?,
                };
                fields.finish(request)?
            }
            other => return Err(ProtocolError::UnknownVerb(other.to_string())),
        };
        Ok(Self(request))
    }
}
