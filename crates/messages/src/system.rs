//! # System Messages
//!
//! Login and zoning messages exchanged before and between playfields.

use crate::enums::*;
use aoproto_codec::{impl_wire_record, LengthPrefix, SchemaBuilder, WireRecord};
use aoproto_core::Identity;
use bytes::Bytes;
use std::net::Ipv4Addr;

/// Common header of all system messages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemMessage {
    pub message_type: SystemMessageType,
}

impl SystemMessage {
    pub fn new(message_type: SystemMessageType) -> Self {
        Self { message_type }
    }
}

impl WireRecord for SystemMessage {
    const NAME: &'static str = "SystemMessage";

    fn declare(schema: &mut SchemaBuilder<Self>) {
        schema.field(0, "message_type", |m| &m.message_type, |m| &mut m.message_type);
    }
}

/// One entry of the character selection list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoginCharacterInfo {
    pub unknown1: i32,
    pub character_id: Identity,
    pub playfield_id: Identity,
    pub exit_door_id: Identity,
    pub name: String,
    pub area_name: String,
    pub level: i32,
    pub breed: Breed,
    pub gender: Gender,
    pub profession: Profession,
    pub online: bool,
}

impl WireRecord for LoginCharacterInfo {
    const NAME: &'static str = "LoginCharacterInfo";

    fn declare(schema: &mut SchemaBuilder<Self>) {
        schema.field(0, "unknown1", |c| &c.unknown1, |c| &mut c.unknown1);
        schema.field(1, "character_id", |c| &c.character_id, |c| &mut c.character_id);
        schema.field(2, "playfield_id", |c| &c.playfield_id, |c| &mut c.playfield_id);
        schema.field(3, "exit_door_id", |c| &c.exit_door_id, |c| &mut c.exit_door_id);
        schema
            .field(4, "name", |c| &c.name, |c| &mut c.name)
            .prefix(LengthPrefix::U16);
        schema
            .field(5, "area_name", |c| &c.area_name, |c| &mut c.area_name)
            .prefix(LengthPrefix::U16);
        schema.field(6, "level", |c| &c.level, |c| &mut c.level);
        schema.field(7, "breed", |c| &c.breed, |c| &mut c.breed);
        schema.field(8, "gender", |c| &c.gender, |c| &mut c.gender);
        schema.field(9, "profession", |c| &c.profession, |c| &mut c.profession);
        schema.field(10, "online", |c| &c.online, |c| &mut c.online);
    }
}

/// Characters available on the account
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharacterListMessage {
    pub system: SystemMessage,
    pub characters: Vec<LoginCharacterInfo>,
    pub allowed_characters: i32,
    pub expansions: i32,
}

impl CharacterListMessage {
    pub fn new(characters: Vec<LoginCharacterInfo>) -> Self {
        Self {
            system: SystemMessage::new(SystemMessageType::CharacterList),
            characters,
            ..Default::default()
        }
    }
}

impl WireRecord for CharacterListMessage {
    const NAME: &'static str = "CharacterListMessage";

    fn declare(schema: &mut SchemaBuilder<Self>) {
        schema.extends(|m| &m.system, |m| &mut m.system);
        schema.field(0, "characters", |m| &m.characters, |m| &mut m.characters);
        schema.field(1, "allowed_characters", |m| &m.allowed_characters, |m| {
            &mut m.allowed_characters
        });
        schema.field(2, "expansions", |m| &m.expansions, |m| &mut m.expansions);
    }
}

/// Redirects the client to a zone server
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneInfoMessage {
    pub system: SystemMessage,
    pub character_id: u32,
    pub server_ip_address: Ipv4Addr,
    pub server_port: u16,
    pub unknown1: i32,
    pub unknown2: i16,
}

impl Default for ZoneInfoMessage {
    fn default() -> Self {
        Self {
            system: SystemMessage::new(SystemMessageType::ZoneInfo),
            character_id: 0,
            server_ip_address: Ipv4Addr::UNSPECIFIED,
            server_port: 0,
            unknown1: 0,
            unknown2: 0,
        }
    }
}

impl WireRecord for ZoneInfoMessage {
    const NAME: &'static str = "ZoneInfoMessage";

    fn declare(schema: &mut SchemaBuilder<Self>) {
        schema.extends(|m| &m.system, |m| &mut m.system);
        schema.field(0, "character_id", |m| &m.character_id, |m| &mut m.character_id);
        schema.field(1, "server_ip_address", |m| &m.server_ip_address, |m| {
            &mut m.server_ip_address
        });
        schema.field(2, "server_port", |m| &m.server_port, |m| &mut m.server_port);
        schema.field(3, "unknown1", |m| &m.unknown1, |m| &mut m.unknown1);
        schema.field(4, "unknown2", |m| &m.unknown2, |m| &mut m.unknown2);
    }
}

/// New character request from the character creation screen
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateCharacterMessage {
    pub system: SystemMessage,
    pub unknown1: Bytes,
    pub name: String,
    pub breed: Breed,
    pub gender: Gender,
    pub profession: Profession,
    pub level: i32,
    pub area_name: String,
    pub head_mesh: i32,
    pub monster_scale: i32,
    pub fatness: Fatness,
    pub starter_area: StarterArea,
}

impl WireRecord for CreateCharacterMessage {
    const NAME: &'static str = "CreateCharacterMessage";

    fn declare(schema: &mut SchemaBuilder<Self>) {
        schema.extends(|m| &m.system, |m| &mut m.system);
        schema
            .field(0, "unknown1", |m| &m.unknown1, |m| &mut m.unknown1)
            .prefix(LengthPrefix::U8);
        schema.field(1, "name", |m| &m.name, |m| &mut m.name);
        schema.field(2, "breed", |m| &m.breed, |m| &mut m.breed);
        schema.field(3, "gender", |m| &m.gender, |m| &mut m.gender);
        schema.field(4, "profession", |m| &m.profession, |m| &mut m.profession);
        schema.field(5, "level", |m| &m.level, |m| &mut m.level);
        schema.field(6, "area_name", |m| &m.area_name, |m| &mut m.area_name);
        schema.field(7, "head_mesh", |m| &m.head_mesh, |m| &mut m.head_mesh);
        schema.field(8, "monster_scale", |m| &m.monster_scale, |m| &mut m.monster_scale);
        schema.field(9, "fatness", |m| &m.fatness, |m| &mut m.fatness);
        schema.field(10, "starter_area", |m| &m.starter_area, |m| &mut m.starter_area);
    }
}

impl_wire_record!(
    SystemMessage,
    LoginCharacterInfo,
    CharacterListMessage,
    ZoneInfoMessage,
    CreateCharacterMessage,
);
