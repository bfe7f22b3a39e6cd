//! # Game Enumerations
//!
//! Discriminators and game data enumerations that appear in message bodies.
//! Each one is carried on the wire as its underlying integer.

use aoproto_codec::wire_enum;

// ============================================================================
// MESSAGE DISCRIMINATORS
// ============================================================================

wire_enum! {
    /// Kind of an N3 (in-game) message
    pub enum N3MessageType: u32 {
        Unknown = 0,
        CharacterAction = 0x5E47_7770,
        OrgClient = 0x5F4B_1A39,
        OrgServer = 0x365E_555B,
        Stat = 0x2B33_3D6E,
        PlayfieldAnarchyF = 0x5F4B_442A,
        AppearanceUpdate = 0x4162_4F0D,
    }
}

wire_enum! {
    /// Kind of a system (login and zoning) message
    pub enum SystemMessageType: u32 {
        Unknown = 0,
        ZoneInfo = 0x17,
        CharacterList = 0x53,
        CreateCharacter = 0x55,
    }
}

wire_enum! {
    pub enum OrgServerMessageType: u8 {
        Unknown = 0,
        OrgInfo = 1,
        Invite = 5,
        Kick = 6,
    }
}

wire_enum! {
    /// Organization command sent by the client
    pub enum OrgClientCommand: u8 {
        Create = 0,
        Ranks = 1,
        Contract = 3,
        Kick = 5,
        Invite = 6,
        Join = 7,
        Leave = 8,
        Info = 9,
        Description = 10,
        History = 11,
        Objective = 12,
        Name = 13,
        Tax = 14,
        Vote = 15,
    }
}

impl OrgClientCommand {
    /// Commands that carry a text argument on the wire
    pub const WITH_ARGS: [OrgClientCommand; 6] = [
        Self::Create,
        Self::Kick,
        Self::Description,
        Self::History,
        Self::Objective,
        Self::Name,
    ];
}

wire_enum! {
    pub enum CharacterActionType: u32 {
        Unknown = 0,
        CastNano = 19,
        StopAttack = 20,
        InfoRequest = 105,
        TeamRequest = 26,
        TeamKick = 28,
        SplitItem = 34,
        UseItemOnItem = 81,
    }
}

// ============================================================================
// CHARACTER DATA
// ============================================================================

wire_enum! {
    pub enum CharacterStat: u32 {
        Unknown = 0,
        Strength = 16,
        Agility = 17,
        Stamina = 18,
        Intelligence = 19,
        Sense = 20,
        Psychic = 21,
        HeadMesh = 64,
        Level = 54,
        BackMesh = 38,
        ShoulderMesh = 39,
        MonsterScale = 360,
        ACGEntranceStyles = 384,
        CATAnim = 401,
    }
}

wire_enum! {
    pub enum Breed: u32 {
        Unknown = 0,
        Solitus = 1,
        Opifex = 2,
        Nanomage = 3,
        Atrox = 4,
    }
}

wire_enum! {
    pub enum Gender: u32 {
        Uni = 0,
        Male = 1,
        Female = 2,
    }
}

wire_enum! {
    pub enum Profession: u32 {
        Unknown = 0,
        Soldier = 1,
        MartialArtist = 2,
        Engineer = 3,
        Fixer = 4,
        Agent = 5,
        Adventurer = 6,
        Trader = 7,
        Bureaucrat = 8,
        Enforcer = 9,
        Doctor = 10,
        NanoTechnician = 11,
        MetaPhysicist = 12,
        Keeper = 14,
        Shade = 15,
    }
}

wire_enum! {
    pub enum Fatness: u32 {
        Fat = 0,
        Normal = 1,
        Thin = 2,
    }
}

wire_enum! {
    pub enum StarterArea: u32 {
        Unknown = 0,
        RubiKa = 1,
        Shadowlands = 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aoproto_codec::{IntRepr, TypeDesc, WireType};

    #[test]
    fn test_defaults_are_first_variant() {
        assert_eq!(N3MessageType::default(), N3MessageType::Unknown);
        assert_eq!(Gender::default(), Gender::Uni);
        assert_eq!(Fatness::default(), Fatness::Fat);
    }

    #[test]
    fn test_raw_values() {
        assert_eq!(Profession::from_raw(14), Some(Profession::Keeper));
        assert_eq!(Profession::from_raw(13), None);
        assert_eq!(SystemMessageType::CharacterList.raw(), 0x53);
        assert_eq!(
            OrgClientCommand::type_desc(),
            TypeDesc::Enum {
                name: "OrgClientCommand",
                repr: IntRepr::U8
            }
        );
    }
}
