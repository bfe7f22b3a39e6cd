//! Integration tests: full message round-trips through one shared resolver.

use std::net::Ipv4Addr;
use std::sync::Arc;

use aoproto_codec::{CodecError, CodecResolver, WireType};
use aoproto_config::CodecConfig;
use aoproto_core::{Identity, IdentityType, Vector3};
use aoproto_messages::*;
use bytes::Bytes;

const N3_HEADER_LEN: usize = 4 + 8 + 1;

fn character() -> Identity {
    Identity::new(IdentityType::CANBE_AFFECTED, 12345)
}

fn roundtrip<M: WireType + std::fmt::Debug + PartialEq>(resolver: &CodecResolver, message: &M) -> (Bytes, M) {
    let bytes = resolver.encode_message(message).unwrap();
    let decoded = resolver.decode_message::<M>(&bytes).unwrap();
    (bytes, decoded)
}

// =========================================================================
// N3 messages
// =========================================================================

#[test]
fn test_character_action() {
    let resolver = CodecResolver::new();
    let mut message = CharacterActionMessage::new(character(), CharacterActionType::CastNano);
    message.target = Identity::NONE;
    message.parameter2 = 12345;

    let (bytes, decoded) = roundtrip(&resolver, &message);
    assert_eq!(decoded, message);
    assert_eq!(bytes.len(), N3_HEADER_LEN + 4 + 1 + 8 + 4 + 4 + 2);
    // Header fields are written before the message's own fields
    assert_eq!(&bytes[..4], &0x5E47_7770u32.to_be_bytes());
    assert_eq!(&bytes[4..8], &IdentityType::CANBE_AFFECTED.get().to_be_bytes());
    assert_eq!(&bytes[13..17], &19u32.to_be_bytes());
}

#[test]
fn test_org_client_with_args() {
    let resolver = CodecResolver::new();
    let mut message = OrgClientMessage::new(character(), OrgClientCommand::Create);
    message.target = character();
    message.command_args = "test".into();

    let (bytes, decoded) = roundtrip(&resolver, &message);
    assert_eq!(decoded, message);
    assert_eq!(bytes.len(), N3_HEADER_LEN + 1 + 8 + 4 + 2 + 4);
    assert_eq!(&bytes[bytes.len() - 6..], &[0, 4, b't', b'e', b's', b't']);
}

#[test]
fn test_org_client_drops_args() {
    let resolver = CodecResolver::new();
    let mut message = OrgClientMessage::new(character(), OrgClientCommand::Ranks);
    message.target = character();
    message.command_args = "test".into();

    let (bytes, decoded) = roundtrip(&resolver, &message);
    assert_eq!(bytes.len(), N3_HEADER_LEN + 1 + 8 + 4);
    assert_eq!(decoded.command, OrgClientCommand::Ranks);
    assert_eq!(decoded.target, message.target);
    assert_eq!(decoded.command_args, "");
}

#[test]
fn test_org_invite() {
    let resolver = CodecResolver::new();
    let organization = Identity::new(IdentityType::ORGANIZATION, 67890);
    let message = OrgInviteMessage::new(character(), organization, "Trollipopz");

    let (bytes, decoded) = roundtrip(&resolver, &message);
    assert_eq!(decoded, message);
    assert_eq!(decoded.org.org_message_type, OrgServerMessageType::Invite);
    assert_eq!(bytes.len(), N3_HEADER_LEN + 1 + 4 + 4 + 8 + 2 + 10);
}

#[test]
fn test_stat_message() {
    let resolver = CodecResolver::new();
    let message = StatMessage::new(
        Identity::NONE,
        vec![
            (CharacterStat::ACGEntranceStyles, 1),
            (CharacterStat::BackMesh, 3),
            (CharacterStat::CATAnim, 5),
        ],
    );

    let (bytes, decoded) = roundtrip(&resolver, &message);
    assert_eq!(decoded, message);
    assert_eq!(bytes.len(), N3_HEADER_LEN + 4 + 3 * 8);
    // Three elements: (3 + 1) * 0x3F1
    assert_eq!(&bytes[N3_HEADER_LEN..N3_HEADER_LEN + 4], &0xFC4u32.to_be_bytes());
}

#[test]
fn test_appearance_three_contributors() {
    let resolver = CodecResolver::new();
    let message = AppearanceUpdateMessage {
        n3: N3Message::new(N3MessageType::AppearanceUpdate, character()),
        backpack: 1,
        shoulder_pads: 3,
        tint: 5,
        ..Default::default()
    };

    let (bytes, decoded) = roundtrip(&resolver, &message);
    assert_eq!(decoded, message);
    // 1 << 3 | 3 << 6 | 5 << 9
    assert_eq!(&bytes[N3_HEADER_LEN..], &0x0AC8u16.to_be_bytes());
    assert_eq!(decoded.backpack, 1);
    assert_eq!(decoded.shoulder_pads, 3);
    assert_eq!(decoded.tint, 5);
}

#[test]
fn test_appearance_extremes() {
    let resolver = CodecResolver::new();

    let empty = AppearanceUpdateMessage::default();
    let (bytes, decoded) = roundtrip(&resolver, &empty);
    assert_eq!(decoded, empty);
    assert_eq!(&bytes[N3_HEADER_LEN..], &[0, 0]);

    let full = AppearanceUpdateMessage {
        fatness: Fatness::Thin,
        helmet_visible: true,
        backpack: 7,
        shoulder_pads: 7,
        tint: -1,
        mesh_set: 7,
        helmet_mesh: Some(4711),
        ..Default::default()
    };
    let (bytes, decoded) = roundtrip(&resolver, &full);
    assert_eq!(decoded, full);
    assert_eq!(&bytes[N3_HEADER_LEN..N3_HEADER_LEN + 2], &0xFFFEu16.to_be_bytes());
    assert_eq!(&bytes[N3_HEADER_LEN + 2..], &4711i32.to_be_bytes());

    let lowest = AppearanceUpdateMessage {
        tint: -8,
        ..Default::default()
    };
    assert_eq!(roundtrip(&resolver, &lowest).1, lowest);
}

#[test]
fn test_appearance_hidden_helmet_drops_mesh() {
    let resolver = CodecResolver::new();
    let message = AppearanceUpdateMessage {
        helmet_visible: false,
        helmet_mesh: Some(4711),
        ..Default::default()
    };
    let (bytes, decoded) = roundtrip(&resolver, &message);
    assert_eq!(bytes.len(), N3_HEADER_LEN + 2);
    assert_eq!(decoded.helmet_mesh, None);
}

#[test]
fn test_playfield_without_vendor() {
    let resolver = CodecResolver::new();
    let message = PlayfieldAnarchyFMessage {
        character_coordinates: Vector3::new(100.0, 5.5, -20.25),
        playfield_x: 1,
        playfield_z: 2,
        ..Default::default()
    };

    let (bytes, decoded) = roundtrip(&resolver, &message);
    assert_eq!(decoded, message);
    assert_eq!(bytes.len(), N3_HEADER_LEN + 12 + 8 + 8 + 8 + 8 + 4 + 8);
}

#[test]
fn test_playfield_with_vendor() {
    let resolver = CodecResolver::new();
    let message = PlayfieldAnarchyFMessage {
        playfield_x: 1,
        playfield_z: 2,
        ..Default::default()
    }
    .with_vendor_info(PlayfieldVendorInfo {
        unknown1: 0,
        vendor_count: 4,
        first_vendor_id: 100,
    });

    let (bytes, decoded) = roundtrip(&resolver, &message);
    assert_eq!(decoded, message);
    assert_eq!(bytes.len(), N3_HEADER_LEN + 12 + 8 + 8 + 8 + 8 + 4 + 12 + 8);
}

// =========================================================================
// System messages
// =========================================================================

#[test]
fn test_character_list() {
    let resolver = CodecResolver::new();
    let message = CharacterListMessage::new(vec![
        LoginCharacterInfo {
            name: "Trolololo".into(),
            area_name: "ICC".into(),
            level: 220,
            breed: Breed::Atrox,
            profession: Profession::Enforcer,
            online: true,
            ..Default::default()
        },
        LoginCharacterInfo {
            name: "Haiguise".into(),
            area_name: "Bore".into(),
            gender: Gender::Female,
            ..Default::default()
        },
    ]);

    let (_, decoded) = roundtrip(&resolver, &message);
    assert_eq!(decoded, message);
    assert_eq!(decoded.system.message_type, SystemMessageType::CharacterList);
    assert_eq!(decoded.characters[1].name, "Haiguise");
}

#[test]
fn test_zone_info() {
    let resolver = CodecResolver::new();
    let message = ZoneInfoMessage {
        character_id: 1_234_567_890,
        server_ip_address: Ipv4Addr::LOCALHOST,
        server_port: 45678,
        ..Default::default()
    };

    let (bytes, decoded) = roundtrip(&resolver, &message);
    assert_eq!(decoded, message);
    assert_eq!(&bytes[8..12], &[127, 0, 0, 1]);
    assert_eq!(&bytes[12..14], &45678u16.to_be_bytes());
}

#[test]
fn test_create_character() {
    let resolver = CodecResolver::new();
    let message = CreateCharacterMessage {
        system: SystemMessage::new(SystemMessageType::CreateCharacter),
        name: "verganas".into(),
        area_name: "unknown area".into(),
        breed: Breed::Nanomage,
        fatness: Fatness::Fat,
        gender: Gender::Female,
        head_mesh: 4711,
        level: 1,
        monster_scale: 0x64,
        profession: Profession::Keeper,
        starter_area: StarterArea::RubiKa,
        ..Default::default()
    };

    let (_, decoded) = roundtrip(&resolver, &message);
    assert_eq!(decoded, message);
    assert!(decoded.unknown1.is_empty());
}

// =========================================================================
// Failure modes and resolver behavior
// =========================================================================

#[test]
fn test_truncated_message() {
    let resolver = CodecResolver::new();
    let message = StatMessage::new(Identity::NONE, vec![(CharacterStat::Level, 200)]);
    let bytes = resolver.encode_message(&message).unwrap();

    let result = resolver.decode_message::<StatMessage>(&bytes[..bytes.len() - 2]);
    assert!(matches!(result, Err(CodecError::TruncatedStream { .. })));
}

#[test]
fn test_unknown_command_rejected() {
    let resolver = CodecResolver::new();
    let message = OrgClientMessage::new(character(), OrgClientCommand::Ranks);
    let mut bytes = resolver.encode_message(&message).unwrap().to_vec();
    // 2 names no command
    bytes[N3_HEADER_LEN] = 2;

    let result = resolver.decode_message::<OrgClientMessage>(&bytes);
    assert!(matches!(result, Err(CodecError::InvalidData(_))));
}

#[test]
fn test_builds_once_per_type() {
    let resolver = CodecResolver::new();
    let message = OrgClientMessage::new(character(), OrgClientCommand::Create);

    let first = resolver.encode_message(&message).unwrap();
    let builds = resolver.build_count();
    let second = resolver.encode_message(&message).unwrap();
    assert_eq!(first, second);
    assert_eq!(resolver.build_count(), builds);
}

#[test]
fn test_shared_resolver_across_threads() {
    let resolver = Arc::new(CodecResolver::new());

    std::thread::scope(|scope| {
        for i in 0..8u8 {
            let resolver = Arc::clone(&resolver);
            scope.spawn(move || {
                let message = AppearanceUpdateMessage {
                    backpack: i % 8,
                    shoulder_pads: (i + 1) % 8,
                    ..Default::default()
                };
                let bytes = resolver.encode_message(&message).unwrap();
                assert_eq!(resolver.decode_message::<AppearanceUpdateMessage>(&bytes).unwrap(), message);

                let stats = StatMessage::new(character(), vec![(CharacterStat::Stamina, i as u32)]);
                let bytes = resolver.encode_message(&stats).unwrap();
                assert_eq!(resolver.decode_message::<StatMessage>(&bytes).unwrap(), stats);
            });
        }
    });

    let builds = resolver.build_count();
    resolver.codec_for::<StatMessage>().unwrap();
    assert_eq!(resolver.build_count(), builds);
}

#[test]
fn test_little_endian_resolver() {
    let config = CodecConfig::parse("byte_order = little\n").unwrap();
    let resolver = CodecResolver::with_config(config);
    let message = ZoneInfoMessage {
        character_id: 1,
        server_port: 0x1234,
        ..Default::default()
    };

    let (bytes, decoded) = roundtrip(&resolver, &message);
    assert_eq!(decoded, message);
    assert_eq!(&bytes[..4], &0x17u32.to_le_bytes());
    assert_eq!(&bytes[12..14], &[0x34, 0x12]);
}

#[test]
fn test_registry_samples_roundtrip() {
    let resolver = CodecResolver::new();
    for entry in MESSAGES {
        let desc = entry.type_desc();
        let sample = entry.sample();
        let bytes = resolver.encode_value(&desc, &sample).unwrap();
        let decoded = resolver.decode_value(&desc, &bytes).unwrap();
        assert_eq!(decoded, sample, "{}", entry.name);
    }
}

#[test]
fn test_org_client_default_roundtrip() {
    let resolver = CodecResolver::new();
    let message = OrgClientMessage::default();
    assert!(OrgClientCommand::WITH_ARGS.contains(&message.command));

    let (bytes, decoded) = roundtrip(&resolver, &message);
    assert_eq!(decoded, message);
    assert_eq!(&bytes[bytes.len() - 2..], &[0, 0]);
}
