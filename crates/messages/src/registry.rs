//! Message lookup by name

use crate::n3::*;
use crate::system::*;
use aoproto_codec::{TypeDesc, Value, WireType};

/// A message type known to the lookup table
#[derive(Debug, Clone, Copy)]
pub struct MessageEntry {
    pub name: &'static str,
    desc: fn() -> TypeDesc,
    sample: fn() -> Value,
}

impl MessageEntry {
    const fn of<M: WireType + Default>(name: &'static str) -> Self {
        Self {
            name,
            desc: M::type_desc,
            sample: sample::<M>,
        }
    }

    pub fn type_desc(&self) -> TypeDesc {
        (self.desc)()
    }

    /// Default instance of the message as a value
    pub fn sample(&self) -> Value {
        (self.sample)()
    }
}

fn sample<M: WireType + Default>() -> Value {
    M::default().to_value()
}

/// Every top-level message, in name order
pub const MESSAGES: &[MessageEntry] = &[
    MessageEntry::of::<AppearanceUpdateMessage>("AppearanceUpdateMessage"),
    MessageEntry::of::<CharacterActionMessage>("CharacterActionMessage"),
    MessageEntry::of::<CharacterListMessage>("CharacterListMessage"),
    MessageEntry::of::<CreateCharacterMessage>("CreateCharacterMessage"),
    MessageEntry::of::<OrgClientMessage>("OrgClientMessage"),
    MessageEntry::of::<OrgInviteMessage>("OrgInviteMessage"),
    MessageEntry::of::<OrgServerMessage>("OrgServerMessage"),
    MessageEntry::of::<PlayfieldAnarchyFMessage>("PlayfieldAnarchyFMessage"),
    MessageEntry::of::<StatMessage>("StatMessage"),
    MessageEntry::of::<ZoneInfoMessage>("ZoneInfoMessage"),
];

pub fn message_by_name(name: &str) -> Option<&'static MessageEntry> {
    MESSAGES.iter().find(|entry| entry.name.eq_ignore_ascii_case(name))
}

/// Type description of the message called `name`
pub fn descriptor_by_name(name: &str) -> Option<TypeDesc> {
    message_by_name(name).map(MessageEntry::type_desc)
}

pub fn message_names() -> impl Iterator<Item = &'static str> {
    MESSAGES.iter().map(|entry| entry.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(
            descriptor_by_name("StatMessage"),
            Some(StatMessage::type_desc())
        );
        assert!(descriptor_by_name("statmessage").is_some());
        assert!(descriptor_by_name("NoSuchMessage").is_none());
    }

    #[test]
    fn test_names_match_types() {
        for entry in MESSAGES {
            assert_eq!(entry.type_desc().name(), entry.name);
        }
        assert_eq!(message_names().count(), MESSAGES.len());
    }

    #[test]
    fn test_samples_are_records() {
        for entry in MESSAGES {
            assert!(matches!(entry.sample(), Value::Record(_)), "{}", entry.name);
        }
    }
}
