//! Common test utilities

#![allow(dead_code)]


pub use card::{CARD_UID, EmulatedCard};

use nexum_desfire::{Desfire, Key};

/// The all-zero single DES key every card leaves the factory with
pub fn master_key() -> Key {
    Key::des([0u8; 8])
}

/// Wire a tag to the given card and connect it
pub fn connected(card: EmulatedCard) -> Desfire<EmulatedCard> {
    let mut tag = Desfire::new(card);
    tag.connect().expect("card answers the version probe");
    tag
}

/// A connected tag on a factory-fresh card
pub fn connected_tag() -> Desfire<EmulatedCard> {
    connected(EmulatedCard::new())
}
